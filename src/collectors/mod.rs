//! 采集层
//!
//! 采集器把一个关键词变成一批落盘的数据，具体实现在构造时选定。

pub mod downloader;
pub mod image_collector;
pub mod scraper;

use std::path::Path;

use async_trait::async_trait;

use crate::config::CollectionConfig;
use crate::error::{AppError, AppResult};
use crate::models::CollectionOutcome;

pub use downloader::{DownloadOutcome, ImageDownloader};
pub use image_collector::ImageCollector;
pub use scraper::{ImageScraper, ScrapeReport, ScrapeState, ScraperSession};

/// 采集器契约
///
/// - 必须在 `output_path` 不存在时创建它
/// - 同一关键词可重复调用，每次都重新采集
#[async_trait]
pub trait Collector: Send + Sync {
    async fn collect(&self, keyword: &str, output_path: &Path, config: &CollectionConfig) -> AppResult<CollectionOutcome>;
}

pub(crate) fn ensure_dir(path: &Path) -> AppResult<()> {
    std::fs::create_dir_all(path).map_err(|e| AppError::create_dir_failed(path.display().to_string(), e))
}
