use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use crate::browser::{ChromiumDriverFactory, DriverFactory};
use crate::collectors::scraper::ImageScraper;
use crate::collectors::{ensure_dir, Collector};
use crate::config::CollectionConfig;
use crate::error::{AppResult, CollectionError};
use crate::models::CollectionOutcome;
use crate::utils::sanitize_component;

/// 图片采集器：每个关键词开一个浏览器会话，交给 [`ImageScraper`] 抓取
pub struct ImageCollector {
    factory: Arc<dyn DriverFactory>,
}

impl ImageCollector {
    pub fn new(factory: Arc<dyn DriverFactory>) -> Self {
        Self { factory }
    }

    /// 使用 chromiumoxide 驱动
    pub fn chromium(config: &CollectionConfig) -> Self {
        Self::new(Arc::new(ChromiumDriverFactory::new(config)))
    }

    async fn scrape_keyword(
        &self,
        keyword: &str,
        output_path: &Path,
        config: &CollectionConfig,
    ) -> AppResult<CollectionOutcome> {
        ensure_dir(output_path)?;
        let keyword_dir = output_path.join(sanitize_component(keyword));
        ensure_dir(&keyword_dir)?;

        let scraper = ImageScraper::new(config)?;
        let driver = self.factory.open().await?;
        let report = scraper.scrape(driver.as_ref(), keyword, &keyword_dir).await;

        if report.success {
            info!(
                "✓ 关键词 '{}' 采集完成: 保存 {} 张 (发现 {} / 跳过 {})",
                keyword, report.saved, report.urls_found, report.skipped
            );
            Ok(CollectionOutcome {
                success: true,
                keyword: keyword.to_string(),
                items_collected: report.saved,
                output_path: keyword_dir.display().to_string(),
                urls_found: report.urls_found,
                skipped: report.skipped,
                error: None,
            })
        } else {
            Ok(CollectionOutcome::failed(
                keyword,
                output_path.display().to_string(),
                report.error.unwrap_or_else(|| "未知错误".to_string()),
            ))
        }
    }
}

#[async_trait]
impl Collector for ImageCollector {
    async fn collect(&self, keyword: &str, output_path: &Path, config: &CollectionConfig) -> AppResult<CollectionOutcome> {
        match self.scrape_keyword(keyword, output_path, config).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                let err = CollectionError::CollectorFailed {
                    keyword: keyword.to_string(),
                    reason: e.to_string(),
                };
                error!("❌ {}", err);
                Ok(CollectionOutcome::failed(
                    keyword,
                    output_path.display().to_string(),
                    err.to_string(),
                ))
            }
        }
    }
}
