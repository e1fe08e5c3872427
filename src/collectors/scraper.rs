//! 图片抓取引擎
//!
//! 一次抓取对应一个关键词，按状态推进：
//!
//! ```text
//! INIT → DISCOVER → EXTRACT → DOWNLOAD → DONE
//!   └──────┴──────────┴──────────┴──→ FAILED
//! ```
//!
//! - INIT: 打开首页，尽力关闭 Cookie 同意弹窗（5 秒，失败忽略）
//! - DISCOVER: 打开搜索页，等待超过 10 个 img 元素（10 秒，超时即失败）
//! - EXTRACT: 逐个点击缩略图，从大图预览中收集去重后的 URL
//! - DOWNLOAD: 按发现顺序下载、过滤分辨率、保存，最后写 metadata.json
//!
//! 浏览器会话在任何退出路径上都会被释放。

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, error, info, warn};

use crate::browser::{BrowserDriver, ElementHandle};
use crate::collectors::downloader::{DownloadOutcome, ImageDownloader};
use crate::config::CollectionConfig;
use crate::error::{AppError, AppResult, CollectionError};
use crate::models::MetadataLedger;

pub const HOME_URL: &str = "https://www.google.com";
pub const SEARCH_URL: &str = "https://www.google.com/search";
pub const CONSENT_SELECTOR: &str = "#W0wltc";
pub const IMAGE_SELECTOR: &str = "img";
pub const PREVIEW_SELECTOR: &str = "img.iPVvYb";
pub const METADATA_FILE: &str = "metadata.json";

const CONSENT_TIMEOUT: Duration = Duration::from_secs(5);
const DISCOVER_TIMEOUT: Duration = Duration::from_secs(10);
const PREVIEW_TIMEOUT: Duration = Duration::from_secs(5);
/// 搜索页至少要有这么多 img 才算加载完成（严格大于）
const MIN_DISCOVERED_IMAGES: usize = 10;
const MIN_THUMBNAIL_WIDTH: f64 = 80.0;
const MIN_PREVIEW_WIDTH: f64 = 300.0;

const RENDERED_WIDTH_JS: &str = "function() { return this.width; }";
const NATURAL_WIDTH_JS: &str = "function() { return this.naturalWidth; }";
const OUTER_HTML_JS: &str = "function() { return this.outerHTML; }";

/// 抓取状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeState {
    Init,
    Discover,
    Extract,
    Download,
    Done,
    Failed,
}

impl fmt::Display for ScrapeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScrapeState::Init => "INIT",
            ScrapeState::Discover => "DISCOVER",
            ScrapeState::Extract => "EXTRACT",
            ScrapeState::Download => "DOWNLOAD",
            ScrapeState::Done => "DONE",
            ScrapeState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// 单个关键词的抓取会话，只属于一次抓取
#[derive(Debug, Default)]
pub struct ScraperSession {
    urls: Vec<String>,
    seen: HashSet<String>,
    ledger: MetadataLedger,
    missed: usize,
    target: usize,
}

impl ScraperSession {
    pub fn new(target: usize) -> Self {
        Self {
            target,
            ..Default::default()
        }
    }

    /// 按发现顺序的去重 URL
    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn ledger(&self) -> &MetadataLedger {
        &self.ledger
    }

    pub fn missed(&self) -> usize {
        self.missed
    }

    pub fn is_full(&self) -> bool {
        self.urls.len() >= self.target
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    /// 接受一个新 URL，重复的返回 None
    pub fn accept(&mut self, url: &str, html: &str) -> Option<usize> {
        if !self.seen.insert(url.to_string()) {
            return None;
        }
        self.urls.push(url.to_string());
        Some(self.ledger.record(url, html))
    }

    /// 记一次点击失败，返回是否超过阈值
    fn record_miss(&mut self, max_missed: usize) -> bool {
        self.missed += 1;
        self.missed > max_missed
    }
}

/// 一次抓取的结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeReport {
    pub success: bool,
    pub keyword: String,
    pub urls_found: usize,
    pub saved: usize,
    pub skipped: usize,
    pub total: usize,
    /// 提前停止发现的原因（点击失败过多），不影响 success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stopped_early: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScrapeReport {
    pub fn failed(keyword: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            keyword: keyword.into(),
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Default)]
struct DownloadStats {
    saved: usize,
    skipped: usize,
}

/// 构造搜索页 URL（关键词做 URL 编码）
pub fn search_url(keyword: &str) -> AppResult<String> {
    let url = Url::parse_with_params(
        SEARCH_URL,
        &[("q", keyword), ("source", "lnms"), ("tbm", "isch")],
    )
    .map_err(|e| AppError::Other(format!("构造搜索 URL 失败: {}", e)))?;
    Ok(url.into())
}

/// 图片抓取引擎
pub struct ImageScraper {
    config: CollectionConfig,
    downloader: ImageDownloader,
}

impl ImageScraper {
    pub fn new(config: &CollectionConfig) -> AppResult<Self> {
        Ok(Self {
            config: config.clone(),
            downloader: ImageDownloader::new(config)?,
        })
    }

    /// 抓取一个关键词，图片与 metadata.json 写入 `output_dir`
    ///
    /// 无论成功与否都会调用 `driver.quit()`
    pub async fn scrape(&self, driver: &dyn BrowserDriver, keyword: &str, output_dir: &Path) -> ScrapeReport {
        let mut session = ScraperSession::new(self.config.number_of_images);
        let result = self.run(driver, keyword, output_dir, &mut session).await;

        if let Err(e) = driver.quit().await {
            warn!("[{}] 释放浏览器会话失败: {}", keyword, e);
        }

        match result {
            Ok(report) => {
                debug!("[{}] 状态: {}", keyword, ScrapeState::Done);
                report
            }
            Err(e) => {
                error!("[{}] ❌ 抓取失败 ({}): {}", keyword, ScrapeState::Failed, e);
                ScrapeReport::failed(keyword, e.to_string())
            }
        }
    }

    async fn run(
        &self,
        driver: &dyn BrowserDriver,
        keyword: &str,
        output_dir: &Path,
        session: &mut ScraperSession,
    ) -> AppResult<ScrapeReport> {
        debug!("[{}] 状态: {}", keyword, ScrapeState::Init);
        self.init(driver).await?;

        debug!("[{}] 状态: {}", keyword, ScrapeState::Discover);
        let thumbnails = self.discover(driver, keyword).await?;

        debug!("[{}] 状态: {}", keyword, ScrapeState::Extract);
        let stopped_early = self.extract(driver, &thumbnails, session).await;
        if let Some(reason) = &stopped_early {
            warn!("[{}] ⛔ {}，停止发现", keyword, reason);
        }
        info!("[{}] 共收集到 {} 个图片 URL", keyword, session.urls().len());

        debug!("[{}] 状态: {}", keyword, ScrapeState::Download);
        let stats = self.download_all(keyword, output_dir, session).await;

        Ok(ScrapeReport {
            success: true,
            keyword: keyword.to_string(),
            urls_found: session.urls().len(),
            saved: stats.saved,
            skipped: stats.skipped,
            total: session.urls().len(),
            stopped_early: stopped_early.map(|reason| reason.to_string()),
            error: None,
        })
    }

    async fn init(&self, driver: &dyn BrowserDriver) -> AppResult<()> {
        driver.navigate(HOME_URL).await?;

        match driver.wait_until(CONSENT_SELECTOR, 0, CONSENT_TIMEOUT).await {
            Ok(buttons) => {
                if let Some(button) = buttons.first() {
                    if let Err(e) = driver.click(*button).await {
                        debug!("关闭同意弹窗失败，忽略: {}", e);
                    }
                }
            }
            Err(e) if e.is_wait_timeout() => debug!("未出现同意弹窗"),
            Err(e) => debug!("查找同意弹窗失败，忽略: {}", e),
        }
        Ok(())
    }

    /// 打开搜索页并返回过滤后的缩略图点击队列
    async fn discover(&self, driver: &dyn BrowserDriver, keyword: &str) -> AppResult<Vec<ElementHandle>> {
        info!("🔍 搜索图片: {}", keyword);
        driver.navigate(&search_url(keyword)?).await?;

        let images = driver
            .wait_until(IMAGE_SELECTOR, MIN_DISCOVERED_IMAGES, DISCOVER_TIMEOUT)
            .await?;
        debug!("[{}] 发现 {} 个 img 元素", keyword, images.len());

        let mut thumbnails = Vec::new();
        for image in images {
            // 单个元素出错直接跳过
            let Ok(width) = driver.execute_script(RENDERED_WIDTH_JS, image).await else {
                continue;
            };
            let Ok(src) = driver.read_attribute(image, "src").await else {
                continue;
            };
            let has_src = src.map(|s| !s.is_empty()).unwrap_or(false);
            if has_src && as_number(&width) >= MIN_THUMBNAIL_WIDTH {
                thumbnails.push(image);
            }
        }

        info!("[{}] 有效缩略图: {} 个", keyword, thumbnails.len());
        Ok(thumbnails)
    }

    /// 逐个点击缩略图；点击失败超过阈值时返回停止原因
    async fn extract(
        &self,
        driver: &dyn BrowserDriver,
        thumbnails: &[ElementHandle],
        session: &mut ScraperSession,
    ) -> Option<CollectionError> {
        for (index, thumbnail) in thumbnails.iter().enumerate() {
            if session.is_full() {
                break;
            }

            if let Err(e) = driver.scroll_into_view(*thumbnail).await {
                debug!("缩略图 #{} 滚动失败: {}", index + 1, e);
            }

            if let Err(e) = driver.click(*thumbnail).await {
                debug!("缩略图 #{} 点击失败: {}", index + 1, e);
                if session.record_miss(self.config.max_missed) {
                    return Some(CollectionError::TooManyMissedClicks {
                        missed: session.missed(),
                        max_missed: self.config.max_missed,
                    });
                }
                continue;
            }
            debug!("点击预览 #{}", index + 1);

            match self.take_preview(driver, session).await {
                Ok(Some(url)) => info!("[+] 收集: {}", url),
                Ok(None) => {}
                Err(e) => debug!("缩略图 #{} 没有可用的预览: {}", index + 1, e),
            }
        }
        None
    }

    /// 在大图预览中找第一个合格且未收集过的 URL
    async fn take_preview(&self, driver: &dyn BrowserDriver, session: &mut ScraperSession) -> AppResult<Option<String>> {
        let previews = driver.wait_until(PREVIEW_SELECTOR, 0, PREVIEW_TIMEOUT).await?;

        for preview in previews {
            let Some(src) = driver.read_attribute(preview, "src").await? else {
                continue;
            };
            if !is_http_url(&src) || session.contains(&src) {
                continue;
            }
            let natural_width = driver.execute_script(NATURAL_WIDTH_JS, preview).await?;
            if as_number(&natural_width) <= MIN_PREVIEW_WIDTH {
                continue;
            }

            let html = driver
                .execute_script(OUTER_HTML_JS, preview)
                .await
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            if session.accept(&src, &html).is_some() {
                return Ok(Some(src));
            }
        }
        Ok(None)
    }

    async fn download_all(&self, keyword: &str, output_dir: &Path, session: &mut ScraperSession) -> DownloadStats {
        info!("[{}] 开始下载 {} 张图片...", keyword, session.urls().len());
        let mut stats = DownloadStats::default();

        let urls = session.urls().to_vec();
        for (sequence, url) in urls.iter().enumerate() {
            match self.downloader.download(url, output_dir, keyword, sequence).await {
                Ok(DownloadOutcome::Saved { filename, path }) => {
                    info!("💾 已保存: {}", path.display());
                    session.ledger.mark_saved(url, &filename, &path);
                    stats.saved += 1;
                }
                Ok(DownloadOutcome::OutOfBounds { width, height }) => {
                    warn!("图片 {} 尺寸 {}x{} 不在范围内，跳过", url, width, height);
                    stats.skipped += 1;
                }
                Err(e) => {
                    warn!("图片 #{} 下载跳过: {}", sequence + 1, e);
                    stats.skipped += 1;
                }
            }
        }

        let metadata_path: PathBuf = output_dir.join(METADATA_FILE);
        match session.ledger().persist(&metadata_path) {
            Ok(()) => info!("📝 元数据已写入: {}", metadata_path.display()),
            Err(e) => error!("写入 {} 失败: {}", METADATA_FILE, e),
        }

        info!(
            "[{}] 下载完成: 保存 {} / 跳过 {} / 共 {}",
            keyword,
            stats.saved,
            stats.skipped,
            urls.len()
        );
        stats
    }
}

/// 只接受 http/https 地址
pub fn is_http_url(src: &str) -> bool {
    Url::parse(src)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

fn as_number(value: &JsonValue) -> f64 {
    value.as_f64().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url_encodes_keyword() {
        let url = search_url("almaty mountains & lakes").unwrap();
        assert!(url.starts_with("https://www.google.com/search?q=almaty+mountains+%26+lakes"));
        assert!(url.ends_with("&source=lnms&tbm=isch"));
    }

    #[test]
    fn test_is_http_url() {
        assert!(is_http_url("https://upload.wikimedia.org/yurt.jpg"));
        assert!(is_http_url("http://127.0.0.1:8080/a.png"));
        assert!(!is_http_url("httpfoo:bar"));
        assert!(!is_http_url("data:image/jpeg;base64,abc"));
        assert!(!is_http_url("/relative.png"));
    }

    #[test]
    fn test_session_dedup_and_ids() {
        let mut session = ScraperSession::new(10);
        assert_eq!(session.accept("https://a/1.jpg", "<img>"), Some(0));
        assert_eq!(session.accept("https://a/1.jpg", "<img>"), None);
        assert_eq!(session.accept("https://a/2.jpg", "<img>"), Some(1));
        assert_eq!(session.urls().len(), 2);
        assert_eq!(session.ledger().len(), 2);
    }

    #[test]
    fn test_session_miss_threshold() {
        let mut session = ScraperSession::new(1);
        assert!(!session.record_miss(2));
        assert!(!session.record_miss(2));
        assert!(session.record_miss(2));
        assert_eq!(session.missed(), 3);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ScrapeState::Discover.to_string(), "DISCOVER");
    }
}
