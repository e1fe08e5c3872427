use std::io::Cursor;
use std::path::Path;
use std::sync::{Arc, Mutex};

use agentic_data_pipeline::browser::{BrowserDriver, DriverFactory, ElementHandle};
use agentic_data_pipeline::collectors::{Collector, ImageCollector, ImageScraper};
use agentic_data_pipeline::config::CollectionConfig;
use agentic_data_pipeline::error::{AppResult, BrowserError};
use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, RgbImage};
use serde_json::{json, Value as JsonValue};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CONSENT_ID: usize = 1_000;
const PREVIEW_BASE: usize = 2_000;
/// 前几个缩略图是图标，渲染宽度不足
const ICONS: usize = 4;

#[derive(Debug, Default)]
struct DriverLog {
    clicked: Vec<usize>,
    last_clicked: Option<usize>,
    quit_calls: usize,
}

/// 模拟搜索结果页
#[derive(Clone)]
struct MockDriver {
    images: usize,
    fail_clicks: bool,
    /// 第 i 次成功点击后出现的大图 URL（循环取）
    previews: Vec<String>,
    log: Arc<Mutex<DriverLog>>,
}

impl MockDriver {
    fn new(images: usize, previews: Vec<String>) -> Self {
        Self {
            images,
            fail_clicks: false,
            previews,
            log: Arc::default(),
        }
    }

    fn failing_clicks(mut self) -> Self {
        self.fail_clicks = true;
        self
    }

    fn log(&self) -> std::sync::MutexGuard<'_, DriverLog> {
        self.log.lock().unwrap()
    }
}

#[async_trait]
impl BrowserDriver for MockDriver {
    async fn navigate(&self, _url: &str) -> AppResult<()> {
        Ok(())
    }

    async fn find_elements(&self, selector: &str) -> AppResult<Vec<ElementHandle>> {
        Ok(match selector {
            "#W0wltc" => vec![ElementHandle(CONSENT_ID)],
            "img" => (0..self.images).map(ElementHandle).collect(),
            "img.iPVvYb" => self
                .log()
                .last_clicked
                .map(|id| vec![ElementHandle(PREVIEW_BASE + id)])
                .unwrap_or_default(),
            _ => Vec::new(),
        })
    }

    async fn scroll_into_view(&self, _element: ElementHandle) -> AppResult<()> {
        Ok(())
    }

    async fn read_attribute(&self, element: ElementHandle, name: &str) -> AppResult<Option<String>> {
        if name != "src" {
            return Ok(None);
        }
        if element.0 >= PREVIEW_BASE {
            let clicks = self.log().clicked.len();
            let url = &self.previews[(clicks - 1) % self.previews.len()];
            return Ok(Some(url.clone()));
        }
        Ok(Some(format!("data:image/jpeg;base64,thumb{}", element.0)))
    }

    async fn execute_script(&self, js: &str, element: ElementHandle) -> AppResult<JsonValue> {
        if js.contains("naturalWidth") {
            return Ok(json!(1024));
        }
        if js.contains("outerHTML") {
            return Ok(json!(format!("<img class=\"iPVvYb\" data-id=\"{}\">", element.0)));
        }
        let width = if element.0 < ICONS { 24 } else { 120 };
        Ok(json!(width))
    }

    async fn click(&self, element: ElementHandle) -> AppResult<()> {
        if element.0 == CONSENT_ID {
            return Ok(());
        }
        let mut log = self.log();
        log.clicked.push(element.0);
        if self.fail_clicks {
            return Err(BrowserError::ClickFailed {
                reason: "element not interactable".to_string(),
            }
            .into());
        }
        log.last_clicked = Some(element.0);
        Ok(())
    }

    async fn quit(&self) -> AppResult<()> {
        self.log().quit_calls += 1;
        Ok(())
    }
}

struct MockFactory {
    driver: MockDriver,
}

#[async_trait]
impl DriverFactory for MockFactory {
    async fn open(&self) -> AppResult<Box<dyn BrowserDriver>> {
        Ok(Box::new(self.driver.clone()))
    }
}

/// 打不开浏览器的工厂
struct UnavailableFactory;

#[async_trait]
impl DriverFactory for UnavailableFactory {
    async fn open(&self) -> AppResult<Box<dyn BrowserDriver>> {
        Err(BrowserError::LaunchFailed {
            source: "no browser".into(),
        }
        .into())
    }
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::new(width, height))
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

async fn serve_png(server: &MockServer, route: &str, width: u32, height: u32) -> String {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png(width, height)))
        .mount(server)
        .await;
    format!("{}{}", server.uri(), route)
}

fn config(dir: &Path, number_of_images: usize, max_missed: usize) -> CollectionConfig {
    CollectionConfig {
        data_path: dir.to_path_buf(),
        number_of_images,
        min_resolution: (400, 400),
        max_resolution: (8000, 8000),
        max_missed,
        ..CollectionConfig::default()
    }
}

fn read_metadata(dir: &Path) -> Vec<JsonValue> {
    let text = std::fs::read_to_string(dir.join("metadata.json")).unwrap();
    serde_json::from_str(&text).unwrap()
}

#[tokio::test]
async fn test_missed_click_threshold_stops_discovery() {
    let dir = tempfile::tempdir().unwrap();
    let driver = MockDriver::new(30, vec!["http://unused".to_string()]).failing_clicks();
    let scraper = ImageScraper::new(&config(dir.path(), 10, 2)).unwrap();

    let report = scraper.scrape(&driver, "yurt", dir.path()).await;

    assert!(report.success);
    assert_eq!(report.urls_found, 0);
    assert_eq!(report.saved, 0);
    let reason = report.stopped_early.expect("应记录提前停止的原因");
    assert!(reason.contains('3') && reason.contains('2'), "{}", reason);
    assert_eq!(driver.log().clicked.len(), 3);
    assert_eq!(driver.log().quit_calls, 1);
    assert!(read_metadata(dir.path()).is_empty());
}

#[tokio::test]
async fn test_duplicate_previews_are_collected_once() {
    let server = MockServer::start().await;
    let a = serve_png(&server, "/a.png", 640, 480).await;
    let b = serve_png(&server, "/b.png", 800, 600).await;
    let c = serve_png(&server, "/c.png", 1024, 768).await;

    let dir = tempfile::tempdir().unwrap();
    let driver = MockDriver::new(20, vec![a.clone(), a.clone(), b.clone(), a.clone(), c.clone()]);
    let scraper = ImageScraper::new(&config(dir.path(), 3, 200)).unwrap();

    let report = scraper.scrape(&driver, "yurt", dir.path()).await;

    assert!(report.success);
    assert_eq!(report.urls_found, 3);
    assert_eq!(report.saved, 3);
    assert_eq!(report.skipped, 0);
    assert!(report.stopped_early.is_none());

    {
        let log = driver.log();
        // 收满 3 个后停止点击，图标从不被点击
        assert_eq!(log.clicked.len(), 5);
        assert!(log.clicked.iter().all(|id| *id >= ICONS));
        assert_eq!(log.quit_calls, 1);
    }

    let metadata = read_metadata(dir.path());
    let ids: Vec<_> = metadata.iter().map(|m| m["id"].as_u64().unwrap()).collect();
    let urls: Vec<_> = metadata.iter().map(|m| m["url"].as_str().unwrap()).collect();
    assert_eq!(ids, vec![0, 1, 2]);
    assert_eq!(urls, vec![a.as_str(), b.as_str(), c.as_str()]);

    for n in 0..3 {
        assert!(dir.path().join(format!("yurt{}.png", n)).exists());
    }
    assert_eq!(metadata[1]["filename"], "yurt1.png");
}

#[tokio::test]
async fn test_resolution_filter_keeps_ledger_entry() {
    let server = MockServer::start().await;
    let small = serve_png(&server, "/small.png", 399, 500).await;
    let large = serve_png(&server, "/large.png", 400, 400).await;

    let dir = tempfile::tempdir().unwrap();
    let driver = MockDriver::new(20, vec![small.clone(), large.clone()]);
    let collector = ImageCollector::new(Arc::new(MockFactory {
        driver: driver.clone(),
    }));

    let outcome = collector
        .collect("dombra", dir.path(), &config(dir.path(), 2, 200))
        .await
        .unwrap();

    let keyword_dir = dir.path().join("dombra");
    assert!(outcome.success);
    assert_eq!(outcome.items_collected, 1);
    assert_eq!(outcome.skipped, 1);
    assert_eq!(outcome.urls_found, 2);
    assert_eq!(outcome.output_path, keyword_dir.display().to_string());

    assert!(!keyword_dir.join("dombra0.png").exists());
    assert!(keyword_dir.join("dombra1.png").exists());

    let metadata = read_metadata(&keyword_dir);
    assert_eq!(metadata.len(), 2);
    assert_eq!(metadata[0]["url"], small.as_str());
    assert!(metadata[0].get("filename").is_none());
    assert_eq!(metadata[1]["filename"], "dombra1.png");
    assert_eq!(driver.log().quit_calls, 1);
}

#[tokio::test]
async fn test_failed_download_is_skipped() {
    let server = MockServer::start().await;
    let good = serve_png(&server, "/good.png", 500, 500).await;
    Mock::given(method("GET"))
        .and(path("/gone.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let gone = format!("{}/gone.png", server.uri());

    let dir = tempfile::tempdir().unwrap();
    let driver = MockDriver::new(20, vec![gone, good]);
    let scraper = ImageScraper::new(&config(dir.path(), 2, 200)).unwrap();

    let report = scraper.scrape(&driver, "kumis", dir.path()).await;

    assert!(report.success);
    assert_eq!(report.total, 2);
    assert_eq!(report.saved, 1);
    assert_eq!(report.skipped, 1);
    assert!(dir.path().join("kumis1.png").exists());
}

#[tokio::test(start_paused = true)]
async fn test_discovery_timeout_is_hard_failure_and_releases_driver() {
    let dir = tempfile::tempdir().unwrap();
    // 只有 3 个 img，永远达不到 "超过 10 个"
    let driver = MockDriver::new(3, vec!["http://unused".to_string()]);
    let collector = ImageCollector::new(Arc::new(MockFactory {
        driver: driver.clone(),
    }));

    let outcome = collector
        .collect("steppe", dir.path(), &config(dir.path(), 5, 200))
        .await
        .unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.items_collected, 0);
    assert!(outcome.error.unwrap().contains("img"));
    assert!(driver.log().clicked.is_empty());
    assert_eq!(driver.log().quit_calls, 1);
}

#[tokio::test]
async fn test_keyword_with_separators_stays_in_keyword_dir() {
    let server = MockServer::start().await;
    let good = serve_png(&server, "/good.png", 500, 500).await;
    let dir = tempfile::tempdir().unwrap();

    for (keyword, stem) in [("AC/DC", "AC_DC"), ("../x", ".._x")] {
        let driver = MockDriver::new(20, vec![good.clone()]);
        let collector = ImageCollector::new(Arc::new(MockFactory { driver }));

        let outcome = collector
            .collect(keyword, dir.path(), &config(dir.path(), 1, 200))
            .await
            .unwrap();

        let keyword_dir = dir.path().join(stem);
        assert!(outcome.success, "{}: {:?}", keyword, outcome.error);
        assert_eq!(outcome.items_collected, 1, "{}", keyword);
        assert_eq!(outcome.skipped, 0, "{}", keyword);
        assert_eq!(outcome.output_path, keyword_dir.display().to_string());

        // 图片与 metadata.json 在同一目录
        let filename = format!("{}0.png", stem);
        assert!(keyword_dir.join(&filename).exists(), "{}", keyword);
        assert_eq!(read_metadata(&keyword_dir)[0]["filename"], filename.as_str());
    }

    assert!(!dir.path().join("x0.png").exists());
    assert!(!dir.path().parent().unwrap().join("x0.png").exists());
}

#[tokio::test]
async fn test_unavailable_browser_is_reported_per_keyword() {
    let dir = tempfile::tempdir().unwrap();
    let collector = ImageCollector::new(Arc::new(UnavailableFactory));

    let outcome = collector
        .collect("kumis", dir.path(), &config(dir.path(), 1, 200))
        .await
        .unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.items_collected, 0);
    assert_eq!(outcome.output_path, dir.path().display().to_string());
    let error = outcome.error.unwrap();
    assert!(error.contains("kumis") && error.contains("no browser"), "{}", error);
}
