//! 基于 chromiumoxide 的浏览器驱动

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chromiumoxide::element::Element;
use chromiumoxide::{Browser, Page};
use serde_json::Value as JsonValue;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::browser::connection::connect_to_browser;
use crate::browser::driver::{BrowserDriver, DriverFactory, ElementHandle};
use crate::browser::headless::{launch_headless_browser, LaunchOptions};
use crate::config::CollectionConfig;
use crate::error::{AppError, AppResult, BrowserError};
use crate::infrastructure::JsExecutor;

/// chromiumoxide 驱动
///
/// 一个实例对应一个关键词的抓取会话：
/// - 启动模式下拥有整个浏览器进程，quit 时关闭浏览器
/// - 连接模式下只拥有自己新建的页面，quit 时只关闭该页面
pub struct ChromiumDriver {
    executor: JsExecutor,
    browser: tokio::sync::Mutex<Option<Browser>>,
    handler: Mutex<Option<JoinHandle<()>>>,
    elements: Mutex<Vec<Arc<Element>>>,
    owns_browser: bool,
    closed: AtomicBool,
}

impl ChromiumDriver {
    pub async fn launch(options: &LaunchOptions) -> AppResult<Self> {
        let (browser, page, handler) = launch_headless_browser(options).await?;
        Ok(Self::new(browser, JsExecutor::new(page), handler, true))
    }

    pub async fn attach(port: u16) -> AppResult<Self> {
        let (browser, page, handler) = connect_to_browser(port).await?;
        Ok(Self::new(browser, JsExecutor::new(page), handler, false))
    }

    fn new(browser: Browser, executor: JsExecutor, handler: JoinHandle<()>, owns_browser: bool) -> Self {
        Self {
            executor,
            browser: tokio::sync::Mutex::new(Some(browser)),
            handler: Mutex::new(Some(handler)),
            elements: Mutex::new(Vec::new()),
            owns_browser,
            closed: AtomicBool::new(false),
        }
    }

    fn register(&self, found: Vec<Element>) -> Vec<ElementHandle> {
        let mut elements = self.elements.lock().unwrap_or_else(|e| e.into_inner());
        found
            .into_iter()
            .map(|element| {
                elements.push(Arc::new(element));
                ElementHandle(elements.len() - 1)
            })
            .collect()
    }

    fn element(&self, handle: ElementHandle) -> AppResult<Arc<Element>> {
        let elements = self.elements.lock().unwrap_or_else(|e| e.into_inner());
        elements
            .get(handle.0)
            .cloned()
            .ok_or_else(|| BrowserError::StaleElement { id: handle.0 }.into())
    }

    fn abort_handler(&self) {
        if let Some(handler) = self.handler.lock().unwrap_or_else(|e| e.into_inner()).take() {
            handler.abort();
        }
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn navigate(&self, url: &str) -> AppResult<()> {
        debug!("导航到: {}", url);
        self.executor
            .page()
            .goto(url)
            .await
            .map_err(|e| AppError::navigation_failed(url, e))?;
        // 新页面上的旧句柄全部失效
        self.elements.lock().unwrap_or_else(|e| e.into_inner()).clear();
        Ok(())
    }

    async fn find_elements(&self, selector: &str) -> AppResult<Vec<ElementHandle>> {
        let found = self.executor.page().find_elements(selector).await?;
        Ok(self.register(found))
    }

    async fn scroll_into_view(&self, element: ElementHandle) -> AppResult<()> {
        self.element(element)?.scroll_into_view().await?;
        Ok(())
    }

    async fn read_attribute(&self, element: ElementHandle, name: &str) -> AppResult<Option<String>> {
        Ok(self.element(element)?.attribute(name).await?)
    }

    async fn execute_script(&self, js: &str, element: ElementHandle) -> AppResult<JsonValue> {
        let returns = self.element(element)?.call_js_fn(js, false).await?;
        Ok(returns.result.value.unwrap_or(JsonValue::Null))
    }

    async fn click(&self, element: ElementHandle) -> AppResult<()> {
        self.element(element)?
            .click()
            .await
            .map_err(|e| BrowserError::ClickFailed { reason: e.to_string() })?;
        Ok(())
    }

    async fn count_elements(&self, selector: &str) -> AppResult<usize> {
        self.executor.count(selector).await
    }

    async fn quit(&self) -> AppResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        self.elements.lock().unwrap_or_else(|e| e.into_inner()).clear();
        let browser = self.browser.lock().await.take();
        let result = release_session(browser, self.executor.page().clone(), self.owns_browser).await;

        self.abort_handler();
        debug!("浏览器会话已释放");
        result
    }
}

/// 启动模式关闭整个浏览器，连接模式只关闭自己的页面
async fn release_session(browser: Option<Browser>, page: Page, owns_browser: bool) -> AppResult<()> {
    if !owns_browser {
        drop(browser);
        return page.close().await.map_err(AppError::from);
    }

    match browser {
        Some(mut browser) => {
            let closed = browser.close().await.map(|_| ());
            if let Err(e) = browser.wait().await {
                warn!("等待浏览器进程退出失败: {}", e);
            }
            closed.map_err(AppError::from)
        }
        None => Ok(()),
    }
}

/// 未调用 quit 就被丢弃时（panic、future 被取消）在后台补做释放
impl Drop for ChromiumDriver {
    fn drop(&mut self) {
        let handler = self.handler.get_mut().unwrap_or_else(|e| e.into_inner()).take();
        if self.closed.swap(true, Ordering::SeqCst) {
            if let Some(handler) = handler {
                handler.abort();
            }
            return;
        }

        let browser = self.browser.get_mut().take();
        let page = self.executor.page().clone();
        let owns_browser = self.owns_browser;

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                warn!("⚠️ 浏览器会话未显式释放，后台关闭");
                runtime.spawn(async move {
                    if let Err(e) = release_session(browser, page, owns_browser).await {
                        warn!("后台释放浏览器会话失败: {}", e);
                    }
                    // 关闭命令要靠事件循环送达，完成后再停掉
                    if let Some(handler) = handler {
                        handler.abort();
                    }
                });
            }
            Err(_) => {
                warn!("⚠️ 没有可用的运行时，无法关闭浏览器会话");
                if let Some(handler) = handler {
                    handler.abort();
                }
            }
        }
    }
}

/// 按采集配置创建 chromiumoxide 会话
pub struct ChromiumDriverFactory {
    launch_options: LaunchOptions,
    debug_port: Option<u16>,
}

impl ChromiumDriverFactory {
    pub fn new(config: &CollectionConfig) -> Self {
        Self {
            launch_options: LaunchOptions {
                headless: config.headless,
                chrome_executable: config.chrome_executable.clone(),
                ..LaunchOptions::default()
            },
            debug_port: config.browser_debug_port,
        }
    }
}

#[async_trait]
impl DriverFactory for ChromiumDriverFactory {
    async fn open(&self) -> AppResult<Box<dyn BrowserDriver>> {
        let driver = match self.debug_port {
            Some(port) => ChromiumDriver::attach(port).await?,
            None => ChromiumDriver::launch(&self.launch_options).await?,
        };
        Ok(Box::new(driver))
    }
}
