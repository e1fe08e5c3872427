use std::path::Path;

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::error::{AppError, AppResult, BrowserError};

/// 浏览器启动参数
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub chrome_executable: Option<String>,
    pub window_size: (u32, u32),
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_executable: None,
            window_size: (1400, 1050),
        }
    }
}

/// 启动浏览器并打开一个空白页面
///
/// 返回的 `JoinHandle` 是后台事件循环，关闭浏览器后应当 abort
pub async fn launch_headless_browser(options: &LaunchOptions) -> AppResult<(Browser, Page, JoinHandle<()>)> {
    info!("🚀 启动浏览器 (无头模式: {})...", options.headless);

    let mut builder = BrowserConfig::builder();
    builder = if options.headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };
    if let Some(executable) = &options.chrome_executable {
        debug!("使用 Chrome: {}", executable);
        builder = builder.chrome_executable(Path::new(executable));
    }

    let (width, height) = options.window_size;
    let config = builder
        .window_size(width, height)
        .args(vec![
            "--no-sandbox",            // 禁用沙盒，防止权限问题导致的崩溃
            "--disable-dev-shm-usage", // 防止共享内存不足
            "--disable-gpu",
        ])
        .build()
        .map_err(|e| {
            error!("配置浏览器失败: {}", e);
            AppError::Browser(BrowserError::LaunchFailed { source: e.into() })
        })?;

    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        AppError::browser_launch_failed(e)
    })?;
    debug!("浏览器启动成功");

    // 在后台处理浏览器事件
    let handler_task = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    let page = match browser.new_page("about:blank").await {
        Ok(page) => page,
        Err(e) => {
            error!("创建页面失败: {}", e);
            handler_task.abort();
            return Err(AppError::browser_launch_failed(e));
        }
    };

    Ok((browser, page, handler_task))
}
