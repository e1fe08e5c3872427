//! 浏览器自动化能力
//!
//! 抓取引擎只通过这个 trait 操作浏览器，方便替换实现（chromiumoxide / 测试桩）

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::time::{sleep, Instant};

use crate::error::{AppResult, BrowserError};

/// 轮询间隔
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// 元素句柄（由驱动分配，只在同一会话内有效）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub usize);

#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> AppResult<()>;

    async fn find_elements(&self, selector: &str) -> AppResult<Vec<ElementHandle>>;

    async fn scroll_into_view(&self, element: ElementHandle) -> AppResult<()>;

    async fn read_attribute(&self, element: ElementHandle, name: &str) -> AppResult<Option<String>>;

    /// 以元素为 `this` 执行一个 JS 函数声明
    async fn execute_script(&self, js: &str, element: ElementHandle) -> AppResult<JsonValue>;

    async fn click(&self, element: ElementHandle) -> AppResult<()>;

    /// 释放会话，必须可以重复调用
    async fn quit(&self) -> AppResult<()>;

    /// 匹配选择器的元素数量
    async fn count_elements(&self, selector: &str) -> AppResult<usize> {
        Ok(self.find_elements(selector).await?.len())
    }

    /// 等待直到匹配的元素数量超过 `more_than`，超时返回 `BrowserError::WaitTimeout`
    async fn wait_until(
        &self,
        selector: &str,
        more_than: usize,
        timeout: Duration,
    ) -> AppResult<Vec<ElementHandle>> {
        let deadline = Instant::now() + timeout;
        loop {
            // 查询出错视为条件尚未满足
            if let Ok(count) = self.count_elements(selector).await {
                if count > more_than {
                    let elements = self.find_elements(selector).await?;
                    if elements.len() > more_than {
                        return Ok(elements);
                    }
                }
            }

            if Instant::now() >= deadline {
                return Err(BrowserError::WaitTimeout {
                    selector: selector.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                }
                .into());
            }
            sleep(POLL_INTERVAL).await;
        }
    }
}

/// 创建浏览器会话的工厂，每个关键词一个会话
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn open(&self) -> AppResult<Box<dyn BrowserDriver>>;
}
