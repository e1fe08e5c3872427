use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 工作流相关错误
    #[error("工作流错误: {0}")]
    Workflow(#[from] WorkflowError),
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 数据采集错误
    #[error("采集错误: {0}")]
    Collection(#[from] CollectionError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 工作流相关错误
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// 没有添加任何节点
    #[error("没有添加任何节点")]
    NoNodes,
    /// 未设置入口节点
    #[error("未设置入口节点")]
    NoEntryPoint,
    /// 节点不存在
    #[error("节点不存在: {name}")]
    UnknownNode { name: String },
    /// 节点名称重复
    #[error("节点名称重复: {name}")]
    DuplicateNode { name: String },
    /// 节点没有可走的出边
    #[error("节点 {name} 没有满足条件的出边")]
    DeadEnd { name: String },
    /// 超过最大执行步数
    #[error("超过最大执行步数 {limit}")]
    StepLimitExceeded { limit: usize },
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 启动浏览器失败
    #[error("启动浏览器失败: {source}")]
    LaunchFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 连接浏览器失败
    #[error("无法连接到浏览器 (端口: {port}): {source}")]
    ConnectionFailed {
        port: u16,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 导航失败
    #[error("导航到 {url} 失败: {source}")]
    NavigationFailed {
        url: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 等待元素超时
    #[error("等待元素 {selector} 超时 ({timeout_ms}ms)")]
    WaitTimeout { selector: String, timeout_ms: u64 },
    /// 元素句柄失效
    #[error("元素句柄无效: #{id}")]
    StaleElement { id: usize },
    /// 点击失败
    #[error("点击元素失败: {reason}")]
    ClickFailed { reason: String },
    /// 执行脚本失败
    #[error("执行脚本失败: {source}")]
    ScriptExecutionFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {source}")]
    ApiCallFailed {
        model: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
    /// 返回内容不是合法 JSON
    #[error("无法解析LLM返回的JSON (响应: {response}): {source}")]
    JsonParseFailed {
        response: String,
        source: serde_json::Error,
    },
    /// 请求构建失败
    #[error("构建LLM请求失败: {0}")]
    RequestBuildFailed(String),
}

/// 数据采集错误
#[derive(Debug, Error)]
pub enum CollectionError {
    /// 点击失败次数超过阈值
    #[error("点击失败次数 {missed} 超过阈值 {max_missed}")]
    TooManyMissedClicks { missed: usize, max_missed: usize },
    /// 下载失败
    #[error("下载 {url} 失败: {reason}")]
    DownloadFailed { url: String, reason: String },
    /// 图片解码失败
    #[error("图片解码失败 ({url}): {reason}")]
    DecodeFailed { url: String, reason: String },
    /// 采集器内部错误
    #[error("关键词 '{keyword}' 采集失败: {reason}")]
    CollectorFailed { keyword: String, reason: String },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        source: std::io::Error,
    },
    /// 创建目录失败
    #[error("创建目录失败 ({path}): {source}")]
    CreateDirFailed {
        path: String,
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        source: toml::de::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 不支持的 LLM 提供方
    #[error("不支持的 LLM 提供方: {provider} (可选: openai, anthropic, google)")]
    UnsupportedProvider { provider: String },
    /// 缺少 API 密钥
    #[error("环境变量 LLM_API_KEY 未设置")]
    MissingApiKey,
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::ScriptExecutionFailed {
            source: Box::new(err),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Other(format!("JSON处理失败: {}", err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: String::new(),
            source: err,
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建浏览器连接错误
    pub fn browser_connection_failed(
        port: u16,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::ConnectionFailed {
            port,
            source: Box::new(source),
        })
    }

    /// 创建浏览器启动错误
    pub fn browser_launch_failed(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        AppError::Browser(BrowserError::LaunchFailed {
            source: Box::new(source),
        })
    }

    /// 创建导航错误
    pub fn navigation_failed(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::NavigationFailed {
            url: url.into(),
            source: Box::new(source),
        })
    }

    /// 创建LLM API调用错误
    pub fn llm_api_failed(
        model: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Llm(LlmError::ApiCallFailed {
            model: model.into(),
            source: Box::new(source),
        })
    }

    /// 创建目录创建错误
    pub fn create_dir_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::CreateDirFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }

    /// 是否为浏览器等待超时
    pub fn is_wait_timeout(&self) -> bool {
        matches!(self, AppError::Browser(BrowserError::WaitTimeout { .. }))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_error_display() {
        let err: AppError = WorkflowError::NoEntryPoint.into();
        assert_eq!(err.to_string(), "工作流错误: 未设置入口节点");
    }

    #[test]
    fn test_is_wait_timeout() {
        let err: AppError = BrowserError::WaitTimeout {
            selector: "img".to_string(),
            timeout_ms: 10_000,
        }
        .into();
        assert!(err.is_wait_timeout());
        assert!(!AppError::Other("x".to_string()).is_wait_timeout());
    }
}
