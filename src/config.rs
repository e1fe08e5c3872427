use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult, ConfigError, FileError};

/// 分辨率（宽, 高）
pub type Resolution = (u32, u32);

/// LLM 提供方
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
    Google,
}

impl LlmProvider {
    pub fn parse(value: &str) -> AppResult<Self> {
        match value.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "google" => Ok(Self::Google),
            other => Err(ConfigError::UnsupportedProvider {
                provider: other.to_string(),
            }
            .into()),
        }
    }

    /// 兼容 OpenAI API 的默认端点
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Anthropic => "https://api.anthropic.com/v1",
            Self::Google => "https://generativelanguage.googleapis.com/v1beta/openai",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o-mini",
            Self::Anthropic => "claude-3-haiku-20240307",
            Self::Google => "gemini-2.5-flash",
        }
    }
}

/// 程序配置
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- LLM 配置 ---
    pub llm_provider: LlmProvider,
    pub llm_api_key: String,
    /// 为空时使用提供方默认端点
    pub llm_api_base_url: Option<String>,
    /// 为空时使用提供方默认模型
    pub llm_model_name: Option<String>,
    /// 相邻两次生成调用之间的间隔（秒）
    pub api_delay_seconds: f64,

    // --- 采集配置 ---
    /// 数据根目录
    pub data_dir: String,
    /// 最终结果输出文件
    pub output_file: String,
    /// 每个关键词采集的图片数量
    pub items_per_keyword: usize,
    /// 是否使用无头模式
    pub headless: bool,
    pub min_resolution: Resolution,
    pub max_resolution: Resolution,
    /// 连续点击失败的最大容忍次数
    pub max_missed: usize,
    /// 单张图片下载超时（秒）
    pub download_timeout_seconds: u64,
    /// 同时采集的关键词数量
    pub max_concurrent_keywords: usize,
    /// Chrome 可执行文件路径
    pub chrome_executable: Option<String>,
    /// 设置后连接到已运行的浏览器，而不是启动新浏览器
    pub browser_debug_port: Option<u16>,

    // --- 日志配置 ---
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_provider: LlmProvider::Google,
            llm_api_key: String::new(),
            llm_api_base_url: None,
            llm_model_name: None,
            api_delay_seconds: 1.5,
            data_dir: "data".to_string(),
            output_file: "results.json".to_string(),
            items_per_keyword: 30,
            headless: true,
            min_resolution: (400, 400),
            max_resolution: (8000, 8000),
            max_missed: 200,
            download_timeout_seconds: 5,
            max_concurrent_keywords: 1,
            chrome_executable: None,
            browser_debug_port: None,
            verbose_logging: false,
            output_log_file: "pipeline_log.txt".to_string(),
        }
    }
}

impl Config {
    /// 加载配置：默认值 → TOML 文件（PIPELINE_CONFIG）→ 环境变量
    pub fn load() -> AppResult<Self> {
        let base = match std::env::var("PIPELINE_CONFIG") {
            Ok(path) => Self::from_toml_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        base.apply_env()
    }

    pub fn from_env() -> AppResult<Self> {
        Self::default().apply_env()
    }

    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| FileError::ReadFailed {
            path: path.display().to_string(),
            source: e,
        })?;
        let config = toml::from_str(&content).map_err(|e| FileError::TomlParseFailed {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(config)
    }

    fn apply_env(self) -> AppResult<Self> {
        let d = self;
        let config = Self {
            llm_provider: match std::env::var("LLM_PROVIDER") {
                Ok(v) => LlmProvider::parse(&v)?,
                Err(_) => d.llm_provider,
            },
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(d.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").ok().or(d.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL").ok().or(d.llm_model_name),
            api_delay_seconds: env_parse("API_DELAY_SECONDS", "f64")?.unwrap_or(d.api_delay_seconds),
            data_dir: std::env::var("DATA_DIR").unwrap_or(d.data_dir),
            output_file: std::env::var("OUTPUT_FILE").unwrap_or(d.output_file),
            items_per_keyword: env_parse("ITEMS_PER_KEYWORD", "usize")?.unwrap_or(d.items_per_keyword),
            headless: std::env::var("HEADLESS")
                .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
                .unwrap_or(d.headless),
            min_resolution: match std::env::var("MIN_RESOLUTION") {
                Ok(v) => parse_resolution("MIN_RESOLUTION", &v)?,
                Err(_) => d.min_resolution,
            },
            max_resolution: match std::env::var("MAX_RESOLUTION") {
                Ok(v) => parse_resolution("MAX_RESOLUTION", &v)?,
                Err(_) => d.max_resolution,
            },
            max_missed: env_parse("MAX_MISSED", "usize")?.unwrap_or(d.max_missed),
            download_timeout_seconds: env_parse("DOWNLOAD_TIMEOUT_SECONDS", "u64")?
                .unwrap_or(d.download_timeout_seconds),
            max_concurrent_keywords: env_parse("MAX_CONCURRENT_KEYWORDS", "usize")?
                .unwrap_or(d.max_concurrent_keywords),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok().or(d.chrome_executable),
            browser_debug_port: env_parse("BROWSER_DEBUG_PORT", "u16")?.or(d.browser_debug_port),
            verbose_logging: env_parse("VERBOSE_LOGGING", "bool")?.unwrap_or(d.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(d.output_log_file),
        };
        config.api_delay()?;
        Ok(config)
    }

    /// 负数按 0 处理；无穷大等无法表示的值报错
    pub fn api_delay(&self) -> AppResult<Duration> {
        Duration::try_from_secs_f64(self.api_delay_seconds.max(0.0)).map_err(|_| {
            AppError::Config(ConfigError::EnvVarParseFailed {
                var_name: "API_DELAY_SECONDS".to_string(),
                value: self.api_delay_seconds.to_string(),
                expected_type: "f64 (有限的非负秒数)".to_string(),
            })
        })
    }

    pub fn llm_base_url(&self) -> String {
        self.llm_api_base_url
            .clone()
            .unwrap_or_else(|| self.llm_provider.default_base_url().to_string())
    }

    pub fn llm_model(&self) -> String {
        self.llm_model_name
            .clone()
            .unwrap_or_else(|| self.llm_provider.default_model().to_string())
    }

    /// 提取交给采集器的配置
    pub fn collection_config(&self) -> CollectionConfig {
        CollectionConfig {
            data_path: PathBuf::from(&self.data_dir),
            number_of_images: self.items_per_keyword,
            headless: self.headless,
            min_resolution: self.min_resolution,
            max_resolution: self.max_resolution,
            max_missed: self.max_missed,
            download_timeout_seconds: self.download_timeout_seconds,
            chrome_executable: self.chrome_executable.clone(),
            browser_debug_port: self.browser_debug_port,
        }
    }
}

/// 采集器配置
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub data_path: PathBuf,
    pub number_of_images: usize,
    pub headless: bool,
    pub min_resolution: Resolution,
    pub max_resolution: Resolution,
    pub max_missed: usize,
    pub download_timeout_seconds: u64,
    pub chrome_executable: Option<String>,
    pub browser_debug_port: Option<u16>,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Config::default().collection_config()
    }
}

impl CollectionConfig {
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_seconds)
    }
}

fn env_parse<T: std::str::FromStr>(var_name: &str, expected_type: &str) -> AppResult<Option<T>> {
    match std::env::var(var_name) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| {
                AppError::Config(ConfigError::EnvVarParseFailed {
                    var_name: var_name.to_string(),
                    value,
                    expected_type: expected_type.to_string(),
                })
            }),
        Err(_) => Ok(None),
    }
}

/// 解析 "宽,高" 格式的分辨率
pub fn parse_resolution(var_name: &str, value: &str) -> AppResult<Resolution> {
    let parse_err = || {
        AppError::Config(ConfigError::EnvVarParseFailed {
            var_name: var_name.to_string(),
            value: value.to_string(),
            expected_type: "宽,高".to_string(),
        })
    };

    let mut parts = value.split(',').map(|p| p.trim().parse::<u32>());
    match (parts.next(), parts.next()) {
        (Some(Ok(w)), Some(Ok(h))) => Ok((w, h)),
        _ => Err(parse_err()),
    }
}
