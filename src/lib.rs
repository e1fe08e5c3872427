//! # Agentic Data Pipeline
//!
//! 从一段描述国家或文化的文本出发，自动生成类别、子类别和搜索关键词，
//! 再按关键词抓取并筛选图片的 Rust 数据采集流水线
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `JsExecutor` - 唯一的 page owner，提供 eval() 能力
//! - `browser/` - 启动或连接浏览器，`BrowserDriver` 驱动接口
//!
//! ### ② 业务能力层（Services / Collectors）
//! - `services/` - 生成能力与三个代理
//! - `LlmService` - OpenAI 兼容的生成能力
//! - `CategoryAgent` / `SubcategoryAgent` / `KeywordAgent` - 拼提示词、解析结果
//! - `collectors/` - `Collector` 契约、`ImageCollector`、`ImageScraper` 抓取引擎
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 工作流图、构建器和四个阶段
//! - `PipelineContext` - 运行前构造一次的上下文
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/pipeline_runner` - 应用生命周期、结果文件和统计
//! - `orchestrator/keyword_pool` - 关键词采集并发控制
//!
//! ## 模块结构

pub mod browser;
pub mod collectors;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use collectors::{Collector, ImageCollector, ImageScraper};
pub use config::{CollectionConfig, Config};
pub use error::{AppError, AppResult};
pub use infrastructure::JsExecutor;
pub use models::{CollectionResult, PipelineReport, PipelineState};
pub use orchestrator::App;
pub use workflow::{create_pipeline, PipelineBuilder, PipelineContext};
