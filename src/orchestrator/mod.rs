//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `pipeline_runner` - 流水线运行器
//! - 管理应用生命周期（初始化、运行）
//! - 写出结果文件并输出全局统计
//!
//! ### `keyword_pool` - 关键词采集池
//! - 控制关键词采集的并发数量（Semaphore）
//! - 按提交顺序收集结果
//!
//! ## 层次关系
//!
//! ```text
//! pipeline_runner (一次运行)
//!     ↓
//! workflow (类别 → 子类别 → 关键词 → 采集)
//!     ↓                         ↓
//! services (生成代理)     keyword_pool → collectors (抓取引擎)
//!                                         ↓
//!                                   browser / infrastructure
//! ```

pub mod keyword_pool;
pub mod pipeline_runner;

pub use keyword_pool::{collect_keywords, KeywordJob};
pub use pipeline_runner::{write_results, App};
