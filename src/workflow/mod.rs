//! 流程层（Workflow Layer）
//!
//! 定义"一次运行"的完整流程：工作流图、构建器和四个阶段。
//! 不持有浏览器资源，只依赖 services 和 collectors 提供的能力。

pub mod builder;
pub mod context;
pub mod graph;
pub mod stages;

pub use builder::PipelineBuilder;
pub use context::{create_pipeline, PipelineContext};
pub use graph::{CompiledWorkflow, EdgePredicate, Stage, WorkflowGraph, END};
pub use stages::{CategoryStage, CollectionStage, KeywordStage, SubcategoryStage};
