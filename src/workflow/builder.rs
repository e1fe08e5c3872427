use std::sync::Arc;

use tracing::debug;

use crate::error::{AppResult, WorkflowError};
use crate::models::{ConfigBag, PipelineState};
use crate::workflow::graph::{CompiledWorkflow, Stage, WorkflowGraph, END};

/// 流水线构建器
///
/// - `add_node` 自动从上一个添加的节点连一条边过来
/// - `build` 时如果最后一个节点没有出边，自动连到 END
#[derive(Clone, Default)]
pub struct PipelineBuilder {
    graph: WorkflowGraph,
    last_node: Option<String>,
    config: ConfigBag,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: ConfigBag) -> Self {
        self.config = config;
        self
    }

    pub fn add_node(&mut self, name: impl Into<String>, stage: Arc<dyn Stage>) -> &mut Self {
        let name = name.into();
        if let Some(previous) = self.last_node.take() {
            self.graph.add_edge(previous, name.clone());
        }
        self.graph.add_node(name.clone(), stage);
        self.last_node = Some(name);
        self
    }

    /// 添加节点并从指定节点连边（不从上一个节点自动连）
    pub fn add_node_after(&mut self, name: impl Into<String>, stage: Arc<dyn Stage>, after: &str) -> &mut Self {
        let name = name.into();
        self.graph.add_node(name.clone(), stage);
        self.graph.add_edge(after, name.clone());
        self.last_node = Some(name);
        self
    }

    pub fn add_edge(&mut self, from: &str, to: &str) -> &mut Self {
        self.graph.add_edge(from, to);
        self
    }

    pub fn add_conditional_edge<P>(&mut self, from: &str, to: &str, predicate: P) -> &mut Self
    where
        P: Fn(&PipelineState) -> bool + Send + Sync + 'static,
    {
        self.graph.add_conditional_edge(from, to, predicate);
        self
    }

    pub fn connect_to_end(&mut self, name: &str) -> &mut Self {
        self.graph.add_edge(name, END);
        self
    }

    pub fn set_entry_point(&mut self, name: &str) -> &mut Self {
        self.graph.set_entry_point(name);
        self
    }

    pub fn build(&self) -> AppResult<CompiledWorkflow> {
        if self.graph.node_count() == 0 {
            return Err(WorkflowError::NoNodes.into());
        }

        let mut graph = self.graph.clone();
        if let Some(last) = &self.last_node {
            if !graph.has_outgoing(last) {
                debug!("最后一个节点 {} 自动连接到 END", last);
                graph.add_edge(last.clone(), END);
            }
        }
        graph.compile()
    }

    /// 创建初始状态，`original_context` 缺省时取 `free_text`
    pub fn create_initial_state(&self, free_text: &str, original_context: Option<&str>) -> PipelineState {
        PipelineState::new(free_text, original_context.map(str::to_string), self.config.clone())
    }
}
