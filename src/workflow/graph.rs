//! 工作流图 - 流程层
//!
//! 节点是 `State -> State` 的阶段，边决定下一个节点。
//! 当前流水线是线性的，但边可以带条件，运行时按插入顺序取第一条满足条件的边。

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{AppResult, WorkflowError};
use crate::models::PipelineState;

/// 终止标记
pub const END: &str = "__end__";

/// 默认最大执行步数，防止条件边成环
pub const DEFAULT_STEP_LIMIT: usize = 64;

/// 阶段：接收状态，返回新状态
///
/// 返回 Err 会中止整个工作流，阶段内可降级的失败应自己吸收
#[async_trait]
pub trait Stage: Send + Sync {
    async fn run(&self, state: PipelineState) -> AppResult<PipelineState>;
}

#[async_trait]
impl<F, Fut> Stage for F
where
    F: Fn(PipelineState) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<PipelineState>> + Send + 'static,
{
    async fn run(&self, state: PipelineState) -> AppResult<PipelineState> {
        (self)(state).await
    }
}

/// 边条件
pub type EdgePredicate = Arc<dyn Fn(&PipelineState) -> bool + Send + Sync>;

#[derive(Clone)]
struct Edge {
    to: String,
    condition: Option<EdgePredicate>,
}

impl Edge {
    fn passes(&self, state: &PipelineState) -> bool {
        self.condition.as_ref().map_or(true, |condition| condition(state))
    }
}

/// 可编辑的工作流图
#[derive(Clone)]
pub struct WorkflowGraph {
    nodes: Vec<(String, Arc<dyn Stage>)>,
    edges: Vec<(String, Edge)>,
    entry_point: Option<String>,
    step_limit: usize,
}

impl Default for WorkflowGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowGraph {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            entry_point: None,
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }

    pub fn add_node(&mut self, name: impl Into<String>, stage: Arc<dyn Stage>) -> &mut Self {
        let name = name.into();
        debug!("添加节点: {}", name);
        self.nodes.push((name, stage));
        self
    }

    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        let (from, to) = (from.into(), to.into());
        debug!("添加边: {} -> {}", from, to);
        self.edges.push((from, Edge { to, condition: None }));
        self
    }

    pub fn add_conditional_edge<P>(&mut self, from: impl Into<String>, to: impl Into<String>, predicate: P) -> &mut Self
    where
        P: Fn(&PipelineState) -> bool + Send + Sync + 'static,
    {
        let (from, to) = (from.into(), to.into());
        debug!("添加条件边: {} -> {}", from, to);
        self.edges.push((
            from,
            Edge {
                to,
                condition: Some(Arc::new(predicate)),
            },
        ));
        self
    }

    pub fn set_entry_point(&mut self, name: impl Into<String>) -> &mut Self {
        let name = name.into();
        debug!("设置入口节点: {}", name);
        self.entry_point = Some(name);
        self
    }

    pub fn set_step_limit(&mut self, limit: usize) -> &mut Self {
        self.step_limit = limit;
        self
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn has_node(&self, name: &str) -> bool {
        self.nodes.iter().any(|(n, _)| n == name)
    }

    pub fn has_outgoing(&self, name: &str) -> bool {
        self.edges.iter().any(|(from, _)| from == name)
    }

    /// 校验并编译
    pub fn compile(&self) -> AppResult<CompiledWorkflow> {
        if self.nodes.is_empty() {
            return Err(WorkflowError::NoNodes.into());
        }
        let entry_point = self.entry_point.clone().ok_or(WorkflowError::NoEntryPoint)?;

        let mut nodes = HashMap::new();
        for (name, stage) in &self.nodes {
            if name == END || nodes.insert(name.clone(), stage.clone()).is_some() {
                return Err(WorkflowError::DuplicateNode { name: name.clone() }.into());
            }
        }

        if !nodes.contains_key(&entry_point) {
            return Err(WorkflowError::UnknownNode { name: entry_point }.into());
        }

        let mut edges: HashMap<String, Vec<Edge>> = HashMap::new();
        for (from, edge) in &self.edges {
            for endpoint in [from.as_str(), edge.to.as_str()] {
                if endpoint != END && !nodes.contains_key(endpoint) {
                    return Err(WorkflowError::UnknownNode {
                        name: endpoint.to_string(),
                    }
                    .into());
                }
            }
            edges.entry(from.clone()).or_default().push(edge.clone());
        }

        let edge_count: usize = edges.values().map(Vec::len).sum();
        let reachable = reachable_from(&entry_point, &edges);
        info!(
            "工作流编译完成: {} 个节点, {} 条边, 可达节点 {}",
            nodes.len(),
            edge_count,
            reachable.len()
        );

        Ok(CompiledWorkflow {
            nodes,
            edges,
            entry_point,
            step_limit: self.step_limit,
        })
    }
}

fn reachable_from(entry: &str, edges: &HashMap<String, Vec<Edge>>) -> HashSet<String> {
    let mut seen = HashSet::new();
    let mut stack = vec![entry.to_string()];
    while let Some(name) = stack.pop() {
        if name == END || !seen.insert(name.clone()) {
            continue;
        }
        if let Some(outgoing) = edges.get(&name) {
            stack.extend(outgoing.iter().map(|e| e.to.clone()));
        }
    }
    seen
}

/// 编译后的工作流
pub struct CompiledWorkflow {
    nodes: HashMap<String, Arc<dyn Stage>>,
    edges: HashMap<String, Vec<Edge>>,
    entry_point: String,
    step_limit: usize,
}

impl CompiledWorkflow {
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// 从 `from` 出发、当前状态下会走的下一个节点
    pub fn next_node(&self, from: &str, state: &PipelineState) -> Option<&str> {
        self.edges
            .get(from)?
            .iter()
            .find(|edge| edge.passes(state))
            .map(|edge| edge.to.as_str())
    }

    /// 从入口开始逐个执行阶段，直到 END
    pub async fn execute(&self, initial_state: PipelineState) -> AppResult<PipelineState> {
        info!("▶️ 开始执行工作流");
        let mut state = initial_state;
        let mut current = self.entry_point.clone();
        let mut steps = 0;

        while current != END {
            steps += 1;
            if steps > self.step_limit {
                return Err(WorkflowError::StepLimitExceeded { limit: self.step_limit }.into());
            }

            let stage = self
                .nodes
                .get(&current)
                .ok_or_else(|| WorkflowError::UnknownNode { name: current.clone() })?;
            debug!("执行节点: {} (第 {} 步)", current, steps);
            state = stage.run(state).await?;

            current = self
                .next_node(&current, &state)
                .ok_or_else(|| WorkflowError::DeadEnd { name: current.clone() })?
                .to_string();
        }

        info!("✓ 工作流执行完成 (共 {} 步)", steps);
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::Category;

    fn push_category(name: &'static str) -> Arc<dyn Stage> {
        Arc::new(move |mut state: PipelineState| async move {
            state.categories.push(Category::new(name, ""));
            Ok::<_, AppError>(state)
        })
    }

    fn names(state: &PipelineState) -> Vec<&str> {
        state.categories.iter().map(|c| c.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_linear_execution() {
        let mut graph = WorkflowGraph::new();
        graph
            .add_node("a", push_category("A"))
            .add_node("b", push_category("B"))
            .add_edge("a", "b")
            .add_edge("b", END)
            .set_entry_point("a");

        let workflow = graph.compile().unwrap();
        let state = workflow.execute(PipelineState::default()).await.unwrap();
        assert_eq!(names(&state), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_conditional_edge_first_passing_wins() {
        let mut graph = WorkflowGraph::new();
        graph
            .add_node("start", push_category("start"))
            .add_node("left", push_category("left"))
            .add_node("right", push_category("right"))
            .add_conditional_edge("start", "left", |s: &PipelineState| s.free_text == "left")
            .add_edge("start", "right")
            .add_edge("left", END)
            .add_edge("right", END)
            .set_entry_point("start");
        let workflow = graph.compile().unwrap();

        let state = workflow
            .execute(PipelineState::new("left", None, Default::default()))
            .await
            .unwrap();
        assert_eq!(names(&state), vec!["start", "left"]);

        let state = workflow
            .execute(PipelineState::new("other", None, Default::default()))
            .await
            .unwrap();
        assert_eq!(names(&state), vec!["start", "right"]);
    }

    #[tokio::test]
    async fn test_dead_end() {
        let mut graph = WorkflowGraph::new();
        graph
            .add_node("a", push_category("A"))
            .add_conditional_edge("a", END, |_: &PipelineState| false)
            .set_entry_point("a");

        let err = graph.compile().unwrap().execute(PipelineState::default()).await.unwrap_err();
        assert!(matches!(err, AppError::Workflow(WorkflowError::DeadEnd { ref name }) if name == "a"));
    }

    #[tokio::test]
    async fn test_step_limit_guards_cycles() {
        let mut graph = WorkflowGraph::new();
        graph
            .add_node("loop", push_category("x"))
            .add_edge("loop", "loop")
            .set_entry_point("loop")
            .set_step_limit(5);

        let err = graph.compile().unwrap().execute(PipelineState::default()).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Workflow(WorkflowError::StepLimitExceeded { limit: 5 })
        ));
    }

    #[test]
    fn test_compile_validation() {
        assert!(matches!(
            WorkflowGraph::new().compile(),
            Err(AppError::Workflow(WorkflowError::NoNodes))
        ));

        let mut graph = WorkflowGraph::new();
        graph.add_node("a", push_category("A"));
        assert!(matches!(
            graph.compile(),
            Err(AppError::Workflow(WorkflowError::NoEntryPoint))
        ));

        graph.set_entry_point("a").add_edge("a", "missing");
        assert!(matches!(
            graph.compile(),
            Err(AppError::Workflow(WorkflowError::UnknownNode { .. }))
        ));

        let mut graph = WorkflowGraph::new();
        graph
            .add_node("a", push_category("A"))
            .add_node("a", push_category("B"))
            .set_entry_point("a");
        assert!(matches!(
            graph.compile(),
            Err(AppError::Workflow(WorkflowError::DuplicateNode { .. }))
        ));
    }
}
