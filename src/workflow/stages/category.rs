use async_trait::async_trait;
use tracing::{error, info};

use crate::error::AppResult;
use crate::models::PipelineState;
use crate::services::CategoryAgent;
use crate::utils::logging::log_stage_start;
use crate::workflow::graph::Stage;

/// 类别阶段：从输入文本提取类别，并清空下游结果
pub struct CategoryStage {
    agent: CategoryAgent,
}

impl CategoryStage {
    pub fn new(agent: CategoryAgent) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl Stage for CategoryStage {
    async fn run(&self, mut state: PipelineState) -> AppResult<PipelineState> {
        log_stage_start("提取类别");

        state.categories = match self.agent.extract_categories(&state.free_text).await {
            Ok(categories) => {
                info!("✓ 提取到 {} 个类别", categories.len());
                categories
            }
            Err(e) => {
                error!("❌ 提取类别失败，返回空列表: {}", e);
                Vec::new()
            }
        };

        state.category_subcategories.clear();
        state.category_subcategory_keywords.clear();
        state.collection_results.clear();
        state.current_category.clear();
        state.current_subcategory.clear();
        state.current_keyword.clear();
        Ok(state)
    }
}
