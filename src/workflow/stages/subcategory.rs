use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{error, info};

use crate::error::AppResult;
use crate::models::PipelineState;
use crate::services::SubcategoryAgent;
use crate::utils::logging::log_stage_start;
use crate::workflow::graph::Stage;

/// 子类别阶段：逐个类别生成子类别，调用之间固定间隔
pub struct SubcategoryStage {
    agent: SubcategoryAgent,
    api_delay: Duration,
}

impl SubcategoryStage {
    pub fn new(agent: SubcategoryAgent, api_delay: Duration) -> Self {
        Self { agent, api_delay }
    }
}

#[async_trait]
impl Stage for SubcategoryStage {
    async fn run(&self, mut state: PipelineState) -> AppResult<PipelineState> {
        log_stage_start("生成子类别");

        let total = state.categories.len();
        let context = state.context().to_string();
        let mut category_subcategories = BTreeMap::new();

        for (idx, category) in state.categories.iter().enumerate() {
            if idx > 0 {
                sleep(self.api_delay).await;
            }

            let subcategories = match self.agent.generate_subcategories(category, &context).await {
                Ok(subcategories) => subcategories,
                Err(e) => {
                    error!("[类别 {}/{}] ❌ '{}' 生成子类别失败: {}", idx + 1, total, category.name, e);
                    Vec::new()
                }
            };

            info!(
                "[类别 {}/{}] ✓ '{}' 生成 {} 个子类别",
                idx + 1,
                total,
                category.name,
                subcategories.len()
            );
            category_subcategories.insert(category.name.clone(), subcategories);
        }

        state.category_subcategories = category_subcategories;
        Ok(state)
    }
}
