use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{error, info};

use crate::error::AppResult;
use crate::models::PipelineState;
use crate::services::KeywordAgent;
use crate::utils::logging::log_stage_start;
use crate::workflow::graph::Stage;

/// 关键词阶段：逐个 (类别, 子类别) 生成关键词
///
/// 间隔计数在整个阶段内共享，不按类别重置。
/// 重名子类别每个条目都生成一次，后一次的结果覆盖前一次
pub struct KeywordStage {
    agent: KeywordAgent,
    api_delay: Duration,
}

impl KeywordStage {
    pub fn new(agent: KeywordAgent, api_delay: Duration) -> Self {
        Self { agent, api_delay }
    }
}

#[async_trait]
impl Stage for KeywordStage {
    async fn run(&self, mut state: PipelineState) -> AppResult<PipelineState> {
        log_stage_start("生成关键词");

        let context = state.context().to_string();
        let mut keywords_by_category: BTreeMap<String, BTreeMap<String, Vec<String>>> = state
            .unique_categories()
            .into_iter()
            .map(|c| (c.name.clone(), BTreeMap::new()))
            .collect();

        let pairs = state.keyword_requests();
        let total = pairs.len();

        for (processed, (category, subcategory)) in pairs.into_iter().enumerate() {
            if processed > 0 {
                sleep(self.api_delay).await;
            }

            let keywords = match self
                .agent
                .generate_keywords(category, subcategory, &context)
                .await
            {
                Ok(keywords) => keywords,
                Err(e) => {
                    error!(
                        "[子类别 {}/{}] ❌ '{}/{}' 生成关键词失败: {}",
                        processed + 1,
                        total,
                        category.name,
                        subcategory.name,
                        e
                    );
                    Vec::new()
                }
            };

            info!(
                "[子类别 {}/{}] ✓ '{}/{}' 生成 {} 个关键词",
                processed + 1,
                total,
                category.name,
                subcategory.name,
                keywords.len()
            );
            keywords_by_category
                .entry(category.name.clone())
                .or_default()
                .insert(subcategory.name.clone(), keywords);
        }

        state.category_subcategory_keywords = keywords_by_category;
        Ok(state)
    }
}
