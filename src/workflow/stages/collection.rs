use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::collectors::Collector;
use crate::config::CollectionConfig;
use crate::error::AppResult;
use crate::models::PipelineState;
use crate::orchestrator::keyword_pool::{collect_keywords, KeywordJob};
use crate::utils::logging::log_stage_start;
use crate::utils::subcategory_dir;
use crate::workflow::graph::Stage;

/// 采集阶段：对每个 (类别, 子类别, 关键词) 调用一次采集器
///
/// 单个关键词失败只记录一条失败结果，不中止阶段
pub struct CollectionStage {
    collector: Arc<dyn Collector>,
    config: Arc<CollectionConfig>,
    max_concurrent: usize,
}

impl CollectionStage {
    pub fn new(collector: Arc<dyn Collector>, config: CollectionConfig, max_concurrent: usize) -> Self {
        Self {
            collector,
            config: Arc::new(config),
            max_concurrent: max_concurrent.max(1),
        }
    }
}

#[async_trait]
impl Stage for CollectionStage {
    async fn run(&self, mut state: PipelineState) -> AppResult<PipelineState> {
        log_stage_start("采集数据");

        let data_root = &self.config.data_path;
        if let Err(e) = std::fs::create_dir_all(data_root) {
            warn!("⚠️ 创建数据目录 {} 失败: {}", data_root.display(), e);
        }

        let jobs: Vec<KeywordJob> = state
            .keyword_triples()
            .into_iter()
            .map(|(category, subcategory, keyword)| KeywordJob {
                output_path: subcategory_dir(data_root, &category, &subcategory),
                category,
                subcategory,
                keyword,
            })
            .collect();

        let results = collect_keywords(jobs, self.collector.clone(), self.config.clone(), self.max_concurrent).await;
        info!("✓ 数据采集完成，共处理 {} 个关键词", results.len());

        state.collection_results = results;
        Ok(state)
    }
}
