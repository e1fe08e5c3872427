use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use crate::collectors::{Collector, ImageCollector};
use crate::config::{CollectionConfig, Config};
use crate::error::AppResult;
use crate::models::ConfigBag;
use crate::services::{CategoryAgent, KeywordAgent, LlmService, SubcategoryAgent, TextGenerator};
use crate::workflow::builder::PipelineBuilder;
use crate::workflow::stages::{CategoryStage, CollectionStage, KeywordStage, SubcategoryStage};

pub const CATEGORY_NODE: &str = "extract_categories";
pub const SUBCATEGORY_NODE: &str = "generate_subcategories";
pub const KEYWORD_NODE: &str = "generate_keywords";
pub const COLLECTION_NODE: &str = "collect_data";

/// 流水线上下文
///
/// 运行前构造一次，持有阶段需要的所有协作者
#[derive(Clone)]
pub struct PipelineContext {
    pub category_agent: CategoryAgent,
    pub subcategory_agent: SubcategoryAgent,
    pub keyword_agent: KeywordAgent,
    pub collector: Arc<dyn Collector>,
    pub collection_config: CollectionConfig,
    pub api_delay: Duration,
    pub max_concurrent_keywords: usize,
}

impl PipelineContext {
    /// 三个代理共用同一个生成能力
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        collector: Arc<dyn Collector>,
        collection_config: CollectionConfig,
        api_delay: Duration,
    ) -> Self {
        Self {
            category_agent: CategoryAgent::new(generator.clone()),
            subcategory_agent: SubcategoryAgent::new(generator.clone()),
            keyword_agent: KeywordAgent::new(generator),
            collector,
            collection_config,
            api_delay,
            max_concurrent_keywords: 1,
        }
    }

    /// 按配置构造：LLM 服务 + chromiumoxide 图片采集器
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let llm: Arc<dyn TextGenerator> = Arc::new(LlmService::new(config)?);
        let collection_config = config.collection_config();
        let collector: Arc<dyn Collector> = Arc::new(ImageCollector::chromium(&collection_config));

        let mut context = Self::new(llm, collector, collection_config, config.api_delay()?);
        context.max_concurrent_keywords = config.max_concurrent_keywords.max(1);
        Ok(context)
    }

    pub fn with_max_concurrent_keywords(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent_keywords = max_concurrent.max(1);
        self
    }

    /// 写入状态里的配置快照（只含可序列化的部分）
    pub fn config_bag(&self) -> ConfigBag {
        let mut bag = ConfigBag::new();
        bag.insert(
            "collection_config".to_string(),
            serde_json::to_value(&self.collection_config).unwrap_or_default(),
        );
        bag.insert("api_delay_seconds".to_string(), json!(self.api_delay.as_secs_f64()));
        bag.insert(
            "max_concurrent_keywords".to_string(),
            json!(self.max_concurrent_keywords),
        );
        bag
    }
}

/// 组装四阶段流水线：类别 → 子类别 → 关键词 → 采集
pub fn create_pipeline(context: &PipelineContext) -> PipelineBuilder {
    let mut builder = PipelineBuilder::new().with_config(context.config_bag());
    builder
        .add_node(CATEGORY_NODE, Arc::new(CategoryStage::new(context.category_agent.clone())))
        .add_node(
            SUBCATEGORY_NODE,
            Arc::new(SubcategoryStage::new(context.subcategory_agent.clone(), context.api_delay)),
        )
        .add_node(
            KEYWORD_NODE,
            Arc::new(KeywordStage::new(context.keyword_agent.clone(), context.api_delay)),
        )
        .add_node(
            COLLECTION_NODE,
            Arc::new(CollectionStage::new(
                context.collector.clone(),
                context.collection_config.clone(),
                context.max_concurrent_keywords,
            )),
        )
        .set_entry_point(CATEGORY_NODE);
    builder
}
