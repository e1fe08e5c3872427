//! 生成代理 - 业务能力层
//!
//! 三个代理分别负责类别、子类别和关键词的生成。
//! 代理只负责拼提示词和解析结果，失败原样返回，由阶段决定如何降级。

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::{debug, info};

use crate::error::AppResult;
use crate::models::{Category, Subcategory};
use crate::services::generator::TextGenerator;
use crate::services::prompts;

/// 类别代理
#[derive(Clone)]
pub struct CategoryAgent {
    generator: Arc<dyn TextGenerator>,
}

impl CategoryAgent {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn extract_categories(&self, country_or_culture: &str) -> AppResult<Vec<Category>> {
        let result = self
            .generator
            .generate(
                prompts::CATEGORY_SYSTEM_PROMPT,
                &prompts::category_user_message(country_or_culture),
            )
            .await?;

        let categories = parse_named_items(&result, "categories");
        info!("✓ 为 {} 提取到 {} 个类别", country_or_culture, categories.len());
        Ok(categories)
    }
}

/// 子类别代理
#[derive(Clone)]
pub struct SubcategoryAgent {
    generator: Arc<dyn TextGenerator>,
}

impl SubcategoryAgent {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn generate_subcategories(
        &self,
        category: &Category,
        country_or_culture: &str,
    ) -> AppResult<Vec<Subcategory>> {
        let result = self
            .generator
            .generate(
                prompts::SUBCATEGORY_SYSTEM_PROMPT,
                &prompts::subcategory_user_message(&category.name, &category.description, country_or_culture),
            )
            .await?;

        let subcategories = parse_named_items(&result, "subcategories");
        debug!("类别 '{}' 生成 {} 个子类别", category.name, subcategories.len());
        Ok(subcategories)
    }
}

/// 关键词代理
#[derive(Clone)]
pub struct KeywordAgent {
    generator: Arc<dyn TextGenerator>,
}

impl KeywordAgent {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn generate_keywords(
        &self,
        category: &Category,
        subcategory: &Subcategory,
        country_or_culture: &str,
    ) -> AppResult<Vec<String>> {
        let result = self
            .generator
            .generate(
                prompts::KEYWORD_SYSTEM_PROMPT,
                &prompts::keyword_user_message(
                    &category.name,
                    &subcategory.name,
                    &subcategory.description,
                    country_or_culture,
                ),
            )
            .await?;

        let keywords = parse_keywords(&result);
        debug!("子类别 '{}' 生成 {} 个关键词", subcategory.name, keywords.len());
        Ok(keywords)
    }
}

/// 解析 `{"<key>": [{"name": .., "description": ..}]}`，丢弃没有名称的条目
fn parse_named_items(value: &JsonValue, key: &str) -> Vec<Category> {
    let Some(items) = value.get(key).and_then(JsonValue::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let name = item.get("name")?.as_str()?.trim();
            if name.is_empty() {
                return None;
            }
            let description = item
                .get("description")
                .and_then(JsonValue::as_str)
                .unwrap_or_default();
            Some(Category::new(name, description))
        })
        .collect()
}

/// 关键词既可能是字符串，也可能是 `{"keyword": ..}` 对象
fn parse_keywords(value: &JsonValue) -> Vec<String> {
    let Some(items) = value.get("keywords").and_then(JsonValue::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match item {
            JsonValue::String(s) => Some(s.trim().to_string()),
            JsonValue::Object(obj) => obj
                .get("keyword")
                .and_then(JsonValue::as_str)
                .map(|s| s.trim().to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .collect()
}
