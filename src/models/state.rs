//! 流水线状态
//!
//! 贯穿四个阶段的唯一记录。每个阶段接收一个状态值并返回新的状态值，
//! 阶段返回后不再持有它的引用。

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::models::collection::CollectionResult;

/// 不透明的配置包
pub type ConfigBag = serde_json::Map<String, serde_json::Value>;

/// 类别
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Category {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// 子类别（结构与类别相同）
pub type Subcategory = Category;

/// 流水线状态
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    /// 输入文本
    pub free_text: String,
    pub original_context: String,

    /// 类别（有序）
    pub categories: Vec<Category>,
    /// 类别名 → 子类别列表
    pub category_subcategories: BTreeMap<String, Vec<Subcategory>>,
    /// 类别名 → 子类别名 → 关键词列表
    pub category_subcategory_keywords: BTreeMap<String, BTreeMap<String, Vec<String>>>,

    /// 采集结果（有序）
    pub collection_results: Vec<CollectionResult>,

    // 当前处理位置
    pub current_category: String,
    pub current_subcategory: String,
    pub current_keyword: String,

    pub config: ConfigBag,
}

impl PipelineState {
    /// 创建初始状态，`original_context` 缺省时取 `free_text`
    pub fn new(free_text: impl Into<String>, original_context: Option<String>, config: ConfigBag) -> Self {
        let free_text = free_text.into();
        let original_context = original_context
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| free_text.clone());
        Self {
            free_text,
            original_context,
            config,
            ..Default::default()
        }
    }

    /// 子类别与关键词提示中使用的国家/文化上下文
    pub fn context(&self) -> &str {
        if self.original_context.is_empty() {
            &self.free_text
        } else {
            &self.original_context
        }
    }

    /// 去重后的类别
    ///
    /// 重名时位置取首次出现，内容取最后一次（后写覆盖前写）
    pub fn unique_categories(&self) -> Vec<&Category> {
        last_wins(&self.categories)
    }

    /// 关键词阶段的生成调用序列：每个类别下的每个子类别条目各一次，重名不合并
    ///
    /// 重名子类别的后一次调用覆盖前一次的结果
    pub fn keyword_requests(&self) -> Vec<(&Category, &Subcategory)> {
        let mut requests = Vec::new();
        for category in self.unique_categories() {
            if let Some(subcategories) = self.category_subcategories.get(&category.name) {
                requests.extend(subcategories.iter().map(|s| (category, s)));
            }
        }
        requests
    }

    /// 按生成顺序展开去重后的 (类别, 子类别) 对
    pub fn subcategory_pairs(&self) -> Vec<(&Category, &Subcategory)> {
        let mut pairs = Vec::new();
        for category in self.unique_categories() {
            if let Some(subcategories) = self.category_subcategories.get(&category.name) {
                pairs.extend(last_wins(subcategories).into_iter().map(|s| (category, s)));
            }
        }
        pairs
    }

    /// 按生成顺序展开 (类别, 子类别, 关键词) 三元组
    pub fn keyword_triples(&self) -> Vec<(String, String, String)> {
        let mut triples = Vec::new();
        for (category, subcategory) in self.subcategory_pairs() {
            let keywords = self
                .category_subcategory_keywords
                .get(&category.name)
                .and_then(|subs| subs.get(&subcategory.name));
            if let Some(keywords) = keywords {
                for keyword in keywords {
                    triples.push((
                        category.name.clone(),
                        subcategory.name.clone(),
                        keyword.clone(),
                    ));
                }
            }
        }
        triples
    }

    pub fn total_subcategories(&self) -> usize {
        self.category_subcategories.values().map(Vec::len).sum()
    }

    pub fn total_keywords(&self) -> usize {
        self.category_subcategory_keywords
            .values()
            .flat_map(|subs| subs.values())
            .map(Vec::len)
            .sum()
    }
}

fn last_wins(items: &[Category]) -> Vec<&Category> {
    let mut position: HashMap<&str, usize> = HashMap::new();
    let mut unique: Vec<&Category> = Vec::new();
    for item in items {
        match position.get(item.name.as_str()) {
            Some(&idx) => unique[idx] = item,
            None => {
                position.insert(item.name.as_str(), unique.len());
                unique.push(item);
            }
        }
    }
    unique
}
