use serde::{Deserialize, Serialize};

/// 采集器对单个关键词的返回结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionOutcome {
    pub success: bool,
    pub keyword: String,
    pub items_collected: usize,
    pub output_path: String,
    #[serde(default)]
    pub urls_found: usize,
    #[serde(default)]
    pub skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CollectionOutcome {
    pub fn failed(keyword: impl Into<String>, output_path: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            keyword: keyword.into(),
            output_path: output_path.into(),
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// 附带类别/子类别标签的采集结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionResult {
    pub success: bool,
    pub category: String,
    pub subcategory: String,
    pub keyword: String,
    pub items_collected: usize,
    pub output_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CollectionResult {
    pub fn from_outcome(category: &str, subcategory: &str, outcome: CollectionOutcome) -> Self {
        Self {
            success: outcome.success,
            category: category.to_string(),
            subcategory: subcategory.to_string(),
            keyword: outcome.keyword,
            items_collected: outcome.items_collected,
            output_path: outcome.output_path,
            error: outcome.error,
        }
    }

    /// 采集器直接返回错误时记录的失败结果
    pub fn failure(category: &str, subcategory: &str, keyword: &str, output_path: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            category: category.to_string(),
            subcategory: subcategory.to_string(),
            keyword: keyword.to_string(),
            items_collected: 0,
            output_path: output_path.to_string(),
            error: Some(error.into()),
        }
    }
}
