use serde::Serialize;

use crate::models::state::PipelineState;

/// 最终统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    pub categories: usize,
    pub subcategories: usize,
    pub keywords: usize,
    pub successful_collections: usize,
    pub failed_collections: usize,
    pub total_items: usize,
}

impl PipelineReport {
    pub fn from_state(state: &PipelineState) -> Self {
        let successful = state.collection_results.iter().filter(|r| r.success).count();
        Self {
            categories: state.categories.len(),
            subcategories: state.total_subcategories(),
            keywords: state.total_keywords(),
            successful_collections: successful,
            failed_collections: state.collection_results.len() - successful,
            total_items: state
                .collection_results
                .iter()
                .map(|r| r.items_collected)
                .sum(),
        }
    }

    pub fn total_collections(&self) -> usize {
        self.successful_collections + self.failed_collections
    }
}
