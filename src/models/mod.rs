pub mod collection;
pub mod ledger;
pub mod report;
pub mod state;

pub use collection::{CollectionOutcome, CollectionResult};
pub use ledger::{MetadataEntry, MetadataLedger};
pub use report::PipelineReport;
pub use state::{Category, ConfigBag, PipelineState, Subcategory};
