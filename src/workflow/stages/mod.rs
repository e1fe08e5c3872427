pub mod category;
pub mod collection;
pub mod keyword;
pub mod subcategory;

pub use category::CategoryStage;
pub use collection::CollectionStage;
pub use keyword::KeywordStage;
pub use subcategory::SubcategoryStage;
