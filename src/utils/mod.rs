pub mod logging;
pub mod paths;

pub use logging::truncate_text;
pub use paths::{sanitize_component, subcategory_dir};
