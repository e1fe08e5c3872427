use std::path::{Path, PathBuf};

/// 把类别/关键词变成安全的单级路径组件
pub fn sanitize_component(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();

    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

/// `{data_root}/{category}/{subcategory}`
pub fn subcategory_dir(data_root: &Path, category: &str, subcategory: &str) -> PathBuf {
    data_root
        .join(sanitize_component(category))
        .join(sanitize_component(subcategory))
}
