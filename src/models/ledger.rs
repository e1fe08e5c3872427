//! 元数据账本
//!
//! 记录每个被接受的图片 URL（包括下载阶段被跳过的），最终写入 metadata.json

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// 账本条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub id: usize,
    pub url: String,
    /// 预览元素的原始快照（outerHTML）
    pub html: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filepath: Option<String>,
}

/// 有序账本，id 从 0 开始严格递增
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataLedger {
    entries: Vec<MetadataEntry>,
}

impl MetadataLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条记录并返回分配的 id
    pub fn record(&mut self, url: impl Into<String>, html: impl Into<String>) -> usize {
        let id = self.entries.len();
        self.entries.push(MetadataEntry {
            id,
            url: url.into(),
            html: html.into(),
            filename: None,
            filepath: None,
        });
        id
    }

    /// 下载成功后回填文件信息
    pub fn mark_saved(&mut self, url: &str, filename: &str, filepath: &Path) -> bool {
        match self.entries.iter_mut().find(|e| e.url == url) {
            Some(entry) => {
                entry.filename = Some(filename.to_string());
                entry.filepath = Some(filepath.to_string_lossy().to_string());
                true
            }
            None => false,
        }
    }

    pub fn entries(&self) -> &[MetadataEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 以 4 空格缩进写入 JSON 文件
    pub fn persist(&self, path: &Path) -> AppResult<()> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)?;
        std::fs::write(path, buf).map_err(|e| AppError::file_write_failed(path.display().to_string(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_increase_from_zero() {
        let mut ledger = MetadataLedger::new();
        assert_eq!(ledger.record("https://a/1.jpg", "<img>"), 0);
        assert_eq!(ledger.record("https://a/2.jpg", "<img>"), 1);
        assert_eq!(ledger.record("https://a/3.jpg", "<img>"), 2);
        let ids: Vec<usize> = ledger.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_persist_omits_unsaved_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = MetadataLedger::new();
        ledger.record("https://a/1.jpg", "<img src=1>");
        ledger.record("https://a/2.jpg", "<img src=2>");
        let saved_path = dir.path().join("kw1.jpeg");
        assert!(ledger.mark_saved("https://a/2.jpg", "kw1.jpeg", &saved_path));
        assert!(!ledger.mark_saved("https://missing", "x", &saved_path));

        let path = dir.path().join("metadata.json");
        ledger.persist(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n    {"));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert!(items[0].get("filename").is_none());
        assert_eq!(items[1]["filename"], "kw1.jpeg");
    }
}
