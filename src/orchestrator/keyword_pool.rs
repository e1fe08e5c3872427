//! 关键词采集池 - 编排层
//!
//! 并发数为 1 时逐个采集；大于 1 时用 Semaphore 限制同时运行的采集任务，
//! 每个任务拥有自己的抓取会话。结果按提交顺序返回。

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{error, info};

use crate::collectors::Collector;
use crate::config::CollectionConfig;
use crate::models::CollectionResult;

/// 一个待采集的关键词
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordJob {
    pub category: String,
    pub subcategory: String,
    pub keyword: String,
    /// `{data_root}/{category}/{subcategory}`
    pub output_path: PathBuf,
}

/// 采集所有关键词，结果顺序与 `jobs` 一致
pub async fn collect_keywords(
    jobs: Vec<KeywordJob>,
    collector: Arc<dyn Collector>,
    config: Arc<CollectionConfig>,
    max_concurrent: usize,
) -> Vec<CollectionResult> {
    let total = jobs.len();
    if total == 0 {
        info!("没有需要采集的关键词");
        return Vec::new();
    }

    if max_concurrent <= 1 {
        let mut results = Vec::with_capacity(total);
        for (idx, job) in jobs.into_iter().enumerate() {
            results.push(collect_one(&job, collector.as_ref(), &config, idx + 1, total).await);
        }
        return results;
    }

    info!("📋 以最多 {} 个并发任务采集 {} 个关键词", max_concurrent, total);
    let semaphore = Arc::new(Semaphore::new(max_concurrent));
    let mut handles = Vec::with_capacity(total);

    for (idx, job) in jobs.into_iter().enumerate() {
        let keyword_index = idx + 1;
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                error!("[关键词 {}/{}] 获取并发许可失败: {}", keyword_index, total, e);
                handles.push((job, None));
                continue;
            }
        };

        let collector = collector.clone();
        let config = config.clone();
        let task_job = job.clone();
        let handle = tokio::spawn(async move {
            let _permit = permit;
            collect_one(&task_job, collector.as_ref(), &config, keyword_index, total).await
        });
        handles.push((job, Some(handle)));
    }

    let mut results = Vec::with_capacity(total);
    for (idx, (job, handle)) in handles.into_iter().enumerate() {
        let result = match handle {
            Some(handle) => match handle.await {
                Ok(result) => result,
                Err(e) => {
                    error!("[关键词 {}/{}] 任务执行失败: {}", idx + 1, total, e);
                    failure(&job, format!("任务执行失败: {}", e))
                }
            },
            None => failure(&job, "未能获取并发许可"),
        };
        results.push(result);
    }
    results
}

async fn collect_one(
    job: &KeywordJob,
    collector: &dyn Collector,
    config: &CollectionConfig,
    keyword_index: usize,
    total: usize,
) -> CollectionResult {
    info!(
        "[关键词 {}/{}] 🖼️ 采集 '{}' (类别: {}, 子类别: {})",
        keyword_index, total, job.keyword, job.category, job.subcategory
    );

    match collector.collect(&job.keyword, &job.output_path, config).await {
        Ok(outcome) => {
            if outcome.success {
                info!(
                    "[关键词 {}/{}] ✅ '{}' 采集成功: {} 条",
                    keyword_index, total, job.keyword, outcome.items_collected
                );
            } else {
                error!(
                    "[关键词 {}/{}] ❌ '{}' 采集失败: {}",
                    keyword_index,
                    total,
                    job.keyword,
                    outcome.error.as_deref().unwrap_or("未知错误")
                );
            }
            let mut result = CollectionResult::from_outcome(&job.category, &job.subcategory, outcome);
            result.keyword = job.keyword.clone();
            result
        }
        Err(e) => {
            error!("[关键词 {}/{}] ❌ '{}' 采集出错: {}", keyword_index, total, job.keyword, e);
            failure(job, e.to_string())
        }
    }
}

fn failure(job: &KeywordJob, error: impl Into<String>) -> CollectionResult {
    CollectionResult::failure(
        &job.category,
        &job.subcategory,
        &job.keyword,
        &job.output_path.display().to_string(),
        error,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::error::{AppError, AppResult, CollectionError};
    use crate::models::CollectionOutcome;

    /// 记录最大并发数；关键词 "bad" 返回错误
    #[derive(Default)]
    struct CountingCollector {
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Collector for CountingCollector {
        async fn collect(&self, keyword: &str, output_path: &Path, _config: &CollectionConfig) -> AppResult<CollectionOutcome> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);

            if keyword == "bad" {
                return Err(AppError::Collection(CollectionError::CollectorFailed {
                    keyword: keyword.to_string(),
                    reason: "boom".to_string(),
                }));
            }
            Ok(CollectionOutcome {
                success: true,
                keyword: keyword.to_string(),
                items_collected: 1,
                output_path: output_path.join(keyword).display().to_string(),
                ..Default::default()
            })
        }
    }

    fn jobs(keywords: &[&str]) -> Vec<KeywordJob> {
        keywords
            .iter()
            .map(|k| KeywordJob {
                category: "A".to_string(),
                subcategory: "s".to_string(),
                keyword: k.to_string(),
                output_path: PathBuf::from("data/A/s"),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_pool_keeps_submission_order_and_limit() {
        let collector = Arc::new(CountingCollector::default());
        let results = collect_keywords(
            jobs(&["k1", "k2", "bad", "k4", "k5"]),
            collector.clone(),
            Arc::new(CollectionConfig::default()),
            2,
        )
        .await;

        let keywords: Vec<_> = results.iter().map(|r| r.keyword.as_str()).collect();
        assert_eq!(keywords, vec!["k1", "k2", "bad", "k4", "k5"]);
        assert!(!results[2].success);
        assert_eq!(results.iter().filter(|r| r.success).count(), 4);
        assert!(collector.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_sequential_when_limit_is_one() {
        let collector = Arc::new(CountingCollector::default());
        let results = collect_keywords(
            jobs(&["k1", "k2", "k3"]),
            collector.clone(),
            Arc::new(CollectionConfig::default()),
            1,
        )
        .await;

        assert_eq!(results.len(), 3);
        assert_eq!(collector.peak.load(Ordering::SeqCst), 1);
        assert_eq!(results[0].category, "A");
        assert_eq!(results[0].output_path, Path::new("data/A/s/k1").display().to_string());
    }
}
