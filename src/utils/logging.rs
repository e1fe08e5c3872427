/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use anyhow::Result;
use std::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::models::PipelineReport;

/// 初始化 tracing 日志（默认 info 级别，可用 RUST_LOG 覆盖）
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n数据采集流水线日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 记录程序启动信息
///
/// # 参数
/// - `free_text`: 输入文本
/// - `max_concurrent`: 关键词最大并发数
pub fn log_startup(free_text: &str, max_concurrent: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 数据采集流水线");
    info!("📝 输入文本: {}", truncate_text(free_text, 100));
    info!("📊 关键词最大并发数: {}", max_concurrent);
    info!("{}", "=".repeat(60));
}

/// 记录阶段开始信息
pub fn log_stage_start(stage: &str) {
    info!("\n{}", "─".repeat(60));
    info!("▶️ 进入阶段: {}", stage);
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `report`: 汇总统计
/// - `output_file`: 结果文件路径
pub fn print_final_stats(report: &PipelineReport, output_file: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 流水线执行完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("📁 类别: {}", report.categories);
    info!("📂 子类别: {}", report.subcategories);
    info!("🔑 关键词: {}", report.keywords);
    info!(
        "✅ 采集成功: {}/{}",
        report.successful_collections,
        report.total_collections()
    );
    info!("❌ 采集失败: {}", report.failed_collections);
    info!("🖼️ 共采集条目: {}", report.total_items);
    info!("{}", "=".repeat(60));
    info!("\n结果已保存至: {}", output_file);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("Қазақстан", 3), "Қаз...");
        assert_eq!(truncate_text("short", 10), "short");
    }

    #[test]
    fn test_init_log_file_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        init_log_file(path.to_str().unwrap()).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("数据采集流水线日志"));
    }
}
