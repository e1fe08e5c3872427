//! 流水线运行器 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：写日志文件头、构造 LLM 服务、代理和采集器
//! 2. **执行流水线**：构建工作流，从输入文本生成初始状态并运行
//! 3. **结果输出**：把最终状态写入结果文件
//! 4. **全局统计**：汇总类别、关键词和采集结果
//!
//! 不处理单个阶段或单个关键词的细节，这些委托给 workflow 和 collectors。

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::models::{PipelineReport, PipelineState};
use crate::utils::logging::{init_log_file, log_startup, print_final_stats};
use crate::workflow::{create_pipeline, CompiledWorkflow, PipelineBuilder, PipelineContext};

/// 应用主结构
pub struct App {
    config: Config,
    builder: PipelineBuilder,
    workflow: CompiledWorkflow,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        init_log_file(&config.output_log_file)
            .with_context(|| format!("初始化日志文件 {} 失败", config.output_log_file))?;

        let context = PipelineContext::from_config(&config).context("构造流水线上下文失败")?;
        Self::with_context(config, context)
    }

    /// 使用外部提供的上下文（自定义生成能力或采集器）
    pub fn with_context(config: Config, context: PipelineContext) -> Result<Self> {
        let builder = create_pipeline(&context);
        let workflow = builder.build().context("构建工作流失败")?;
        Ok(Self {
            config,
            builder,
            workflow,
        })
    }

    /// 运行流水线并写出结果
    pub async fn run(&self, free_text: &str) -> Result<PipelineReport> {
        log_startup(free_text, self.config.max_concurrent_keywords);

        let initial_state = self.builder.create_initial_state(free_text, None);
        let final_state = self
            .workflow
            .execute(initial_state)
            .await
            .context("执行流水线失败")?;

        write_results(&final_state, Path::new(&self.config.output_file))?;

        let report = PipelineReport::from_state(&final_state);
        print_final_stats(&report, &self.config.output_file);
        Ok(report)
    }
}

/// 把最终状态写成格式化的 JSON
pub fn write_results(state: &PipelineState, output_file: &Path) -> Result<()> {
    if let Some(parent) = output_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("创建目录 {} 失败", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(state).context("序列化结果失败")?;
    fs::write(output_file, json).with_context(|| format!("写入结果文件 {} 失败", output_file.display()))?;
    info!("💾 结果已写入: {}", output_file.display());
    Ok(())
}
