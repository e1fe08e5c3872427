use std::fs;

use agentic_data_pipeline::utils::logging;
use agentic_data_pipeline::{App, Config};
use anyhow::{bail, Context, Result};

const USAGE: &str = "用法: agentic-pipeline <文本> | --file <路径> | -f <路径>";

/// 从命令行参数读取输入文本
fn read_input(args: &[String]) -> Result<String> {
    let text = match args {
        [flag, path, ..] if flag == "--file" || flag == "-f" => {
            fs::read_to_string(path).with_context(|| format!("读取输入文件 {} 失败", path))?
        }
        [flag] if flag == "--file" || flag == "-f" => bail!("{} 后缺少文件路径\n{}", flag, USAGE),
        [] => bail!("缺少输入文本\n{}", USAGE),
        words => words.join(" "),
    };

    let text = text.trim().to_string();
    if text.is_empty() {
        bail!("输入文本为空\n{}", USAGE);
    }
    Ok(text)
}

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load().context("加载配置失败")?;

    // 初始化日志
    logging::init(config.verbose_logging);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let free_text = read_input(&args)?;

    // 初始化并运行应用
    let app = App::initialize(config).await?;
    app.run(&free_text).await?;

    Ok(())
}
