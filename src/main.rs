//! reprose 命令行入口
//!
//! 读取 HTML（文件或标准输入），改写正文后输出。进度和最终模式写到标准错误。

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use reprose::env::{core::LogLevel, EnvVar};
use reprose::rewrite::error::helpers;
use reprose::rewrite::{
    ConfigManager, ErrorCategory, RewriteConfig, RewriteError, RewriteResult, RewriteService,
};

const EXIT_FAILURE: u8 = 1;
const EXIT_CONFIG: u8 = 2;

/// 就地改写 HTML 文章正文，保留结构
#[derive(Parser, Debug)]
#[command(name = "reprose")]
#[command(version)]
#[command(about = "Rewrite the prose of an HTML article in place, keeping its markup")]
struct Cli {
    /// 输入文件，省略或 "-" 表示标准输入
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// 输出文件，默认标准输出
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// 把输入当作文章片段而不是完整文档
    #[arg(long)]
    fragment: bool,

    /// 文档没有声明字符集时使用的编码
    #[arg(long, value_name = "LABEL", default_value = "utf-8")]
    encoding: String,

    /// 改写服务地址
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,

    /// 每批片段数
    #[arg(long, value_name = "N")]
    batch_size: Option<usize>,

    /// 同时在途的请求数
    #[arg(long, value_name = "N")]
    concurrency: Option<usize>,

    /// 单次请求超时（秒）
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// 整次改写共用的引导语
    #[arg(long, value_name = "TEXT")]
    directive: Option<String>,

    /// 配置文件（TOML 或 JSON）
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// 写出一份默认配置后退出
    #[arg(long, value_name = "PATH", conflicts_with = "input")]
    write_config: Option<PathBuf>,

    /// 日志级别：trace, debug, info, warn, error
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// 不输出进度和模式
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            helpers::log_error(&e);
            match e.category() {
                ErrorCategory::Configuration => ExitCode::from(EXIT_CONFIG),
                _ => ExitCode::from(EXIT_FAILURE),
            }
        }
    }
}

fn init_logging(cli_level: Option<&str>) {
    let level = match cli_level {
        Some(level) => LogLevel::parse(level).unwrap_or_else(|e| {
            eprintln!("Warning: {}", e);
            "info".to_string()
        }),
        None => LogLevel::get().unwrap_or_else(|_| "info".to_string()),
    };

    fmt()
        .with_env_filter(EnvFilter::new(format!("reprose={level}")))
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

async fn run(cli: Cli) -> RewriteResult<()> {
    if let Some(path) = &cli.write_config {
        ConfigManager::generate_example_config(path)?;
        if !cli.quiet {
            eprintln!("Wrote default configuration to {}", path.display());
        }
        return Ok(());
    }

    let config = resolve_config(&cli)?;
    let service = RewriteService::new(config)?;

    let input = read_input(cli.input.as_ref())?;
    let quiet = cli.quiet;
    let on_progress = move |percent: u8| {
        if !quiet {
            eprintln!("progress: {percent}%");
        }
    };

    let (output, mode) = if cli.fragment {
        let html = String::from_utf8_lossy(&input);
        let rewritten = service.rewrite_html_fragment(&html, on_progress).await?;
        (rewritten.html.into_bytes(), rewritten.mode)
    } else {
        let (bytes, report) = service
            .rewrite_html_document(&input, &cli.encoding, on_progress)
            .await?;
        (bytes, report.mode)
    };

    write_output(cli.output.as_ref(), &output)?;

    if !cli.quiet {
        eprintln!("mode: {mode}");
    }

    Ok(())
}

/// 配置文件 → 环境变量 → 命令行参数，后者覆盖前者
///
/// 只在所有覆盖项叠加之后验证一次；配置文件损坏直接报错。
fn resolve_config(cli: &Cli) -> RewriteResult<RewriteConfig> {
    let manager = ConfigManager::load(cli.config.as_deref())?;
    if let Some(source) = manager.source() {
        tracing::debug!("配置来源: {}", source);
    }
    let mut config = manager.into_config();

    if let Some(url) = &cli.api_url {
        config.api_url = url.clone();
    }
    if let Some(size) = cli.batch_size {
        config.batch_size = size;
    }
    if let Some(concurrency) = cli.concurrency {
        config.max_concurrency = concurrency;
    }
    if let Some(secs) = cli.timeout {
        config.request_timeout_secs = secs;
    }
    if let Some(directive) = &cli.directive {
        config.directive = Some(directive.clone());
    }

    config.validate()?;
    Ok(config)
}

fn read_input(path: Option<&PathBuf>) -> RewriteResult<Vec<u8>> {
    match path {
        Some(path) if path.as_os_str() != "-" => fs::read(path).map_err(|e| {
            RewriteError::IoError(format!("读取输入失败 {}: {}", path.display(), e))
        }),
        _ => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&PathBuf>, data: &[u8]) -> RewriteResult<()> {
    match path {
        Some(path) if path.as_os_str() != "-" => fs::write(path, data).map_err(|e| {
            RewriteError::IoError(format!("写入输出失败 {}: {}", path.display(), e))
        }),
        _ => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(data)?;
            stdout.flush()?;
            Ok(())
        }
    }
}
