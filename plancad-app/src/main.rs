use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use plancad_config::{AppConfig, ConfigError};
use plancad_engine::{ParseOptions, ParseOutput, parse_path};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

mod summary;

/// 从 DXF 平面图重建可度量的多边形。
#[derive(Debug, Parser)]
#[command(name = "plancad", version)]
struct Cli {
    /// 配置文件路径，缺省时按 PLANCAD_CONFIG 与 ./config/default.toml 查找
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// 输出带缩进的 JSON
    #[arg(long, global = true)]
    pretty: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 输出整张图纸的预览 JSON（不过滤图层）
    Preview {
        #[command(flatten)]
        input: InputArgs,
    },
    /// 在指定图层上重建多边形并输出度量 JSON
    Metrics {
        #[command(flatten)]
        input: InputArgs,
        /// 目标图层，可重复指定
        #[arg(long = "layer", value_name = "NAME", required = true)]
        layers: Vec<String>,
    },
    /// 打印按图层与区域汇总的文本报告
    Summary {
        #[command(flatten)]
        input: InputArgs,
        /// 目标图层；缺省时为预览模式
        #[arg(long = "layer", value_name = "NAME")]
        layers: Vec<String>,
    },
}

#[derive(Debug, Args)]
struct InputArgs {
    /// 要读取的 DXF 文件
    file: PathBuf,
    /// 线性比例，面积乘以其平方，周长乘以其本身
    #[arg(long)]
    scale: Option<f64>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let (config, config_error) = match load_configuration(cli.config.as_deref()) {
        Ok(config) => (config, None),
        Err(err) => (AppConfig::default(), Some(err)),
    };
    init_logging(&config);
    if let Some(err) = config_error {
        warn!(error = %err, "加载配置失败，使用内建默认值");
    }
    debug!(command = ?cli.command, "启动 plancad");

    match run(&cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("错误: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli, config: &AppConfig) -> anyhow::Result<()> {
    let pretty = cli.pretty || config.output.pretty;
    match &cli.command {
        Command::Preview { input } => {
            let output = parse(input, &[], config)?;
            print_json(&output, pretty)
        }
        Command::Metrics { input, layers } => {
            let output = parse(input, layers, config)?;
            print_json(&output, pretty)
        }
        Command::Summary { input, layers } => {
            let output = parse(input, layers, config)?;
            print!("{}", summary::render(&input.file, &output));
            Ok(())
        }
    }
}

fn parse(input: &InputArgs, layers: &[String], config: &AppConfig) -> anyhow::Result<ParseOutput> {
    let options = ParseOptions {
        scale: input.scale.unwrap_or(config.engine.scale),
        max_block_depth: config.engine.max_block_depth,
        snap_tolerance: config.engine.snap_tolerance,
        concavity: config.engine.concavity,
        ..ParseOptions::default()
    }
    .with_layers(layers);

    let output = parse_path(&input.file, &options)
        .with_context(|| format!("无法解析 {}", input.file.display()))?;
    info!(
        file = %input.file.display(),
        mode = ?output.mode,
        features = output.collection.len(),
        constructions = output.metadata.total_constructions,
        "解析完成"
    );
    for diagnostic in &output.diagnostics {
        debug!(%diagnostic, "跳过的实体");
    }
    Ok(output)
}

fn print_json(output: &ParseOutput, pretty: bool) -> anyhow::Result<()> {
    let json = if pretty {
        output.to_json_pretty()?
    } else {
        output.to_json()?
    };
    println!("{json}");
    Ok(())
}

/// 显式路径优先，否则按 `PLANCAD_CONFIG` 与 `./config/default.toml` 查找。
fn load_configuration(override_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match override_path {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::discover(),
    }
}

/// 日志写到 stderr，stdout 只输出结果；设置了 `RUST_LOG` 时以其为准。
fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
