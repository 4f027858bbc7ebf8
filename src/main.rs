use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use sentient::app::SentientApp;
use sentient::config::{AppConfig, ConfigLoader, default_config_path};
use sentient::observability::init_tracing;

/// Sentient-5 personality-assessment installation
#[derive(Parser, Debug)]
#[command(name = "sentient", version, about)]
struct Cli {
    /// 配置文件路径，默认 ./sentient.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 覆盖模型名称
    #[arg(long)]
    model: Option<String>,

    /// 覆盖阶段提示词文件
    #[arg(long)]
    settings: Option<PathBuf>,

    /// 覆盖题库文件
    #[arg(long)]
    questions: Option<PathBuf>,

    /// 覆盖日志目录
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// 关闭摄像头情绪采样
    #[arg(long)]
    no_emotion: bool,

    /// 只运行一次会话后退出
    #[arg(long)]
    once: bool,
}

impl Cli {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(model) = &self.model {
            config.model.name = model.clone();
        }
        if let Some(settings) = &self.settings {
            config.prompts.settings_path = settings.clone();
        }
        if let Some(questions) = &self.questions {
            config.prompts.questions_path = questions.clone();
        }
        if let Some(log_dir) = &self.log_dir {
            config.logging.log_dir = Some(log_dir.clone());
        }
        if self.no_emotion {
            config.emotion.enabled = false;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => ConfigLoader::load_from(path),
        None => ConfigLoader::load(),
    };
    let mut config = loaded.with_context(|| {
        let path = cli.config.clone().unwrap_or_else(default_config_path);
        format!("Failed to load configuration from {}", path.display())
    })?;
    cli.apply(&mut config);
    ConfigLoader::validate(&config).context("Invalid configuration")?;

    let _guard = init_tracing(env!("CARGO_PKG_NAME"), &config.logging);
    info!("Starting Sentient-5...");
    info!(
        model = %config.model.name,
        emotion = config.emotion.enabled,
        "Configuration loaded successfully"
    );

    let app = SentientApp::from_config(&config)
        .context("Failed to initialize Sentient-5")?
        .with_run_once(cli.once);

    app.run().await.context("Sentient-5 stopped with an error")?;
    info!("Sentient-5 shut down");
    Ok(())
}
