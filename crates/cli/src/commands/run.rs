//! The `run` command: one request through the pipeline, or a direct
//! answer in ask mode.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use patchsmith_config::AppConfig;
use patchsmith_core::ChatMode;
use patchsmith_pipeline::Orchestrator;
use patchsmith_providers::OllamaClient;

pub struct RunArgs {
    pub request: String,
    pub ask: bool,
    pub stream: bool,
    pub work_dir: Option<PathBuf>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub relaxed: bool,
}

pub async fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load()?;

    // CLI flags win over file and environment settings.
    if let Some(dir) = args.work_dir {
        config.work_dir = dir;
    }
    if let Some(model) = args.model {
        config.provider.model = model;
    }
    if let Some(url) = args.base_url {
        config.provider.base_url = url;
    }
    if args.relaxed {
        config.security.strict = false;
    }
    if args.ask {
        config.chat_mode = ChatMode::Ask;
    }
    config.validate()?;

    let client = OllamaClient::new(
        &config.provider.base_url,
        &config.provider.model,
        Duration::from_secs(config.provider.timeout_secs),
    )?;
    let orchestrator = Orchestrator::new(Arc::new(client));
    let mut session = config.session();

    match session.chat_mode() {
        ChatMode::Ask => {
            if args.stream {
                let mut chunks = orchestrator.ask_stream(&args.request).await?;
                let mut stdout = std::io::stdout();
                while let Some(chunk) = chunks.recv().await {
                    let text = chunk?;
                    write!(stdout, "{text}")?;
                    stdout.flush()?;
                }
                writeln!(stdout)?;
            } else {
                let answer = orchestrator.ask(&args.request).await?;
                println!("{answer}");
            }
        }
        ChatMode::Agent => {
            tracing::info!(
                work_dir = %session.work_dir().display(),
                model = session.model(),
                strict = session.strict_security(),
                "Starting pipeline run"
            );
            let report = orchestrator.run(&mut session, &args.request).await?;
            println!("{}", report.to_markdown());
            if !report.succeeded() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
