use std::time::Duration;

use clap::Parser;
use log::info;

mod coach;
mod config;
mod error;
mod extractor;
mod llm_manager;
mod logger;
mod prompts;
mod providers;
mod schema;
mod session;
mod summary;
mod ui;

use config::Config;
use llm_manager::LLMManager;
use providers::GeminiProvider;
use session::Session;
use ui::Console;

#[derive(Parser)]
#[command(name = "nutri_coach", about = "Daily nutrition and activity coaching from free text")]
struct Args {
    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
    /// Debug logging, including raw provider responses
    #[arg(long)]
    debug: bool,
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<String>,
    /// Model identifier to use
    #[arg(short, long)]
    model: Option<String>,
    /// Sampling temperature
    #[arg(short, long)]
    temperature: Option<f32>,
    /// Exit with status 1 when the session fails
    #[arg(long)]
    strict: bool,
    /// Disable colors and the spinner
    #[arg(long)]
    plain: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init(args.verbose, args.debug);

    if let Err(e) = dotenv::dotenv() {
        info!("No .env file loaded: {}", e);
    }

    let mut config = Config::load(&args.config)?;
    config.merge_with_args(args.model, args.temperature, args.strict, args.plain);
    config.validate()?;

    let provider = GeminiProvider::from_config(&config.provider);
    let llm_manager = LLMManager::new(
        Box::new(provider),
        config.provider.max_retries,
        Duration::from_millis(config.provider.retry_delay_ms),
    );
    info!(
        "Using {} model {} (max retries: {})",
        llm_manager.provider().name(),
        llm_manager.provider().model_name(),
        llm_manager.max_retries()
    );

    let console = Console::stdio(config.ui.colorful, config.ui.spinner);
    let mut session = Session::new(&llm_manager, &config.session.domain, console);
    let outcome = session.run_guarded().await;
    info!("Session ended at stage {:?}", session.stage());

    if outcome.is_failure() && config.session.strict_exit {
        std::process::exit(1);
    }
    Ok(())
}
