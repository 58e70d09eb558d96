use std::{path::PathBuf, sync::Arc, time::Duration};

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    clockin_browser::ChromeSessionProvider,
    clockin_config::ClockinConfig,
    clockin_mailer::MailNotifier,
    clockin_runner::{Bootstrap, BootstrapConfig, RetryState, ShotStore},
};

#[derive(Parser)]
#[command(name = "clockin", about = "clockin — unattended daily report check-in bot")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Custom config file (overrides discovery in ./ and ~/.config/clockin/).
    #[arg(long, global = true, env = "CLOCKIN_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one submission (default when no subcommand is provided).
    Run,
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Check the config file for unknown fields and semantic problems.
    Validate,
    /// Print the config file path that would be used.
    Path,
}

/// Initialise tracing from the CLI flags; `RUST_LOG` wins when set.
fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

fn load(cli: &Cli) -> anyhow::Result<ClockinConfig> {
    match &cli.config {
        Some(path) => Ok(clockin_config::load_config(path)?),
        None => Ok(clockin_config::discover_and_load()),
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = load(cli)?;

    if config.report.url.is_empty() {
        anyhow::bail!(
            "report.url is not configured; create {} first",
            clockin_config::find_or_default_config_path().display()
        );
    }

    let provider = Arc::new(ChromeSessionProvider::new(config.browser.clone()));
    let notifier = Arc::new(MailNotifier::from_config(
        config.account.username.clone(),
        config.mail.clone(),
    ));
    let shots = ShotStore::new(config.report.shot_dir.clone());

    let bootstrap = Bootstrap::new(provider, notifier, shots, BootstrapConfig {
        report_url: config.report.url.clone(),
        username: config.account.username.clone(),
        password: config.account.password.clone(),
        attempt_interval: Duration::from_millis(config.report.attempt_interval_ms),
    });

    let mut retry = RetryState::new(config.report.max_attempts);
    let outcome = bootstrap.run(&mut retry).await;
    info!(outcome = %outcome, attempts = retry.attempts, "clockin run complete");
    Ok(())
}

fn validate_config(cli: &Cli) -> anyhow::Result<()> {
    let result = clockin_config::validate::validate(cli.config.as_deref());

    match &result.config_path {
        Some(path) => eprintln!("checking {}", path.display()),
        None => eprintln!("no config file found"),
    }
    for d in &result.diagnostics {
        if d.path.is_empty() {
            eprintln!("{}: {}", d.severity, d.message);
        } else {
            eprintln!("{}: {}: {}", d.severity, d.path, d.message);
        }
    }
    if result.has_errors() {
        anyhow::bail!("config validation failed");
    }
    eprintln!("config ok");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "clockin starting");

    match &cli.command {
        None | Some(Commands::Run) => run(&cli).await,
        Some(Commands::Config {
            action: ConfigAction::Validate,
        }) => validate_config(&cli),
        Some(Commands::Config {
            action: ConfigAction::Path,
        }) => {
            println!("{}", clockin_config::find_or_default_config_path().display());
            Ok(())
        },
    }
}
