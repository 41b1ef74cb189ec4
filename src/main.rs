use aptos_guardian::{config::AppConfig, supervisor::Supervisor, version};
use clap::Parser;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(author, about, long_about = None, disable_version_flag = true)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, default_value = "configs/example.yaml")]
    config: String,

    /// Print version information and exit.
    #[arg(long)]
    version: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.version {
        println!("version: {}", version::VERSION);
        println!("commit: {}", version::COMMIT);
        println!("buildDate: {}", version::BUILD_DATE);
        return;
    }

    // Initialize tracing subscriber
    let subscriber =
        FmtSubscriber::builder().with_env_filter(EnvFilter::from_default_env()).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    if let Err(err) = run(&cli.config).await {
        tracing::error!(error = %err, "startup failed");
        std::process::exit(1);
    }
}

async fn run(config_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load(config_path)?;
    tracing::info!(config = config_path, interval_secs = config.interval.as_secs(), "starting");

    let supervisor = Supervisor::builder().config(config).build().await?;
    supervisor.run().await?;
    Ok(())
}
