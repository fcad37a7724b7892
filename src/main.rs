use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use feedcache::{Config, FeedCacheError};

/// FIFO RSS feed archiver
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml", value_hint = clap::ValueHint::FilePath)]
    config: PathBuf,

    /// Process sources one after another
    #[arg(long, conflicts_with = "parallel")]
    sequential: bool,

    /// Process sources concurrently
    #[arg(long)]
    parallel: bool,

    /// Maximum number of entries kept per cache
    #[arg(long, value_name = "N")]
    max_items: Option<usize>,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if self.parallel {
            config.run.parallel = true;
        }
        if self.sequential {
            config.run.parallel = false;
        }
        if let Some(max_items) = self.max_items {
            config.cache.max_items = max_items;
        }
    }
}

/// Load the configuration file, falling back to defaults when it does not exist.
fn load_config(path: &Path) -> feedcache::Result<Config> {
    match Config::load_with_env(path) {
        Err(FeedCacheError::Io(e)) if e.kind() == ErrorKind::NotFound => {
            eprintln!("{} not found, using default configuration.", path.display());
            let mut config = Config::default();
            config.apply_env_overrides();
            Ok(config)
        }
        result => result,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", cli.config.display());
            return ExitCode::FAILURE;
        }
    };
    cli.apply(&mut config);

    // Initialize logging
    if let Err(e) = feedcache::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        feedcache::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {e}");
        eprintln!("Invalid configuration: {e}");
        return ExitCode::FAILURE;
    }

    info!("feedcache {}", env!("CARGO_PKG_VERSION"));

    match feedcache::feed::run(&config).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Run aborted: {e}");
            eprintln!("Run aborted: {e}");
            ExitCode::FAILURE
        }
    }
}
