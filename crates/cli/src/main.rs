use clap::{Parser, Subcommand};
use relay::config::Config;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "Messenger to Gemini webhook relay", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Run the webhook server.
    ///
    /// Secrets come from the config file and the environment (VERIFY_TOKEN, PAGE_ACCESS_TOKEN,
    /// APP_SECRET, GEMINI_API_KEY, FB_PAGE_ID, PORT).
    Serve {
        /// Config file path (default: RELAY_CONFIG_PATH or ~/.relay/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// HTTP port (default from PORT, config, or 8080)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Print the X-Hub-Signature header value for a payload file, signed with the app secret.
    Sign {
        /// Config file path (default: RELAY_CONFIG_PATH or ~/.relay/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// File containing the exact request body to sign.
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("relay {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                log::error!("serve failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Sign { config, file }) => {
            if let Err(e) = run_sign(config, file) {
                log::error!("sign failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

/// Loaded config with the `--port` flag applied on top of file and environment values.
fn resolve_serve_config(
    config_path: Option<PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<Config> {
    let (mut config, path) = relay::config::load_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    log::debug!("config loaded from {}", path.display());
    Ok(config)
}

async fn run_serve(config_path: Option<PathBuf>, port: Option<u16>) -> anyhow::Result<()> {
    let config = resolve_serve_config(config_path, port)?;
    log::info!(
        "starting relay on {}:{}",
        config.gateway.bind,
        config.gateway.port
    );
    relay::gateway::run_gateway(config).await
}

fn signature_for_file(config: &Config, file: &Path) -> anyhow::Result<String> {
    use anyhow::Context;

    let secret = config
        .messenger
        .app_secret
        .as_deref()
        .context("app secret not configured (set APP_SECRET or messenger.appSecret)")?;
    let body = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    relay::channels::signature::sign_payload(secret, &body).context("computing signature")
}

fn run_sign(config_path: Option<PathBuf>, file: PathBuf) -> anyhow::Result<()> {
    let (config, _) = relay::config::load_config(config_path)?;
    println!("{}", signature_for_file(&config, &file)?);
    Ok(())
}
