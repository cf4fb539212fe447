mod cmd;
mod output;
mod settings;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "casedesk",
    about = "Session guard and backend proxy for the casedesk web app",
    version,
    propagate_version = true
)]
struct Cli {
    /// YAML config file (defaults apply when omitted)
    #[arg(long, global = true, env = "CASEDESK_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(long, global = true, env = "CASEDESK_PORT")]
    port: Option<u16>,

    /// Base URL of the backend API
    #[arg(long, global = true, env = "CASEDESK_BACKEND_URL")]
    backend_url: Option<String>,

    /// Secret the backend signs session tokens with
    #[arg(long, global = true, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the gateway
    Serve {
        /// Directory of built pages served behind the guard
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Validate the effective configuration
    CheckConfig,

    /// Export a document as plain text or Markdown
    Export {
        /// Markdown source file (reads stdin when omitted)
        input: Option<PathBuf>,
        /// Document name used for the file name
        #[arg(long, default_value = "document")]
        name: String,
        /// txt or md
        #[arg(long, default_value = "txt")]
        format: String,
        /// Output file or directory (writes to stdout when omitted)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Verify a session token and print its claims
    VerifyToken {
        token: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let static_dir = match &cli.command {
        Commands::Serve { static_dir } => static_dir.clone(),
        _ => None,
    };
    let overrides = settings::Overrides {
        port: cli.port,
        backend_url: cli.backend_url,
        jwt_secret: cli.jwt_secret,
        static_dir,
    };

    let result = settings::load(cli.config.as_deref(), overrides).and_then(|config| {
        match cli.command {
            Commands::Serve { .. } => cmd::serve::run(config),
            Commands::CheckConfig => cmd::check_config::run(&config, cli.json),
            Commands::Export {
                input,
                name,
                format,
                output,
            } => cmd::export::run(&name, &format, input.as_deref(), output.as_deref()),
            Commands::VerifyToken { token } => cmd::verify_token::run(&config, &token),
        }
    });

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
