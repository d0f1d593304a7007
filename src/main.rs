use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use board_insights::InsightsError;
use board_insights::cli::commands::report::ReportRunOptions;
use board_insights::cli::ui::Output;
use board_insights::cli::{ConfigOverrides, CredentialArgs};

#[derive(Parser)]
#[command(name = "board-insights")]
#[command(version, about = "AI-driven sprint reports generated from Trello boards")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, short, global = true, help = "Config file (default: global + project config)")]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

/// Trello credentials; each falls back to its environment variable
#[derive(Args)]
struct CredentialFlags {
    #[arg(long, env = "TRELLO_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    #[arg(long, env = "TRELLO_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,
    #[arg(long, env = "TRELLO_BOARD_ID")]
    board_id: Option<String>,
}

impl From<CredentialFlags> for CredentialArgs {
    fn from(flags: CredentialFlags) -> Self {
        Self {
            api_key: flags.api_key,
            api_token: flags.api_token,
            board_id: flags.board_id,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a sprint report for a board
    Report {
        #[command(flatten)]
        credentials: CredentialFlags,
        #[arg(long, short, help = "Write the report to a file instead of stdout")]
        output: Option<PathBuf>,
        #[arg(long, help = "Agent definitions (YAML)")]
        agents: Option<PathBuf>,
        #[arg(long, help = "Task definitions (YAML)")]
        tasks: Option<PathBuf>,
        #[arg(long, help = "Model to use")]
        model: Option<String>,
        #[arg(long, help = "Print the full run record, provenance included, as JSON")]
        json: bool,
    },

    /// Fetch board or card data without running any agent
    Fetch {
        #[command(flatten)]
        credentials: CredentialFlags,
        #[arg(long, help = "Fetch a single card instead of the whole board")]
        card: Option<String>,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },

    /// Validate and show the stage definitions
    Stages {
        #[arg(long, help = "Agent definitions (YAML)")]
        agents: Option<PathBuf>,
        #[arg(long, help = "Task definitions (YAML)")]
        tasks: Option<PathBuf>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(
            short = 'f',
            long,
            default_value = "toml",
            help = "Output format: toml, json"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mboard-insights encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Backtrace when RUST_BACKTRACE=1
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<InsightsError>() {
                Some(err) => Output::new().failure(err),
                None => eprintln!("\x1b[31mError:\x1b[0m {}", e),
            }
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "board_insights=debug,info"
    } else if cli.quiet {
        "error"
    } else {
        "warn,board_insights=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Report {
            credentials,
            output,
            agents,
            tasks,
            model,
            json,
        } => {
            board_insights::cli::commands::report::run(ReportRunOptions {
                config_path: cli.config,
                credentials: credentials.into(),
                output,
                json,
                overrides: ConfigOverrides {
                    agents_file: agents,
                    tasks_file: tasks,
                    model,
                },
                quiet: cli.quiet,
            })?;
        }
        Commands::Fetch {
            credentials,
            card,
            format,
        } => {
            board_insights::cli::commands::fetch::run(
                cli.config,
                credentials.into(),
                card,
                &format,
            )?;
        }
        Commands::Stages { agents, tasks } => {
            board_insights::cli::commands::stages::run(agents, tasks)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => {
                board_insights::cli::commands::config::show(cli.config, &format)?;
            }
            ConfigAction::Path => {
                board_insights::cli::commands::config::path()?;
            }
            ConfigAction::Init { global, force } => {
                board_insights::cli::commands::config::init(global, force)?;
            }
        },
    }

    Ok(())
}
