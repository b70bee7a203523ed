use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use loongclaw::cli::{parse_args, ToolSession};
use loongclaw::core::AppConfig;
use loongclaw::logging;
use loongclaw::tools::ToolExecutor;

/// LoongClaw - sandboxed local tools with a command policy
#[derive(Parser, Debug)]
#[command(name = "loongclaw")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Workspace directory (overrides WORKSPACE_DIR)
    #[arg(short = 'w', long = "workspace", global = true)]
    workspace: Option<PathBuf>,

    /// Print results as JSON (overrides JSON_OUTPUT)
    #[arg(long, global = true)]
    json: bool,

    /// Hide the tool call trace (overrides SHOW_TOOLS)
    #[arg(short = 'q', long, global = true)]
    quiet: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start the interactive console (default)
    Repl,

    /// Run a single tool call
    Call {
        /// Tool name
        tool: String,

        /// Arguments as a JSON object
        args: Option<String>,
    },

    /// Run one tool call per line of a script
    RunFile {
        /// Script path; blank lines and `#` comments are skipped
        script: PathBuf,
    },

    /// List available tools
    Tools,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = AppConfig::from_env()?;
    if let Some(workspace) = cli.workspace {
        config = config.with_workspace_dir(workspace);
    }
    if cli.json {
        config = config.with_json_output(true);
    }
    if cli.quiet {
        config = config.with_show_tools(false);
    }

    // Keep the guard alive so the log file is flushed on exit
    let _guard = logging::init_logging_with(&config)?;

    tracing::info!("=== LoongClaw Starting ===");

    let executor = ToolExecutor::new(&config)?;
    tracing::info!("Registered {} tools", executor.registry().len());
    let session = ToolSession::new(executor, &config);

    let code = match cli.command.unwrap_or(Commands::Repl) {
        Commands::Repl => {
            session.run_repl().await?;
            ExitCode::SUCCESS
        }
        Commands::Call { tool, args } => {
            let args = parse_args(args.as_deref().unwrap_or(""))?;
            match session.invoke(&tool, &args).await {
                Ok(_) => ExitCode::SUCCESS,
                Err(_) => ExitCode::FAILURE,
            }
        }
        Commands::RunFile { script } => {
            if session.run_file(&script).await? == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Commands::Tools => {
            session.print_tools(cli.json)?;
            ExitCode::SUCCESS
        }
    };

    tracing::info!("=== LoongClaw Shutting Down ===");

    Ok(code)
}
