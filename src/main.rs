use clap::{Parser, Subcommand};
use colored::Colorize;
use corral::config::Config;
use corral::dispatch::Dispatcher;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "corral")]
#[command(about = "Run agent tool calls confined to a working directory.")]
struct Cli {
    /// Config file (default: ~/.corral/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Override the sandbox root
    #[arg(long, global = true)]
    root: Option<String>,
    /// Override the project root
    #[arg(long, global = true)]
    project_root: Option<String>,
    /// Log every call with its arguments and resolved boundary
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Invoke a tool and print the JSON envelope
    Call {
        /// Tool name, e.g. read_file
        name: String,
        /// Arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },
    /// List available tools
    Tools,
    /// Print tool declarations as JSON
    Schema,
    /// Show configuration
    Config,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "corral=debug" } else { "corral=warn" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Config {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    if let Some(root) = &cli.root {
        config.sandbox.root = root.clone();
    }
    if let Some(project_root) = &cli.project_root {
        config.sandbox.project_root = project_root.clone();
    }
    config
}

fn run_call(cfg: &Config, name: &str, args: &str) -> ExitCode {
    let arguments: serde_json::Value = match serde_json::from_str(args) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("{} --args is not valid JSON: {}", "Error:".red(), e);
            return ExitCode::FAILURE;
        }
    };

    let dispatcher = Dispatcher::from_config(cfg);
    let envelope = dispatcher.invoke(name, arguments);
    match serde_json::to_string(&envelope) {
        Ok(s) => println!("{}", s),
        Err(e) => {
            eprintln!("Error serializing envelope: {}", e);
            return ExitCode::FAILURE;
        }
    }

    if envelope.is_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let cfg = load_config(&cli);

    match &cli.command {
        Commands::Call { name, args } => run_call(&cfg, name, args),
        Commands::Tools => {
            let dispatcher = Dispatcher::from_config(&cfg);
            println!("{}", "Available tools:".bold());
            println!();
            for tool in dispatcher.registry().list() {
                println!("  {} - {}", tool.name().cyan(), tool.description());
            }
            ExitCode::SUCCESS
        }
        Commands::Schema => {
            let dispatcher = Dispatcher::from_config(&cfg);
            match serde_json::to_string_pretty(&dispatcher.registry().definitions()) {
                Ok(s) => {
                    println!("{}", s);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("Error serializing tool declarations: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
        Commands::Config => {
            println!("{}", "Current configuration:".bold());
            println!();
            match cfg.to_toml() {
                Ok(s) => {
                    println!("{}", s);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("Error serializing config: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}
