//! Varscope CLI
//!
//! Entry point for the `varscope` command-line tool.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use varscope::config::{extra_vars, ConfigError, ScopeFiles, ScopeStack, Settings};
use varscope::logging::init_logger;

#[derive(Parser)]
#[command(name = "varscope")]
#[command(about = "Resolve layered variable scopes", version)]
struct Cli {
    /// Enable debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the composed variables as JSON
    Resolve {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Print only the value of this variable
        #[arg(long, short = 'k')]
        key: Option<String>,
    },

    /// List every variable name, one per line
    Keys {
        #[command(flatten)]
        scope: ScopeArgs,
    },
}

#[derive(Args)]
struct ScopeArgs {
    /// Settings file (TOML)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Override hash behaviour: override or merge
    #[arg(long)]
    hash_behaviour: Option<String>,

    /// Defaults scope file (lowest precedence)
    #[arg(long)]
    defaults: Option<PathBuf>,

    /// Group scope file; repeat in increasing precedence
    #[arg(long, short = 'g')]
    group: Vec<PathBuf>,

    /// Host scope file
    #[arg(long)]
    host: Option<PathBuf>,

    /// Extra variable key=value (highest precedence); value is JSON or a string
    #[arg(long = "set", short = 'e')]
    set: Vec<String>,
}

fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let result = match cli.command {
        Commands::Resolve { scope, key } => run_resolve(scope, key),
        Commands::Keys { scope } => run_keys(scope),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn load_stack(args: ScopeArgs) -> Result<ScopeStack, ConfigError> {
    let settings = match &args.settings {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };
    let settings = settings
        .with_env()?
        .with_hash_behaviour(args.hash_behaviour.as_deref())?;

    let files = ScopeFiles {
        defaults: args.defaults,
        groups: args.group,
        host: args.host,
    };
    ScopeStack::build(&settings, &files, extra_vars(&args.set)?)
}

fn run_resolve(args: ScopeArgs, key: Option<String>) -> Result<(), ConfigError> {
    let stack = load_stack(args)?;

    match key {
        Some(key) => {
            let value = stack.vars().get(&key)?;
            println!("{}", to_pretty(&value)?);
        }
        None => {
            let resolved = stack.resolve();
            let json = resolved
                .to_json()
                .map_err(|e| ConfigError::ParseError(format!("JSON serialization failed: {}", e)))?;
            println!("{}", json);
        }
    }
    Ok(())
}

fn run_keys(args: ScopeArgs) -> Result<(), ConfigError> {
    let stack = load_stack(args)?;
    for key in stack.vars() {
        println!("{}", key);
    }
    Ok(())
}

fn to_pretty(value: &serde_json::Value) -> Result<String, ConfigError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ConfigError::ParseError(format!("JSON serialization failed: {}", e)))
}
