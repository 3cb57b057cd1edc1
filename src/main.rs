use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use pmrun::collection::{load_collection, load_environment};
use pmrun::config::{load_config, EngineConfig};
use pmrun::engine::{print_request_run, Engine};
use pmrun::telemetry::build_dispatch;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(
    name = "pmrun",
    version,
    about = "Run requests and scripts from Postman collections",
    disable_help_subcommand = true
)]
struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one request, with its pre-request and test scripts
    Run {
        /// Collection file (Postman v2.1 JSON)
        #[arg(value_name = "COLLECTION")]
        collection: PathBuf,
        /// Request path, folders then request name (e.g. Users/List users)
        #[arg(value_name = "REQUEST")]
        request: String,
        /// Environment file (Postman JSON or .env)
        #[arg(short, long)]
        env: Option<PathBuf>,
        /// Directory or file containing pmrun.json
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Preview the first N bytes of the response body
        #[arg(short, long, default_value_t = 512)]
        preview: usize,
    },
    /// List the requests in a collection
    List {
        #[arg(value_name = "COLLECTION")]
        collection: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let dispatch = build_dispatch(cli.json_logs, level);
    let base_dir = std::env::current_dir()?;

    match cli.command {
        Commands::List { collection } => {
            let path = resolve_relative(&base_dir, &collection);
            let collection = load_collection(&path)?;
            for (breadcrumb, item) in collection.requests() {
                let method = item
                    .request
                    .as_ref()
                    .map(|request| request.method.to_uppercase())
                    .unwrap_or_default();
                println!(
                    "{:<7} {}",
                    method.bold(),
                    join_request_path(&breadcrumb, &item.name)
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run {
            collection,
            request,
            env,
            config,
            preview,
        } => {
            let collection_path = resolve_relative(&base_dir, &collection);
            let config_target = config
                .as_ref()
                .map(|p| resolve_relative(&base_dir, p))
                .or_else(|| collection_path.parent().map(Path::to_path_buf))
                .unwrap_or_else(|| base_dir.clone());
            let engine_config = load_config(&config_target)
                .context("loading configuration")?
                .map(|loaded| loaded.config)
                .unwrap_or_else(EngineConfig::default);

            let mut collection = load_collection(&collection_path)?;
            let mut environment = env
                .as_ref()
                .map(|p| load_environment(&resolve_relative(&base_dir, p)))
                .transpose()?;

            let (breadcrumb, name) = split_request_path(&request)?;
            let engine = Engine::new(engine_config, dispatch)?;
            let run = engine
                .run_request(&mut collection, &breadcrumb, &name, environment.as_mut())
                .await?;

            print_request_run(&run, Some(preview));
            Ok(if run.passed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

fn resolve_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Splits `Folder/Sub/Request` into the folder breadcrumb and request name.
fn split_request_path(path: &str) -> Result<(Vec<String>, String)> {
    let mut parts: Vec<String> = path
        .split('/')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect();
    let name = parts
        .pop()
        .with_context(|| format!("invalid request path '{path}'"))?;
    Ok((parts, name))
}

fn join_request_path(breadcrumb: &[String], name: &str) -> String {
    let mut parts = breadcrumb.to_vec();
    parts.push(name.to_string());
    parts.join("/")
}
