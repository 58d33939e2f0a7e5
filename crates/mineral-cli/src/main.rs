use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use mineral_core::{ConfigManager, LoggingConfig, MineralConfig, OptimizationStrategy, Term};
use mineral_eval::{FunctionRegistry, Outcome, RecursiveFunction};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "mineral")]
#[command(about = "Mineral - memoized recursive SPARQL function", long_about = None)]
#[command(version)]
struct Cli {
    /// Output format (json, pretty)
    #[arg(short, long, global = true, default_value = "pretty")]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true, env = "MINERAL_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Clone, ValueEnum)]
enum StrategyArg {
    None,
    Memo,
    Fast,
}

impl From<StrategyArg> for OptimizationStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::None => OptimizationStrategy::None,
            StrategyArg::Memo => OptimizationStrategy::Memo,
            StrategyArg::Fast => OptimizationStrategy::Fast,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one call of the function against the configured endpoint
    Eval {
        #[command(flatten)]
        call: CallArgs,

        /// Override the optimization strategy
        #[arg(short, long, value_enum)]
        strategy: Option<StrategyArg>,

        /// Override the SPARQL endpoint
        #[arg(short, long)]
        endpoint: Option<String>,
    },

    /// Print the query a call would send, without sending it
    Query {
        #[command(flatten)]
        call: CallArgs,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(clap::Args)]
struct CallArgs {
    /// Query snippet (the recursive expression)
    snippet: String,

    /// Function arguments in SPARQL term syntax (1, "text", <iri>, "x"@en, ...)
    args: Vec<String>,

    /// Override the template file
    #[arg(short, long)]
    template: Option<PathBuf>,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Destination path
        #[arg(default_value = ".mineral.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Serialize)]
struct EvalReport {
    result: String,
    outcome: &'static str,
    strategy: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache: Option<CacheReport>,
}

#[derive(Serialize)]
struct CacheReport {
    hits: u64,
    misses: u64,
    cycles: u64,
    entries: usize,
}

fn outcome_kind(outcome: &Outcome) -> &'static str {
    match outcome {
        Outcome::Value(_) => "value",
        Outcome::NoMatch => "no_match",
        Outcome::CycleDetected => "cycle_detected",
        Outcome::Pruned => "pruned",
    }
}

fn init_tracing(logging: &LoggingConfig, verbose: bool) {
    let default_level = if verbose { "debug" } else { logging.level.as_str() };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so the printed result stays machine readable.
    match logging.format.as_str() {
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        "compact" => registry
            .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
            .init(),
        _ => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

/// Scoped subscriber for the configuration load itself, which runs before the configured one
/// can be installed.
fn bootstrap_subscriber<W>(
    filter: EnvFilter,
    writer: W,
) -> impl tracing::Subscriber + Send + Sync + 'static
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .finish()
}

fn load_config(path: Option<&PathBuf>) -> Result<MineralConfig> {
    let manager = match path {
        Some(path) => ConfigManager::load_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ConfigManager::load().context("loading configuration")?,
    };
    Ok(manager.into_config())
}

fn parse_call(call: &CallArgs) -> Result<Vec<Term>> {
    let mut terms = vec![Term::string(call.snippet.clone())];
    for arg in &call.args {
        let term = arg
            .parse::<Term>()
            .with_context(|| format!("invalid argument '{}'", arg))?;
        terms.push(term);
    }
    Ok(terms)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let bootstrap = bootstrap_subscriber(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        std::io::stderr,
    );
    let mut config =
        tracing::subscriber::with_default(bootstrap, || load_config(cli.config.as_ref()))?;
    init_tracing(&config.logging, cli.verbose);
    tracing::debug!("effective configuration: {:?}", config);

    match cli.command {
        Commands::Eval {
            call,
            strategy,
            endpoint,
        } => {
            if let Some(strategy) = strategy {
                config.function.strategy = strategy.into();
            }
            if let Some(endpoint) = endpoint {
                config.oracle.endpoint = Some(endpoint);
            }
            if let Some(template) = call.template.clone() {
                config.template.path = Some(template);
            }
            ConfigManager::validate_config(&config)?;

            let function = Arc::new(
                RecursiveFunction::from_config(&config).context("initializing function")?,
            );
            let registry = FunctionRegistry::new();
            registry.register(function.clone());

            let args = parse_call(&call)?;
            registry.check_build(function.iri(), args.len())?;
            let outcome = function.exec(&args).await?;

            let stats = function.cache_stats();
            let report = EvalReport {
                result: outcome.to_term().to_string(),
                outcome: outcome_kind(&outcome),
                strategy: function.strategy().to_string(),
                cache: cli.verbose.then(|| CacheReport {
                    hits: stats.hits,
                    misses: stats.misses,
                    cycles: stats.cycles,
                    entries: stats.entries,
                }),
            };
            print_report(&cli.output, &report)?;
        }
        Commands::Query { call } => {
            if let Some(template) = call.template.clone() {
                config.template.path = Some(template);
            }
            let path = config
                .template
                .path
                .clone()
                .context("no template configured (set MINERAL_SPARQL_TEMPLATE or --template)")?;
            let template = mineral_eval::QueryTemplate::load(&path)?;
            let args = parse_call(&call)?;
            println!("{}", template.build(&args)?);
        }
        Commands::Config(ConfigCommands::Show) => match cli.output {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
            OutputFormat::Pretty => {
                println!("{}", "Mineral configuration".bold());
                println!("  function:  {}", config.function.iri);
                println!("  strategy:  {}", config.function.strategy.to_string().cyan());
                println!("  order:     {:?}", config.function.order);
                println!(
                    "  endpoint:  {}",
                    config
                        .oracle
                        .endpoint
                        .as_deref()
                        .unwrap_or("(not set)")
                );
                println!("  timeout:   {}s", config.oracle.timeout_secs);
                println!(
                    "  template:  {}",
                    config
                        .template
                        .path
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "(not set)".to_string())
                );
                println!("  log level: {}", config.logging.level);
            }
        },
        Commands::Config(ConfigCommands::Init { path, force }) => {
            if path.exists() && !force {
                anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
            }
            ConfigManager::create_default_config(&path)?;
            println!("{} {}", "Wrote".green(), path.display());
        }
    }

    Ok(())
}

fn print_report(format: &OutputFormat, report: &EvalReport) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Pretty => {
            let result = if report.outcome == "value" {
                report.result.green()
            } else {
                report.result.yellow()
            };
            println!("{}", result);
            println!("  outcome:  {}", report.outcome);
            println!("  strategy: {}", report.strategy);
            if let Some(cache) = &report.cache {
                println!(
                    "  cache:    {} hits, {} misses, {} cycles, {} entries",
                    cache.hits, cache.misses, cache.cycles, cache.entries
                );
            }
        }
    }
    Ok(())
}
