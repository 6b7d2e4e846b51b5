use std::fs;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, ValueEnum};
use collector::{
    metrics, AccountFilters, Collector, FetchMode, GraphqlRepoFetcher, LocationStrategy,
    OutputFormat, RecordBuffer,
};
use common::{logging, AppConfig, AppError};
use gh_broker::{GithubBrokerBuilder, GithubToken, RetryPolicy};
use tracing::{error, info, warn};

const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser, Debug)]
#[command(name = "fetch-repos")]
#[command(about = "Fetch GitHub repository metadata through the GraphQL API")]
#[command(version)]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["location", "query", "repo"])
))]
struct Cli {
    /// Fetch repositories of users and organizations in this location (e.g. "Peru")
    #[arg(long)]
    location: Option<String>,

    /// Custom GitHub search query (direct search, not location-based)
    #[arg(long)]
    query: Option<String>,

    /// Fetch a single repository by owner/name
    #[arg(long)]
    repo: Option<String>,

    /// Minimum star count
    #[arg(long, default_value_t = 1)]
    min_stars: u64,

    /// Extra search qualifiers, e.g. "language:Python pushed:>=2022-01-01"
    #[arg(long, default_value = "")]
    filter: String,

    /// Include forked repositories
    #[arg(long)]
    include_forks: bool,

    /// Stop account discovery after this many logins
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    max_users: Option<u64>,

    /// Maximum repositories for search-based modes
    #[arg(long, default_value_t = 10_000)]
    max_repos: usize,

    /// Skip organizations during location discovery
    #[arg(long)]
    no_orgs: bool,

    /// How --location is resolved
    #[arg(long, value_enum, default_value_t = StrategyArg::TwoStep)]
    location_strategy: StrategyArg,

    /// Language qualifier for the search strategy
    #[arg(long)]
    language: Option<String>,

    /// Output file; .parquet, .csv, .json or .jsonl (no extension means .parquet)
    #[arg(short, long)]
    output: PathBuf,

    /// GitHub personal access token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Directory holding config/default.* and config/local.*
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,

    /// Write Prometheus metrics to this file on exit
    #[arg(long)]
    metrics_file: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum StrategyArg {
    TwoStep,
    Search,
}

impl From<StrategyArg> for LocationStrategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::TwoStep => LocationStrategy::TwoStep,
            StrategyArg::Search => LocationStrategy::Search,
        }
    }
}

impl Cli {
    fn fetch_mode(&self) -> Result<FetchMode, AppError> {
        if let Some(nwo) = &self.repo {
            return Ok(FetchMode::Repo { nwo: nwo.clone() });
        }
        if let Some(query) = &self.query {
            return Ok(FetchMode::Query {
                query: query.clone(),
                min_stars: self.min_stars,
                max_repos: self.max_repos,
            });
        }
        let location = self
            .location
            .clone()
            .ok_or_else(|| AppError::invalid("one of --location, --query or --repo is required"))?;

        let strategy = LocationStrategy::from(self.location_strategy);
        if self.language.is_some() && strategy == LocationStrategy::TwoStep {
            return Err(AppError::invalid(
                "--language needs --location-strategy search; use --filter \"language:<L>\" instead",
            ));
        }

        Ok(FetchMode::Location {
            location,
            strategy,
            include_orgs: !self.no_orgs,
            max_users: self.max_users.map(|max| max as usize),
            max_repos: self.max_repos,
            language: self.language.clone(),
            filters: AccountFilters {
                min_stars: self.min_stars,
                include_forks: self.include_forks,
                extra_filter: self.filter.clone(),
            },
        })
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Before parsing, so `--token` can come from a GITHUB_TOKEN line in .env.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init_logging(logging::default_level(cli.verbose));

    match run(&cli).await {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, "fetch-repos failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<ExitCode> {
    let config = AppConfig::load_from_path(&cli.config_dir)?;
    let (format, output) = OutputFormat::resolve(&cli.output)?;
    let mode = cli.fetch_mode()?;

    let secret = cli
        .token
        .clone()
        .or_else(|| config.github.token.clone())
        .ok_or(AppError::MissingCredential)?;
    let broker = GithubBrokerBuilder::new(GithubToken::new(secret)?)
        .endpoint(config.github.endpoint.as_str())
        .user_agent(config.github.user_agent.as_str())
        .retry(RetryPolicy::from(&config.retry))
        .build()?;

    let collector = Collector::new(GraphqlRepoFetcher::new(broker, config.fetch.clone()));
    let mut buffer = RecordBuffer::new(format.sink(), &output, config.fetch.checkpoint_interval);

    info!(mode = mode.label(), output = %output.display(), "starting fetch");
    let outcome =
        until_interrupted(collector.run(&mode, &mut buffer), tokio::signal::ctrl_c()).await;

    let code = match outcome {
        Some(Ok(added)) => {
            info!(records = added, output = %output.display(), "saved results");
            ExitCode::SUCCESS
        }
        Some(Err(err)) => {
            error!(error = ?err, records = buffer.len(), "fetch failed; saving partial results");
            save_partial(&mut buffer);
            ExitCode::FAILURE
        }
        None => {
            warn!(records = buffer.len(), "interrupted; saving partial results");
            save_partial(&mut buffer);
            ExitCode::from(EXIT_INTERRUPTED)
        }
    };

    if let Some(path) = &cli.metrics_file {
        if let Err(err) = write_metrics(path) {
            warn!(path = %path.display(), error = ?err, "could not write metrics");
        }
    }
    Ok(code)
}

/// `None` once `interrupt` fires. An interrupt source that fails to install
/// is ignored and `run` finishes normally.
async fn until_interrupted<F, I>(run: F, interrupt: I) -> Option<F::Output>
where
    F: Future,
    I: Future<Output = io::Result<()>>,
{
    tokio::select! {
        result = run => Some(result),
        Ok(()) = interrupt => None,
    }
}

fn save_partial(buffer: &mut RecordBuffer) {
    if let Err(err) = buffer.flush() {
        error!(error = ?err, "saving partial results failed");
    }
}

fn write_metrics(path: &Path) -> Result<()> {
    let rendered = metrics::render()?;
    fs::write(path, rendered).with_context(|| format!("writing metrics to {}", path.display()))
}
