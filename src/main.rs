use anyhow::Context;
use browser_scenarios::scenario::catalog;
use browser_scenarios::{
    ChromeBrowser, Config, MailboxChannel, Scenario, ScenarioRegistry, ScenarioRunner,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "browser-scenarios")]
#[command(about = "Run browser scenarios against a web authentication service")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, env = "SCENARIOS_CONFIG")]
    config: Option<PathBuf>,

    /// Directory of YAML scenarios; the built-in catalog is used when omitted
    #[arg(short, long)]
    scenarios: Option<PathBuf>,

    /// Run only this scenario
    #[arg(short, long)]
    name: Option<String>,

    /// Run only scenarios with this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// List scenario names and exit
    #[arg(long)]
    list: bool,

    /// Base URL of the service under test
    #[arg(long, env = "SCENARIOS_BASE_URL")]
    base_url: Option<String>,

    #[arg(long)]
    headless: Option<bool>,

    #[arg(long)]
    max_concurrency: Option<usize>,

    /// Write scenario-results.json into this directory
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(base_url) = &cli.base_url {
        config.target.base_url = base_url.clone();
    }
    if let Some(headless) = cli.headless {
        config.browser.headless = headless;
    }
    if let Some(max_concurrency) = cli.max_concurrency {
        config.runner.max_concurrency = max_concurrency;
    }

    config.validate()?;
    Ok(config)
}

fn load_scenarios(cli: &Cli) -> anyhow::Result<Vec<Scenario>> {
    match &cli.scenarios {
        Some(dir) => {
            let scenarios = Scenario::load_all(dir)
                .with_context(|| format!("loading scenarios from {}", dir.display()))?;
            if scenarios.is_empty() {
                warn!("No scenarios found in {}", dir.display());
            }
            Ok(scenarios)
        }
        None => Ok(catalog::all()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_config(&cli)?;
    let channel = MailboxChannel::new(config.channel.clone())?;

    let runner = ScenarioRunner::new(config, ChromeBrowser::new).with_channel(Arc::new(channel));
    let mut registry = ScenarioRegistry::new(runner);
    registry.register_all(load_scenarios(&cli)?)?;

    if let Some(tag) = &cli.tag {
        registry.filter_by_tag(tag);
    }
    if let Some(name) = &cli.name {
        registry.select(name)?;
    }

    if cli.list {
        for name in registry.names() {
            println!("{}", name);
        }
        return Ok(());
    }

    info!(
        "Running {} scenarios against {}",
        registry.len(),
        registry.runner().config().target.base_url
    );

    let report = registry.run_all().await;
    for line in report.summary_lines() {
        println!("{}", line);
    }
    println!(
        "{} passed, {} failed ({} ms)",
        report.passed(),
        report.failed(),
        report.duration_ms
    );

    if let Some(dir) = &cli.output {
        report.write_json(dir)?;
    }

    std::process::exit(report.exit_code());
}
