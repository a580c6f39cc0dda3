//! `stance` command line entry point

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use stance_agent::OpenAiClient;
use stance_core::{logging, FileCheckpointStore, Pipeline, PipelineConfig};
use stance_tools::{
    actor_start_units, ActorClient, ApifyClient, ApifyConfig, ApifyMeter, ApifyToolkit,
    CachedActorClient, LogMeter, Meter,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

fn cli() -> Command {
    Command::new("stance")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Investigate the public stance of a person from their social media")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("investigate")
                .about("Resolve handles, gather posts, score them and print the report")
                .arg(
                    Arg::new("name")
                        .long("name")
                        .required(true)
                        .help("Full name of the person to investigate"),
                )
                .arg(
                    Arg::new("stance")
                        .long("stance")
                        .help("Stance to investigate, e.g. pro-western"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML configuration file"),
                )
                .arg(Arg::new("model").long("model").help("Model name"))
                .arg(
                    Arg::new("posts")
                        .long("posts")
                        .value_parser(value_parser!(u32))
                        .help("Most recent posts fetched per network"),
                )
                .arg(
                    Arg::new("checkpoint-dir")
                        .long("checkpoint-dir")
                        .value_parser(value_parser!(PathBuf))
                        .help("Write a state snapshot after each stage"),
                )
                .arg(
                    Arg::new("cache")
                        .long("cache")
                        .action(ArgAction::SetTrue)
                        .help("Cache actor results in memory"),
                )
                .arg(
                    Arg::new("debug")
                        .long("debug")
                        .action(ArgAction::SetTrue)
                        .help("Verbose logging"),
                )
                .arg(
                    Arg::new("log-json")
                        .long("log-json")
                        .action(ArgAction::SetTrue)
                        .help("Log one JSON object per line"),
                ),
        )
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli().get_matches();
    let Some(("investigate", args)) = matches.subcommand() else {
        return ExitCode::FAILURE;
    };

    if let Err(e) = logging::init(args.get_flag("debug"), args.get_flag("log-json")) {
        eprintln!("cannot initialise logging: {e}");
    }

    match investigate(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Investigation failed: {e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &ArgMatches) -> Result<PipelineConfig> {
    let mut config = match args.get_one::<PathBuf>("config") {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(stance) = args.get_one::<String>("stance") {
        config = config.with_stance(stance.as_str());
    }
    if let Some(model) = args.get_one::<String>("model") {
        config = config.with_model(model.as_str());
    }
    if let Some(posts) = args.get_one::<u32>("posts") {
        config = config.with_posts_per_network(*posts);
    }
    if let Some(dir) = args.get_one::<PathBuf>("checkpoint-dir") {
        config = config.with_checkpoint_dir(dir.clone());
    }
    if args.get_flag("cache") {
        config = config.with_cache(true);
    }
    config.validate()?;
    Ok(config)
}

fn meter() -> Arc<dyn Meter> {
    match ApifyMeter::from_env() {
        Ok(meter) => Arc::new(meter),
        Err(e) => {
            tracing::debug!("Charges are logged only: {e}");
            Arc::new(LogMeter)
        }
    }
}

async fn investigate(args: &ArgMatches) -> Result<()> {
    let config = load_config(args)?;
    let name = args
        .get_one::<String>("name")
        .context("--name is required")?
        .clone();

    let llm = OpenAiClient::from_env(config.model.to_openai()).context("model client")?;
    let apify = ApifyClient::new(ApifyConfig::from_env()?).context("actor client")?;
    let mut actors: Arc<dyn ActorClient> = Arc::new(apify);
    let mut cache = None;
    if config.cache.enabled {
        let cached = CachedActorClient::new(actors, config.cache.capacity, config.cache.ttl());
        cache = Some(cached.clone());
        actors = Arc::new(cached);
    }
    let toolkit = ApifyToolkit::new(actors)
        .with_settings(config.scrape_settings())
        .with_networks(config.networks.clone());

    let memory_mbytes = std::env::var("ACTOR_MEMORY_MBYTES")
        .ok()
        .and_then(|v| v.parse::<u64>().ok());
    let checkpoint_dir = config.checkpoint.dir.clone();

    let mut pipeline = Pipeline::new(Arc::new(llm), Arc::new(toolkit), config)
        .with_meter(meter())
        .with_start_units(actor_start_units(memory_mbytes));
    if let Some(dir) = checkpoint_dir {
        pipeline = pipeline.with_checkpoints(Arc::new(FileCheckpointStore::new(dir)));
    }

    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let run = pipeline.run_with_shutdown(&name, shutdown).await?;
    if let Some(cache) = cache {
        let stats = cache.stats().await;
        tracing::info!(entries = stats.entry_count, "Actor cache at end of run");
    }

    println!("{}", serde_json::to_string_pretty(&run.report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn flags_override_the_config() {
        let matches = cli().get_matches_from([
            "stance",
            "investigate",
            "--name",
            "Tomio Okamura",
            "--stance",
            "pro-EU",
            "--posts",
            "3",
            "--cache",
        ]);
        let (_, args) = matches.subcommand().unwrap();
        let config = load_config(args).unwrap();

        assert_eq!(config.stance, "pro-EU");
        assert_eq!(config.posts_per_network, 3);
        assert!(config.cache.enabled);
        assert!(config.checkpoint.dir.is_none());
    }

    #[test]
    fn zero_posts_is_rejected() {
        let matches = cli().get_matches_from(["stance", "investigate", "--name", "x", "--posts", "0"]);
        let (_, args) = matches.subcommand().unwrap();
        assert!(load_config(args).is_err());
    }
}
