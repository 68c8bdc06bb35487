//! UniGuide CLI
//!
//! Runs the REST server and the batch jobs against a local storage directory.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Parser, Subcommand};
use uniguide::{
    app::AppContext,
    config::{Secrets, load_config},
    error::{AppError, Result},
    models::{AcademicLevel, BudgetRange, Config, PathwayProfile, Plan},
    pipeline::{self, Progress},
    services::usage::view_for_plan,
    storage::{Db, LocalStorage},
    utils,
};

/// UniGuide - Study-abroad advising backend
#[derive(Parser, Debug)]
#[command(
    name = "uniguide",
    version,
    about = "Study-abroad advising backend and batch jobs"
)]
struct Cli {
    /// Path to storage directory holding the collections
    #[arg(short, long, default_value = "storage", global = true)]
    storage_dir: PathBuf,

    /// Path to config file (default: {storage_dir}/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the REST API server
    #[cfg(feature = "server")]
    Serve,

    /// Insert universities found through Places searches
    Populate,

    /// Pre-generate pathway templates for the configured profile matrix
    ScrapePathways,

    /// Convert stored 4-point CGPA thresholds to the 10-point scale
    ConvertCgpa,

    /// Remove duplicate universities
    Dedupe {
        /// Report duplicate groups without deleting anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Resolve a pathway and print it as JSON
    Resolve {
        #[arg(long)]
        country: String,

        #[arg(long)]
        course: String,

        /// diploma, undergraduate, postgraduate or doctorate
        #[arg(long, value_parser = parse_level, default_value = "postgraduate")]
        level: AcademicLevel,

        /// low, medium, high or premium
        #[arg(long, value_parser = parse_budget, default_value = "medium")]
        budget: BudgetRange,

        #[arg(long)]
        nationality: String,

        /// Print the free-tier view
        #[arg(long)]
        free: bool,
    },

    /// Change the subscription plan of a user
    SetPlan {
        /// User id (token uid)
        #[arg(long)]
        user: String,

        /// free, premium or pro
        #[arg(long, value_parser = parse_plan)]
        plan: Plan,
    },

    /// Validate configuration file
    Validate,

    /// Show storage and configuration info
    Info,
}

fn parse_level(value: &str) -> std::result::Result<AcademicLevel, String> {
    AcademicLevel::ALL
        .into_iter()
        .find(|level| level.as_str().eq_ignore_ascii_case(value.trim()))
        .ok_or_else(|| format!("unknown academic level: {value}"))
}

fn parse_budget(value: &str) -> std::result::Result<BudgetRange, String> {
    BudgetRange::ALL
        .into_iter()
        .find(|budget| budget.as_str().eq_ignore_ascii_case(value.trim()))
        .ok_or_else(|| format!("unknown budget range: {value}"))
}

fn parse_plan(value: &str) -> std::result::Result<Plan, String> {
    [Plan::Free, Plan::Premium, Plan::Pro]
        .into_iter()
        .find(|plan| plan.as_str().eq_ignore_ascii_case(value.trim()))
        .ok_or_else(|| format!("unknown plan: {value}"))
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Raise the stop flag on Ctrl+C. Jobs finish the item in flight.
fn install_stop_handler() -> Arc<AtomicBool> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Ctrl+C received, stopping after the current item...");
            flag.store(true, Ordering::SeqCst);
        }
    });
    stop
}

/// Run a job with its progress events drained into the log.
async fn with_progress<F, Fut, T>(job: F) -> T
where
    F: FnOnce(Progress) -> Fut,
    Fut: Future<Output = T>,
{
    let (progress, rx) = Progress::channel();
    let drain = tokio::spawn(pipeline::log_progress(rx));
    let out = job(progress).await;
    let _ = drain.await;
    out
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("UniGuide starting...");

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.storage_dir.join("config.toml"));

    if let Command::Validate = cli.command {
        log::info!("Validating {}...", config_path.display());
        let config = Config::load(&config_path)?;
        if let Err(e) = config.validate() {
            log::error!("Config validation failed: {}", e);
            return Err(e);
        }
        log::info!("✓ Config OK");
        log::info!(
            "  {} scraping combinations, {} populate cities",
            pipeline::combinations(&config.scraping).len(),
            config.populate.iter().map(|t| t.cities.len()).sum::<usize>()
        );
        return Ok(());
    }

    let config = load_config(&config_path)?;
    log::info!("Loaded configuration from {}", config_path.display());

    let storage = Arc::new(LocalStorage::new(&cli.storage_dir));
    let db = Db::new(storage.clone());
    let secrets = Secrets::from_env(&config);
    let ctx = AppContext::new(config, db, secrets)?;

    match cli.command {
        #[cfg(feature = "server")]
        Command::Serve => {
            uniguide::api::serve(Arc::new(ctx)).await?;
        }

        Command::Populate => {
            let places = ctx.places.clone().ok_or_else(|| {
                AppError::config(format!(
                    "{} is not set and no Places proxy is configured",
                    ctx.config.places.api_key_env
                ))
            })?;
            let stop = install_stop_handler();
            let (db, targets, places_config) = (&ctx.db, &ctx.config.populate, &ctx.config.places);

            let report = with_progress(|progress| async move {
                pipeline::run_populate(db, &*places, targets, places_config, &stop, &progress)
                    .await
            })
            .await?;

            log::info!("Populate complete: {} universities added", report.added);
        }

        Command::ScrapePathways => {
            let generator = ctx.generator().cloned().ok_or_else(|| {
                AppError::config(format!("{} is not set", ctx.config.ai.api_key_env))
            })?;
            let stop = install_stop_handler();
            let (db, scraping) = (&ctx.db, &ctx.config.scraping);

            let report = with_progress(|progress| async move {
                pipeline::run_scrape(db, &*generator, scraping, &stop, &progress).await
            })
            .await;

            log::info!(
                "Scrape complete: {} of {} templates generated",
                report.generated,
                report.total
            );
        }

        Command::ConvertCgpa => {
            let db = &ctx.db;
            let report = with_progress(|progress| async move {
                pipeline::run_convert_cgpa(db, &progress).await
            })
            .await?;

            log::info!("CGPA conversion complete: {} converted", report.converted);
        }

        Command::Dedupe { dry_run } => {
            let db = &ctx.db;
            let report = with_progress(|progress| async move {
                pipeline::run_dedupe(db, dry_run, &progress).await
            })
            .await?;

            log::info!(
                "Dedupe complete: {} groups, {} records removed",
                report.groups,
                report.removed
            );
        }

        Command::Resolve {
            country,
            course,
            level,
            budget,
            nationality,
            free,
        } => {
            let profile = PathwayProfile {
                country,
                course,
                academic_level: level,
                budget_range: budget,
                nationality,
            };
            profile.validate()?;

            let resolved = ctx.resolver.resolve(&profile).await;
            log::info!("Resolved {} from {:?}", profile.key(), resolved.source);

            let plan = if free { Plan::Free } else { Plan::Pro };
            let template = view_for_plan(resolved.template, plan);
            println!("{}", serde_json::to_string_pretty(&template)?);
        }

        Command::SetPlan { user, plan } => {
            let usage = ctx.usage.set_plan(&user, plan).await?;
            log::info!(
                "{} is now on the {} plan ({} generations used this month)",
                user,
                usage.plan.as_str(),
                usage.pathway_generations
            );
        }

        // handled before storage is opened
        Command::Validate => {}

        Command::Info => {
            let counts = storage.counts().await?;
            let mut lines: Vec<(&str, String)> = vec![
                ("storage", cli.storage_dir.display().to_string()),
                ("config", config_path.display().to_string()),
                ("ai", ctx.generator().is_some().to_string()),
                ("places", ctx.places.is_some().to_string()),
            ];
            lines.extend(
                counts
                    .iter()
                    .map(|(collection, count)| (collection.name(), count.to_string())),
            );
            utils::log::summary("UniGuide Info", &lines);
        }
    }

    log::info!("Done!");

    Ok(())
}
