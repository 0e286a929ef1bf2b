//! Command handlers for analyze, compare, and labels

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use crate::engine::arg_parser::{AnalyzeArgs, Cli, Commands, CommonArgs, CompareArgs, LabelsArgs};
use crate::engine::db_ops;
use crate::engine::tools::{canonicalize_root, root_to_db_string};
use crate::export::write_summary_json;
use crate::labels;
use crate::pipeline::{analyze_dir_with_conn, parse_extensions};
use crate::types::{Opts, RunStats};
use crate::utils::config::{ProgressConsts, resolve_cascade_dir};
use crate::utils::photolyzer_toml::{apply_file_to_config, load_photolyzer_toml};
use crate::utils::{Colors, setup_logging};
use crate::vision::{Capability, VisionModels};

/// Everything an analyze run needs, merged from defaults, `.photolyzer.toml`, and CLI flags.
#[derive(Clone, Debug, Default)]
pub struct RunConfig {
    pub opts: Opts,
    pub cascade_dir: Option<PathBuf>,
    pub summary_json: Option<PathBuf>,
}

/// Apply CLI flags over the config (only flags that were given).
fn apply_cli_to_config(args: &AnalyzeArgs, config: &mut RunConfig) {
    if let Some(ref db) = args.db {
        config.opts.db_path = db.clone();
    }
    if let Some(ref exts) = args.extensions {
        config.opts.extensions = parse_extensions(exts);
    }
    if let Some(force) = args.force {
        config.opts.force = force;
    }
    if let Some(keep) = args.keep_on_walk_error {
        config.opts.keep_on_walk_error = keep;
    }
    apply_common(&args.common, config);
    if let Some(ref p) = args.summary_json {
        config.summary_json = Some(p.clone());
    }
}

fn apply_common(common: &CommonArgs, config: &mut RunConfig) {
    if let Some(verbose) = common.verbose {
        config.opts.verbose = verbose;
    }
    if let Some(ref d) = common.cascade_dir {
        config.cascade_dir = Some(d.clone());
    }
}

/// Defaults, then the config file in the working directory, then `apply`. Logging is set up
/// from the merged verbosity; a bad config file is reported and ignored.
fn build_config(apply: impl FnOnce(&mut RunConfig)) -> RunConfig {
    let mut config = RunConfig::default();
    let file = load_photolyzer_toml(Path::new("."));
    if let Ok(Some(ref f)) = file {
        apply_file_to_config(f, &mut config);
    }
    apply(&mut config);
    setup_logging(config.opts.verbose);
    if let Err(e) = file {
        warn!("Ignoring config file: {e:#}");
    }
    debug!("{} CONFIG:{:#?}", env!("CARGO_PKG_NAME").to_uppercase(), config);
    config
}

fn vision_models(cascade_dir: Option<PathBuf>) -> VisionModels {
    let dir = resolve_cascade_dir(cascade_dir);
    match &dir {
        Some(d) => debug!("Cascade directory: {}", d.display()),
        None => debug!("No cascade directory found"),
    }
    VisionModels::from_cascade_dir(dir)
}

/// Dispatch a parsed command line. Ok(false) means the command ran but some files failed.
pub fn handle_run(cli: &Cli) -> Result<bool> {
    match &cli.command {
        Commands::Analyze(args) => handle_analyze(args),
        Commands::Compare(args) => handle_compare(args),
        Commands::Labels(args) => handle_labels(args),
    }
}

pub fn handle_analyze(args: &AnalyzeArgs) -> Result<bool> {
    let config = build_config(|c| apply_cli_to_config(args, c));
    let models = vision_models(config.cascade_dir.clone());

    let root = canonicalize_root(&args.dir)?;
    let mut conn = db_ops::open_db(&config.opts.db_path)
        .with_context(|| format!("open store {}", config.opts.db_path.display()))?;
    info!("Analyzing photos in {}", root.display());
    let stats = analyze_dir_with_conn(&mut conn, &root, &config.opts, &models)?;
    print_run_summary(&stats);

    if let Some(ref out) = config.summary_json {
        let n = write_summary_json(&conn, &root_to_db_string(&root), out)?;
        info!("Wrote {} records to {}", n, out.display());
    }
    Ok(stats.is_success())
}

fn print_run_summary(stats: &RunStats) {
    let rule = "=".repeat(ProgressConsts::SUMMARY_RULE_WIDTH);
    let errors = format!("{}", stats.errors);
    let errors = if stats.errors > 0 {
        Colors::colorize(Colors::BAD, &errors)
    } else {
        Colors::colorize(Colors::GOOD, &errors)
    };
    println!("{rule}");
    println!("{}", Colors::colorize(Colors::HEADER, "ANALYSIS SUMMARY"));
    println!("{rule}");
    println!("  Total images:     {}", stats.total);
    println!("  Newly analyzed:   {}", stats.analyzed);
    println!("  From cache:       {}", stats.cached);
    println!("  Errors:           {errors}");
    println!("  Deleted records:  {}", stats.deleted);
    println!("{rule}");
}

pub fn handle_compare(args: &CompareArgs) -> Result<bool> {
    let config = build_config(|c| apply_common(&args.common, c));
    let labels = labels::load_labels(&args.labels)?;
    info!("Loaded {} human labels from {}", labels.len(), args.labels.display());

    let dir = canonicalize_root(&args.dir)?;
    let models = vision_models(config.cascade_dir);
    for capability in [Capability::HumanFace, Capability::CatFace] {
        if !models.is_available(capability) {
            warn!("{capability} detection unavailable; every photo will count as \"not detected\"");
        }
    }

    let auto = labels::run_live_analysis(&dir, &models)?;
    info!("Analyzed {} photos", auto.len());

    let cmp = labels::compare(&labels, &auto);
    for name in &cmp.missing {
        warn!("{name} not found in automated results");
    }
    labels::print_comparison(&cmp, &labels);
    Ok(true)
}

pub fn handle_labels(args: &LabelsArgs) -> Result<bool> {
    setup_logging(false);
    let labels = labels::load_labels(&args.labels)?;
    let stats = labels::label_stats(&labels);
    labels::print_label_stats(&stats);
    Ok(true)
}
