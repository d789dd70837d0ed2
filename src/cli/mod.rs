//! # CLI Module
//!
//! Command-line interface for the media organizer.
//!
//! Nothing on disk changes unless `--prod` is given; without it every command
//! runs the same checks and reports what it would do.
//!
//! ## Usage
//! ```bash
//! # Build the inventory table (first 100 files only)
//! media-organize inventory --dirs ~/Camera --test 100
//!
//! # Plan and apply the date/location layout
//! media-organize organize --inventory media_inventory.csv --root ~/Organized --prod
//!
//! # Consolidate an organized tree
//! media-organize merge --source ~/Organized --prefer Paris --prod
//!
//! # Replay a saved plan as copies
//! media-organize apply --plan planned_moves.csv --copy --prod
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use media_organizer::config::AppConfig;
use media_organizer::core::classifier::{ClassifierConfig, DuplicateClassifier, DuplicateGroup};
use media_organizer::core::inventory::{
    load_inventory, save_inventory, to_candidates, InventoryPipeline,
};
use media_organizer::core::merge::{MergeConfig, SubfolderMerger};
use media_organizer::core::organize::{
    ExecutionMode, ExecutionReport, ExecutorConfig, MoveExecutor, MovePlanner, OperationMode,
    PlannerConfig,
};
use media_organizer::core::report::{load_plan, save_duplicate_groups, save_plan};
use media_organizer::core::scanner::{Checkpoint, FileScanner, ScanConfig, WalkDirScanner};
use media_organizer::core::stats::{RunStats, RunSummary};
use media_organizer::error::{OrganizerError, Result};
use media_organizer::events::{
    ClassifyEvent, Event, EventChannel, EventReceiver, EventSender, ExecuteEvent, PipelineEvent,
    PipelinePhase, ScanEvent,
};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::thread;

/// Lists at most this many individual errors
const MAX_LISTED_ERRORS: usize = 20;

/// Media Organizer - find duplicates and sort media by date and place
#[derive(Parser, Debug)]
#[command(name = "media-organize")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: $MEDIA_ORGANIZER_CONFIG or the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan directories and write the inventory table
    Inventory(InventoryArgs),
    /// List groups of files with identical fingerprints
    Dupes(DupesArgs),
    /// Plan (and with --prod, apply) the date/location layout
    Organize(OrganizeArgs),
    /// Merge date folders of an organized tree
    Merge(MergeArgs),
    /// Replay a saved plan
    Apply(ApplyArgs),
}

#[derive(Args, Debug)]
struct InventoryArgs {
    /// Directories to scan (default: scan_dirs from the config)
    #[arg(long, num_args = 1..)]
    dirs: Vec<PathBuf>,

    /// Test mode: stop after this many files
    #[arg(long, value_name = "N")]
    test: Option<usize>,

    /// Inventory table to write
    #[arg(short, long, default_value = "media_inventory.csv")]
    output: PathBuf,

    /// Checkpoint file; an existing one resumes the run
    #[arg(long)]
    checkpoint: Option<PathBuf>,

    /// Include hidden files
    #[arg(long)]
    include_hidden: bool,
}

#[derive(Args, Debug)]
struct DupesArgs {
    /// Directories to scan (default: scan_dirs from the config)
    paths: Vec<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "pretty")]
    format: OutputFormat,

    /// Also write the groups to a CSV file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct OrganizeArgs {
    /// Inventory table to plan from
    #[arg(long, default_value = "media_inventory.csv")]
    inventory: PathBuf,

    /// Root of the organized tree
    #[arg(long)]
    root: Option<PathBuf>,

    /// Country left out of folder names
    #[arg(long)]
    home_country: Option<String>,

    /// Where to save the plan
    #[arg(long, default_value = "planned_moves.csv")]
    plan_out: PathBuf,

    /// Actually move files
    #[arg(long)]
    prod: bool,
}

#[derive(Args, Debug)]
struct MergeArgs {
    /// Organized tree to consolidate
    #[arg(long)]
    source: PathBuf,

    /// Largest gap in days between folders of one location
    #[arg(long)]
    window: Option<i64>,

    /// Preferred same-date targets, in priority order
    #[arg(long, num_args = 1..)]
    prefer: Vec<String>,

    /// Where to save the plan
    #[arg(short, long, default_value = "planned_merges.csv")]
    output: PathBuf,

    /// Actually move files and remove emptied folders
    #[arg(long)]
    prod: bool,
}

#[derive(Args, Debug)]
struct ApplyArgs {
    /// Plan table (Source, Destination, Status)
    #[arg(long)]
    plan: PathBuf,

    /// Copy instead of move
    #[arg(long)]
    copy: bool,

    /// Actually touch files
    #[arg(long)]
    prod: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// Redundant copies only, one path per line
    Minimal,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    media_organizer::init_tracing(cli.verbose);

    let config = AppConfig::discover(cli.config.as_deref())?;
    let term = Term::stderr();

    match cli.command {
        Commands::Inventory(args) => run_inventory(&term, &config, args),
        Commands::Dupes(args) => run_dupes(&term, &config, args),
        Commands::Organize(args) => run_organize(&term, &config, args, cli.verbose),
        Commands::Merge(args) => run_merge(&term, &config, args, cli.verbose),
        Commands::Apply(args) => run_apply(&term, &config, args, cli.verbose),
    }
}

fn scan_config(config: &AppConfig, include_hidden: bool, limit: Option<usize>) -> ScanConfig {
    ScanConfig {
        include_hidden: include_hidden || config.include_hidden,
        extensions: config.extensions.clone(),
        limit,
        ..Default::default()
    }
}

fn scan_dirs(given: Vec<PathBuf>, config: &AppConfig) -> Result<Vec<PathBuf>> {
    let dirs = if given.is_empty() {
        config.scan_dirs.clone()
    } else {
        given
    };
    if dirs.is_empty() {
        return Err(OrganizerError::Config(
            "no directories to scan: pass them or set scan_dirs".to_string(),
        ));
    }
    Ok(dirs)
}

fn execution_mode(prod: bool) -> ExecutionMode {
    if prod {
        ExecutionMode::Apply
    } else {
        ExecutionMode::Simulate
    }
}

fn header(term: &Term, title: &str, simulate: bool) {
    let mode = if simulate {
        style("simulation").yellow()
    } else {
        style("production").red().bold()
    };
    term.write_line(&format!("{} {}", style(title).bold().cyan(), mode))
        .ok();
    term.write_line("").ok();
}

fn run_inventory(term: &Term, config: &AppConfig, args: InventoryArgs) -> Result<()> {
    let dirs = scan_dirs(args.dirs, config)?;
    term.write_line(&format!("{}", style("Media Inventory").bold().cyan()))
        .ok();
    term.write_line("").ok();

    let mut builder = InventoryPipeline::builder()
        .paths(dirs)
        .scan_config(scan_config(config, args.include_hidden, args.test))
        .chunk_size(config.chunk_size)
        .workers(config.workers)
        .checkpoint_every(config.checkpoint_every)
        .artifact(args.output.display().to_string());

    if let Some(checkpoint) = &args.checkpoint {
        builder = builder.checkpoint(checkpoint);
        // Rows from the interrupted run are carried over
        if !Checkpoint::load(checkpoint)?.is_empty() && args.output.is_file() {
            builder = builder.existing(load_inventory(&args.output)?.records);
        }
    }

    let pipeline = builder.build();
    let result = with_progress(true, |events| pipeline.run_with_events(events))?;

    save_inventory(&args.output, &result.records)?;

    term.write_line(&format!("{} Inventory complete", style("✓").green().bold()))
        .ok();
    line(term, "files in table", result.records.len());
    line(term, "already processed", result.already_processed);
    line(term, "fingerprint groups", result.groups.len());
    if result.checkpoints_written > 0 {
        line(term, "checkpoints written", result.checkpoints_written);
    }
    list_errors(term, "Scan errors", &result.errors);
    term.write_line(&format!(
        "  saved to {}",
        style(args.output.display()).underlined()
    ))
    .ok();
    Ok(())
}

fn run_dupes(term: &Term, config: &AppConfig, args: DupesArgs) -> Result<()> {
    let dirs = scan_dirs(args.paths, config)?;
    let pretty = matches!(args.format, OutputFormat::Pretty);

    let scanner = WalkDirScanner::new(scan_config(config, false, None));
    let classifier = DuplicateClassifier::new(ClassifierConfig {
        chunk_size: config.chunk_size,
        workers: config.workers,
    });
    let (scan_errors, classification) = with_progress(pretty, |events| {
        let scan = scanner.scan_with_events(&dirs, events)?;
        Ok((scan.errors, classifier.classify_with_events(scan.files, events)))
    })?;

    if let Some(output) = &args.output {
        save_duplicate_groups(output, &classification.groups)?;
    }

    match args.format {
        OutputFormat::Pretty => {
            print_groups(term, &classification.groups);
            list_errors(term, "Scan errors", &scan_errors);
            list_errors(term, "Unreadable files", &classification.errors);
        }
        OutputFormat::Json => print_groups_json(&classification.groups)?,
        OutputFormat::Minimal => {
            for group in &classification.groups {
                for path in group.files.iter().skip(1) {
                    println!("{}", path.display());
                }
            }
        }
    }
    Ok(())
}

fn run_organize(term: &Term, config: &AppConfig, args: OrganizeArgs, verbose: bool) -> Result<()> {
    let root = args.root.or_else(|| config.root.clone()).ok_or_else(|| {
        OrganizerError::Config("no destination root: pass --root or set root".to_string())
    })?;
    let mode = execution_mode(args.prod);
    header(term, "Organize", mode == ExecutionMode::Simulate);

    let table = load_inventory(&args.inventory)?;
    let candidates = to_candidates(&table.records);

    let mut planner_config = PlannerConfig::new(root);
    planner_config.home_country = args.home_country.or_else(|| config.home_country.clone());
    let planner = MovePlanner::new(planner_config);
    let executor = MoveExecutor::new(ExecutorConfig {
        mode,
        operation: OperationMode::Move,
        workers: config.workers,
    });

    let (mut plan, report) = with_progress(true, |events| {
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Planning,
        }));
        let plan = planner.plan_with_events(&candidates, events);
        save_plan(&args.plan_out, &plan.moves)?;

        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Applying,
        }));
        let report = executor.execute_with_events(&plan.moves, events);
        Ok((plan, report))
    })?;

    // Rows rejected while reading the table come first
    let mut errors = table.errors;
    errors.append(&mut plan.errors);
    plan.errors = errors;

    let summary = RunSummary {
        records: candidates.len(),
        statuses: plan.status_counts,
        planned: plan.moves.len(),
        planning: plan.stats(),
        execution: report.stats,
        directories_removed: 0,
        simulated: report.simulated,
    };

    print_summary(term, &summary, &report);
    line(term, "duplicates excluded", plan.excluded_duplicates);
    line(term, "renamed with _dup", plan.renamed_count());
    list_errors(term, "Planning errors", &plan.errors);
    list_errors(term, "Move errors", &report.errors);
    if verbose {
        for skipped in &plan.skipped {
            term.write_line(&format!(
                "    {} {} ({})",
                style("=").dim(),
                skipped.path.display(),
                skipped.reason
            ))
            .ok();
        }
    }
    footer(term, &args.plan_out, &plan.id, report.simulated);
    Ok(())
}

fn run_merge(term: &Term, config: &AppConfig, args: MergeArgs, verbose: bool) -> Result<()> {
    let mode = execution_mode(args.prod);
    header(term, "Merge", mode == ExecutionMode::Simulate);

    let preferred = if args.prefer.is_empty() {
        config.preferred_locations.clone()
    } else {
        args.prefer
    };
    let merger = SubfolderMerger::new(MergeConfig {
        preferred_locations: preferred,
        window_days: args.window.unwrap_or(config.window_days),
    });
    let executor = MoveExecutor::new(ExecutorConfig {
        mode,
        operation: OperationMode::Move,
        workers: config.workers,
    });

    let (plan, report, cleanup) = with_progress(true, |events| {
        let plan = merger.plan_with_events(&args.source, events)?;
        save_plan(&args.output, &plan.moves)?;
        let report = executor.execute_with_events(&plan.moves, events);
        let cleanup = executor.remove_emptied_directories(&plan.dirs_to_remove, &report, events);
        Ok((plan, report, cleanup))
    })?;

    if verbose {
        for decision in &plan.decisions {
            term.write_line(&format!(
                "    {} {} -> {} ({:?})",
                style("→").cyan(),
                decision.source.display(),
                decision.target.display(),
                decision.reason
            ))
            .ok();
        }
    }

    let summary = RunSummary {
        records: plan.moves.len() + plan.skipped.len(),
        planned: plan.moves.len(),
        planning: RunStats {
            successful: plan.moves.len(),
            failed: plan.errors.len(),
            skipped: plan.skipped.len(),
        },
        execution: report.stats,
        directories_removed: cleanup.removed.len(),
        simulated: report.simulated,
        ..Default::default()
    };

    line(term, "date folders found", plan.clusters);
    line(term, "folders merged", plan.decisions.len());
    print_summary(term, &summary, &report);
    list_errors(term, "Unreadable entries", &plan.errors);
    list_errors(term, "Move errors", &report.errors);
    list_errors(term, "Folders kept", &cleanup.kept);
    footer(term, &args.output, &plan.id, report.simulated);
    Ok(())
}

fn run_apply(term: &Term, config: &AppConfig, args: ApplyArgs, verbose: bool) -> Result<()> {
    let mode = execution_mode(args.prod);
    header(term, "Apply plan", mode == ExecutionMode::Simulate);

    let moves = load_plan(&args.plan)?;
    let executor = MoveExecutor::new(ExecutorConfig {
        mode,
        operation: if args.copy {
            OperationMode::Copy
        } else {
            OperationMode::Move
        },
        workers: config.workers,
    });

    let report = with_progress(true, |events| Ok(executor.execute_with_events(&moves, events)))?;

    let summary = RunSummary {
        records: moves.len(),
        planned: moves.len(),
        execution: report.stats,
        simulated: report.simulated,
        ..Default::default()
    };
    print_summary(term, &summary, &report);
    list_errors(term, "Move errors", &report.errors);
    if verbose {
        line(term, "duration (ms)", report.duration_ms);
    }
    if report.simulated {
        term.write_line(&format!(
            "{}",
            style("Simulation only. Run again with --prod to apply.").dim()
        ))
        .ok();
    }
    Ok(())
}

/// Run `work` while a background thread renders its events
fn with_progress<T>(visible: bool, work: impl FnOnce(&EventSender) -> Result<T>) -> Result<T> {
    let (sender, receiver) = EventChannel::new();
    let progress = spawn_progress(receiver, visible);
    let result = work(&sender);
    // Closing the channel ends the render loop
    drop(sender);
    progress.join().ok();
    result
}

/// Render engine events on a progress bar until the channel closes
fn spawn_progress(receiver: EventReceiver, visible: bool) -> thread::JoinHandle<()> {
    let pb = if visible {
        ProgressBar::new(0)
    } else {
        ProgressBar::hidden()
    };
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░"),
    );

    thread::spawn(move || {
        for event in receiver.iter() {
            match event {
                Event::Pipeline(PipelineEvent::PhaseChanged { phase }) => {
                    pb.set_position(0);
                    pb.set_message(phase.to_string());
                }
                Event::Scan(ScanEvent::Progress(p)) => {
                    pb.set_message(format!("scanning: {} files", p.files_found));
                    pb.tick();
                }
                Event::Scan(ScanEvent::LimitReached { limit }) => {
                    pb.println(format!("  test mode: stopped after {} files", limit));
                }
                Event::Classify(ClassifyEvent::Fingerprinted { completed, total, .. }) => {
                    pb.set_length(total as u64);
                    pb.set_position(completed as u64);
                }
                Event::Pipeline(PipelineEvent::Checkpoint { count, .. }) => {
                    pb.set_message(format!("checkpoint at {} files", count));
                }
                Event::Execute(ExecuteEvent::Started { total_moves, .. }) => {
                    pb.set_length(total_moves as u64);
                    pb.set_position(0);
                }
                Event::Execute(ExecuteEvent::Progress(p)) => {
                    pb.set_position(p.completed as u64);
                    pb.set_message(
                        p.current_path
                            .file_name()
                            .unwrap_or_default()
                            .to_string_lossy()
                            .into_owned(),
                    );
                }
                Event::Execute(ExecuteEvent::Failed { message, .. }) => {
                    pb.println(format!("  {} {}", style("✗").red(), message));
                }
                _ => {}
            }
        }
        pb.finish_and_clear();
    })
}

fn line(term: &Term, label: &str, value: impl Display) {
    term.write_line(&format!("  {} {}", style(value).cyan(), label))
        .ok();
}

fn print_summary(term: &Term, summary: &RunSummary, report: &ExecutionReport) {
    let mark = if summary.is_clean() {
        style("✓").green().bold()
    } else {
        style("!").yellow().bold()
    };
    term.write_line("").ok();
    term.write_line(&format!("{} Run complete", mark)).ok();

    if summary.statuses.total() > 0 {
        term.write_line(&format!(
            "  {} records: {} ok, {} duplicate, {} error",
            style(summary.records).cyan(),
            summary.statuses.ok,
            style(summary.statuses.duplicate).yellow(),
            style(summary.statuses.error).yellow()
        ))
        .ok();
    }
    line(term, "moves planned", summary.planned);
    if summary.planning.total() > 0 {
        line(term, "already in place", summary.planning.skipped);
        line(term, "planning errors", summary.planning.failed);
    }

    let verb = if summary.simulated {
        "would succeed"
    } else {
        "succeeded"
    };
    line(term, verb, summary.execution.successful);
    line(term, "failed", summary.execution.failed);
    line(term, "skipped", summary.execution.skipped);
    if report.folders_created > 0 {
        line(term, "folders created", report.folders_created);
    }
    if report.anomalies > 0 {
        term.write_line(&format!(
            "  {} destinations were occupied at apply time",
            style(report.anomalies).red().bold()
        ))
        .ok();
    }
    if summary.directories_removed > 0 {
        line(term, "folders removed", summary.directories_removed);
    }
    term.write_line("").ok();
}

fn list_errors<E: Display>(term: &Term, title: &str, errors: &[E]) {
    if errors.is_empty() {
        return;
    }
    term.write_line(&format!("{} ({})", style(title).bold(), errors.len()))
        .ok();
    for error in errors.iter().take(MAX_LISTED_ERRORS) {
        term.write_line(&format!("  {} {}", style("✗").red(), error))
            .ok();
    }
    if errors.len() > MAX_LISTED_ERRORS {
        term.write_line(&format!(
            "  {}",
            style(format!("... and {} more", errors.len() - MAX_LISTED_ERRORS)).dim()
        ))
        .ok();
    }
    term.write_line("").ok();
}

fn footer(term: &Term, plan_path: &Path, plan_id: &str, simulated: bool) {
    term.write_line(&format!(
        "  plan {} saved to {}",
        style(plan_id).dim(),
        style(plan_path.display()).underlined()
    ))
    .ok();
    if simulated {
        term.write_line(&format!(
            "{}",
            style("Simulation only. Nothing was moved; run again with --prod to apply.").dim()
        ))
        .ok();
    }
}

fn print_groups(term: &Term, groups: &[DuplicateGroup]) {
    term.write_line("").ok();
    if groups.is_empty() {
        term.write_line(&format!("  {} No duplicates found", style("✓").green()))
            .ok();
        return;
    }

    let savings: u64 = groups.iter().map(DuplicateGroup::redundant_bytes).sum();
    term.write_line(&format!(
        "  {} groups, {} potential space savings",
        style(groups.len()).cyan(),
        style(format_bytes(savings)).yellow()
    ))
    .ok();
    term.write_line("").ok();

    let home = dirs::home_dir().unwrap_or_default();
    for (i, group) in groups.iter().enumerate() {
        term.write_line(&format!(
            "  {} {} files of {}",
            style(format!("Group {}:", i + 1)).bold(),
            group.files.len(),
            format_bytes(group.size)
        ))
        .ok();
        for (idx, path) in group.files.iter().enumerate() {
            let marker = if idx == 0 {
                style("★").green().to_string()
            } else {
                style("○").dim().to_string()
            };
            let display_path = match path.strip_prefix(&home) {
                Ok(rest) if !home.as_os_str().is_empty() => format!("~/{}", rest.display()),
                _ => path.display().to_string(),
            };
            term.write_line(&format!("    {} {}", marker, display_path))
                .ok();
        }
        term.write_line("").ok();
    }

    term.write_line(&format!(
        "{}",
        style("Fingerprints cover the first and last blocks only. Nothing was deleted.").dim()
    ))
    .ok();
}

fn print_groups_json(groups: &[DuplicateGroup]) -> Result<()> {
    let output = serde_json::json!({
        "duplicate_groups": groups.len(),
        "potential_savings_bytes": groups.iter().map(DuplicateGroup::redundant_bytes).sum::<u64>(),
        "groups": groups,
    });
    let text = serde_json::to_string_pretty(&output)
        .map_err(|e| OrganizerError::Config(format!("cannot render JSON: {}", e)))?;
    println!("{}", text);
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
