//! doorcam CLI: classify garage-door snapshots as open or closed.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};
use doorcam::core::{DecisionSource, PipelineParams, Smoothing};
use doorcam::deck::{
    analyze_batch, analyze_record, annotate, list_snapshots, records_from_paths, save_rgb,
    select_by_age, Age, Analyzed, BatchReport, CollectionFilter, DoorcamConfig, FilteredSet,
    ImageRecord, RecordOutcome, RecordedState, TemplateCache,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "doorcam")]
#[command(about = "Tell an open garage door from a closed one in fixed-webcam snapshots")]
#[command(version)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[cfg(feature = "tracing")]
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify one snapshot and print the verdict as JSON.
    Classify(ClassifyArgs),

    /// Classify every snapshot in a folder and score against the file names.
    Batch(BatchArgs),

    /// Classify the youngest (or oldest) snapshot in a folder.
    Latest(LatestArgs),

    /// Validate a config file and print it with overrides applied.
    Config(ConfigArgs),
}

#[derive(Debug, Clone, Args)]
struct PipelineOverrides {
    /// Gaussian kernel size before CLAHE (odd), or `none`.
    #[arg(long)]
    blur_size: Option<Smoothing>,

    /// CLAHE clip limit (> 0).
    #[arg(long)]
    clip_limit: Option<f32>,

    /// CLAHE tiles per side (>= 2).
    #[arg(long)]
    grid_size: Option<u32>,

    /// Median below this means open.
    #[arg(long)]
    threshold: Option<f64>,

    /// Decide on the luminance re-derived from the normalized RGB frame.
    #[arg(long)]
    rederive: bool,
}

impl PipelineOverrides {
    fn apply(&self, params: &mut PipelineParams) -> CliResult<()> {
        if let Some(s) = self.blur_size {
            params.normalize.smoothing = s;
        }
        if let Some(c) = self.clip_limit {
            params.normalize.clip_limit = c;
        }
        if let Some(g) = self.grid_size {
            params.normalize.grid_size = g;
        }
        if let Some(t) = self.threshold {
            params.decision.threshold = t;
        }
        if self.rederive {
            params.decision_source = DecisionSource::RederivedLuminance;
        }
        params.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Args)]
struct ConfigArgs {
    /// Installation config (JSON).
    #[arg(long)]
    config: PathBuf,

    #[command(flatten)]
    overrides: PipelineOverrides,
}

impl ConfigArgs {
    fn load(&self) -> CliResult<DoorcamConfig> {
        let mut cfg = DoorcamConfig::load_json(&self.config)?;
        self.overrides.apply(&mut cfg.pipeline)?;
        log::info!("config {} loaded", self.config.display());
        Ok(cfg)
    }
}

#[derive(Debug, Clone, Args)]
struct ClassifyArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Snapshot to classify.
    #[arg(long)]
    image: PathBuf,

    /// Write a before/after markup image here.
    #[arg(long)]
    markup: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct BatchArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Folder holding the snapshots.
    #[arg(long)]
    folder: PathBuf,

    /// First day to include (YYYY-MM-DD).
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last day to include (YYYY-MM-DD).
    #[arg(long)]
    stop: Option<NaiveDate>,

    /// Only snapshots taken before noon.
    #[arg(long)]
    morning: bool,

    /// Only snapshots recorded in this state (`open` or `close`).
    #[arg(long)]
    state: Option<RecordedState>,

    /// Write the full report (JSON).
    #[arg(long)]
    out: Option<PathBuf>,

    /// Spread the records over all cores.
    #[cfg(feature = "rayon")]
    #[arg(long)]
    parallel: bool,
}

#[derive(Debug, Clone, Args)]
struct LatestArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Folder holding the snapshots.
    #[arg(long)]
    folder: PathBuf,

    /// `youngest` or `oldest`.
    #[arg(long, default_value = "youngest")]
    age: Age,

    /// Only consider this day (YYYY-MM-DD).
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Write a before/after markup image here.
    #[arg(long)]
    markup: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let result = match &cli.command {
        Commands::Classify(args) => run_classify(args),
        Commands::Batch(args) => run_batch(args),
        Commands::Latest(args) => run_latest(args),
        Commands::Config(args) => run_config(args),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(not(feature = "tracing"))]
fn init_logging(cli: &Cli) {
    let _ = doorcam::core::init_with_level(doorcam::core::level_from_verbosity(cli.verbose));
}

#[cfg(feature = "tracing")]
fn init_logging(cli: &Cli) {
    let _ = tracing_log::LogTracer::init();
    if std::env::var_os("RUST_LOG").is_none() && cli.verbose > 0 {
        let level = doorcam::core::level_from_verbosity(cli.verbose);
        std::env::set_var("RUST_LOG", level.as_str().to_ascii_lowercase());
    }
    doorcam::core::init_tracing(cli.log_json);
}

// ── classify / latest ──────────────────────────────────────────────────

fn classify_one(cfg: &DoorcamConfig, image: &Path, markup: Option<&Path>) -> CliResult<()> {
    let template = cfg.template(&mut TemplateCache::new())?;
    let mut record = ImageRecord::new(image, template, cfg.shared_pipeline());

    let outcome = match analyze_record(&mut record) {
        Analyzed::Outcome(outcome, _) => outcome,
        Analyzed::Failure(f) => {
            return Err(format!(
                "{}: {} failed ({}): {}",
                f.path.display(),
                f.stage,
                f.kind,
                f.message
            )
            .into())
        }
    };
    if let Some(out) = markup {
        let img = annotate(&mut record)?;
        save_rgb(&img, out)?;
        log::info!("markup written to {}", out.display());
    }
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    if outcome.agrees == Some(false) {
        println!("{}", oops_line(&outcome));
    }
    Ok(())
}

fn run_classify(args: &ClassifyArgs) -> CliResult<()> {
    let cfg = args.config.load()?;
    classify_one(&cfg, &args.image, args.markup.as_deref())
}

fn run_latest(args: &LatestArgs) -> CliResult<()> {
    let cfg = args.config.load()?;
    let paths = list_snapshots(&args.folder)?;
    let picked = select_by_age(&paths, args.date, args.age).ok_or_else(|| {
        format!(
            "no snapshots in {}{}",
            args.folder.display(),
            args.date.map(|d| format!(" on {d}")).unwrap_or_default()
        )
    })?;
    log::info!("picked {}", picked.display());
    classify_one(&cfg, picked, args.markup.as_deref())
}

// ── batch ──────────────────────────────────────────────────────────────

fn run_batch(args: &BatchArgs) -> CliResult<()> {
    let cfg = args.config.load()?;
    let template = cfg.template(&mut TemplateCache::new())?;

    let filter = CollectionFilter::new(
        args.start.unwrap_or(NaiveDate::MIN),
        args.stop.unwrap_or(NaiveDate::MAX),
    )
    .morning_only(args.morning)
    .with_state(args.state);
    let set = FilteredSet::new(filter, list_snapshots(&args.folder)?);
    let records = records_from_paths(set.sorted(), &template, &cfg.shared_pipeline());
    log::info!("{} snapshots selected", records.len());

    let report = run_records(args, records);
    print_report(&report);
    if let Some(out) = &args.out {
        report.write_json(out)?;
        log::info!("report written to {}", out.display());
    }
    Ok(())
}

#[cfg(feature = "rayon")]
fn run_records(args: &BatchArgs, records: Vec<ImageRecord>) -> BatchReport {
    if args.parallel {
        doorcam::deck::analyze_batch_parallel(records)
    } else {
        analyze_batch(records)
    }
}

#[cfg(not(feature = "rayon"))]
fn run_records(_args: &BatchArgs, records: Vec<ImageRecord>) -> BatchReport {
    analyze_batch(records)
}

fn oops_line(o: &RecordOutcome) -> String {
    format!(
        "OOPS {}: recorded {}, detected {} (median {:.1})",
        o.path.display(),
        o.recorded,
        o.decision.state,
        o.decision.statistic
    )
}

fn print_report(report: &BatchReport) {
    for o in report.mismatches() {
        println!("{}", oops_line(o));
    }
    for f in &report.failures {
        println!(
            "FAILED {}: {} ({}): {}",
            f.path.display(),
            f.stage,
            f.kind,
            f.message
        );
    }
    let a = report.agreement();
    println!(
        "{} decided, {} failed",
        report.outcomes.len(),
        report.failures.len()
    );
    match a.rate() {
        Some(rate) => println!(
            "{}/{} agree with the recorded state ({:.1}%)",
            a.agreed,
            a.compared,
            rate * 100.0
        ),
        None => println!("nothing to compare"),
    }
}

// ── config ─────────────────────────────────────────────────────────────

fn run_config(args: &ConfigArgs) -> CliResult<()> {
    let cfg = args.load()?;
    println!("{}", serde_json::to_string_pretty(&cfg)?);
    Ok(())
}
