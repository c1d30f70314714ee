//! Pace CLI - Command-line interface for Synheart Pace
//!
//! Commands:
//! - scores: Compute daily decayed load and risk for a date range
//! - classify: Classify a single load value
//! - thresholds: Show presets and resolved threshold profiles
//! - configure: Change the stored load configuration
//! - calibrate: Drive personal baseline calibration
//! - validate: Validate observation records
//! - doctor: Diagnose configuration and state health
//! - schema: Print schema information

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use synheart_pace::baseline::RecordOutcome;
use synheart_pace::config::ParameterUpdate;
use synheart_pace::schema::{ObservationRecord, RecordAdapter, SCHEMA_VERSION};
use synheart_pace::sources::{ConfigurationStore, InMemoryObservations, JsonFileStore};
use synheart_pace::thresholds::half_life_days;
use synheart_pace::{
    BaselineSample, CalibrationError, CapacityLevel, ConditionPreset, ConfigError,
    DailyLoadScore, DateRange, EngineError, LoadEngine, PaceConfig, RecoveryWindow,
    SensitivityProfile, SignalKind, ThresholdProfile, ThresholdResolver, PACE_VERSION,
    PRODUCER_NAME,
};

/// Environment variable holding the log filter directive
const LOG_ENV: &str = "PACE_LOG";

/// Pace - On-device load-capacity engine for symptom and activity pacing
#[derive(Parser)]
#[command(name = "pace")]
#[command(author = "Synheart AI Inc")]
#[command(version = PACE_VERSION)]
#[command(about = "Turn symptom and activity logs into daily load and risk", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute daily load scores for a date range
    Scores {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "auto")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// First day to report (defaults to the earliest observation)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last day to report (defaults to the latest observation)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Days of history folded in before the first reported day
        #[arg(long)]
        lookback: Option<u32>,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Classify a decayed load value
    Classify {
        /// Decayed load to classify
        load: f64,

        #[command(flatten)]
        engine: EngineArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show condition presets and resolved thresholds
    Thresholds {
        /// Also list every capacity/sensitivity/recovery combination
        #[arg(long)]
        all: bool,

        #[command(flatten)]
        engine: EngineArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change the stored load configuration
    Configure {
        /// State directory to update
        #[arg(long)]
        state: PathBuf,

        /// Select a condition preset
        #[arg(long)]
        preset: Option<PresetArg>,

        /// Set capacity (switches to a custom configuration when it leaves the preset)
        #[arg(long)]
        capacity: Option<LevelArg>,

        /// Set symptom sensitivity
        #[arg(long)]
        sensitivity: Option<LevelArg>,

        /// Set recovery window
        #[arg(long)]
        recovery: Option<RecoveryArg>,

        /// Explicit boundaries as SAFE,CAUTION,HIGH
        #[arg(long, value_delimiter = ',')]
        thresholds: Option<Vec<f64>>,
    },

    /// Personal baseline calibration
    Calibrate {
        /// State directory holding configuration and baselines
        #[arg(long)]
        state: PathBuf,

        /// Configuration file (TOML) for engine settings
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(subcommand)]
        action: CalibrateAction,
    },

    /// Validate observation records
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "auto")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and state health
    Doctor {
        /// Check configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Check state directory
        #[arg(long)]
        state: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

#[derive(clap::Args)]
struct EngineArgs {
    /// Configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// State directory with stored configuration and baselines
    #[arg(long)]
    state: Option<PathBuf>,
}

#[derive(Subcommand)]
enum CalibrateAction {
    /// Begin collecting samples
    Start {
        #[arg(long)]
        kind: SignalKind,
    },

    /// Record one sample into an active session
    Record {
        #[arg(long)]
        kind: SignalKind,

        #[arg(long)]
        value: f64,

        /// Day the sample belongs to; a later sample for the same day replaces it
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Record the decayed load of a good day into the load baseline
    GoodDay {
        #[arg(long)]
        date: NaiveDate,

        /// Observation records (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Calibrate a physiological baseline from sample records
    History {
        #[arg(long)]
        kind: SignalKind,

        /// Sample records (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Last day of history to use
        #[arg(long)]
        as_of: NaiveDate,
    },

    /// Abandon an active session
    Cancel {
        #[arg(long)]
        kind: SignalKind,
    },

    /// Discard a baseline
    Reset {
        #[arg(long)]
        kind: SignalKind,
    },

    /// Show calibration state
    Status {
        /// Only this kind
        #[arg(long)]
        kind: Option<SignalKind>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print mean + deviations x spread for a calibrated baseline
    Threshold {
        #[arg(long)]
        kind: SignalKind,

        #[arg(long, default_value = "1.0")]
        deviations: f64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum InputFormat {
    /// Detect from the first character
    Auto,
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one daily score per line)
    Ndjson,
    /// JSON array of daily scores
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemaType {
    /// Input schema (pace.observation.v1)
    Input,
    /// Output schema (daily load score)
    Output,
}

#[derive(Clone, Copy, ValueEnum)]
enum PresetArg {
    Balanced,
    MeCfs,
    LongCovid,
    Fibromyalgia,
    Pots,
}

impl From<PresetArg> for ConditionPreset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Balanced => ConditionPreset::Balanced,
            PresetArg::MeCfs => ConditionPreset::MeCfs,
            PresetArg::LongCovid => ConditionPreset::LongCovid,
            PresetArg::Fibromyalgia => ConditionPreset::Fibromyalgia,
            PresetArg::Pots => ConditionPreset::Pots,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum LevelArg {
    Low,
    Medium,
    High,
}

impl From<LevelArg> for CapacityLevel {
    fn from(arg: LevelArg) -> Self {
        match arg {
            LevelArg::Low => CapacityLevel::Low,
            LevelArg::Medium => CapacityLevel::Medium,
            LevelArg::High => CapacityLevel::High,
        }
    }
}

impl From<LevelArg> for SensitivityProfile {
    fn from(arg: LevelArg) -> Self {
        match arg {
            LevelArg::Low => SensitivityProfile::Low,
            LevelArg::Medium => SensitivityProfile::Medium,
            LevelArg::High => SensitivityProfile::High,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum RecoveryArg {
    Fast,
    Medium,
    Slow,
}

impl From<RecoveryArg> for RecoveryWindow {
    fn from(arg: RecoveryArg) -> Self {
        match arg {
            RecoveryArg::Fast => RecoveryWindow::Fast,
            RecoveryArg::Medium => RecoveryWindow::Medium,
            RecoveryArg::Slow => RecoveryWindow::Slow,
        }
    }
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr so stdout stays machine-readable
fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), PaceCliError> {
    match cli.command {
        Commands::Scores {
            input,
            output,
            input_format,
            output_format,
            start,
            end,
            lookback,
            engine,
        } => cmd_scores(
            &input,
            &output,
            input_format,
            output_format,
            start,
            end,
            lookback,
            &engine,
        ),

        Commands::Classify { load, engine, json } => cmd_classify(load, &engine, json),

        Commands::Thresholds { all, engine, json } => cmd_thresholds(all, &engine, json),

        Commands::Configure {
            state,
            preset,
            capacity,
            sensitivity,
            recovery,
            thresholds,
        } => cmd_configure(&state, preset, capacity, sensitivity, recovery, thresholds),

        Commands::Calibrate {
            state,
            config,
            action,
        } => cmd_calibrate(&state, config.as_deref(), action),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Doctor {
            config,
            state,
            json,
        } => cmd_doctor(config.as_deref(), state.as_deref(), json),

        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_scores(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    lookback: Option<u32>,
    engine_args: &EngineArgs,
) -> Result<(), PaceCliError> {
    let records = read_records(input, input_format)?;
    if records.is_empty() {
        return Err(PaceCliError::NoObservations);
    }

    let source = InMemoryObservations::new(RecordAdapter::to_batch(&records)?);
    let span = source.date_span().ok_or(PaceCliError::NoObservations)?;
    let range = DateRange::new(start.unwrap_or(span.start), end.unwrap_or(span.end))?;

    let (engine, _) = open_engine(engine_args.config.as_deref(), engine_args.state.as_deref())?;
    let scores = engine.compute_daily_load_scores(&source, range, lookback)?;

    let output_data = format_output(&scores, output_format)?;
    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_classify(load: f64, engine_args: &EngineArgs, json: bool) -> Result<(), PaceCliError> {
    let (engine, _) = open_engine(engine_args.config.as_deref(), engine_args.state.as_deref())?;
    let classifier = engine.classifier();
    let level = classifier.classify(load);

    let report = ClassifyReport {
        load,
        risk_level: level.as_str(),
        label: level.label(),
        guidance: level.guidance(),
        baseline_shift: classifier.baseline_shift(),
        boundaries: classifier.effective_boundaries(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Load:     {:.2}", report.load);
        println!("Risk:     {} ({})", report.risk_level, report.label);
        println!("Guidance: {}", report.guidance);
        if report.baseline_shift > 0.0 {
            println!("Personal baseline shift: +{:.2}", report.baseline_shift);
        }
    }

    Ok(())
}

fn cmd_thresholds(all: bool, engine_args: &EngineArgs, json: bool) -> Result<(), PaceCliError> {
    let (engine, _) = open_engine(engine_args.config.as_deref(), engine_args.state.as_deref())?;
    let resolved = engine.resolved_thresholds();

    let presets: Vec<ThresholdRow> = ConditionPreset::ALL
        .iter()
        .map(|preset| {
            let parameters = preset.parameters();
            threshold_row(
                preset.display_name().to_string(),
                parameters.capacity,
                parameters.sensitivity,
                parameters.recovery,
            )
        })
        .collect();

    let mut combinations = Vec::new();
    if all {
        for capacity in CapacityLevel::ALL {
            for sensitivity in SensitivityProfile::ALL {
                for recovery in RecoveryWindow::ALL {
                    combinations.push(threshold_row(
                        format!(
                            "{}/{}/{}",
                            name_of(&capacity),
                            name_of(&sensitivity),
                            name_of(&recovery)
                        ),
                        capacity,
                        sensitivity,
                        recovery,
                    ));
                }
            }
        }
    }

    let report = ThresholdReport {
        active: ActiveThresholds {
            preset: engine.configuration().preset().map(|p| p.as_str()),
            boundaries: resolved.profile.boundaries(),
            half_life_days: resolved.half_life_days,
            lookback_days: engine.lookback_days(),
        },
        presets,
        combinations,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Active configuration");
    println!("====================");
    println!(
        "Preset:    {}",
        report.active.preset.unwrap_or("custom")
    );
    println!(
        "Safe < {:.1}  Caution < {:.1}  High < {:.1}",
        report.active.boundaries[0], report.active.boundaries[1], report.active.boundaries[2]
    );
    println!("Half-life: {} days", report.active.half_life_days);
    println!("Lookback:  {} days", report.active.lookback_days);

    println!("\nPresets");
    println!("=======");
    print_rows(&report.presets);

    if !report.combinations.is_empty() {
        println!("\nAll combinations (capacity/sensitivity/recovery)");
        println!("================================================");
        print_rows(&report.combinations);
    }

    Ok(())
}

fn cmd_configure(
    state: &Path,
    preset: Option<PresetArg>,
    capacity: Option<LevelArg>,
    sensitivity: Option<LevelArg>,
    recovery: Option<RecoveryArg>,
    thresholds: Option<Vec<f64>>,
) -> Result<(), PaceCliError> {
    let (mut engine, store) = open_engine(None, Some(state))?;
    let mut store = store.ok_or_else(|| PaceCliError::Usage("--state is required".into()))?;

    if let Some(preset) = preset {
        engine.select_preset(preset.into());
    }

    let mut updates = Vec::new();
    if let Some(capacity) = capacity {
        updates.push(engine.set_capacity(capacity.into()));
    }
    if let Some(sensitivity) = sensitivity {
        updates.push(engine.set_sensitivity(sensitivity.into()));
    }
    if let Some(recovery) = recovery {
        updates.push(engine.set_recovery(recovery.into()));
    }
    if let Some(values) = thresholds {
        let profile = match values.as_slice() {
            [safe, caution, high] => ThresholdProfile::new(*safe, *caution, *high)?,
            _ => {
                return Err(PaceCliError::Usage(
                    "--thresholds takes exactly three values".into(),
                ))
            }
        };
        updates.push(engine.set_thresholds(profile));
    }

    for update in &updates {
        if let ParameterUpdate::ReclassifiedToCustom { previous_preset } = update {
            println!(
                "Switched from preset '{}' to a custom configuration",
                previous_preset.display_name()
            );
        }
    }

    engine.save_to(&mut store)?;

    let resolved = engine.resolved_thresholds();
    println!(
        "Configuration saved: {} (safe {:.1}, caution {:.1}, high {:.1}, half-life {} days)",
        engine
            .configuration()
            .preset()
            .map(|p| p.display_name())
            .unwrap_or("Custom"),
        resolved.profile.safe_boundary(),
        resolved.profile.caution_boundary(),
        resolved.profile.high_boundary(),
        resolved.half_life_days
    );

    Ok(())
}

fn cmd_calibrate(
    state: &Path,
    config: Option<&Path>,
    action: CalibrateAction,
) -> Result<(), PaceCliError> {
    let (mut engine, store) = open_engine(config, Some(state))?;
    let mut store = store.ok_or_else(|| PaceCliError::Usage("--state is required".into()))?;

    match action {
        CalibrateAction::Start { kind } => {
            let session = engine.start_calibration(kind)?;
            println!("Started {} calibration (session {})", kind, session);
        }
        CalibrateAction::Record { kind, value, date } => {
            let sample = match date {
                Some(date) => BaselineSample::on(date, value),
                None => BaselineSample::undated(value),
            };
            let outcome = engine.record_sample(kind, sample)?;
            print_outcome(kind, &engine, outcome);
        }
        CalibrateAction::GoodDay { date, input } => {
            let records = read_records(&input, InputFormat::Auto)?;
            let source = InMemoryObservations::new(RecordAdapter::to_batch(&records)?);
            let outcome = engine.record_good_day(date, &source)?;
            print_outcome(SignalKind::Load, &engine, outcome);
        }
        CalibrateAction::History { kind, input, as_of } => {
            let records = read_records(&input, InputFormat::Auto)?;
            let samples = RecordAdapter::to_samples(&records)?;
            let outcome = engine.calibrate_physiological(kind, &samples, as_of)?;
            print_outcome(kind, &engine, outcome);
        }
        CalibrateAction::Cancel { kind } => {
            let discarded = engine.cancel_calibration(kind)?;
            println!("Cancelled {} calibration ({} samples discarded)", kind, discarded);
        }
        CalibrateAction::Reset { kind } => {
            engine.reset_baseline(kind)?;
            println!("Reset {} baseline", kind);
        }
        CalibrateAction::Status { kind, json } => {
            let kinds: Vec<SignalKind> = match kind {
                Some(kind) => vec![kind],
                None => SignalKind::ALL.to_vec(),
            };
            let statuses: Vec<CalibrationStatus> = kinds
                .into_iter()
                .map(|kind| calibration_status(&engine, kind))
                .collect();

            if json {
                println!("{}", serde_json::to_string_pretty(&statuses)?);
            } else {
                println!("Calibration Status");
                println!("==================");
                for status in &statuses {
                    print!(
                        "  {:<20} {:<11} {}/{} samples",
                        status.kind, status.state, status.sample_count, status.min_samples
                    );
                    match (status.mean, status.spread) {
                        (Some(mean), Some(spread)) => {
                            println!("  mean {:.2} {}, spread {:.2}", mean, status.unit, spread)
                        }
                        _ => println!(),
                    }
                }
            }
            // Read-only
            return Ok(());
        }
        CalibrateAction::Threshold { kind, deviations } => {
            let value = engine.threshold(kind, deviations)?;
            println!("{:.2} {}", value, kind.unit());
            return Ok(());
        }
    }

    engine.save_to(&mut store)?;
    Ok(())
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), PaceCliError> {
    let records = read_records(input, input_format)?;
    let results = RecordAdapter::validate_records(&records);

    let report = ValidationReport {
        total_records: records.len(),
        valid_records: records.len() - results.len(),
        invalid_records: results.len(),
        errors: results
            .iter()
            .map(|r| ValidationErrorDetail {
                index: r.index,
                record_id: r.record_id.clone(),
                error: r.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total records:   {}", report.total_records);
        println!("Valid records:   {}", report.valid_records);
        println!("Invalid records: {}", report.invalid_records);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Record {} (index {}): {}",
                    err.record_id.as_deref().unwrap_or("unknown"),
                    err.index,
                    err.error
                );
            }
        }
    }

    if report.invalid_records > 0 {
        Err(PaceCliError::ValidationFailed(report.invalid_records))
    } else {
        Ok(())
    }
}

fn cmd_doctor(config: Option<&Path>, state: Option<&Path>, json: bool) -> Result<(), PaceCliError> {
    let mut checks: Vec<DoctorCheck> = vec![
        DoctorCheck::ok("pace_version", format!("Pace version {}", PACE_VERSION)),
        DoctorCheck::ok("schema_version", format!("Input schema: {}", SCHEMA_VERSION)),
    ];

    let mut settings = PaceConfig::default().settings;
    if let Some(config_path) = config {
        if config_path.exists() {
            match PaceConfig::from_file(config_path) {
                Ok(parsed) => {
                    checks.push(DoctorCheck::ok(
                        "config",
                        format!(
                            "Configuration valid ({})",
                            parsed
                                .configuration
                                .preset()
                                .map(|p| p.display_name())
                                .unwrap_or("custom")
                        ),
                    ));
                    settings = parsed.settings;
                }
                Err(e) => checks.push(DoctorCheck::error(
                    "config",
                    format!("Invalid configuration: {}", e),
                )),
            }
        } else {
            checks.push(DoctorCheck::warning(
                "config",
                "Configuration file does not exist".to_string(),
            ));
        }
    }

    if let Some(state_dir) = state {
        if state_dir.is_dir() {
            let loaded = JsonFileStore::open(state_dir)
                .and_then(|store| LoadEngine::load_from(&store, settings.clone()));
            match loaded {
                Ok(engine) => {
                    let calibrated: Vec<&str> = SignalKind::ALL
                        .iter()
                        .filter(|kind| engine.calibrator(**kind).baseline().is_calibrated())
                        .map(|kind| kind.as_str())
                        .collect();
                    checks.push(DoctorCheck::ok(
                        "state",
                        format!(
                            "State readable (lookback {} days, calibrated: {})",
                            engine.lookback_days(),
                            if calibrated.is_empty() {
                                "none".to_string()
                            } else {
                                calibrated.join(", ")
                            }
                        ),
                    ));
                }
                Err(e) => checks.push(DoctorCheck::error(
                    "state",
                    format!("Cannot load state: {}", e),
                )),
            }
        } else {
            checks.push(DoctorCheck::warning(
                "state",
                "State directory does not exist".to_string(),
            ));
        }
    }

    // Check stdin is available (for piped input)
    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck::ok("stdin", "stdin is a TTY (interactive mode)".to_string())
    } else {
        DoctorCheck::ok("stdin", "stdin is a pipe (ready for --input -)".to_string())
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: PACE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Pace Doctor Report");
        println!("==================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(PaceCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), PaceCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", input_json_schema());
            } else {
                println!("Input Schema: {}", SCHEMA_VERSION);
                println!();
                println!("The pace.observation.v1 schema supports three record types:");
                println!();
                println!("1. symptom - Logged symptom");
                println!("   - severity: 1-5");
                println!("   - polarity: negative or positive");
                println!("   - name: optional label");
                println!();
                println!("2. activity - Logged activity");
                println!("   - physical_exertion, cognitive_exertion, emotional_load: 1-5");
                println!("   - duration_minutes: optional, 1-1440");
                println!();
                println!("3. sample - Physiological reading for calibration");
                println!("   - signal: hrv, resting_heart_rate, sleep_hours");
                println!("   - value: finite number");
                println!();
                println!("Each record is dated by backdated_date when present, otherwise by the");
                println!("local calendar date of recorded_at.");
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", output_json_schema());
            } else {
                println!("Output Schema: daily load score");
                println!();
                println!("One entry per calendar day in the requested range:");
                println!();
                println!("- date: YYYY-MM-DD");
                println!("- raw_contribution: load from that day's observations");
                println!("- decayed_load: recency-weighted load including history");
                println!("- risk_level: safe, caution, high, critical");
            }
        }
    }
    Ok(())
}

// Helper functions

fn read_input(input: &Path) -> Result<String, PaceCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn read_records(
    input: &Path,
    input_format: InputFormat,
) -> Result<Vec<ObservationRecord>, PaceCliError> {
    let input_data = read_input(input)?;
    let records = match input_format {
        InputFormat::Auto => RecordAdapter::parse(&input_data)?,
        InputFormat::Ndjson => RecordAdapter::parse_ndjson(&input_data)?,
        InputFormat::Json => RecordAdapter::parse_array(&input_data)?,
    };
    Ok(records)
}

/// Build an engine from an optional TOML file and an optional state directory.
///
/// A configuration stored in the state directory wins over the file's.
fn open_engine(
    config: Option<&Path>,
    state: Option<&Path>,
) -> Result<(LoadEngine, Option<JsonFileStore>), PaceCliError> {
    let config = match config {
        Some(path) => PaceConfig::from_file(path)?,
        None => PaceConfig::default(),
    };

    match state {
        Some(dir) => {
            let store = JsonFileStore::open(dir)?;
            let stored = store.load_configuration()?;
            let mut engine = LoadEngine::load_from(&store, config.settings)?;
            if stored.is_none() {
                engine.set_configuration(config.configuration);
            }
            Ok((engine, Some(store)))
        }
        None => Ok((LoadEngine::from_config(config)?, None)),
    }
}

fn format_output(scores: &[DailyLoadScore], format: OutputFormat) -> Result<String, PaceCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for score in scores {
                lines.push(serde_json::to_string(score)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(scores)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(scores)?),
    }
}

fn print_outcome(kind: SignalKind, engine: &LoadEngine, outcome: RecordOutcome) {
    let calibrator = engine.calibrator(kind);
    println!(
        "{}: {} samples ({}){}",
        kind,
        outcome.sample_count,
        calibrator.state(),
        if outcome.replaced {
            ", replaced same-day sample"
        } else {
            ""
        }
    );
    if outcome.calibrated {
        let baseline = calibrator.baseline();
        println!(
            "Calibrated: mean {:.2} {}, spread {:.2}",
            baseline.mean(),
            kind.unit(),
            baseline.spread()
        );
    }
}

fn calibration_status(engine: &LoadEngine, kind: SignalKind) -> CalibrationStatus {
    let calibrator = engine.calibrator(kind);
    let baseline = calibrator.baseline();
    let calibrated = baseline.is_calibrated();
    CalibrationStatus {
        kind: kind.as_str(),
        unit: kind.unit(),
        state: calibrator.state().as_str(),
        sample_count: calibrator.samples().len(),
        min_samples: calibrator.policy().min_samples,
        mean: calibrated.then(|| baseline.mean()),
        spread: calibrated.then(|| baseline.spread()),
    }
}

fn threshold_row(
    name: String,
    capacity: CapacityLevel,
    sensitivity: SensitivityProfile,
    recovery: RecoveryWindow,
) -> ThresholdRow {
    ThresholdRow {
        name,
        boundaries: ThresholdResolver::profile_for(capacity, sensitivity).boundaries(),
        half_life_days: half_life_days(recovery),
    }
}

fn print_rows(rows: &[ThresholdRow]) {
    println!(
        "  {:<22} {:>8} {:>8} {:>8} {:>10}",
        "", "safe", "caution", "high", "half-life"
    );
    for row in rows {
        println!(
            "  {:<22} {:>8.1} {:>8.1} {:>8.1} {:>9}d",
            row.name, row.boundaries[0], row.boundaries[1], row.boundaries[2], row.half_life_days
        );
    }
}

/// Serialized (snake_case) name of a unit enum
fn name_of<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn input_json_schema() -> String {
    let rating = serde_json::json!({ "type": "integer", "minimum": 1, "maximum": 5 });
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "https://synheart.ai/schemas/pace.observation.v1.json",
        "title": "pace.observation.v1",
        "description": "Synheart Pace observation record schema",
        "type": "object",
        "required": ["schema_version", "recorded_at", "record_type", "payload"],
        "properties": {
            "schema_version": {
                "type": "string",
                "const": SCHEMA_VERSION
            },
            "record_id": { "type": "string" },
            "recorded_at": { "type": "string", "format": "date-time" },
            "backdated_date": { "type": "string", "format": "date" },
            "record_type": {
                "type": "string",
                "enum": ["symptom", "activity", "sample"]
            },
            "payload": {
                "oneOf": [
                    {
                        "type": "object",
                        "required": ["symptom"],
                        "properties": {
                            "symptom": {
                                "type": "object",
                                "required": ["severity", "polarity"],
                                "properties": {
                                    "severity": rating,
                                    "polarity": { "type": "string", "enum": ["negative", "positive"] },
                                    "name": { "type": "string" }
                                }
                            }
                        }
                    },
                    {
                        "type": "object",
                        "required": ["activity"],
                        "properties": {
                            "activity": {
                                "type": "object",
                                "required": ["physical_exertion", "cognitive_exertion", "emotional_load"],
                                "properties": {
                                    "physical_exertion": rating,
                                    "cognitive_exertion": rating,
                                    "emotional_load": rating,
                                    "duration_minutes": { "type": "integer", "minimum": 1, "maximum": 1440 }
                                }
                            }
                        }
                    },
                    {
                        "type": "object",
                        "required": ["sample"],
                        "properties": {
                            "sample": {
                                "type": "object",
                                "required": ["signal", "value"],
                                "properties": {
                                    "signal": {
                                        "type": "string",
                                        "enum": ["hrv", "resting_heart_rate", "sleep_hours"]
                                    },
                                    "value": { "type": "number" }
                                }
                            }
                        }
                    }
                ]
            }
        }
    })
    .to_string()
}

fn output_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "https://synheart.ai/schemas/pace.daily_load.v1.json",
        "title": "pace daily load score",
        "description": "Synheart Pace daily load output",
        "type": "object",
        "required": ["date", "raw_contribution", "decayed_load", "risk_level"],
        "properties": {
            "date": { "type": "string", "format": "date" },
            "raw_contribution": { "type": "number", "minimum": 0 },
            "decayed_load": { "type": "number", "minimum": 0 },
            "risk_level": {
                "type": "string",
                "enum": ["safe", "caution", "high", "critical"]
            }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum PaceCliError {
    Io(io::Error),
    Engine(EngineError),
    Config(ConfigError),
    Calibration(CalibrationError),
    Json(serde_json::Error),
    NoObservations,
    ValidationFailed(usize),
    DoctorFailed,
    Usage(String),
}

impl From<io::Error> for PaceCliError {
    fn from(e: io::Error) -> Self {
        PaceCliError::Io(e)
    }
}

impl From<EngineError> for PaceCliError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Calibration(e) => PaceCliError::Calibration(e),
            EngineError::Config(e) => PaceCliError::Config(e),
            other => PaceCliError::Engine(other),
        }
    }
}

impl From<ConfigError> for PaceCliError {
    fn from(e: ConfigError) -> Self {
        PaceCliError::Config(e)
    }
}

impl From<CalibrationError> for PaceCliError {
    fn from(e: CalibrationError) -> Self {
        PaceCliError::Calibration(e)
    }
}

impl From<serde_json::Error> for PaceCliError {
    fn from(e: serde_json::Error) -> Self {
        PaceCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<PaceCliError> for CliError {
    fn from(e: PaceCliError) -> Self {
        match e {
            PaceCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            PaceCliError::Engine(e) => CliError {
                code: "ENGINE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Ensure input matches pace.observation.v1 schema".to_string()),
            },
            PaceCliError::Config(e) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'pace doctor --config <file>' for details".to_string()),
            },
            PaceCliError::Calibration(e) => CliError {
                code: "CALIBRATION_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'pace calibrate status' to see the current state".to_string()),
            },
            PaceCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            PaceCliError::NoObservations => CliError {
                code: "NO_OBSERVATIONS".to_string(),
                message: "No observations found in input".to_string(),
                hint: Some("Ensure input contains symptom or activity records".to_string()),
            },
            PaceCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} records failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            PaceCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
            PaceCliError::Usage(msg) => CliError {
                code: "USAGE_ERROR".to_string(),
                message: msg,
                hint: Some("Run 'pace --help'".to_string()),
            },
        }
    }
}

// Report types

#[derive(Serialize)]
struct ValidationReport {
    total_records: usize,
    valid_records: usize,
    invalid_records: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(Serialize)]
struct ValidationErrorDetail {
    index: usize,
    record_id: Option<String>,
    error: String,
}

#[derive(Serialize)]
struct ClassifyReport {
    load: f64,
    risk_level: &'static str,
    label: &'static str,
    guidance: &'static str,
    baseline_shift: f64,
    boundaries: [f64; 3],
}

#[derive(Serialize)]
struct ThresholdReport {
    active: ActiveThresholds,
    presets: Vec<ThresholdRow>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    combinations: Vec<ThresholdRow>,
}

#[derive(Serialize)]
struct ActiveThresholds {
    preset: Option<&'static str>,
    boundaries: [f64; 3],
    half_life_days: f64,
    lookback_days: u32,
}

#[derive(Serialize)]
struct ThresholdRow {
    name: String,
    boundaries: [f64; 3],
    half_life_days: f64,
}

#[derive(Serialize)]
struct CalibrationStatus {
    kind: &'static str,
    unit: &'static str,
    state: &'static str,
    sample_count: usize,
    min_samples: usize,
    mean: Option<f64>,
    spread: Option<f64>,
}

#[derive(Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

impl DoctorCheck {
    fn ok(name: &str, message: String) -> Self {
        Self::with_status(name, CheckStatus::Ok, message)
    }

    fn warning(name: &str, message: String) -> Self {
        Self::with_status(name, CheckStatus::Warning, message)
    }

    fn error(name: &str, message: String) -> Self {
        Self::with_status(name, CheckStatus::Error, message)
    }

    fn with_status(name: &str, status: CheckStatus, message: String) -> Self {
        DoctorCheck {
            name: name.to_string(),
            status,
            message,
        }
    }
}

#[derive(Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
