//! Journey CLI - Command-line interface for Journey Flux
//!
//! Commands:
//! - analyze: Run sessions, paths, funnel, timing and graph analyses
//! - sessions: Print the session table
//! - events: Event frequencies, temporal distribution and per-event detail
//! - origins: Traffic origins of the sessions leading up to an event
//! - validate: Validate raw rows against the input schema
//! - schema: Print input and output column sets

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use journey_flux::events::{
    DatasetSummary, EventDetail, EventFrequency, EventOverview, TemporalCount,
};
use journey_flux::schema::{RawTable, RawTableAdapter, OUTPUT_TABLES, REQUIRED_COLUMNS, SCHEMA_VERSION};
use journey_flux::{
    AnalysisOutcome, AnalysisRequest, AnalyticsError, EventSnapshot, JourneyProcessor, Normalizer,
    SessionAggregator, TimeGranularity, ENGINE_VERSION, PRODUCER_NAME,
};

/// Journey - Batch event-journey analytics
#[derive(Parser)]
#[command(name = "journey")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Derive sessions, funnels, paths and transition graphs from event logs", long_about = None)]
struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full analysis described by a request file
    Analyze {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Analysis request JSON (defaults apply when omitted)
        #[arg(short, long)]
        request: Option<PathBuf>,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Pretty-print the report
        #[arg(long)]
        pretty: bool,
    },

    /// Print one summary row per session
    Sessions {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Pretty-print the table
        #[arg(long)]
        pretty: bool,
    },

    /// Event frequencies and temporal distribution
    Events {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Bucket size for the temporal distribution
        #[arg(long, default_value = "day")]
        granularity: Granularity,

        /// Restrict the temporal distribution to these events
        #[arg(long = "event")]
        events: Vec<String>,

        /// Add occurrence totals and traffic origins for this event
        #[arg(long)]
        detail: Option<String>,
    },

    /// Traffic origins of the sessions leading up to an event
    Origins {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Event fired in the target session
        #[arg(short, long)]
        event: String,

        /// Target session number
        #[arg(short, long, default_value_t = 1)]
        session: i64,

        /// Keep only actors firing the event for the first time in that session
        #[arg(long)]
        first_only: bool,
    },

    /// Validate raw rows against the input schema
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print input and output column sets
    Schema {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one row per line)
    Ndjson,
    /// JSON array of rows
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum Granularity {
    Day,
    Hour,
    Weekday,
}

impl From<Granularity> for TimeGranularity {
    fn from(g: Granularity) -> Self {
        match g {
            Granularity::Day => TimeGranularity::Day,
            Granularity::Hour => TimeGranularity::Hour,
            Granularity::Weekday => TimeGranularity::Weekday,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

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

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "journey_flux=info".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run(cli: Cli) -> Result<(), JourneyCliError> {
    match cli.command {
        Commands::Analyze {
            input,
            request,
            output,
            input_format,
            pretty,
        } => cmd_analyze(&input, request.as_deref(), &output, input_format, pretty),

        Commands::Sessions {
            input,
            input_format,
            pretty,
        } => cmd_sessions(&input, input_format, pretty),

        Commands::Events {
            input,
            input_format,
            granularity,
            events,
            detail,
        } => cmd_events(
            &input,
            input_format,
            granularity.into(),
            &events,
            detail.as_deref(),
        ),

        Commands::Origins {
            input,
            input_format,
            event,
            session,
            first_only,
        } => cmd_origins(&input, input_format, &event, session, first_only),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Schema { json } => cmd_schema(json),
    }
}

fn cmd_analyze(
    input: &Path,
    request: Option<&Path>,
    output: &Path,
    input_format: InputFormat,
    pretty: bool,
) -> Result<(), JourneyCliError> {
    let request = match request {
        Some(path) => AnalysisRequest::from_json(&fs::read_to_string(path)?)?,
        None => AnalysisRequest::default(),
    };
    let processor = JourneyProcessor::new(request)?;

    let snapshot = load_snapshot(input, &input_format)?;
    let report = processor.analyze(&snapshot)?;

    let output_data = if pretty {
        report.to_json_pretty()?
    } else {
        report.to_json()?
    };
    write_output(output, &output_data)
}

fn cmd_sessions(input: &Path, input_format: InputFormat, pretty: bool) -> Result<(), JourneyCliError> {
    let snapshot = load_snapshot(input, &input_format)?;
    let sessions = SessionAggregator::aggregate(&snapshot);
    let output = if pretty {
        serde_json::to_string_pretty(&sessions)?
    } else {
        serde_json::to_string(&sessions)?
    };
    println!("{}", output);
    Ok(())
}

fn cmd_events(
    input: &Path,
    input_format: InputFormat,
    granularity: TimeGranularity,
    events: &[String],
    detail: Option<&str>,
) -> Result<(), JourneyCliError> {
    let snapshot = load_snapshot(input, &input_format)?;
    let report = EventsReport {
        summary: EventOverview::dataset_summary(&snapshot),
        frequencies: EventOverview::event_frequencies(&snapshot),
        granularity,
        temporal: EventOverview::temporal_distribution(&snapshot, granularity, events),
        detail: detail.map(|name| EventOverview::event_detail(&snapshot, name)),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_origins(
    input: &Path,
    input_format: InputFormat,
    event: &str,
    session: i64,
    first_only: bool,
) -> Result<(), JourneyCliError> {
    let snapshot = load_snapshot(input, &input_format)?;
    let journey = EventOverview::origin_journey(&snapshot, event, session, first_only)?;
    println!("{}", serde_json::to_string_pretty(&journey)?);
    Ok(())
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), JourneyCliError> {
    let table = read_table(input, &input_format)?;

    let missing_columns = table.missing_columns(&REQUIRED_COLUMNS);
    let results = RawTableAdapter::validate_rows(&table);
    let report = ValidationReport {
        schema_version: SCHEMA_VERSION.to_string(),
        total_rows: table.len(),
        valid_rows: table.len() - results.len(),
        invalid_rows: results.len(),
        missing_columns,
        errors: results
            .iter()
            .map(|r| ValidationErrorDetail {
                index: r.index,
                error: r.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Schema:       {}", report.schema_version);
        println!("Total rows:   {}", report.total_rows);
        println!("Valid rows:   {}", report.valid_rows);
        println!("Invalid rows: {}", report.invalid_rows);

        if !report.missing_columns.is_empty() {
            println!("\nMissing columns: {}", report.missing_columns.join(", "));
        }
        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - Row {}: {}", err.index, err.error);
            }
        }
    }

    if !report.missing_columns.is_empty() {
        Err(JourneyCliError::Analytics(AnalyticsError::SchemaValidation {
            missing_columns: report.missing_columns,
        }))
    } else if report.invalid_rows > 0 {
        Err(JourneyCliError::ValidationFailed(report.invalid_rows))
    } else {
        Ok(())
    }
}

fn cmd_schema(json: bool) -> Result<(), JourneyCliError> {
    if json {
        let outputs: serde_json::Map<String, serde_json::Value> = OUTPUT_TABLES
            .iter()
            .map(|(name, cols)| (name.to_string(), serde_json::json!(cols)))
            .collect();
        let schema = serde_json::json!({
            "schema_version": SCHEMA_VERSION,
            "producer": PRODUCER_NAME,
            "required_columns": REQUIRED_COLUMNS,
            "output_tables": outputs,
        });
        println!("{}", serde_json::to_string_pretty(&schema)?);
    } else {
        println!("Input Schema: {}", SCHEMA_VERSION);
        println!();
        println!("Required columns:");
        for column in REQUIRED_COLUMNS {
            println!("  - {}", column);
        }
        println!();
        println!("Output tables:");
        for (name, cols) in OUTPUT_TABLES {
            println!("  {}: {}", name, cols.join(", "));
        }
    }
    Ok(())
}

// Helper functions

fn read_input(input: &Path) -> Result<String, JourneyCliError> {
    if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            return Err(JourneyCliError::NoInput);
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn read_table(input: &Path, input_format: &InputFormat) -> Result<RawTable, JourneyCliError> {
    let data = read_input(input)?;
    let table = match input_format {
        InputFormat::Ndjson => RawTableAdapter::parse_ndjson(&data)?,
        InputFormat::Json => RawTableAdapter::parse_array(&data)?,
    };
    if table.is_empty() {
        return Err(JourneyCliError::NoEvents);
    }
    debug!(rows = table.len(), columns = table.columns().len(), "read input table");
    Ok(table)
}

fn load_snapshot(input: &Path, input_format: &InputFormat) -> Result<EventSnapshot, JourneyCliError> {
    let table = read_table(input, input_format)?;
    Ok(Normalizer::normalize(&table)?)
}

fn write_output(output: &Path, data: &str) -> Result<(), JourneyCliError> {
    if output.to_string_lossy() == "-" {
        println!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

// Error handling

#[derive(Debug)]
enum JourneyCliError {
    Io(io::Error),
    Analytics(AnalyticsError),
    Json(serde_json::Error),
    NoInput,
    NoEvents,
    ValidationFailed(usize),
}

impl From<io::Error> for JourneyCliError {
    fn from(e: io::Error) -> Self {
        JourneyCliError::Io(e)
    }
}

impl From<AnalyticsError> for JourneyCliError {
    fn from(e: AnalyticsError) -> Self {
        JourneyCliError::Analytics(e)
    }
}

impl From<serde_json::Error> for JourneyCliError {
    fn from(e: serde_json::Error) -> Self {
        JourneyCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<JourneyCliError> for CliError {
    fn from(e: JourneyCliError) -> Self {
        match e {
            JourneyCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            JourneyCliError::Analytics(e) => analytics_error(e),
            JourneyCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            JourneyCliError::NoInput => CliError {
                code: "NO_INPUT".to_string(),
                message: "stdin is a terminal, nothing to read".to_string(),
                hint: Some("Pipe rows into the command or pass --input FILE".to_string()),
            },
            JourneyCliError::NoEvents => CliError {
                code: "NO_EVENTS".to_string(),
                message: "No rows found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            JourneyCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} rows failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
        }
    }
}

fn analytics_error(e: AnalyticsError) -> CliError {
    let (code, hint) = match &e {
        AnalyticsError::SchemaValidation { .. } => (
            "SCHEMA_ERROR",
            "Run 'journey schema' for the required columns",
        ),
        AnalyticsError::DataType { .. } => (
            "DATA_TYPE_ERROR",
            "Run 'journey validate' to list every invalid row",
        ),
        AnalyticsError::InvalidParameter(_) => {
            ("INVALID_PARAMETER", "Check the analysis request file")
        }
        AnalyticsError::JsonError(_) => ("JSON_ERROR", "Check JSON syntax"),
        AnalyticsError::ParseError(_) => ("PARSE_ERROR", "Check input format"),
    };
    CliError {
        code: code.to_string(),
        message: e.to_string(),
        hint: Some(hint.to_string()),
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    schema_version: String,
    total_rows: usize,
    valid_rows: usize,
    invalid_rows: usize,
    missing_columns: Vec<String>,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    error: String,
}

#[derive(serde::Serialize)]
struct EventsReport {
    summary: DatasetSummary,
    frequencies: Vec<EventFrequency>,
    granularity: TimeGranularity,
    temporal: Vec<TemporalCount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<AnalysisOutcome<EventDetail>>,
}
