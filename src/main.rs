use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use nwis_acquire::codes::{CodeKind, CodeTable};
use nwis_acquire::config::ClientConfig;
use nwis_acquire::logging::{self, DataSource, LogLevel};
use nwis_acquire::model::{DateRange, Interval};
use nwis_acquire::verify;
use nwis_acquire::{AcquisitionError, AcquisitionMode, NwisClient, SeriesIdentifier, ServiceVariant};
use std::path::PathBuf;
use std::process;

/// Fetch time series from the USGS NWIS daily and instantaneous values services
///
/// Series are named by compact identifiers of the form
/// `site.agency.parameter[-statistic].interval`, e.g.
/// `09010500..00060-00003.Day` (daily mean discharge) or
/// `05568500.USGS.00065.15Min` (15-minute stage).
#[derive(Debug, Parser)]
#[command(name = "nwis-acquire", version)]
struct Args {
    /// TOML settings file (defaults to ./nwis.toml when present)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Minimum level to log: debug, info, warn or error
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    /// Append log output to this file instead of stderr
    #[arg(long, value_name = "PATH", global = true)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Read one series and print a summary of it
    Fetch {
        /// Compact series identifier
        identifier: String,

        /// First day to read (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last day to read, inclusive (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Save the raw response body to this file
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Only check that the series exists; no values are read
        #[arg(long)]
        discovery: bool,
    },
    /// Check that each series exists and print a JSON report
    Verify {
        #[arg(required = true)]
        identifiers: Vec<String>,
    },
    /// List known codes as "code - name"
    Codes {
        #[arg(value_enum, default_value_t = CodeList::Parameters)]
        kind: CodeList,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CodeList {
    Parameters,
    Statistics,
    SiteTypes,
}

impl From<CodeList> for CodeKind {
    fn from(list: CodeList) -> Self {
        match list {
            CodeList::Parameters => CodeKind::Parameter,
            CodeList::Statistics => CodeKind::Statistic,
            CodeList::SiteTypes => CodeKind::SiteType,
        }
    }
}

fn main() {
    let args = Args::parse();

    logging::init_logger(args.log_level, args.log_file.as_deref(), true);

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), AcquisitionError> {
    match args.command {
        Commands::Codes { kind } => {
            let table = CodeTable::builtin()?;
            for choice in table.composite_choices(kind.into()) {
                println!("{}", choice);
            }
            Ok(())
        }
        Commands::Fetch {
            identifier,
            start,
            end,
            output,
            discovery,
        } => {
            let config = ClientConfig::load(args.config.as_deref())?;
            let client = NwisClient::new(config, variant_for(&identifier)?)?;

            let range = DateRange::new(
                start.and_then(|d| d.and_hms_opt(0, 0, 0)),
                end.and_then(|d| d.and_hms_opt(23, 59, 59)),
            );
            let mode = if discovery {
                AcquisitionMode::Discovery
            } else {
                AcquisitionMode::Run
            };

            let record = client.read_series(&identifier, range, mode, output.as_deref())?;

            println!("{}  {}", record.identifier, record.site_name);
            println!("  {} [{}], {}", record.description, record.units, record.interval);
            if mode == AcquisitionMode::Run {
                let missing = record.points.iter().filter(|p| p.value.is_none()).count();
                println!("  {} values ({} missing)", record.points.len(), missing);
                if let (Some(first), Some(last)) = (record.points.first(), record.points.last()) {
                    println!("  {} .. {}", first.timestamp, last.timestamp);
                }
            }
            Ok(())
        }
        Commands::Verify { identifiers } => {
            let config = ClientConfig::load(args.config.as_deref())?;

            let (daily, instantaneous): (Vec<String>, Vec<String>) = identifiers
                .into_iter()
                .partition(|id| matches!(variant_for(id), Ok(ServiceVariant::Daily)));

            let mut reports = Vec::new();
            for (variant, ids) in [(ServiceVariant::Daily, daily), (ServiceVariant::Instantaneous, instantaneous)] {
                if ids.is_empty() {
                    continue;
                }
                let client = NwisClient::new(config.clone(), variant)?;
                let report = verify::verify_series(&client, &ids);
                verify::print_summary(&report);
                reports.push(report);
            }

            let json = serde_json::to_string_pretty(&reports)
                .map_err(|e| AcquisitionError::Parse(format!("Failed to render report: {}", e)))?;
            println!("{}", json);
            Ok(())
        }
    }
}

/// Daily identifiers end in `.Day`; everything else goes to the
/// instantaneous service, which rejects what it cannot serve.
fn variant_for(identifier: &str) -> Result<ServiceVariant, AcquisitionError> {
    let id: SeriesIdentifier = identifier.parse()?;
    let variant = match id.interval {
        Interval::Day => ServiceVariant::Daily,
        _ => ServiceVariant::Instantaneous,
    };
    logging::debug(
        DataSource::System,
        Some(&id.site_id),
        &format!("{} served by the {} service", identifier, variant),
    );
    Ok(variant)
}
