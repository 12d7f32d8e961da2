use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use imdb_import::cli_style::{self, get_styles, TableBuilder};
use imdb_import::config::{AppConfig, CliConfig, FileConfig};
use imdb_import::dataset::{provision, Provisioned};
use imdb_import::import::{build_plan, BadRowPolicy, FailurePolicy, ImportOptions, ImportOrchestrator};
use imdb_import::progress::ConsoleProgress;
use imdb_import::sqlite_persistence::{count_rows, list_tables};
use imdb_import::database;
use rusqlite::Connection;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "imdb-import", version = env!("IMPORTER_VERSION"), styles = get_styles())]
#[command(about = "Import the IMDb TSV dumps into an SQLite database")]
struct Cli {
    /// SQLite database file.
    #[clap(long, env = "IMDB_DB_PATH", default_value = "imdb.db", global = true)]
    db_path: PathBuf,

    /// TOML config file. Values in it override command line flags.
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load every dataset file into its table, in dependency order.
    Import(ImportArgs),

    /// Create the destination tables, or check existing ones against the
    /// expected layout.
    Schema {
        /// Drop and recreate every table. Deletes all imported data.
        #[clap(long)]
        recreate: bool,
    },

    /// Show row counts for every table and the database file size.
    Stats,
}

#[derive(Args, Debug)]
struct ImportArgs {
    /// Directory containing the *.tsv.gz files.
    #[clap(long, env = "IMDB_DATASET_DIR", default_value = "dataset")]
    dataset_dir: PathBuf,

    /// What to do when a file fails.
    #[clap(long, value_enum, default_value_t = FailurePolicy::Skip)]
    on_file_failure: FailurePolicy,

    /// What to do with a row that cannot be stored.
    #[clap(long, value_enum, default_value_t = BadRowPolicy::RejectFile)]
    on_bad_row: BadRowPolicy,

    /// Connection retries after the first failed attempt.
    #[clap(long, default_value_t = 3)]
    connect_retries: u32,

    /// Seconds between connection attempts.
    #[clap(long, default_value_t = 2)]
    retry_interval_secs: u64,

    #[clap(long, default_value_t = 5000)]
    busy_timeout_ms: u64,

    /// Rows per committed transaction.
    #[clap(long, default_value_t = 50_000)]
    batch_size: usize,

    /// Seconds between row count polls, 0 disables polling.
    #[clap(long, default_value_t = 5)]
    progress_interval_secs: u64,

    /// Report rows whose foreign keys point nowhere once the run ends.
    #[clap(long)]
    verify_foreign_keys: bool,

    /// Only import the files listed in the import order.
    #[clap(long)]
    no_discover: bool,

    /// Write the final report as JSON to this path.
    #[clap(long)]
    report_json: Option<PathBuf>,
}

impl ImportArgs {
    fn to_cli_config(&self, db_path: PathBuf) -> CliConfig {
        CliConfig {
            db_path,
            dataset_dir: self.dataset_dir.clone(),
            on_file_failure: self.on_file_failure,
            on_bad_row: self.on_bad_row,
            connect_retries: self.connect_retries,
            retry_interval_secs: self.retry_interval_secs,
            busy_timeout_ms: self.busy_timeout_ms,
            batch_size: self.batch_size,
            progress_interval_secs: self.progress_interval_secs,
            verify_foreign_keys: self.verify_foreign_keys,
            discover_extra_files: !self.no_discover,
        }
    }
}

fn main() -> ExitCode {
    if let Err(e) = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
    {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            cli_style::print_error(&format!("{:#}", e));
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<u8> {
    let file_config = cli.config.as_deref().map(FileConfig::load).transpose()?;

    match cli.command {
        Command::Import(args) => {
            let config = AppConfig::resolve(&args.to_cli_config(cli.db_path), file_config)?;
            run_import(&config, args.report_json.as_ref())
        }
        Command::Schema { recreate } => {
            let cli_config = CliConfig {
                db_path: cli.db_path,
                ..Default::default()
            };
            run_schema(&AppConfig::resolve(&cli_config, file_config)?, recreate)
        }
        Command::Stats => {
            let cli_config = CliConfig {
                db_path: cli.db_path,
                ..Default::default()
            };
            run_stats(&AppConfig::resolve(&cli_config, file_config)?)
        }
    }
}

fn run_import(config: &AppConfig, report_json: Option<&PathBuf>) -> Result<u8> {
    cli_style::print_section_header("IMDb Import");
    cli_style::print_key_value("Database", &config.connection.db_path.display().to_string());
    cli_style::print_key_value("Dataset", &config.dataset_dir.display().to_string());
    cli_style::print_key_value("On file failure", &format!("{:?}", config.on_file_failure));
    cli_style::print_key_value("On bad row", &format!("{:?}", config.on_bad_row));
    println!();

    let mut conn = match database::connect(&config.connection) {
        Ok(conn) => conn,
        Err(e) => {
            error!("{}", e);
            cli_style::print_error(&e.to_string());
            return Ok(1);
        }
    };

    let plan = build_plan(
        &config.dataset_dir,
        &config.import_order,
        config.discover_extra_files,
    );
    info!("{} files planned", plan.len());

    let cancel = Arc::new(AtomicBool::new(false));
    install_interrupt_handler(Arc::clone(&cancel))?;

    let report = {
        let mut progress = ConsoleProgress::new(&config.connection.db_path, config.progress_interval);
        ImportOrchestrator::new(&mut conn, ImportOptions::from_config(config))
            .with_cancel_flag(cancel)
            .run(&plan, &mut progress)
    };

    cli_style::print_run_summary(&report);

    if let Some(path) = report_json {
        let json = report.to_json().context("Failed to serialize report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {:?}", path))?;
        cli_style::print_info(&format!("Report written to {}", path.display()));
    }

    Ok(report.status.exit_code())
}

/// First interrupt lets the current file finish; a second one exits at once.
fn install_interrupt_handler(cancel: Arc<AtomicBool>) -> Result<()> {
    ctrlc::set_handler(move || {
        if cancel.swap(true, Ordering::SeqCst) {
            eprintln!("\nInterrupted again, exiting now");
            std::process::exit(130);
        }
        eprintln!("\nInterrupt received: stopping after the current file (Ctrl-C again to exit now)");
    })
    .context("Failed to install interrupt handler")
}

fn run_schema(config: &AppConfig, recreate: bool) -> Result<u8> {
    let db_path = &config.connection.db_path;
    let mut conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database {:?}", db_path))?;
    conn.busy_timeout(config.connection.busy_timeout)?;

    cli_style::print_section_header("Schema");
    match provision(&mut conn, recreate)? {
        Provisioned::Created => cli_style::print_success("Tables created"),
        Provisioned::Recreated => cli_style::print_success("Tables dropped and recreated"),
        Provisioned::Validated { problems } if problems.is_empty() => {
            cli_style::print_success("Existing tables match the expected schema")
        }
        Provisioned::Validated { problems } => {
            for problem in &problems {
                cli_style::print_warning(problem);
            }
            cli_style::print_error(&format!(
                "{} schema problem(s); run with --recreate to rebuild the tables",
                problems.len()
            ));
            return Ok(1);
        }
    }
    Ok(0)
}

fn run_stats(config: &AppConfig) -> Result<u8> {
    let db_path = &config.connection.db_path;
    let conn = database::open_existing(db_path, config.connection.busy_timeout)
        .with_context(|| format!("Failed to open database {:?}", db_path))?;

    cli_style::print_section_header("Database Stats");
    let tables = list_tables(&conn)?;
    if tables.is_empty() {
        cli_style::print_empty_list("no tables");
    } else {
        let mut builder = TableBuilder::new(vec!["Table", "Rows"]);
        for table in &tables {
            let rows = count_rows(&conn, table)?;
            builder.add_row(vec![table.clone(), cli_style::format_count(rows)]);
        }
        builder.print();
    }

    let size = std::fs::metadata(db_path)
        .with_context(|| format!("Failed to stat {:?}", db_path))?
        .len();
    println!();
    cli_style::print_key_value(
        "Database size",
        &format!("{:.1} MB", size as f64 / (1024.0 * 1024.0)),
    );
    Ok(0)
}
