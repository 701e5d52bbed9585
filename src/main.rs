#![recursion_limit = "256"]

pub mod clean;
pub mod cli;
pub mod csv_handler;
pub mod error;
pub mod filter;
pub mod nas;
pub mod reference;
pub mod report;
pub mod schema;
pub mod table;
pub mod taxon;

use clap::Parser;
use clean::{CleanOptions, clean_table, parse_renames};
use cli::{CleanArgs, Cli, Command, FetchArgs, FilterArgs, NormalizeArgs, ReferenceArgs, SpeciesArgs};
use csv_handler::{file_stem, read_table, write_table};
use error::{CrateError, Result};
use filter::select_complete;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use nas::client::{NasClient, OccurrenceQuery};
use nas::occurrence::{TableMode, fetch_occurrence_table, normalize_csv_table};
use report::{reference_counts, write_reference_report, write_search_summary};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use table::Table;
use taxon::normalizer::split_binomial;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .format_target(false)
        .format_timestamp_secs()
        .filter_level(log::LevelFilter::Info)
        .try_init()
        .expect("Failed to initialize logger");

    let cli = Cli::parse();
    info!("Starting NAS occurrence tool...");
    info!("API base URL: {}", cli.base_url);

    let start_time = Instant::now();
    let outcome = match &cli.command {
        Command::Occurrences(args) => run_occurrences(&cli.base_url, args).await,
        Command::Normalize(args) => run_normalize(args),
        Command::Filter(args) => run_filter(args),
        Command::Clean(args) => run_clean(args),
        Command::Species(args) => run_species(&cli.base_url, args).await,
        Command::References(args) => run_references(&cli.base_url, args).await,
    };

    let summary = match outcome {
        Ok(summary) => summary,
        Err(e) => {
            error!("Command failed: {}", e);
            return Err(e);
        }
    };

    let duration = start_time.elapsed();
    info!("Total execution time: {:.2?}", duration);

    if !summary.outputs.is_empty() {
        println!("\n--- Summary Report ---");
        println!("Records processed: {}", summary.records);
        for (path, detail) in &summary.outputs {
            println!("Wrote {} ({})", path.display(), detail);
        }
        println!("Execution time: {:.2?}", duration);
    }

    Ok(())
}

#[derive(Default)]
struct RunSummary {
    records: usize,
    outputs: Vec<(PathBuf, String)>,
}

impl RunSummary {
    fn written(&mut self, path: PathBuf, table: &Table) {
        let detail = format!("{} rows, {} columns", table.len(), table.columns().len());
        self.outputs.push((path, detail));
    }
}

async fn run_occurrences(base_url: &str, args: &FetchArgs) -> Result<RunSummary> {
    // 1. Build the query
    let client = NasClient::new(base_url)?;
    let query = OccurrenceQuery::new(&args.species_id)
        .with_api_key(args.api_key.clone())
        .with_limit(args.limit);
    let mode = if args.raw {
        TableMode::Raw
    } else {
        TableMode::Normalized
    };

    // 2. Fetch and reshape the records
    let pb = spinner(format!("Fetching occurrences for species {}", args.species_id));
    let fetched = fetch_occurrence_table(&client, &query, mode, args.columns.as_deref()).await;
    pb.finish_and_clear();
    let table = fetched?;

    let output = args
        .output_file
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("species_id{}.csv", args.species_id)));
    // 3. Write the CSV
    write_table(&table, &output)?;
    info!("Saved {} occurrences to {:?}", table.len(), output);

    let mut summary = RunSummary {
        records: table.len(),
        ..RunSummary::default()
    };
    summary.written(output, &table);
    Ok(summary)
}

fn run_normalize(args: &NormalizeArgs) -> Result<RunSummary> {
    info!("Normalizing CSV export {:?}", args.input_file);
    let table = read_table(&args.input_file)?;
    let records = table.len();
    // Rename, unpack references and drop the flat reference columns
    let table = normalize_csv_table(table, args.columns.as_deref())?;

    let output = args.output_file.clone().unwrap_or_else(|| {
        PathBuf::from(format!("{}_normalized.csv", file_stem(&args.input_file)))
    });
    write_table(&table, &output)?;

    let mut summary = RunSummary {
        records,
        ..RunSummary::default()
    };
    summary.written(output, &table);
    Ok(summary)
}

fn run_filter(args: &FilterArgs) -> Result<RunSummary> {
    info!("Filtering {:?} to {} columns", args.input_file, args.columns.len());
    let table = read_table(&args.input_file)?;
    let records = table.len();
    // Same selection as the export cleanup: keep, rename, dropna
    let table = select_complete(table, &args.columns)?;
    if table.len() < records {
        warn!("Dropped {} rows with missing values", records - table.len());
    }

    let output = args.output_file.clone().unwrap_or_else(|| {
        PathBuf::from(format!("{}_modified.csv", file_stem(&args.input_file)))
    });
    write_table(&table, &output)?;

    let mut summary = RunSummary {
        records,
        ..RunSummary::default()
    };
    summary.written(output, &table);
    Ok(summary)
}

fn run_clean(args: &CleanArgs) -> Result<RunSummary> {
    info!("Cleaning {:?}", args.input_file);
    let options = CleanOptions {
        drop_columns: args.drop.clone(),
        keep_columns: args.keep.clone(),
        split_columns: args.split.clone(),
        rename_columns: parse_renames(&args.rename)?,
        rename_year: !args.no_rename_year,
    };

    let table = read_table(&args.input_file)?;
    let mut summary = RunSummary {
        records: table.len(),
        ..RunSummary::default()
    };
    for (name, part) in clean_table(table, &file_stem(&args.input_file), &options)? {
        let path = PathBuf::from(name);
        write_table(&part, &path)?;
        info!("Saved cleaned table to {:?}", path);
        summary.written(path, &part);
    }
    Ok(summary)
}

async fn run_species(base_url: &str, args: &SpeciesArgs) -> Result<RunSummary> {
    // Authorship after the epithet is ignored
    let (genus, species) = split_binomial(&args.name)?;
    let client = NasClient::new(base_url)?;

    let pb = spinner(format!("Searching for {} {}", genus, species));
    let searched = client.search_species(&genus, &species).await;
    pb.finish_and_clear();
    let response = searched?;

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    write_search_summary(&response, &mut handle)?;
    handle.flush().map_err(CrateError::IoError)?;

    Ok(RunSummary {
        records: response.results.len(),
        ..RunSummary::default()
    })
}

async fn run_references(base_url: &str, args: &ReferenceArgs) -> Result<RunSummary> {
    let client = NasClient::new(base_url)?;
    let query = OccurrenceQuery::new(&args.species_id)
        .with_api_key(args.api_key.clone())
        .with_limit(args.limit);

    // 1. Fetch every column; the report only needs `references`
    let pb = spinner(format!("Fetching occurrences for species {}", args.species_id));
    let fetched = fetch_occurrence_table(&client, &query, TableMode::Normalized, None).await;
    pb.finish_and_clear();
    let table = fetched?;

    // 2. Group identical reference lists
    let counts = reference_counts(&table)?;
    info!(
        "Found {} distinct reference lists across {} occurrences",
        counts.len(),
        table.len()
    );

    let output = args
        .output_file
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("ref_results_{}.txt", args.species_id)));
    // 3. Write the text report
    let file = File::create(&output).map_err(|e| {
        error!("Failed to create output file {:?}: {}", output, e);
        CrateError::IoError(e)
    })?;
    let mut writer = BufWriter::new(file);
    write_reference_report(&counts, &mut writer)?;
    writer.flush().map_err(CrateError::IoError)?;
    info!("Saved reference report to {:?}", output);

    Ok(RunSummary {
        records: table.len(),
        outputs: vec![(output, format!("{} distinct reference lists", counts.len()))],
    })
}

fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
