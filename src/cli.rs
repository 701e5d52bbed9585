use crate::nas::client::{DEFAULT_BASE_URL, DEFAULT_LIMIT};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the NAS REST API.
    #[arg(long, global = true, env = "NAS_API_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Fetch the occurrences of one species from the API and write them as CSV.
    Occurrences(FetchArgs),
    /// Normalize a manually downloaded NAS CSV export onto the API schema.
    Normalize(NormalizeArgs),
    /// Keep only the listed columns of a CSV file and drop incomplete rows.
    Filter(FilterArgs),
    /// Drop, keep, rename and split the columns of a CSV file.
    Clean(CleanArgs),
    /// Search species by binomial name and print the results.
    Species(SpeciesArgs),
    /// Write the most common reference lists of a species' occurrences.
    References(ReferenceArgs),
}

#[derive(Args, Debug, PartialEq)]
pub struct FetchArgs {
    /// NAS species ID.
    #[arg(short, long)]
    pub species_id: String,

    /// API key appended to the request.
    #[arg(short = 'k', long, env = "NAS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Maximum number of records; -1 returns every record.
    #[arg(short, long, default_value_t = DEFAULT_LIMIT, allow_negative_numbers = true)]
    pub limit: i64,

    /// Comma-separated columns to keep.
    #[arg(short, long, value_delimiter = ',')]
    pub columns: Option<Vec<String>>,

    /// Keep the API's own column names instead of the normalized schema.
    #[arg(long)]
    pub raw: bool,

    /// Output CSV path (default: species_id<ID>.csv).
    #[arg(short, long, value_name = "FILE")]
    pub output_file: Option<PathBuf>,
}

#[derive(Args, Debug, PartialEq)]
pub struct NormalizeArgs {
    /// Path to the NAS CSV export.
    #[arg(short, long, value_name = "FILE")]
    pub input_file: PathBuf,

    /// Comma-separated normalized columns to keep.
    #[arg(short, long, value_delimiter = ',')]
    pub columns: Option<Vec<String>>,

    /// Output CSV path (default: <input>_normalized.csv).
    #[arg(short, long, value_name = "FILE")]
    pub output_file: Option<PathBuf>,
}

#[derive(Args, Debug, PartialEq)]
pub struct FilterArgs {
    /// Path to the input CSV file.
    #[arg(short, long, value_name = "FILE")]
    pub input_file: PathBuf,

    /// Comma-separated columns to keep.
    #[arg(short, long, value_delimiter = ',', required = true)]
    pub columns: Vec<String>,

    /// Output CSV path (default: <input>_modified.csv).
    #[arg(short, long, value_name = "FILE")]
    pub output_file: Option<PathBuf>,
}

#[derive(Args, Debug, PartialEq)]
pub struct CleanArgs {
    /// Path to the input CSV file. Outputs are written next to it.
    #[arg(short, long, value_name = "FILE")]
    pub input_file: PathBuf,

    /// Comma-separated columns to drop.
    #[arg(long, value_delimiter = ',')]
    pub drop: Vec<String>,

    /// Comma-separated columns to keep.
    #[arg(long, value_delimiter = ',')]
    pub keep: Vec<String>,

    /// Comma-separated columns to split outputs by.
    #[arg(long, value_delimiter = ',')]
    pub split: Vec<String>,

    /// Column rename as OLD=NEW; may be repeated.
    #[arg(long, value_name = "OLD=NEW")]
    pub rename: Vec<String>,

    /// Leave the system:index column untouched.
    #[arg(long)]
    pub no_rename_year: bool,
}

#[derive(Args, Debug, PartialEq)]
pub struct SpeciesArgs {
    /// Binomial name, e.g. "Pterois volitans".
    pub name: String,
}

#[derive(Args, Debug, PartialEq)]
pub struct ReferenceArgs {
    /// NAS species ID.
    #[arg(short, long)]
    pub species_id: String,

    /// API key appended to the request.
    #[arg(short = 'k', long, env = "NAS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Maximum number of records; -1 returns every record.
    #[arg(short, long, default_value_t = -1, allow_negative_numbers = true)]
    pub limit: i64,

    /// Output text path (default: ref_results_<ID>.txt).
    #[arg(short, long, value_name = "FILE")]
    pub output_file: Option<PathBuf>,
}
