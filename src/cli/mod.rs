pub mod prompt;

use crate::report::catalog::ReportSelector;
use crate::report::span::SpanPreset;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "hamster-briefs",
    about = "Hamster time tracker reports and Tempo worklog uploads"
)]
pub struct Cli {
    /// Log debug detail to stderr.
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print time reports from the Hamster database.
    Report(ReportArgs),
    /// Convert aggregate report lines into a JSON batch on stdout.
    Read {
        /// File of aggregate lines, or `-` for stdin.
        file: PathBuf,
        /// Lines carry a fact id column before the tags.
        #[arg(long, default_value_t = false)]
        with_fact_ids: bool,
    },
    /// Resolve a JSON batch against Jira and post it to Tempo.
    Upload(UploadArgs),
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    Doctor,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[arg(short, long, value_name = "BEG_DATE")]
    pub begin: Option<String>,
    #[arg(short, long, value_name = "END_DATE")]
    pub end: Option<String>,
    #[arg(short, long = "category", value_name = "CATEGORY")]
    pub categories: Vec<String>,
    #[arg(short, long = "activity", value_name = "ACTIVITY")]
    pub activities: Vec<String>,
    #[arg(short, long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,
    /// Require both an activity and a tag match instead of either.
    #[arg(short = 'X', long = "and", default_value_t = false)]
    pub match_all: bool,
    #[arg(short = 'p', long = "span", value_enum)]
    pub preset: Option<SpanPreset>,
    #[arg(short = 'r', long = "report-types", value_enum, value_name = "REPORT_TYPE")]
    pub report_types: Vec<ReportSelector>,
    /// Daily activity report for the current or just-finished week.
    #[arg(short = 'l', long, default_value_t = false)]
    pub quick_list: bool,
    /// Append the daily activity+tag aggregate consumed by `read`.
    #[arg(short = 'E', long = "eggregate", default_value_t = false)]
    pub aggregate: bool,
    #[arg(long, default_value_t = false)]
    pub with_fact_ids: bool,
    #[arg(short, long, default_value_t = false)]
    pub split_days: bool,
    /// First day of the week: 0-6 (0 = Sunday) or a day name.
    #[arg(short = 'w', long = "day-week-starts", value_name = "DAY")]
    pub week_starts: Option<String>,
    #[arg(short = 'W', long, allow_negative_numbers = true)]
    pub first_sprint_week_num: Option<i64>,
    #[arg(short = 'D', long = "data", value_name = "HAMSTER_DB_PATH")]
    pub hamster_db_path: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct UploadArgs {
    pub file: PathBuf,
    #[arg(short = 'T', long = "tempo-url")]
    pub tempo_url: Option<String>,
    #[arg(short, long)]
    pub user: Option<String>,
    #[arg(short, long)]
    pub password: Option<String>,
    /// Resolve everything and write the batch out without posting.
    #[arg(long = "test", default_value_t = false)]
    pub test_mode: bool,
    /// Joins descriptions into the worklog comment; `\n` is honored.
    #[arg(short, long)]
    pub delimiter: Option<String>,
    /// Skip the confirmation prompt for large batches.
    #[arg(short, long, default_value_t = false)]
    pub yes: bool,
    #[arg(long, default_value_t = false)]
    pub reopen_closed: bool,
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    Set { key: String, value: String },
    Get { key: String },
}
