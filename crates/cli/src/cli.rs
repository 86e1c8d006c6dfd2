use std::path::PathBuf;

use clap::{ArgGroup, Parser};

/// Pairwise closeness analysis of a group chat.
///
/// Reads a chat from a QQ NT message database or a JSON export, scores every
/// pair of participants and writes the ranked table as CSV.
#[derive(Parser, Debug)]
#[command(name = "rapport", about = "Pairwise closeness analysis of group chats")]
#[command(group(ArgGroup::new("source").required(true).args(["events", "db"])))]
pub struct CliArgs {
    /// JSON array or JSON-lines export of chat messages
    #[arg(long)]
    pub events: Option<PathBuf>,

    /// QQ NT message database (decrypted SQLite file)
    #[arg(long, requires = "group")]
    pub db: Option<PathBuf>,

    /// Group number to read from --db
    #[arg(long)]
    pub group: Option<String>,

    /// JSON object mapping sender ids to display names
    #[arg(long)]
    pub usermap: Option<PathBuf>,

    /// Only score pairs containing this sender id
    #[arg(long = "focus-user")]
    pub focus_user: Option<String>,

    /// First day to analyse, YYYY/MM/DD or YYYY-MM-DD
    #[arg(long)]
    pub start: Option<String>,

    /// Last day to analyse (inclusive), YYYY/MM/DD or YYYY-MM-DD
    #[arg(long)]
    pub end: Option<String>,

    /// Worker threads for pair evaluation (0 = all cores; overrides RAPPORT_WORKER_THREADS)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Feature scaling: relative (within this run) or absolute (fixed scales)
    #[arg(long)]
    pub normalization: Option<String>,

    /// Pairs shown in the console summary
    #[arg(long = "top-n", default_value = "30")]
    pub top_n: usize,

    /// CSV output path (default: closeness_<group or file name>.csv)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

impl CliArgs {
    /// Name used in the default output file.
    pub fn label(&self) -> String {
        if let Some(group) = &self.group {
            if self.db.is_some() {
                return group.trim().to_string();
            }
        }
        self.events
            .as_deref()
            .and_then(|p| p.file_stem())
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "chat".to_string())
    }

    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("closeness_{}.csv", self.label())))
    }
}
