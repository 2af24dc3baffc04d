use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Clone, ValueEnum)]
pub enum StoreKind {
    Json,
    Sqlite,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Bucket {
    New,
    Learning,
    Review,
    Due,
}

#[derive(Debug, Parser, Clone)]
#[command(name = "wordpace", version, about = "WordPace spaced-repetition CLI/API")]
pub struct Cli {
    /// Storage backend (applies to CLI/API unless overridden)
    #[arg(long, value_enum, default_value_t = StoreKind::Json)]
    pub store: StoreKind,

    /// SQLite DB path when --store sqlite (defaults to app data dir)
    #[arg(long)]
    pub db_path: Option<PathBuf>,

    /// Learner id; omitted means the local single-user profile
    #[arg(long)]
    pub user: Option<Uuid>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Card operations (CLI)
    #[command(subcommand)]
    Card(CardCmd),
    /// Review loop (CLI)
    Review(ReviewCmd),
    /// Today's queue counts
    Queue(QueueCmd),
    /// Review totals, accuracy, and streak
    Stats,
    /// Export scheduling state (CLI)
    #[command(subcommand)]
    Export(ExportCmd),
    /// Import scheduling state (CLI)
    #[command(subcommand)]
    Import(ImportCmd),
    /// Launch Axum HTTP API
    Api(ApiCmd),
}

#[derive(Debug, Subcommand, Clone)]
pub enum CardCmd {
    Add(CardAdd),
    List {
        #[arg(long, value_enum)]
        bucket: Option<Bucket>,
    },
    Rm {
        card_id: String,
    },
    Suspend {
        card_id: String,
    },
    Unsuspend {
        card_id: String,
    },
}

#[derive(Debug, Args, Clone)]
pub struct CardAdd {
    /// Catalog id of the vocabulary item to start studying
    #[arg(long)]
    pub vocab: Uuid,
}

#[derive(Debug, Args, Clone)]
pub struct ReviewCmd {
    /// Pull unseen cards into the session as well
    #[arg(long)]
    pub include_new: bool,
    /// Cap on unseen cards per session
    #[arg(long, default_value_t = 20)]
    pub new_limit: usize,
    #[arg(long, default_value_t = 50)]
    pub max: usize,
}

#[derive(Debug, Args, Clone)]
pub struct QueueCmd {
    #[arg(long, default_value_t = 20)]
    pub new_limit: usize,
}

#[derive(Debug, Subcommand, Clone)]
pub enum ExportCmd {
    Json { path: PathBuf },
    Csv { path: PathBuf },
}

#[derive(Debug, Subcommand, Clone)]
pub enum ImportCmd {
    Json { path: PathBuf },
    Csv { path: PathBuf },
}

#[derive(Debug, Args, Clone)]
pub struct ApiCmd {
    /// Bind address (host:port)
    #[arg(long, default_value = "127.0.0.1:8080")]
    pub addr: String,
}
