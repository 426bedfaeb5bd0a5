use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::ops::MovePosition;

#[derive(Parser)]
#[command(name = "td", about = concat!("td v", env!("CARGO_PKG_VERSION"), " - a yearly markdown TODO list with a weekly archive"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different workspace directory
    #[arg(short = 'C', long = "dir", global = true)]
    pub dir: Option<String>,

    /// Whose documents to use (default: the shared demo documents)
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Document year (default: the current year)
    #[arg(long, global = true)]
    pub year: Option<i32>,

    /// Pretend today is this date (YYYY-MM-DD)
    #[arg(long, global = true)]
    pub today: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create todo.toml and this year's document in the current directory
    Init,
    /// List the years that have a document
    Years,
    /// Show the pool and week blocks
    Show(ShowArgs),
    /// List week blocks
    Weeks,
    /// Flip a task between pending and completed
    Toggle(LineArgs),
    /// Add a task to a category (or to a week block with --week)
    Add(AddArgs),
    /// Add a subtask under a task
    Sub(SubArgs),
    /// Delete a task and everything under it
    Rm(LineArgs),
    /// Change a task's text
    Edit(EditArgs),
    /// Move a task and its subtasks next to another task
    Mv(MvArgs),
    /// Category management
    Project(ProjectCmd),
    /// Week block management
    Week(WeekCmd),
    /// Archive completed pool tasks into this week's block
    Settle,
    /// Overwrite the whole document with a file (or - for stdin)
    Replace(ReplaceArgs),
    /// Start a new year's document from an old year's pending pool
    Migrate(MigrateArgs),
    /// View or prune the journal of removed and unsaved content
    Journal(JournalCmd),
}

// ---------------------------------------------------------------------------
// Read command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ShowArgs {
    /// Print the document text instead of the tree
    #[arg(long)]
    pub raw: bool,
}

// ---------------------------------------------------------------------------
// Edit command args
// ---------------------------------------------------------------------------

/// Lines are addressed by their 0-based index, as printed by `td show`
#[derive(Args)]
pub struct LineArgs {
    /// Task line index
    pub line: usize,
}

#[derive(Args)]
pub struct AddArgs {
    /// Category name and task text (only the text with --week)
    #[arg(required = true, num_args = 1..=2, value_names = ["PROJECT", "TEXT"])]
    pub args: Vec<String>,
    /// Add to the week block whose header is on this line
    #[arg(long, value_name = "LINE")]
    pub week: Option<usize>,
}

#[derive(Args)]
pub struct SubArgs {
    /// Parent task line index
    pub parent: usize,
    /// Subtask text
    pub text: String,
}

#[derive(Args)]
pub struct EditArgs {
    /// Task line index
    pub line: usize,
    /// New task text
    pub text: String,
}

#[derive(Clone, Copy, Default, ValueEnum)]
pub enum PositionArg {
    #[default]
    Before,
    After,
    Inside,
}

impl From<PositionArg> for MovePosition {
    fn from(arg: PositionArg) -> Self {
        match arg {
            PositionArg::Before => MovePosition::Before,
            PositionArg::After => MovePosition::After,
            PositionArg::Inside => MovePosition::Inside,
        }
    }
}

#[derive(Args)]
pub struct MvArgs {
    /// Line of the task to move
    pub from: usize,
    /// Line of the destination task
    pub to: usize,
    /// Where to put it relative to the destination
    #[arg(long, value_enum, default_value_t = PositionArg::Before)]
    pub position: PositionArg,
}

// ---------------------------------------------------------------------------
// Structure management
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ProjectCmd {
    #[command(subcommand)]
    pub action: ProjectAction,
}

#[derive(Subcommand)]
pub enum ProjectAction {
    /// Add an empty category to the pool
    Add(ProjectAddArgs),
    /// List pool categories
    List,
}

#[derive(Args)]
pub struct ProjectAddArgs {
    /// Category name
    pub name: String,
}

#[derive(Args)]
pub struct WeekCmd {
    #[command(subcommand)]
    pub action: WeekAction,
}

#[derive(Subcommand)]
pub enum WeekAction {
    /// Add an empty week block as the newest week
    Add(WeekAddArgs),
}

#[derive(Args)]
pub struct WeekAddArgs {
    /// Week title, e.g. "10月12日 - 10月18日"
    pub title: String,
}

// ---------------------------------------------------------------------------
// Whole-document commands
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ReplaceArgs {
    /// File holding the new document, or - to read stdin
    pub file: String,
}

#[derive(Args)]
pub struct MigrateArgs {
    /// Year to carry the pool over from
    #[arg(long)]
    pub from: i32,
    /// Year to create
    #[arg(long)]
    pub to: i32,
}

// ---------------------------------------------------------------------------
// Journal
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct JournalCmd {
    #[command(subcommand)]
    pub action: Option<JournalAction>,
    /// Maximum number of entries to show (default: 10)
    #[arg(long)]
    pub limit: Option<usize>,
    /// Show entries after this timestamp (RFC 3339)
    #[arg(long)]
    pub since: Option<String>,
}

#[derive(Subcommand)]
pub enum JournalAction {
    /// Remove old entries
    Prune(JournalPruneArgs),
    /// Print the path to the journal
    Path,
}

#[derive(Args)]
pub struct JournalPruneArgs {
    /// Remove entries older than this timestamp (default: prune_days ago)
    #[arg(long)]
    pub before: Option<String>,
    /// Remove all entries
    #[arg(long)]
    pub all: bool,
}
