use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "gp", about = concat!("[#] gridplan v", env!("CARGO_PKG_VERSION"), " - plans on a grid"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Use a different settings file
    #[arg(long, global = true, value_name = "PATH")]
    pub settings: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new, empty plan file
    New(NewArgs),
    /// Show the cards of a plan
    Show(ShowArgs),
    /// List the boards of a plan
    Boards(PlanArg),
    /// Add a card
    Add(AddArgs),
    /// Mark a card complete (or incomplete with --undo)
    Check(CheckArgs),
    /// Delete cards
    Rm(RmArgs),
    /// Move a card to a grid cell
    Mv(MvArgs),
    /// List recently opened plans
    Recent,
}

#[derive(Args)]
pub struct PlanArg {
    /// Plan file
    pub plan: PathBuf,
}

#[derive(Args)]
pub struct NewArgs {
    /// Plan file to create
    pub plan: PathBuf,
    /// Board names, in order (default: a single "Board 1")
    #[arg(long = "board", value_name = "NAME")]
    pub boards: Vec<String>,
    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Plan file
    pub plan: PathBuf,
    /// Only this board (index from `gp boards`)
    #[arg(long)]
    pub board: Option<usize>,
}

#[derive(Args)]
pub struct AddArgs {
    /// Plan file
    pub plan: PathBuf,
    /// Card kind: checkbox, numbered, note, image, sound, timer, map
    pub kind: String,
    /// Text for text cards, file path for image and sound cards, name for timers
    pub text: Option<String>,
    /// Board to add to (default: the plan's active board)
    #[arg(long)]
    pub board: Option<usize>,
    /// Grid cell for the card's top-left corner
    #[arg(long, num_args = 2, value_names = ["COL", "ROW"], allow_negative_numbers = true)]
    pub at: Option<Vec<i32>>,
}

#[derive(Args)]
pub struct CheckArgs {
    /// Plan file
    pub plan: PathBuf,
    /// Card ID
    pub id: u32,
    /// Mark incomplete instead
    #[arg(long)]
    pub undo: bool,
}

#[derive(Args)]
pub struct RmArgs {
    /// Plan file
    pub plan: PathBuf,
    /// Card IDs
    #[arg(required = true)]
    pub ids: Vec<u32>,
}

#[derive(Args)]
pub struct MvArgs {
    /// Plan file
    pub plan: PathBuf,
    /// Card ID
    pub id: u32,
    /// Target column
    #[arg(allow_negative_numbers = true)]
    pub col: i32,
    /// Target row
    #[arg(allow_negative_numbers = true)]
    pub row: i32,
}
