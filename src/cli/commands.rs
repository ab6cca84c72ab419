use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::model::TaskKind;
use crate::ops::relocate::DropPosition;
use crate::util::duration::parse_duration;

#[derive(Parser)]
#[command(name = "tt", about = concat!("tasktree v", env!("CARGO_PKG_VERSION"), " - nested todos, habits and timers"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Directory holding the task file (overrides config)
    #[arg(long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Config file (default: $XDG_CONFIG_HOME/tasktree/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the task tree
    List(ListArgs),
    /// Show one task and its subtree
    Show(IdArg),
    /// Add a task at root level, or under --parent
    Add(AddArgs),
    /// Change a task's title and optionally its kind
    Edit(EditArgs),
    /// Toggle completion for a task and everything under it
    Toggle(ToggleArgs),
    /// Fold or unfold a task's children
    Collapse(IdArg),
    /// Delete a task and its subtasks
    Delete(ConfirmIdArgs),
    /// Move a task before, after or into another
    Mv(MvArgs),
    /// Set and control countdown timers
    Timer(TimerCmd),
    /// Unfold every task
    ExpandAll,
    /// Fold every task
    CollapseAll,
    /// Remove every completed task
    ClearCompleted(YesArgs),
    /// Replace all tasks with the sample tasks
    Reset(YesArgs),
    /// Ask the breakdown service to split a goal into tasks
    Breakdown(BreakdownArgs),
    /// Count down running timers in the foreground
    Run(RunArgs),
}

// ---------------------------------------------------------------------------
// Shared args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct IdArg {
    /// Task ID (a unique prefix is enough)
    pub id: String,
}

#[derive(Args)]
pub struct YesArgs {
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args)]
pub struct ConfirmIdArgs {
    /// Task ID (a unique prefix is enough)
    pub id: String,
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

// ---------------------------------------------------------------------------
// Command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ListArgs {
    /// Also show the children of collapsed tasks
    #[arg(long)]
    pub all: bool,
}

#[derive(Args)]
pub struct AddArgs {
    /// Task title
    pub title: String,
    /// Add as a habit rather than a todo
    #[arg(long)]
    pub habit: bool,
    /// Parent task ID
    #[arg(long)]
    pub parent: Option<String>,
}

#[derive(Args)]
pub struct EditArgs {
    /// Task ID
    pub id: String,
    /// New title
    pub title: String,
    /// New kind (todo, habit); unchanged if omitted
    #[arg(long)]
    pub kind: Option<TaskKind>,
}

#[derive(Args)]
pub struct ToggleArgs {
    /// Task ID
    pub id: String,
    /// Mark done instead of toggling
    #[arg(long, conflicts_with = "undone")]
    pub done: bool,
    /// Mark not done instead of toggling
    #[arg(long)]
    pub undone: bool,
}

#[derive(Args)]
pub struct MvArgs {
    /// Task to move
    pub id: String,
    /// Where to drop it: before, after or into
    pub position: DropPosition,
    /// Task to drop it on
    pub target: String,
}

#[derive(Args)]
pub struct TimerCmd {
    #[command(subcommand)]
    pub action: TimerAction,
}

#[derive(Subcommand)]
pub enum TimerAction {
    /// Set (or replace) a timer: 25 (minutes), 90s, 25m, 1h30m, 12:30
    Set {
        id: String,
        #[arg(value_parser = parse_duration)]
        duration: u32,
    },
    /// Start or resume a timer
    Start { id: String },
    /// Pause a running timer
    Pause { id: String },
    /// Remove a timer
    Reset { id: String },
    /// Add five minutes and keep running
    Extend { id: String },
}

#[derive(Args)]
pub struct BreakdownArgs {
    /// The goal to break down
    pub prompt: String,
    /// Add the proposed tasks under this task instead of at root level
    #[arg(long)]
    pub parent: Option<String>,
}

#[derive(Args)]
pub struct RunArgs {
    /// Stop after this many ticks
    #[arg(long)]
    pub ticks: Option<u64>,
}
