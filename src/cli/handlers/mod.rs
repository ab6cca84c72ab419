use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::controller::{AssumeYes, Confirm, Controller, Notifier};
use crate::io::breakdown::{Breakdown, GeminiBreakdown};
use crate::io::config_io;
use crate::io::lock::FileLock;
use crate::io::store::JsonFileStore;
use crate::model::{Config, Forest, Task, TaskId, TaskKind};
use crate::ops::timer_ops::TimerControl;
use crate::ops::tree;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Resolved config and data location for one invocation
struct Context {
    config: Config,
    data_dir: PathBuf,
    json: bool,
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let config_path = cli.config.clone().unwrap_or_else(config_io::config_path);
    let config = config_io::read_config(&config_path)?;
    let data_dir = config_io::data_dir(&config, cli.data_dir.as_deref());
    debug!(config = %config_path.display(), data_dir = %data_dir.display(), "resolved paths");
    let ctx = Context {
        config,
        data_dir,
        json: cli.json,
    };

    match cli.command {
        // Read commands
        Commands::List(args) => cmd_list(&ctx, args),
        Commands::Show(args) => cmd_show(&ctx, args),

        // Write commands
        Commands::Add(args) => cmd_add(&ctx, args),
        Commands::Edit(args) => cmd_edit(&ctx, args),
        Commands::Toggle(args) => cmd_toggle(&ctx, args),
        Commands::Collapse(args) => cmd_collapse(&ctx, args),
        Commands::Delete(args) => cmd_delete(&ctx, args),
        Commands::Mv(args) => cmd_mv(&ctx, args),
        Commands::Timer(args) => cmd_timer(&ctx, args.action),
        Commands::ExpandAll => mutate(&ctx, |c| Ok(c.expand_all()?)).map(report),
        Commands::CollapseAll => mutate(&ctx, |c| Ok(c.collapse_all()?)).map(report),
        Commands::ClearCompleted(args) => {
            let confirm = confirmer(args.yes);
            mutate(&ctx, |c| Ok(c.clear_completed(confirm.as_ref())?)).map(report)
        }
        Commands::Reset(args) => {
            let confirm = confirmer(args.yes);
            mutate(&ctx, |c| Ok(c.reset_to_sample(confirm.as_ref())?)).map(report)
        }

        // Timers and the breakdown service
        Commands::Breakdown(args) => cmd_breakdown(&ctx, args),
        Commands::Run(args) => cmd_run(&ctx, args),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn open(ctx: &Context) -> Controller<JsonFileStore> {
    Controller::open(JsonFileStore::new(&ctx.data_dir), ctx.config.storage.key.clone())
}

/// Run one load → mutate → save cycle under the data directory lock
fn mutate<T>(
    ctx: &Context,
    f: impl FnOnce(&mut Controller<JsonFileStore>) -> Result<T, Box<dyn std::error::Error>>,
) -> Result<T, Box<dyn std::error::Error>> {
    let _lock = FileLock::acquire_default(&ctx.data_dir)?;
    let mut controller = open(ctx);
    f(&mut controller)
}

fn report(changed: bool) {
    if !changed {
        println!("nothing changed");
    }
}

/// Resolve a full ID or a unique prefix of one. Unknown IDs are passed
/// through unchanged so the operation becomes a no-op.
fn resolve_id(forest: &Forest, input: &str) -> Result<TaskId, String> {
    let all = tree::ids(forest);
    if all.iter().any(|id| id.as_str() == input) {
        return Ok(TaskId::from(input));
    }
    let matches: Vec<&TaskId> = all.iter().filter(|id| id.as_str().starts_with(input)).collect();
    match matches.as_slice() {
        [only] => Ok((*only).clone()),
        [] => Ok(TaskId::from(input)),
        _ => Err(format!(
            "ambiguous task ID '{}' matches {} tasks",
            input,
            matches.len()
        )),
    }
}

fn print_line(controller: &Controller<JsonFileStore>, id: &TaskId) {
    if let Some(task) = controller.find(id) {
        println!("{}", format_task_line(task, 0));
    }
}

/// Asks on stderr, reads the answer from stdin
struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, question: &str) -> bool {
        eprint!("{} [y/N] ", question);
        let _ = std::io::stderr().flush();
        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

fn confirmer(yes: bool) -> Box<dyn Confirm> {
    if yes {
        Box::new(AssumeYes)
    } else {
        Box::new(StdinConfirm)
    }
}

/// Announces finished timers, ringing the bell if configured
struct TerminalNotifier {
    bell: bool,
}

impl Notifier for TerminalNotifier {
    fn timer_finished(&self, task: &Task) {
        if self.bell {
            print!("\x07");
        }
        println!("timer finished: {} #{}", task.title, short_id(task));
    }
}

fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_list(ctx: &Context, args: ListArgs) -> CmdResult {
    let controller = open(ctx);
    let forest = controller.forest();
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&forest_to_json(forest))?);
        return Ok(());
    }
    if forest.is_empty() {
        println!("no tasks");
        return Ok(());
    }
    for line in format_tree(forest, args.all) {
        println!("{}", line);
    }
    println!();
    println!("{}", format_summary(forest));
    Ok(())
}

fn cmd_show(ctx: &Context, args: IdArg) -> CmdResult {
    let controller = open(ctx);
    let id = resolve_id(controller.forest(), &args.id)?;
    let task = controller
        .find(&id)
        .ok_or_else(|| format!("task not found: {}", args.id))?;
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&task_to_json(task))?);
    } else {
        let mut lines = format_task_detail(task);
        if let Some(path) = tree::ancestors(controller.forest(), &id).filter(|p| !p.is_empty()) {
            let titles: Vec<&str> = path
                .iter()
                .filter_map(|a| controller.find(a).map(|t| t.title.as_str()))
                .collect();
            lines.insert(1, format!("path:     {}", titles.join(" > ")));
        }
        for line in lines {
            println!("{}", line);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

fn cmd_add(ctx: &Context, args: AddArgs) -> CmdResult {
    let kind = if args.habit { TaskKind::Habit } else { TaskKind::Todo };
    let id = mutate(ctx, |c| match &args.parent {
        Some(parent) => {
            let parent = resolve_id(c.forest(), parent)?;
            Ok(c.add_child(&parent, &args.title, kind)?)
        }
        None => Ok(Some(c.add_root(&args.title, kind)?)),
    })?;
    match id {
        Some(id) => println!("{}", id),
        None => println!("parent not found; nothing added"),
    }
    Ok(())
}

fn cmd_edit(ctx: &Context, args: EditArgs) -> CmdResult {
    mutate(ctx, |c| {
        let id = resolve_id(c.forest(), &args.id)?;
        let Some(kind) = args.kind.or_else(|| c.find(&id).map(|t| t.kind)) else {
            report(false);
            return Ok(());
        };
        report(c.edit(&id, &args.title, kind)?);
        print_line(c, &id);
        Ok(())
    })
}

fn cmd_toggle(ctx: &Context, args: ToggleArgs) -> CmdResult {
    let value = match (args.done, args.undone) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    };
    mutate(ctx, |c| {
        let id = resolve_id(c.forest(), &args.id)?;
        report(c.toggle_complete(&id, value)?);
        print_line(c, &id);
        Ok(())
    })
}

fn cmd_collapse(ctx: &Context, args: IdArg) -> CmdResult {
    mutate(ctx, |c| {
        let id = resolve_id(c.forest(), &args.id)?;
        report(c.toggle_collapse(&id)?);
        print_line(c, &id);
        Ok(())
    })
}

fn cmd_delete(ctx: &Context, args: ConfirmIdArgs) -> CmdResult {
    let confirm = confirmer(args.yes);
    mutate(ctx, |c| {
        let id = resolve_id(c.forest(), &args.id)?;
        if c.delete(&id, confirm.as_ref())? {
            println!("deleted {}", args.id);
        } else {
            report(false);
        }
        Ok(())
    })
}

fn cmd_mv(ctx: &Context, args: MvArgs) -> CmdResult {
    mutate(ctx, |c| {
        let dragged = resolve_id(c.forest(), &args.id)?;
        let target = resolve_id(c.forest(), &args.target)?;
        report(c.relocate(&dragged, &target, args.position)?);
        Ok(())
    })
}

fn cmd_timer(ctx: &Context, action: TimerAction) -> CmdResult {
    mutate(ctx, |c| {
        let (id, changed) = match action {
            TimerAction::Set { id, duration } => {
                let id = resolve_id(c.forest(), &id)?;
                let changed = c.set_timer(&id, duration)?;
                (id, changed)
            }
            TimerAction::Start { id } => control(c, &id, TimerControl::Start)?,
            TimerAction::Pause { id } => control(c, &id, TimerControl::Pause)?,
            TimerAction::Reset { id } => control(c, &id, TimerControl::Reset)?,
            TimerAction::Extend { id } => control(c, &id, TimerControl::Extend)?,
        };
        report(changed);
        print_line(c, &id);
        Ok(())
    })
}

fn control(
    c: &mut Controller<JsonFileStore>,
    input: &str,
    control: TimerControl,
) -> Result<(TaskId, bool), Box<dyn std::error::Error>> {
    let id = resolve_id(c.forest(), input)?;
    let changed = c.control_timer(&id, control)?;
    Ok((id, changed))
}

// ---------------------------------------------------------------------------
// Breakdown and the tick loop
// ---------------------------------------------------------------------------

fn cmd_breakdown(ctx: &Context, args: BreakdownArgs) -> CmdResult {
    let service = GeminiBreakdown::from_config(&ctx.config.breakdown);
    // No lock while waiting on the network; the parent is looked up again
    // once the proposals arrive.
    let proposals = runtime()?.block_on(service.breakdown(&args.prompt))?;
    if proposals.is_empty() {
        println!("no tasks proposed");
        return Ok(());
    }

    let added = mutate(ctx, |c| {
        let parent = match &args.parent {
            Some(p) => Some(resolve_id(c.forest(), p)?),
            None => None,
        };
        let added = c.adopt_breakdown(parent.as_ref(), proposals)?;
        for id in &added {
            if let Some(task) = c.find(id) {
                let mut lines = Vec::new();
                format_subtree(task, 0, true, &mut lines);
                for line in lines {
                    println!("{}", line);
                }
            }
        }
        Ok(added)
    })?;
    if added.is_empty() {
        println!("parent not found; nothing added");
    }
    Ok(())
}

fn cmd_run(ctx: &Context, args: RunArgs) -> CmdResult {
    let notifier = TerminalNotifier {
        bell: ctx.config.notify.bell,
    };
    if !open(ctx).has_running_timers() {
        println!("no timers running");
        return Ok(());
    }

    runtime()?.block_on(tick_loop(ctx, args.ticks, &notifier))
}

async fn tick_loop(ctx: &Context, max_ticks: Option<u64>, notifier: &dyn Notifier) -> CmdResult {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    interval.tick().await;
    let mut ticks = 0u64;
    loop {
        interval.tick().await;
        // Reload every tick so edits made by other tt commands are kept
        let running = mutate(ctx, |c| {
            c.tick(notifier)?;
            Ok(c.has_running_timers())
        })?;
        ticks += 1;
        if !running || max_ticks.is_some_and(|max| ticks >= max) {
            return Ok(());
        }
    }
}
