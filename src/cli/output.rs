use serde::Serialize;

use crate::model::{Forest, Task, TaskKind, TimerState};
use crate::ops::progress::{self, Progress};
use crate::util::duration::format_clock;
use crate::util::unicode::truncate_to_width;

/// Longest title shown in the tree view, in terminal cells
const TITLE_CELLS: usize = 60;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ProgressJson {
    pub done: usize,
    pub total: usize,
    pub percent: u8,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerJson {
    pub duration_secs: u32,
    pub remaining_secs: u32,
    pub state: TimerState,
    pub clock: String,
    pub elapsed_percent: u8,
}

#[derive(Serialize)]
pub struct TaskJson {
    pub id: String,
    pub title: String,
    pub kind: TaskKind,
    pub completed: bool,
    pub collapsed: bool,
    pub done: bool,
    pub progress: ProgressJson,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer: Option<TimerJson>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TaskJson>,
}

#[derive(Serialize)]
pub struct ForestJson {
    pub progress: ProgressJson,
    pub tasks: Vec<TaskJson>,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn progress_to_json(p: Progress) -> ProgressJson {
    ProgressJson {
        done: p.done,
        total: p.total,
        percent: p.percent(),
    }
}

pub fn task_to_json(task: &Task) -> TaskJson {
    TaskJson {
        id: task.id.to_string(),
        title: task.title.clone(),
        kind: task.kind,
        completed: task.completed,
        collapsed: task.collapsed,
        done: progress::is_effectively_complete(task),
        progress: progress_to_json(progress::compute_progress(task)),
        timer: task.timer.map(|t| TimerJson {
            duration_secs: t.duration_secs,
            remaining_secs: t.remaining_secs,
            state: t.state,
            clock: format_clock(t.remaining_secs),
            elapsed_percent: t.elapsed_percent(),
        }),
        children: task.children.iter().map(|c| task_to_json(c)).collect(),
    }
}

pub fn forest_to_json(forest: &Forest) -> ForestJson {
    ForestJson {
        progress: progress_to_json(progress::forest_progress(forest)),
        tasks: forest.roots().iter().map(|t| task_to_json(t)).collect(),
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

/// IDs are shown by their first eight characters; any unique prefix is
/// accepted back on the command line.
pub fn short_id(task: &Task) -> String {
    task.id.as_str().chars().take(8).collect()
}

fn fold_char(task: &Task) -> char {
    if task.is_leaf() {
        ' '
    } else if task.collapsed {
        '+'
    } else {
        '-'
    }
}

/// One line of the tree view:
/// `{indent}{fold} [x] {title}  {progress}  {timer}  {kind}  #{id}`
pub fn format_task_line(task: &Task, depth: usize) -> String {
    let check = if progress::is_effectively_complete(task) { 'x' } else { ' ' };
    let mut line = format!(
        "{}{} [{}] {}",
        "  ".repeat(depth),
        fold_char(task),
        check,
        truncate_to_width(&task.title, TITLE_CELLS)
    );

    let mut parts = Vec::new();
    if !task.is_leaf() {
        let p = progress::compute_progress(task);
        parts.push(format!("{}/{} ({}%)", p.done, p.total, p.percent()));
    }
    if let Some(timer) = task.timer {
        parts.push(format!(
            "timer {} {}",
            format_clock(timer.remaining_secs),
            timer.state.as_str()
        ));
    }
    if task.kind == TaskKind::Habit {
        parts.push("habit".to_string());
    }
    parts.push(format!("#{}", short_id(task)));

    for part in parts {
        line.push_str("  ");
        line.push_str(&part);
    }
    line
}

/// Tree view of the forest. Children of collapsed tasks are hidden unless
/// `all` is set.
pub fn format_tree(forest: &Forest, all: bool) -> Vec<String> {
    let mut lines = Vec::new();
    for root in forest.roots() {
        format_subtree(root, 0, all, &mut lines);
    }
    lines
}

pub fn format_subtree(task: &Task, depth: usize, all: bool, lines: &mut Vec<String>) {
    lines.push(format_task_line(task, depth));
    if all || !task.collapsed {
        for child in &task.children {
            format_subtree(child, depth + 1, all, lines);
        }
    }
}

/// Footer under the tree view
pub fn format_summary(forest: &Forest) -> String {
    let p = progress::forest_progress(forest);
    format!("{}/{} done ({}%)", p.done, p.total, p.percent())
}

/// Detailed view of one task
pub fn format_task_detail(task: &Task) -> Vec<String> {
    let mut lines = vec![
        format!("id:       {}", task.id),
        format!("title:    {}", task.title),
        format!("kind:     {}", task.kind),
    ];
    let p = progress::compute_progress(task);
    let status = if progress::is_effectively_complete(task) { "done" } else { "open" };
    if task.is_leaf() {
        lines.push(format!("status:   {}", status));
    } else {
        lines.push(format!(
            "status:   {} ({}/{}, {}%)",
            status,
            p.done,
            p.total,
            p.percent()
        ));
    }
    if let Some(timer) = task.timer {
        lines.push(format!(
            "timer:    {} of {} {} ({}% elapsed)",
            format_clock(timer.remaining_secs),
            format_clock(timer.duration_secs),
            timer.state.as_str(),
            timer.elapsed_percent()
        ));
    }
    if !task.is_leaf() {
        lines.push(String::new());
        for child in &task.children {
            format_subtree(child, 0, true, &mut lines);
        }
    }
    lines
}
