//! mdtask command implementations.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::markdown::DATE_TIME_FORMAT;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::repository::TaskRepository;
use crate::service::{CreateTaskParams, TaskService, TaskStats, UpdateTaskParams};
use crate::tags::{self, DATE_FORMAT, REMINDER_FORMAT};
use crate::task::{Status, Task};

/// Flags shared by every command
pub struct ContextOptions {
    pub paths: Vec<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

impl ContextOptions {
    fn output(&self) -> OutputOptions {
        OutputOptions {
            json: self.json,
            quiet: self.quiet,
        }
    }
}

pub struct NewOptions {
    pub title: String,
    pub description: String,
    pub content: String,
    pub tags: Vec<String>,
    pub status: Option<String>,
    pub deadline: Option<String>,
    pub reminder: Option<String>,
    pub parent: Option<String>,
    pub context: ContextOptions,
}

pub struct ListOptions {
    pub status: Option<String>,
    pub archived: bool,
    pub all: bool,
    pub parent: Option<String>,
    pub context: ContextOptions,
}

pub struct GetOptions {
    pub id: String,
    pub context: ContextOptions,
}

pub struct SearchOptions {
    pub query: Option<String>,
    pub tags: Vec<String>,
    pub exclude: Vec<String>,
    pub or: bool,
    pub archived: bool,
    pub context: ContextOptions,
}

pub struct EditOptions {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub tags: Option<Vec<String>>,
    pub content: Option<String>,
    pub deadline: Option<String>,
    pub clear_deadline: bool,
    pub reminder: Option<String>,
    pub clear_reminder: bool,
    pub wait_for: Option<String>,
    pub context: ContextOptions,
}

pub struct ArchiveOptions {
    pub id: String,
    pub context: ContextOptions,
}

/// Serialized view of a task
#[derive(Debug, Serialize)]
struct TaskView {
    id: String,
    title: String,
    description: String,
    status: Status,
    archived: bool,
    tags: Vec<String>,
    user_tags: Vec<String>,
    aliases: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    deadline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reminder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    wait_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent: Option<String>,
    created: String,
    updated: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
}

impl From<&Task> for TaskView {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status(),
            archived: task.is_archived(),
            tags: task.tags(),
            user_tags: task.user_tags().to_vec(),
            aliases: task.aliases.clone(),
            deadline: task
                .deadline()
                .map(|date| date.format(DATE_FORMAT).to_string()),
            reminder: task
                .reminder()
                .map(|at| at.format(REMINDER_FORMAT).to_string()),
            wait_reason: task.wait_reason().map(str::to_string),
            parent: task.parent_id().map(str::to_string),
            created: task.created.format(DATE_TIME_FORMAT).to_string(),
            updated: task.updated.format(DATE_TIME_FORMAT).to_string(),
            content: task.content.clone(),
            path: None,
        }
    }
}

impl TaskView {
    fn with_path(mut self, path: &Path) -> Self {
        self.path = Some(path.display().to_string());
        self
    }
}

#[derive(Debug, Serialize)]
struct TaskListOutput {
    total: usize,
    tasks: Vec<TaskView>,
}

#[derive(Debug, Serialize)]
struct TaskDetailOutput {
    task: TaskView,
    subtasks: Vec<TaskView>,
}

pub fn run_new(options: NewOptions) -> Result<()> {
    let service = load_service(&options.context)?;
    let params = CreateTaskParams {
        title: options.title,
        description: options.description,
        content: options.content,
        tags: non_empty_tags(options.tags),
        status: options.status,
        deadline: parse_date_arg("deadline", options.deadline.as_deref())?,
        reminder: parse_reminder_arg(options.reminder.as_deref())?,
        parent_id: options.parent,
    };
    let (task, path) = service.create_task(params)?;

    let mut human = HumanOutput::new("Task created");
    human.push_summary("ID", task.id.clone());
    human.push_summary("Title", task.title.clone());
    human.push_summary("Status", task.status().to_string());
    human.push_summary("File", path.display().to_string());
    if let Some(parent) = task.parent_id() {
        human.push_summary("Parent", parent);
    }
    for warning in schedule_warnings(&task, Local::now().naive_local()) {
        human.push_warning(warning);
    }

    let output = TaskView::from(&task).with_path(&path);
    emit_success(options.context.output(), "new", &output, Some(&human))
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let service = load_service(&options.context)?;
    let status = options
        .status
        .as_deref()
        .map(str::parse::<Status>)
        .transpose()?;

    let mut tasks = match status {
        Some(status) => service.repository().find_by_status(status)?,
        None => service.repository().find_all()?,
    };
    if !options.all {
        tasks.retain(|task| task.is_archived() == options.archived);
    }
    if let Some(parent) = options.parent.as_deref() {
        tasks.retain(|task| task.parent_id() == Some(parent));
    }

    let mut human = HumanOutput::new("Tasks");
    human.push_summary("Total", tasks.len().to_string());
    push_task_lines(&mut human, &tasks);

    emit_success(
        options.context.output(),
        "list",
        &list_output(&tasks),
        Some(&human),
    )
}

pub fn run_get(options: GetOptions) -> Result<()> {
    let service = load_service(&options.context)?;
    let (_, path) = service.repository().find_by_id_with_path(&options.id)?;
    let (task, subtasks) = service.task_with_subtasks(&options.id)?;

    let mut human = HumanOutput::new(format!("{} {}", task.id, task.title));
    human.push_summary("Status", task.status().to_string());
    if task.is_archived() {
        human.push_summary("Archived", "");
    }
    if !task.description.is_empty() {
        human.push_summary("Description", task.description.clone());
    }
    if !task.user_tags().is_empty() {
        human.push_summary("Tags", task.user_tags().join(", "));
    }
    if let Some(deadline) = task.deadline() {
        human.push_summary("Deadline", deadline.format(DATE_FORMAT).to_string());
    }
    if let Some(reminder) = task.reminder() {
        human.push_summary("Reminder", reminder.format(DATE_TIME_FORMAT).to_string());
    }
    if let Some(reason) = task.wait_reason() {
        human.push_summary("Waiting for", reason);
    }
    if let Some(parent) = task.parent_id() {
        human.push_summary("Parent", parent);
    }
    human.push_summary("File", path.display().to_string());
    push_task_lines(&mut human, &subtasks);

    let output = TaskDetailOutput {
        task: TaskView::from(&task).with_path(&path),
        subtasks: subtasks.iter().map(TaskView::from).collect(),
    };
    emit_success(options.context.output(), "get", &output, Some(&human))
}

pub fn run_search(options: SearchOptions) -> Result<()> {
    let service = load_service(&options.context)?;
    let repo = service.repository();
    let include = non_empty_tags(options.tags);
    let exclude = non_empty_tags(options.exclude);
    let query = options.query.filter(|query| !query.trim().is_empty());

    let tasks = if !include.is_empty() || !exclude.is_empty() {
        let mut tasks = repo.search_by_tags(&include, &exclude, options.or)?;
        if let Some(query) = query.as_deref() {
            tasks.retain(|task| task.matches_query(query));
        }
        tasks
    } else if let Some(query) = query.as_deref() {
        let mut tasks = repo.search(query)?;
        if !options.archived {
            tasks.retain(|task| !task.is_archived());
        }
        tasks
    } else {
        return Err(Error::InvalidInput(
            "search needs a query or --tags/--exclude".to_string(),
        ));
    };

    let mut human = HumanOutput::new("Search results");
    human.push_summary("Total", tasks.len().to_string());
    push_task_lines(&mut human, &tasks);

    emit_success(
        options.context.output(),
        "search",
        &list_output(&tasks),
        Some(&human),
    )
}

pub fn run_edit(options: EditOptions) -> Result<()> {
    let service = load_service(&options.context)?;
    let params = UpdateTaskParams {
        title: options.title,
        description: options.description,
        status: options.status,
        tags: options.tags.map(non_empty_tags),
        content: options.content,
        deadline: parse_date_arg("deadline", options.deadline.as_deref())?,
        clear_deadline: options.clear_deadline,
        reminder: parse_reminder_arg(options.reminder.as_deref())?,
        clear_reminder: options.clear_reminder,
        wait_reason: options.wait_for,
    };
    let task = service.update_task(&options.id, params)?;

    let mut human = HumanOutput::new("Task updated");
    human.push_summary("ID", task.id.clone());
    human.push_summary("Title", task.title.clone());
    human.push_summary("Status", task.status().to_string());

    emit_success(
        options.context.output(),
        "edit",
        &TaskView::from(&task),
        Some(&human),
    )
}

pub fn run_archive(options: ArchiveOptions) -> Result<()> {
    let service = load_service(&options.context)?;
    let task = service.archive_task(&options.id)?;

    let mut human = HumanOutput::new("Task archived");
    human.push_summary("ID", task.id.clone());
    human.push_next_step(format!("mdtask unarchive {}", task.id));

    emit_success(
        options.context.output(),
        "archive",
        &TaskView::from(&task),
        Some(&human),
    )
}

pub fn run_unarchive(options: ArchiveOptions) -> Result<()> {
    let service = load_service(&options.context)?;
    let task = service.unarchive_task(&options.id)?;

    let mut human = HumanOutput::new("Task unarchived");
    human.push_summary("ID", task.id.clone());

    emit_success(
        options.context.output(),
        "unarchive",
        &TaskView::from(&task),
        Some(&human),
    )
}

pub fn run_remind(context: ContextOptions) -> Result<()> {
    let service = load_service(&context)?;
    let tasks = service.due_reminders(Local::now().naive_local())?;

    let mut human = HumanOutput::new("Due reminders");
    human.push_summary("Total", tasks.len().to_string());
    for task in &tasks {
        let at = task
            .reminder()
            .map(|at| at.format(DATE_TIME_FORMAT).to_string())
            .unwrap_or_default();
        human.push_detail(format!("{at} {} {}", task.id, task.title));
    }

    emit_success(context.output(), "remind", &list_output(&tasks), Some(&human))
}

pub fn run_stats(context: ContextOptions) -> Result<()> {
    let service = load_service(&context)?;
    let stats: TaskStats = service.stats(Local::now().date_naive())?;

    let mut human = HumanOutput::new("Task stats");
    human.push_summary("Active", stats.total.to_string());
    human.push_summary("Archived", stats.archived.to_string());
    human.push_summary("Overdue", stats.overdue.to_string());
    human.push_summary("Due within a week", stats.upcoming.to_string());
    for (status, count) in [
        (Status::Todo, stats.by_status.todo),
        (Status::Wip, stats.by_status.wip),
        (Status::Wait, stats.by_status.wait),
        (Status::Sche, stats.by_status.sche),
        (Status::Done, stats.by_status.done),
    ] {
        human.push_detail(format!("{status}: {count}"));
    }

    emit_success(context.output(), "stats", &stats, Some(&human))
}

// =============================================================================
// Helpers
// =============================================================================

fn load_service(options: &ContextOptions) -> Result<TaskService> {
    let cwd = std::env::current_dir()?;
    let config = match options.config.as_deref() {
        Some(path) => Config::load(path)?,
        None => Config::discover(&cwd),
    };

    let roots = if options.paths.is_empty() {
        config.resolved_paths()
    } else {
        options
            .paths
            .iter()
            .map(|path| {
                if path.is_relative() {
                    cwd.join(path)
                } else {
                    path.clone()
                }
            })
            .collect()
    };
    debug!(roots = ?roots, "task directories");

    Ok(TaskService::new(TaskRepository::new(roots), config.task))
}

fn list_output(tasks: &[Task]) -> TaskListOutput {
    TaskListOutput {
        total: tasks.len(),
        tasks: tasks.iter().map(TaskView::from).collect(),
    }
}

fn push_task_lines(human: &mut HumanOutput, tasks: &[Task]) {
    for task in tasks {
        let mut line = format!("[{}] {} {}", task.status(), task.id, task.title);
        if let Some(deadline) = task.deadline() {
            line.push_str(&format!(" (due {})", deadline.format(DATE_FORMAT)));
        }
        if task.is_archived() {
            line.push_str(" (archived)");
        }
        human.push_detail(line);
    }
}

/// Deadlines and reminders that are already behind `now`
fn schedule_warnings(task: &Task, now: NaiveDateTime) -> Vec<String> {
    let mut warnings = Vec::new();
    if let Some(deadline) = task.deadline().filter(|date| *date < now.date()) {
        warnings.push(format!(
            "deadline {} is in the past",
            deadline.format(DATE_FORMAT)
        ));
    }
    if let Some(reminder) = task.reminder().filter(|at| *at <= now) {
        warnings.push(format!(
            "reminder {} is already due",
            reminder.format(REMINDER_FORMAT)
        ));
    }
    warnings
}

fn non_empty_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}

fn parse_date_arg(flag: &str, value: Option<&str>) -> Result<Option<NaiveDate>> {
    let Some(value) = value else {
        return Ok(None);
    };
    tags::parse_deadline(value.trim())
        .map(Some)
        .ok_or_else(|| Error::InvalidInput(format!("--{flag}: expected YYYY-MM-DD, got '{value}'")))
}

/// Accepts `YYYY-MM-DDTHH:MM`, `YYYY-MM-DD HH:MM` or a bare date
fn parse_reminder_arg(value: Option<&str>) -> Result<Option<NaiveDateTime>> {
    let Some(value) = value else {
        return Ok(None);
    };
    tags::parse_reminder(&value.trim().replacen(' ', "T", 1))
        .map(Some)
        .ok_or_else(|| {
            Error::InvalidInput(format!(
                "--reminder: expected YYYY-MM-DDTHH:MM or YYYY-MM-DD, got '{value}'"
            ))
        })
}
