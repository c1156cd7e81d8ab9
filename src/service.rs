//! Task creation, update and archival policy on top of [`TaskRepository`].

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::debug;

use crate::config::TaskConfig;
use crate::error::{Error, Result};
use crate::repository::TaskRepository;
use crate::tags::MANAGED_TAG;
use crate::task::{validate_description, validate_title, Status, Task};

/// Window for counting a deadline as upcoming in [`TaskService::stats`]
const UPCOMING_DAYS: i64 = 7;

#[derive(Debug, Clone, Default)]
pub struct CreateTaskParams {
    pub title: String,
    pub description: String,
    pub content: String,
    pub tags: Vec<String>,
    pub status: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub reminder: Option<NaiveDateTime>,
    pub parent_id: Option<String>,
}

/// Only fields that are set are applied
#[derive(Debug, Clone, Default)]
pub struct UpdateTaskParams {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    /// Replaces the user tags; system tags are kept
    pub tags: Option<Vec<String>>,
    pub content: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub clear_deadline: bool,
    pub reminder: Option<NaiveDateTime>,
    pub clear_reminder: bool,
    /// Empty string clears the reason
    pub wait_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub todo: usize,
    pub wip: usize,
    pub wait: usize,
    pub sche: usize,
    pub done: usize,
}

impl StatusCounts {
    fn bump(&mut self, status: Status) {
        match status {
            Status::Todo => self.todo += 1,
            Status::Wip => self.wip += 1,
            Status::Wait => self.wait += 1,
            Status::Sche => self.sche += 1,
            Status::Done => self.done += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    /// Active (non-archived) tasks
    pub total: usize,
    pub archived: usize,
    pub by_status: StatusCounts,
    pub overdue: usize,
    pub upcoming: usize,
}

#[derive(Debug, Clone)]
pub struct TaskService {
    repo: TaskRepository,
    config: TaskConfig,
}

impl TaskService {
    pub fn new(repo: TaskRepository, config: TaskConfig) -> Self {
        Self { repo, config }
    }

    pub fn repository(&self) -> &TaskRepository {
        &self.repo
    }

    pub fn config(&self) -> &TaskConfig {
        &self.config
    }

    /// Create a task with configured defaults applied. Returns the task and its file.
    pub fn create_task(&self, params: CreateTaskParams) -> Result<(Task, PathBuf)> {
        let title = format!("{}{}", self.config.title_prefix, params.title);
        validate_title(&title)?;

        let description = if params.description.is_empty() {
            self.config.description_template.clone()
        } else {
            params.description
        };
        validate_description(&description)?;

        let content = if params.content.is_empty() {
            self.config.content_template.clone()
        } else {
            params.content
        };

        let explicit_status = params
            .status
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .map(str::parse::<Status>)
            .transpose()?;
        let status = match explicit_status {
            Some(status) => status,
            None => self.config.default_status.parse()?,
        };

        let mut tags = vec![MANAGED_TAG.to_string()];
        tags.extend(self.config.default_tags.iter().cloned());
        tags.extend(params.tags);

        let mut task = Task::new(title);
        task.description = description;
        task.content = content;
        task.set_tags(tags);
        task.set_status(status);
        if params.deadline.is_some() {
            task.set_deadline(params.deadline);
        }
        if params.reminder.is_some() {
            task.set_reminder(params.reminder);
        }

        if let Some(parent_id) = params.parent_id.filter(|id| !id.trim().is_empty()) {
            let parent = self.repo.find_by_id(&parent_id).map_err(|err| {
                if err.is_not_found() {
                    Error::NotFound {
                        kind: "parent task",
                        id: parent_id.clone(),
                    }
                } else {
                    err
                }
            })?;
            task.set_parent_id(&parent_id);
            // a configured non-TODO default wins over the parent's status
            if explicit_status.is_none()
                && status == Status::Todo
                && self.config.inherit_parent_status
            {
                task.set_status(parent.status());
            }
        }

        let path = self.repo.create(&mut task)?;
        Ok((task, path))
    }

    pub fn update_task(&self, id: &str, params: UpdateTaskParams) -> Result<Task> {
        let mut task = self.repo.find_by_id(id)?;

        if let Some(title) = params.title {
            validate_title(&title)?;
            task.title = title;
        }
        if let Some(description) = params.description {
            validate_description(&description)?;
            task.description = description;
        }
        if let Some(status) = params.status {
            task.set_status(status.parse()?);
        }
        if let Some(tags) = params.tags {
            task.set_user_tags(tags);
        }
        if let Some(content) = params.content {
            task.content = content;
        }

        if params.clear_deadline {
            task.set_deadline(None);
        } else if params.deadline.is_some() {
            task.set_deadline(params.deadline);
        }

        if params.clear_reminder {
            task.set_reminder(None);
        } else if params.reminder.is_some() {
            task.set_reminder(params.reminder);
        }

        if let Some(reason) = params.wait_reason {
            task.set_wait_reason(&reason);
        }

        self.repo.update(&mut task)?;
        Ok(task)
    }

    /// Archive a task and, depth-first, every non-archived descendant
    pub fn archive_task(&self, id: &str) -> Result<Task> {
        let mut task = self.repo.find_by_id(id)?;
        if task.is_archived() {
            return Err(Error::InvalidInput(format!("{id} is already archived")));
        }

        let mut visited = HashSet::from([task.id.clone()]);
        self.archive_subtasks(&task.id, &mut visited)?;

        task.archive();
        self.repo.update(&mut task)?;
        Ok(task)
    }

    /// Unarchive a single task. Subtasks stay archived.
    pub fn unarchive_task(&self, id: &str) -> Result<Task> {
        let mut task = self.repo.find_by_id(id)?;
        if !task.is_archived() {
            return Err(Error::InvalidInput(format!("{id} is not archived")));
        }

        if let Some(parent_id) = task.parent_id() {
            match self.repo.find_by_id(parent_id) {
                Ok(parent) if parent.is_archived() => {
                    return Err(Error::InvalidInput(format!(
                        "cannot unarchive {id} while its parent {parent_id} is archived"
                    )));
                }
                Ok(_) => {}
                Err(err) if err.is_not_found() => {}
                Err(err) => return Err(err),
            }
        }

        task.unarchive();
        self.repo.update(&mut task)?;
        Ok(task)
    }

    /// Direct children of `parent_id`
    pub fn find_subtasks(&self, parent_id: &str) -> Result<Vec<Task>> {
        let mut tasks = self.repo.find_all()?;
        tasks.retain(|task| task.parent_id() == Some(parent_id));
        Ok(tasks)
    }

    pub fn task_with_subtasks(&self, id: &str) -> Result<(Task, Vec<Task>)> {
        let task = self.repo.find_by_id(id)?;
        let subtasks = self.find_subtasks(id)?;
        Ok((task, subtasks))
    }

    /// Active, unfinished tasks whose reminder is at or before `now`, earliest first
    pub fn due_reminders(&self, now: NaiveDateTime) -> Result<Vec<Task>> {
        let mut tasks = self.repo.find_active()?;
        tasks.retain(|task| {
            task.status() != Status::Done && task.reminder().is_some_and(|at| at <= now)
        });
        tasks.sort_by_key(|task| task.reminder());
        Ok(tasks)
    }

    pub fn stats(&self, today: NaiveDate) -> Result<TaskStats> {
        let horizon = today + Duration::days(UPCOMING_DAYS);
        let mut stats = TaskStats::default();
        for task in self.repo.find_all()? {
            if task.is_archived() {
                stats.archived += 1;
                continue;
            }
            stats.total += 1;
            stats.by_status.bump(task.status());
            if task.status() == Status::Done {
                continue;
            }
            match task.deadline() {
                Some(deadline) if deadline < today => stats.overdue += 1,
                Some(deadline) if deadline < horizon => stats.upcoming += 1,
                _ => {}
            }
        }
        Ok(stats)
    }

    fn archive_subtasks(&self, parent_id: &str, visited: &mut HashSet<String>) -> Result<()> {
        for mut subtask in self.find_subtasks(parent_id)? {
            if subtask.is_archived() || !visited.insert(subtask.id.clone()) {
                continue;
            }
            self.archive_subtasks(&subtask.id, visited)?;
            subtask.archive();
            self.repo.update(&mut subtask)?;
            debug!(id = %subtask.id, parent = parent_id, "archived subtask");
        }
        Ok(())
    }
}
