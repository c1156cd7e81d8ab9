//! File-backed task repository.
//!
//! A repository is an ordered list of root directories. Every `.md` file under
//! any root is a candidate task; files that fail to parse or lack the
//! `mdtask` marker are skipped. Nothing is cached: each query walks the roots
//! again.
//!
//! New tasks are written to the first root as `<timestamp>[_<n>].md`.

use std::fs::{self, File};
use std::io::Write;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::id::{self, IdGenerator, TASK_ID_PREFIX};
use crate::markdown;
use crate::task::{current_timestamp, Status, Task};

pub const MARKDOWN_EXTENSION: &str = "md";

/// Attempts at finding a free file name when creating a task
pub const MAX_FILENAME_SUFFIX: usize = 100;

/// Numbered suffixes probed by the filename guess in `find_by_id_with_path`
const GUESS_SUFFIX_LIMIT: usize = 10;

#[derive(Debug, Clone)]
pub struct TaskRepository {
    roots: Vec<PathBuf>,
    ids: Arc<IdGenerator>,
}

impl TaskRepository {
    /// Repository over `roots`, sharing the process-wide ID generator
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self::with_id_generator(roots, IdGenerator::shared())
    }

    pub fn with_id_generator(roots: Vec<PathBuf>, ids: Arc<IdGenerator>) -> Self {
        Self { roots, ids }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    pub fn find_all(&self) -> Result<Vec<Task>> {
        let mut tasks = Vec::new();
        self.walk(|task, _| {
            tasks.push(task);
            ControlFlow::Continue(())
        })?;
        Ok(tasks)
    }

    pub fn find_by_id(&self, id: &str) -> Result<Task> {
        self.find_all()?
            .into_iter()
            .find(|task| task.id == id)
            .ok_or_else(|| Error::task_not_found(id))
    }

    /// Find a task and the file it lives in.
    ///
    /// Tries the conventional file names for `id` in each root first, then
    /// falls back to a full scan.
    pub fn find_by_id_with_path(&self, id: &str) -> Result<(Task, PathBuf)> {
        if let Some(found) = self.find_by_file_name(id) {
            return Ok(found);
        }

        let mut found = None;
        self.walk(|task, path| {
            if task.id == id {
                found = Some((task, path));
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })?;
        found.ok_or_else(|| Error::task_not_found(id))
    }

    pub fn find_by_status(&self, status: Status) -> Result<Vec<Task>> {
        let mut tasks = self.find_all()?;
        tasks.retain(|task| task.status() == status);
        Ok(tasks)
    }

    /// Tasks that are not archived
    pub fn find_active(&self) -> Result<Vec<Task>> {
        let mut tasks = self.find_all()?;
        tasks.retain(|task| !task.is_archived());
        Ok(tasks)
    }

    /// Case-insensitive substring search over title, description, content and tags
    pub fn search(&self, query: &str) -> Result<Vec<Task>> {
        let mut tasks = self.find_all()?;
        tasks.retain(|task| task.matches_query(query));
        Ok(tasks)
    }

    /// Tag filter over non-archived tasks.
    ///
    /// Tasks carrying any `exclude` tag are dropped. With an empty `include`
    /// everything else matches; otherwise a task needs all `include` tags, or
    /// at least one when `or_mode` is set. Tag comparison ignores case.
    pub fn search_by_tags(
        &self,
        include: &[String],
        exclude: &[String],
        or_mode: bool,
    ) -> Result<Vec<Task>> {
        let mut tasks = self.find_all()?;
        tasks.retain(|task| {
            if task.is_archived() {
                return false;
            }
            if exclude.iter().any(|tag| task.has_tag_ignore_case(tag)) {
                return false;
            }
            if include.is_empty() {
                return true;
            }
            if or_mode {
                include.iter().any(|tag| task.has_tag_ignore_case(tag))
            } else {
                include.iter().all(|tag| task.has_tag_ignore_case(tag))
            }
        });
        Ok(tasks)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Persist a new task and return its path.
    ///
    /// Assigns an ID when missing, ensures the `mdtask` marker and a status,
    /// and picks a free file name in the first root. When the base name is
    /// taken, `_1`, `_2`, ... are tried and the task ID is rewritten to match.
    pub fn create(&self, task: &mut Task) -> Result<PathBuf> {
        if task.id.is_empty() {
            task.id = self.ids.next_id();
        }
        if !task.is_managed() {
            task.mark_managed();
        }
        if !task.has_status() {
            task.set_status(Status::Todo);
        }

        let root = self
            .roots
            .first()
            .ok_or_else(|| Error::InvalidConfig("no task directories configured".to_string()))?;

        let original_id = task.id.clone();
        let base = id::file_stem(&original_id);
        for attempt in 0..MAX_FILENAME_SUFFIX {
            let (file_name, candidate_id) = if attempt == 0 {
                (format!("{base}.{MARKDOWN_EXTENSION}"), original_id.clone())
            } else {
                (
                    format!("{base}_{attempt}.{MARKDOWN_EXTENSION}"),
                    format!("{original_id}_{attempt}"),
                )
            };
            let path = root.join(file_name);
            if path.try_exists()? {
                debug!(path = %path.display(), "task file exists, trying next suffix");
                continue;
            }

            task.id = candidate_id;
            self.save(task, &path)?;
            debug!(id = %task.id, path = %path.display(), "created task");
            return Ok(path);
        }

        Err(Error::OperationFailed(format!(
            "no free file name for {original_id} after {MAX_FILENAME_SUFFIX} attempts"
        )))
    }

    /// Rewrite an existing task in place, stamping `updated`.
    ///
    /// The file is located by the task's ID; changing the ID through update
    /// is not supported.
    pub fn update(&self, task: &mut Task) -> Result<()> {
        let (_, path) = self.find_by_id_with_path(&task.id)?;
        task.updated = current_timestamp();
        self.save(task, &path)
    }

    /// Serialize `task` to `path`, creating parent directories
    pub fn save(&self, task: &Task, path: &Path) -> Result<()> {
        let content = markdown::write(task)?;
        write_atomic(path, &content)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Visit every managed task under every root, in traversal order
    fn walk<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(Task, PathBuf) -> ControlFlow<()>,
    {
        for root in &self.roots {
            for entry in WalkDir::new(root).sort_by_file_name() {
                let entry = entry?;
                if !entry.file_type().is_file() || !is_markdown(entry.path()) {
                    continue;
                }
                let path = entry.into_path();
                let Some(task) = load_task(&path)? else {
                    continue;
                };
                if visit(task, path).is_break() {
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    fn find_by_file_name(&self, id: &str) -> Option<(Task, PathBuf)> {
        let candidates = guessed_file_names(id);
        if candidates.is_empty() {
            return None;
        }

        for root in &self.roots {
            for name in &candidates {
                let path = root.join(name);
                if !path.is_file() {
                    continue;
                }
                match load_task(&path) {
                    Ok(Some(task)) if task.id == id => return Some((task, path)),
                    Ok(_) => {}
                    Err(err) => debug!(path = %path.display(), %err, "filename guess unreadable"),
                }
            }
        }
        None
    }
}

fn is_markdown(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(MARKDOWN_EXTENSION)
}

/// Read and parse one file. `Ok(None)` means "not a managed task".
fn load_task(path: &Path) -> Result<Option<Task>> {
    let bytes = fs::read(path)?;
    match markdown::parse(&bytes) {
        Ok(task) if task.is_managed() => Ok(Some(task)),
        Ok(_) => {
            debug!(path = %path.display(), "skipping markdown without mdtask tag");
            Ok(None)
        }
        Err(err) => {
            debug!(path = %path.display(), %err, "skipping unparsable markdown");
            Ok(None)
        }
    }
}

/// Conventional file names for an ID, most likely first.
/// Empty when the ID cannot map onto a plain file name.
fn guessed_file_names(id: &str) -> Vec<String> {
    let Some(stem) = id.strip_prefix(TASK_ID_PREFIX) else {
        return Vec::new();
    };
    if stem.is_empty() || !stem.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Vec::new();
    }

    let base = stem.split('_').next().unwrap_or(stem);
    let mut names = vec![format!("{stem}.{MARKDOWN_EXTENSION}")];
    for suffix in 1..GUESS_SUFFIX_LIMIT {
        let name = format!("{base}_{suffix}.{MARKDOWN_EXTENSION}");
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Write through a sibling temp file and rename it over `path`.
///
/// The temp name ends in `.tmp.<pid>`, so scans never mistake it for a task.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension(format!(
        "{}.tmp.{}",
        path.extension().and_then(|e| e.to_str()).unwrap_or(""),
        std::process::id()
    ));

    let mut temp_file = File::create(&temp_path)?;
    temp_file.write_all(data)?;
    temp_file.sync_all()?;
    drop(temp_file);

    if let Err(err) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(err.into());
    }
    Ok(())
}
