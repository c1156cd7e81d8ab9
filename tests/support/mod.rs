#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_cmd::Command;
use chrono::{NaiveDate, NaiveDateTime};
use mdtask::config::TaskConfig;
use mdtask::id::{Clock, IdGenerator};
use mdtask::repository::TaskRepository;
use mdtask::service::TaskService;
use serde_json::Value;
use tempfile::TempDir;

/// Clock frozen at a fixed instant that only advances when slept on
pub struct FakeClock {
    now: Mutex<NaiveDateTime>,
}

impl FakeClock {
    pub fn at(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }
}

impl Clock for FakeClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap()
    }

    fn sleep(&self, duration: Duration) {
        *self.now.lock().unwrap() += chrono::Duration::from_std(duration).unwrap();
    }
}

pub fn datetime(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(h, min, 0))
        .expect("valid datetime")
}

/// Temporary directory holding task roots and a config file
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        fs::create_dir_all(dir.path().join("tasks")).expect("tasks dir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn tasks_dir(&self) -> PathBuf {
        self.dir.path().join("tasks")
    }

    pub fn write_file(&self, rel_path: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, contents).expect("write file");
        path
    }

    pub fn write_config(&self, contents: &str) -> PathBuf {
        self.write_file(".mdtask.toml", contents)
    }

    /// Repository over `tasks/` with IDs starting at 2024-01-01 12:00:00
    pub fn repository(&self) -> TaskRepository {
        let clock = FakeClock::at(datetime(2024, 1, 1, 12, 0));
        TaskRepository::with_id_generator(
            vec![self.tasks_dir()],
            Arc::new(IdGenerator::new(clock)),
        )
    }

    pub fn service(&self, config: TaskConfig) -> TaskService {
        TaskService::new(self.repository(), config)
    }

    /// `mdtask` running in the workspace with `.mdtask.toml` as config
    pub fn cmd(&self) -> Command {
        if !self.path().join(".mdtask.toml").exists() {
            self.write_config("paths = [\"tasks\"]\n");
        }
        let mut cmd = mdtask_cmd();
        cmd.current_dir(self.path())
            .arg("--config")
            .arg(self.path().join(".mdtask.toml"));
        cmd
    }

    /// Run with `--json` and return the parsed envelope
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .args(args)
            .arg("--json")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&output).expect("json output")
    }

    /// Create a task through the CLI and return its ID
    pub fn new_task(&self, args: &[&str]) -> String {
        let mut full = vec!["new"];
        full.extend_from_slice(args);
        let value = self.json(&full);
        value["data"]["id"].as_str().expect("task id").to_string()
    }
}

pub fn mdtask_cmd() -> Command {
    let mut cmd = Command::cargo_bin("mdtask").expect("binary");
    cmd.env_remove("MDTASK_CONFIG").env_remove("RUST_LOG");
    cmd
}
