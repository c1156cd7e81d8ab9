//! Command-line interface for mdtask
//!
//! This module defines the CLI structure using clap derive macros.
//! Command implementations live in [`task`].

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::Result;

mod task;

/// mdtask - tasks as Markdown files
///
/// Each task is a Markdown note with YAML front matter. Status, deadlines,
/// reminders and parent links are stored as `mdtask/...` tags, so the files
/// stay readable in any note-taking tool.
#[derive(Parser, Debug)]
#[command(name = "mdtask")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Task directory; repeat or comma-separate for several (overrides config)
    #[arg(long = "paths", global = true, value_delimiter = ',')]
    pub paths: Vec<PathBuf>,

    /// Config file (defaults to discovery from the current directory)
    #[arg(long, global = true, env = "MDTASK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a task
    New {
        /// Task title
        #[arg(short, long)]
        title: String,

        /// One-line description
        #[arg(short, long, default_value = "")]
        description: String,

        /// Markdown body
        #[arg(short, long, default_value = "")]
        content: String,

        /// User tags (comma-separated)
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,

        /// TODO, WIP, WAIT, SCHE or DONE
        #[arg(short, long)]
        status: Option<String>,

        /// Deadline (YYYY-MM-DD)
        #[arg(long)]
        deadline: Option<String>,

        /// Reminder (YYYY-MM-DDTHH:MM or YYYY-MM-DD)
        #[arg(long)]
        reminder: Option<String>,

        /// Parent task ID
        #[arg(long)]
        parent: Option<String>,
    },

    /// List tasks
    List {
        /// Only tasks with this status
        #[arg(short, long)]
        status: Option<String>,

        /// Only archived tasks
        #[arg(long, conflicts_with = "all")]
        archived: bool,

        /// Archived and active tasks
        #[arg(long)]
        all: bool,

        /// Only direct subtasks of this task
        #[arg(long)]
        parent: Option<String>,
    },

    /// Show a task and its subtasks
    Get {
        /// Task ID
        id: String,
    },

    /// Search by text and tags
    Search {
        /// Case-insensitive text to look for
        query: Option<String>,

        /// Required tags (comma-separated)
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,

        /// Excluded tags (comma-separated)
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,

        /// Match any of --tags instead of all
        #[arg(long)]
        or: bool,

        /// Include archived tasks in text search
        #[arg(long)]
        archived: bool,
    },

    /// Update fields of a task
    Edit {
        /// Task ID
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        status: Option<String>,

        /// Replace user tags (comma-separated, empty string clears)
        #[arg(long, value_delimiter = ',')]
        tags: Option<Vec<String>>,

        #[arg(long)]
        content: Option<String>,

        #[arg(long, conflicts_with = "clear_deadline")]
        deadline: Option<String>,

        #[arg(long)]
        clear_deadline: bool,

        #[arg(long, conflicts_with = "clear_reminder")]
        reminder: Option<String>,

        #[arg(long)]
        clear_reminder: bool,

        /// What the task waits for (empty string clears)
        #[arg(long)]
        wait_for: Option<String>,
    },

    /// Archive a task and its subtasks
    Archive {
        /// Task ID
        id: String,
    },

    /// Unarchive a task
    Unarchive {
        /// Task ID
        id: String,
    },

    /// List tasks whose reminder is due
    Remind,

    /// Task counts by status and deadline
    Stats,
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let context = task::ContextOptions {
            paths: self.paths,
            config: self.config,
            json: self.json,
            quiet: self.quiet,
        };

        match self.command {
            Commands::New {
                title,
                description,
                content,
                tags,
                status,
                deadline,
                reminder,
                parent,
            } => task::run_new(task::NewOptions {
                title,
                description,
                content,
                tags,
                status,
                deadline,
                reminder,
                parent,
                context,
            }),
            Commands::List {
                status,
                archived,
                all,
                parent,
            } => task::run_list(task::ListOptions {
                status,
                archived,
                all,
                parent,
                context,
            }),
            Commands::Get { id } => task::run_get(task::GetOptions { id, context }),
            Commands::Search {
                query,
                tags,
                exclude,
                or,
                archived,
            } => task::run_search(task::SearchOptions {
                query,
                tags,
                exclude,
                or,
                archived,
                context,
            }),
            Commands::Edit {
                id,
                title,
                description,
                status,
                tags,
                content,
                deadline,
                clear_deadline,
                reminder,
                clear_reminder,
                wait_for,
            } => task::run_edit(task::EditOptions {
                id,
                title,
                description,
                status,
                tags,
                content,
                deadline,
                clear_deadline,
                reminder,
                clear_reminder,
                wait_for,
                context,
            }),
            Commands::Archive { id } => task::run_archive(task::ArchiveOptions { id, context }),
            Commands::Unarchive { id } => {
                task::run_unarchive(task::ArchiveOptions { id, context })
            }
            Commands::Remind => task::run_remind(context),
            Commands::Stats => task::run_stats(context),
        }
    }
}
