//! The task entity.
//!
//! A [`Task`] carries its plain fields (title, description, body, timestamps)
//! plus typed [`Attributes`] decoded from its tag list. Attribute setters keep
//! exactly one tag per single-valued attribute; user tags are never touched.

use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::tags::{
    self, Attributes, DEADLINE_PREFIX, PARENT_PREFIX, REMINDER_PREFIX, STATUS_PREFIX,
    WAITFOR_PREFIX,
};

/// Workflow status of a task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    #[default]
    Todo,
    Wip,
    Wait,
    Sche,
    Done,
}

impl Status {
    pub const ALL: [Status; 5] = [
        Status::Todo,
        Status::Wip,
        Status::Wait,
        Status::Sche,
        Status::Done,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Todo => "TODO",
            Status::Wip => "WIP",
            Status::Wait => "WAIT",
            Status::Sche => "SCHE",
            Status::Done => "DONE",
        }
    }

    /// Exact match against the on-disk spelling
    pub fn from_tag_value(value: &str) -> Option<Self> {
        Status::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        Status::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "unknown status '{trimmed}' (expected TODO|WIP|WAIT|SCHE|DONE)"
                ))
            })
    }
}

/// Current local time truncated to the minute, the resolution timestamps are stored at
pub fn current_timestamp() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_second(0)
        .and_then(|at| at.with_nanosecond(0))
        .unwrap_or(now)
}

pub fn validate_title(title: &str) -> Result<()> {
    if title.contains('\n') || title.contains('\r') {
        return Err(Error::InvalidInput(
            "title cannot contain newlines".to_string(),
        ));
    }
    if title.trim().is_empty() {
        return Err(Error::InvalidInput("title cannot be empty".to_string()));
    }
    Ok(())
}

pub fn validate_description(description: &str) -> Result<()> {
    if description.contains('\n') || description.contains('\r') {
        return Err(Error::InvalidInput(
            "description cannot contain newlines".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub aliases: Vec<String>,
    pub created: NaiveDateTime,
    pub updated: NaiveDateTime,
    pub content: String,
    attributes: Attributes,
}

impl Task {
    /// A fresh, unsaved task. The repository assigns the ID on create.
    pub fn new(title: impl Into<String>) -> Self {
        let now = current_timestamp();
        Self {
            id: String::new(),
            title: title.into(),
            description: String::new(),
            aliases: Vec::new(),
            created: now,
            updated: now,
            content: String::new(),
            attributes: Attributes::default(),
        }
    }

    // =========================================================================
    // Tag list
    // =========================================================================

    /// The encoded tag list, as written to front matter
    pub fn tags(&self) -> Vec<String> {
        self.attributes.encode()
    }

    /// Replace every tag, system tags included
    pub fn set_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.attributes = Attributes::decode(tags);
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn user_tags(&self) -> &[String] {
        &self.attributes.user_tags
    }

    /// Replace the user tags, leaving system attributes alone.
    /// System tags in `tags` are ignored.
    pub fn set_user_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.attributes.user_tags = tags
            .into_iter()
            .map(|tag| tag.as_ref().to_string())
            .filter(|tag| !tags::is_system_tag(tag))
            .collect();
    }

    /// Append a tag as if pushed onto the raw tag list
    pub fn add_tag(&mut self, tag: &str) {
        let mut tags = self.tags();
        tags.push(tag.to_string());
        self.set_tags(tags);
    }

    /// Case-insensitive exact match against the encoded tags
    pub fn has_tag_ignore_case(&self, tag: &str) -> bool {
        let wanted = tag.to_lowercase();
        self.tags().iter().any(|own| own.to_lowercase() == wanted)
    }

    /// Case-insensitive substring match over title, description, content and tags
    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.title.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
            || self.content.to_lowercase().contains(&query)
            || self
                .tags()
                .iter()
                .any(|tag| tag.to_lowercase().contains(&query))
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    pub fn is_managed(&self) -> bool {
        self.attributes.managed
    }

    pub fn mark_managed(&mut self) {
        self.attributes.managed = true;
    }

    /// Status, defaulting to TODO when no status tag is present
    pub fn status(&self) -> Status {
        self.attributes.status.unwrap_or_default()
    }

    pub fn has_status(&self) -> bool {
        self.attributes.status.is_some()
    }

    pub fn set_status(&mut self, status: Status) {
        self.attributes.clear_stale(STATUS_PREFIX);
        self.attributes.status = Some(status);
    }

    pub fn is_archived(&self) -> bool {
        self.attributes.archived
    }

    pub fn archive(&mut self) {
        self.attributes.archived = true;
    }

    pub fn unarchive(&mut self) {
        self.attributes.archived = false;
    }

    pub fn deadline(&self) -> Option<NaiveDate> {
        self.attributes.deadline
    }

    /// `None` clears the deadline
    pub fn set_deadline(&mut self, deadline: Option<NaiveDate>) {
        self.attributes.clear_stale(DEADLINE_PREFIX);
        self.attributes.deadline = deadline;
    }

    pub fn reminder(&self) -> Option<NaiveDateTime> {
        self.attributes.reminder
    }

    /// `None` clears the reminder
    pub fn set_reminder(&mut self, reminder: Option<NaiveDateTime>) {
        self.attributes.clear_stale(REMINDER_PREFIX);
        self.attributes.reminder = reminder;
    }

    pub fn wait_reason(&self) -> Option<&str> {
        self.attributes.wait_reason.as_deref()
    }

    /// An empty reason clears it
    pub fn set_wait_reason(&mut self, reason: &str) {
        self.attributes.clear_stale(WAITFOR_PREFIX);
        self.attributes.wait_reason = non_empty(reason);
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.attributes.parent.as_deref()
    }

    pub fn has_parent(&self) -> bool {
        self.attributes.parent.is_some()
    }

    /// An empty ID removes the parent link
    pub fn set_parent_id(&mut self, parent_id: &str) {
        self.attributes.clear_stale(PARENT_PREFIX);
        self.attributes.parent = non_empty(parent_id);
    }

    pub fn remove_parent(&mut self) {
        self.set_parent_id("");
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
