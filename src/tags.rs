//! Tag-encoded task attributes.
//!
//! On disk every structured attribute of a task is a tag string with a
//! reserved `mdtask/...` prefix. In memory those tags are decoded into
//! [`Attributes`]; everything without a recognised prefix stays a user tag.
//!
//! Canonical encoding order:
//!
//! ```text
//! mdtask
//! mdtask/status/<STATUS>
//! <user tags...>
//! mdtask/deadline/<YYYY-MM-DD>
//! mdtask/reminder/<YYYY-MM-DDTHH:MM>
//! mdtask/waitfor/<reason>
//! mdtask/parent/<task-id>
//! mdtask/archived
//! ```

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::task::Status;

/// Marker tag: a file is a managed task iff its tags contain this exact string
pub const MANAGED_TAG: &str = "mdtask";
/// Prefix shared by every system tag other than the bare marker
pub const SYSTEM_TAG_PREFIX: &str = "mdtask/";
pub const STATUS_PREFIX: &str = "mdtask/status/";
pub const ARCHIVED_TAG: &str = "mdtask/archived";
pub const DEADLINE_PREFIX: &str = "mdtask/deadline/";
pub const REMINDER_PREFIX: &str = "mdtask/reminder/";
pub const WAITFOR_PREFIX: &str = "mdtask/waitfor/";
pub const PARENT_PREFIX: &str = "mdtask/parent/";

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const REMINDER_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Returns true for `mdtask` and anything under `mdtask/`
pub fn is_system_tag(tag: &str) -> bool {
    tag == MANAGED_TAG || tag.starts_with(SYSTEM_TAG_PREFIX)
}

pub fn parse_deadline(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

/// Accepts `YYYY-MM-DDTHH:MM`, falling back to a bare date at midnight
pub fn parse_reminder(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, REMINDER_FORMAT)
        .ok()
        .or_else(|| parse_deadline(value).and_then(|date| date.and_hms_opt(0, 0, 0)))
}

/// Decoded form of a task's tag list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    pub managed: bool,
    pub status: Option<Status>,
    pub archived: bool,
    pub deadline: Option<NaiveDate>,
    pub reminder: Option<NaiveDateTime>,
    pub wait_reason: Option<String>,
    pub parent: Option<String>,
    /// Non-attribute tags, in their original order
    pub user_tags: Vec<String>,
}

impl Attributes {
    /// Decode a raw tag list.
    ///
    /// The first decodable tag for each single-valued prefix wins and later
    /// ones are dropped. A reserved-prefix tag whose value does not decode is
    /// kept verbatim as a user tag.
    pub fn decode<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut attrs = Attributes::default();
        for tag in tags {
            let tag = tag.as_ref();
            if !attrs.decode_one(tag) {
                attrs.user_tags.push(tag.to_string());
            }
        }
        attrs
    }

    /// Returns false when the tag should be kept as a user tag.
    fn decode_one(&mut self, tag: &str) -> bool {
        if tag == MANAGED_TAG {
            self.managed = true;
            return true;
        }
        if tag == ARCHIVED_TAG {
            self.archived = true;
            return true;
        }

        if let Some(value) = attribute_value(tag, STATUS_PREFIX) {
            return match Status::from_tag_value(value) {
                Some(status) => assign_once(&mut self.status, status, tag),
                None => false,
            };
        }
        if let Some(value) = attribute_value(tag, DEADLINE_PREFIX) {
            return match parse_deadline(value) {
                Some(date) => assign_once(&mut self.deadline, date, tag),
                None => false,
            };
        }
        if let Some(value) = attribute_value(tag, REMINDER_PREFIX) {
            return match parse_reminder(value) {
                Some(at) => assign_once(&mut self.reminder, at, tag),
                None => false,
            };
        }
        if let Some(value) = attribute_value(tag, WAITFOR_PREFIX) {
            return assign_once(&mut self.wait_reason, value.to_string(), tag);
        }
        if let Some(value) = attribute_value(tag, PARENT_PREFIX) {
            return assign_once(&mut self.parent, value.to_string(), tag);
        }

        false
    }

    /// Encode back to the canonical tag list
    pub fn encode(&self) -> Vec<String> {
        let mut tags = Vec::with_capacity(self.user_tags.len() + 7);
        if self.managed {
            tags.push(MANAGED_TAG.to_string());
        }
        if let Some(status) = self.status {
            tags.push(format!("{STATUS_PREFIX}{}", status.as_str()));
        }
        tags.extend(self.user_tags.iter().cloned());
        if let Some(deadline) = self.deadline {
            tags.push(format!("{DEADLINE_PREFIX}{}", deadline.format(DATE_FORMAT)));
        }
        if let Some(reminder) = self.reminder {
            tags.push(format!("{REMINDER_PREFIX}{}", reminder.format(REMINDER_FORMAT)));
        }
        if let Some(reason) = &self.wait_reason {
            tags.push(format!("{WAITFOR_PREFIX}{reason}"));
        }
        if let Some(parent) = &self.parent {
            tags.push(format!("{PARENT_PREFIX}{parent}"));
        }
        if self.archived {
            tags.push(ARCHIVED_TAG.to_string());
        }
        tags
    }

    /// Drop user tags left over under an attribute prefix (undecodable values).
    pub fn clear_stale(&mut self, prefix: &str) {
        self.user_tags.retain(|tag| !tag.starts_with(prefix));
    }
}

fn attribute_value<'a>(tag: &'a str, prefix: &str) -> Option<&'a str> {
    tag.strip_prefix(prefix).filter(|value| !value.is_empty())
}

fn assign_once<T>(slot: &mut Option<T>, value: T, tag: &str) -> bool {
    if slot.is_some() {
        debug!(tag, "dropping duplicate attribute tag");
    } else {
        *slot = Some(value);
    }
    true
}
