//! Front-matter codec for task files.
//!
//! ```text
//! ---
//! id: task/20240101120000
//! aliases: []
//! tags:
//! - mdtask
//! - mdtask/status/TODO
//! created: 2024-01-01 12:00
//! description: ''
//! title: Write the report
//! updated: 2024-01-01 12:00
//! ---
//!
//! free-form body
//! ```
//!
//! serde_yaml writes sequence items unindented; indented lists read fine too.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tags::DATE_FORMAT;
use crate::task::{current_timestamp, Task};

const DELIMITER: &str = "---";
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Why a byte stream is not a task file
#[derive(Error, Debug)]
pub enum FrontMatterError {
    #[error("no front matter found")]
    Missing,

    #[error("front matter not properly closed")]
    Unterminated,

    #[error("file is not valid UTF-8")]
    InvalidUtf8,

    #[error("failed to parse YAML front matter: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct FrontMatter {
    #[serde(default)]
    id: String,
    #[serde(default)]
    aliases: Option<Vec<String>>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    created: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    updated: String,
}

pub fn parse(bytes: &[u8]) -> Result<Task, FrontMatterError> {
    let text = std::str::from_utf8(bytes).map_err(|_| FrontMatterError::InvalidUtf8)?;
    parse_str(text)
}

pub fn parse_str(text: &str) -> Result<Task, FrontMatterError> {
    let (yaml, body) = split_front_matter(text)?;
    let front: FrontMatter = if yaml.trim().is_empty() {
        FrontMatter::default()
    } else {
        serde_yaml::from_str(yaml)?
    };

    let mut task = Task::new(front.title);
    task.id = front.id;
    task.description = front.description;
    task.aliases = front.aliases.unwrap_or_default();
    task.set_tags(front.tags.unwrap_or_default());
    task.created = parse_timestamp(&front.created);
    task.updated = parse_timestamp(&front.updated);
    task.content = body.to_string();
    Ok(task)
}

pub fn write(task: &Task) -> Result<Vec<u8>, FrontMatterError> {
    let front = FrontMatter {
        id: task.id.clone(),
        aliases: Some(task.aliases.clone()),
        tags: Some(task.tags()),
        created: task.created.format(DATE_TIME_FORMAT).to_string(),
        description: task.description.clone(),
        title: task.title.clone(),
        updated: task.updated.format(DATE_TIME_FORMAT).to_string(),
    };
    let yaml = serde_yaml::to_string(&front)?;

    let mut out = String::with_capacity(yaml.len() + task.content.len() + 16);
    out.push_str(DELIMITER);
    out.push('\n');
    out.push_str(&yaml);
    out.push_str(DELIMITER);
    out.push_str("\n\n");

    let content = task.content.trim();
    if !content.is_empty() {
        out.push_str(content);
        out.push('\n');
    }
    Ok(out.into_bytes())
}

/// `YYYY-MM-DD HH:MM`, then `YYYY-MM-DD`, then now. Never fails.
fn parse_timestamp(value: &str) -> NaiveDateTime {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, DATE_TIME_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, DATE_FORMAT)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .unwrap_or_else(current_timestamp)
}

fn split_front_matter(text: &str) -> Result<(&str, &str), FrontMatterError> {
    let mut lines = text.split_inclusive('\n');
    let first = lines.next().ok_or(FrontMatterError::Missing)?;
    if !is_delimiter(first) {
        return Err(FrontMatterError::Missing);
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        if is_delimiter(line) {
            let yaml = &text[yaml_start..offset];
            let body = &text[offset + line.len()..];
            return Ok((yaml, body.trim_start_matches(|c| c == '\n' || c == '\r')));
        }
        offset += line.len();
    }
    Err(FrontMatterError::Unterminated)
}

fn is_delimiter(line: &str) -> bool {
    line.trim_end_matches(|c| c == '\n' || c == '\r') == DELIMITER
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Status;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(h, min, 0))
            .unwrap()
    }

    const SAMPLE: &str = "---
id: task/20240115093000
aliases:
    - report
tags:
    - mdtask
    - mdtask/status/WIP
    - project/q1
created: 2024-01-15 09:30
description: Quarterly numbers
title: Write the report
updated: 2024-01-16
---


## Notes
- gather data
";

    #[test]
    fn parses_fields_and_trims_leading_blank_lines() {
        let task = parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(task.id, "task/20240115093000");
        assert_eq!(task.title, "Write the report");
        assert_eq!(task.description, "Quarterly numbers");
        assert_eq!(task.aliases, vec!["report".to_string()]);
        assert_eq!(task.status(), Status::Wip);
        assert!(task.is_managed());
        assert_eq!(task.user_tags(), ["project/q1".to_string()]);
        assert_eq!(task.created, at(2024, 1, 15, 9, 30));
        assert_eq!(task.updated, at(2024, 1, 16, 0, 0));
        assert_eq!(task.content, "## Notes\n- gather data\n");
    }

    #[test]
    fn bad_dates_fall_back_to_now() {
        let before = current_timestamp();
        let task = parse_str("---\ntitle: x\ncreated: someday\n---\n").unwrap();
        assert!(task.created >= before);
        assert!(task.updated >= before);
    }

    #[test]
    fn missing_or_unterminated_front_matter_is_an_error() {
        assert!(matches!(
            parse_str("# Just a note\n"),
            Err(FrontMatterError::Missing)
        ));
        assert!(matches!(parse_str(""), Err(FrontMatterError::Missing)));
        assert!(matches!(
            parse_str("---\ntitle: x\nno end\n"),
            Err(FrontMatterError::Unterminated)
        ));
        assert!(matches!(
            parse_str("---\ntitle: [unclosed\n---\n"),
            Err(FrontMatterError::Yaml(_))
        ));
        assert!(matches!(
            parse(&[0x2d, 0x2d, 0x2d, 0x0a, 0xff, 0xfe]),
            Err(FrontMatterError::InvalidUtf8)
        ));
    }

    #[test]
    fn empty_front_matter_is_an_unmanaged_task() {
        let task = parse_str("---\n---\nbody").unwrap();
        assert!(!task.is_managed());
        assert_eq!(task.content, "body");
    }

    #[test]
    fn crlf_delimiters_are_accepted() {
        let task = parse_str("---\r\ntitle: windows\r\ntags: [mdtask]\r\n---\r\n\r\nbody\r\n")
            .unwrap();
        assert_eq!(task.title, "windows");
        assert!(task.is_managed());
    }

    #[test]
    fn write_then_parse_round_trips() {
        let mut task = Task::new("Title: with colon");
        task.id = "task/20240201080000_2".to_string();
        task.description = "one line".to_string();
        task.aliases = vec!["alias".to_string()];
        task.set_tags(["mdtask", "type/bug", "mdtask/parent/task/20240101000000"]);
        task.set_status(Status::Done);
        task.set_deadline(NaiveDate::from_ymd_opt(2024, 2, 29));
        task.content = "\n\nline one\n\nline two\n\n".to_string();
        task.created = at(2024, 2, 1, 8, 0);
        task.updated = at(2024, 2, 2, 18, 45);

        let bytes = write(&task).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.starts_with("---\n"));
        assert!(text.contains("created: 2024-02-01 08:00") || text.contains("created: '2024-02-01 08:00'"));
        assert!(text.ends_with("---\n\nline one\n\nline two\n"));
        assert!(text.contains("tags:\n- mdtask\n"));

        let parsed = parse(&bytes).unwrap();
        assert_eq!(parsed.id, task.id);
        assert_eq!(parsed.title, task.title);
        assert_eq!(parsed.description, task.description);
        assert_eq!(parsed.aliases, task.aliases);
        assert_eq!(parsed.tags(), task.tags());
        assert_eq!(parsed.content, "line one\n\nline two\n");
        assert_eq!(parsed.created, task.created);
        assert_eq!(parsed.updated, task.updated);
    }

    #[test]
    fn empty_body_writes_no_trailing_content() {
        let mut task = Task::new("bare");
        task.id = "task/20240101000000".to_string();
        task.content = "   \n".to_string();
        let text = String::from_utf8(write(&task).unwrap()).unwrap();
        assert!(text.ends_with("---\n\n"));
        assert_eq!(parse_str(&text).unwrap().content, "");
    }
}
