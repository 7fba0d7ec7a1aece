//! Front-matter extraction and `blog` collection schema validation

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::path::Path;

use crate::error::{FieldIssue, FieldProblem, ValidationError};

/// Validated front-matter of a blog post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogFrontmatter {
    pub title: String,
    pub pub_date: DateTime<Utc>,
    pub description: String,
    pub author: String,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Split a source file into its YAML front-matter block and the body
///
/// Returns `None` for the block when the file does not open with `---` or the
/// block is never closed; the whole input is then the body.
pub fn split(content: &str) -> (Option<&str>, &str) {
    let trimmed = content.trim_start_matches('\u{feff}');
    let Some(rest) = trimmed.strip_prefix("---") else {
        return (None, content);
    };

    // The opening fence must be alone on its line
    let Some(newline) = rest.find('\n') else {
        return (None, content);
    };
    if !rest[..newline].trim().is_empty() {
        return (None, content);
    }
    let rest = &rest[newline + 1..];

    // An immediately closed block
    if let Some(after) = rest.strip_prefix("---") {
        if after.is_empty() || after.starts_with('\n') || after.starts_with("\r\n") {
            return (Some(""), after.trim_start_matches(['\n', '\r']));
        }
    }

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return (Some(yaml), body.trim_start_matches(['\n', '\r']));
        }
        offset += line.len();
    }

    (None, content)
}

impl BlogFrontmatter {
    /// Parse and validate a YAML front-matter block against the schema
    ///
    /// Every field is checked and all problems are reported together.
    pub fn validate(path: &Path, yaml: Option<&str>) -> Result<Self, ValidationError> {
        let fail = |issues: Vec<FieldIssue>| ValidationError {
            path: path.to_path_buf(),
            issues,
        };

        let mapping = match yaml.map(str::trim) {
            None | Some("") => Mapping::new(),
            Some(yaml) => match serde_yaml::from_str::<Value>(yaml) {
                Ok(Value::Mapping(m)) => m,
                Ok(Value::Null) => Mapping::new(),
                Ok(_) => {
                    return Err(fail(vec![FieldIssue::new(
                        "frontmatter",
                        FieldProblem::WrongType {
                            expected: "a mapping of fields",
                        },
                    )]))
                }
                Err(e) => {
                    return Err(fail(vec![FieldIssue::new(
                        "frontmatter",
                        FieldProblem::Malformed(e.to_string()),
                    )]))
                }
            },
        };

        let mut issues = Vec::new();

        let title = match required_string(&mapping, "title") {
            Ok(title) if title.trim().is_empty() => {
                issues.push(FieldIssue::new("title", FieldProblem::Empty));
                None
            }
            Ok(title) => Some(title),
            Err(issue) => {
                issues.push(issue);
                None
            }
        };

        let pub_date = match required_string(&mapping, "pubDate") {
            Ok(raw) => match parse_date_string(&raw) {
                Some(date) => Some(date),
                None => {
                    issues.push(FieldIssue::new("pubDate", FieldProblem::InvalidDate(raw)));
                    None
                }
            },
            Err(issue) => {
                issues.push(issue);
                None
            }
        };

        let description = collect(&mut issues, required_string(&mapping, "description"));
        let author = collect(&mut issues, required_string(&mapping, "author"));
        let tags = collect(&mut issues, required_string_list(&mapping, "tags"));
        let image = collect(&mut issues, optional_string(&mapping, "image"));

        match (title, pub_date, description, author, tags, image) {
            (Some(title), Some(pub_date), Some(description), Some(author), Some(tags), Some(image))
                if issues.is_empty() =>
            {
                Ok(Self {
                    title,
                    pub_date,
                    description,
                    author,
                    tags,
                    image,
                })
            }
            _ => Err(fail(issues)),
        }
    }
}

fn collect<T>(issues: &mut Vec<FieldIssue>, result: Result<T, FieldIssue>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(issue) => {
            issues.push(issue);
            None
        }
    }
}

fn lookup<'a>(mapping: &'a Mapping, field: &str) -> Option<&'a Value> {
    mapping.get(field).filter(|v| !v.is_null())
}

fn required_string(mapping: &Mapping, field: &str) -> Result<String, FieldIssue> {
    match lookup(mapping, field) {
        None => Err(FieldIssue::new(field, FieldProblem::Missing)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(FieldIssue::new(
            field,
            FieldProblem::WrongType { expected: "a string" },
        )),
    }
}

fn optional_string(mapping: &Mapping, field: &str) -> Result<Option<String>, FieldIssue> {
    match lookup(mapping, field) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(FieldIssue::new(
            field,
            FieldProblem::WrongType { expected: "a string" },
        )),
    }
}

fn required_string_list(mapping: &Mapping, field: &str) -> Result<Vec<String>, FieldIssue> {
    let wrong_type = || {
        FieldIssue::new(
            field,
            FieldProblem::WrongType {
                expected: "a list of strings",
            },
        )
    };

    match lookup(mapping, field) {
        None => Err(FieldIssue::new(field, FieldProblem::Missing)),
        Some(Value::Sequence(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                _ => Err(wrong_type()),
            })
            .collect(),
        Some(_) => Err(wrong_type()),
    }
}

/// Parse a date string in the formats authors commonly use
///
/// Values without an offset are taken as UTC.
pub fn parse_date_string(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%dT%H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    let datetime_formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    for fmt in datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc());
        }
    }

    let date_formats = ["%Y-%m-%d", "%Y/%m/%d", "%B %d, %Y", "%b %d, %Y", "%B %e %Y", "%b %e %Y"];
    for fmt in date_formats {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }

    None
}
