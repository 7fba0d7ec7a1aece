//! Error types for loading and querying the catalog

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// What is wrong with a single frontmatter field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldProblem {
    /// Required field is absent
    Missing,
    /// Field is present but has the wrong type
    WrongType { expected: &'static str },
    /// Field must not be empty
    Empty,
    /// Date string could not be parsed
    InvalidDate(String),
    /// The frontmatter block itself is not valid YAML
    Malformed(String),
}

impl fmt::Display for FieldProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldProblem::Missing => f.write_str("required field is missing"),
            FieldProblem::WrongType { expected } => write!(f, "expected {}", expected),
            FieldProblem::Empty => f.write_str("must not be empty"),
            FieldProblem::InvalidDate(value) => write!(f, "invalid date {:?}", value),
            FieldProblem::Malformed(reason) => write!(f, "malformed YAML ({})", reason),
        }
    }
}

/// A problem with one named frontmatter field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: String,
    pub problem: FieldProblem,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, problem: FieldProblem) -> Self {
        Self {
            field: field.into(),
            problem,
        }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.problem)
    }
}

/// Frontmatter of a file failed the collection schema
#[derive(Debug, Clone, Error)]
#[error("invalid frontmatter in {}: {}", .path.display(), join_issues(.issues))]
pub struct ValidationError {
    pub path: PathBuf,
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    /// Whether the given field is among the reported issues
    pub fn has_field(&self, field: &str) -> bool {
        self.issues.iter().any(|i| i.field == field)
    }
}

fn join_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A single file that could not be loaded into the collection
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Frontmatter failed validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Another file already claimed this id
    #[error("duplicate id {id:?} from {} (already loaded from {})", .path.display(), .existing.display())]
    DuplicateId {
        id: String,
        path: PathBuf,
        existing: PathBuf,
    },
}

impl LoadError {
    /// Path of the file that failed
    pub fn path(&self) -> &std::path::Path {
        match self {
            LoadError::Io { path, .. } => path,
            LoadError::Validation(e) => &e.path,
            LoadError::DuplicateId { path, .. } => path,
        }
    }
}

/// Errors from querying a loaded catalog
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// Malformed query options
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No post matches the requested id
    #[error("post not found: {0}")]
    NotFound(String),
}

impl CatalogError {
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument(reason.into())
    }
}

/// Result type for catalog queries
pub type CatalogResult<T> = Result<T, CatalogError>;
