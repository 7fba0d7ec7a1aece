//! Query options over the loaded posts

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::content::BlogPost;
use crate::error::{CatalogError, CatalogResult};

/// Field to sort query results by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    PubDate,
    Title,
}

impl FromStr for SortBy {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pubDate" => Ok(SortBy::PubDate),
            "title" => Ok(SortBy::Title),
            other => Err(CatalogError::invalid_argument(format!(
                "unknown sort field {:?} (expected pubDate or title)",
                other
            ))),
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortBy::PubDate => f.write_str("pubDate"),
            SortBy::Title => f.write_str("title"),
        }
    }
}

/// Direction of the sort
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(CatalogError::invalid_argument(format!(
                "unknown sort order {:?} (expected asc or desc)",
                other
            ))),
        }
    }
}

/// Filter, sort and limit options; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlogQueryOptions {
    /// Keep posts carrying this tag
    pub tag: Option<String>,
    /// Keep posts carrying all of these tags
    pub tags: Option<Vec<String>>,
    /// Keep posts by this author
    pub author: Option<String>,
    /// Maximum number of results; negative values are rejected
    pub limit: Option<i64>,
    pub sort_by: Option<SortBy>,
    pub sort_order: Option<SortOrder>,
}

impl BlogQueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn sort(mut self, sort_by: SortBy, sort_order: SortOrder) -> Self {
        self.sort_by = Some(sort_by);
        self.sort_order = Some(sort_order);
        self
    }

    /// The limit as a count, rejecting negative values
    fn checked_limit(&self) -> CatalogResult<Option<usize>> {
        match self.limit {
            None => Ok(None),
            Some(limit) => usize::try_from(limit).map(Some).map_err(|_| {
                CatalogError::invalid_argument(format!("limit must not be negative, got {}", limit))
            }),
        }
    }

    fn matches(&self, post: &BlogPost) -> bool {
        if let Some(tag) = &self.tag {
            if !post.has_tag(tag) {
                return false;
            }
        }

        if let Some(tags) = &self.tags {
            if !tags.iter().all(|t| post.has_tag(t)) {
                return false;
            }
        }

        if let Some(author) = &self.author {
            if &post.data.author != author {
                return false;
            }
        }

        true
    }

    /// The sort to apply, if any
    ///
    /// Without either sort option discovery order is kept; an order on its
    /// own sorts by publication date.
    fn effective_sort(&self) -> Option<(SortBy, SortOrder)> {
        match (self.sort_by, self.sort_order) {
            (None, None) => None,
            (by, order) => Some((by.unwrap_or(SortBy::PubDate), order.unwrap_or_default())),
        }
    }

    /// Filter, sort and truncate posts
    pub fn apply<'a, I>(&self, posts: I) -> CatalogResult<Vec<&'a BlogPost>>
    where
        I: IntoIterator<Item = &'a BlogPost>,
    {
        let limit = self.checked_limit()?;

        let mut results: Vec<&BlogPost> = posts.into_iter().filter(|p| self.matches(p)).collect();

        if let Some((by, order)) = self.effective_sort() {
            results.sort_by(|a, b| {
                let ordering = compare(a, b, by);
                match order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            });
        }

        if let Some(limit) = limit {
            results.truncate(limit);
        }

        Ok(results)
    }
}

fn compare(a: &BlogPost, b: &BlogPost, by: SortBy) -> Ordering {
    match by {
        SortBy::PubDate => a.data.pub_date.cmp(&b.data.pub_date),
        SortBy::Title => a.data.title.cmp(&b.data.title),
    }
}
