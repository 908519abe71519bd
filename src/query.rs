//! Normalized search input shared by every source.

use crate::error::QueryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Binding preference. Only sources with a binding filter honor it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingHint {
    #[default]
    Any,
    Hardcover,
    Softcover,
}

impl FromStr for BindingHint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "any" => Ok(BindingHint::Any),
            "hardcover" | "hard" => Ok(BindingHint::Hardcover),
            "softcover" | "soft" | "paperback" => Ok(BindingHint::Softcover),
            _ => Err(format!("Unknown binding: {}. Use: any, hardcover, softcover", s)),
        }
    }
}

/// A single logical book query. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpec {
    author: Option<String>,
    title: Option<String>,
    keywords: Option<String>,
    language: Option<String>,
    publisher: Option<String>,
    binding: Option<BindingHint>,
}

impl QuerySpec {
    /// Starts building a query.
    pub fn builder() -> QuerySpecBuilder {
        QuerySpecBuilder::default()
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn keywords(&self) -> Option<&str> {
        self.keywords.as_deref()
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn publisher(&self) -> Option<&str> {
        self.publisher.as_deref()
    }

    pub fn binding(&self) -> Option<BindingHint> {
        self.binding
    }

    /// Author, title and keywords joined into one free-text string, for
    /// sources that only take a single search box.
    pub fn free_text(&self) -> String {
        [self.author(), self.title(), self.keywords()].into_iter().flatten().collect::<Vec<_>>().join(" ")
    }
}

impl fmt::Display for QuerySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.author(), self.title()) {
            (Some(author), Some(title)) => write!(f, "{} - {}", author, title)?,
            (Some(only), None) | (None, Some(only)) => write!(f, "{}", only)?,
            (None, None) => {}
        }
        if let Some(keywords) = self.keywords() {
            if self.author.is_some() || self.title.is_some() {
                write!(f, " ")?;
            }
            write!(f, "[{}]", keywords)?;
        }
        Ok(())
    }
}

/// Builder for [`QuerySpec`].
#[derive(Debug, Default)]
pub struct QuerySpecBuilder {
    spec: QuerySpec,
}

impl QuerySpecBuilder {
    pub fn author(mut self, author: impl AsRef<str>) -> Self {
        self.spec.author = clean(author.as_ref());
        self
    }

    pub fn title(mut self, title: impl AsRef<str>) -> Self {
        self.spec.title = clean(title.as_ref());
        self
    }

    pub fn keywords(mut self, keywords: impl AsRef<str>) -> Self {
        self.spec.keywords = clean(keywords.as_ref());
        self
    }

    pub fn language(mut self, language: impl AsRef<str>) -> Self {
        self.spec.language = clean(language.as_ref());
        self
    }

    pub fn publisher(mut self, publisher: impl AsRef<str>) -> Self {
        self.spec.publisher = clean(publisher.as_ref());
        self
    }

    pub fn binding(mut self, binding: BindingHint) -> Self {
        self.spec.binding = Some(binding);
        self
    }

    /// Validates and returns the query.
    pub fn build(self) -> Result<QuerySpec, QueryError> {
        let spec = self.spec;
        if spec.author.is_none() && spec.title.is_none() && spec.keywords.is_none() {
            return Err(QueryError::Empty);
        }
        Ok(spec)
    }
}

/// Collapses whitespace; blank input becomes `None`.
fn clean(value: &str) -> Option<String> {
    let joined = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}
