//! Spec-file filter chain.
//!
//! Filters are configured as [`SpecFileFilter`] values and normalized once
//! into a [`FilterChain`] of uniform async predicates. A file is kept unless at
//! least one filter answers `ignore: Some(true)`.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt, TryStreamExt, stream};
use regex::Regex;
use tracing::{debug, error};

use crate::error::FilterError;

/// Maximum number of filters, and of files, evaluated concurrently.
pub const MAX_IN_FLIGHT: usize = 20;

/// Answer of a single filter for a single file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterVerdict {
    /// `Some(true)` drops the file, `Some(false)` keeps it, `None` defers.
    pub ignore: Option<bool>,
}

impl FilterVerdict {
    pub fn ignore() -> Self {
        Self { ignore: Some(true) }
    }

    pub fn keep() -> Self {
        Self {
            ignore: Some(false),
        }
    }

    pub fn no_opinion() -> Self {
        Self { ignore: None }
    }
}

pub type FilterFuture = BoxFuture<'static, anyhow::Result<FilterVerdict>>;
pub type FilterFn = Arc<dyn Fn(String) -> FilterFuture + Send + Sync>;

/// A configured spec-file filter.
#[derive(Clone)]
pub enum SpecFileFilter {
    /// Compiled as a regular expression; matching files are ignored.
    Literal(String),
    /// Matching files are ignored.
    Pattern(Regex),
    /// Arbitrary async predicate.
    Predicate(FilterFn),
}

impl SpecFileFilter {
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    pub fn pattern(regex: Regex) -> Self {
        Self::Pattern(regex)
    }

    /// Wrap an async closure taking the file path.
    pub fn predicate<F, Fut>(predicate: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<FilterVerdict>> + Send + 'static,
    {
        Self::Predicate(Arc::new(move |path| predicate(path).boxed()))
    }
}

impl fmt::Debug for SpecFileFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Pattern(regex) => f.debug_tuple("Pattern").field(&regex.as_str()).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Normalized filters, ready to evaluate.
#[derive(Clone, Default)]
pub struct FilterChain {
    filters: Vec<FilterFn>,
}

impl FilterChain {
    /// Normalize configured filters. Literals that are not valid patterns fail here.
    pub fn new(filters: &[SpecFileFilter]) -> Result<Self, FilterError> {
        let filters = filters
            .iter()
            .enumerate()
            .map(|(index, filter)| normalize(index, filter))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { filters })
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Keep the files no filter ignores, in input order.
    ///
    /// The first failing filter aborts the whole chain.
    pub async fn filter_spec_files(&self, paths: Vec<String>) -> Result<Vec<String>, FilterError> {
        if self.is_empty() {
            return Ok(paths);
        }

        let decisions: Vec<Option<String>> = stream::iter(paths)
            .map(|path| async move {
                let keep = self.keeps(&path).await?;
                if !keep {
                    debug!(path = %path, "spec file ignored by filter");
                }
                Ok::<_, FilterError>(keep.then_some(path))
            })
            .buffered(MAX_IN_FLIGHT)
            .try_collect()
            .await?;

        Ok(decisions.into_iter().flatten().collect())
    }

    async fn keeps(&self, path: &str) -> Result<bool, FilterError> {
        let verdicts: Vec<FilterVerdict> = stream::iter(self.filters.iter().enumerate())
            .map(|(index, filter)| {
                let path = path.to_string();
                async move {
                    filter(path.clone()).await.map_err(|error| {
                        error!(index, path = %path, error = %format!("{error:#}"), "spec file filter failed");
                        FilterError::Filter { index, path, error }
                    })
                }
            })
            .buffer_unordered(MAX_IN_FLIGHT)
            .try_collect()
            .await?;
        Ok(!verdicts.iter().any(|verdict| verdict.ignore == Some(true)))
    }
}

fn normalize(index: usize, filter: &SpecFileFilter) -> Result<FilterFn, FilterError> {
    match filter {
        SpecFileFilter::Literal(literal) => {
            let regex = Regex::new(literal).map_err(|source| FilterError::InvalidLiteral {
                index,
                literal: literal.clone(),
                source,
            })?;
            Ok(ignore_if_match(regex))
        }
        SpecFileFilter::Pattern(regex) => Ok(ignore_if_match(regex.clone())),
        SpecFileFilter::Predicate(predicate) => Ok(Arc::clone(predicate)),
    }
}

fn ignore_if_match(regex: Regex) -> FilterFn {
    Arc::new(move |path: String| {
        let ignore = regex.is_match(&path);
        async move { Ok(FilterVerdict { ignore: Some(ignore) }) }.boxed()
    })
}
