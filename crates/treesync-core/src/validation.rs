//! Path validation filters
//!
//! A [`Validator`] is an ordered list of predicates over a path string. A
//! path is accepted when every predicate accepts it; evaluation stops at the
//! first rejection. Adapters receive their validator at construction and
//! never change it afterwards.
//!
//! Both built-in filters look at the final path segment only, so a pattern
//! such as `^__` rejects `/src/__pycache__` without having to account for
//! the leading directories.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::config::FiltersConfig;
use crate::domain::record::{extension_of, name_of};

/// Name patterns excluded by default (VCS, virtualenvs, dependency and
/// build directories, dotfiles)
pub const DEFAULT_EXCLUDED_NAMES: &[&str] = &[
    "__",
    "l_env",
    "env",
    "venv",
    r"\.",
    "node_modules$",
    "lib$",
    "dist$",
    "build$",
];

/// File extensions excluded by default (compiled artifacts, shortcuts)
pub const DEFAULT_EXCLUDED_FORMATS: &[&str] = &["pyc", "pyd", "lnk", "toc"];

/// A single predicate over a path
pub trait PathFilter: Send + Sync {
    /// Returns true when `path` may be synchronized
    fn accepts(&self, path: &str) -> bool;
}

impl<F> PathFilter for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn accepts(&self, path: &str) -> bool {
        self(path)
    }
}

// ============================================================================
// Name filter
// ============================================================================

/// Rejects paths whose name matches one of a set of regular expressions
///
/// Patterns are anchored at the start of the name, the same way a
/// match-from-start regex call behaves. A trailing `$` anchors the end.
#[derive(Debug, Clone)]
pub struct NameFilter {
    patterns: Vec<Regex>,
}

impl NameFilter {
    /// Compiles `patterns`, failing on the first invalid expression
    pub fn new<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| Regex::new(&format!("^(?:{})", p.as_ref())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Filter with [`DEFAULT_EXCLUDED_NAMES`]
    pub fn with_defaults() -> Result<Self, regex::Error> {
        Self::new(DEFAULT_EXCLUDED_NAMES)
    }
}

impl PathFilter for NameFilter {
    fn accepts(&self, path: &str) -> bool {
        let name = name_of(path);
        !self.patterns.iter().any(|re| re.is_match(name))
    }
}

// ============================================================================
// Format filter
// ============================================================================

/// Rejects paths whose extension is in an exclusion set
///
/// Names without a `.` have no extension and are always accepted.
#[derive(Debug, Clone, Default)]
pub struct FormatFilter {
    excluded: HashSet<String>,
}

impl FormatFilter {
    pub fn new<I, S>(formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            excluded: formats
                .into_iter()
                .map(|f| f.into().trim_start_matches('.').to_string())
                .collect(),
        }
    }

    /// Filter with [`DEFAULT_EXCLUDED_FORMATS`]
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_EXCLUDED_FORMATS.iter().copied())
    }
}

impl PathFilter for FormatFilter {
    fn accepts(&self, path: &str) -> bool {
        let name = name_of(path);
        if !name.contains('.') {
            return true;
        }
        !self.excluded.contains(extension_of(name))
    }
}

// ============================================================================
// Validator
// ============================================================================

/// Ordered, short-circuiting AND over a list of filters
#[derive(Clone, Default)]
pub struct Validator {
    filters: Vec<Arc<dyn PathFilter>>,
}

impl Validator {
    /// An empty validator, accepting every path
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a filter to the chain
    pub fn with_filter(mut self, filter: impl PathFilter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Name and format filters built from configuration
    pub fn from_filters(config: &FiltersConfig) -> Result<Self, regex::Error> {
        Ok(Self::new()
            .with_filter(NameFilter::new(&config.excluded_names)?)
            .with_filter(FormatFilter::new(config.excluded_formats.iter().cloned())))
    }

    /// Name and format filters with the built-in exclusion lists
    pub fn with_defaults() -> Result<Self, regex::Error> {
        Ok(Self::new()
            .with_filter(NameFilter::with_defaults()?)
            .with_filter(FormatFilter::with_defaults()))
    }

    pub fn validate(&self, path: &str) -> bool {
        self.filters.iter().all(|filter| filter.accepts(path))
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("filters", &self.filters.len())
            .finish()
    }
}
