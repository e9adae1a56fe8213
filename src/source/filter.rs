//! Include/exclude filters applied to metric names at startup.

use regex::Regex;

/// Metrics hidden unless `--all` is given.
const DEFAULT_EXCLUDES: &[&str] = &["^mock$"];

/// Basic subset selected by `--basic`.
const BASIC_INCLUDES: &[&str] = &["^(cpu|load/1)$", "^procs/(running|blocked)$"];

fn compile(patterns: &[&str]) -> impl Iterator<Item = Pattern> {
    patterns
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .map(Pattern::Regex)
}

#[derive(Debug, Clone)]
enum Pattern {
    Regex(Regex),
    Substring(String),
}

impl Pattern {
    fn is_match(&self, metric: &str) -> bool {
        match self {
            Pattern::Regex(re) => re.is_match(metric),
            Pattern::Substring(s) => metric.contains(s.as_str()),
        }
    }
}

/// Decides which metrics are emitted.
///
/// A metric is emitted when it matches no exclude pattern and, if any include
/// pattern is configured, matches at least one of them.
#[derive(Debug, Clone, Default)]
pub struct MetricFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl MetricFilter {
    /// Filter that accepts every metric.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter with the built-in excludes.
    pub fn with_defaults() -> Self {
        Self {
            include: Vec::new(),
            exclude: compile(DEFAULT_EXCLUDES).collect(),
        }
    }

    /// Adds the built-in basic metric subset to the includes.
    pub fn with_basic(mut self) -> Self {
        self.include.extend(compile(BASIC_INCLUDES));
        self
    }

    /// Adds an include pattern.
    pub fn include(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.include.push(Pattern::Regex(Regex::new(pattern)?));
        Ok(self)
    }

    /// Includes metrics containing `substring`.
    pub fn include_substring(mut self, substring: &str) -> Self {
        self.include.push(Pattern::Substring(substring.to_string()));
        self
    }

    /// Excludes metrics containing `substring`.
    pub fn exclude_substring(mut self, substring: &str) -> Self {
        self.exclude.push(Pattern::Substring(substring.to_string()));
        self
    }

    pub fn accepts(&self, metric: &str) -> bool {
        if self.exclude.iter().any(|p| p.is_match(metric)) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|p| p.is_match(metric))
    }
}
