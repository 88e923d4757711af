//! Event payload types for the synthesized report timeline.

use std::fmt;

/// A commit as referenced from an event: short hash, display label and the
/// position in the authoritative commit history (newest commit at index 0).
/// The position is `None` when no history was supplied or the commit is not
/// part of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRef {
    pub sha1: String,
    pub label: String,
    pub history_index: Option<usize>,
}

impl CommitRef {
    pub fn new(sha1: impl Into<String>) -> Self {
        let sha1 = sha1.into();
        Self {
            label: sha1.clone(),
            sha1,
            history_index: None,
        }
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.history_index = Some(index);
        self
    }
}

impl fmt::Display for CommitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// A pair of commits bounding an observed transition. `old` is `None` when
/// the transition is visible on the very first processed commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRange {
    pub old: Option<CommitRef>,
    pub new: CommitRef,
}

impl CommitRange {
    pub fn new(old: Option<CommitRef>, new: CommitRef) -> Self {
        Self { old, new }
    }

    /// Number of history positions between the two endpoints. `None` when
    /// either endpoint has no history position.
    ///
    /// Positions are newest-first, so the old commit carries the larger
    /// index. Assumes contiguous positions; histories with gaps (filtered
    /// merge commits) are a documented limitation.
    pub fn distance(&self) -> Option<usize> {
        let old_idx = self.old.as_ref()?.history_index?;
        let new_idx = self.new.history_index?;
        Some(old_idx.saturating_sub(new_idx))
    }

    /// True when the transition is already pinned down to a single commit
    /// and no further bisection can narrow it.
    pub fn is_single_commit(&self) -> bool {
        self.distance().map_or(true, |d| d <= 1)
    }
}

impl fmt::Display for CommitRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.old {
            Some(old) => write!(f, "{} -> {}", old, self.new),
            None => write!(f, "{}", self.new),
        }
    }
}

/// Discriminant of an [`Event`], used for scoring and log labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    BuildBroken,
    BuildFixed,
    PerfChange,
    InsufficientSignificance,
    UnitResultChange,
    UnitResultUnstable,
}

/// A typed observation about a transition between commits (or instability
/// inside one commit).
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The build status flipped from working to broken inside `range`.
    BuildBroken { range: CommitRange },

    /// The build status flipped back; `broken` is the range that introduced
    /// the breakage, `fixed` the range that repaired it.
    BuildFixed { broken: CommitRange, fixed: CommitRange },

    /// A statistically significant performance change of one benchmark.
    PerfChange {
        benchmark: String,
        range: CommitRange,
        old_value: f64,
        new_value: f64,
        confidence: f64,
    },

    /// A result whose confidence margin exceeds the wanted margin.
    InsufficientSignificance {
        benchmark: String,
        commit: CommitRef,
        margin: f64,
        wanted_margin: f64,
        /// Samples currently recorded for the result.
        rounds: usize,
    },

    /// A sub-test's stabilized status changed between two commits.
    UnitResultChange {
        benchmark: String,
        subtest: String,
        range: CommitRange,
        old_status: String,
        new_status: String,
    },

    /// A sub-test produced different statuses across repeated runs of the
    /// same commit.
    UnitResultUnstable {
        benchmark: String,
        subtest: String,
        commit: CommitRef,
        old_status: String,
        new_status: String,
    },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::BuildBroken { .. } => EventKind::BuildBroken,
            Self::BuildFixed { .. } => EventKind::BuildFixed,
            Self::PerfChange { .. } => EventKind::PerfChange,
            Self::InsufficientSignificance { .. } => EventKind::InsufficientSignificance,
            Self::UnitResultChange { .. } => EventKind::UnitResultChange,
            Self::UnitResultUnstable { .. } => EventKind::UnitResultUnstable,
        }
    }

    /// Relative performance delta of a [`Event::PerfChange`], `new/old - 1`.
    /// Infinite when the old value was 0. `None` for other variants.
    pub fn perf_diff(&self) -> Option<f64> {
        match self {
            Self::PerfChange {
                old_value,
                new_value,
                ..
            } => {
                if *old_value != 0.0 {
                    Some(new_value / old_value - 1.0)
                } else {
                    Some(f64::INFINITY)
                }
            }
            _ => None,
        }
    }
}

// Display texts are consumed verbatim by report front-ends, keep them stable.
impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::BuildBroken { range } => {
                write!(f, "build broken between {range}")
            }
            Event::BuildFixed { broken, fixed } => {
                write!(f, "build fixed between {fixed} (broken since {broken})")
            }
            Event::PerfChange {
                benchmark,
                range,
                old_value,
                new_value,
                confidence,
            } => {
                let diff = self.perf_diff().unwrap_or(f64::INFINITY);
                write!(
                    f,
                    "{benchmark}: perf changed from {old_value:.2} to {new_value:.2} \
                     ({:+.2}%) between {range} with confidence {:.2}%",
                    diff * 100.0,
                    confidence * 100.0
                )
            }
            Event::InsufficientSignificance {
                benchmark,
                commit,
                margin,
                wanted_margin,
                rounds,
            } => write!(
                f,
                "{benchmark} on {commit}: margin {:.2}% exceeds the wanted {:.2}% \
                 (n={rounds})",
                margin * 100.0,
                wanted_margin * 100.0
            ),
            Event::UnitResultChange {
                benchmark,
                subtest,
                range,
                old_status,
                new_status,
            } => write!(
                f,
                "{benchmark}[{subtest}]: status went from {old_status} to {new_status} \
                 between {range}"
            ),
            Event::UnitResultUnstable {
                benchmark,
                subtest,
                commit,
                old_status,
                new_status,
            } => write!(
                f,
                "{benchmark}[{subtest}] is unstable on {commit}: {old_status} then \
                 {new_status} across repeated runs"
            ),
        }
    }
}
