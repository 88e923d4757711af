//! Authoritative commit ordering.
//!
//! Every ordering-dependent decision (event synthesis, bisection,
//! history weighting) uses positions in this sequence, never the order
//! result files happened to be discovered in. Entries are newest first,
//! so index 0 is the most recent commit.

use benchwatch_core::errors::HistoryError;
use git2::{Repository, Sort};
use tracing::debug;

fn walk_err(e: git2::Error) -> HistoryError {
    HistoryError::WalkFailed {
        message: e.message().to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub sha1: String,
    pub timestamp: i64,
}

/// A linearized commit history, newest first.
#[derive(Debug, Clone, Default)]
pub struct CommitHistory {
    entries: Vec<HistoryEntry>,
}

impl CommitHistory {
    pub fn new(entries: Vec<HistoryEntry>) -> Self {
        Self { entries }
    }

    /// Walk the repository at `path` from HEAD, newest first.
    pub fn from_repo(path: &str) -> Result<Self, HistoryError> {
        let repo = Repository::open(path).map_err(|e| HistoryError::RepoOpenFailed {
            path: path.to_string(),
            message: e.message().to_string(),
        })?;
        let mut walk = repo.revwalk().map_err(walk_err)?;
        walk.push_head().map_err(walk_err)?;
        walk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME).map_err(walk_err)?;

        let mut entries = Vec::new();
        for oid in walk {
            let oid = oid.map_err(walk_err)?;
            let commit = repo.find_commit(oid).map_err(walk_err)?;
            entries.push(HistoryEntry {
                sha1: oid.to_string(),
                timestamp: commit.time().seconds(),
            });
        }
        debug!(path, commits = entries.len(), "walked repository history");
        Ok(Self { entries })
    }

    /// Parse `<hash> <unix-timestamp>` lines, as produced by a VCS log
    /// command. Accepts either newest-first or oldest-first input; pass
    /// the result through [`Self::reversed`] when the source is oldest
    /// first.
    pub fn from_log_text(text: &str) -> Result<Self, HistoryError> {
        let mut entries = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split_whitespace();
            let entry = match (fields.next(), fields.next()) {
                (Some(sha1), Some(ts)) => match ts.parse::<i64>() {
                    Ok(timestamp) => HistoryEntry {
                        sha1: sha1.to_string(),
                        timestamp,
                    },
                    Err(_) => {
                        return Err(HistoryError::MalformedLine {
                            line_no: line_no + 1,
                            line: line.to_string(),
                        })
                    }
                },
                _ => {
                    return Err(HistoryError::MalformedLine {
                        line_no: line_no + 1,
                        line: line.to_string(),
                    })
                }
            };
            entries.push(entry);
        }
        Ok(Self { entries })
    }

    pub fn reversed(mut self) -> Self {
        self.entries.reverse();
        self
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn sha_at(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|e| e.sha1.as_str())
    }

    /// Position of a commit, matched by hash prefix in either direction
    /// since result files carry shortened hashes.
    pub fn position_of(&self, sha1: &str) -> Option<usize> {
        if sha1.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .position(|e| e.sha1.starts_with(sha1) || sha1.starts_with(&e.sha1))
    }

    /// Bisection midpoint between two positions (`old_index > new_index`).
    ///
    /// Adjacent or equal positions need no bisection and yield `None`, as
    /// does a midpoint that degenerates onto either endpoint.
    pub fn midpoint(&self, old_index: usize, new_index: usize) -> Option<usize> {
        if old_index <= new_index || old_index - new_index <= 1 {
            return None;
        }
        let mid = old_index - (old_index - new_index) / 2;
        if mid == old_index || mid == new_index {
            return None;
        }
        Some(mid)
    }
}
