//! Commit metadata from `.patch` files.
//!
//! The runner stores each commit as a patch whose header block is the VCS
//! log entry: `commit`, `Author:`, `AuthorDate:`, `Commit:`, `CommitDate:`,
//! a blank line, the title, then the body with its trailer lines. Only the
//! header and trailers are mined; the diff itself is left alone.

use regex::Regex;

use crate::report::CommitMeta;

const FDO_BUG_URL: &str = "https://bugs.freedesktop.org/show_bug.cgi?id=";

fn fdo_regex() -> Regex {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"fdo#(?P<id>\d+)").unwrap()
}

/// Extract commit metadata from a patch's log header and body trailers.
pub fn parse_patch(contents: &str) -> CommitMeta {
    let mut meta = CommitMeta::default();
    let fdo = fdo_regex();
    let mut in_header = true;

    for line in contents.lines() {
        // The diff starts the moment a hunk marker appears.
        if line.starts_with("diff ") || line.starts_with("---") {
            break;
        }

        if in_header {
            if let Some(rest) = line.strip_prefix("Author:") {
                meta.author = Some(rest.trim().to_string());
            } else if let Some(rest) = line.strip_prefix("AuthorDate:") {
                meta.author_date = Some(rest.trim().to_string());
            } else if let Some(rest) = line.strip_prefix("CommitDate:") {
                meta.commit_date = Some(rest.trim().to_string());
            } else if line.trim().is_empty() {
                in_header = false;
            }
            continue;
        }

        let trimmed = line.trim();
        if meta.title.is_none() {
            if !trimmed.is_empty() {
                meta.title = Some(trimmed.to_string());
            }
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix("Signed-off-by:") {
            meta.signed_off_by.push(rest.trim().to_string());
        } else if let Some(rest) = trimmed.strip_prefix("Reviewed-by:") {
            meta.reviewed_by.push(rest.trim().to_string());
        } else if let Some(rest) = trimmed.strip_prefix("Tested-by:") {
            meta.tested_by.push(rest.trim().to_string());
        } else if let Some(rest) = trimmed
            .strip_prefix("Bugzilla:")
            .or_else(|| trimmed.strip_prefix("Fixes:"))
        {
            let bug = rest.trim().to_string();
            if !bug.is_empty() && !meta.bugs.contains(&bug) {
                meta.bugs.push(bug);
            }
        }
        for caps in fdo.captures_iter(trimmed) {
            let url = format!("{FDO_BUG_URL}{}", &caps["id"]);
            if !meta.bugs.contains(&url) {
                meta.bugs.push(url);
            }
        }
    }

    meta
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATCH: &str = "\
commit 1a2b3c4d5e6f
Author:     Ada Example <ada@example.org>
AuthorDate: Mon Mar 7 10:00:00 2016 +0100
Commit:     Bob Example <bob@example.org>
CommitDate: Tue Mar 8 09:00:00 2016 +0100

    i965: avoid redundant state upload

    This fixes fdo#94321 on gen8 platforms.

    Bugzilla: https://bugs.example.org/1234
    Signed-off-by: Ada Example <ada@example.org>
    Reviewed-by: Bob Example <bob@example.org>
---
 src/mesa/thing.c | 2 +-
";

    #[test]
    fn parses_header_title_and_trailers() {
        let meta = parse_patch(PATCH);
        assert_eq!(meta.author.as_deref(), Some("Ada Example <ada@example.org>"));
        assert_eq!(
            meta.commit_date.as_deref(),
            Some("Tue Mar 8 09:00:00 2016 +0100")
        );
        assert_eq!(meta.title.as_deref(), Some("i965: avoid redundant state upload"));
        assert_eq!(meta.signed_off_by, vec!["Ada Example <ada@example.org>"]);
        assert_eq!(meta.reviewed_by, vec!["Bob Example <bob@example.org>"]);
    }

    #[test]
    fn collects_bug_references_without_duplicates() {
        let meta = parse_patch(PATCH);
        assert_eq!(
            meta.bugs,
            vec![
                "https://bugs.freedesktop.org/show_bug.cgi?id=94321",
                "https://bugs.example.org/1234",
            ]
        );
    }

    #[test]
    fn empty_patch_yields_empty_meta() {
        assert_eq!(parse_patch(""), CommitMeta::default());
    }
}
