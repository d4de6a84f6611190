// src/patch/unified.rs

//! Unified diff handling
//!
//! A patch file may touch several files. [`parse_diff`] splits it into one
//! [`FilePatch`] per file, keeping the paths recorded in the `---`/`+++`
//! headers. Hunk bodies are applied with `diffy`, which parses a single-file
//! diff at a time.
//!
//! Everything below the headers is handled as bytes: installed sources are
//! not guaranteed to be UTF-8 (PEP 263 coding declarations), and neither are
//! the diffs written against them.

use crate::error::{Error, Result};
use crate::filesystem::path::strip_components;
use std::path::PathBuf;

const DEV_NULL: &str = "/dev/null";

/// The diff for a single file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePatch {
    /// Path from the `---` header; `None` for `/dev/null` (file creation)
    pub old_path: Option<String>,
    /// Path from the `+++` header; `None` for `/dev/null` (file removal)
    pub new_path: Option<String>,
    /// Headers and hunks, normalized for `diffy`
    body: Vec<u8>,
}

/// Outcome of applying one file's diff to its current content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileApply {
    /// Diff applied; `None` means the file is removed
    Applied(Option<Vec<u8>>),
    /// The change is already present
    AlreadyApplied,
    /// Context lines do not match the current content
    ContextMismatch,
}

impl FilePatch {
    /// The path the diff was recorded against, as `patch` would pick it
    pub fn recorded_path(&self) -> Result<&str> {
        self.new_path
            .as_deref()
            .or(self.old_path.as_deref())
            .ok_or_else(|| Error::ParseError("diff section has no file path".to_string()))
    }

    /// The target path relative to the packages root after stripping
    pub fn resolve(&self, strip: u32) -> Result<PathBuf> {
        strip_components(self.recorded_path()?, strip)
    }

    /// Whether the diff creates a new file
    pub fn creates_file(&self) -> bool {
        self.old_path.is_none()
    }

    /// Whether the diff removes the file
    pub fn removes_file(&self) -> bool {
        self.new_path.is_none()
    }

    /// Apply the diff to the current content of its target
    ///
    /// `current` is `None` when the target does not exist. A file creation
    /// only applies to a missing target; against an existing file it is
    /// already applied if the file holds exactly what it would create.
    /// Any other diff is already applied when its reverse applies cleanly.
    pub fn apply(&self, current: Option<&[u8]>) -> Result<FileApply> {
        let patch = diffy::Patch::from_bytes(&self.body)
            .map_err(|e| Error::ParseError(format!("Invalid diff hunk: {}", e)))?;

        if self.creates_file() {
            let created = diffy::apply_bytes(b"", &patch)
                .map_err(|e| Error::ParseError(format!("Invalid file creation: {}", e)))?;
            return Ok(match current {
                None => FileApply::Applied(Some(created)),
                Some(existing) if existing == created.as_slice() => FileApply::AlreadyApplied,
                Some(_) => FileApply::ContextMismatch,
            });
        }

        let Some(base) = current else {
            return Ok(FileApply::ContextMismatch);
        };

        match diffy::apply_bytes(base, &patch) {
            Ok(content) if self.removes_file() && content.is_empty() => Ok(FileApply::Applied(None)),
            Ok(content) => Ok(FileApply::Applied(Some(content))),
            Err(_) if diffy::apply_bytes(base, &patch.reverse()).is_ok() => {
                Ok(FileApply::AlreadyApplied)
            }
            Err(_) => Ok(FileApply::ContextMismatch),
        }
    }
}

/// Split a unified diff into per-file sections
///
/// Preamble lines (`diff --git`, `index`, `Only in`, free text) are ignored.
/// Hunk line counts are honoured, so a removed line that itself starts with
/// `-- ` is not mistaken for the next file header.
pub fn parse_diff(content: &[u8]) -> Result<Vec<FilePatch>> {
    let lines: Vec<&[u8]> = content.split_inclusive(|&b| b == b'\n').collect();
    let mut sections = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let is_header = lines[i].starts_with(b"--- ")
            && lines.get(i + 1).is_some_and(|next| next.starts_with(b"+++ "));
        if !is_header {
            i += 1;
            continue;
        }

        let old_path = header_path(&lines[i][4..])?;
        let new_path = header_path(&lines[i + 1][4..])?;
        if old_path.is_none() && new_path.is_none() {
            return Err(Error::ParseError(
                "diff section has /dev/null on both sides".to_string(),
            ));
        }
        let label = new_path
            .as_deref()
            .or(old_path.as_deref())
            .unwrap_or(DEV_NULL)
            .to_string();

        let mut body = format!(
            "--- {}\n+++ {}\n",
            old_path.as_deref().unwrap_or(DEV_NULL),
            new_path.as_deref().unwrap_or(DEV_NULL)
        )
        .into_bytes();
        i += 2;

        let mut hunks = 0;
        while i < lines.len() && lines[i].starts_with(b"@@ ") {
            let (mut old_left, mut new_left) = parse_hunk_header(lines[i])?;
            push_line(&mut body, lines[i]);
            i += 1;
            hunks += 1;

            while (old_left > 0 || new_left > 0) && i < lines.len() {
                let line = lines[i];
                match line.first().copied() {
                    Some(b' ') => {
                        old_left = old_left.saturating_sub(1);
                        new_left = new_left.saturating_sub(1);
                        push_line(&mut body, line);
                    }
                    Some(b'-') => {
                        old_left = old_left.saturating_sub(1);
                        push_line(&mut body, line);
                    }
                    Some(b'+') => {
                        new_left = new_left.saturating_sub(1);
                        push_line(&mut body, line);
                    }
                    Some(b'\\') => push_line(&mut body, line),
                    // Editors strip the single space of empty context lines
                    Some(b'\n') | Some(b'\r') => {
                        old_left = old_left.saturating_sub(1);
                        new_left = new_left.saturating_sub(1);
                        body.push(b' ');
                        push_line(&mut body, line);
                    }
                    _ => {
                        return Err(Error::ParseError(format!(
                            "Unexpected line in hunk for {}: {}",
                            label,
                            String::from_utf8_lossy(line).trim_end()
                        )));
                    }
                }
                i += 1;
            }

            if old_left > 0 || new_left > 0 {
                return Err(Error::ParseError("diff ends in the middle of a hunk".to_string()));
            }

            while i < lines.len() && lines[i].starts_with(b"\\") {
                push_line(&mut body, lines[i]);
                i += 1;
            }
        }

        if hunks == 0 {
            return Err(Error::ParseError(format!(
                "diff section for {} has no hunks",
                label
            )));
        }

        sections.push(FilePatch {
            old_path,
            new_path,
            body,
        });
    }

    if sections.is_empty() {
        return Err(Error::ParseError("no file sections found in diff".to_string()));
    }

    Ok(sections)
}

/// Append a line, making sure it ends with a newline
fn push_line(body: &mut Vec<u8>, line: &[u8]) {
    body.extend_from_slice(line.strip_suffix(b"\n").unwrap_or(line));
    body.push(b'\n');
}

/// Extract the path from a `---`/`+++` header value
///
/// Drops the trailing timestamp (`\t2021-03-04 ...`) and surrounding quotes.
fn header_path(raw: &[u8]) -> Result<Option<String>> {
    let value = std::str::from_utf8(raw).map_err(|_| {
        Error::ParseError(format!(
            "diff header path is not valid UTF-8: {}",
            String::from_utf8_lossy(raw).trim_end()
        ))
    })?;
    let value = value.trim_end_matches(['\r', '\n']);
    let value = value.split('\t').next().unwrap_or(value).trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);

    if value.is_empty() || value == DEV_NULL {
        Ok(None)
    } else {
        Ok(Some(value.to_string()))
    }
}

/// Parse `@@ -a,b +c,d @@` into the old and new line counts
fn parse_hunk_header(line: &[u8]) -> Result<(usize, usize)> {
    let text = String::from_utf8_lossy(line);
    let invalid = || Error::ParseError(format!("Invalid hunk header: {}", text.trim_end()));

    let inner = text
        .strip_prefix("@@ ")
        .and_then(|rest| rest.split(" @@").next())
        .ok_or_else(invalid)?;

    let mut ranges = inner.split_whitespace();
    let old = ranges.next().and_then(|r| r.strip_prefix('-')).ok_or_else(invalid)?;
    let new = ranges.next().and_then(|r| r.strip_prefix('+')).ok_or_else(invalid)?;

    let count = |range: &str| -> Result<usize> {
        match range.split_once(',') {
            Some((_, n)) => n.parse().map_err(|_| invalid()),
            None => range.parse::<usize>().map(|_| 1).map_err(|_| invalid()),
        }
    };

    Ok((count(old)?, count(new)?))
}
