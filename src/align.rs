//! Best-effort alignment of clause results onto the lines of the source text.
//!
//! The backend does not report character offsets, so each source line is
//! matched against the result list with a text heuristic. Short or repeated
//! boilerplate lines can occasionally attach to the wrong clause.

use crate::types::{ClauseId, ClauseResult};
use std::collections::BTreeMap;

/// Number of leading clause characters compared against a line's start.
pub const PREFIX_CHARS: usize = 15;
/// A line must be longer than this to match by containment.
pub const MIN_CONTAINED_CHARS: usize = 10;

/// Mapping from source-line ordinal to the clause that line belongs to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignmentIndex {
    lines: BTreeMap<usize, ClauseId>,
}

impl AlignmentIndex {
    /// Clause aligned to `line`, if any.
    pub fn get(&self, line: usize) -> Option<&ClauseId> {
        self.lines.get(&line)
    }

    /// Aligned lines in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &ClauseId)> {
        self.lines.iter().map(|(line, id)| (*line, id))
    }

    /// All lines aligned to `id`, ascending.
    pub fn lines_for<'a>(&'a self, id: &'a ClauseId) -> impl Iterator<Item = usize> + 'a {
        self.iter()
            .filter(move |(_, candidate)| *candidate == id)
            .map(|(line, _)| line)
    }

    /// First line aligned to `id`; where presentation code anchors the clause.
    pub fn first_line_for(&self, id: &ClauseId) -> Option<usize> {
        self.lines_for(id).next()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

pub struct ClauseAligner;

impl ClauseAligner {
    /// Align `results` onto the `\n`-separated lines of `text`.
    ///
    /// Each trimmed, non-blank line goes to the first result whose clause
    /// starts the line (compared on the first [`PREFIX_CHARS`] characters) or
    /// contains it verbatim (lines over [`MIN_CONTAINED_CHARS`] characters
    /// only). A clause whose prefix trims to nothing never matches by prefix,
    /// so a blank clause cannot claim every line of the document.
    pub fn align(text: &str, results: &[ClauseResult]) -> AlignmentIndex {
        let prefixes: Vec<String> = results.iter().map(|r| clause_prefix(&r.clause)).collect();

        let lines = text
            .split('\n')
            .enumerate()
            .filter_map(|(ordinal, line)| {
                let line = line.trim();
                if line.is_empty() {
                    return None;
                }
                results
                    .iter()
                    .zip(&prefixes)
                    .find(|(result, prefix)| line_matches(line, result, prefix))
                    .map(|(result, _)| (ordinal, result.id.clone()))
            })
            .collect();

        AlignmentIndex { lines }
    }
}

fn clause_prefix(clause: &str) -> String {
    clause
        .chars()
        .take(PREFIX_CHARS)
        .collect::<String>()
        .trim()
        .to_string()
}

// `line` is already trimmed and non-empty.
fn line_matches(line: &str, result: &ClauseResult, prefix: &str) -> bool {
    if !prefix.is_empty() && line.starts_with(prefix) {
        return true;
    }
    line.chars().count() > MIN_CONTAINED_CHARS && result.clause.contains(line)
}
