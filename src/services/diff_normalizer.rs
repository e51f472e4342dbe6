//! Unified diff hunk-header repair.
//!
//! Externally generated diffs frequently declare hunk line counts that do not
//! match their bodies, and `git apply` rejects those outright as corrupt
//! patches. The normalizer recounts every recognized hunk from its body and
//! rewrites the header; everything else passes through untouched.
//!
//! Normalization is total (it never fails) and idempotent.

use std::sync::OnceLock;

use regex::Regex;

/// Result of a normalization pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedDiff {
    /// Normalized text, terminated by exactly one newline.
    pub text: String,
    /// Number of recognized hunk headers.
    pub hunk_count: usize,
    /// Number of headers whose counts were rewritten.
    pub repaired_headers: usize,
}

/// Parsed `@@ -a[,b] +c[,d] @@trailing` header.
#[derive(Debug, Clone, PartialEq, Eq)]
struct HunkHeader {
    old_start: String,
    old_count: Option<usize>,
    new_start: String,
    new_count: Option<usize>,
    trailing: String,
}

/// A hunk whose body is still being counted.
struct OpenHunk {
    header_index: usize,
    header: HunkHeader,
    old_lines: usize,
    new_lines: usize,
}

fn hunk_header_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@(.*)$")
            .expect("hunk header pattern is valid")
    })
}

fn parse_header(line: &str) -> Option<HunkHeader> {
    let caps = hunk_header_regex().captures(line)?;
    // Counts too large for usize are treated as unrecognized rather than guessed.
    let count = |i: usize| -> Option<Option<usize>> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok().map(Some),
            None => Some(None),
        }
    };
    Some(HunkHeader {
        old_start: caps[1].to_string(),
        old_count: count(2)?,
        new_start: caps[3].to_string(),
        new_count: count(4)?,
        trailing: caps[5].to_string(),
    })
}

fn is_file_header(line: &str) -> bool {
    line.starts_with("diff ") || line.starts_with("--- ") || line.starts_with("+++ ")
}

impl OpenHunk {
    fn count(&mut self, line: &str) {
        match line.as_bytes().first() {
            Some(b'-') => self.old_lines += 1,
            Some(b'+') => self.new_lines += 1,
            // "\ No newline at end of file" annotates the previous line only.
            Some(b'\\') => {}
            _ => {
                self.old_lines += 1;
                self.new_lines += 1;
            }
        }
    }

    /// Rewritten header line, or `None` when the declared counts already match.
    fn rewrite(&self) -> Option<String> {
        let declared_old = self.header.old_count.unwrap_or(1);
        let declared_new = self.header.new_count.unwrap_or(1);
        if declared_old == self.old_lines && declared_new == self.new_lines {
            return None;
        }
        Some(format!(
            "@@ -{},{} +{},{} @@{}",
            self.header.old_start,
            self.old_lines,
            self.header.new_start,
            self.new_lines,
            self.header.trailing
        ))
    }
}

/// Normalize a unified diff; see [`normalize_with_stats`].
pub fn normalize(diff_text: &str) -> String {
    normalize_with_stats(diff_text).text
}

/// Normalize a unified diff and report what was found and repaired.
///
/// Carriage returns are stripped, trailing empty lines dropped, and every
/// recognized hunk header rewritten with counts recomputed from the hunk body.
/// A hunk ends at the next recognized header, at a file header line
/// (`diff `, `--- `, `+++ `), or at end of input.
pub fn normalize_with_stats(diff_text: &str) -> NormalizedDiff {
    let cleaned = diff_text.replace('\r', "");
    let mut lines: Vec<String> = cleaned.split('\n').map(str::to_string).collect();
    // Only truly empty lines: a lone space is a context line for an empty source line.
    while lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }

    let mut hunk_count = 0;
    let mut repaired_headers = 0;
    let mut open: Option<OpenHunk> = None;

    let mut close = |hunk: OpenHunk, lines: &mut Vec<String>| {
        if let Some(rewritten) = hunk.rewrite() {
            lines[hunk.header_index] = rewritten;
            repaired_headers += 1;
        }
    };

    for index in 0..lines.len() {
        let line = &lines[index];
        if let Some(header) = parse_header(line) {
            if let Some(previous) = open.take() {
                close(previous, &mut lines);
            }
            hunk_count += 1;
            open = Some(OpenHunk {
                header_index: index,
                header,
                old_lines: 0,
                new_lines: 0,
            });
        } else if is_file_header(line) {
            if let Some(previous) = open.take() {
                close(previous, &mut lines);
            }
        } else if let Some(hunk) = open.as_mut() {
            hunk.count(line);
        }
    }
    if let Some(last) = open.take() {
        close(last, &mut lines);
    }

    let mut text = lines.join("\n");
    text.push('\n');

    NormalizedDiff {
        text,
        hunk_count,
        repaired_headers,
    }
}
