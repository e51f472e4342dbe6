//! Patch proposal model.

use serde::Serialize;

/// A normalized patch ready for the safe-apply gate.
///
/// Lives only inside one gate invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchProposal {
    /// Diff text after hunk-count repair, terminated by exactly one newline.
    pub normalized_text: String,
    /// Number of recognized hunk headers.
    pub hunk_count: usize,
    /// Number of hunk headers whose counts were rewritten.
    pub repaired_headers: usize,
    /// One-line description used for the commit message.
    pub description: String,
}

impl PatchProposal {
    pub fn is_empty(&self) -> bool {
        self.normalized_text.trim().is_empty()
    }
}
