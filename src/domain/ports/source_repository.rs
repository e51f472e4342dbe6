//! Source repository port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;

/// The working tree and its branches.
///
/// Only the safe-apply gate writes through this port (plus the controller's
/// push of an already-committed branch).
#[async_trait]
pub trait SourceRepository: Send + Sync {
    /// Name of the checked-out branch.
    async fn current_branch(&self) -> DomainResult<String>;

    /// True when there are no staged, unstaged, or untracked changes.
    async fn is_clean(&self) -> DomainResult<bool>;

    /// Whether a local branch with this name exists.
    async fn branch_exists(&self, name: &str) -> DomainResult<bool>;

    /// Check that `patch` applies cleanly without touching the tree.
    async fn check_patch(&self, patch: &str) -> DomainResult<()>;

    /// Create `name` from HEAD and switch to it. Fails if it already exists.
    async fn create_branch(&self, name: &str) -> DomainResult<()>;

    /// Apply `patch` to the working tree.
    async fn apply_patch(&self, patch: &str) -> DomainResult<()>;

    /// Stage every change, including new and deleted files.
    async fn stage_all(&self) -> DomainResult<()>;

    /// Commit staged changes; returns the commit id.
    async fn commit(&self, message: &str) -> DomainResult<String>;

    /// Drop all uncommitted changes and untracked files.
    async fn discard_changes(&self) -> DomainResult<()>;

    /// Switch to an existing branch.
    async fn switch_branch(&self, name: &str) -> DomainResult<()>;

    /// Force-delete a local branch.
    async fn delete_branch(&self, name: &str) -> DomainResult<()>;

    /// Push `branch` to `remote`, setting upstream.
    async fn push_branch(&self, remote: &str, branch: &str) -> DomainResult<()>;
}
