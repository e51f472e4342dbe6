//! Common test utilities for integration tests
//!
//! Provides a scratch git repository plus in-memory fakes for the four ports
//! the services depend on.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;

use remedy::domain::errors::{DomainResult, RemediationError};
use remedy::domain::models::{
    DiagnosticMode, DiagnosticRecord, EvidenceBundle, EvidenceItem, EvidenceKind, RiskLevel,
    RunConclusion, RunHandle, RunId, RunStatus, CONTRACT_VERSION,
};
use remedy::domain::ports::{EvidenceCollector, Oracle, PipelineProvider, SourceRepository};

/// Branch the fixtures start on. Not protected.
#[allow(dead_code)]
pub const WORK_BRANCH: &str = "feature";

/// A patch that applies to the fixture repo's `a.txt`, with a wrong hunk header.
#[allow(dead_code)]
pub const MISCOUNTED_PATCH: &str =
    "--- a/a.txt\n+++ b/a.txt\n@@ -1,7 +1,9 @@\n-a\n+b\n+c\n";

/// Setup test logging
///
/// Call this at the beginning of tests that need log output.
#[allow(dead_code)]
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Run a git command in `path`, asserting it succeeds.
#[allow(dead_code)]
pub fn git(path: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(path)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Read the output of a git command in `path`.
#[allow(dead_code)]
pub fn git_output(path: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(path)
        .output()
        .expect("Failed to run git");
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Setup a git repository in a temp directory for testing
///
/// The repo has one commit tracking `a.txt` (containing `a`) and is checked
/// out on [`WORK_BRANCH`]. Keep the `TempDir` alive for the test's duration.
#[allow(dead_code)]
pub fn setup_test_git_repo() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir for git repo");
    let path = dir.path().to_path_buf();

    git(&path, &["init", "--quiet"]);
    git(&path, &["config", "user.email", "test@test.com"]);
    git(&path, &["config", "user.name", "Test User"]);
    git(&path, &["config", "commit.gpgsign", "false"]);

    std::fs::write(path.join("a.txt"), "a\n").expect("Failed to write a.txt");
    git(&path, &["add", "a.txt"]);
    git(&path, &["commit", "--quiet", "-m", "initial commit"]);
    git(&path, &["checkout", "--quiet", "-b", WORK_BRANCH]);

    (dir, path)
}

/// Evidence bundle with a single run log item, `E1`.
#[allow(dead_code)]
pub fn evidence_bundle() -> EvidenceBundle {
    EvidenceBundle::new(vec![EvidenceItem::new(
        "E1",
        EvidenceKind::RunLog,
        json!("error: expected `b`, found `a`"),
    )])
    .expect("valid bundle")
}

/// A complete `combined` oracle response.
#[allow(dead_code)]
pub fn combined_response(confidence: u8, risk: &str, patch: &str) -> Value {
    json!({
        "version": CONTRACT_VERSION,
        "mode": "combined",
        "hypotheses": [
            {"rank": 1, "title": "Stale fixture", "confidence": confidence,
             "explanation": "a.txt still holds the old value", "evidence_refs": ["E1"]}
        ],
        "confidence": confidence,
        "summary": "Fixture file out of date",
        "explanation": "The test expects b.",
        "patch": patch,
        "description": "Update a.txt",
        "risk_level": risk
    })
}

/// A validated record carrying `patch`.
#[allow(dead_code)]
pub fn patch_record(confidence: Option<u8>, risk: Option<RiskLevel>, patch: &str) -> DiagnosticRecord {
    DiagnosticRecord {
        version: CONTRACT_VERSION.to_string(),
        mode: DiagnosticMode::Patch,
        hypotheses: vec![],
        confidence,
        summary: None,
        explanation: None,
        patch: Some(patch.to_string()),
        description: Some("Update a.txt".to_string()),
        risk_level: risk,
        warnings: vec![],
    }
}

/// Which repository operation a [`FakeRepository`] should fail.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailAt {
    Check,
    Apply,
    Commit,
    Push,
    Rollback,
}

#[derive(Debug)]
struct RepoState {
    current: String,
    branches: HashSet<String>,
    clean: bool,
    commits: u32,
    pushed: Vec<String>,
    calls: Vec<String>,
}

/// In-memory [`SourceRepository`].
#[allow(dead_code)]
#[derive(Debug)]
pub struct FakeRepository {
    state: Mutex<RepoState>,
    failures: Mutex<HashSet<FailAt>>,
}

#[allow(dead_code)]
impl FakeRepository {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RepoState {
                current: WORK_BRANCH.to_string(),
                branches: HashSet::from([WORK_BRANCH.to_string(), "main".to_string()]),
                clean: true,
                commits: 0,
                pushed: Vec::new(),
                calls: Vec::new(),
            }),
            failures: Mutex::new(HashSet::new()),
        }
    }

    pub fn fail_at(self, step: FailAt) -> Self {
        self.failures.lock().unwrap().insert(step);
        self
    }

    pub fn set_dirty(&self) {
        self.state.lock().unwrap().clean = false;
    }

    pub fn add_branch(&self, name: &str) {
        self.state.lock().unwrap().branches.insert(name.to_string());
    }

    pub fn current(&self) -> String {
        self.state.lock().unwrap().current.clone()
    }

    pub fn has_branch(&self, name: &str) -> bool {
        self.state.lock().unwrap().branches.contains(name)
    }

    pub fn branch_count(&self) -> usize {
        self.state.lock().unwrap().branches.len()
    }

    pub fn commits(&self) -> u32 {
        self.state.lock().unwrap().commits
    }

    pub fn pushed(&self) -> Vec<String> {
        self.state.lock().unwrap().pushed.clone()
    }

    /// Names of the mutating calls made, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn fails(&self, step: FailAt) -> bool {
        self.failures.lock().unwrap().contains(&step)
    }

    fn record(&self, call: &str) {
        self.state.lock().unwrap().calls.push(call.to_string());
    }
}

#[async_trait]
impl SourceRepository for FakeRepository {
    async fn current_branch(&self) -> DomainResult<String> {
        Ok(self.current())
    }

    async fn is_clean(&self) -> DomainResult<bool> {
        Ok(self.state.lock().unwrap().clean)
    }

    async fn branch_exists(&self, name: &str) -> DomainResult<bool> {
        Ok(self.has_branch(name))
    }

    async fn check_patch(&self, _patch: &str) -> DomainResult<()> {
        if self.fails(FailAt::Check) {
            return Err(RemediationError::Git("patch does not apply".to_string()));
        }
        Ok(())
    }

    async fn create_branch(&self, name: &str) -> DomainResult<()> {
        self.record("create_branch");
        let mut state = self.state.lock().unwrap();
        if !state.branches.insert(name.to_string()) {
            return Err(RemediationError::Git(format!(
                "fatal: a branch named '{name}' already exists"
            )));
        }
        state.current = name.to_string();
        Ok(())
    }

    async fn apply_patch(&self, _patch: &str) -> DomainResult<()> {
        self.record("apply_patch");
        if self.fails(FailAt::Apply) {
            return Err(RemediationError::Git("error: patch failed: a.txt:1".to_string()));
        }
        self.state.lock().unwrap().clean = false;
        Ok(())
    }

    async fn stage_all(&self) -> DomainResult<()> {
        self.record("stage_all");
        Ok(())
    }

    async fn commit(&self, _message: &str) -> DomainResult<String> {
        self.record("commit");
        if self.fails(FailAt::Commit) {
            return Err(RemediationError::Git("nothing to commit".to_string()));
        }
        let mut state = self.state.lock().unwrap();
        state.commits += 1;
        state.clean = true;
        Ok(format!("{:040x}", state.commits))
    }

    async fn discard_changes(&self) -> DomainResult<()> {
        self.record("discard_changes");
        if self.fails(FailAt::Rollback) {
            return Err(RemediationError::Git("reset failed".to_string()));
        }
        self.state.lock().unwrap().clean = true;
        Ok(())
    }

    async fn switch_branch(&self, name: &str) -> DomainResult<()> {
        self.record("switch_branch");
        let mut state = self.state.lock().unwrap();
        if !state.branches.contains(name) {
            return Err(RemediationError::Git(format!("invalid reference: {name}")));
        }
        state.current = name.to_string();
        Ok(())
    }

    async fn delete_branch(&self, name: &str) -> DomainResult<()> {
        self.record("delete_branch");
        self.state.lock().unwrap().branches.remove(name);
        Ok(())
    }

    async fn push_branch(&self, _remote: &str, branch: &str) -> DomainResult<()> {
        if self.fails(FailAt::Push) {
            return Err(RemediationError::PushFailure("remote rejected".to_string()));
        }
        self.state.lock().unwrap().pushed.push(branch.to_string());
        Ok(())
    }
}

#[derive(Debug)]
struct FakeRun {
    branch: String,
    conclusion: RunConclusion,
    /// Queries left that report the run as still in progress.
    pending: u32,
}

impl FakeRun {
    fn observe(&mut self, id: &RunId) -> RunHandle {
        if self.pending > 0 {
            self.pending -= 1;
            RunHandle::new(id.clone(), RunStatus::InProgress, RunConclusion::Unset)
        } else {
            RunHandle::new(id.clone(), RunStatus::Completed, self.conclusion)
        }
    }
}

#[derive(Debug, Default)]
struct PipelineState {
    runs: HashMap<RunId, FakeRun>,
    latest: HashMap<String, RunId>,
    next_id: u64,
    /// Conclusions handed to runs triggered by pushes, in order.
    scripted: VecDeque<RunConclusion>,
}

/// In-memory [`PipelineProvider`].
///
/// A push to an unseen branch triggers a new run that reports in-progress
/// once, then completes with the next scripted conclusion.
#[allow(dead_code)]
#[derive(Debug)]
pub struct FakePipeline {
    state: Mutex<PipelineState>,
    triggers_runs: bool,
    default_conclusion: RunConclusion,
}

#[allow(dead_code)]
impl FakePipeline {
    /// `branch` has a completed run with `conclusion`; pushes trigger runs
    /// ending in `push_conclusion`.
    pub fn with_run(branch: &str, conclusion: RunConclusion, push_conclusion: RunConclusion) -> Self {
        let pipeline = Self {
            state: Mutex::new(PipelineState {
                next_id: 100,
                ..PipelineState::default()
            }),
            triggers_runs: true,
            default_conclusion: push_conclusion,
        };
        pipeline.insert(branch, conclusion, 0);
        pipeline
    }

    /// No runs anywhere, and pushes trigger nothing.
    pub fn silent() -> Self {
        Self {
            state: Mutex::new(PipelineState::default()),
            triggers_runs: false,
            default_conclusion: RunConclusion::Failure,
        }
    }

    /// Like [`with_run`](Self::with_run) but pushes never trigger a run.
    pub fn without_triggers(branch: &str, conclusion: RunConclusion) -> Self {
        let mut pipeline = Self::with_run(branch, conclusion, RunConclusion::Failure);
        pipeline.triggers_runs = false;
        pipeline
    }

    /// Conclusions for the next triggered runs; afterwards the default applies.
    pub fn script(self, conclusions: impl IntoIterator<Item = RunConclusion>) -> Self {
        self.state.lock().unwrap().scripted.extend(conclusions);
        self
    }

    pub fn run_count(&self) -> usize {
        self.state.lock().unwrap().runs.len()
    }

    pub fn branches_with_runs(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        let mut branches: Vec<String> = state.runs.values().map(|r| r.branch.clone()).collect();
        branches.sort();
        branches
    }

    fn insert(&self, branch: &str, conclusion: RunConclusion, pending: u32) -> RunId {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = RunId::from(state.next_id);
        state.runs.insert(
            id.clone(),
            FakeRun {
                branch: branch.to_string(),
                conclusion,
                pending,
            },
        );
        state.latest.insert(branch.to_string(), id.clone());
        id
    }
}

#[async_trait]
impl PipelineProvider for FakePipeline {
    async fn latest_run(&self, branch: &str) -> DomainResult<Option<RunHandle>> {
        let known = self.state.lock().unwrap().latest.get(branch).cloned();
        let id = match known {
            Some(id) => id,
            None if self.triggers_runs => {
                let conclusion = {
                    let mut state = self.state.lock().unwrap();
                    state.scripted.pop_front().unwrap_or(self.default_conclusion)
                };
                self.insert(branch, conclusion, 2)
            }
            None => return Ok(None),
        };

        let mut state = self.state.lock().unwrap();
        Ok(state.runs.get_mut(&id).map(|run| run.observe(&id)))
    }

    async fn run(&self, id: &RunId) -> DomainResult<Option<RunHandle>> {
        let mut state = self.state.lock().unwrap();
        Ok(state.runs.get_mut(id).map(|run| run.observe(id)))
    }
}

/// [`Oracle`] returning scripted raw responses; the last one repeats.
#[allow(dead_code)]
#[derive(Debug)]
pub struct FakeOracle {
    responses: Mutex<VecDeque<DomainResult<String>>>,
    last: Mutex<Option<String>>,
    calls: Mutex<u32>,
}

#[allow(dead_code)]
impl FakeOracle {
    pub fn answering(response: impl Into<String>) -> Self {
        Self::scripted([Ok(response.into())])
    }

    pub fn failing(message: &str) -> Self {
        Self::scripted([Err(RemediationError::Oracle(message.to_string()))])
    }

    pub fn scripted(responses: impl IntoIterator<Item = DomainResult<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            last: Mutex::new(None),
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Oracle for FakeOracle {
    async fn request(&self, _bundle: &EvidenceBundle, _mode: DiagnosticMode) -> DomainResult<String> {
        *self.calls.lock().unwrap() += 1;
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(Ok(raw)) => {
                *self.last.lock().unwrap() = Some(raw.clone());
                Ok(raw)
            }
            Some(Err(e)) => Err(e),
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| RemediationError::Oracle("no scripted response".to_string())),
        }
    }
}

/// [`EvidenceCollector`] returning [`evidence_bundle`] or a fixed error.
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct FakeEvidence {
    fail: bool,
}

#[allow(dead_code)]
impl FakeEvidence {
    pub fn failing() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl EvidenceCollector for FakeEvidence {
    async fn collect(&self, _run: &RunHandle, _branch: &str) -> DomainResult<EvidenceBundle> {
        if self.fail {
            return Err(RemediationError::Evidence("log download failed".to_string()));
        }
        Ok(evidence_bundle())
    }
}
