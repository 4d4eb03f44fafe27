//! Mergeable-state polling for the resolve-conflicts flow.
//!
//! GitHub computes mergeability lazily, so the first reads usually report
//! `UNKNOWN`. [`MergeablePoller`] is a small state machine fed one
//! observation per poll; it settles on `Clean` or `Dirty`, or gives up once
//! the transition budget is spent.

use std::time::Duration;

use tracing::{debug, info, warn};
use warden_events::RepoRef;

use crate::graphql_client::EntityFetcher;

pub const DEFAULT_MERGEABLE_POLL_ATTEMPTS: usize = 5;
pub const DEFAULT_MERGEABLE_POLL_INTERVAL_MS: u64 = 2_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeableState {
    Mergeable,
    Conflicting,
    Unknown,
}

impl MergeableState {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(value) if value.eq_ignore_ascii_case("MERGEABLE") => Self::Mergeable,
            Some(value) if value.eq_ignore_ascii_case("CONFLICTING") => Self::Conflicting,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeableObservation {
    pub state: MergeableState,
    pub head_branch: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePhase {
    Unknown,
    Resolving,
    Clean,
    Dirty,
}

impl MergePhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Clean | Self::Dirty)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The branch merges cleanly; nothing to resolve.
    NothingToDo,
    /// Mergeability never settled within the budget.
    GaveUp,
    Dispatch { head_branch: String },
}

#[derive(Debug, Clone)]
pub struct MergeablePoller {
    phase: MergePhase,
    transitions: usize,
    max_transitions: usize,
    head_branch: Option<String>,
}

impl MergeablePoller {
    pub fn new(max_transitions: usize) -> Self {
        Self {
            phase: MergePhase::Unknown,
            transitions: 0,
            max_transitions: max_transitions.max(1),
            head_branch: None,
        }
    }

    pub fn phase(&self) -> MergePhase {
        self.phase
    }

    pub fn transitions(&self) -> usize {
        self.transitions
    }

    /// Feeds one poll result. `None` stands for a failed read and counts as
    /// an unknown observation.
    pub fn observe(&mut self, observation: Option<MergeableObservation>) -> MergePhase {
        if self.phase.is_terminal() || self.budget_spent() {
            return self.phase;
        }
        self.transitions = self.transitions.saturating_add(1);
        let state = match observation {
            Some(observation) => {
                self.head_branch = Some(observation.head_branch);
                observation.state
            }
            None => MergeableState::Unknown,
        };
        self.phase = match state {
            MergeableState::Mergeable => MergePhase::Clean,
            MergeableState::Conflicting => MergePhase::Dirty,
            MergeableState::Unknown => MergePhase::Resolving,
        };
        self.phase
    }

    fn budget_spent(&self) -> bool {
        self.transitions >= self.max_transitions
    }

    /// `None` while more observations are still useful.
    pub fn outcome(&self) -> Option<MergeOutcome> {
        match self.phase {
            MergePhase::Clean => Some(MergeOutcome::NothingToDo),
            MergePhase::Dirty => Some(match self.head_branch.as_deref() {
                Some(branch) if !branch.trim().is_empty() => MergeOutcome::Dispatch {
                    head_branch: branch.to_string(),
                },
                _ => MergeOutcome::GaveUp,
            }),
            MergePhase::Unknown | MergePhase::Resolving if self.budget_spent() => {
                Some(MergeOutcome::GaveUp)
            }
            MergePhase::Unknown | MergePhase::Resolving => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergePollConfig {
    pub max_attempts: usize,
    pub interval: Duration,
}

impl Default for MergePollConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MERGEABLE_POLL_ATTEMPTS,
            interval: Duration::from_millis(DEFAULT_MERGEABLE_POLL_INTERVAL_MS),
        }
    }
}

/// Polls until the poller settles. Never fails: read errors are logged and
/// treated as "still unknown".
pub async fn poll_mergeable_state(
    fetcher: &dyn EntityFetcher,
    repo: &RepoRef,
    number: u64,
    config: MergePollConfig,
) -> MergeOutcome {
    let mut poller = MergeablePoller::new(config.max_attempts);
    loop {
        let observation = match fetcher.fetch_mergeable_state(repo, number).await {
            Ok(observation) => Some(observation),
            Err(error) => {
                warn!(number, error = %error, "mergeable state read failed");
                None
            }
        };
        let phase = poller.observe(observation);
        debug!(number, ?phase, transition = poller.transitions(), "mergeable poll");
        if let Some(outcome) = poller.outcome() {
            info!(number, ?outcome, "mergeable state settled");
            return outcome;
        }
        tokio::time::sleep(config.interval).await;
    }
}
