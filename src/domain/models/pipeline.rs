//! Run-scoped pipeline control state.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::defect::RoundState;
use super::verification::CompileAttempt;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalStatus {
    /// No outstanding smells remain after detection.
    Converged,

    /// The round budget was exhausted while smells remain.
    Stagnant,

    /// Every verification attempt in a round failed.
    EscalationExhausted,
}

impl std::fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Converged => "converged",
            Self::Stagnant => "stagnant",
            Self::EscalationExhausted => "escalation-exhausted",
        };
        f.write_str(s)
    }
}

/// Single-instance control state for one run.
///
/// Owned and written exclusively by the pipeline; created at run start
/// and dropped at run end, never persisted across runs.
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,

    round: u32,
    attempts: Vec<CompileAttempt>,
    round_state: RoundState,
    status: Option<TerminalStatus>,
}

impl PipelineState {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            round: 0,
            attempts: Vec::new(),
            round_state: RoundState::new(),
            status: None,
        }
    }

    /// Completed-round counter. Increases by exactly 1 per full
    /// remediate-verify-redetect cycle and never on early termination.
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Enter the next remediation round.
    pub fn advance_round(&mut self) -> u32 {
        debug_assert!(self.status.is_none(), "advance after terminal status");
        self.round += 1;
        self.attempts.clear();
        self.round
    }

    /// Record one verification trial of the current round.
    pub fn record_attempt(&mut self, attempt: CompileAttempt) {
        self.attempts.push(attempt);
    }

    /// Verification trials of the current round, in order.
    pub fn attempts(&self) -> &[CompileAttempt] {
        &self.attempts
    }

    /// Replace the active round state after a detection pass.
    pub fn observe(&mut self, state: RoundState) {
        self.round_state = state;
    }

    pub fn round_state(&self) -> &RoundState {
        &self.round_state
    }

    /// Settle on a terminal status. The first settlement wins.
    pub fn settle(&mut self, status: TerminalStatus) {
        if self.status.is_none() {
            self.status = Some(status);
        }
    }

    pub fn status(&self) -> Option<TerminalStatus> {
        self.status
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::verification::VerificationResult;

    #[test]
    fn rounds_advance_by_one() {
        let mut state = PipelineState::new();
        assert_eq!(state.round(), 0);
        assert_eq!(state.advance_round(), 1);
        assert_eq!(state.advance_round(), 2);
        assert_eq!(state.round(), 2);
    }

    #[test]
    fn advancing_clears_prior_attempts() {
        let mut state = PipelineState::new();
        state.advance_round();
        state.record_attempt(CompileAttempt::new(1, &VerificationResult::pass()));
        assert_eq!(state.attempts().len(), 1);

        state.advance_round();
        assert!(state.attempts().is_empty());
    }

    #[test]
    fn first_settlement_wins() {
        let mut state = PipelineState::new();
        state.settle(TerminalStatus::Stagnant);
        state.settle(TerminalStatus::Converged);
        assert_eq!(state.status(), Some(TerminalStatus::Stagnant));
    }

    #[test]
    fn status_display_matches_reported_names() {
        assert_eq!(TerminalStatus::Converged.to_string(), "converged");
        assert_eq!(TerminalStatus::Stagnant.to_string(), "stagnant");
        assert_eq!(
            TerminalStatus::EscalationExhausted.to_string(),
            "escalation-exhausted"
        );
    }
}
