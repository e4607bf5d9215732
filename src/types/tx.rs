//! Transaction records: one user intent becomes an ordered list of
//! steps, each tracking the lifecycle of a single on-chain call.

use alloy::primitives::TxHash;
use uuid::Uuid;

use crate::error::DexError;

/// Lifecycle of one transaction step.
///
/// `Waiting` is initial; `Confirmed`, `Rejected` and `Done` are
/// terminal. `Done` marks a step skipped as already satisfied (e.g. a
/// sufficient allowance). A step that reached a terminal state never
/// transitions again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TxStepStatus {
    Waiting,
    /// Gas estimation has begun.
    Pending,
    /// Transaction hash returned by the network, receipt not yet seen.
    Submitted(TxHash),
    Confirmed(TxHash),
    Rejected(String),
    /// Skipped: the step's effect already holds on-chain.
    Done,
}

impl TxStepStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed(_) | Self::Rejected(_) | Self::Done)
    }

    fn can_advance_to(&self, next: &Self) -> bool {
        match (self, next) {
            (Self::Waiting, Self::Pending | Self::Done) => true,
            (Self::Pending, Self::Submitted(_)) => true,
            (Self::Submitted(_), Self::Confirmed(_)) => true,
            // Estimation, send or revert failure from any live state
            (s, Self::Rejected(_)) => !s.is_terminal(),
            _ => false,
        }
    }
}

/// One step of a transaction record.
#[derive(Clone, Debug)]
pub struct TxStep {
    uuid: Uuid,
    description: String,
    status: TxStepStatus,
}

impl TxStep {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            description: description.into(),
            status: TxStepStatus::Waiting,
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> &TxStepStatus {
        &self.status
    }

    /// Human-readable description shown by the UI; updated e.g. when an
    /// allowance check resolves to "sufficient" or "approval needed".
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Advances the step's state machine, refusing transitions the
    /// lifecycle does not allow (terminal states are final, `Confirmed`
    /// requires passing through `Pending` and `Submitted`).
    pub fn advance(&mut self, next: TxStepStatus) -> Result<(), DexError> {
        if !self.status.can_advance_to(&next) {
            return Err(DexError::StepTransition(self.status.clone(), next));
        }
        self.status = next;
        Ok(())
    }
}

/// A user intent's transaction record: UUID-keyed steps plus the
/// display strings the UI renders verbatim.
///
/// The record is terminal once all steps reached `Confirmed`/`Done` or
/// any step reached `Rejected`.
#[derive(Clone, Debug)]
pub struct TxQueue {
    title: String,
    kind: String,
    verb: String,
    steps: Vec<TxStep>,
}

impl TxQueue {
    pub fn new(
        title: impl Into<String>,
        kind: impl Into<String>,
        verb: impl Into<String>,
        steps: Vec<TxStep>,
    ) -> Self {
        Self {
            title: title.into(),
            kind: kind.into(),
            verb: verb.into(),
            steps,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn verb(&self) -> &str {
        &self.verb
    }

    pub fn steps(&self) -> &[TxStep] {
        &self.steps
    }

    pub fn step(&self, uuid: Uuid) -> Option<&TxStep> {
        self.steps.iter().find(|s| s.uuid() == uuid)
    }

    pub fn is_terminal(&self) -> bool {
        self.steps
            .iter()
            .any(|s| matches!(s.status(), TxStepStatus::Rejected(_)))
            || self.steps.iter().all(|s| s.status().is_terminal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash() -> TxHash {
        TxHash::with_last_byte(7)
    }

    #[test]
    fn test_happy_path_order() {
        let mut step = TxStep::new("Swap");
        assert_eq!(*step.status(), TxStepStatus::Waiting);
        step.advance(TxStepStatus::Pending).unwrap();
        step.advance(TxStepStatus::Submitted(hash())).unwrap();
        step.advance(TxStepStatus::Confirmed(hash())).unwrap();
        assert!(step.status().is_terminal());
    }

    #[test]
    fn test_confirmed_requires_pending_and_submitted() {
        let mut step = TxStep::new("Swap");
        assert!(step.advance(TxStepStatus::Confirmed(hash())).is_err());
        assert!(step.advance(TxStepStatus::Submitted(hash())).is_err());

        step.advance(TxStepStatus::Pending).unwrap();
        assert!(step.advance(TxStepStatus::Confirmed(hash())).is_err());
    }

    #[test]
    fn test_rejected_is_final() {
        let mut step = TxStep::new("Approve");
        step.advance(TxStepStatus::Pending).unwrap();
        step.advance(TxStepStatus::Rejected("execution reverted".to_string()))
            .unwrap();
        assert!(step.advance(TxStepStatus::Pending).is_err());
        assert!(step.advance(TxStepStatus::Submitted(hash())).is_err());
        assert!(step.advance(TxStepStatus::Confirmed(hash())).is_err());
        assert!(
            step.advance(TxStepStatus::Rejected("again".to_string()))
                .is_err()
        );
    }

    #[test]
    fn test_skip_as_done() {
        let mut step = TxStep::new("Checking allowance");
        step.advance(TxStepStatus::Done).unwrap();
        assert!(step.status().is_terminal());
        assert!(step.advance(TxStepStatus::Pending).is_err());
    }

    #[test]
    fn test_rejection_from_any_live_state() {
        for setup in [
            vec![],
            vec![TxStepStatus::Pending],
            vec![TxStepStatus::Pending, TxStepStatus::Submitted(hash())],
        ] {
            let mut step = TxStep::new("x");
            for s in setup {
                step.advance(s).unwrap();
            }
            step.advance(TxStepStatus::Rejected("err".to_string()))
                .unwrap();
        }
    }

    #[test]
    fn test_queue_terminal() {
        let steps = vec![TxStep::new("a"), TxStep::new("b")];
        let mut queue = TxQueue::new("Swap A for B", "Swap", "Swap Successful", steps);
        assert!(!queue.is_terminal());

        let uuids: Vec<_> = queue.steps().iter().map(|s| s.uuid()).collect();
        for uuid in &uuids {
            let step = queue.steps.iter_mut().find(|s| s.uuid() == *uuid).unwrap();
            step.advance(TxStepStatus::Pending).unwrap();
            step.advance(TxStepStatus::Submitted(hash())).unwrap();
            step.advance(TxStepStatus::Confirmed(hash())).unwrap();
        }
        assert!(queue.is_terminal());
        assert!(queue.step(uuids[0]).is_some());
        assert!(queue.step(Uuid::new_v4()).is_none());
    }
}
