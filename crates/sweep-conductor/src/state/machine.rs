use crate::error::BatchError;

/// Phases of a single batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPhase {
    Idle,
    AgentResolved,
    FilesSelected,
    IntentResolved,
    HooksLoaded,
    /// Processing the file at this zero-based index.
    Running(usize),
    Completed,
    Cancelled,
}

impl BatchPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, BatchPhase::Completed | BatchPhase::Cancelled)
    }
}

fn is_valid_transition(from: BatchPhase, to: BatchPhase) -> bool {
    use BatchPhase as P;
    match (from, to) {
        (P::Idle, P::AgentResolved) => true,
        (P::AgentResolved, P::FilesSelected) => true,
        (P::FilesSelected, P::IntentResolved) => true,
        (P::IntentResolved, P::HooksLoaded) => true,
        (P::HooksLoaded, P::Running(0)) => true,
        (P::Running(i), P::Running(j)) => j == i + 1,
        // an empty selection never reaches the loop, so Completed is only
        // reachable from inside it
        (P::Running(_), P::Completed | P::Cancelled) => true,
        _ => false,
    }
}

/// Tracks the current phase of a run and rejects out-of-order moves.
#[derive(Debug)]
pub struct BatchMachine {
    phase: BatchPhase,
}

impl Default for BatchMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchMachine {
    pub fn new() -> Self {
        Self {
            phase: BatchPhase::Idle,
        }
    }

    pub fn phase(&self) -> BatchPhase {
        self.phase
    }

    pub fn advance(&mut self, to: BatchPhase) -> Result<(), BatchError> {
        if !is_valid_transition(self.phase, to) {
            return Err(BatchError::InvalidTransition {
                from: self.phase,
                to,
            });
        }
        tracing::debug!(from = ?self.phase, to = ?to, "batch transition");
        self.phase = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_to_completed() {
        let mut m = BatchMachine::new();
        m.advance(BatchPhase::AgentResolved).unwrap();
        m.advance(BatchPhase::FilesSelected).unwrap();
        m.advance(BatchPhase::IntentResolved).unwrap();
        m.advance(BatchPhase::HooksLoaded).unwrap();
        m.advance(BatchPhase::Running(0)).unwrap();
        m.advance(BatchPhase::Running(1)).unwrap();
        m.advance(BatchPhase::Completed).unwrap();
        assert!(m.phase().is_terminal());
    }

    #[test]
    fn cannot_skip_phases() {
        let mut m = BatchMachine::new();
        let err = m.advance(BatchPhase::HooksLoaded).unwrap_err();
        assert!(matches!(
            err,
            BatchError::InvalidTransition {
                from: BatchPhase::Idle,
                to: BatchPhase::HooksLoaded
            }
        ));
        assert_eq!(m.phase(), BatchPhase::Idle);
    }

    #[test]
    fn running_index_must_step_by_one() {
        let mut m = BatchMachine::new();
        for p in [
            BatchPhase::AgentResolved,
            BatchPhase::FilesSelected,
            BatchPhase::IntentResolved,
            BatchPhase::HooksLoaded,
            BatchPhase::Running(0),
        ] {
            m.advance(p).unwrap();
        }
        assert!(m.advance(BatchPhase::Running(2)).is_err());
        m.advance(BatchPhase::Running(1)).unwrap();
        m.advance(BatchPhase::Cancelled).unwrap();
    }

    #[test]
    fn terminal_states_are_final() {
        let mut m = BatchMachine::new();
        for p in [
            BatchPhase::AgentResolved,
            BatchPhase::FilesSelected,
            BatchPhase::IntentResolved,
            BatchPhase::HooksLoaded,
            BatchPhase::Running(0),
            BatchPhase::Completed,
        ] {
            m.advance(p).unwrap();
        }
        assert!(m.advance(BatchPhase::Running(1)).is_err());
        assert!(m.advance(BatchPhase::Cancelled).is_err());
    }
}
