//! Observer state machine.

use std::sync::Mutex;

/// Lifecycle state of a [`CmdObserver`](super::CmdObserver).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObserverState {
    /// Created, never started.
    #[default]
    Idle,
    /// A child process is running or its output is still draining.
    Running,
    /// The last run finished or was stopped. Can be started again.
    Stopped,
}

impl ObserverState {
    /// Check if transition to target state is valid.
    ///
    /// Valid transitions:
    /// - Idle -> Running
    /// - Running -> Stopped
    /// - Stopped -> Running
    pub fn can_transition_to(&self, target: ObserverState) -> bool {
        use ObserverState::*;
        matches!(
            (*self, target),
            (Idle, Running) | (Running, Stopped) | (Stopped, Running)
        )
    }

    /// Attempt to transition to a new state.
    ///
    /// Returns `Ok(())` if the transition is valid, or an error otherwise.
    pub fn transition_to(&mut self, target: ObserverState) -> crate::Result<()> {
        if self.can_transition_to(target) {
            *self = target;
            Ok(())
        } else {
            Err(crate::error::GlueError::InvalidStateTransition {
                from: *self,
                to: target,
            })
        }
    }

    /// Check if a run is in progress.
    pub fn is_running(&self) -> bool {
        matches!(self, ObserverState::Running)
    }
}

/// State cell shared between an observer and its supervisor task.
#[derive(Debug, Default)]
pub(crate) struct SharedState {
    inner: Mutex<ObserverState>,
}

impl SharedState {
    pub(crate) fn get(&self) -> ObserverState {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Apply a transition, returning the state it was attempted from.
    pub(crate) fn transition_to(&self, target: ObserverState) -> crate::Result<ObserverState> {
        let mut state = self.inner.lock().map_err(|_| crate::GlueError::LockPoisoned)?;
        let from = *state;
        state.transition_to(target)?;
        Ok(from)
    }

    /// Set the state without checking the transition.
    pub(crate) fn force(&self, target: ObserverState) {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner()) = target;
    }
}
