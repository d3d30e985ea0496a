//! Per-operation progress state observable by the UI.
//!
//! An [`OperationSession`] is created when the user starts an upload or
//! opens a memory, handed to the orchestrator, and dropped when the
//! operation resolves. The UI watches it through a `watch::Receiver`.

use tokio::sync::watch;

use crate::error::ErrorKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationKind {
    Upload,
    Decrypt,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationState {
    Idle,
    Validating,
    DerivingKeys,
    Encrypting,
    /// Encryption skipped for a server-managed memory.
    Skipped,
    Transmitting,
    Fetching,
    Decrypting,
    Complete,
    Errored,
}

impl OperationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationState::Complete | OperationState::Errored)
    }
}

/// Point-in-time view of an operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: OperationState,
    /// 0 to 100, never decreases.
    pub progress: u8,
    pub last_error: Option<ErrorKind>,
}

impl SessionSnapshot {
    fn idle() -> Self {
        Self {
            state: OperationState::Idle,
            progress: 0,
            last_error: None,
        }
    }
}

#[derive(Debug)]
pub struct OperationSession {
    kind: OperationKind,
    tx: watch::Sender<SessionSnapshot>,
}

impl OperationSession {
    pub fn new(kind: OperationKind) -> Self {
        let (tx, _rx) = watch::channel(SessionSnapshot::idle());
        Self { kind, tx }
    }

    pub fn upload() -> Self {
        Self::new(OperationKind::Upload)
    }

    pub fn decrypt() -> Self {
        Self::new(OperationKind::Decrypt)
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.tx.borrow().clone()
    }

    pub fn state(&self) -> OperationState {
        self.tx.borrow().state
    }

    pub fn progress(&self) -> u8 {
        self.tx.borrow().progress
    }

    pub fn last_error(&self) -> Option<ErrorKind> {
        self.tx.borrow().last_error
    }

    /// Moves to `state` and raises progress to at least `progress`.
    ///
    /// Ignored once the session is terminal.
    pub(crate) fn advance(&self, state: OperationState, progress: u8) {
        self.tx.send_if_modified(|snap| {
            if snap.state.is_terminal() {
                return false;
            }
            let progress = progress.min(100).max(snap.progress);
            let changed = snap.state != state || snap.progress != progress;
            snap.state = state;
            snap.progress = progress;
            changed
        });
    }

    /// Raises progress within the current state.
    pub(crate) fn report_progress(&self, progress: u8) {
        let state = self.state();
        self.advance(state, progress);
    }

    pub(crate) fn complete(&self) {
        self.advance(OperationState::Complete, 100);
    }

    /// Records the error kind and ends the session. Progress stays where it was.
    pub(crate) fn fail(&self, kind: ErrorKind) {
        self.tx.send_if_modified(|snap| {
            if snap.state.is_terminal() {
                return false;
            }
            snap.state = OperationState::Errored;
            snap.last_error = Some(kind);
            true
        });
    }
}
