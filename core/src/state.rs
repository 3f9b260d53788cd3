//! Bootstrap state handle.
//!
//! The phase is held in a `watch` channel: the gate is the only writer and
//! any number of readers can query it or wait for it to settle. Transitions
//! are validated and applied inside a single `send_if_modified` call, so two
//! writers can never both move the phase out of `Pending`.

use std::sync::Arc;

use tokio::sync::watch;

use bootgate_types::{Phase, TransitionError};

#[derive(Debug, Clone)]
pub struct BootstrapState {
    tx: Arc<watch::Sender<Phase>>,
}

impl Default for BootstrapState {
    fn default() -> Self {
        Self::new()
    }
}

impl BootstrapState {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Phase::Pending);
        Self { tx: Arc::new(tx) }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.tx.borrow().clone()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.tx.borrow().is_ready()
    }

    #[must_use]
    pub fn is_settled(&self) -> bool {
        !self.tx.borrow().is_pending()
    }

    #[must_use]
    pub fn subscribe(&self) -> ReadinessWatch {
        ReadinessWatch {
            rx: self.tx.subscribe(),
        }
    }

    /// Move out of `Pending`. Rejected if the phase has already settled.
    pub(crate) fn settle(&self, next: Phase) -> Result<(), TransitionError> {
        let mut outcome = Ok(());
        self.tx.send_if_modified(|current| match current.check_transition(&next) {
            Ok(()) => {
                *current = next;
                true
            }
            Err(err) => {
                outcome = Err(err);
                false
            }
        });
        outcome
    }
}

/// Read side of [`BootstrapState`].
#[derive(Debug, Clone)]
pub struct ReadinessWatch {
    rx: watch::Receiver<Phase>,
}

impl ReadinessWatch {
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.rx.borrow().clone()
    }

    /// Wait until the phase leaves `Pending` and return the settled phase.
    ///
    /// Returns the current phase immediately if it has already settled, or if
    /// every state handle has been dropped.
    pub async fn settled(&mut self) -> Phase {
        if self.rx.wait_for(|phase| !phase.is_pending()).await.is_err() {
            tracing::debug!("Bootstrap state dropped before settling");
        }
        self.rx.borrow().clone()
    }
}
