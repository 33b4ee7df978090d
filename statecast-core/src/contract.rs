//! Contract-violation reporting.
//!
//! Subscription bookkeeping has a handful of hard caller contracts:
//! no duplicate subscriptions for a live identity, no unsubscribing
//! something that was never subscribed, no delivering to an observer
//! that declared itself not ready. Breaking one of these is a bug in
//! the caller, and silently ignoring it would corrupt the ordering and
//! deduplication guarantees the stores provide.
//!
//! Violations are therefore *reported*, never returned: the mutation
//! site stays decoupled from consumer-side failures. The default
//! channel logs an error and trips a `debug_assert!`, so debug builds
//! stop at the bug while release builds keep running loudly. Hosts can
//! install their own handler to route violations into an existing
//! assertion or crash-reporting system.
//!
//! Expected lifecycle events - an observer deallocating, a weakly-held
//! producer going away - are not violations and never reach this
//! channel; they are pruned quietly where they are detected.

use parking_lot::RwLock;
use thiserror::Error;

/// A broken caller contract detected by a store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
    /// A live cross-store link already exists for this producer identifier.
    #[error("already subscribed to store `{identifier}`")]
    DuplicateStoreLink {
        /// Identifier of the producer store.
        identifier: String,
    },

    /// No cross-store link exists for this producer identifier.
    #[error("not subscribed to store `{identifier}`")]
    UnknownStoreLink {
        /// Identifier of the producer store.
        identifier: String,
    },

    /// A live view with the same identity is already registered.
    #[error("view `{identity}` is already subscribed")]
    DuplicateView {
        /// Identity of the offending view.
        identity: String,
    },

    /// The view was never registered (or was already removed).
    #[error("view `{identity}` is not subscribed")]
    UnknownView {
        /// Identity of the offending view.
        identity: String,
    },

    /// A registered view was asked to render before it became ready.
    ///
    /// "Not ready" is distinct from "gone": a deallocated view is a
    /// normal lifecycle event and is pruned without complaint, while a
    /// view that is still alive but cannot accept a render was
    /// subscribed too early, which is a caller bug.
    #[error("view `{identity}` is not ready to render")]
    ViewNotReady {
        /// Identity of the offending view.
        identity: String,
    },
}

/// Callback type for [`set_violation_handler`].
pub type ViolationHandler = Box<dyn Fn(&ContractViolation) + Send + Sync>;

static HANDLER: RwLock<Option<ViolationHandler>> = RwLock::new(None);

/// Install a process-wide violation handler, replacing the default
/// log-and-assert behavior. Pass `None` to restore the default.
///
/// The handler runs on whichever thread detected the violation. Do not
/// call [`set_violation_handler`] from inside a handler.
pub fn set_violation_handler(handler: Option<ViolationHandler>) {
    *HANDLER.write() = handler;
}

/// Report a broken caller contract.
///
/// Aborts in debug builds, logs loudly in release builds, unless a
/// custom handler is installed.
pub(crate) fn report(violation: ContractViolation) {
    if let Some(handler) = HANDLER.read().as_ref() {
        handler(&violation);
        return;
    }
    tracing::error!(%violation, "store contract violated");
    debug_assert!(false, "store contract violated: {violation}");
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Shared helper for tests that intentionally trigger violations.

    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    // Serializes tests that touch the global handler.
    static GUARD: Mutex<()> = Mutex::new(());

    /// Run `f` with a collecting handler installed and return every
    /// violation reported while it ran.
    pub(crate) fn capture_violations(f: impl FnOnce()) -> Vec<ContractViolation> {
        let _guard = GUARD.lock();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        set_violation_handler(Some(Box::new(move |violation| {
            sink.lock().push(violation.clone());
        })));
        f();
        set_violation_handler(None);
        let violations = seen.lock().clone();
        violations
    }
}
