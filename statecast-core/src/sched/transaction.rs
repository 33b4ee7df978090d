//! Per-store transaction queues.
//!
//! Each store owns one private serial worker. A mutation becomes an
//! `(old, new, force)` transaction pushed onto the worker's channel
//! while the store's commit lock is held, so the worker observes
//! transactions strictly in commit order even when producers race. The
//! worker runs the store's change detection and forwards surviving
//! notifications to the delivery context.
//!
//! The worker thread's name is derived from the store identifier purely
//! as a debugging aid; nothing depends on it.
//!
//! Dropping the queue sends a shutdown message and joins the worker, so
//! a store that goes away never leaves a dangling thread behind.

use std::sync::mpsc;
use std::thread::{self, JoinHandle};

enum Txn<S> {
    Apply { old: S, new: S, force: bool },
    Barrier(mpsc::Sender<()>),
    Shutdown,
}

/// One serial transaction worker for one store instance.
pub(crate) struct TransactionQueue<S> {
    sender: mpsc::Sender<Txn<S>>,
    handle: Option<JoinHandle<()>>,
}

impl<S: Send + 'static> TransactionQueue<S> {
    /// Spawn the worker. `on_apply` runs on the worker thread, once per
    /// transaction, in commit order.
    pub(crate) fn start(name: &str, on_apply: impl Fn(S, S, bool) + Send + 'static) -> Self {
        let (sender, receiver) = mpsc::channel::<Txn<S>>();
        let handle = thread::Builder::new()
            .name(format!("{name}.txn"))
            .spawn(move || transaction_loop(receiver, on_apply))
            .expect("failed to spawn transaction thread");
        Self {
            sender,
            handle: Some(handle),
        }
    }

    /// Enqueue a transaction. Never blocks the committing thread.
    pub(crate) fn apply(&self, old: S, new: S, force: bool) {
        let _ = self.sender.send(Txn::Apply { old, new, force });
    }

    /// Block until every transaction enqueued before this call has been
    /// processed.
    pub(crate) fn barrier(&self) {
        let (ack, done) = mpsc::channel();
        if self.sender.send(Txn::Barrier(ack)).is_ok() {
            let _ = done.recv();
        }
    }
}

impl<S> Drop for TransactionQueue<S> {
    fn drop(&mut self) {
        let _ = self.sender.send(Txn::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn transaction_loop<S>(receiver: mpsc::Receiver<Txn<S>>, on_apply: impl Fn(S, S, bool)) {
    while let Ok(txn) = receiver.recv() {
        match txn {
            Txn::Apply { old, new, force } => on_apply(old, new, force),
            Txn::Barrier(ack) => {
                let _ = ack.send(());
            }
            Txn::Shutdown => return,
        }
    }
}
