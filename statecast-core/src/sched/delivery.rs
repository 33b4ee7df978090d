//! The designated delivery context.
//!
//! All observer-visible effects - callback firings, renders, lifecycle
//! notifications - are funneled onto one process-wide worker thread.
//! With a single serialized consumer, observers behave as if
//! single-threaded with respect to each other and see each store's
//! states in commit order, without any locking on their side.
//!
//! # Inline delivery
//!
//! Dispatching always preserves submission order, but a store may opt
//! into [`DeliveryPolicy::Inline`]: when the code that commits a
//! mutation is already running on the delivery thread, the notification
//! runs immediately instead of being pushed to the back of the queue.
//! That avoids deferring a render by a full scheduling tick at the cost
//! of jumping ahead of already-queued work. [`DeliveryPolicy::Deferred`]
//! always enqueues.
//!
//! # Shutdown
//!
//! The context lives for the whole process; there is no teardown. If
//! the worker ever dies (an observer panicked), subsequent dispatches
//! are dropped and logged rather than crashing producers.

use std::sync::mpsc;
use std::sync::OnceLock;
use std::thread::{self, ThreadId};

type Job = Box<dyn FnOnce() + Send>;

enum Msg {
    Run(Job),
    Flush(mpsc::Sender<()>),
}

/// Whether a notification may run inline on the delivery thread.
///
/// Resolves the two dispatch variants observed in store frameworks:
/// render-as-soon-as-possible versus always-defer-one-tick. The policy
/// is configured per store and only matters for code that mutates a
/// store from within the delivery context itself (typically an observer
/// reacting to another store).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryPolicy {
    /// Deliver synchronously when already on the delivery thread,
    /// otherwise enqueue.
    Inline,
    /// Always enqueue, even on the delivery thread.
    Deferred,
}

/// Handle to the process-wide designated execution context.
///
/// One worker thread drains a serial job queue; [`dispatch`] never
/// blocks the caller.
///
/// [`dispatch`]: DeliveryContext::dispatch
pub struct DeliveryContext {
    sender: mpsc::Sender<Msg>,
    thread_id: ThreadId,
}

static GLOBAL: OnceLock<DeliveryContext> = OnceLock::new();

impl DeliveryContext {
    /// The process-wide delivery context, started on first use.
    pub fn global() -> &'static DeliveryContext {
        GLOBAL.get_or_init(|| {
            let (sender, receiver) = mpsc::channel::<Msg>();
            let handle = thread::Builder::new()
                .name("statecast-delivery".into())
                .spawn(move || delivery_loop(receiver))
                .expect("failed to spawn delivery thread");
            DeliveryContext {
                sender,
                thread_id: handle.thread().id(),
            }
        })
    }

    /// True when the calling code is already running on the delivery
    /// thread.
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Enqueue a job; jobs run in submission order.
    pub fn dispatch(&self, job: impl FnOnce() + Send + 'static) {
        if self.sender.send(Msg::Run(Box::new(job))).is_err() {
            tracing::error!("delivery context is gone; dropping notification");
        }
    }

    /// Run `job` inline when the policy and calling thread allow it,
    /// otherwise enqueue it.
    pub fn run(&self, policy: DeliveryPolicy, job: impl FnOnce() + Send + 'static) {
        if policy == DeliveryPolicy::Inline && self.is_current() {
            job();
        } else {
            self.dispatch(job);
        }
    }

    /// Block until every job submitted before this call has run.
    ///
    /// Calling from the delivery thread itself returns immediately:
    /// everything submitted before the currently-running job has
    /// already executed.
    pub fn flush(&self) {
        if self.is_current() {
            return;
        }
        let (ack, done) = mpsc::channel();
        if self.sender.send(Msg::Flush(ack)).is_ok() {
            let _ = done.recv();
        }
    }
}

fn delivery_loop(receiver: mpsc::Receiver<Msg>) {
    while let Ok(msg) = receiver.recv() {
        match msg {
            Msg::Run(job) => job(),
            Msg::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    #[test]
    fn dispatch_runs_on_the_delivery_thread() {
        let context = DeliveryContext::global();
        let observed = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&observed);

        context.dispatch(move || {
            flag.store(DeliveryContext::global().is_current(), Ordering::SeqCst);
        });
        context.flush();

        assert!(observed.load(Ordering::SeqCst));
        assert!(!context.is_current());
    }

    #[test]
    fn jobs_run_in_submission_order() {
        let context = DeliveryContext::global();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..32 {
            let order = Arc::clone(&order);
            context.dispatch(move || order.lock().unwrap().push(i));
        }
        context.flush();

        assert_eq!(*order.lock().unwrap(), (0..32).collect::<Vec<_>>());
    }

    #[test]
    fn inline_policy_runs_synchronously_on_the_delivery_thread() {
        let context = DeliveryContext::global();
        let order = Arc::new(Mutex::new(Vec::new()));

        let outer = Arc::clone(&order);
        context.dispatch(move || {
            let inner = Arc::clone(&outer);
            DeliveryContext::global().run(DeliveryPolicy::Inline, move || {
                inner.lock().unwrap().push("inline");
            });
            outer.lock().unwrap().push("after");
        });
        context.flush();

        assert_eq!(*order.lock().unwrap(), vec!["inline", "after"]);
    }

    #[test]
    fn deferred_policy_enqueues_even_on_the_delivery_thread() {
        let context = DeliveryContext::global();
        let order = Arc::new(Mutex::new(Vec::new()));

        let outer = Arc::clone(&order);
        context.dispatch(move || {
            let inner = Arc::clone(&outer);
            DeliveryContext::global().run(DeliveryPolicy::Deferred, move || {
                inner.lock().unwrap().push("deferred");
            });
            outer.lock().unwrap().push("after");
        });
        context.flush();

        assert_eq!(*order.lock().unwrap(), vec!["after", "deferred"]);
    }

    #[test]
    fn off_thread_inline_policy_still_enqueues() {
        let context = DeliveryContext::global();
        let ran_here = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran_here);

        // Not on the delivery thread, so Inline must fall back to dispatch.
        context.run(DeliveryPolicy::Inline, move || {
            flag.store(DeliveryContext::global().is_current(), Ordering::SeqCst);
        });
        context.flush();

        assert!(ran_here.load(Ordering::SeqCst));
    }
}
