//! Query lifecycle controller.
//!
//! [`QueryController`] is the single owner of [`QueryState`]. It validates
//! input, moves the state through `Idle → Submitting → Success | Failure`,
//! drives a [`Transport`], and notifies observers on every change.
//!
//! # Single-flight
//!
//! Every accepted submission bumps a generation counter and carries it in a
//! [`Ticket`]. When a transport call settles, its result is applied only if
//! the ticket's generation is still the current one. A newer submission
//! therefore always wins, whatever order the responses arrive in; the older
//! response is dropped on arrival (no network cancellation takes place).
//!
//! # Submitting in two steps
//!
//! [`submit`](QueryController::submit) is [`begin`](QueryController::begin)
//! followed by [`resolve`](QueryController::resolve). `begin` is synchronous,
//! so the `Submitting` state is visible before any I/O starts; callers that
//! want to run the network call on a separate task can split the two.
//!
//! # Observers
//!
//! Observers are called synchronously, in registration order, with the new
//! state after each transition. Callbacks run on a snapshot of the observer
//! list, so a callback may read [`state`](QueryController::state),
//! subscribe, or unsubscribe. Submitting from inside a callback is not
//! supported and trips a debug assertion.

use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::models::{ErrorInfo, Query, QueryRequest, QueryState, DEFAULT_CONTEXT_RESULTS};
use crate::transport::Transport;

/// Callback invoked with the new state after every transition.
pub type Observer = Arc<dyn Fn(&QueryState) + Send + Sync>;

/// Handle returned by [`QueryController::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// An accepted submission waiting to be resolved.
///
/// Not `Clone`: each ticket resolves at most once.
#[derive(Debug)]
pub struct Ticket {
    generation: u64,
    request: QueryRequest,
}

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn request(&self) -> &QueryRequest {
        &self.request
    }
}

/// What happened to a settled request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The request was still current; its outcome is now the state.
    Applied,
    /// A newer submission superseded the request; its outcome was dropped.
    Stale,
}

struct Lifecycle {
    state: QueryState,
    generation: u64,
}

struct Shared {
    /// Serializes transitions with their notifications.
    delivery: Mutex<()>,
    lifecycle: Mutex<Lifecycle>,
    observers: Mutex<Vec<(SubscriptionId, Observer)>>,
    next_subscription: AtomicU64,
}

/// Owner of the query lifecycle state.
///
/// Cloning is cheap and yields a handle to the same state, which lets a
/// resolution run on a spawned task.
pub struct QueryController<T> {
    transport: Arc<T>,
    shared: Arc<Shared>,
    context_results: u32,
}

impl<T> Clone for QueryController<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            shared: Arc::clone(&self.shared),
            context_results: self.context_results,
        }
    }
}

thread_local! {
    static NOTIFYING: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as running observer callbacks.
struct NotifyGuard;

impl NotifyGuard {
    fn enter() -> Self {
        NOTIFYING.with(|flag| flag.set(true));
        NotifyGuard
    }

    fn active() -> bool {
        NOTIFYING.with(Cell::get)
    }
}

impl Drop for NotifyGuard {
    fn drop(&mut self) {
        NOTIFYING.with(|flag| flag.set(false));
    }
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    // Every mutation is a single assignment, so a poisoned lock still holds
    // a consistent value.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T: Transport> QueryController<T> {
    /// Create a controller in the `Idle` state.
    ///
    /// `context_results` is sent with every request as the number of
    /// supporting sources the service should return.
    pub fn new(transport: T, context_results: u32) -> Self {
        Self {
            transport: Arc::new(transport),
            shared: Arc::new(Shared {
                delivery: Mutex::new(()),
                lifecycle: Mutex::new(Lifecycle {
                    state: QueryState::Idle,
                    generation: 0,
                }),
                observers: Mutex::new(Vec::new()),
                next_subscription: AtomicU64::new(0),
            }),
            context_results,
        }
    }

    /// Create a controller that asks for [`DEFAULT_CONTEXT_RESULTS`] sources.
    pub fn with_default_context(transport: T) -> Self {
        Self::new(transport, DEFAULT_CONTEXT_RESULTS)
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> QueryState {
        lock(&self.shared.lifecycle).state.clone()
    }

    /// Generation of the most recent accepted submission (0 before any).
    pub fn generation(&self) -> u64 {
        lock(&self.shared.lifecycle).generation
    }

    pub fn context_results(&self) -> u32 {
        self.context_results
    }

    /// Register `observer` to be called after every state transition.
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&QueryState) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.shared.next_subscription.fetch_add(1, Ordering::Relaxed));
        lock(&self.shared.observers).push((id, Arc::new(observer)));
        id
    }

    /// Remove a previously registered observer. Returns `false` if it was
    /// already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = lock(&self.shared.observers);
        let before = observers.len();
        observers.retain(|(sid, _)| *sid != id);
        observers.len() != before
    }

    /// Accept a submission and enter `Submitting`.
    ///
    /// Blank input is ignored: no transition, no notification, and `None`
    /// is returned. Otherwise any previous result or error is replaced,
    /// observers are notified, and the returned ticket must be passed to
    /// [`resolve`](Self::resolve).
    pub fn begin(&self, raw_text: &str) -> Option<Ticket> {
        let Some(query) = Query::parse(raw_text) else {
            debug!("ignoring blank submission");
            return None;
        };
        let request = QueryRequest::new(&query, self.context_results);

        let generation = self.commit(move |lifecycle| {
            lifecycle.generation += 1;
            lifecycle.state = QueryState::Submitting(query);
            Some(lifecycle.generation)
        })?;

        debug!(generation, text = %request.text, "query submitted");
        Some(Ticket {
            generation,
            request,
        })
    }

    /// Run the transport call for `ticket` and settle the state.
    ///
    /// The outcome becomes `Success` or `Failure` only if no newer
    /// submission has begun since the ticket was issued.
    pub async fn resolve(&self, ticket: Ticket) -> Resolution {
        let outcome = self.transport.query(&ticket.request).await;
        let generation = ticket.generation;

        let next = match outcome {
            Ok(result) => QueryState::Success(result),
            Err(err) => {
                warn!(generation, error = %err, "query failed");
                QueryState::Failure(ErrorInfo::from(&err))
            }
        };
        let kind = next.kind();

        let applied = self.commit(move |lifecycle| {
            if lifecycle.generation != generation {
                return None;
            }
            lifecycle.state = next;
            Some(())
        });

        match applied {
            Some(()) => {
                debug!(generation, state = kind, "query resolved");
                Resolution::Applied
            }
            None => {
                debug!(generation, state = kind, "discarding superseded response");
                Resolution::Stale
            }
        }
    }

    /// Submit `raw_text` and wait for it to settle.
    ///
    /// Returns `None` when the input was blank and nothing was sent.
    pub async fn submit(&self, raw_text: &str) -> Option<Resolution> {
        let ticket = self.begin(raw_text)?;
        Some(self.resolve(ticket).await)
    }

    /// Apply a transition and notify observers with the resulting state.
    ///
    /// The delivery lock is held from the mutation through the last callback
    /// so notifications arrive in transition order. Neither the state lock
    /// nor the observer lock is held while callbacks run.
    fn commit<R>(&self, apply: impl FnOnce(&mut Lifecycle) -> Option<R>) -> Option<R> {
        debug_assert!(
            !NotifyGuard::active(),
            "QueryController cannot be submitted to from an observer callback"
        );
        let _delivery = lock(&self.shared.delivery);
        let (outcome, snapshot) = {
            let mut lifecycle = lock(&self.shared.lifecycle);
            let outcome = apply(&mut *lifecycle)?;
            (outcome, lifecycle.state.clone())
        };
        let observers: Vec<Observer> = lock(&self.shared.observers)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        let _notifying = NotifyGuard::enter();
        for observer in &observers {
            observer(&snapshot);
        }
        Some(outcome)
    }
}
