//! In-memory bulk sink
//!
//! Accepts or rejects items according to a policy closure and keeps every
//! accepted document. Records each submission so callers can see exactly
//! what was flushed, and can be told to fail whole requests.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::id::Identifier;

use super::bulk::{BulkResult, BulkSink};
use super::errors::TransportError;
use super::record::{BulkItem, ItemError, ItemOutcome};

/// Decides the fate of one item. Receives the 1-based attempt number for the
/// item's id; `Some` rejects it.
pub type ItemPolicy = Arc<dyn Fn(&BulkItem, u32) -> Option<ItemError> + Send + Sync>;

/// Rewrites a response before it is returned
pub type ResponseHook = Arc<dyn Fn(&mut Vec<ItemOutcome>) + Send + Sync>;

#[derive(Debug, Default)]
struct MemoryState {
    submissions: Vec<Vec<Identifier>>,
    stored: HashMap<Identifier, (String, Value)>,
    attempts: HashMap<Identifier, u32>,
    transport_failures_left: usize,
}

pub struct MemorySink {
    policy: ItemPolicy,
    hook: Option<ResponseHook>,
    state: Mutex<MemoryState>,
    watchers: Mutex<Vec<mpsc::UnboundedSender<Vec<Identifier>>>>,
}

impl fmt::Debug for MemorySink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySink")
            .field("submissions", &self.submission_count())
            .field("stored", &self.stored_len())
            .finish()
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySink {
    /// A sink that accepts everything.
    pub fn new() -> Self {
        Self::with_policy(|_, _| None)
    }

    pub fn with_policy<F>(policy: F) -> Self
    where
        F: Fn(&BulkItem, u32) -> Option<ItemError> + Send + Sync + 'static,
    {
        Self {
            policy: Arc::new(policy),
            hook: None,
            state: Mutex::new(MemoryState::default()),
            watchers: Mutex::new(Vec::new()),
        }
    }

    /// Rejects every item with `reason`.
    pub fn failing_always(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::with_policy(move |_, _| Some(ItemError::new(reason.clone())))
    }

    /// Rejects the first `attempts` tries of each id, then accepts.
    pub fn failing_first(attempts: u32, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::with_policy(move |_, attempt| {
            (attempt <= attempts).then(|| ItemError::new(reason.clone()))
        })
    }

    /// Installs a hook that may edit each response (drop, add or alter
    /// outcomes).
    pub fn with_response_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Vec<ItemOutcome>) + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(hook));
        self
    }

    /// Fails the next `count` submissions at transport level.
    pub fn fail_next_transport(&self, count: usize) {
        if let Ok(mut state) = self.state.lock() {
            state.transport_failures_left = count;
        }
    }

    /// Receives the ids of every later submission, in order.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Vec<Identifier>> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut watchers) = self.watchers.lock() {
            watchers.push(tx);
        }
        rx
    }

    /// Ids of each submission so far
    pub fn submissions(&self) -> Vec<Vec<Identifier>> {
        self.state
            .lock()
            .map(|s| s.submissions.clone())
            .unwrap_or_default()
    }

    pub fn submission_count(&self) -> usize {
        self.state.lock().map(|s| s.submissions.len()).unwrap_or(0)
    }

    /// Number of accepted documents
    pub fn stored_len(&self) -> usize {
        self.state.lock().map(|s| s.stored.len()).unwrap_or(0)
    }

    pub fn document(&self, id: Identifier) -> Option<(String, Value)> {
        self.state.lock().ok()?.stored.get(&id).cloned()
    }

    /// How many times `id` has been submitted
    pub fn attempts(&self, id: Identifier) -> u32 {
        self.state
            .lock()
            .ok()
            .and_then(|s| s.attempts.get(&id).copied())
            .unwrap_or(0)
    }

    fn process(&self, items: &[BulkItem]) -> BulkResult {
        let ids: Vec<Identifier> = items.iter().map(|item| item.id).collect();

        let mut outcomes = {
            let mut state = self
                .state
                .lock()
                .map_err(|_| TransportError::new("memory sink state poisoned"))?;
            state.submissions.push(ids.clone());

            if state.transport_failures_left > 0 {
                state.transport_failures_left -= 1;
                drop(state);
                self.notify(ids);
                return Err(TransportError::new("injected transport failure"));
            }

            let mut outcomes = Vec::with_capacity(items.len());
            for item in items {
                let attempt = {
                    let count = state.attempts.entry(item.id).or_insert(0);
                    *count += 1;
                    *count
                };
                match (self.policy)(item, attempt) {
                    None => {
                        state
                            .stored
                            .insert(item.id, (item.collection.clone(), item.document.clone()));
                        outcomes.push(ItemOutcome::succeeded(item));
                    }
                    Some(error) => outcomes.push(ItemOutcome::failed(item, error)),
                }
            }
            outcomes
        };

        if let Some(hook) = &self.hook {
            hook(&mut outcomes);
        }
        self.notify(ids);
        Ok(outcomes)
    }

    fn notify(&self, ids: Vec<Identifier>) {
        if let Ok(mut watchers) = self.watchers.lock() {
            watchers.retain(|tx| tx.send(ids.clone()).is_ok());
        }
    }
}

impl BulkSink for MemorySink {
    fn submit<'a>(&'a self, items: &'a [BulkItem]) -> BoxFuture<'a, BulkResult> {
        Box::pin(async move { self.process(items) })
    }
}
