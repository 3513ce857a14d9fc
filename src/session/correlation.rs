//! Pending query registry
//!
//! A query (power status or active source of one device) is armed once per
//! address with a deadline. Callers asking the same question while it is
//! armed join it. The entry leaves the registry on the first of: a matching
//! event, or the deadline. Every waiter is answered exactly once.

use std::collections::{HashMap, VecDeque};
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::state::LogicalAddress;

struct Pending<T> {
    deadline: Instant,
    waiters: Vec<oneshot::Sender<Option<T>>>,
}

/// Armed queries for one event kind, keyed by device address
pub struct CorrelationRegistry<T> {
    pending: HashMap<LogicalAddress, Pending<T>>,
}

impl<T: Clone> CorrelationRegistry<T> {
    pub fn new() -> Self {
        Self {
            pending: HashMap::new(),
        }
    }

    /// Register a waiter for `address`
    ///
    /// Returns true when this call armed a new query (the caller must send
    /// the adapter command), false when it joined one already in flight.
    pub fn arm(
        &mut self,
        address: LogicalAddress,
        deadline: Instant,
        waiter: oneshot::Sender<Option<T>>,
    ) -> bool {
        match self.pending.get_mut(&address) {
            Some(pending) => {
                pending.waiters.push(waiter);
                false
            }
            None => {
                self.pending.insert(
                    address,
                    Pending {
                        deadline,
                        waiters: vec![waiter],
                    },
                );
                true
            }
        }
    }

    pub fn is_armed(&self, address: LogicalAddress) -> bool {
        self.pending.contains_key(&address)
    }

    /// Answer and disarm the query for `address`; returns the waiter count
    pub fn resolve(&mut self, address: LogicalAddress, value: Option<T>) -> usize {
        let Some(pending) = self.pending.remove(&address) else {
            return 0;
        };
        let count = pending.waiters.len();
        for waiter in pending.waiters {
            // Receiver may have given up (e.g. an outer deadline dropped it)
            let _ = waiter.send(value.clone());
        }
        count
    }

    /// Earliest deadline among armed queries
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.deadline).min()
    }

    /// Disarm every query whose deadline has passed, answering `None`
    ///
    /// Returns the affected addresses so the caller can mark them unknown.
    pub fn expire(&mut self, now: Instant) -> Vec<LogicalAddress> {
        let mut expired: Vec<LogicalAddress> = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(addr, _)| *addr)
            .collect();
        expired.sort();

        for addr in &expired {
            self.resolve(*addr, None);
        }
        expired
    }

    /// Answer every waiter with `None` (session shutting down)
    pub fn clear(&mut self) {
        let addrs: Vec<LogicalAddress> = self.pending.keys().copied().collect();
        for addr in addrs {
            self.resolve(addr, None);
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<T: Clone> Default for CorrelationRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Coarse command acknowledgements
///
/// Each waiter is answered `Some(true)` by the next line the adapter prints,
/// whatever it says, or `None` at its deadline or when the process goes away.
#[derive(Default)]
pub struct AckQueue {
    waiters: VecDeque<(Instant, oneshot::Sender<Option<bool>>)>,
}

impl AckQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, deadline: Instant, waiter: oneshot::Sender<Option<bool>>) {
        self.waiters.push_back((deadline, waiter));
    }

    /// Answer every waiting acknowledgement
    pub fn resolve_all(&mut self, value: Option<bool>) {
        for (_, waiter) in self.waiters.drain(..) {
            let _ = waiter.send(value);
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.waiters.iter().map(|(d, _)| *d).min()
    }

    /// Answer `None` to every waiter whose deadline has passed
    pub fn expire(&mut self, now: Instant) {
        let mut kept = VecDeque::with_capacity(self.waiters.len());
        for (deadline, waiter) in self.waiters.drain(..) {
            if deadline <= now {
                let _ = waiter.send(None);
            } else {
                kept.push_back((deadline, waiter));
            }
        }
        self.waiters = kept;
    }

    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}
