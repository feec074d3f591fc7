// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingSearch {
    value: String,
    deadline: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebouncedSearch<K> {
    pub input: K,
    pub value: String,
}

/// Coalesces keystrokes per search input. Every `schedule` replaces the
/// pending timer for that input; `poll` fires timers whose deadline passed.
///
/// Time is passed in by the caller, so the event loop decides when to poll
/// and tests can drive it with fixed instants.
#[derive(Debug, Clone)]
pub struct SearchDebouncer<K> {
    pending: BTreeMap<K, PendingSearch>,
}

impl<K> Default for SearchDebouncer<K> {
    fn default() -> Self {
        Self {
            pending: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Clone> SearchDebouncer<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, input: K, value: impl Into<String>, delay: Duration, now: Instant) {
        self.pending.insert(
            input,
            PendingSearch {
                value: value.into(),
                deadline: now + delay,
            },
        );
    }

    pub fn cancel(&mut self, input: &K) -> bool {
        self.pending.remove(input).is_some()
    }

    pub fn is_pending(&self, input: &K) -> bool {
        self.pending.contains_key(input)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|pending| pending.deadline).min()
    }

    pub fn poll(&mut self, now: Instant) -> Vec<DebouncedSearch<K>> {
        let due = self
            .pending
            .iter()
            .filter(|(_, pending)| pending.deadline <= now)
            .map(|(input, _)| input.clone())
            .collect::<Vec<_>>();

        due.into_iter()
            .filter_map(|input| {
                let pending = self.pending.remove(&input)?;
                Some(DebouncedSearch {
                    input,
                    value: pending.value.trim().to_owned(),
                })
            })
            .collect()
    }

    /// Like [`Self::poll`], invoking `callback` once per fired timer.
    pub fn poll_with(&mut self, now: Instant, mut callback: impl FnMut(K, String)) -> usize {
        let fired = self.poll(now);
        let count = fired.len();
        for search in fired {
            callback(search.input, search.value);
        }
        count
    }
}
