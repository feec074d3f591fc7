// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::QueryRequest;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabActivated<T> {
    pub tab: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TableAction {
    PageChange,
    PerPageChange,
}

/// Pagination or page-size change emitted by the table renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableActionEvent {
    pub action: TableAction,
    pub value: u32,
    pub current_params: QueryRequest,
}

/// Tracks which tab is visible and which tabs have been shown at least once.
///
/// The tab visible at mount time is activated only after a settle delay, so
/// the owners have a chance to finish mounting before their first load.
#[derive(Debug, Clone)]
pub struct TabActivationGate<T> {
    shown: BTreeSet<T>,
    visible: Option<T>,
    pending_initial: Option<(T, Instant)>,
}

impl<T> Default for TabActivationGate<T> {
    fn default() -> Self {
        Self {
            shown: BTreeSet::new(),
            visible: None,
            pending_initial: None,
        }
    }
}

impl<T: Copy + Ord> TabActivationGate<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mount(&mut self, initial: T, now: Instant, settle: Duration) {
        self.visible = Some(initial);
        if !self.shown.contains(&initial) {
            self.pending_initial = Some((initial, now + settle));
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending_initial.map(|(_, deadline)| deadline)
    }

    /// Fires the delayed activation of the mount-time tab once it is due.
    pub fn poll(&mut self, now: Instant) -> Option<TabActivated<T>> {
        let (tab, deadline) = self.pending_initial?;
        if now < deadline {
            return None;
        }
        self.pending_initial = None;
        self.mark_shown(tab)
    }

    /// Makes `tab` visible. Returns the activation notice only the first
    /// time the tab is shown.
    pub fn activate(&mut self, tab: T) -> Option<TabActivated<T>> {
        self.visible = Some(tab);
        self.pending_initial = None;
        self.mark_shown(tab)
    }

    fn mark_shown(&mut self, tab: T) -> Option<TabActivated<T>> {
        self.shown.insert(tab).then_some(TabActivated { tab })
    }

    pub fn visible(&self) -> Option<T> {
        self.visible
    }

    pub fn is_visible(&self, tab: T) -> bool {
        self.visible == Some(tab)
    }

    pub fn has_shown(&self, tab: T) -> bool {
        self.shown.contains(&tab)
    }

    /// Delivers a table action to the visible tab. With no visible tab the
    /// event is dropped.
    pub fn route(&self, event: TableActionEvent) -> Option<(T, TableActionEvent)> {
        self.visible.map(|tab| (tab, event))
    }
}
