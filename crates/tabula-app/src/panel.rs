// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{
    DEFAULT_PER_PAGE, FilteredBadge, LoadOutcome, LoadTicket, OwnerOptions, Panel, PanelContent,
    PanelDocument, QueryError, QueryResponse, ResourceKind, SearchDebouncer, TabActivationGate,
    TableActionEvent, TableOwner, TableRenderer,
};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const DEFAULT_TAB_SETTLE: Duration = Duration::from_millis(50);
pub const STANDALONE_CONTAINER_ID: &str = "page-table";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelOptions {
    pub tabs: Vec<ResourceKind>,
    pub per_page: u32,
    pub badge: FilteredBadge,
    pub settle: Duration,
    pub delays: BTreeMap<ResourceKind, Duration>,
}

impl Default for PanelOptions {
    fn default() -> Self {
        Self {
            tabs: ResourceKind::ALL.to_vec(),
            per_page: DEFAULT_PER_PAGE,
            badge: FilteredBadge::default(),
            settle: DEFAULT_TAB_SETTLE,
            delays: BTreeMap::new(),
        }
    }
}

/// A page of table owners sharing one document and one table slot.
///
/// Tabs load lazily on first activation. Search input is debounced per tab
/// and table actions are delivered only to the visible tab.
#[derive(Debug, Clone)]
pub struct TabbedPanel {
    document: PanelDocument,
    gate: TabActivationGate<ResourceKind>,
    debouncer: SearchDebouncer<ResourceKind>,
    owners: Vec<TableOwner>,
    settle: Duration,
}

impl TabbedPanel {
    pub fn new(options: &PanelOptions) -> Self {
        let mut document = PanelDocument::default();
        let mut owners = Vec::with_capacity(options.tabs.len());
        for resource in &options.tabs {
            if owners
                .iter()
                .any(|owner: &TableOwner| owner.resource() == *resource)
            {
                continue;
            }
            let owner = TableOwner::new(
                *resource,
                OwnerOptions {
                    per_page: options.per_page,
                    badge: options.badge,
                    debounce: options.delays.get(resource).copied(),
                },
            );
            owner.mount(&mut document);
            owners.push(owner);
        }

        Self {
            document,
            gate: TabActivationGate::new(),
            debouncer: SearchDebouncer::new(),
            owners,
            settle: options.settle,
        }
    }

    /// A single-table page: the page-level container holds the slot between
    /// loads, and the only tab activates without a settle delay.
    pub fn standalone(resource: ResourceKind, options: &PanelOptions) -> Self {
        let mut panel = Self::new(&PanelOptions {
            tabs: vec![resource],
            settle: Duration::ZERO,
            ..options.clone()
        });
        panel.document.mount_occupant(STANDALONE_CONTAINER_ID);
        panel
    }

    pub fn document(&self) -> &PanelDocument {
        &self.document
    }

    pub fn tabs(&self) -> impl Iterator<Item = ResourceKind> + '_ {
        self.owners.iter().map(TableOwner::resource)
    }

    pub fn owner(&self, tab: ResourceKind) -> Option<&TableOwner> {
        self.owners.iter().find(|owner| owner.resource() == tab)
    }

    fn owner_index(&self, tab: ResourceKind) -> Option<usize> {
        self.owners.iter().position(|owner| owner.resource() == tab)
    }

    pub fn visible_tab(&self) -> Option<ResourceKind> {
        self.gate.visible()
    }

    pub fn visible_owner(&self) -> Option<&TableOwner> {
        self.visible_tab().and_then(|tab| self.owner(tab))
    }

    pub fn visible_panel(&self) -> Option<&Panel> {
        self.visible_owner()
            .and_then(|owner| self.document.panel(owner.container_id()))
    }

    pub fn has_pending_search(&self, tab: ResourceKind) -> bool {
        self.debouncer.is_pending(&tab)
    }

    pub fn mount(&mut self, initial: ResourceKind, now: Instant) {
        let Some(index) = self.owner_index(initial) else {
            warn!(tab = initial.as_str(), "initial tab is not part of this panel");
            return;
        };
        self.set_visible(index);
        self.gate.mount(initial, now, self.settle);
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.gate.next_deadline(), self.debouncer.next_deadline()) {
            (Some(gate), Some(search)) => Some(gate.min(search)),
            (gate, search) => gate.or(search),
        }
    }

    /// Fires the delayed initial activation and any due search timers.
    pub fn tick(&mut self, now: Instant) -> Vec<LoadTicket> {
        let mut tickets = Vec::new();
        if let Some(activated) = self.gate.poll(now)
            && let Some(ticket) = self.first_load(activated.tab)
        {
            tickets.push(ticket);
        }

        for search in self.debouncer.poll(now) {
            let Some(index) = self.owner_index(search.input) else {
                continue;
            };
            self.owners[index].set_global_search(search.value);
            if let Some(ticket) = self.start_load(index) {
                tickets.push(ticket);
            }
        }
        tickets
    }

    pub fn switch_to(&mut self, tab: ResourceKind) -> Option<LoadTicket> {
        let index = self.owner_index(tab)?;
        self.set_visible(index);
        let activated = self.gate.activate(tab)?;
        self.first_load(activated.tab)
    }

    pub fn rotate(&mut self, delta: isize) -> Option<LoadTicket> {
        if self.owners.is_empty() {
            return None;
        }
        let current = self
            .visible_tab()
            .and_then(|tab| self.owner_index(tab))
            .unwrap_or(0) as isize;
        let len = self.owners.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        let tab = self.owners[next].resource();
        self.switch_to(tab)
    }

    fn set_visible(&mut self, index: usize) {
        for (position, owner) in self.owners.iter_mut().enumerate() {
            owner.set_visible(position == index);
        }
    }

    fn first_load(&mut self, tab: ResourceKind) -> Option<LoadTicket> {
        let index = self.owner_index(tab)?;
        debug!(tab = tab.as_str(), "tab shown for the first time");
        self.owners[index].mark_activated();
        self.start_load(index)
    }

    fn start_load(&mut self, index: usize) -> Option<LoadTicket> {
        let owner = &mut self.owners[index];
        match owner.begin_load() {
            Ok(ticket) => {
                owner.mark_loading(&mut self.document);
                Some(ticket)
            }
            Err(error) => {
                let error = QueryError::from(error);
                if let Some(panel) = self.document.panel_mut(owner.container_id()) {
                    panel.content = PanelContent::Failed(error.user_message());
                }
                warn!(tab = owner.resource().as_str(), %error, "filters rejected");
                None
            }
        }
    }

    /// Records a keystroke in the visible tab's search box and re-arms its
    /// debounce timer.
    pub fn search_input(&mut self, text: &str, now: Instant) {
        let Some(index) = self.visible_tab().and_then(|tab| self.owner_index(tab)) else {
            return;
        };
        let owner = &mut self.owners[index];
        owner.set_search_draft(text);
        self.debouncer
            .schedule(owner.resource(), text, owner.debounce(), now);
    }

    pub fn set_column_filter(
        &mut self,
        tab: ResourceKind,
        name: &str,
        value: &str,
    ) -> Option<LoadTicket> {
        let index = self.owner_index(tab)?;
        self.owners[index].set_column_filter(name, value);
        self.start_load(index)
    }

    pub fn set_date_range(&mut self, tab: ResourceKind, from: &str, to: &str) -> Option<LoadTicket> {
        let index = self.owner_index(tab)?;
        self.owners[index].set_date_range(from, to);
        self.start_load(index)
    }

    pub fn clear_filters(&mut self, tab: ResourceKind) -> Option<LoadTicket> {
        let index = self.owner_index(tab)?;
        self.debouncer.cancel(&tab);
        self.owners[index].clear_filters();
        self.start_load(index)
    }

    /// Re-runs the current query of a tab, for retry after a failure.
    pub fn reload(&mut self, tab: ResourceKind) -> Option<LoadTicket> {
        let index = self.owner_index(tab)?;
        self.start_load(index)
    }

    /// Delivers a table action to the visible tab. Events arriving with no
    /// visible tab are dropped.
    pub fn table_action(&mut self, event: TableActionEvent) -> Option<LoadTicket> {
        let Some((tab, event)) = self.gate.route(event) else {
            debug!("table action with no visible tab dropped");
            return None;
        };
        let index = self.owner_index(tab)?;
        let owner = &mut self.owners[index];
        let ticket = owner.apply_table_action(&event);
        owner.mark_loading(&mut self.document);
        Some(ticket)
    }

    pub fn complete<R: TableRenderer + ?Sized>(
        &mut self,
        ticket: LoadTicket,
        result: Result<QueryResponse, QueryError>,
        renderer: &mut R,
    ) -> LoadOutcome {
        let Some(index) = self.owner_index(ticket.resource) else {
            return LoadOutcome::Stale;
        };
        self.owners[index].complete_load(ticket, result, &mut self.document, renderer)
    }
}
