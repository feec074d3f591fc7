// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! The shared table slot.
//!
//! The table renderer only ever writes into the element carrying the
//! well-known slot id. Each table owner mounts its own panel under a private
//! id and borrows the well-known id for the length of one render through a
//! [`SlotClaim`]. Claims stack: a claim taken while another element holds the
//! slot stashes that element, and releasing restores it.

use crate::{ClaimId, DisplayPagination, SlotError};
use tracing::debug;

pub const TABLE_SLOT_ID: &str = "table-container";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub row_ids: Vec<String>,
    pub pagination: DisplayPagination,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PanelContent {
    #[default]
    Empty,
    Loading,
    Table(RenderedTable),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panel {
    private_id: String,
    element_id: String,
    stash_marker: Option<String>,
    pub content: PanelContent,
}

impl Panel {
    fn new(private_id: &str) -> Self {
        Self {
            private_id: private_id.to_owned(),
            element_id: private_id.to_owned(),
            stash_marker: None,
            content: PanelContent::Empty,
        }
    }

    pub fn private_id(&self) -> &str {
        &self.private_id
    }

    /// The id the element currently answers to: its private id, or the slot
    /// id while it holds the slot.
    pub fn element_id(&self) -> &str {
        &self.element_id
    }

    /// Set while the element was displaced from the slot by a newer claim.
    pub fn stash_marker(&self) -> Option<&str> {
        self.stash_marker.as_deref()
    }
}

#[must_use = "a claim holds the table slot until it is released"]
#[derive(Debug, PartialEq, Eq)]
pub struct SlotClaim {
    id: ClaimId,
    owner: usize,
    owner_id: String,
}

impl SlotClaim {
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }
}

#[derive(Debug, Clone)]
pub struct PanelDocument {
    slot_id: String,
    panels: Vec<Panel>,
    holder: Option<usize>,
    stashed: Vec<usize>,
    active: Vec<(ClaimId, usize)>,
    last_claim: ClaimId,
}

impl Default for PanelDocument {
    fn default() -> Self {
        Self::new(TABLE_SLOT_ID)
    }
}

impl PanelDocument {
    pub fn new(slot_id: impl Into<String>) -> Self {
        Self {
            slot_id: slot_id.into(),
            panels: Vec::new(),
            holder: None,
            stashed: Vec::new(),
            active: Vec::new(),
            last_claim: ClaimId::default(),
        }
    }

    pub fn slot_id(&self) -> &str {
        &self.slot_id
    }

    /// Adds a panel under its private id. Mounting an id twice is a no-op.
    pub fn mount(&mut self, private_id: &str) {
        if self.index_of(private_id).is_none() {
            self.panels.push(Panel::new(private_id));
        }
    }

    /// Adds a panel that owns the slot id from the start, like a page-level
    /// table container. It gives the slot up to claims and gets it back
    /// when they are released.
    pub fn mount_occupant(&mut self, private_id: &str) {
        self.mount(private_id);
        if self.holder.is_some() {
            return;
        }
        if let Some(index) = self.index_of(private_id) {
            self.panels[index].element_id = self.slot_id.clone();
            self.holder = Some(index);
        }
    }

    pub fn panel(&self, private_id: &str) -> Option<&Panel> {
        self.index_of(private_id).map(|index| &self.panels[index])
    }

    pub fn panel_mut(&mut self, private_id: &str) -> Option<&mut Panel> {
        self.index_of(private_id)
            .map(move |index| &mut self.panels[index])
    }

    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    pub fn element_by_id(&self, id: &str) -> Option<&Panel> {
        self.panels.iter().find(|panel| panel.element_id == id)
    }

    pub fn count_elements_with_id(&self, id: &str) -> usize {
        self.panels
            .iter()
            .filter(|panel| panel.element_id == id)
            .count()
    }

    pub fn holder(&self) -> Option<&Panel> {
        self.holder.map(|index| &self.panels[index])
    }

    pub fn active_claims(&self) -> usize {
        self.active.len()
    }

    fn index_of(&self, private_id: &str) -> Option<usize> {
        self.panels
            .iter()
            .position(|panel| panel.private_id == private_id)
    }

    pub fn claim(&mut self, private_id: &str) -> Result<SlotClaim, SlotError> {
        let owner = self
            .index_of(private_id)
            .ok_or_else(|| SlotError::MissingContainer(private_id.to_owned()))?;
        if self.active.iter().any(|(_, index)| *index == owner) {
            return Err(SlotError::AlreadyHeld(private_id.to_owned()));
        }

        if let Some(previous) = self.holder.take() {
            let panel = &mut self.panels[previous];
            panel.element_id = panel.private_id.clone();
            panel.stash_marker = Some(self.slot_id.clone());
            self.stashed.push(previous);
        }

        self.panels[owner].element_id = self.slot_id.clone();
        self.holder = Some(owner);
        self.last_claim = self.last_claim.next();
        self.active.push((self.last_claim, owner));
        debug!(
            claim = self.last_claim.get(),
            owner = private_id,
            stashed = self.stashed.len(),
            "claimed table slot"
        );

        Ok(SlotClaim {
            id: self.last_claim,
            owner,
            owner_id: private_id.to_owned(),
        })
    }

    /// Gives the slot back. Returns `false` when the claim was already
    /// released, in which case nothing changes.
    pub fn release(&mut self, claim: &SlotClaim) -> bool {
        let Some(position) = self.active.iter().position(|(id, _)| *id == claim.id) else {
            return false;
        };
        self.active.remove(position);

        let owner = claim.owner;
        let panel = &mut self.panels[owner];
        panel.element_id = panel.private_id.clone();

        if self.holder == Some(owner) {
            self.holder = None;
            if let Some(previous) = self.stashed.pop() {
                let panel = &mut self.panels[previous];
                panel.stash_marker = None;
                panel.element_id = self.slot_id.clone();
                self.holder = Some(previous);
            }
        } else if let Some(stash_position) = self.stashed.iter().position(|index| *index == owner)
        {
            // Displaced claim released out of order; the holder keeps the slot.
            self.stashed.remove(stash_position);
            self.panels[owner].stash_marker = None;
        }

        debug!(
            claim = claim.id.get(),
            owner = claim.owner_id.as_str(),
            "released table slot"
        );
        true
    }

    /// Claims the slot for the life of the returned guard.
    pub fn scoped(&mut self, private_id: &str) -> Result<SlotGuard<'_>, SlotError> {
        let claim = self.claim(private_id)?;
        Ok(SlotGuard {
            document: self,
            claim,
        })
    }
}

/// Releases its claim when dropped, including while unwinding.
#[derive(Debug)]
pub struct SlotGuard<'a> {
    document: &'a mut PanelDocument,
    claim: SlotClaim,
}

impl SlotGuard<'_> {
    /// The element currently carrying the slot id.
    pub fn target(&mut self) -> &mut Panel {
        let document = &mut *self.document;
        let index = document
            .panels
            .iter()
            .position(|panel| panel.element_id == document.slot_id)
            .unwrap_or(self.claim.owner);
        debug_assert_eq!(
            index, self.claim.owner,
            "a live guard's owner must carry the slot id"
        );
        &mut document.panels[index]
    }

    pub fn document(&self) -> &PanelDocument {
        self.document
    }
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.document.release(&self.claim);
    }
}
