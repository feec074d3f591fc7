// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::QueryRequest;
use serde::{Deserialize, Serialize};

/// Pagination block of a query response. `filtered` is absent when the
/// server ran no filtering pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationInfo {
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filtered: Option<u64>,
}

impl PaginationInfo {
    pub fn filtered_count(&self) -> u64 {
        self.filtered.unwrap_or(self.total)
    }
}

/// When the "(filtered from N total)" suffix is shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilteredBadge {
    /// A filter is active and the server reports fewer (or more) rows than total.
    #[default]
    CountsDiffer,
    /// Any active filter shows the suffix, even when counts match.
    FilterActive,
}

impl FilteredBadge {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CountsDiffer => "counts_differ",
            Self::FilterActive => "filter_active",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "counts_differ" => Some(Self::CountsDiffer),
            "filter_active" => Some(Self::FilterActive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayPagination {
    /// Count the page controls paginate against.
    pub total: u64,
    pub info: String,
    pub is_filtered: bool,
}

impl DisplayPagination {
    pub fn page_count(&self, per_page: u64) -> u64 {
        if per_page == 0 {
            return 0;
        }
        self.total.div_ceil(per_page)
    }
}

pub fn reconcile(server: &PaginationInfo, request: &QueryRequest) -> DisplayPagination {
    reconcile_with(server, request, FilteredBadge::default())
}

pub fn reconcile_with(
    server: &PaginationInfo,
    request: &QueryRequest,
    badge: FilteredBadge,
) -> DisplayPagination {
    let has_filter = request.has_filter();
    let filtered = server.filtered_count();
    let is_filtered = match badge {
        FilteredBadge::CountsDiffer => has_filter && filtered != server.total,
        FilteredBadge::FilterActive => has_filter,
    };
    let display_count = if is_filtered { filtered } else { server.total };

    let start_item = if display_count == 0 {
        0
    } else {
        server
            .page
            .saturating_sub(1)
            .saturating_mul(server.per_page)
            .saturating_add(1)
    };
    let end_item = server
        .page
        .saturating_mul(server.per_page)
        .min(display_count);

    let mut info = format!("{start_item} to {end_item} of {display_count}");
    if is_filtered {
        info.push_str(&format!(" (filtered from {} total)", server.total));
    }

    DisplayPagination {
        total: display_count,
        info,
        is_filtered,
    }
}
