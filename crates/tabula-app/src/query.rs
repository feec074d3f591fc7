// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::Date;
use time::macros::format_description;

/// Body of `POST <resource>/query`.
///
/// Empty filter containers are never serialized: `search` is `None` once it
/// has neither a global term nor column filters, and `date` only exists as a
/// complete pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub page: u32,
    pub per_page: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateRange>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub columns: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: String,
    pub to: String,
}

impl QueryRequest {
    pub fn global_search(&self) -> Option<&str> {
        self.search.as_ref().and_then(|search| search.global.as_deref())
    }

    pub fn column_filter(&self, name: &str) -> Option<&str> {
        self.search
            .as_ref()
            .and_then(|search| search.columns.get(name))
            .map(String::as_str)
    }

    pub fn has_filter(&self) -> bool {
        let searched = self.search.as_ref().is_some_and(|search| {
            search.global.is_some() || !search.columns.is_empty()
        });
        searched || self.date.is_some()
    }

    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page: page.max(1),
            ..self.clone()
        }
    }

    pub fn with_per_page(&self, per_page: u32) -> Self {
        Self {
            page: 1,
            per_page: per_page.max(1),
            ..self.clone()
        }
    }
}

/// Raw filter inputs for one table, as typed by the user. Values are kept
/// untrimmed; [`build`] is the only place that prunes them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub global: String,
    pub columns: BTreeMap<String, String>,
    pub date_from: String,
    pub date_to: String,
}

impl FilterState {
    pub fn with_global(mut self, value: impl Into<String>) -> Self {
        self.global = value.into();
        self
    }

    pub fn with_column(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_column(name, value);
        self
    }

    pub fn with_date_range(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.date_from = from.into();
        self.date_to = to.into();
        self
    }

    pub fn set_column(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.columns.insert(name.into(), value.into());
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// True when building a request from this state would send no filters.
    pub fn is_empty(&self) -> bool {
        !build(1, 1, self).has_filter()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let from = parse_date("date.from", &self.date_from)?;
        let to = parse_date("date.to", &self.date_to)?;
        if let (Some(from), Some(to)) = (from, to)
            && from > to
        {
            return Err(ValidationError::ReversedRange {
                from: self.date_from.trim().to_owned(),
                to: self.date_to.trim().to_owned(),
            });
        }
        Ok(())
    }
}

fn parse_date(field: &'static str, raw: &str) -> Result<Option<Date>, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    Date::parse(trimmed, format_description!("[year]-[month]-[day]"))
        .map(Some)
        .map_err(|_| ValidationError::InvalidDate {
            field,
            value: trimmed.to_owned(),
        })
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

/// Turns paging plus raw filter inputs into the canonical request.
///
/// Values are trimmed and empty ones dropped. A date bound without its
/// partner is dropped too. Column values are not validated here; an id
/// filter like `"abc"` is sent as-is.
pub fn build(page: u32, per_page: u32, filters: &FilterState) -> QueryRequest {
    let global = non_empty(&filters.global);
    let columns = filters
        .columns
        .iter()
        .filter_map(|(name, value)| {
            let name = non_empty(name)?;
            let value = non_empty(value)?;
            Some((name, value))
        })
        .collect::<BTreeMap<_, _>>();

    let search = (global.is_some() || !columns.is_empty()).then_some(SearchFilter { global, columns });

    let date = match (non_empty(&filters.date_from), non_empty(&filters.date_to)) {
        (Some(from), Some(to)) => Some(DateRange { from, to }),
        _ => None,
    };

    QueryRequest {
        page: page.max(1),
        per_page: per_page.max(1),
        search,
        date,
    }
}

#[cfg(test)]
mod tests {
    use super::{FilterState, QueryRequest, build};
    use crate::ValidationError;
    use anyhow::Result;
    use serde_json::json;

    #[test]
    fn empty_filters_send_only_paging() -> Result<()> {
        let request = build(3, 25, &FilterState::default());
        assert_eq!(request.search, None);
        assert_eq!(request.date, None);
        assert_eq!(
            serde_json::to_value(&request)?,
            json!({"page": 3, "per_page": 25})
        );
        Ok(())
    }

    #[test]
    fn whitespace_only_values_are_pruned() -> Result<()> {
        let filters = FilterState::default()
            .with_global("   ")
            .with_column("email", "\t")
            .with_column("role", "");
        let request = build(1, 10, &filters);
        assert!(!request.has_filter());
        assert_eq!(
            serde_json::to_value(&request)?,
            json!({"page": 1, "per_page": 10})
        );
        Ok(())
    }

    #[test]
    fn non_empty_values_are_trimmed_into_search() -> Result<()> {
        let filters = FilterState::default()
            .with_global("  alice ")
            .with_column("status", " active ")
            .with_column("role", "");
        let request = build(1, 10, &filters);
        assert_eq!(request.global_search(), Some("alice"));
        assert_eq!(request.column_filter("status"), Some("active"));
        assert_eq!(request.column_filter("role"), None);
        assert_eq!(
            serde_json::to_value(&request)?,
            json!({
                "page": 1,
                "per_page": 10,
                "search": {"global": "alice", "columns": {"status": "active"}}
            })
        );
        Ok(())
    }

    #[test]
    fn columns_without_global_omit_the_global_key() -> Result<()> {
        let request = build(1, 10, &FilterState::default().with_column("group", "billing"));
        assert_eq!(
            serde_json::to_value(&request)?,
            json!({"page": 1, "per_page": 10, "search": {"columns": {"group": "billing"}}})
        );
        Ok(())
    }

    #[test]
    fn lone_date_bound_is_dropped() {
        let only_from = FilterState {
            date_from: "2026-01-01".to_owned(),
            ..FilterState::default()
        };
        assert_eq!(build(1, 10, &only_from).date, None);

        let only_to = FilterState {
            date_to: "2026-01-31".to_owned(),
            ..FilterState::default()
        };
        assert_eq!(build(1, 10, &only_to).date, None);
        assert!(only_to.is_empty());
    }

    #[test]
    fn complete_date_pair_is_sent() -> Result<()> {
        let filters = FilterState::default().with_date_range("2026-01-01 ", " 2026-01-31");
        let request = build(1, 10, &filters);
        assert_eq!(
            serde_json::to_value(&request)?,
            json!({"page": 1, "per_page": 10, "date": {"from": "2026-01-01", "to": "2026-01-31"}})
        );
        Ok(())
    }

    #[test]
    fn non_numeric_id_filter_passes_through() {
        let request = build(1, 10, &FilterState::default().with_column("admin_id", "abc"));
        assert_eq!(request.column_filter("admin_id"), Some("abc"));
    }

    #[test]
    fn zero_paging_is_raised_to_one() {
        let request = build(0, 0, &FilterState::default());
        assert_eq!((request.page, request.per_page), (1, 1));
    }

    #[test]
    fn validate_rejects_malformed_and_reversed_dates() {
        let malformed = FilterState::default().with_date_range("01/02/2026", "");
        assert_eq!(
            malformed.validate(),
            Err(ValidationError::InvalidDate {
                field: "date.from",
                value: "01/02/2026".to_owned(),
            })
        );

        let reversed = FilterState::default().with_date_range("2026-02-01", "2026-01-01");
        assert!(matches!(
            reversed.validate(),
            Err(ValidationError::ReversedRange { .. })
        ));

        let fine = FilterState::default().with_date_range("2026-01-01", "2026-01-01");
        assert_eq!(fine.validate(), Ok(()));
    }

    #[test]
    fn page_helpers_clone_without_touching_filters() {
        let base = build(4, 10, &FilterState::default().with_global("bob"));
        let next = base.with_page(5);
        assert_eq!(next.page, 5);
        assert_eq!(next.global_search(), Some("bob"));
        assert_eq!(base.page, 4);

        let resized = base.with_per_page(50);
        assert_eq!((resized.page, resized.per_page), (1, 50));
    }

    #[test]
    fn request_decodes_without_optional_keys() -> Result<()> {
        let request: QueryRequest = serde_json::from_value(json!({"page": 2, "per_page": 5}))?;
        assert_eq!(request, build(2, 5, &FilterState::default()));
        Ok(())
    }
}
