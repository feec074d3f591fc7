// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{
    DisplayPagination, FilterState, FilteredBadge, PaginationInfo, PanelContent, PanelDocument,
    QueryError, QueryRequest, RequestSeq, ResourceKind, TableAction, TableActionEvent,
    TableRenderer, TableSpec, ValidationError, build, reconcile_with,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_PER_PAGE: u32 = 25;

pub type Row = serde_json::Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub data: Vec<Row>,
    pub pagination: PaginationInfo,
}

/// Submits a query to the backend. Implemented by the HTTP client and by
/// in-memory backends.
pub trait QueryTransport {
    fn query(&mut self, endpoint: &str, request: &QueryRequest)
    -> Result<QueryResponse, QueryError>;
}

impl<T: QueryTransport + ?Sized> QueryTransport for &mut T {
    fn query(
        &mut self,
        endpoint: &str,
        request: &QueryRequest,
    ) -> Result<QueryResponse, QueryError> {
        (**self).query(endpoint, request)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabState {
    pub tab: ResourceKind,
    pub has_loaded_once: bool,
    pub is_visible: bool,
    pub last_params: Option<QueryRequest>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerOptions {
    pub per_page: u32,
    pub badge: FilteredBadge,
    pub debounce: Option<Duration>,
}

impl Default for OwnerOptions {
    fn default() -> Self {
        Self {
            per_page: DEFAULT_PER_PAGE,
            badge: FilteredBadge::default(),
            debounce: None,
        }
    }
}

/// One dispatched request. Only the most recently issued ticket of an owner
/// is allowed to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub resource: ResourceKind,
    pub seq: RequestSeq,
    pub endpoint: &'static str,
    pub request: QueryRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Rendered(DisplayPagination),
    Stale,
    Failed(QueryError),
}

#[derive(Debug, Clone)]
pub struct TableOwner {
    resource: ResourceKind,
    container_id: String,
    spec: TableSpec,
    state: TabState,
    filters: FilterState,
    search_draft: String,
    page: u32,
    per_page: u32,
    debounce: Duration,
    badge: FilteredBadge,
    latest_seq: RequestSeq,
    latest_request: Option<QueryRequest>,
    display: Option<DisplayPagination>,
}

impl TableOwner {
    pub fn new(resource: ResourceKind, options: OwnerOptions) -> Self {
        Self {
            resource,
            container_id: resource.container_id(),
            spec: TableSpec::for_resource(resource),
            state: TabState {
                tab: resource,
                has_loaded_once: false,
                is_visible: false,
                last_params: None,
            },
            filters: FilterState::default(),
            search_draft: String::new(),
            page: 1,
            per_page: options.per_page.max(1),
            debounce: options
                .debounce
                .unwrap_or_else(|| resource.default_debounce()),
            badge: options.badge,
            latest_seq: RequestSeq::default(),
            latest_request: None,
            display: None,
        }
    }

    pub fn resource(&self) -> ResourceKind {
        self.resource
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    pub fn state(&self) -> &TabState {
        &self.state
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn display(&self) -> Option<&DisplayPagination> {
        self.display.as_ref()
    }

    pub fn latest_seq(&self) -> RequestSeq {
        self.latest_seq
    }

    pub fn mount(&self, document: &mut PanelDocument) {
        document.mount(&self.container_id);
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.state.is_visible = visible;
    }

    /// Called on the first activation of the owner's tab.
    pub fn mark_activated(&mut self) {
        self.state.has_loaded_once = true;
    }

    /// Raw text typed into the search box, before debouncing.
    pub fn search_draft(&self) -> &str {
        &self.search_draft
    }

    pub fn set_search_draft(&mut self, draft: impl Into<String>) {
        self.search_draft = draft.into();
    }

    pub fn set_global_search(&mut self, value: impl Into<String>) {
        self.filters.global = value.into();
        self.page = 1;
    }

    pub fn set_column_filter(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.filters.set_column(name, value);
        self.page = 1;
    }

    pub fn set_date_range(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.filters.date_from = from.into();
        self.filters.date_to = to.into();
        self.page = 1;
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
        self.search_draft.clear();
        self.page = 1;
    }

    pub fn begin_load(&mut self) -> Result<LoadTicket, ValidationError> {
        self.filters.validate()?;
        let request = build(self.page, self.per_page, &self.filters);
        Ok(self.issue(request))
    }

    /// Derives the next request from the latest issued one, so a filter
    /// still in flight carries over. Falls back to the last rendered
    /// request, then to the parameters carried by the event.
    pub fn apply_table_action(&mut self, event: &TableActionEvent) -> LoadTicket {
        let base = self
            .latest_request
            .clone()
            .or_else(|| self.state.last_params.clone())
            .unwrap_or_else(|| event.current_params.clone());
        let request = match event.action {
            TableAction::PageChange => base.with_page(event.value),
            TableAction::PerPageChange => base.with_per_page(event.value),
        };
        self.issue(request)
    }

    fn issue(&mut self, request: QueryRequest) -> LoadTicket {
        self.page = request.page;
        self.per_page = request.per_page;
        self.latest_seq = self.latest_seq.next();
        debug!(
            resource = self.resource.as_str(),
            seq = self.latest_seq.get(),
            page = request.page,
            per_page = request.per_page,
            "dispatching query"
        );
        self.latest_request = Some(request.clone());
        LoadTicket {
            resource: self.resource,
            seq: self.latest_seq,
            endpoint: self.spec.endpoint,
            request,
        }
    }

    pub fn mark_loading(&self, document: &mut PanelDocument) {
        if let Some(panel) = document.panel_mut(&self.container_id) {
            panel.content = PanelContent::Loading;
        }
    }

    pub fn complete_load<R: TableRenderer + ?Sized>(
        &mut self,
        ticket: LoadTicket,
        result: Result<QueryResponse, QueryError>,
        document: &mut PanelDocument,
        renderer: &mut R,
    ) -> LoadOutcome {
        if ticket.resource != self.resource || ticket.seq != self.latest_seq {
            debug!(
                resource = self.resource.as_str(),
                seq = ticket.seq.get(),
                latest = self.latest_seq.get(),
                "dropping stale response"
            );
            return LoadOutcome::Stale;
        }

        let response = match result {
            Ok(response) => response,
            Err(error) => return self.fail(document, error),
        };

        let display = reconcile_with(&response.pagination, &ticket.request, self.badge);
        let rendered = {
            let mut guard = match document.scoped(&self.container_id) {
                Ok(guard) => guard,
                Err(error) => {
                    warn!(resource = self.resource.as_str(), %error, "cannot claim table slot");
                    return LoadOutcome::Failed(error.into());
                }
            };
            renderer.render(guard.target(), &self.spec, &response, &display)
        };

        match rendered {
            Ok(()) => {
                self.state.last_params = Some(ticket.request);
                self.display = Some(display.clone());
                LoadOutcome::Rendered(display)
            }
            Err(error) => self.fail(document, QueryError::Render(format!("{error:#}"))),
        }
    }

    fn fail(&mut self, document: &mut PanelDocument, error: QueryError) -> LoadOutcome {
        warn!(resource = self.resource.as_str(), %error, "query failed");
        if let Some(panel) = document.panel_mut(&self.container_id) {
            panel.content = PanelContent::Failed(error.user_message());
        }
        LoadOutcome::Failed(error)
    }

    /// Runs one full cycle synchronously: build, submit, render.
    pub fn load<T, R>(
        &mut self,
        transport: &mut T,
        document: &mut PanelDocument,
        renderer: &mut R,
    ) -> LoadOutcome
    where
        T: QueryTransport + ?Sized,
        R: TableRenderer + ?Sized,
    {
        let ticket = match self.begin_load() {
            Ok(ticket) => ticket,
            Err(error) => return self.fail(document, error.into()),
        };
        self.mark_loading(document);
        let result = transport.query(ticket.endpoint, &ticket.request);
        self.complete_load(ticket, result, document, renderer)
    }
}

#[cfg(test)]
mod tests {
    use super::{LoadOutcome, OwnerOptions, QueryResponse, QueryTransport, TableOwner};
    use crate::{
        DisplayPagination, Panel, PanelContent, PanelDocument, PlainTableRenderer, QueryError,
        QueryRequest, ResourceKind, TABLE_SLOT_ID, TableAction, TableActionEvent, TableRenderer,
        TableSpec,
    };
    use anyhow::{Result, bail};
    use serde_json::json;
    use std::collections::VecDeque;

    #[derive(Debug, Default)]
    struct ScriptedTransport {
        responses: VecDeque<Result<QueryResponse, QueryError>>,
        requests: Vec<(String, QueryRequest)>,
    }

    impl ScriptedTransport {
        fn push_rows(&mut self, total: u64, filtered: Option<u64>, ids: &[i64]) {
            let data = ids
                .iter()
                .map(|id| json!({"id": id, "name": format!("admin-{id}")}))
                .collect::<Vec<_>>();
            let response = serde_json::from_value(json!({
                "data": data,
                "pagination": {"page": 1, "per_page": 10, "total": total, "filtered": filtered}
            }))
            .expect("valid response");
            self.responses.push_back(Ok(response));
        }
    }

    impl QueryTransport for ScriptedTransport {
        fn query(
            &mut self,
            endpoint: &str,
            request: &QueryRequest,
        ) -> Result<QueryResponse, QueryError> {
            self.requests.push((endpoint.to_owned(), request.clone()));
            self.responses
                .pop_front()
                .unwrap_or_else(|| Err(QueryError::Transport("no scripted response".to_owned())))
        }
    }

    struct ExplodingRenderer;

    impl TableRenderer for ExplodingRenderer {
        fn render(
            &mut self,
            target: &mut Panel,
            _table: &TableSpec,
            _response: &QueryResponse,
            _pagination: &DisplayPagination,
        ) -> Result<()> {
            target.content = PanelContent::Loading;
            bail!("cell renderer failed")
        }
    }

    fn owner_with_document(resource: ResourceKind) -> (TableOwner, PanelDocument) {
        let owner = TableOwner::new(
            resource,
            OwnerOptions {
                per_page: 10,
                ..OwnerOptions::default()
            },
        );
        let mut document = PanelDocument::default();
        owner.mount(&mut document);
        (owner, document)
    }

    #[test]
    fn load_renders_into_own_panel_and_releases_slot() {
        let (mut owner, mut document) = owner_with_document(ResourceKind::Admins);
        let mut transport = ScriptedTransport::default();
        transport.push_rows(2, None, &[1, 2]);

        let outcome = owner.load(&mut transport, &mut document, &mut PlainTableRenderer);
        let LoadOutcome::Rendered(display) = outcome else {
            panic!("expected render, got {outcome:?}");
        };
        assert_eq!(display.info, "1 to 2 of 2");
        assert_eq!(transport.requests[0].0, "admins/query");
        assert!(document.element_by_id(TABLE_SLOT_ID).is_none());
        assert!(matches!(
            document.panel("admins-table").map(|panel| &panel.content),
            Some(PanelContent::Table(_))
        ));
        assert_eq!(
            owner.state().last_params.as_ref().map(|params| params.page),
            Some(1)
        );
    }

    #[test]
    fn stale_ticket_is_discarded() {
        let (mut owner, mut document) = owner_with_document(ResourceKind::Admins);
        let mut transport = ScriptedTransport::default();
        transport.push_rows(50, Some(3), &[1, 2, 3]);
        transport.push_rows(50, Some(1), &[7]);

        owner.set_global_search("a");
        let first = owner.begin_load().expect("valid filters");
        owner.set_global_search("al");
        let second = owner.begin_load().expect("valid filters");
        let first_result = transport.query(first.endpoint, &first.request);
        let second_result = transport.query(second.endpoint, &second.request);

        let newer = owner.complete_load(
            second,
            second_result,
            &mut document,
            &mut PlainTableRenderer,
        );
        assert!(matches!(newer, LoadOutcome::Rendered(_)));

        let older =
            owner.complete_load(first, first_result, &mut document, &mut PlainTableRenderer);
        assert_eq!(older, LoadOutcome::Stale);
        let Some(PanelContent::Table(table)) =
            document.panel("admins-table").map(|panel| &panel.content)
        else {
            panic!("expected table");
        };
        assert_eq!(table.row_ids, vec!["7"]);
        assert_eq!(
            owner
                .state()
                .last_params
                .as_ref()
                .and_then(|params| params.global_search()),
            Some("al")
        );
    }

    #[test]
    fn render_failure_releases_slot_and_shows_failure() {
        let (mut owner, mut document) = owner_with_document(ResourceKind::Roles);
        let mut transport = ScriptedTransport::default();
        transport.push_rows(1, None, &[1]);

        let outcome = owner.load(&mut transport, &mut document, &mut ExplodingRenderer);
        assert!(matches!(outcome, LoadOutcome::Failed(QueryError::Render(_))));
        assert_eq!(document.active_claims(), 0);
        let panel = document.panel("roles-table").expect("mounted");
        assert_eq!(panel.element_id(), "roles-table");
        assert!(matches!(&panel.content, PanelContent::Failed(message) if message.contains("retry")));
        assert_eq!(owner.state().last_params, None);
    }

    #[test]
    fn transport_failure_marks_panel_failed() {
        let (mut owner, mut document) = owner_with_document(ResourceKind::Sessions);
        let mut transport = ScriptedTransport::default();
        let outcome = owner.load(&mut transport, &mut document, &mut PlainTableRenderer);
        assert!(matches!(outcome, LoadOutcome::Failed(QueryError::Transport(_))));
        assert!(matches!(
            document.panel("sessions-table").map(|panel| &panel.content),
            Some(PanelContent::Failed(_))
        ));
    }

    #[test]
    fn invalid_dates_are_never_sent() {
        let (mut owner, mut document) = owner_with_document(ResourceKind::Sessions);
        let mut transport = ScriptedTransport::default();
        owner.set_date_range("2026-13-40", "2026-01-01");

        let outcome = owner.load(&mut transport, &mut document, &mut PlainTableRenderer);
        assert!(matches!(outcome, LoadOutcome::Failed(QueryError::Validation(_))));
        assert!(transport.requests.is_empty());
    }

    #[test]
    fn unmounted_container_aborts_without_claiming() {
        let mut owner = TableOwner::new(ResourceKind::Languages, OwnerOptions::default());
        let mut document = PanelDocument::default();
        document.mount_occupant("page-table");
        let mut transport = ScriptedTransport::default();
        transport.push_rows(1, None, &[1]);

        let outcome = owner.load(&mut transport, &mut document, &mut PlainTableRenderer);
        assert!(matches!(outcome, LoadOutcome::Failed(QueryError::Slot(_))));
        assert_eq!(
            document.holder().map(|panel| panel.private_id()),
            Some("page-table")
        );
    }

    #[test]
    fn page_change_builds_from_last_params() {
        let (mut owner, mut document) = owner_with_document(ResourceKind::Admins);
        let mut transport = ScriptedTransport::default();
        transport.push_rows(30, Some(30), &[1]);
        owner.set_column_filter("status", "active");
        owner.load(&mut transport, &mut document, &mut PlainTableRenderer);

        let ticket = owner.apply_table_action(&TableActionEvent {
            action: TableAction::PageChange,
            value: 3,
            current_params: QueryRequest {
                page: 9,
                per_page: 99,
                search: None,
                date: None,
            },
        });
        assert_eq!(ticket.request.page, 3);
        assert_eq!(ticket.request.per_page, 10);
        assert_eq!(ticket.request.column_filter("status"), Some("active"));
        assert_eq!(owner.page(), 3);

        // The previous request stays untouched.
        assert_eq!(
            owner.state().last_params.as_ref().map(|params| params.page),
            Some(1)
        );
    }

    #[test]
    fn per_page_change_resets_to_first_page() {
        let (mut owner, _document) = owner_with_document(ResourceKind::Admins);
        let ticket = owner.apply_table_action(&TableActionEvent {
            action: TableAction::PerPageChange,
            value: 50,
            current_params: QueryRequest {
                page: 4,
                per_page: 10,
                search: None,
                date: None,
            },
        });
        assert_eq!((ticket.request.page, ticket.request.per_page), (1, 50));
        assert_eq!(owner.per_page(), 50);
    }

    #[test]
    fn filter_edits_reset_page() {
        let (mut owner, _document) = owner_with_document(ResourceKind::Telemetry);
        owner.apply_table_action(&TableActionEvent {
            action: TableAction::PageChange,
            value: 4,
            current_params: QueryRequest {
                page: 1,
                per_page: 10,
                search: None,
                date: None,
            },
        });
        assert_eq!(owner.page(), 4);
        owner.set_column_filter("event", "boot");
        assert_eq!(owner.page(), 1);
        owner.clear_filters();
        assert!(owner.filters().is_empty());
    }

    #[test]
    fn configured_debounce_overrides_page_default() {
        let owner = TableOwner::new(
            ResourceKind::Telemetry,
            OwnerOptions {
                debounce: Some(std::time::Duration::from_millis(200)),
                ..OwnerOptions::default()
            },
        );
        assert_eq!(owner.debounce(), std::time::Duration::from_millis(200));
        let default = TableOwner::new(ResourceKind::Telemetry, OwnerOptions::default());
        assert_eq!(default.debounce(), ResourceKind::Telemetry.default_debounce());
    }
}
