// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, Tabs};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tabula_app::{
    DisplayPagination, LoadOutcome, LoadTicket, Panel, PanelContent, PlainTableRenderer,
    QueryError, QueryRequest, QueryResponse, RenderedTable, ResourceKind, TabbedPanel,
    TableAction, TableActionEvent, TableOwner, TableRenderer, TableSpec, build,
};
use tracing::{debug, warn};

const EVENT_POLL: Duration = Duration::from_millis(120);
const STATUS_TTL: Duration = Duration::from_secs(4);
const PER_PAGE_CHOICES: [u32; 4] = [10, 25, 50, 100];
const FILTER_MARK: &str = "▼";
const DATE_SEPARATOR: &str = "..";

pub trait AppRuntime {
    fn query(
        &mut self,
        endpoint: &str,
        request: &QueryRequest,
    ) -> Result<QueryResponse, QueryError>;

    /// Runs the query for `ticket` and reports back on `tx`. The default
    /// runs inline; runtimes with a network backend move it to a thread.
    fn spawn_query(&mut self, ticket: LoadTicket, tx: Sender<InternalEvent>) -> Result<()> {
        let result = self.query(ticket.endpoint, &ticket.request);
        tx.send(InternalEvent::QueryFinished { ticket, result })
            .map_err(|_| anyhow!("query event channel closed"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InternalEvent {
    ClearStatus {
        token: u64,
    },
    QueryFinished {
        ticket: LoadTicket,
        result: Result<QueryResponse, QueryError>,
    },
}

/// Renders rows as plain text and shortens long cells to fit a terminal
/// column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalRenderer {
    max_cell_width: usize,
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self { max_cell_width: 32 }
    }
}

impl TerminalRenderer {
    pub fn new(max_cell_width: usize) -> Self {
        Self {
            max_cell_width: max_cell_width.max(2),
        }
    }
}

impl TableRenderer for TerminalRenderer {
    fn render(
        &mut self,
        target: &mut Panel,
        table: &TableSpec,
        response: &QueryResponse,
        pagination: &DisplayPagination,
    ) -> Result<()> {
        PlainTableRenderer.render(target, table, response, pagination)?;
        if let PanelContent::Table(rendered) = &mut target.content {
            for cell in rendered.rows.iter_mut().flatten() {
                *cell = fit_cell(cell, self.max_cell_width);
            }
        }
        Ok(())
    }
}

fn fit_cell(text: &str, max_width: usize) -> String {
    let flat = text.replace(['\n', '\r', '\t'], " ");
    if flat.chars().count() <= max_width {
        return flat;
    }
    let mut out = flat
        .chars()
        .take(max_width.saturating_sub(1))
        .collect::<String>();
    out.push('…');
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum InputMode {
    #[default]
    Nav,
    Search,
    ColumnFilter,
    DateRange,
}

#[derive(Debug, Clone, PartialEq, Default)]
struct ViewData {
    mode: InputMode,
    input: String,
    status_line: Option<String>,
    status_token: u64,
    renderer: TerminalRenderer,
}

pub fn run_app<R: AppRuntime>(
    panel: &mut TabbedPanel,
    initial: ResourceKind,
    runtime: &mut R,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();
    panel.mount(initial, Instant::now());

    let mut result = Ok(());
    loop {
        process_internal_events(panel, &mut view_data, &internal_tx, &internal_rx);
        let tickets = panel.tick(Instant::now());
        dispatch_tickets(runtime, &mut view_data, &internal_tx, tickets);

        if let Err(error) = terminal.draw(|frame| render(frame, panel, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let timeout = poll_timeout(panel.next_deadline(), Instant::now());
        let has_event = event::poll(timeout).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(
                        panel,
                        runtime,
                        &mut view_data,
                        &internal_tx,
                        key,
                        Instant::now(),
                    ) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

/// How long the loop may block on input before a timer is due.
fn poll_timeout(deadline: Option<Instant>, now: Instant) -> Duration {
    match deadline {
        Some(deadline) => deadline.saturating_duration_since(now).min(EVENT_POLL),
        None => EVENT_POLL,
    }
}

fn process_internal_events(
    panel: &mut TabbedPanel,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                view_data.status_line = None;
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::QueryFinished { ticket, result } => {
                let resource = ticket.resource;
                let mut renderer = view_data.renderer;
                match panel.complete(ticket, result, &mut renderer) {
                    LoadOutcome::Rendered(_) | LoadOutcome::Stale => {}
                    LoadOutcome::Failed(error) => {
                        let message = failure_status(resource, &error);
                        emit_status(view_data, tx, message);
                    }
                }
            }
        }
    }
}

fn failure_status(resource: ResourceKind, error: &QueryError) -> String {
    match error.redirect() {
        Some(redirect) => format!(
            "{}: re-authenticate at {redirect} and press r",
            resource.label()
        ),
        None => format!("{}: {}", resource.label(), error.user_message()),
    }
}

fn dispatch_tickets<R: AppRuntime>(
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    tickets: impl IntoIterator<Item = LoadTicket>,
) {
    for ticket in tickets {
        debug!(endpoint = ticket.endpoint, seq = ticket.seq.get(), "spawning query");
        if let Err(error) = runtime.spawn_query(ticket, tx.clone()) {
            warn!(%error, "cannot dispatch query");
            emit_status(view_data, tx, format!("query dispatch failed: {error}"));
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_TTL);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    view_data.status_line = Some(message.into());
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn handle_key_event<R: AppRuntime>(
    panel: &mut TabbedPanel,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
    now: Instant,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    match view_data.mode {
        InputMode::Search => {
            handle_search_key(panel, view_data, key, now);
            false
        }
        InputMode::ColumnFilter | InputMode::DateRange => {
            handle_prompt_key(panel, runtime, view_data, internal_tx, key);
            false
        }
        InputMode::Nav => handle_nav_key(panel, runtime, view_data, internal_tx, key),
    }
}

fn handle_nav_key<R: AppRuntime>(
    panel: &mut TabbedPanel,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    let Some(tab) = panel.visible_tab() else {
        return key.code == KeyCode::Char('q');
    };

    let ticket = match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Tab | KeyCode::Char('f') => panel.rotate(1),
        KeyCode::BackTab | KeyCode::Char('b') => panel.rotate(-1),
        KeyCode::Char('/') => {
            view_data.input = panel
                .visible_owner()
                .map(|owner| owner.search_draft().to_owned())
                .unwrap_or_default();
            view_data.mode = InputMode::Search;
            None
        }
        KeyCode::Char('c') => {
            view_data.input.clear();
            view_data.mode = InputMode::ColumnFilter;
            None
        }
        KeyCode::Char('d') => {
            if !tab.supports_date_range() {
                emit_status(
                    view_data,
                    internal_tx,
                    format!("{} has no date range", tab.label()),
                );
                return false;
            }
            view_data.input.clear();
            view_data.mode = InputMode::DateRange;
            None
        }
        KeyCode::Char('n') | KeyCode::Right | KeyCode::PageDown => {
            change_page(panel, view_data, internal_tx, 1)
        }
        KeyCode::Char('p') | KeyCode::Left | KeyCode::PageUp => {
            change_page(panel, view_data, internal_tx, -1)
        }
        KeyCode::Char('+') => change_per_page(panel, view_data, internal_tx, true),
        KeyCode::Char('-') => change_per_page(panel, view_data, internal_tx, false),
        KeyCode::Char('r') => panel.reload(tab),
        KeyCode::Char('x') => {
            view_data.input.clear();
            emit_status(view_data, internal_tx, "filters cleared");
            panel.clear_filters(tab)
        }
        _ => None,
    };

    dispatch_tickets(runtime, view_data, internal_tx, ticket);
    false
}

fn handle_search_key(panel: &mut TabbedPanel, view_data: &mut ViewData, key: KeyEvent, now: Instant) {
    match key.code {
        KeyCode::Esc | KeyCode::Enter => {
            view_data.mode = InputMode::Nav;
        }
        KeyCode::Backspace => {
            view_data.input.pop();
            panel.search_input(&view_data.input, now);
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            view_data.input.push(ch);
            panel.search_input(&view_data.input, now);
        }
        _ => {}
    }
}

fn handle_prompt_key<R: AppRuntime>(
    panel: &mut TabbedPanel,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Esc => {
            view_data.mode = InputMode::Nav;
            view_data.input.clear();
        }
        KeyCode::Backspace => {
            view_data.input.pop();
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            view_data.input.push(ch);
        }
        KeyCode::Enter => {
            let Some(tab) = panel.visible_tab() else {
                view_data.mode = InputMode::Nav;
                return;
            };
            let input = std::mem::take(&mut view_data.input);
            let mode = std::mem::take(&mut view_data.mode);
            let ticket = match mode {
                InputMode::ColumnFilter => match parse_column_filter(tab, &input) {
                    Ok((name, value)) => panel.set_column_filter(tab, &name, &value),
                    Err(message) => {
                        emit_status(view_data, internal_tx, message);
                        None
                    }
                },
                InputMode::DateRange => match parse_date_range(&input) {
                    Ok((from, to)) => {
                        let ticket = panel.set_date_range(tab, &from, &to);
                        if ticket.is_none() {
                            emit_status(view_data, internal_tx, "invalid date range");
                        }
                        ticket
                    }
                    Err(message) => {
                        emit_status(view_data, internal_tx, message);
                        None
                    }
                },
                InputMode::Nav | InputMode::Search => None,
            };
            dispatch_tickets(runtime, view_data, internal_tx, ticket);
        }
        _ => {}
    }
}

/// Parses `field=value` against the filter fields the tab exposes. An empty
/// value clears that field.
fn parse_column_filter(
    tab: ResourceKind,
    input: &str,
) -> std::result::Result<(String, String), String> {
    let Some((name, value)) = input.split_once('=') else {
        return Err("column filter must look like field=value".to_owned());
    };
    let name = name.trim();
    if !tab.filter_fields().contains(&name) {
        return Err(format!(
            "unknown filter field {name:?}; expected one of: {}",
            tab.filter_fields().join(", ")
        ));
    }
    Ok((name.to_owned(), value.trim().to_owned()))
}

/// Parses `from..to`. An empty input clears the range.
fn parse_date_range(input: &str) -> std::result::Result<(String, String), String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok((String::new(), String::new()));
    }
    let Some((from, to)) = input.split_once(DATE_SEPARATOR) else {
        return Err(format!(
            "date range must look like 2026-01-01{DATE_SEPARATOR}2026-01-31"
        ));
    };
    Ok((from.trim().to_owned(), to.trim().to_owned()))
}

fn current_params(owner: &TableOwner) -> QueryRequest {
    owner
        .state()
        .last_params
        .clone()
        .unwrap_or_else(|| build(owner.page(), owner.per_page(), owner.filters()))
}

fn change_page(
    panel: &mut TabbedPanel,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    delta: i64,
) -> Option<LoadTicket> {
    let owner = panel.visible_owner()?;
    let Some(display) = owner.display() else {
        emit_status(view_data, internal_tx, "nothing loaded yet");
        return None;
    };
    let pages = display.page_count(u64::from(owner.per_page())).max(1);
    let current = i64::from(owner.page());
    let target = (current + delta).clamp(1, i64::try_from(pages).unwrap_or(i64::MAX));
    if target == current {
        let edge = if delta > 0 { "last page" } else { "first page" };
        emit_status(view_data, internal_tx, edge);
        return None;
    }

    let event = TableActionEvent {
        action: TableAction::PageChange,
        value: u32::try_from(target).unwrap_or(u32::MAX),
        current_params: current_params(owner),
    };
    panel.table_action(event)
}

fn change_per_page(
    panel: &mut TabbedPanel,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    grow: bool,
) -> Option<LoadTicket> {
    let owner = panel.visible_owner()?;
    let current = owner.per_page();
    let next = if grow {
        PER_PAGE_CHOICES.iter().copied().find(|choice| *choice > current)
    } else {
        PER_PAGE_CHOICES
            .iter()
            .rev()
            .copied()
            .find(|choice| *choice < current)
    };
    let Some(next) = next else {
        emit_status(view_data, internal_tx, format!("{current} rows per page"));
        return None;
    };

    let event = TableActionEvent {
        action: TableAction::PerPageChange,
        value: next,
        current_params: current_params(owner),
    };
    panel.table_action(event)
}

fn tab_title(owner: &TableOwner) -> String {
    if owner.filters().is_empty() {
        format!(" {} ", owner.resource().label())
    } else {
        format!(" {} {FILTER_MARK} ", owner.resource().label())
    }
}

fn input_line_text(panel: &TabbedPanel, view_data: &ViewData) -> String {
    match view_data.mode {
        InputMode::Search => format!("/{}▏", view_data.input),
        InputMode::ColumnFilter => format!("filter (field=value): {}▏", view_data.input),
        InputMode::DateRange => format!(
            "dates (from{DATE_SEPARATOR}to): {}▏",
            view_data.input
        ),
        InputMode::Nav => {
            let Some(owner) = panel.visible_owner() else {
                return String::new();
            };
            let filters = owner.filters();
            let mut parts = Vec::new();
            if !owner.search_draft().is_empty() {
                parts.push(format!("search {:?}", owner.search_draft()));
            }
            for (name, value) in &filters.columns {
                if !value.trim().is_empty() {
                    parts.push(format!("{name}={value}"));
                }
            }
            if !filters.date_from.is_empty() || !filters.date_to.is_empty() {
                parts.push(format!(
                    "{}{DATE_SEPARATOR}{}",
                    filters.date_from, filters.date_to
                ));
            }
            if parts.is_empty() {
                "no filters".to_owned()
            } else {
                parts.join(" | ")
            }
        }
    }
}

fn status_text(panel: &TabbedPanel, view_data: &ViewData) -> String {
    let mode = match view_data.mode {
        InputMode::Nav => "NAV",
        InputMode::Search => "SEARCH",
        InputMode::ColumnFilter | InputMode::DateRange => "FILTER",
    };
    let hints = match view_data.mode {
        InputMode::Nav => "tab/f b | / c d x | n/p +/- | r | q",
        InputMode::Search => "type to search | enter/esc done",
        InputMode::ColumnFilter | InputMode::DateRange => "enter apply | esc cancel",
    };
    let pages = panel
        .visible_owner()
        .and_then(|owner| owner.display().map(|display| (owner, display)))
        .map(|(owner, display)| {
            format!(
                "page {}/{}",
                owner.page(),
                display.page_count(u64::from(owner.per_page())).max(1)
            )
        });

    let mut parts = vec![mode.to_owned()];
    if let Some(status) = &view_data.status_line {
        parts.push(status.clone());
    }
    if let Some(pages) = pages {
        parts.push(pages);
    }
    parts.push(hints.to_owned());
    parts.join(" | ")
}

fn panel_message(content: &PanelContent) -> Option<String> {
    match content {
        PanelContent::Empty => Some("not loaded yet; press r".to_owned()),
        PanelContent::Loading => Some("loading…".to_owned()),
        PanelContent::Failed(message) => Some(message.clone()),
        PanelContent::Table(_) => None,
    }
}

fn table_title(resource: ResourceKind, table: &RenderedTable) -> String {
    format!(" {} | {} ", resource.label(), table.pagination.info)
}

fn render(frame: &mut ratatui::Frame<'_>, panel: &TabbedPanel, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let owners = panel
        .tabs()
        .filter_map(|tab| panel.owner(tab))
        .collect::<Vec<_>>();
    let selected = owners
        .iter()
        .position(|owner| Some(owner.resource()) == panel.visible_tab())
        .unwrap_or(0);
    let tabs = Tabs::new(owners.iter().map(|owner| tab_title(owner)).collect::<Vec<_>>())
        .block(Block::default().title("tabula").borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, layout[0]);

    let input = Paragraph::new(input_line_text(panel, view_data))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(input, layout[1]);

    render_table(frame, layout[2], panel);

    let status = Paragraph::new(status_text(panel, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[3]);
}

fn render_table(frame: &mut ratatui::Frame<'_>, area: Rect, panel: &TabbedPanel) {
    let (Some(tab), Some(target)) = (panel.visible_tab(), panel.visible_panel()) else {
        let empty = Paragraph::new(String::new()).block(Block::default().borders(Borders::ALL));
        frame.render_widget(empty, area);
        return;
    };

    let PanelContent::Table(table) = &target.content else {
        let message = panel_message(&target.content).unwrap_or_default();
        let style = if matches!(target.content, PanelContent::Failed(_)) {
            Style::default().fg(Color::Red)
        } else {
            Style::default()
        };
        let body = Paragraph::new(message).style(style).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", tab.label())),
        );
        frame.render_widget(body, area);
        return;
    };

    let widths = vec![Constraint::Min(6); table.columns.len().max(1)];
    let header = Row::new(table.columns.iter().map(|label| {
        Cell::from(label.clone()).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));
    let rows = table
        .rows
        .iter()
        .map(|row| Row::new(row.iter().map(|cell| Cell::from(cell.clone()))));
    let widget = Table::new(rows, widths).header(header).block(
        Block::default()
            .borders(Borders::ALL)
            .title(table_title(tab, table)),
    );
    frame.render_widget(widget, area);
}

#[cfg(test)]
mod tests {
    use super::{
        AppRuntime, EVENT_POLL, InputMode, InternalEvent, TerminalRenderer, ViewData,
        dispatch_tickets, fit_cell, handle_key_event, input_line_text, panel_message,
        parse_column_filter, parse_date_range, poll_timeout, process_internal_events,
        status_text,
    };
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use serde_json::json;
    use std::sync::mpsc::{self, Receiver, Sender};
    use std::time::{Duration, Instant};
    use tabula_app::{
        FilterState, PanelContent, PanelDocument, PanelOptions, QueryError, QueryRequest,
        QueryResponse, QueryTransport, ResourceKind, TabbedPanel, TableRenderer, TableSpec,
        build, reconcile,
    };
    use tabula_testkit::{DEFAULT_SEED, DemoBackend};

    struct TestRuntime {
        backend: DemoBackend,
    }

    impl AppRuntime for TestRuntime {
        fn query(
            &mut self,
            endpoint: &str,
            request: &QueryRequest,
        ) -> Result<QueryResponse, QueryError> {
            self.backend.query(endpoint, request)
        }
    }

    struct Harness {
        panel: TabbedPanel,
        runtime: TestRuntime,
        view_data: ViewData,
        tx: Sender<InternalEvent>,
        rx: Receiver<InternalEvent>,
        now: Instant,
    }

    impl Harness {
        fn settled(initial: ResourceKind) -> Self {
            let now = Instant::now();
            let mut panel = TabbedPanel::new(&PanelOptions {
                per_page: 10,
                ..PanelOptions::default()
            });
            panel.mount(initial, now);
            let (tx, rx) = mpsc::channel();
            let mut harness = Self {
                panel,
                runtime: TestRuntime {
                    backend: DemoBackend::seeded(DEFAULT_SEED),
                },
                view_data: ViewData::default(),
                tx,
                rx,
                now,
            };
            harness.advance(Duration::from_millis(50));
            harness
        }

        fn advance(&mut self, by: Duration) {
            self.now += by;
            let tickets = self.panel.tick(self.now);
            dispatch_tickets(&mut self.runtime, &mut self.view_data, &self.tx, tickets);
            self.drain();
        }

        fn drain(&mut self) {
            process_internal_events(&mut self.panel, &mut self.view_data, &self.tx, &self.rx);
        }

        fn press(&mut self, code: KeyCode) -> bool {
            self.press_with(code, KeyModifiers::NONE)
        }

        fn press_with(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
            let quit = handle_key_event(
                &mut self.panel,
                &mut self.runtime,
                &mut self.view_data,
                &self.tx,
                KeyEvent::new(code, modifiers),
                self.now,
            );
            self.drain();
            quit
        }

        fn type_text(&mut self, text: &str) {
            for ch in text.chars() {
                self.press(KeyCode::Char(ch));
            }
        }

        fn last_request(&self) -> Option<&QueryRequest> {
            self.runtime
                .backend
                .requests()
                .last()
                .map(|(_, request)| request)
        }

        fn request_count(&self) -> usize {
            self.runtime.backend.requests().len()
        }
    }

    #[test]
    fn quit_keys_exit_from_nav() {
        let mut harness = Harness::settled(ResourceKind::Admins);
        assert!(harness.press(KeyCode::Char('q')));
        assert!(harness.press_with(KeyCode::Char('q'), KeyModifiers::CONTROL));
    }

    #[test]
    fn q_types_while_searching() {
        let mut harness = Harness::settled(ResourceKind::Admins);
        harness.press(KeyCode::Char('/'));
        assert!(!harness.press(KeyCode::Char('q')));
        assert_eq!(harness.view_data.input, "q");
        assert!(harness.press_with(KeyCode::Char('q'), KeyModifiers::CONTROL));
    }

    #[test]
    fn tab_key_loads_next_tab_once() {
        let mut harness = Harness::settled(ResourceKind::Admins);
        assert_eq!(harness.request_count(), 1);

        harness.press(KeyCode::Tab);
        assert_eq!(harness.panel.visible_tab(), Some(ResourceKind::Roles));
        assert_eq!(harness.request_count(), 2);

        harness.press(KeyCode::BackTab);
        harness.press(KeyCode::Tab);
        assert_eq!(harness.request_count(), 2);
        assert!(matches!(
            harness.panel.visible_panel().map(|panel| &panel.content),
            Some(PanelContent::Table(_))
        ));
    }

    #[test]
    fn search_typing_waits_for_debounce() {
        let mut harness = Harness::settled(ResourceKind::Roles);
        harness.press(KeyCode::Char('/'));
        harness.type_text("aud");
        harness.press(KeyCode::Enter);
        assert_eq!(harness.view_data.mode, InputMode::Nav);
        assert_eq!(harness.request_count(), 1);

        harness.advance(Duration::from_millis(499));
        assert_eq!(harness.request_count(), 1);
        harness.advance(Duration::from_millis(1));
        assert_eq!(harness.request_count(), 2);
        assert_eq!(
            harness.last_request().and_then(QueryRequest::global_search),
            Some("aud")
        );
        assert!(input_line_text(&harness.panel, &harness.view_data).contains("search \"aud\""));
    }

    #[test]
    fn page_keys_stop_at_last_page() {
        let mut harness = Harness::settled(ResourceKind::Admins);
        for _ in 0..5 {
            harness.press(KeyCode::Char('n'));
        }
        let pages = harness
            .runtime
            .backend
            .requests()
            .iter()
            .map(|(_, request)| request.page)
            .collect::<Vec<_>>();
        assert_eq!(pages, vec![1, 2, 3, 4]);
        assert_eq!(harness.view_data.status_line.as_deref(), Some("last page"));
        assert!(status_text(&harness.panel, &harness.view_data).contains("page 4/4"));

        harness.press(KeyCode::Left);
        assert_eq!(harness.last_request().map(|request| request.page), Some(3));
    }

    #[test]
    fn per_page_keys_step_through_choices() {
        let mut harness = Harness::settled(ResourceKind::Sessions);
        harness.press(KeyCode::Char('n'));
        harness.press(KeyCode::Char('+'));
        let request = harness.last_request().cloned().expect("per-page request");
        assert_eq!((request.page, request.per_page), (1, 25));

        harness.press(KeyCode::Char('-'));
        harness.press(KeyCode::Char('-'));
        assert_eq!(harness.last_request().map(|request| request.per_page), Some(10));
        assert_eq!(
            harness.view_data.status_line.as_deref(),
            Some("10 rows per page")
        );
    }

    #[test]
    fn column_filter_prompt_applies_known_field() {
        let mut harness = Harness::settled(ResourceKind::Sessions);
        harness.press(KeyCode::Char('c'));
        harness.type_text("status=revoked");
        harness.press(KeyCode::Enter);

        assert_eq!(
            harness.last_request().and_then(|request| request.column_filter("status")),
            Some("revoked")
        );
        assert!(harness
            .panel
            .owner(ResourceKind::Sessions)
            .is_some_and(|owner| !owner.filters().is_empty()));
    }

    #[test]
    fn column_filter_prompt_rejects_unknown_field() {
        let mut harness = Harness::settled(ResourceKind::Roles);
        harness.press(KeyCode::Char('c'));
        harness.type_text("colour=blue");
        harness.press(KeyCode::Enter);

        assert_eq!(harness.request_count(), 1);
        let status = harness.view_data.status_line.clone().unwrap_or_default();
        assert!(status.contains("unknown filter field"));
        assert_eq!(harness.view_data.mode, InputMode::Nav);
    }

    #[test]
    fn date_prompt_is_refused_without_date_column() {
        let mut harness = Harness::settled(ResourceKind::Languages);
        harness.press(KeyCode::Char('d'));
        assert_eq!(harness.view_data.mode, InputMode::Nav);
        assert_eq!(
            harness.view_data.status_line.as_deref(),
            Some("languages has no date range")
        );
    }

    #[test]
    fn reversed_date_range_is_never_sent() {
        let mut harness = Harness::settled(ResourceKind::ActivityLogs);
        harness.press(KeyCode::Char('d'));
        harness.type_text("2026-03-01..2026-01-01");
        harness.press(KeyCode::Enter);

        assert_eq!(harness.request_count(), 1);
        assert!(matches!(
            harness.panel.visible_panel().map(|panel| &panel.content),
            Some(PanelContent::Failed(message)) if message.contains("after its end")
        ));
    }

    #[test]
    fn failed_load_reports_and_retries() {
        let mut harness = Harness::settled(ResourceKind::Admins);
        harness.runtime.backend.fail_next(
            ResourceKind::Roles,
            QueryError::StepUp {
                scope: "roles:read".to_owned(),
                redirect: "https://admin.example/auth/step-up?scope=roles%3Aread".to_owned(),
            },
        );
        harness.press(KeyCode::Char('f'));
        let status = harness.view_data.status_line.clone().unwrap_or_default();
        assert!(status.starts_with("roles: re-authenticate at https://admin.example/auth/step-up"));

        harness.press(KeyCode::Char('r'));
        assert!(matches!(
            harness.panel.visible_panel().map(|panel| &panel.content),
            Some(PanelContent::Table(_))
        ));
    }

    #[test]
    fn clear_key_drops_filters_and_reloads() {
        let mut harness = Harness::settled(ResourceKind::Permissions);
        harness.press(KeyCode::Char('c'));
        harness.type_text("group=roles");
        harness.press(KeyCode::Enter);
        harness.press(KeyCode::Char('x'));

        assert_eq!(harness.last_request().map(QueryRequest::has_filter), Some(false));
        assert_eq!(
            input_line_text(&harness.panel, &harness.view_data),
            "no filters"
        );
    }

    #[test]
    fn stale_status_clear_is_ignored() {
        let mut harness = Harness::settled(ResourceKind::Admins);
        harness.view_data.status_line = Some("kept".to_owned());
        harness.view_data.status_token = 3;
        harness
            .tx
            .send(InternalEvent::ClearStatus { token: 2 })
            .expect("channel open");
        harness.drain();
        assert_eq!(harness.view_data.status_line.as_deref(), Some("kept"));

        harness
            .tx
            .send(InternalEvent::ClearStatus { token: 3 })
            .expect("channel open");
        harness.drain();
        assert_eq!(harness.view_data.status_line, None);
    }

    #[test]
    fn prompt_parsers_validate_shape() {
        assert_eq!(
            parse_column_filter(ResourceKind::Admins, " role = support "),
            Ok(("role".to_owned(), "support".to_owned()))
        );
        assert!(parse_column_filter(ResourceKind::Admins, "role").is_err());
        assert_eq!(
            parse_date_range("2026-01-01 .. 2026-01-31"),
            Ok(("2026-01-01".to_owned(), "2026-01-31".to_owned()))
        );
        assert_eq!(parse_date_range("  "), Ok((String::new(), String::new())));
        assert!(parse_date_range("2026-01-01").is_err());
    }

    #[test]
    fn poll_timeout_wakes_for_due_timers() {
        let now = Instant::now();
        assert_eq!(poll_timeout(None, now), EVENT_POLL);
        assert_eq!(
            poll_timeout(Some(now + Duration::from_millis(30)), now),
            Duration::from_millis(30)
        );
        assert_eq!(poll_timeout(Some(now), now + Duration::from_secs(1)), Duration::ZERO);
        assert_eq!(poll_timeout(Some(now + Duration::from_secs(9)), now), EVENT_POLL);
    }

    #[test]
    fn terminal_renderer_shortens_long_cells() -> anyhow::Result<()> {
        let response: QueryResponse = serde_json::from_value(json!({
            "data": [{"id": 1, "actor": "a", "action": "x", "target": "line one\nline two is long", "created_at": "2026-01-01"}],
            "pagination": {"page": 1, "per_page": 10, "total": 1}
        }))?;
        let spec = TableSpec::for_resource(ResourceKind::ActivityLogs);
        let pagination = reconcile(&response.pagination, &build(1, 10, &FilterState::default()));
        let mut document = PanelDocument::default();
        document.mount("activity-logs-table");
        {
            let mut guard = document.scoped("activity-logs-table")?;
            TerminalRenderer::new(10).render(guard.target(), &spec, &response, &pagination)?;
        }

        let Some(PanelContent::Table(table)) = document
            .panel("activity-logs-table")
            .map(|panel| &panel.content)
        else {
            panic!("expected a rendered table");
        };
        assert_eq!(table.rows[0][3], "line one …");
        assert_eq!(fit_cell("short", 10), "short");
        Ok(())
    }

    #[test]
    fn non_table_states_have_messages() {
        assert_eq!(
            panel_message(&PanelContent::Failed("boom".to_owned())).as_deref(),
            Some("boom")
        );
        assert!(panel_message(&PanelContent::Empty).is_some_and(|text| text.contains("press r")));
    }
}
