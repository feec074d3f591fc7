// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow, bail};
use std::io::Write;
use std::time::Instant;
use tabula_app::{
    LoadOutcome, PanelContent, PanelOptions, PlainTableRenderer, QueryTransport, RenderedTable,
    ResourceKind, TabbedPanel, TableAction, TableActionEvent,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OneshotQuery {
    pub search: Option<String>,
    pub page: Option<u32>,
}

/// Runs a single query through a standalone table and prints the page.
///
/// Timers are advanced by hand so only the final request reaches the
/// backend.
pub fn run<T, W>(
    transport: &mut T,
    resource: ResourceKind,
    options: &PanelOptions,
    query: &OneshotQuery,
    out: &mut W,
) -> Result<()>
where
    T: QueryTransport + ?Sized,
    W: Write,
{
    let now = Instant::now();
    let mut panel = TabbedPanel::standalone(resource, options);
    panel.mount(resource, now);

    let mut deadline = now;
    if let Some(search) = query.search.as_deref().filter(|text| !text.trim().is_empty()) {
        panel.search_input(search, now);
        if let Some(owner) = panel.owner(resource) {
            deadline = now + owner.debounce();
        }
    }

    let mut ticket = panel
        .tick(deadline)
        .pop()
        .ok_or_else(|| anyhow!("{} query was not issued", resource.label()))?;

    if let Some(page) = query.page.filter(|page| *page > 1) {
        let current_params = ticket.request.clone();
        ticket = panel
            .table_action(TableActionEvent {
                action: TableAction::PageChange,
                value: page,
                current_params,
            })
            .ok_or_else(|| anyhow!("{} page change was dropped", resource.label()))?;
    }

    tracing::info!(
        resource = resource.as_str(),
        page = ticket.request.page,
        per_page = ticket.request.per_page,
        "running one-shot query"
    );
    let result = transport.query(ticket.endpoint, &ticket.request);
    match panel.complete(ticket, result, &mut PlainTableRenderer) {
        LoadOutcome::Rendered(_) => {}
        LoadOutcome::Failed(error) => bail!("{}", error.user_message()),
        LoadOutcome::Stale => bail!("{} response arrived out of order", resource.label()),
    }

    let Some(PanelContent::Table(table)) = panel.visible_panel().map(|panel| &panel.content)
    else {
        bail!("{} table did not render", resource.label());
    };
    write_table(out, table)?;
    Ok(())
}

fn write_table<W: Write>(out: &mut W, table: &RenderedTable) -> Result<()> {
    let mut widths = table
        .columns
        .iter()
        .map(|column| column.chars().count())
        .collect::<Vec<_>>();
    for row in &table.rows {
        for (index, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(index) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    write_line(out, &table.columns, &widths)?;
    let rule = widths
        .iter()
        .map(|width| "-".repeat(*width))
        .collect::<Vec<_>>();
    write_line(out, &rule, &widths)?;
    for row in &table.rows {
        write_line(out, row, &widths)?;
    }
    if table.rows.is_empty() {
        writeln!(out, "(no rows)")?;
    }
    writeln!(out)?;
    writeln!(out, "{}", table.pagination.info)?;
    Ok(())
}

fn write_line<W: Write>(out: &mut W, cells: &[String], widths: &[usize]) -> Result<()> {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    writeln!(out, "{}", line.trim_end())?;
    Ok(())
}
