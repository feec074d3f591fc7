// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{
    ColumnSpec, DisplayPagination, Panel, PanelContent, QueryResponse, RenderedTable,
    ResourceKind,
};
use anyhow::{Result, bail};
use serde_json::Value;

/// What the renderer needs to know about one table besides the rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub endpoint: &'static str,
    pub columns: &'static [ColumnSpec],
    pub id_key: &'static str,
}

impl TableSpec {
    pub fn for_resource(resource: ResourceKind) -> Self {
        Self {
            endpoint: resource.endpoint(),
            columns: resource.columns(),
            id_key: resource.id_key(),
        }
    }
}

/// Writes one page of results into the element holding the table slot.
pub trait TableRenderer {
    fn render(
        &mut self,
        target: &mut Panel,
        table: &TableSpec,
        response: &QueryResponse,
        pagination: &DisplayPagination,
    ) -> Result<()>;
}

/// Renders every cell as plain text.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTableRenderer;

impl TableRenderer for PlainTableRenderer {
    fn render(
        &mut self,
        target: &mut Panel,
        table: &TableSpec,
        response: &QueryResponse,
        pagination: &DisplayPagination,
    ) -> Result<()> {
        let mut rows = Vec::with_capacity(response.data.len());
        let mut row_ids = Vec::with_capacity(response.data.len());
        for (index, row) in response.data.iter().enumerate() {
            let Some(id) = row.get(table.id_key) else {
                bail!(
                    "row {index} from {} has no {:?} key",
                    table.endpoint,
                    table.id_key
                );
            };
            row_ids.push(cell_text(id));
            rows.push(
                table
                    .columns
                    .iter()
                    .map(|column| row.get(column.key).map(cell_text).unwrap_or_default())
                    .collect(),
            );
        }

        target.content = PanelContent::Table(RenderedTable {
            columns: table
                .columns
                .iter()
                .map(|column| column.label.to_owned())
                .collect(),
            rows,
            row_ids,
            pagination: pagination.clone(),
        });
        Ok(())
    }
}

pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "yes".to_owned(),
        Value::Bool(false) => "no".to_owned(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.clone(),
        Value::Array(items) => items.iter().map(cell_text).collect::<Vec<_>>().join(", "),
        Value::Object(_) => value.to_string(),
    }
}
