/// LiveGrid Query Engine
///
/// Entry point for every request against a table. A query flows through
/// the filter compiler and search overlay (combined into one row predicate),
/// the sort planner, the cursor manager and finally the row materializer.
/// Mutations go straight to the cell store through the materializer's
/// write path.
///
/// The engine holds no per-request state. Any number of requests may run
/// against the same engine concurrently; the store serializes cell writes.

use crate::column::{CellValue, Column, ColumnType, NewColumn, TableId};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::filter::FilterSpec;
use crate::materialize::{materialize, materialize_all, CellUpdate, RowGenerator, RowRecord};
use crate::pagination::{PageRequest, PageWindow};
use crate::predicate::RowPredicate;
use crate::sort::{SortPlan, SortSpec};
use crate::store::{Cell, CellStore, NewRow, Row, RowId, ScanRequest};
use crate::view::View;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Query for one page of rows
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    #[serde(default)]
    pub table_id: TableId,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub filters: Vec<FilterSpec>,
    #[serde(default)]
    pub sorters: Vec<SortSpec>,
    #[serde(default)]
    pub search_term: String,
    #[serde(default)]
    pub cursor: Option<String>,
}

impl QueryRequest {
    pub fn new(table_id: impl Into<String>) -> Self {
        QueryRequest {
            table_id: table_id.into(),
            ..QueryRequest::default()
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_cursor(mut self, cursor: Option<String>) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn with_filters(mut self, filters: Vec<FilterSpec>) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_sorters(mut self, sorters: Vec<SortSpec>) -> Self {
        self.sorters = sorters;
        self
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search_term = term.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub rows: Vec<RowRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    /// Rows in the whole table, ignoring filters and search
    pub total_count: usize,
}

/// Synthetic row batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkCreateRequest {
    pub table_id: TableId,
    pub ids: Vec<RowId>,
    pub seed: u64,
}

/// Columns every bootstrapped table starts with
pub const DEFAULT_COLUMNS: [&str; 4] = ["Name", "Notes", "Assignee", "Status"];
/// Empty rows every bootstrapped table starts with
pub const DEFAULT_ROW_COUNT: usize = 3;

pub struct QueryEngine<S: CellStore> {
    store: Arc<S>,
    config: EngineConfig,
}

impl<S: CellStore> Clone for QueryEngine<S> {
    fn clone(&self) -> Self {
        QueryEngine {
            store: Arc::clone(&self.store),
            config: self.config,
        }
    }
}

impl<S: CellStore> QueryEngine<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: S, config: EngineConfig) -> Self {
        Self::shared(Arc::new(store), config)
    }

    pub fn shared(store: Arc<S>, config: EngineConfig) -> Self {
        QueryEngine { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Fetch one page of rows
    pub fn query(&self, request: &QueryRequest) -> Result<QueryResponse> {
        let columns = self.store.columns(&request.table_id)?;
        let predicate = RowPredicate::compile(&request.filters, &request.search_term, &columns);
        let plan = SortPlan::plan(&request.sorters, &columns);
        let page = PageRequest::new(request.limit, request.cursor.clone(), &self.config);

        log::debug!(
            "query table={} filter={:?} search={} primary={:?} residual={} limit={} cursor={:?}",
            request.table_id,
            predicate.filter(),
            predicate.search().is_active(),
            plan.primary().map(|k| k.field.as_str()),
            plan.residual().len(),
            page.limit(),
            page.cursor(),
        );

        let fetched = self.store.scan(&ScanRequest {
            table_id: &request.table_id,
            predicate: &predicate,
            order: plan.primary(),
            cursor: page.cursor(),
            take: page.fetch_size(),
        })?;

        let mut window = PageWindow::from_probe(fetched, page.limit());
        plan.sort_page(&mut window.rows);

        let total_count = self.store.count_rows(&request.table_id)?;
        Ok(QueryResponse {
            rows: materialize_all(&window.rows, &columns),
            next_cursor: window.next_cursor,
            total_count,
        })
    }

    /// Fetch one page of a View's rows
    pub fn query_view(
        &self,
        view: &View,
        cursor: Option<String>,
        limit: Option<usize>,
    ) -> Result<QueryResponse> {
        self.query(&view.to_query(cursor, limit))
    }

    pub fn get_row(&self, row_id: &str) -> Result<RowRecord> {
        let row = self.store.get_row(row_id)?;
        let columns = self.store.columns(&row.table_id)?;
        Ok(materialize(&row, &columns))
    }

    /// Overwrite one cell. Last write wins.
    pub fn update_cell(&self, update: &CellUpdate) -> Result<Cell> {
        let column = self.store.column(&update.column_id)?;
        let value = update.typed_value(&column)?;
        match self.store.update_cell(&update.row_id, &update.column_id, value) {
            Err(err) if err.is_fatal() => {
                log::error!("cell store invariant broken: {}", err);
                Err(err)
            }
            other => other,
        }
    }

    /// Append one row with default cells for every column
    pub fn create_row(&self, table_id: &str, row_id: &str) -> Result<Row> {
        let mut created = self
            .store
            .insert_rows(table_id, vec![NewRow::new(row_id)])?;
        created
            .pop()
            .ok_or_else(|| EngineError::Store(format!("insert of row '{}' returned nothing", row_id)))
    }

    /// Append generated rows. Ids already present in this table are skipped,
    /// so retrying a batch is safe. Values depend only on the seed, the id's
    /// position in the batch and the column layout.
    pub fn bulk_create_rows(&self, request: &BulkCreateRequest) -> Result<Vec<Row>> {
        let columns = self.store.columns(&request.table_id)?;
        let generated = RowGenerator::new(request.seed).generate(request.ids.clone(), &columns);

        let mut fresh = Vec::with_capacity(generated.len());
        for row in generated {
            match self.store.get_row(&row.id) {
                Ok(existing) if existing.table_id == request.table_id => continue,
                Ok(_) => return Err(EngineError::DuplicateRow(row.id)),
                Err(EngineError::RowNotFound(_)) => fresh.push(row),
                Err(err) => return Err(err),
            }
        }

        let skipped = request.ids.len() - fresh.len();
        let created = self.store.insert_rows(&request.table_id, fresh)?;
        log::info!(
            "bulk insert into table={} created={} skipped={} seed={}",
            request.table_id,
            created.len(),
            skipped,
            request.seed
        );
        Ok(created)
    }

    pub fn delete_row(&self, row_id: &str) -> Result<Row> {
        self.store.delete_row(row_id)
    }

    /// Add a column; every existing row gets a default cell
    pub fn add_column(&self, table_id: &str, column: NewColumn) -> Result<Column> {
        let created = self.store.add_column(table_id, column)?;
        log::info!(
            "added {} column '{}' to table={}",
            created.column_type,
            created.name,
            table_id
        );
        Ok(created)
    }

    pub fn delete_column(&self, column_id: &str) -> Result<Column> {
        self.store.delete_column(column_id)
    }

    /// Create a table with the default layout: the text columns in
    /// `DEFAULT_COLUMNS` and `DEFAULT_ROW_COUNT` empty rows. Column and row
    /// ids are derived from the table id.
    pub fn create_table(&self, table_id: &str) -> Result<Vec<Column>> {
        self.store.create_table(table_id)?;
        for name in DEFAULT_COLUMNS {
            let id = format!("{}-{}", table_id, name.to_lowercase());
            self.store
                .add_column(table_id, NewColumn::new(id, name, ColumnType::Text))?;
        }
        let rows = (1..=DEFAULT_ROW_COUNT)
            .map(|n| NewRow::new(format!("{}-row-{}", table_id, n)))
            .collect();
        self.store.insert_rows(table_id, rows)?;
        self.store.columns(table_id)
    }

    /// Current value of one cell
    pub fn cell_value(&self, row_id: &str, column_id: &str) -> Result<CellValue> {
        let row = self.store.get_row(row_id)?;
        row.cell(column_id)
            .cloned()
            .ok_or_else(|| EngineError::MissingCell {
                row_id: row_id.to_string(),
                column_id: column_id.to_string(),
            })
    }
}
