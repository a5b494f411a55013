/// LiveGrid Typed Cell Store
///
/// Tables are stored entity-attribute-value style: every (row, column) pair
/// owns exactly one cell. Cells are grouped per row and keyed by column id.
/// The store keeps that invariant on every structural change:
///
/// - adding a column back-fills a default cell for every existing row
/// - adding a row creates a cell for every existing column
/// - deleting a row or a column deletes its cells
///
/// `CellStore` is the boundary the query engine is written against. It can
/// filter with a `RowPredicate`, order by a single `SortKey`, resume from a
/// cursor and cap the number of rows returned. `MemoryStore` is the in-process
/// implementation.

use crate::column::{CellValue, Column, ColumnId, ColumnPriority, NewColumn, TableId};
use crate::error::{EngineError, Result};
use crate::predicate::RowPredicate;
use crate::sort::SortKey;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub type RowId = String;

/// A row of a table. `row_order` is the append sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    pub id: RowId,
    pub table_id: TableId,
    pub row_order: u64,
}

/// A single cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    pub row_id: RowId,
    pub column_id: ColumnId,
    pub table_id: TableId,
    pub value: CellValue,
}

/// Read access to the cells of one row, owned or borrowed from the store
pub trait RowCells {
    fn cell(&self, column_id: &str) -> Option<&CellValue>;
}

impl RowCells for HashMap<ColumnId, CellValue> {
    fn cell(&self, column_id: &str) -> Option<&CellValue> {
        self.get(column_id)
    }
}

/// A row together with its cells, as returned by a scan
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub id: RowId,
    pub table_id: TableId,
    pub row_order: u64,
    pub cells: HashMap<ColumnId, CellValue>,
}

impl StoredRow {
    pub fn cell(&self, column_id: &str) -> Option<&CellValue> {
        self.cells.get(column_id)
    }
}

impl RowCells for StoredRow {
    fn cell(&self, column_id: &str) -> Option<&CellValue> {
        self.cells.get(column_id)
    }
}

/// A row to insert. Columns missing from `cells` get their default value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewRow {
    pub id: RowId,
    pub cells: HashMap<ColumnId, CellValue>,
}

impl NewRow {
    pub fn new(id: impl Into<String>) -> Self {
        NewRow {
            id: id.into(),
            cells: HashMap::new(),
        }
    }

    pub fn with_cell(mut self, column_id: impl Into<String>, value: CellValue) -> Self {
        self.cells.insert(column_id.into(), value);
        self
    }
}

/// One bounded, ordered read of a table
#[derive(Debug, Clone, Copy)]
pub struct ScanRequest<'a> {
    pub table_id: &'a str,
    pub predicate: &'a RowPredicate,
    /// None orders by `row_order` ascending
    pub order: Option<&'a SortKey>,
    /// Id of the first row to return. Rows before it in scan order are skipped.
    pub cursor: Option<&'a str>,
    pub take: usize,
}

/// Storage boundary for tables, columns, rows and cells.
///
/// Each method is atomic on its own. Nothing spans more than one call.
pub trait CellStore: Send + Sync {
    fn create_table(&self, table_id: &str) -> Result<()>;

    fn has_table(&self, table_id: &str) -> Result<bool>;

    /// Columns of a table in display order
    fn columns(&self, table_id: &str) -> Result<Vec<Column>>;

    fn column(&self, column_id: &str) -> Result<Column>;

    /// Add a column and back-fill a default cell for every existing row
    fn add_column(&self, table_id: &str, column: NewColumn) -> Result<Column>;

    /// Delete a column and all of its cells
    fn delete_column(&self, column_id: &str) -> Result<Column>;

    fn count_rows(&self, table_id: &str) -> Result<usize>;

    /// Insert rows at the end of the table, all or nothing
    fn insert_rows(&self, table_id: &str, rows: Vec<NewRow>) -> Result<Vec<Row>>;

    /// Delete a row and all of its cells
    fn delete_row(&self, row_id: &str) -> Result<Row>;

    fn get_row(&self, row_id: &str) -> Result<StoredRow>;

    /// Overwrite the value of an existing cell
    fn update_cell(&self, row_id: &str, column_id: &str, value: CellValue) -> Result<Cell>;

    fn scan(&self, request: &ScanRequest<'_>) -> Result<Vec<StoredRow>>;
}

/// Cumulative scan counters of a `MemoryStore`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanStats {
    pub scans: u64,
    /// Rows whose cells were tested against a predicate
    pub rows_examined: u64,
    /// Rows copied out of the store into a result
    pub rows_loaded: u64,
}

#[derive(Debug, Default)]
struct ScanCounters {
    scans: AtomicU64,
    rows_examined: AtomicU64,
    rows_loaded: AtomicU64,
}

impl ScanCounters {
    fn record(&self, examined: usize, loaded: usize) {
        self.scans.fetch_add(1, AtomicOrdering::Relaxed);
        self.rows_examined
            .fetch_add(examined as u64, AtomicOrdering::Relaxed);
        self.rows_loaded
            .fetch_add(loaded as u64, AtomicOrdering::Relaxed);
    }

    fn snapshot(&self) -> ScanStats {
        ScanStats {
            scans: self.scans.load(AtomicOrdering::Relaxed),
            rows_examined: self.rows_examined.load(AtomicOrdering::Relaxed),
            rows_loaded: self.rows_loaded.load(AtomicOrdering::Relaxed),
        }
    }
}

#[derive(Debug, Default)]
struct TableState {
    columns: Vec<ColumnId>,
    /// row_order -> row id
    rows: BTreeMap<u64, RowId>,
    next_row_order: u64,
}

#[derive(Debug, Default)]
struct StoreInner {
    tables: HashMap<TableId, TableState>,
    columns: HashMap<ColumnId, Column>,
    rows: HashMap<RowId, Row>,
    /// row id -> column id -> value
    cells: HashMap<RowId, HashMap<ColumnId, CellValue>>,
}

/// A row visited by a scan, borrowed from the store
struct Candidate<'a> {
    id: &'a RowId,
    row_order: u64,
    cells: &'a HashMap<ColumnId, CellValue>,
}

impl Candidate<'_> {
    fn load(&self, table_id: &str) -> StoredRow {
        StoredRow {
            id: self.id.clone(),
            table_id: table_id.to_string(),
            row_order: self.row_order,
            cells: self.cells.clone(),
        }
    }
}

/// Total scan order under a sort key: key value, then `row_order`
fn scan_position(key: &SortKey, a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    key.compare_rows(a.cells, b.cells)
        .then(a.row_order.cmp(&b.row_order))
}

impl StoreInner {
    fn table(&self, table_id: &str) -> Result<&TableState> {
        self.tables
            .get(table_id)
            .ok_or_else(|| EngineError::TableNotFound(table_id.to_string()))
    }

    fn table_mut(&mut self, table_id: &str) -> Result<&mut TableState> {
        self.tables
            .get_mut(table_id)
            .ok_or_else(|| EngineError::TableNotFound(table_id.to_string()))
    }

    fn candidate<'a>(&'a self, id: &'a RowId, row_order: u64) -> Option<Candidate<'a>> {
        self.cells.get(id).map(|cells| Candidate {
            id,
            row_order,
            cells,
        })
    }

    /// Walk rows in `row_order` from `from`, stopping at `take` matches
    fn seek_in_row_order(
        &self,
        table: &TableState,
        request: &ScanRequest<'_>,
        from: u64,
    ) -> (Vec<StoredRow>, usize) {
        let mut examined = 0;
        let mut out = Vec::with_capacity(request.take.min(table.rows.len()));
        for (&row_order, id) in table.rows.range(from..) {
            let Some(candidate) = self.candidate(id, row_order) else {
                continue;
            };
            examined += 1;
            if request.predicate.matches(candidate.cells) {
                out.push(candidate.load(request.table_id));
                if out.len() == request.take {
                    break;
                }
            }
        }
        (out, examined)
    }

    /// First `take` matching rows at or after `start` in key order. Only the
    /// selected rows are copied.
    fn select_by_key(
        &self,
        table: &TableState,
        request: &ScanRequest<'_>,
        key: &SortKey,
        start: Option<&Candidate<'_>>,
    ) -> (Vec<StoredRow>, usize) {
        let mut examined = 0;
        let mut selected: Vec<Candidate<'_>> = table
            .rows
            .iter()
            .filter_map(|(&row_order, id)| self.candidate(id, row_order))
            .filter(|c| {
                examined += 1;
                request.predicate.matches(c.cells)
            })
            .filter(|c| start.map_or(true, |s| scan_position(key, c, s) != Ordering::Less))
            .collect();

        if selected.len() > request.take {
            selected.select_nth_unstable_by(request.take, |a, b| scan_position(key, a, b));
            selected.truncate(request.take);
        }
        selected.sort_unstable_by(|a, b| scan_position(key, a, b));

        let rows = selected
            .iter()
            .map(|c| c.load(request.table_id))
            .collect();
        (rows, examined)
    }
}

/// In-memory `CellStore`.
///
/// A single reader-writer lock guards all state, so every cell write is
/// atomic and readers never observe a half-applied structural change.
///
/// Scans are keyset scans. In insertion order a page seeks straight to the
/// cursor row and stops after `take` matches. Under a sort key every row is
/// tested in place, but only the rows of the page are copied out.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<StoreInner>,
    counters: ScanCounters,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan counters accumulated since the store was created
    pub fn scan_stats(&self) -> ScanStats {
        self.counters.snapshot()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreInner>> {
        self.inner
            .read()
            .map_err(|_| EngineError::Store("cell store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreInner>> {
        self.inner
            .write()
            .map_err(|_| EngineError::Store("cell store lock poisoned".to_string()))
    }

    /// Drop a single cell without touching its row or column. Only used to
    /// simulate a broken store in tests.
    #[cfg(test)]
    pub(crate) fn discard_cell(&self, row_id: &str, column_id: &str) {
        let mut inner = self.inner.write().unwrap();
        if let Some(cells) = inner.cells.get_mut(row_id) {
            cells.remove(column_id);
        }
    }
}

impl CellStore for MemoryStore {
    fn create_table(&self, table_id: &str) -> Result<()> {
        let mut inner = self.write()?;
        if inner.tables.contains_key(table_id) {
            return Err(EngineError::DuplicateTable(table_id.to_string()));
        }
        inner.tables.insert(
            table_id.to_string(),
            TableState {
                next_row_order: 1,
                ..TableState::default()
            },
        );
        Ok(())
    }

    fn has_table(&self, table_id: &str) -> Result<bool> {
        Ok(self.read()?.tables.contains_key(table_id))
    }

    fn columns(&self, table_id: &str) -> Result<Vec<Column>> {
        let inner = self.read()?;
        let table = inner.table(table_id)?;
        let mut columns: Vec<Column> = table
            .columns
            .iter()
            .filter_map(|id| inner.columns.get(id).cloned())
            .collect();
        columns.sort_by_key(|c| c.display_order);
        Ok(columns)
    }

    fn column(&self, column_id: &str) -> Result<Column> {
        self.read()?
            .columns
            .get(column_id)
            .cloned()
            .ok_or_else(|| EngineError::ColumnNotFound(column_id.to_string()))
    }

    fn add_column(&self, table_id: &str, column: NewColumn) -> Result<Column> {
        let mut inner = self.write()?;
        let table = inner.table(table_id)?;

        if inner.columns.contains_key(&column.id) {
            return Err(EngineError::DuplicateColumn(column.id));
        }
        let siblings: Vec<&Column> = table
            .columns
            .iter()
            .filter_map(|id| inner.columns.get(id))
            .collect();
        if siblings.iter().any(|c| c.name == column.name) {
            return Err(EngineError::DuplicateColumn(column.name));
        }

        let display_order = siblings
            .iter()
            .map(|c| c.display_order + 1)
            .max()
            .unwrap_or(0);
        let priority = if siblings.is_empty() {
            ColumnPriority::Primary
        } else {
            ColumnPriority::Secondary
        };
        let row_ids: Vec<RowId> = table.rows.values().cloned().collect();

        let created = Column {
            id: column.id,
            table_id: table_id.to_string(),
            name: column.name,
            column_type: column.column_type,
            display_order,
            priority,
        };

        let default = created.default_value();
        for row_id in row_ids {
            inner
                .cells
                .entry(row_id)
                .or_default()
                .insert(created.id.clone(), default.clone());
        }
        inner.table_mut(table_id)?.columns.push(created.id.clone());
        inner.columns.insert(created.id.clone(), created.clone());
        Ok(created)
    }

    fn delete_column(&self, column_id: &str) -> Result<Column> {
        let mut inner = self.write()?;
        let column = inner
            .columns
            .remove(column_id)
            .ok_or_else(|| EngineError::ColumnNotFound(column_id.to_string()))?;

        let table = inner.table_mut(&column.table_id)?;
        table.columns.retain(|id| id != column_id);
        let row_ids: Vec<RowId> = table.rows.values().cloned().collect();
        for row_id in row_ids {
            if let Some(cells) = inner.cells.get_mut(&row_id) {
                cells.remove(column_id);
            }
        }
        Ok(column)
    }

    fn count_rows(&self, table_id: &str) -> Result<usize> {
        Ok(self.read()?.table(table_id)?.rows.len())
    }

    fn insert_rows(&self, table_id: &str, rows: Vec<NewRow>) -> Result<Vec<Row>> {
        let mut inner = self.write()?;
        let table = inner.table(table_id)?;
        let columns: Vec<Column> = table
            .columns
            .iter()
            .filter_map(|id| inner.columns.get(id).cloned())
            .collect();

        // validate everything before touching state
        let mut seen = HashSet::new();
        for row in &rows {
            if inner.rows.contains_key(&row.id) || !seen.insert(row.id.as_str()) {
                return Err(EngineError::DuplicateRow(row.id.clone()));
            }
            for (column_id, value) in &row.cells {
                let column = columns
                    .iter()
                    .find(|c| &c.id == column_id)
                    .ok_or_else(|| EngineError::ColumnNotFound(column_id.clone()))?;
                if !value.fits(column.column_type) {
                    return Err(EngineError::TypeMismatch {
                        column: column.name.clone(),
                        actual: column.column_type.to_string(),
                        requested: format!("{:?}", value),
                    });
                }
            }
        }

        let mut next_order = table.next_row_order;
        let mut created = Vec::with_capacity(rows.len());
        for mut new_row in rows {
            let row = Row {
                id: new_row.id,
                table_id: table_id.to_string(),
                row_order: next_order,
            };
            next_order += 1;

            let cells = columns
                .iter()
                .map(|column| {
                    let value = new_row
                        .cells
                        .remove(&column.id)
                        .unwrap_or_else(|| column.default_value());
                    (column.id.clone(), value)
                })
                .collect();
            inner.cells.insert(row.id.clone(), cells);
            inner.rows.insert(row.id.clone(), row.clone());
            created.push(row);
        }

        let table = inner.table_mut(table_id)?;
        for row in &created {
            table.rows.insert(row.row_order, row.id.clone());
        }
        table.next_row_order = next_order;
        Ok(created)
    }

    fn delete_row(&self, row_id: &str) -> Result<Row> {
        let mut inner = self.write()?;
        let row = inner
            .rows
            .remove(row_id)
            .ok_or_else(|| EngineError::RowNotFound(row_id.to_string()))?;

        inner.table_mut(&row.table_id)?.rows.remove(&row.row_order);
        inner.cells.remove(&row.id);
        Ok(row)
    }

    fn get_row(&self, row_id: &str) -> Result<StoredRow> {
        let inner = self.read()?;
        let row = inner
            .rows
            .get(row_id)
            .ok_or_else(|| EngineError::RowNotFound(row_id.to_string()))?;
        Ok(StoredRow {
            id: row.id.clone(),
            table_id: row.table_id.clone(),
            row_order: row.row_order,
            cells: inner.cells.get(row_id).cloned().unwrap_or_default(),
        })
    }

    fn update_cell(&self, row_id: &str, column_id: &str, value: CellValue) -> Result<Cell> {
        let mut inner = self.write()?;
        let row = inner
            .rows
            .get(row_id)
            .ok_or_else(|| EngineError::RowNotFound(row_id.to_string()))?;
        let column = inner
            .columns
            .get(column_id)
            .filter(|c| c.table_id == row.table_id)
            .ok_or_else(|| EngineError::ColumnNotFound(column_id.to_string()))?;

        if !value.fits(column.column_type) {
            return Err(EngineError::TypeMismatch {
                column: column.name.clone(),
                actual: column.column_type.to_string(),
                requested: format!("{:?}", value),
            });
        }

        let table_id = row.table_id.clone();
        let slot = inner
            .cells
            .get_mut(row_id)
            .and_then(|cells| cells.get_mut(column_id));
        match slot {
            Some(slot) => *slot = value.clone(),
            None => {
                return Err(EngineError::MissingCell {
                    row_id: row_id.to_string(),
                    column_id: column_id.to_string(),
                })
            }
        }

        Ok(Cell {
            row_id: row_id.to_string(),
            column_id: column_id.to_string(),
            table_id,
            value,
        })
    }

    fn scan(&self, request: &ScanRequest<'_>) -> Result<Vec<StoredRow>> {
        let inner = self.read()?;
        let table = inner.table(request.table_id)?;

        // The cursor row anchors the page by position, whether or not it
        // still matches the predicate.
        let start = match request.cursor {
            None => None,
            Some(cursor) => {
                let anchor = inner
                    .rows
                    .get(cursor)
                    .filter(|row| row.table_id == request.table_id)
                    .and_then(|row| inner.candidate(&row.id, row.row_order));
                match anchor {
                    Some(anchor) => Some(anchor),
                    None => {
                        log::warn!(
                            "cursor '{}' not found in table '{}' scan",
                            cursor,
                            request.table_id
                        );
                        self.counters.record(0, 0);
                        return Ok(Vec::new());
                    }
                }
            }
        };

        if request.take == 0 {
            self.counters.record(0, 0);
            return Ok(Vec::new());
        }

        let (rows, examined) = match request.order {
            None => {
                let from = start.as_ref().map_or(0, |s| s.row_order);
                inner.seek_in_row_order(table, request, from)
            }
            Some(key) => inner.select_by_key(table, request, key, start.as_ref()),
        };
        self.counters.record(examined, rows.len());
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnType;
    use crate::filter::{FilterOperator, FilterSpec};
    use crate::sort::SortOrder;

    fn store_with_rows(n: usize) -> MemoryStore {
        let store = MemoryStore::new();
        store.create_table("t").unwrap();
        store.add_column("t", NewColumn::text("c-name", "Name")).unwrap();
        store.add_column("t", NewColumn::number("c-num", "Num")).unwrap();
        let rows = (0..n)
            .map(|i| {
                NewRow::new(format!("r{}", i))
                    .with_cell("c-name", CellValue::Text(format!("row {}", i)))
                    .with_cell("c-num", CellValue::Number((n - i) as f64))
            })
            .collect();
        store.insert_rows("t", rows).unwrap();
        store
    }

    fn num_ascending() -> SortKey {
        SortKey {
            column_id: "c-num".to_string(),
            field: "Num".to_string(),
            column_type: ColumnType::Number,
            order: SortOrder::Asc,
        }
    }

    fn scan_ids(store: &MemoryStore, order: Option<&SortKey>, cursor: Option<&str>, take: usize) -> Vec<String> {
        let predicate = RowPredicate::always();
        store
            .scan(&ScanRequest {
                table_id: "t",
                predicate: &predicate,
                order,
                cursor,
                take,
            })
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect()
    }

    #[test]
    fn test_insert_assigns_row_order() {
        let store = store_with_rows(3);
        assert_eq!(store.count_rows("t").unwrap(), 3);
        let more = store.insert_rows("t", vec![NewRow::new("extra")]).unwrap();
        assert_eq!(more[0].row_order, 4);
    }

    #[test]
    fn test_row_order_survives_delete() {
        let store = store_with_rows(3);
        store.delete_row("r2").unwrap();
        let more = store.insert_rows("t", vec![NewRow::new("extra")]).unwrap();
        assert_eq!(more[0].row_order, 4);
        assert_eq!(store.count_rows("t").unwrap(), 3);
    }

    #[test]
    fn test_missing_cells_get_defaults() {
        let store = store_with_rows(0);
        store.insert_rows("t", vec![NewRow::new("blank")]).unwrap();
        let row = store.get_row("blank").unwrap();
        assert_eq!(row.cell("c-name"), Some(&CellValue::Text(String::new())));
        assert_eq!(row.cell("c-num"), Some(&CellValue::Null));
    }

    #[test]
    fn test_add_column_backfills() {
        let store = store_with_rows(3);
        let col = store.add_column("t", NewColumn::number("c-extra", "Extra")).unwrap();
        assert_eq!(col.display_order, 2);
        assert_eq!(col.priority, ColumnPriority::Secondary);
        for i in 0..3 {
            let row = store.get_row(&format!("r{}", i)).unwrap();
            assert_eq!(row.cell("c-extra"), Some(&CellValue::Null));
        }
    }

    #[test]
    fn test_duplicate_column_name_rejected() {
        let store = store_with_rows(0);
        let err = store.add_column("t", NewColumn::text("c-other", "Name")).unwrap_err();
        assert_eq!(err, EngineError::DuplicateColumn("Name".to_string()));
    }

    #[test]
    fn test_insert_rows_is_all_or_nothing() {
        let store = store_with_rows(1);
        let err = store
            .insert_rows("t", vec![NewRow::new("fresh"), NewRow::new("r0")])
            .unwrap_err();
        assert_eq!(err, EngineError::DuplicateRow("r0".to_string()));
        assert_eq!(store.count_rows("t").unwrap(), 1);

        let err = store
            .insert_rows(
                "t",
                vec![NewRow::new("bad").with_cell("c-num", CellValue::Text("x".into()))],
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::TypeMismatch { .. }));
        assert!(store.get_row("bad").is_err());
    }

    #[test]
    fn test_delete_column_cascades() {
        let store = store_with_rows(2);
        store.delete_column("c-num").unwrap();
        assert_eq!(store.columns("t").unwrap().len(), 1);
        assert!(store.get_row("r0").unwrap().cell("c-num").is_none());
        assert!(store.column("c-num").unwrap_err().is_not_found());
    }

    #[test]
    fn test_update_cell() {
        let store = store_with_rows(1);
        let cell = store
            .update_cell("r0", "c-num", CellValue::Number(42.0))
            .unwrap();
        assert_eq!(cell.table_id, "t");
        assert_eq!(
            store.get_row("r0").unwrap().cell("c-num"),
            Some(&CellValue::Number(42.0))
        );
    }

    #[test]
    fn test_update_cell_errors() {
        let store = store_with_rows(1);
        assert_eq!(
            store.update_cell("nope", "c-num", CellValue::Null).unwrap_err(),
            EngineError::RowNotFound("nope".to_string())
        );
        assert_eq!(
            store.update_cell("r0", "nope", CellValue::Null).unwrap_err(),
            EngineError::ColumnNotFound("nope".to_string())
        );
        assert!(matches!(
            store.update_cell("r0", "c-num", CellValue::Text("x".into())),
            Err(EngineError::TypeMismatch { .. })
        ));

        store.discard_cell("r0", "c-num");
        let err = store
            .update_cell("r0", "c-num", CellValue::Number(1.0))
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_scan_default_order_and_cursor() {
        let store = store_with_rows(5);
        assert_eq!(scan_ids(&store, None, None, 2), vec!["r0", "r1"]);
        assert_eq!(scan_ids(&store, None, Some("r3"), 10), vec!["r3", "r4"]);
        assert!(scan_ids(&store, None, Some("gone"), 10).is_empty());
    }

    #[test]
    fn test_scan_ordered_by_key() {
        let store = store_with_rows(4);
        let key = SortKey {
            column_id: "c-num".to_string(),
            field: "Num".to_string(),
            column_type: ColumnType::Number,
            order: SortOrder::Asc,
        };
        // Num = n - i, so ascending Num reverses insertion order
        assert_eq!(scan_ids(&store, Some(&key), None, 10), vec!["r3", "r2", "r1", "r0"]);
        assert_eq!(scan_ids(&store, Some(&key), Some("r1"), 10), vec!["r1", "r0"]);
    }

    #[test]
    fn test_default_order_page_seeks_to_cursor() {
        let store = store_with_rows(1000);
        let before = store.scan_stats();
        assert_eq!(scan_ids(&store, None, Some("r500"), 11).len(), 11);
        let after = store.scan_stats();
        assert_eq!(after.scans - before.scans, 1);
        assert_eq!(after.rows_examined - before.rows_examined, 11);
        assert_eq!(after.rows_loaded - before.rows_loaded, 11);
    }

    #[test]
    fn test_sorted_page_loads_only_page_rows() {
        let store = store_with_rows(1000);
        let key = num_ascending();
        let before = store.scan_stats();
        let page = scan_ids(&store, Some(&key), Some("r989"), 11);
        let after = store.scan_stats();

        // Num = 1000 - i, so ascending runs r999, r998, ...
        let expected: Vec<String> = (979..=989).rev().map(|i| format!("r{}", i)).collect();
        assert_eq!(page, expected);
        assert_eq!(after.rows_loaded - before.rows_loaded, 11);
    }

    #[test]
    fn test_sorted_cursor_inside_tie_run() {
        let store = store_with_rows(4);
        for i in 0..4 {
            store
                .update_cell(&format!("r{}", i), "c-num", CellValue::Number(1.0))
                .unwrap();
        }
        let key = num_ascending();
        assert_eq!(scan_ids(&store, Some(&key), Some("r2"), 5), vec!["r2", "r3"]);
    }

    #[test]
    fn test_cursor_resumes_even_when_it_no_longer_matches() {
        let store = store_with_rows(4);
        let columns = store.columns("t").unwrap();
        let not_row_1 = FilterSpec::new("f1", "Name", ColumnType::Text, FilterOperator::Equals, "row 1")
            .negated();
        let predicate = RowPredicate::compile(&[not_row_1], "", &columns);
        assert!(!predicate.matches(&store.get_row("r1").unwrap()));
        let page: Vec<String> = store
            .scan(&ScanRequest {
                table_id: "t",
                predicate: &predicate,
                order: None,
                cursor: Some("r1"),
                take: 10,
            })
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(page, vec!["r2", "r3"]);
    }

    #[test]
    fn test_cursor_from_other_table_yields_empty_page() {
        let store = store_with_rows(2);
        store.create_table("other").unwrap();
        store.insert_rows("other", vec![NewRow::new("o1")]).unwrap();
        assert!(scan_ids(&store, None, Some("o1"), 5).is_empty());
    }

    #[test]
    fn test_unknown_table() {
        let store = MemoryStore::new();
        assert_eq!(
            store.columns("missing").unwrap_err(),
            EngineError::TableNotFound("missing".to_string())
        );
        store.create_table("t").unwrap();
        assert!(matches!(
            store.create_table("t"),
            Err(EngineError::DuplicateTable(_))
        ));
    }
}
