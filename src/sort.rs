/// LiveGrid Sort Planner
///
/// The cell store orders efficiently by a single key only. A sort list is
/// therefore split in two:
///
/// - the first key is pushed down to the store as its scan order
/// - the remaining keys break ties in memory, within one fetched page
///
/// The in-memory pass compares all keys lexicographically (first non-equal
/// result wins) with a stable sort, so rows that tie on every key keep the
/// order the store returned them in.
///
/// # Limitation
///
/// Secondary keys only reorder rows inside a page. A run of rows sharing the
/// same primary value that straddles a page boundary is not globally ordered
/// by the secondary keys.

use crate::column::{CellValue, Column, ColumnId, ColumnType};
use crate::store::{RowCells, StoredRow};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Sort order specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending order (smallest first, empty number cells last)
    #[default]
    #[serde(alias = "ascending")]
    Asc,
    /// Descending order (largest first, empty number cells first)
    #[serde(alias = "descending")]
    Desc,
}

impl SortOrder {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

/// One sort criterion as stored on a View
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortSpec {
    pub id: String,
    /// Column name
    pub field: String,
    #[serde(alias = "type")]
    pub column_type: ColumnType,
    #[serde(default)]
    pub order: SortOrder,
}

impl SortSpec {
    pub fn ascending(id: impl Into<String>, field: impl Into<String>, column_type: ColumnType) -> Self {
        SortSpec {
            id: id.into(),
            field: field.into(),
            column_type,
            order: SortOrder::Asc,
        }
    }

    pub fn descending(id: impl Into<String>, field: impl Into<String>, column_type: ColumnType) -> Self {
        SortSpec {
            id: id.into(),
            field: field.into(),
            column_type,
            order: SortOrder::Desc,
        }
    }
}

/// A sort criterion resolved against the table's columns
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub column_id: ColumnId,
    pub field: String,
    pub column_type: ColumnType,
    pub order: SortOrder,
}

impl SortKey {
    pub fn compare_rows<R: RowCells + ?Sized>(&self, a: &R, b: &R) -> Ordering {
        let ordering = compare_values(a.cell(&self.column_id), b.cell(&self.column_id));
        self.order.apply(ordering)
    }
}

/// Compare two cells in ascending order.
///
/// Numbers compare numerically and text with a case-folding collation. Empty
/// number cells (and missing cells) sort after every value.
pub fn compare_values(a: Option<&CellValue>, b: Option<&CellValue>) -> Ordering {
    let rank = |v: Option<&CellValue>| match v {
        Some(CellValue::Number(_)) => 0u8,
        Some(CellValue::Text(_)) => 1,
        Some(CellValue::Null) | None => 2,
    };

    match (a, b) {
        (Some(CellValue::Number(x)), Some(CellValue::Number(y))) => {
            x.partial_cmp(y).unwrap_or(Ordering::Equal)
        }
        (Some(CellValue::Text(x)), Some(CellValue::Text(y))) => collate(x, y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Case-insensitive ordering with a byte-wise tie-break, so "apple" < "Banana"
/// but the order stays total.
fn collate(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    folded.then_with(|| a.cmp(b))
}

/// Split of a sort list into the store-level key and the in-memory tie-breakers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortPlan {
    primary: Option<SortKey>,
    residual: Vec<SortKey>,
}

impl SortPlan {
    /// Resolve sort specs against `columns`. Specs naming an unknown column are
    /// dropped; the first surviving key becomes the primary.
    pub fn plan(specs: &[SortSpec], columns: &[Column]) -> SortPlan {
        let mut keys = specs.iter().filter_map(|spec| {
            let resolved = columns.iter().find(|c| c.name == spec.field).map(|c| SortKey {
                column_id: c.id.clone(),
                field: c.name.clone(),
                column_type: c.column_type,
                order: spec.order,
            });
            if resolved.is_none() {
                log::warn!("sorter {} names unknown field '{}'", spec.id, spec.field);
            }
            resolved
        });

        let primary = keys.next();
        let residual = keys.collect();
        SortPlan { primary, residual }
    }

    /// The key pushed down to the store. None means insertion order.
    pub fn primary(&self) -> Option<&SortKey> {
        self.primary.as_ref()
    }

    pub fn residual(&self) -> &[SortKey] {
        &self.residual
    }

    pub fn is_default(&self) -> bool {
        self.primary.is_none()
    }

    /// Reorder one fetched page. The page must already be in primary-key order;
    /// rows equal on the primary key are ordered by the residual keys.
    pub fn sort_page(&self, rows: &mut [StoredRow]) {
        let Some(primary) = &self.primary else {
            return;
        };
        if self.residual.is_empty() {
            return;
        }

        rows.sort_by(|a, b| {
            std::iter::once(primary)
                .chain(self.residual.iter())
                .map(|key| key.compare_rows(a, b))
                .find(|ordering| *ordering != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
    }
}
