/// LiveGrid Row Materializer
///
/// Reads: projects the sparse cells of a stored row into one record keyed by
/// column name. Writes: turns a cell update request into the typed value the
/// store overwrites. Bulk inserts: generates reproducible cell values from a
/// seed for synthetic rows.

use crate::column::{CellInput, CellValue, Column, ColumnId, ColumnType};
use crate::error::{EngineError, Result};
use crate::store::{NewRow, RowId, StoredRow};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One row as returned to callers: `{id, <column name>: value, ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowRecord {
    pub id: RowId,
    #[serde(flatten)]
    pub fields: BTreeMap<String, CellValue>,
}

impl RowRecord {
    pub fn get(&self, field: &str) -> Option<&CellValue> {
        self.fields.get(field)
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(CellValue::as_text)
    }

    pub fn number(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(CellValue::as_number)
    }
}

/// Project a stored row onto the table's columns.
///
/// A cell that is missing, or whose value does not fit the column type, reads
/// as the column default.
pub fn materialize(row: &StoredRow, columns: &[Column]) -> RowRecord {
    let fields = columns
        .iter()
        .map(|col| {
            let value = match row.cell(&col.id) {
                Some(value) if value.fits(col.column_type) => value.clone(),
                _ => col.default_value(),
            };
            (col.name.clone(), value)
        })
        .collect();

    RowRecord {
        id: row.id.clone(),
        fields,
    }
}

pub fn materialize_all(rows: &[StoredRow], columns: &[Column]) -> Vec<RowRecord> {
    rows.iter().map(|row| materialize(row, columns)).collect()
}

/// Write-through request for a single cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellUpdate {
    pub row_id: RowId,
    pub column_id: ColumnId,
    pub new_value: CellInput,
    pub column_type: ColumnType,
}

impl CellUpdate {
    pub fn new(
        row_id: impl Into<String>,
        column_id: impl Into<String>,
        new_value: impl Into<CellInput>,
        column_type: ColumnType,
    ) -> Self {
        CellUpdate {
            row_id: row_id.into(),
            column_id: column_id.into(),
            new_value: new_value.into(),
            column_type,
        }
    }

    /// Resolve the value to store in `column`. The request's declared type
    /// must agree with the column's.
    pub fn typed_value(&self, column: &Column) -> Result<CellValue> {
        if self.column_type != column.column_type {
            return Err(EngineError::TypeMismatch {
                column: column.name.clone(),
                actual: column.column_type.to_string(),
                requested: self.column_type.to_string(),
            });
        }
        CellValue::coerce(self.new_value.clone(), column.column_type)
    }
}

const FIRST_NAMES: &[&str] = &[
    "Alice", "Bruno", "Chen", "Dara", "Elena", "Farid", "Grace", "Hiro", "Ines", "Jonah",
    "Kemi", "Liam", "Maya", "Nikolai", "Omar", "Priya",
];
const LAST_NAMES: &[&str] = &[
    "Anders", "Baptiste", "Costa", "Dubois", "Eriksen", "Fischer", "Garcia", "Huang",
    "Ivanova", "Jensen", "Kowalski", "Larsen", "Moreau", "Nakamura",
];
const PET_NAMES: &[&str] = &[
    "Biscuit", "Pepper", "Mochi", "Luna", "Rocket", "Waffles", "Ziggy", "Noodle", "Pickles",
    "Clover", "Bandit", "Maple",
];
const DISH_STYLES: &[&str] = &[
    "Grilled", "Braised", "Smoked", "Crispy", "Roasted", "Spicy", "Steamed", "Glazed",
];
const DISH_BASES: &[&str] = &[
    "salmon with rice", "pork belly", "tofu curry", "chicken tacos", "lamb stew",
    "mushroom risotto", "beef noodles", "vegetable dumplings",
];

type TextGenerator = fn(&mut StdRng) -> String;

fn person_name(rng: &mut StdRng) -> String {
    format!("{} {}", pick(rng, FIRST_NAMES), pick(rng, LAST_NAMES))
}

fn pet_name(rng: &mut StdRng) -> String {
    pick(rng, PET_NAMES).to_string()
}

fn dish(rng: &mut StdRng) -> String {
    format!("{} {}", pick(rng, DISH_STYLES), pick(rng, DISH_BASES))
}

fn pick(rng: &mut StdRng, words: &[&'static str]) -> &'static str {
    words.choose(rng).copied().unwrap_or_default()
}

/// Text generators, chosen per column by position modulo their count
const TEXT_GENERATORS: [TextGenerator; 3] = [person_name, pet_name, dish];

/// Inclusive bounds of generated numbers
pub const GENERATED_NUMBER_RANGE: (i64, i64) = (1, 100);

/// Seeded generator for synthetic rows.
///
/// The same seed and column layout always yield the same values.
pub struct RowGenerator {
    rng: StdRng,
}

impl RowGenerator {
    pub fn new(seed: u64) -> Self {
        RowGenerator {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generate one row's cells, visiting columns in the given order
    pub fn next_row(&mut self, id: RowId, columns: &[Column]) -> NewRow {
        let mut row = NewRow::new(id);
        for (position, column) in columns.iter().enumerate() {
            let value = match column.column_type {
                ColumnType::Text => {
                    let generate = TEXT_GENERATORS[position % TEXT_GENERATORS.len()];
                    CellValue::Text(generate(&mut self.rng))
                }
                ColumnType::Number => {
                    let (lo, hi) = GENERATED_NUMBER_RANGE;
                    CellValue::Number(self.rng.gen_range(lo..=hi) as f64)
                }
            };
            row.cells.insert(column.id.clone(), value);
        }
        row
    }

    pub fn generate(&mut self, ids: Vec<RowId>, columns: &[Column]) -> Vec<NewRow> {
        ids.into_iter().map(|id| self.next_row(id, columns)).collect()
    }
}
