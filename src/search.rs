/// LiveGrid Search Overlay
///
/// A free-text search term becomes one clause per column, ORed together:
/// text columns match on case-insensitive substring, number columns on exact
/// equality with the term parsed as a number. An empty or blank term matches
/// every row.

use crate::column::{parse_number, CellValue, Column, ColumnId, ColumnType};
use crate::store::RowCells;

#[derive(Debug, Clone, PartialEq)]
pub enum SearchClause {
    TextContains(ColumnId),
    /// None when the term is not a number: the clause never matches
    NumberEquals(ColumnId, Option<f64>),
}

impl SearchClause {
    fn column_id(&self) -> &ColumnId {
        match self {
            SearchClause::TextContains(id) | SearchClause::NumberEquals(id, _) => id,
        }
    }

    fn matches<R: RowCells + ?Sized>(&self, row: &R, needle: &str) -> bool {
        match (self, row.cell(self.column_id())) {
            (SearchClause::TextContains(_), Some(CellValue::Text(s))) => {
                s.to_lowercase().contains(needle)
            }
            (SearchClause::NumberEquals(_, Some(target)), Some(CellValue::Number(n))) => {
                n == target
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SearchOverlay {
    #[default]
    Inactive,
    Active {
        /// Lowercased search term
        needle: String,
        clauses: Vec<SearchClause>,
    },
}

impl SearchOverlay {
    /// A term that is empty or only whitespace leaves the overlay inactive.
    /// Otherwise the term is matched as typed, surrounding spaces included.
    pub fn build(term: &str, columns: &[Column]) -> SearchOverlay {
        if term.trim().is_empty() {
            return SearchOverlay::Inactive;
        }

        let number = parse_number(term);
        let clauses = columns
            .iter()
            .map(|col| match col.column_type {
                ColumnType::Text => SearchClause::TextContains(col.id.clone()),
                ColumnType::Number => SearchClause::NumberEquals(col.id.clone(), number),
            })
            .collect();

        SearchOverlay::Active {
            needle: term.to_lowercase(),
            clauses,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SearchOverlay::Active { .. })
    }

    pub fn matches<R: RowCells + ?Sized>(&self, row: &R) -> bool {
        match self {
            SearchOverlay::Inactive => true,
            SearchOverlay::Active { needle, clauses } => {
                clauses.iter().any(|clause| clause.matches(row, needle))
            }
        }
    }

    /// Ids of the columns whose cells satisfy the search in `row`.
    /// Empty when the overlay is inactive.
    pub fn matching_columns<R: RowCells + ?Sized>(&self, row: &R) -> Vec<ColumnId> {
        match self {
            SearchOverlay::Inactive => Vec::new(),
            SearchOverlay::Active { needle, clauses } => clauses
                .iter()
                .filter(|clause| clause.matches(row, needle))
                .map(|clause| clause.column_id().clone())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnPriority;
    use crate::store::StoredRow;
    use std::collections::HashMap;

    fn columns() -> Vec<Column> {
        vec![
            Column {
                id: "c-name".to_string(),
                table_id: "t".to_string(),
                name: "Name".to_string(),
                column_type: ColumnType::Text,
                display_order: 0,
                priority: ColumnPriority::Primary,
            },
            Column {
                id: "c-age".to_string(),
                table_id: "t".to_string(),
                name: "Age".to_string(),
                column_type: ColumnType::Number,
                display_order: 1,
                priority: ColumnPriority::Secondary,
            },
        ]
    }

    fn row(name: &str, age: Option<f64>) -> StoredRow {
        let mut cells = HashMap::new();
        cells.insert("c-name".to_string(), CellValue::Text(name.to_string()));
        cells.insert("c-age".to_string(), age.map_or(CellValue::Null, CellValue::Number));
        StoredRow {
            id: name.to_string(),
            table_id: "t".to_string(),
            row_order: 1,
            cells,
        }
    }

    #[test]
    fn test_empty_term_is_noop() {
        let overlay = SearchOverlay::build("", &columns());
        assert!(!overlay.is_active());
        assert!(overlay.matches(&row("anyone", None)));
    }

    #[test]
    fn test_blank_term_is_noop() {
        let overlay = SearchOverlay::build("   ", &columns());
        assert!(!overlay.is_active());
        assert!(overlay.matches(&row("Bob", Some(0.0))));
        assert!(overlay.matches(&row("nospace", None)));
    }

    #[test]
    fn test_text_match_ignores_case() {
        let overlay = SearchOverlay::build("ALI", &columns());
        assert!(overlay.matches(&row("Alice", Some(30.0))));
        assert!(overlay.matches(&row("Kalinda", None)));
        assert!(!overlay.matches(&row("Bob", Some(30.0))));
    }

    #[test]
    fn test_number_match_is_exact() {
        let overlay = SearchOverlay::build("30", &columns());
        assert!(overlay.matches(&row("Bob", Some(30.0))));
        assert!(!overlay.matches(&row("Bob", Some(300.0))));
        // the text clause still applies to a numeric term
        assert!(overlay.matches(&row("Room 301", None)));
    }

    #[test]
    fn test_non_numeric_term_skips_number_columns() {
        let overlay = SearchOverlay::build("abc", &columns());
        assert!(!overlay.matches(&row("Bob", Some(0.0))));
    }

    #[test]
    fn test_matching_columns() {
        let overlay = SearchOverlay::build("7", &columns());
        let r = row("Agent 007", Some(7.0));
        let mut hits = overlay.matching_columns(&r);
        hits.sort();
        assert_eq!(hits, vec!["c-age".to_string(), "c-name".to_string()]);
        assert!(SearchOverlay::Inactive.matching_columns(&r).is_empty());
    }
}
