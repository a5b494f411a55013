/// Row predicate handed to the cell store: the compiled filter AND the search overlay.

use crate::column::Column;
use crate::filter::{compile_filters, CompiledFilter, FilterSpec};
use crate::search::SearchOverlay;
use crate::store::RowCells;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowPredicate {
    filter: CompiledFilter,
    search: SearchOverlay,
}

impl RowPredicate {
    pub fn new(filter: CompiledFilter, search: SearchOverlay) -> Self {
        RowPredicate { filter, search }
    }

    /// Compile filters and search term against the table's columns
    pub fn compile(filters: &[FilterSpec], search_term: &str, columns: &[Column]) -> Self {
        RowPredicate {
            filter: compile_filters(filters, columns),
            search: SearchOverlay::build(search_term, columns),
        }
    }

    /// Predicate accepting every row
    pub fn always() -> Self {
        RowPredicate::default()
    }

    pub fn filter(&self) -> &CompiledFilter {
        &self.filter
    }

    pub fn search(&self) -> &SearchOverlay {
        &self.search
    }

    pub fn is_always(&self) -> bool {
        self.filter.is_always() && !self.search.is_active()
    }

    pub fn matches<R: RowCells + ?Sized>(&self, row: &R) -> bool {
        self.filter.matches(row) && self.search.matches(row)
    }
}
