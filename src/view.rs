/// LiveGrid Views
///
/// A View is a named, persisted snapshot of filter, sort, search and
/// field-visibility state for one table. The engine reads a View's state per
/// request; it never keeps Views of its own. `ViewStore` is the in-memory
/// persistence the server wires in.

use crate::column::TableId;
use crate::engine::QueryRequest;
use crate::error::{EngineError, Result};
use crate::filter::FilterSpec;
use crate::sort::SortSpec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub id: String,
    pub table_id: TableId,
    pub name: String,
    #[serde(default)]
    pub filter_state: Vec<FilterSpec>,
    #[serde(default)]
    pub sorter_state: Vec<SortSpec>,
    #[serde(default)]
    pub search_term: String,
    #[serde(default)]
    pub hidden_fields: Vec<String>,
}

impl View {
    pub fn new(id: impl Into<String>, table_id: impl Into<String>, name: impl Into<String>) -> Self {
        View {
            id: id.into(),
            table_id: table_id.into(),
            name: name.into(),
            filter_state: Vec::new(),
            sorter_state: Vec::new(),
            search_term: String::new(),
            hidden_fields: Vec::new(),
        }
    }

    /// Build the query for one page of this View
    pub fn to_query(&self, cursor: Option<String>, limit: Option<usize>) -> QueryRequest {
        QueryRequest {
            table_id: self.table_id.clone(),
            limit,
            filters: self.filter_state.clone(),
            sorters: self.sorter_state.clone(),
            search_term: self.search_term.clone(),
            cursor,
        }
    }

    /// Apply a partial update. Absent fields are left untouched.
    pub fn apply(&mut self, update: ViewUpdate) {
        if let Some(filters) = update.filters {
            self.filter_state = filters;
        }
        if let Some(sorters) = update.sorters {
            self.sorter_state = sorters;
        }
        if let Some(name) = update.new_name {
            self.name = name;
        }
        if let Some(term) = update.search_term {
            self.search_term = term;
        }
        if let Some(hidden) = update.hidden_fields {
            self.hidden_fields = hidden;
        }
    }
}

/// Partial update of a View
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewUpdate {
    pub id: String,
    #[serde(default)]
    pub filters: Option<Vec<FilterSpec>>,
    #[serde(default)]
    pub sorters: Option<Vec<SortSpec>>,
    #[serde(default)]
    pub new_name: Option<String>,
    #[serde(default)]
    pub search_term: Option<String>,
    #[serde(default)]
    pub hidden_fields: Option<Vec<String>>,
}

impl ViewUpdate {
    pub fn new(id: impl Into<String>) -> Self {
        ViewUpdate {
            id: id.into(),
            ..ViewUpdate::default()
        }
    }
}

#[derive(Debug, Default)]
struct ViewEntries {
    views: HashMap<String, (u64, View)>,
    next_seq: u64,
}

/// In-memory View persistence
#[derive(Debug, Default)]
pub struct ViewStore {
    entries: RwLock<ViewEntries>,
}

impl ViewStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> EngineError {
        EngineError::Store("view store lock poisoned".to_string())
    }

    /// Create a View, replacing any View with the same id
    pub fn create(&self, view: View) -> Result<View> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        let existing = entries.views.get(&view.id).map(|(seq, _)| *seq);
        let seq = match existing {
            Some(seq) => seq,
            None => {
                entries.next_seq += 1;
                entries.next_seq
            }
        };
        entries.views.insert(view.id.clone(), (seq, view.clone()));
        Ok(view)
    }

    pub fn get(&self, id: &str) -> Result<View> {
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        entries
            .views
            .get(id)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| EngineError::ViewNotFound(id.to_string()))
    }

    /// Views of a table in creation order
    pub fn list(&self, table_id: &str) -> Result<Vec<View>> {
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        let mut views: Vec<&(u64, View)> = entries
            .views
            .values()
            .filter(|(_, v)| v.table_id == table_id)
            .collect();
        views.sort_by_key(|(seq, _)| *seq);
        Ok(views.into_iter().map(|(_, v)| v.clone()).collect())
    }

    pub fn update(&self, update: ViewUpdate) -> Result<View> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        let (_, view) = entries
            .views
            .get_mut(&update.id)
            .ok_or_else(|| EngineError::ViewNotFound(update.id.clone()))?;
        view.apply(update);
        Ok(view.clone())
    }

    pub fn delete(&self, id: &str) -> Result<View> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        entries
            .views
            .remove(id)
            .map(|(_, v)| v)
            .ok_or_else(|| EngineError::ViewNotFound(id.to_string()))
    }
}
