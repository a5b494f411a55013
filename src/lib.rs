/// LiveGrid - Spreadsheet Query Engine
///
/// Serves filtered, sorted, searched and paginated views over tables whose
/// cells are stored entity-attribute-value style, and applies single-cell
/// writes and seeded bulk row inserts against the same store.

pub mod column;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod materialize;
pub mod pagination;
pub mod predicate;
pub mod search;
pub mod sort;
pub mod store;
pub mod view;

pub use column::{CellInput, CellValue, Column, ColumnPriority, ColumnType, NewColumn};
pub use config::{EngineConfig, ServerConfig};
pub use engine::{BulkCreateRequest, QueryEngine, QueryRequest, QueryResponse};
pub use error::{EngineError, Result};
pub use filter::{Combinator, FilterList, FilterOperator, FilterSpec};
pub use materialize::{CellUpdate, RowRecord};
pub use sort::{SortOrder, SortSpec};
pub use store::{Cell, CellStore, MemoryStore, NewRow, Row, RowId, ScanStats};
pub use view::{View, ViewStore, ViewUpdate};

// HTTP + WebSocket server modules - only when server feature is enabled
#[cfg(feature = "server")]
pub mod messages;
#[cfg(feature = "server")]
pub mod websocket;
#[cfg(feature = "server")]
pub mod server;
