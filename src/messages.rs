/// WebSocket message types for client-server communication
use serde::{Deserialize, Serialize};

use crate::column::TableId;
use crate::engine::{QueryRequest, QueryResponse};
use crate::materialize::RowRecord;
use crate::store::Cell;

/// Messages sent from client to server
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Subscribe to change notifications for a table
    #[serde(rename_all = "camelCase")]
    Subscribe { table_id: TableId },

    #[serde(rename_all = "camelCase")]
    Unsubscribe { table_id: TableId },

    /// Fetch one page of rows
    Query { request: QueryRequest },
}

/// Messages sent from server to client
#[derive(Debug, Serialize, Clone)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Page of rows in response to Query
    QueryResult { response: QueryResponse },

    /// A cell was overwritten
    CellUpdated { cell: Cell },

    /// A row was appended
    #[serde(rename_all = "camelCase")]
    RowCreated { table_id: TableId, row: RowRecord },

    /// A bulk insert finished
    #[serde(rename_all = "camelCase")]
    RowsCreated {
        table_id: TableId,
        row_ids: Vec<String>,
    },

    /// Subscription confirmed
    #[serde(rename_all = "camelCase")]
    Subscribed { table_id: TableId },

    #[serde(rename_all = "camelCase")]
    Unsubscribed { table_id: TableId },

    /// Error occurred
    Error { message: String },
}

impl ServerMessage {
    /// Table whose subscribers should receive this message, if any
    pub fn table_id(&self) -> Option<&str> {
        match self {
            ServerMessage::CellUpdated { cell } => Some(&cell.table_id),
            ServerMessage::RowCreated { table_id, .. }
            | ServerMessage::RowsCreated { table_id, .. } => Some(table_id),
            _ => None,
        }
    }
}
