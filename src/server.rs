/// HTTP server with WebSocket support for grid queries and live updates
use actix_web::http::StatusCode;
use actix_web::{middleware, web, App, Error, HttpRequest, HttpResponse, HttpServer, ResponseError};
use actix_web_actors::ws;
use serde::Deserialize;

use crate::column::{ColumnType, NewColumn};
use crate::config::ServerConfig;
use crate::engine::{BulkCreateRequest, QueryRequest};
use crate::error::EngineError;
use crate::materialize::CellUpdate;
use crate::messages::ServerMessage;
use crate::store::CellStore;
use crate::view::{View, ViewUpdate};
use crate::websocket::{AppState, GridWebSocket};

impl ResponseError for EngineError {
    fn status_code(&self) -> StatusCode {
        if self.is_not_found() {
            StatusCode::NOT_FOUND
        } else if self.is_invalid_input() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.to_string()
        }))
    }
}

type HandlerResult = Result<HttpResponse, EngineError>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRowBody {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BulkCreateBody {
    ids: Vec<String>,
    #[serde(default)]
    seed: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddColumnBody {
    id: String,
    name: String,
    #[serde(rename = "type")]
    column_type: ColumnType,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageParams {
    cursor: Option<String>,
    limit: Option<usize>,
}

/// WebSocket endpoint handler
async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    ws::start(GridWebSocket::new(state), &req, stream)
}

/// Health check endpoint
async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "message": "LiveGrid server is running"
    }))
}

async fn create_table(path: web::Path<String>, state: web::Data<AppState>) -> HandlerResult {
    let columns = state.engine.create_table(&path.into_inner())?;
    Ok(HttpResponse::Created().json(columns))
}

async fn query_rows(
    path: web::Path<String>,
    body: web::Json<QueryRequest>,
    state: web::Data<AppState>,
) -> HandlerResult {
    let mut request = body.into_inner();
    request.table_id = path.into_inner();
    Ok(HttpResponse::Ok().json(state.engine.query(&request)?))
}

async fn create_row(
    path: web::Path<String>,
    body: web::Json<CreateRowBody>,
    state: web::Data<AppState>,
) -> HandlerResult {
    let table_id = path.into_inner();
    let row = state.engine.create_row(&table_id, &body.id)?;
    let record = state.engine.get_row(&row.id)?;
    state.broadcast(ServerMessage::RowCreated {
        table_id,
        row: record.clone(),
    });
    Ok(HttpResponse::Created().json(record))
}

async fn bulk_create_rows(
    path: web::Path<String>,
    body: web::Json<BulkCreateBody>,
    state: web::Data<AppState>,
) -> HandlerResult {
    let body = body.into_inner();
    let request = BulkCreateRequest {
        table_id: path.into_inner(),
        ids: body.ids,
        seed: body.seed,
    };
    let created = state.engine.bulk_create_rows(&request)?;
    if !created.is_empty() {
        state.broadcast(ServerMessage::RowsCreated {
            table_id: request.table_id,
            row_ids: created.iter().map(|r| r.id.clone()).collect(),
        });
    }
    Ok(HttpResponse::Created().json(created))
}

async fn add_column(
    path: web::Path<String>,
    body: web::Json<AddColumnBody>,
    state: web::Data<AppState>,
) -> HandlerResult {
    let body = body.into_inner();
    let column = state.engine.add_column(
        &path.into_inner(),
        NewColumn::new(body.id, body.name, body.column_type),
    )?;
    Ok(HttpResponse::Created().json(column))
}

async fn update_cell(body: web::Json<CellUpdate>, state: web::Data<AppState>) -> HandlerResult {
    let cell = state.engine.update_cell(&body)?;
    state.broadcast(ServerMessage::CellUpdated { cell: cell.clone() });
    Ok(HttpResponse::Ok().json(cell))
}

async fn create_view(body: web::Json<View>, state: web::Data<AppState>) -> HandlerResult {
    let view = body.into_inner();
    if !state.engine.store().has_table(&view.table_id)? {
        return Err(EngineError::TableNotFound(view.table_id));
    }
    Ok(HttpResponse::Created().json(state.views.create(view)?))
}

async fn update_view(body: web::Json<ViewUpdate>, state: web::Data<AppState>) -> HandlerResult {
    Ok(HttpResponse::Ok().json(state.views.update(body.into_inner())?))
}

async fn view_rows(
    path: web::Path<String>,
    params: web::Query<PageParams>,
    state: web::Data<AppState>,
) -> HandlerResult {
    let view = state.views.get(&path.into_inner())?;
    let params = params.into_inner();
    let response = state.engine.query_view(&view, params.cursor, params.limit)?;
    Ok(HttpResponse::Ok().json(response))
}

/// Route table shared by the server and its tests
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/ws", web::get().to(ws_index))
        .route("/health", web::get().to(health_check))
        .route("/tables/{table_id}", web::post().to(create_table))
        .route("/tables/{table_id}/query", web::post().to(query_rows))
        .route("/tables/{table_id}/rows", web::post().to(create_row))
        .route("/tables/{table_id}/rows/bulk", web::post().to(bulk_create_rows))
        .route("/tables/{table_id}/columns", web::post().to(add_column))
        .route("/cells", web::patch().to(update_cell))
        .route("/views", web::post().to(create_view))
        .route("/views", web::patch().to(update_view))
        .route("/views/{view_id}/rows", web::get().to(view_rows));
}

/// Start the HTTP server with WebSocket support
pub async fn run_server(config: ServerConfig) -> std::io::Result<()> {
    let state = web::Data::new(AppState::new(config.engine));

    log::info!("LiveGrid server listening on http://{}:{}", config.host, config.port);
    log::info!("WebSocket: ws://{}:{}/ws", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            // CORS for development
            .wrap(
                actix_cors::Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .configure(configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
