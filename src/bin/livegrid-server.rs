/// LiveGrid Server
///
/// Standalone server exposing the grid query engine over HTTP, with a
/// WebSocket channel for live cell and row updates.

use livegrid::config::ServerConfig;
use livegrid::server::run_server;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = ServerConfig::from_env()
        .map_err(|msg| std::io::Error::new(std::io::ErrorKind::InvalidInput, msg))?;

    run_server(config).await
}
