use actix_web::{web, App, HttpServer};
use reviewware::api::{self, AppState};
use reviewware::config::load_settings;
use reviewware::db::Database;
use reviewware::logging;
use reviewware::render::{TemplateRenderer, TemplateSet};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

fn other_error(err: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err.to_string())
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Optional first argument: path to a config file.
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let settings = load_settings(config_path.as_deref()).map_err(other_error)?;

    if let Err(err) = logging::init(settings.log_level.as_deref()) {
        eprintln!("Logging was already initialised: {err}");
    }

    // Initialize the database
    let db = Database::new(&settings.database.path).map_err(other_error)?;
    db.create_schema().await.map_err(other_error)?;
    info!("Schema created successfully at {}", settings.database.path);

    let templates: Arc<dyn TemplateRenderer> = Arc::new(TemplateSet::with_defaults().map_err(other_error)?);
    let state = AppState::new(&settings, db, templates).map_err(other_error)?;

    let addr = (settings.server.address.clone(), settings.server.port);
    info!("listening on http://{}:{}", addr.0, addr.1);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(api::configure)
    })
    .bind(addr)?
    .run()
    .await
}
