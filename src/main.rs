// src/main.rs

mod ai_analyzer;
mod app_state;
mod bills;
mod calendar;
mod clients;
mod config;
mod dashboard;
mod documents;
mod email_fetcher;
mod email_intake;
mod email_templates;
mod emails;
mod employees;
mod error;
mod models;
mod seed;
mod store;
mod tasks;
#[cfg(test)]
mod test_support;

use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{http, middleware::Logger, web, App, HttpResponse, HttpServer};
use env_logger::Env;
use log::info;
use serde_json::json;

use crate::ai_analyzer::GeminiAnalyzer;
use crate::app_state::AppState;
use crate::email_fetcher::ImapMailSource;
use crate::error::{json_config, query_config};
use crate::store::JsonStore;

/// GET /api/health
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "message": "GreenBros backend is running"
    }))
}

/// Everything under `/api`. Shared by the server and the handler tests.
pub fn api_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(json_config())
            .app_data(query_config())
            .route("/health", web::get().to(health))
            .configure(clients::routes)
            .configure(employees::routes)
            .configure(tasks::routes)
            .configure(bills::routes)
            .configure(documents::routes)
            .configure(emails::routes)
            .configure(email_templates::routes)
            .configure(dashboard::routes)
            .configure(calendar::routes),
    );
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = config::Config::from_env();

    let store = JsonStore::open(&config.data_file, config.seed_sample_data)
        .await
        .map_err(|e| io::Error::other(format!("Failed to open {}: {e}", config.data_file.display())))?;
    tokio::fs::create_dir_all(&config.uploads_dir).await?;

    let analyzer = GeminiAnalyzer::new(config.gemini.clone()).map_err(io::Error::other)?;
    if config.gemini.api_key.is_none() {
        info!("GEMINI_API_KEY not set, email analysis is disabled");
    }
    if config.imap.user.is_none() || config.imap.password.is_none() {
        info!("GMAIL_USER / GMAIL_APP_PASSWORD not set, mailbox fetch is disabled");
    }

    let state = AppState {
        store: Arc::new(store),
        mailbox: Arc::new(ImapMailSource::new(config.imap.clone())),
        analyzer: Arc::new(analyzer),
        config: config.clone(),
    };

    let bind_addr = (config.host.clone(), config.port);
    let frontend_origin = config.frontend_origin.clone();
    info!("Server running at http://{}:{}", config.host, config.port);
    info!("Allowed CORS Origin: {}", frontend_origin);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&frontend_origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![http::header::CONTENT_TYPE, http::header::ACCEPT])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .configure(api_routes)
    })
    .bind(bind_addr)?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use actix_web::test;
    use serde_json::Value;

    use crate::test_support::{empty_state, test_app};

    #[actix_web::test]
    async fn health_reports_ok() {
        let (state, _dir) = empty_state();
        let app = test::init_service(test_app(state)).await;
        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "ok");
    }
}
