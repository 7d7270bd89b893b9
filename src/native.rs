//! actix-web front for running the API outside of Spin.

use std::sync::Arc;

use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};

use crate::config;
use crate::core::store::{FileStore, MemoryStore, RecordStore};
use crate::router::dispatch;

pub type SharedStore = Arc<dyn RecordStore + Send + Sync>;

pub mod adapter {
    use actix_web::HttpRequest;
    use spin_sdk::http::{Method, Request};

    pub fn actix_to_spin_request(req: &HttpRequest, body: actix_web::web::Bytes) -> Request {
        let method = match req.method().as_str() {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "HEAD" => Method::Head,
            "OPTIONS" => Method::Options,
            "PATCH" => Method::Patch,
            _ => Method::Get,
        };

        let mut builder = Request::builder();
        builder.method(method).uri(req.uri().to_string());
        for (name, value) in req.headers() {
            if let Ok(val_str) = value.to_str() {
                builder.header(name.as_str(), val_str);
            }
        }
        builder.body(body.to_vec()).build()
    }

    pub fn spin_to_actix_response(spin_resp: spin_sdk::http::Response) -> actix_web::HttpResponse {
        let status = *spin_resp.status();
        let body = spin_resp.body().to_vec();

        let mut response = actix_web::HttpResponse::build(
            actix_web::http::StatusCode::from_u16(status)
                .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR),
        );
        // every handler answers with JSON or nothing
        if !body.is_empty() {
            response.content_type("application/json");
        }
        response.body(body)
    }
}

/// File-backed when `KONEKTA_DATA_DIR` is set, in-memory otherwise.
pub fn open_store() -> anyhow::Result<SharedStore> {
    match config::data_dir() {
        Some(dir) => {
            tracing::info!(dir = %dir.display(), "using file store");
            Ok(Arc::new(FileStore::open(dir)?))
        }
        None => {
            tracing::warn!("KONEKTA_DATA_DIR not set, data will not survive a restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

pub async fn handle_all(
    req: HttpRequest,
    body: web::Bytes,
    store: web::Data<SharedStore>,
) -> HttpResponse {
    let spin_req = adapter::actix_to_spin_request(&req, body);
    let spin_resp = dispatch(store.get_ref().as_ref(), spin_req);
    adapter::spin_to_actix_response(spin_resp)
}

pub async fn run(store: SharedStore, addr: &str) -> std::io::Result<()> {
    let data = web::Data::new(store);
    tracing::info!("listening on http://{}", addr);

    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .default_service(web::route().to(handle_all))
    })
    .bind(addr)?
    .run()
    .await
}
