//! Konekta: users, posts and notifications kept as whole JSON collections
//! in a key-value store, served over a small HTTP API.

pub mod auth;
pub mod config;
pub mod core;
pub mod models;
pub mod notifications;
pub mod posts;
pub mod router;
pub mod users;
pub mod validation;

#[cfg(not(target_arch = "wasm32"))]
pub mod native;

// === Component entrypoint ===
#[cfg(target_arch = "wasm32")]
#[spin_sdk::http_component]
fn handle(req: spin_sdk::http::Request) -> anyhow::Result<impl spin_sdk::http::IntoResponse> {
    let store = crate::core::store::SpinStore::open_default()?;
    Ok(router::dispatch(&store, req))
}
