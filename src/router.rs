use spin_sdk::http::{Method, Request, Response};

use crate::auth::{login_user, logout_user};
use crate::core::errors::ApiError;
use crate::core::store::RecordStore;
use crate::notifications::{handle_clear, handle_list_notifications, handle_mark_read, handle_summary};
use crate::posts::{
    handle_comment, handle_create_post, handle_delete_post, handle_edit_post, handle_like,
    handle_list_posts, handle_share,
};
use crate::users::{create_user, get_profile, get_session, get_user_details};

fn method_name(method: &Method) -> &'static str {
    match method {
        Method::Get => "GET",
        Method::Post => "POST",
        Method::Put => "PUT",
        Method::Delete => "DELETE",
        _ => "OTHER",
    }
}

/// Maps a request onto its handler.
pub fn route(store: &dyn RecordStore, req: Request) -> anyhow::Result<Response> {
    let method = method_name(req.method());
    let path = req.path().to_string();
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    match (method, segments.as_slice()) {
        ("POST", ["signup"]) => create_user(store, req),
        ("POST", ["login"]) => login_user(store, req),
        ("POST", ["logout"]) => logout_user(store, req),
        ("GET", ["session"]) => get_session(store),
        ("GET", ["profile"]) => get_profile(store, req),
        ("GET", ["users", _]) => get_user_details(store, &path),
        ("GET", ["posts"]) => handle_list_posts(store, req),
        ("POST", ["posts"]) => handle_create_post(store, req),
        ("PUT", ["posts", id]) => handle_edit_post(store, req, id),
        ("DELETE", ["posts", id]) => handle_delete_post(store, req, id),
        ("POST", ["posts", id, "like"]) => handle_like(store, req, id),
        ("POST", ["posts", id, "comment"]) => handle_comment(store, req, id),
        ("POST", ["posts", id, "share"]) => handle_share(store, req, id),
        ("GET", ["notifications"]) => handle_list_notifications(store, req),
        ("GET", ["notifications", "summary"]) => handle_summary(store, req),
        ("POST", ["notifications", id, "read"]) => handle_mark_read(store, req, id),
        ("DELETE", ["notifications"]) => handle_clear(store, req),
        _ => Ok(ApiError::NotFound("No route found".to_string()).into()),
    }
}

/// Like `route`, but turns handler failures into a 500 response.
pub fn dispatch(store: &dyn RecordStore, req: Request) -> Response {
    let path = req.path().to_string();
    match route(store, req) {
        Ok(resp) => resp,
        Err(e) => {
            tracing::error!(%path, error = %e, "request failed");
            ApiError::InternalError("Internal server error".to_string()).into()
        }
    }
}
