use std::sync::OnceLock;

use ammonia::Builder;
use html_escape::{decode_html_entities, encode_double_quoted_attribute};
use regex::Regex;
use serde::Deserialize;
use spin_sdk::http::{Request, Response};

use crate::auth::authenticate;
use crate::config::*;
use crate::core::db::seed_welcome_post;
use crate::core::errors::ApiError;
use crate::core::helpers::{json_response, new_id, no_content, now};
use crate::core::query_params::{get_int, get_string, parse_query_params};
use crate::core::store::{read_collection, write_collection, RecordStore};
use crate::models::models::{Comment, NewNotification, NewPost, NotificationKind, Post, PostPatch};
use crate::notifications::add_notification;

// === Ledger ===

/// All posts, newest first.
pub fn list_posts(store: &dyn RecordStore) -> anyhow::Result<Vec<Post>> {
    read_collection(store, POSTS_KEY)
}

pub fn find_post(store: &dyn RecordStore, post_id: &str) -> anyhow::Result<Option<Post>> {
    Ok(list_posts(store)?.into_iter().find(|p| p.id == post_id))
}

pub fn create_post(store: &dyn RecordStore, data: NewPost) -> anyhow::Result<Post> {
    let mut posts = list_posts(store)?;
    let post = Post {
        id: new_id(),
        user_id: data.user_id,
        user: data.user,
        handle: data.handle,
        text: data.text,
        image: data.image,
        likes: 0,
        liked_by: Vec::new(),
        comments: Vec::new(),
        shares: 0,
        created_at: now(),
    };
    posts.insert(0, post.clone()); // prepend newest
    write_collection(store, POSTS_KEY, &posts)?;
    tracing::debug!(post_id = %post.id, "created post");
    Ok(post)
}

/// Applies `change` to the post with `post_id` and persists the whole
/// collection. Nothing is written when the id is unknown.
fn mutate_post<F>(store: &dyn RecordStore, post_id: &str, change: F) -> anyhow::Result<Option<Post>>
where
    F: FnOnce(&mut Post),
{
    let mut posts = list_posts(store)?;
    let Some(post) = posts.iter_mut().find(|p| p.id == post_id) else {
        return Ok(None);
    };
    change(post);
    let updated = post.clone();
    write_collection(store, POSTS_KEY, &posts)?;
    Ok(Some(updated))
}

pub fn update_post(
    store: &dyn RecordStore,
    post_id: &str,
    patch: PostPatch,
) -> anyhow::Result<Option<Post>> {
    mutate_post(store, post_id, |post| {
        if let Some(user) = patch.user {
            post.user = user;
        }
        if let Some(handle) = patch.handle {
            post.handle = handle;
        }
        if let Some(text) = patch.text {
            post.text = text;
        }
        if let Some(image) = patch.image {
            post.image = image;
        }
    })
}

/// Removes the post if present. Deleting an unknown id is not an error.
pub fn delete_post(store: &dyn RecordStore, post_id: &str) -> anyhow::Result<()> {
    let mut posts = list_posts(store)?;
    posts.retain(|p| p.id != post_id);
    write_collection(store, POSTS_KEY, &posts)?;
    tracing::debug!(post_id, "deleted post");
    Ok(())
}

/// Flips `user_id`'s membership in the post's `likedBy` set. The like
/// counter always equals the size of that set.
pub fn toggle_like(
    store: &dyn RecordStore,
    post_id: &str,
    user_id: &str,
) -> anyhow::Result<Option<Post>> {
    mutate_post(store, post_id, |post| {
        if post.is_liked_by(user_id) {
            post.liked_by.retain(|id| id != user_id);
        } else {
            post.liked_by.push(user_id.to_string());
        }
        post.likes = post.liked_by.len() as u32;
    })
}

pub fn add_comment(
    store: &dyn RecordStore,
    post_id: &str,
    user: &str,
    text: &str,
) -> anyhow::Result<Option<Post>> {
    mutate_post(store, post_id, |post| {
        post.comments.push(Comment {
            id: new_id(),
            user: user.to_string(),
            text: text.to_string(),
            created_at: now(),
        });
    })
}

/// Re-sharing is always allowed; every call counts.
pub fn share_post(store: &dyn RecordStore, post_id: &str) -> anyhow::Result<Option<Post>> {
    mutate_post(store, post_id, |post| post.shares = post.shares.saturating_add(1))
}

// === Content filtering ===

fn url_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"https?://[^\s<]+").expect("Regex should compile"))
}

fn filter_post_content(content: &str) -> String {
    // Strip everything but plain text, then linkify bare URLs
    let clean = Builder::default()
        .tags(std::collections::HashSet::new())
        .clean(content)
        .to_string();

    url_regex()
        .replace_all(&clean, |caps: &regex::Captures| {
            // `url` is already HTML-escaped by ammonia
            let url = &caps[0];
            let escaped_url = encode_double_quoted_attribute(&decode_html_entities(url)).into_owned();
            format!(
                r#"<a href="{}" target="_blank" rel="noopener noreferrer">{}</a>"#,
                escaped_url, url
            )
        })
        .to_string()
}

fn sanitize_text(text: &str) -> String {
    Builder::default()
        .tags(std::collections::HashSet::new())
        .clean(text)
        .to_string()
}

fn is_valid_image(image: &str) -> bool {
    image.starts_with("data:image/") || image.starts_with("https://") || image.starts_with("http://")
}

// === HTTP Handlers ===

#[derive(Deserialize)]
struct PostBody {
    #[serde(default)]
    text: String,
    image: Option<String>,
}

#[derive(Deserialize)]
struct CommentBody {
    #[serde(default)]
    text: String,
}

fn not_found() -> Response {
    ApiError::NotFound("Post not found".to_string()).into()
}

pub fn handle_list_posts(store: &dyn RecordStore, req: Request) -> anyhow::Result<Response> {
    seed_welcome_post(store)?;

    let params = parse_query_params(&req.uri());
    let page = get_int(&params, "page", 1);
    let start_idx = (page - 1).saturating_mul(POSTS_PER_PAGE);

    let posts: Vec<Post> = match get_string(&params, "user") {
        Some(user_id) => list_posts(store)?
            .into_iter()
            .filter(|p| p.user_id == user_id)
            .skip(start_idx)
            .take(POSTS_PER_PAGE)
            .collect(),
        None => list_posts(store)?
            .into_iter()
            .skip(start_idx)
            .take(POSTS_PER_PAGE)
            .collect(),
    };

    json_response(200, &posts)
}

pub fn handle_create_post(store: &dyn RecordStore, req: Request) -> anyhow::Result<Response> {
    let user = match authenticate(store, &req) {
        Ok(u) => u,
        Err(e) => return Ok(e.into()),
    };
    let body: PostBody = match serde_json::from_slice(req.body()) {
        Ok(b) => b,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };

    let text = body.text.trim();
    let image = body.image.filter(|i| !i.is_empty());

    if text.is_empty() && image.is_none() {
        return Ok(ApiError::BadRequest("Please add text or an image to your post.".to_string()).into());
    }
    if text.chars().count() > MAX_POST_LENGTH {
        return Ok(ApiError::BadRequest("Invalid content".to_string()).into());
    }
    if image.as_deref().is_some_and(|i| !is_valid_image(i)) {
        return Ok(ApiError::BadRequest("Image must be a URL or an image data URI".to_string()).into());
    }

    let post = create_post(
        store,
        NewPost {
            user_id: user.id.clone(),
            user: user.username.clone(),
            handle: format!("@{}", user.username.to_lowercase()),
            text: filter_post_content(text),
            image,
        },
    )?;

    json_response(201, &post)
}

pub fn handle_edit_post(
    store: &dyn RecordStore,
    req: Request,
    post_id: &str,
) -> anyhow::Result<Response> {
    let user = match authenticate(store, &req) {
        Ok(u) => u,
        Err(e) => return Ok(e.into()),
    };

    let Some(post) = find_post(store, post_id)? else {
        return Ok(not_found());
    };
    if post.user_id != user.id {
        return Ok(ApiError::Forbidden("You can only edit your own posts.".to_string()).into());
    }

    let body: PostPatch = match serde_json::from_slice(req.body()) {
        Ok(b) => b,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };

    let mut patch = PostPatch::default();
    if let Some(text) = body.text {
        let text = text.trim();
        if text.chars().count() > MAX_POST_LENGTH {
            return Ok(ApiError::BadRequest("Invalid content".to_string()).into());
        }
        patch.text = Some(filter_post_content(text));
    }
    if let Some(image) = body.image {
        if image.as_deref().is_some_and(|i| !is_valid_image(i)) {
            return Ok(ApiError::BadRequest("Image must be a URL or an image data URI".to_string()).into());
        }
        patch.image = Some(image);
    }

    let would_be_empty = patch.text.as_ref().unwrap_or(&post.text).is_empty()
        && patch.image.as_ref().unwrap_or(&post.image).is_none();
    if would_be_empty {
        return Ok(ApiError::BadRequest("Please add text or an image to your post.".to_string()).into());
    }

    match update_post(store, post_id, patch)? {
        Some(updated) => json_response(200, &updated),
        None => Ok(not_found()),
    }
}

pub fn handle_delete_post(
    store: &dyn RecordStore,
    req: Request,
    post_id: &str,
) -> anyhow::Result<Response> {
    let user = match authenticate(store, &req) {
        Ok(u) => u,
        Err(e) => return Ok(e.into()),
    };

    let Some(post) = find_post(store, post_id)? else {
        return Ok(not_found());
    };
    if post.user_id != user.id && post.user_id != SYSTEM_USER_ID {
        return Ok(ApiError::Forbidden("You can only delete your own posts.".to_string()).into());
    }

    delete_post(store, post_id)?;
    Ok(no_content())
}

pub fn handle_like(store: &dyn RecordStore, req: Request, post_id: &str) -> anyhow::Result<Response> {
    let user = match authenticate(store, &req) {
        Ok(u) => u,
        Err(e) => return Ok(e.into()),
    };

    let Some(before) = find_post(store, post_id)? else {
        return Ok(not_found());
    };
    let was_liked = before.is_liked_by(&user.id);

    let Some(post) = toggle_like(store, post_id, &user.id)? else {
        return Ok(not_found());
    };

    if !was_liked {
        add_notification(
            store,
            NewNotification {
                kind: NotificationKind::Like,
                text: format!("{} liked your post ❤️", user.username),
                post_id: post.id.clone(),
            },
        )?;
    }

    json_response(200, &post)
}

pub fn handle_comment(
    store: &dyn RecordStore,
    req: Request,
    post_id: &str,
) -> anyhow::Result<Response> {
    let user = match authenticate(store, &req) {
        Ok(u) => u,
        Err(e) => return Ok(e.into()),
    };
    let body: CommentBody = match serde_json::from_slice(req.body()) {
        Ok(b) => b,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };

    let raw = body.text.trim();
    if raw.chars().count() > MAX_COMMENT_LENGTH {
        return Ok(ApiError::BadRequest("Comment too long".to_string()).into());
    }
    let text = sanitize_text(raw);
    if text.is_empty() {
        return Ok(ApiError::BadRequest("Comment cannot be empty".to_string()).into());
    }

    let Some(post) = add_comment(store, post_id, &user.username, &text)? else {
        return Ok(not_found());
    };

    add_notification(
        store,
        NewNotification {
            kind: NotificationKind::Comment,
            text: format!("{} commented on your post 💬", user.username),
            post_id: post.id.clone(),
        },
    )?;

    json_response(201, &post)
}

pub fn handle_share(store: &dyn RecordStore, req: Request, post_id: &str) -> anyhow::Result<Response> {
    let user = match authenticate(store, &req) {
        Ok(u) => u,
        Err(e) => return Ok(e.into()),
    };

    let Some(post) = share_post(store, post_id)? else {
        return Ok(not_found());
    };

    add_notification(
        store,
        NewNotification {
            kind: NotificationKind::Share,
            text: format!("{} shared your post 🔗", user.username),
            post_id: post.id.clone(),
        },
    )?;

    json_response(200, &post)
}
