use konekta::core::store::MemoryStore;
use konekta::router::route;
use serde_json::{json, Value};
use spin_sdk::http::{Method, Request};

const PASSWORD: &str = "Sup3r$ecret";

fn call(
    store: &MemoryStore,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (u16, Value) {
    let mut builder = Request::builder();
    builder.method(method).uri(uri);
    if let Some(token) = token {
        builder.header("Authorization", format!("Bearer {}", token));
    }
    let bytes = body.map(|b| serde_json::to_vec(&b).unwrap()).unwrap_or_default();
    if !bytes.is_empty() {
        builder.header("Content-Type", "application/json");
    }
    let req = builder.body(bytes).build();

    let resp = route(store, req).expect("handler failed");
    let status = *resp.status();
    let value = if resp.body().is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(resp.body()).expect("response is not JSON")
    };
    (status, value)
}

fn signup(store: &MemoryStore, username: &str, email: &str) -> Value {
    let (status, user) = call(
        store,
        Method::Post,
        "/signup",
        None,
        Some(json!({
            "username": username,
            "email": email,
            "password": PASSWORD,
            "confirmPassword": PASSWORD,
        })),
    );
    assert_eq!(status, 201, "signup failed: {:?}", user);
    user
}

fn login(store: &MemoryStore, email: &str) -> String {
    let (status, body) = call(
        store,
        Method::Post,
        "/login",
        None,
        Some(json!({ "email": email, "password": PASSWORD })),
    );
    assert_eq!(status, 200, "login failed: {:?}", body);
    body["token"].as_str().expect("token missing").to_string()
}

fn signed_in(store: &MemoryStore, username: &str) -> (Value, String) {
    let email = format!("{}@example.com", username);
    let user = signup(store, username, &email);
    let token = login(store, &email);
    (user, token)
}

#[test]
fn test_full_user_flow() {
    let store = MemoryStore::new();

    // 1. Sign up
    let user = signup(&store, "flow_user", "flow@example.com");
    assert!(user.get("id").is_some(), "User ID missing: {:?}", user);
    assert!(user.get("password").is_none());

    // 2. Login
    let token = login(&store, "flow@example.com");

    let (status, profile) = call(&store, Method::Get, "/profile", Some(&token), None);
    assert_eq!(status, 200);
    assert_eq!(profile["id"], user["id"]);

    // 3. Feed starts with the welcome post
    let (status, feed) = call(&store, Method::Get, "/posts", None, None);
    assert_eq!(status, 200);
    assert_eq!(feed.as_array().unwrap().len(), 1);
    assert_eq!(feed[0]["id"], "default-1");
    assert_eq!(feed[0]["userId"], "system");

    // 4. Create post
    let (status, post) = call(
        &store,
        Method::Post,
        "/posts",
        Some(&token),
        Some(json!({ "text": "  Test post from integration test!  " })),
    );
    assert_eq!(status, 201);
    assert_eq!(post["text"], "Test post from integration test!");
    assert_eq!(post["userId"], user["id"]);
    assert_eq!(post["handle"], "@flow_user");
    let post_id = post["id"].as_str().unwrap().to_string();

    let (_, feed) = call(&store, Method::Get, "/posts", None, None);
    assert_eq!(feed[0]["id"], post_id.as_str());

    // 5. Edit post
    let (status, edited) = call(
        &store,
        Method::Put,
        &format!("/posts/{}", post_id),
        Some(&token),
        Some(json!({ "text": "Updated content" })),
    );
    assert_eq!(status, 200);
    assert_eq!(edited["text"], "Updated content");

    // 6. Delete post
    let (status, _) = call(&store, Method::Delete, &format!("/posts/{}", post_id), Some(&token), None);
    assert_eq!(status, 204);
    let (_, feed) = call(&store, Method::Get, "/posts", None, None);
    assert!(feed.as_array().unwrap().iter().all(|p| p["id"] != post_id.as_str()));
}

#[test]
fn test_like_comment_share_and_notifications() {
    let store = MemoryStore::new();
    let (_, author_token) = signed_in(&store, "author");
    let (_, fan_token) = signed_in(&store, "fan");

    let (_, post) = call(
        &store,
        Method::Post,
        "/posts",
        Some(&author_token),
        Some(json!({ "text": "like me" })),
    );
    let post_id = post["id"].as_str().unwrap().to_string();

    let like_path = format!("/posts/{}/like", post_id);
    let (status, liked) = call(&store, Method::Post, &like_path, Some(&fan_token), None);
    assert_eq!(status, 200);
    assert_eq!(liked["likes"], 1);
    assert_eq!(liked["likedBy"].as_array().unwrap().len(), 1);

    // second click undoes the like and adds no notification
    let (_, unliked) = call(&store, Method::Post, &like_path, Some(&fan_token), None);
    assert_eq!(unliked["likes"], 0);
    assert!(unliked["likedBy"].as_array().unwrap().is_empty());

    let (status, commented) = call(
        &store,
        Method::Post,
        &format!("/posts/{}/comment", post_id),
        Some(&fan_token),
        Some(json!({ "text": " nice one " })),
    );
    assert_eq!(status, 201);
    assert_eq!(commented["comments"][0]["user"], "fan");
    assert_eq!(commented["comments"][0]["text"], "nice one");

    let share_path = format!("/posts/{}/share", post_id);
    call(&store, Method::Post, &share_path, Some(&fan_token), None);
    let (_, shared) = call(&store, Method::Post, &share_path, Some(&fan_token), None);
    assert_eq!(shared["shares"], 2);

    let (status, notifications) = call(&store, Method::Get, "/notifications", Some(&author_token), None);
    assert_eq!(status, 200);
    let kinds: Vec<&str> = notifications
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["type"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["share", "share", "comment", "like"]);
    assert_eq!(notifications[3]["text"], "fan liked your post ❤️");

    let (_, likes_only) = call(&store, Method::Get, "/notifications?type=like", Some(&author_token), None);
    assert_eq!(likes_only.as_array().unwrap().len(), 1);

    let (status, _) = call(&store, Method::Get, "/notifications?type=poke", Some(&author_token), None);
    assert_eq!(status, 400);

    let first_id = notifications[0]["id"].as_str().unwrap().to_string();
    let (status, read) = call(
        &store,
        Method::Post,
        &format!("/notifications/{}/read", first_id),
        Some(&author_token),
        None,
    );
    assert_eq!(status, 200);
    assert_eq!(read["read"], true);

    let (_, summary) = call(&store, Method::Get, "/notifications/summary", Some(&author_token), None);
    assert_eq!(summary["total"], 4);
    assert_eq!(summary["unread"], 3);
    assert_eq!(summary["shares"], 2);

    let (status, _) = call(&store, Method::Delete, "/notifications", Some(&author_token), None);
    assert_eq!(status, 204);
    let (_, notifications) = call(&store, Method::Get, "/notifications", Some(&author_token), None);
    assert!(notifications.as_array().unwrap().is_empty());
}

#[test]
fn test_engaging_missing_post_is_not_found() {
    let store = MemoryStore::new();
    let (_, token) = signed_in(&store, "lost_user");

    for action in ["like", "share"] {
        let (status, _) = call(&store, Method::Post, &format!("/posts/nope/{}", action), Some(&token), None);
        assert_eq!(status, 404);
    }
    let (status, _) = call(
        &store,
        Method::Post,
        "/posts/nope/comment",
        Some(&token),
        Some(json!({ "text": "hello?" })),
    );
    assert_eq!(status, 404);
}

#[test]
fn test_post_content_validation() {
    let store = MemoryStore::new();
    let (_, token) = signed_in(&store, "validator");

    let (status, _) = call(&store, Method::Post, "/posts", Some(&token), Some(json!({ "text": "   " })));
    assert_eq!(status, 400);

    let long_text = "a".repeat(5001);
    let (status, _) = call(&store, Method::Post, "/posts", Some(&token), Some(json!({ "text": long_text })));
    assert_eq!(status, 400);

    let (status, _) = call(
        &store,
        Method::Post,
        "/posts",
        Some(&token),
        Some(json!({ "text": "", "image": "javascript:alert(1)" })),
    );
    assert_eq!(status, 400);

    let (status, post) = call(
        &store,
        Method::Post,
        "/posts",
        Some(&token),
        Some(json!({ "image": "data:image/png;base64,iVBORw0KGgo=" })),
    );
    assert_eq!(status, 201);
    assert_eq!(post["text"], "");
    assert_eq!(post["image"], "data:image/png;base64,iVBORw0KGgo=");
}

#[test]
fn test_length_limits_count_characters() {
    let store = MemoryStore::new();
    let (_, token) = signed_in(&store, "counter");

    // 3000 two-byte characters stay under the 5000 character limit
    let accented = "é".repeat(3000);
    let (status, post) = call(&store, Method::Post, "/posts", Some(&token), Some(json!({ "text": accented })));
    assert_eq!(status, 201);
    let post_id = post["id"].as_str().unwrap().to_string();
    let comment_path = format!("/posts/{}/comment", post_id);

    let (status, _) = call(
        &store,
        Method::Post,
        &comment_path,
        Some(&token),
        Some(json!({ "text": "ü".repeat(1000) })),
    );
    assert_eq!(status, 201);

    // escaping `<` must not push a comment over the limit
    let (status, commented) = call(
        &store,
        Method::Post,
        &comment_path,
        Some(&token),
        Some(json!({ "text": "<".repeat(1000) })),
    );
    assert_eq!(status, 201);
    assert_eq!(commented["comments"].as_array().unwrap().len(), 2);

    let (status, _) = call(
        &store,
        Method::Post,
        &comment_path,
        Some(&token),
        Some(json!({ "text": "a".repeat(1001) })),
    );
    assert_eq!(status, 400);
}

#[test]
fn test_linked_url_keeps_query_string() {
    let store = MemoryStore::new();
    let (_, token) = signed_in(&store, "linker");

    let (status, post) = call(
        &store,
        Method::Post,
        "/posts",
        Some(&token),
        Some(json!({ "text": "see https://ex.com/?a=1&b=2" })),
    );
    assert_eq!(status, 201);
    let text = post["text"].as_str().unwrap();
    assert!(text.contains(r#"href="https://ex.com/?a=1&amp;b=2""#), "{}", text);
    assert!(!text.contains("&amp;amp;"));
}

#[test]
fn test_only_owner_or_system_posts_can_be_deleted() {
    let store = MemoryStore::new();
    let (_, owner_token) = signed_in(&store, "owner");
    let (_, other_token) = signed_in(&store, "other");
    // loading the empty feed seeds the welcome post
    call(&store, Method::Get, "/posts", None, None);

    let (_, post) = call(&store, Method::Post, "/posts", Some(&owner_token), Some(json!({ "text": "mine" })));
    let path = format!("/posts/{}", post["id"].as_str().unwrap());

    let (status, _) = call(&store, Method::Delete, &path, Some(&other_token), None);
    assert_eq!(status, 403);
    let (status, _) = call(&store, Method::Put, &path, Some(&other_token), Some(json!({ "text": "hijack" })));
    assert_eq!(status, 403);

    // anyone signed in may remove the welcome post
    let (status, _) = call(&store, Method::Delete, "/posts/default-1", Some(&other_token), None);
    assert_eq!(status, 204);
    let (status, _) = call(&store, Method::Delete, "/posts/default-1", Some(&other_token), None);
    assert_eq!(status, 404);
}

#[test]
fn test_signup_rejects_duplicates_and_weak_input() {
    let store = MemoryStore::new();
    signup(&store, "taken_name", "first@example.com");

    let attempt = |username: &str, email: &str, password: &str| {
        call(
            &store,
            Method::Post,
            "/signup",
            None,
            Some(json!({ "username": username, "email": email, "password": password })),
        )
        .0
    };

    assert_eq!(attempt("someone", "first@example.com", PASSWORD), 409);
    assert_eq!(attempt("TAKEN_NAME", "second@example.com", PASSWORD), 409);
    assert_eq!(attempt("someone", "not-an-email", PASSWORD), 400);
    assert_eq!(attempt("x", "third@example.com", PASSWORD), 400);
    assert_eq!(attempt("someone", "third@example.com", "weakpass"), 400);

    let (status, _) = call(
        &store,
        Method::Post,
        "/signup",
        None,
        Some(json!({
            "username": "someone",
            "email": "third@example.com",
            "password": PASSWORD,
            "confirmPassword": "different",
        })),
    );
    assert_eq!(status, 400);
}

#[test]
fn test_login_invalid_credentials() {
    let store = MemoryStore::new();
    signup(&store, "real_user", "real@example.com");

    let (status, _) = call(
        &store,
        Method::Post,
        "/login",
        None,
        Some(json!({ "email": "nobody@example.com", "password": PASSWORD })),
    );
    assert_eq!(status, 401);

    let (status, _) = call(
        &store,
        Method::Post,
        "/login",
        None,
        Some(json!({ "email": "real@example.com", "password": "Wr0ng!pass" })),
    );
    assert_eq!(status, 401);
}

#[test]
fn test_create_post_requires_auth() {
    let store = MemoryStore::new();
    let (status, _) = call(&store, Method::Post, "/posts", None, Some(json!({ "text": "no auth" })));
    assert_eq!(status, 401);

    let (status, _) = call(&store, Method::Post, "/posts", Some("bogus"), Some(json!({ "text": "no auth" })));
    assert_eq!(status, 401);
}

#[test]
fn test_session_follows_login_and_logout() {
    let store = MemoryStore::new();
    let (user, token) = signed_in(&store, "sessioned");

    let (status, current) = call(&store, Method::Get, "/session", None, None);
    assert_eq!(status, 200);
    assert_eq!(current["id"], user["id"]);

    let (status, _) = call(&store, Method::Post, "/logout", Some(&token), None);
    assert_eq!(status, 200);

    let (status, _) = call(&store, Method::Get, "/session", None, None);
    assert_eq!(status, 404);
    let (status, _) = call(&store, Method::Get, "/profile", Some(&token), None);
    assert_eq!(status, 401);
}

#[test]
fn test_list_posts_filters_by_user() {
    let store = MemoryStore::new();
    let (alice, alice_token) = signed_in(&store, "alice");
    let (_, bob_token) = signed_in(&store, "bob");

    call(&store, Method::Post, "/posts", Some(&alice_token), Some(json!({ "text": "a1" })));
    call(&store, Method::Post, "/posts", Some(&bob_token), Some(json!({ "text": "b1" })));
    call(&store, Method::Post, "/posts", Some(&alice_token), Some(json!({ "text": "a2" })));

    let uri = format!("/posts?user={}", alice["id"].as_str().unwrap());
    let (status, posts) = call(&store, Method::Get, &uri, None, None);
    assert_eq!(status, 200);
    let texts: Vec<&str> = posts.as_array().unwrap().iter().map(|p| p["text"].as_str().unwrap()).collect();
    assert_eq!(texts, vec!["a2", "a1"]);

    let (_, second_page) = call(&store, Method::Get, "/posts?page=2", None, None);
    assert!(second_page.as_array().unwrap().is_empty());

    let huge = format!("/posts?page={}", usize::MAX);
    let (status, far_page) = call(&store, Method::Get, &huge, None, None);
    assert_eq!(status, 200);
    assert!(far_page.as_array().unwrap().is_empty());
}

#[test]
fn test_unknown_route_is_not_found() {
    let store = MemoryStore::new();
    let (status, body) = call(&store, Method::Get, "/reels", None, None);
    assert_eq!(status, 404);
    assert_eq!(body["error"], "No route found");
}
