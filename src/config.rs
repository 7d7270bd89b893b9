pub const USERS_KEY: &str = "konekta_users";
pub const POSTS_KEY: &str = "konekta_posts";
pub const NOTIFICATIONS_KEY: &str = "konekta_notifications";
pub const CURRENT_USER_KEY: &str = "konekta_current_user";
pub const TOKENS_KEY: &str = "konekta_tokens";

pub const SYSTEM_USER_ID: &str = "system";

pub const MAX_POST_LENGTH: usize = 5000;
pub const MAX_COMMENT_LENGTH: usize = 1000;
pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 20;
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const POSTS_PER_PAGE: usize = 20;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3001";

pub fn token_expiration_hours() -> i64 {
    std::env::var("KONEKTA_TOKEN_EXPIRATION_HOURS")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(24)
}

/// Directory for the native file store. `None` keeps everything in memory.
pub fn data_dir() -> Option<std::path::PathBuf> {
    std::env::var("KONEKTA_DATA_DIR")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(std::path::PathBuf::from)
}

pub fn bind_addr() -> String {
    std::env::var("KONEKTA_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
}
