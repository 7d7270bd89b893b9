use crate::config::{POSTS_KEY, SYSTEM_USER_ID};
use crate::core::helpers::now;
use crate::core::store::{write_collection, RecordStore};
use crate::models::models::Post;
use crate::posts::list_posts;

pub const WELCOME_POST_ID: &str = "default-1";

const WELCOME_TEXT: &str = "Welcome to Konekta! Share your moments, connect with friends, and spark new conversations. ✨";
const WELCOME_IMAGE: &str =
    "https://images.unsplash.com/photo-1487412720507-e7ab37603c6f?auto=format&fit=crop&w=900&q=80";

/// Puts the team's welcome post into an empty feed. Returns whether it
/// wrote anything.
pub fn seed_welcome_post(store: &dyn RecordStore) -> anyhow::Result<bool> {
    if !list_posts(store)?.is_empty() {
        return Ok(false);
    }

    let post = Post {
        id: WELCOME_POST_ID.to_string(),
        user_id: SYSTEM_USER_ID.to_string(),
        user: "Konekta Team".to_string(),
        handle: "@konekta".to_string(),
        text: WELCOME_TEXT.to_string(),
        image: Some(WELCOME_IMAGE.to_string()),
        likes: 0,
        liked_by: Vec::new(),
        comments: Vec::new(),
        shares: 0,
        created_at: now(),
    };
    write_collection(store, POSTS_KEY, &[post])?;
    tracing::info!("seeded welcome post");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;
    use crate::models::models::NewPost;
    use crate::posts::create_post;

    #[test]
    fn seeds_only_an_empty_feed() {
        let store = MemoryStore::new();
        assert!(seed_welcome_post(&store).unwrap());
        assert!(!seed_welcome_post(&store).unwrap());

        let posts = list_posts(&store).unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, WELCOME_POST_ID);
        assert_eq!(posts[0].user_id, SYSTEM_USER_ID);
    }

    #[test]
    fn leaves_existing_posts_alone() {
        let store = MemoryStore::new();
        create_post(
            &store,
            NewPost {
                user_id: "u1".to_string(),
                text: "mine".to_string(),
                ..Default::default()
            },
        )
        .unwrap();

        assert!(!seed_welcome_post(&store).unwrap());
        assert_eq!(list_posts(&store).unwrap()[0].text, "mine");
    }
}
