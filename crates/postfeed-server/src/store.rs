//! In-memory blog datastore.
//!
//! Tables are plain vectors kept in insertion order behind one `RwLock`.
//! Writes go through [`MutationExecutor`](crate::mutation::MutationExecutor),
//! which holds the write lock across the write and its change notification.

use parking_lot::{RwLock, RwLockWriteGuard};

use postfeed_proto::{Comment, Post, User};

/// Raw table storage.
#[derive(Debug, Default, Clone)]
pub(crate) struct Tables {
    pub(crate) users: Vec<User>,
    pub(crate) posts: Vec<Post>,
    pub(crate) comments: Vec<Comment>,
}

/// In-memory store for users, posts and comments.
#[derive(Debug, Default)]
pub struct BlogStore {
    tables: RwLock<Tables>,
}

impl BlogStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the sample data set.
    pub fn seeded() -> Self {
        Self {
            tables: RwLock::new(seed_tables()),
        }
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write()
    }

    /// List users, optionally filtered by a case-insensitive name substring.
    pub fn users(&self, query: Option<&str>) -> Vec<User> {
        let tables = self.tables.read();
        match query {
            Some(query) => {
                let needle = query.to_lowercase();
                tables
                    .users
                    .iter()
                    .filter(|u| u.name.to_lowercase().contains(&needle))
                    .cloned()
                    .collect()
            }
            None => tables.users.clone(),
        }
    }

    pub fn user(&self, id: &str) -> Option<User> {
        self.tables.read().users.iter().find(|u| u.id == id).cloned()
    }

    /// List posts, optionally filtered by a case-insensitive title or body substring.
    pub fn posts(&self, query: Option<&str>) -> Vec<Post> {
        let tables = self.tables.read();
        match query {
            Some(query) => {
                let needle = query.to_lowercase();
                tables
                    .posts
                    .iter()
                    .filter(|p| {
                        p.title.to_lowercase().contains(&needle)
                            || p.body.to_lowercase().contains(&needle)
                    })
                    .cloned()
                    .collect()
            }
            None => tables.posts.clone(),
        }
    }

    pub fn post(&self, id: &str) -> Option<Post> {
        self.tables.read().posts.iter().find(|p| p.id == id).cloned()
    }

    pub fn comments(&self) -> Vec<Comment> {
        self.tables.read().comments.clone()
    }

    pub fn comment(&self, id: &str) -> Option<Comment> {
        self.tables
            .read()
            .comments
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    pub fn posts_by_author(&self, user_id: &str) -> Vec<Post> {
        self.tables
            .read()
            .posts
            .iter()
            .filter(|p| p.author == user_id)
            .cloned()
            .collect()
    }

    pub fn comments_by_author(&self, user_id: &str) -> Vec<Comment> {
        self.tables
            .read()
            .comments
            .iter()
            .filter(|c| c.author == user_id)
            .cloned()
            .collect()
    }

    pub fn comments_for_post(&self, post_id: &str) -> Vec<Comment> {
        self.tables
            .read()
            .comments
            .iter()
            .filter(|c| c.post == post_id)
            .cloned()
            .collect()
    }
}

fn user(id: &str, name: &str, email: &str, age: Option<u32>) -> User {
    User {
        id: id.into(),
        name: name.into(),
        email: email.into(),
        age,
    }
}

fn post(id: &str, title: &str, body: &str, published: bool, author: &str) -> Post {
    Post {
        id: id.into(),
        title: title.into(),
        body: body.into(),
        published,
        author: author.into(),
    }
}

fn comment(id: &str, text: &str, author: &str, post: &str) -> Comment {
    Comment {
        id: id.into(),
        text: text.into(),
        author: author.into(),
        post: post.into(),
    }
}

fn seed_tables() -> Tables {
    Tables {
        users: vec![
            user("1", "Andrew", "andrew@example.com", Some(27)),
            user("2", "Sarah", "sarah@example.com", None),
            user("3", "Mike", "mike@example.com", None),
            user("4", "Jacob", "jacob@example.com", None),
        ],
        posts: vec![
            post("10", "GraphQL 101", "This is how to use GraphQL...", true, "1"),
            post("11", "GraphQL 201", "This is an advanced GraphQL post...", true, "4"),
            post("12", "Programming Music", "", false, "2"),
            post("13", "Next Js", "", false, "3"),
            post("14", "React", "", true, "1"),
        ],
        comments: vec![
            comment("c1", "amazing", "3", "11"),
            comment("c2", "hala madrid", "4", "10"),
            comment("c3", "wow", "1", "11"),
            comment("c4", "outstanding", "3", "14"),
            comment("c5", "help me", "4", "11"),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_store() {
        let store = BlogStore::seeded();
        assert_eq!(store.users(None).len(), 4);
        assert_eq!(store.posts(None).len(), 5);
        assert_eq!(store.comments().len(), 5);
        assert!(BlogStore::new().users(None).is_empty());
    }

    #[test]
    fn test_user_query_is_case_insensitive() {
        let store = BlogStore::seeded();
        let found = store.users(Some("AND"));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Andrew");
    }

    #[test]
    fn test_post_query_matches_title_or_body() {
        let store = BlogStore::seeded();
        assert_eq!(store.posts(Some("graphql")).len(), 2);
        assert_eq!(store.posts(Some("advanced")).len(), 1);
        assert!(store.posts(Some("rust")).is_empty());
    }

    #[test]
    fn test_relations() {
        let store = BlogStore::seeded();
        let ids: Vec<String> = store.posts_by_author("1").into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["10", "14"]);

        assert_eq!(store.comments_for_post("11").len(), 3);
        assert_eq!(store.comments_by_author("3").len(), 2);
        assert_eq!(store.comment("c2").unwrap().post, "10");
        assert!(store.user("99").is_none());
        assert!(!store.post("12").unwrap().published);
    }
}
