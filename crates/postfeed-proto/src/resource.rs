//! Blog resources.

use serde::{Deserialize, Serialize};

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
}

/// A post. Only published posts are visible to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub body: String,
    pub published: bool,
    /// Author user ID.
    pub author: String,
}

impl Post {
    /// Whether the post is visible to readers and subscribers.
    pub fn is_published(&self) -> bool {
        self.published
    }
}

/// A comment on a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub text: String,
    /// Author user ID.
    pub author: String,
    /// Post ID the comment belongs to.
    pub post: String,
}

/// Any resource that can travel in a change event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Resource {
    User(User),
    Post(Post),
    Comment(Comment),
}

impl Resource {
    /// ID of the wrapped resource.
    pub fn id(&self) -> &str {
        match self {
            Resource::User(user) => &user.id,
            Resource::Post(post) => &post.id,
            Resource::Comment(comment) => &comment.id,
        }
    }

    pub fn as_post(&self) -> Option<&Post> {
        match self {
            Resource::Post(post) => Some(post),
            _ => None,
        }
    }

    pub fn as_comment(&self) -> Option<&Comment> {
        match self {
            Resource::Comment(comment) => Some(comment),
            _ => None,
        }
    }
}

impl From<User> for Resource {
    fn from(value: User) -> Self {
        Resource::User(value)
    }
}

impl From<Post> for Resource {
    fn from(value: Post) -> Self {
        Resource::Post(value)
    }
}

impl From<Comment> for Resource {
    fn from(value: Comment) -> Self {
        Resource::Comment(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_serializes_untagged() {
        let post = Post {
            id: "10".into(),
            title: "GraphQL 101".into(),
            body: String::new(),
            published: true,
            author: "1".into(),
        };
        let value = serde_json::to_value(Resource::from(post.clone())).unwrap();
        assert_eq!(value["title"], "GraphQL 101");
        assert_eq!(value["published"], true);

        let resource = Resource::from(post);
        assert_eq!(resource.id(), "10");
        assert!(resource.as_post().is_some());
        assert!(resource.as_comment().is_none());
    }

    #[test]
    fn test_user_age_is_optional() {
        let user: User =
            serde_json::from_str(r#"{"id":"2","name":"Sarah","email":"sarah@example.com"}"#)
                .unwrap();
        assert!(user.age.is_none());
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("age"));
    }
}
