//! Mutation executor for handling write operations.
//!
//! Every write is validated and applied under the store's write lock, and the
//! change notification is dispatched before the lock is released, so
//! subscribers see notifications in commit order.

use std::sync::Arc;

use postfeed_core::{CategoryRoute, Dispatcher, TopicRegistry, Transition};
use postfeed_proto::topic::{COMMENT, POST, USER};
use postfeed_proto::{
    Comment, CreateCommentInput, CreatePostInput, CreateUserInput, Post, Resource,
    UpdateCommentInput, UpdatePostInput, UpdateUserInput, User,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::Error;
use crate::store::BlogStore;

fn is_published(resource: &Resource) -> bool {
    resource.as_post().is_some_and(Post::is_published)
}

fn comment_post(resource: &Resource) -> Option<String> {
    resource.as_comment().map(|comment| comment.post.clone())
}

/// Build the dispatcher routes for the blog resources.
///
/// Users and comments are ungated. Posts are gated on `published`. Comments
/// additionally go out on `comment:<postId>` when `scoped_comments` is set.
pub fn blog_dispatcher(
    registry: TopicRegistry<Resource>,
    scoped_comments: bool,
) -> Dispatcher<Resource> {
    let comments = CategoryRoute::ungated(COMMENT);
    let comments = if scoped_comments {
        comments.with_scope(comment_post)
    } else {
        comments
    };

    Dispatcher::new(registry)
        .with_route(CategoryRoute::ungated(USER))
        .with_route(CategoryRoute::gated(POST, is_published))
        .with_route(comments)
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Executes mutation operations against the store and notifies subscribers.
pub struct MutationExecutor {
    store: Arc<BlogStore>,
    dispatcher: Arc<Dispatcher<Resource>>,
}

impl MutationExecutor {
    /// Create a new mutation executor.
    pub fn new(store: Arc<BlogStore>, dispatcher: Arc<Dispatcher<Resource>>) -> Self {
        Self { store, dispatcher }
    }

    pub fn store(&self) -> &Arc<BlogStore> {
        &self.store
    }

    /// Publish the change for a committed write.
    ///
    /// The write already happened, so a failed notification is logged rather
    /// than turned into a request error.
    fn dispatch(&self, category: &str, transition: Transition<Resource>) {
        if let Err(e) = self.dispatcher.notify(category, transition) {
            warn!(category, error = %e, "change notification not published");
        }
    }

    pub fn create_user(&self, input: CreateUserInput) -> Result<User, Error> {
        let mut tables = self.store.write();

        if tables.users.iter().any(|u| u.email == input.email) {
            return Err(Error::EmailTaken(input.email));
        }

        let user = User {
            id: new_id(),
            name: input.name,
            email: input.email,
            age: input.age,
        };
        tables.users.push(user.clone());
        info!(user_id = %user.id, "user created");

        self.dispatch(USER, Transition::Created(user.clone().into()));
        Ok(user)
    }

    pub fn update_user(&self, id: &str, input: UpdateUserInput) -> Result<User, Error> {
        let mut tables = self.store.write();

        let index = tables
            .users
            .iter()
            .position(|u| u.id == id)
            .ok_or_else(|| Error::not_found("user", id))?;

        if let Some(email) = &input.email {
            if tables.users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(Error::EmailTaken(email.clone()));
            }
        }

        let user = &mut tables.users[index];
        let before = user.clone();

        if let Some(email) = input.email {
            user.email = email;
        }
        if let Some(name) = input.name {
            user.name = name;
        }
        if let Some(age) = input.age {
            user.age = Some(age);
        }
        let after = user.clone();
        debug!(user_id = %id, "user updated");

        self.dispatch(
            USER,
            Transition::Updated {
                before: before.into(),
                after: after.clone().into(),
            },
        );
        Ok(after)
    }

    /// Delete a user together with their posts, the comments on those posts
    /// and the comments they wrote.
    pub fn delete_user(&self, id: &str) -> Result<User, Error> {
        let mut tables = self.store.write();

        let index = tables
            .users
            .iter()
            .position(|u| u.id == id)
            .ok_or_else(|| Error::not_found("user", id))?;
        let user = tables.users.remove(index);

        let posts = drain_where(&mut tables.posts, |p| p.author == id);
        let comments = drain_where(&mut tables.comments, |c| {
            c.author == id || posts.iter().any(|p| p.id == c.post)
        });

        info!(
            user_id = %id,
            posts_removed = posts.len(),
            comments_removed = comments.len(),
            "user deleted"
        );

        self.notify_removed(posts, comments);
        self.dispatch(USER, Transition::Deleted(user.clone().into()));
        Ok(user)
    }

    pub fn create_post(&self, input: CreatePostInput) -> Result<Post, Error> {
        let mut tables = self.store.write();

        if !tables.users.iter().any(|u| u.id == input.author) {
            return Err(Error::InvalidReference(format!(
                "user {} does not exist",
                input.author
            )));
        }

        let post = Post {
            id: new_id(),
            title: input.title,
            body: input.body,
            published: input.published,
            author: input.author,
        };
        tables.posts.push(post.clone());
        info!(post_id = %post.id, published = post.published, "post created");

        self.dispatch(POST, Transition::Created(post.clone().into()));
        Ok(post)
    }

    pub fn update_post(&self, id: &str, input: UpdatePostInput) -> Result<Post, Error> {
        let mut tables = self.store.write();

        let post = tables
            .posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::not_found("post", id))?;
        let before = post.clone();

        if let Some(title) = input.title {
            post.title = title;
        }
        if let Some(body) = input.body {
            post.body = body;
        }
        if let Some(published) = input.published {
            post.published = published;
        }
        let after = post.clone();
        debug!(
            post_id = %id,
            was_published = before.published,
            published = after.published,
            "post updated"
        );

        self.dispatch(
            POST,
            Transition::Updated {
                before: before.into(),
                after: after.clone().into(),
            },
        );
        Ok(after)
    }

    /// Delete a post and its comments.
    pub fn delete_post(&self, id: &str) -> Result<Post, Error> {
        let mut tables = self.store.write();

        let index = tables
            .posts
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| Error::not_found("post", id))?;
        let post = tables.posts.remove(index);
        let comments = drain_where(&mut tables.comments, |c| c.post == id);

        info!(post_id = %id, comments_removed = comments.len(), "post deleted");

        self.notify_removed(vec![post.clone()], comments);
        Ok(post)
    }

    /// Comment on a published post.
    pub fn create_comment(&self, input: CreateCommentInput) -> Result<Comment, Error> {
        let mut tables = self.store.write();

        let author_exists = tables.users.iter().any(|u| u.id == input.author);
        let post_visible = tables
            .posts
            .iter()
            .any(|p| p.id == input.post && p.published);
        if !author_exists || !post_visible {
            return Err(Error::InvalidReference(format!(
                "unable to find user {} or published post {}",
                input.author, input.post
            )));
        }

        let comment = Comment {
            id: new_id(),
            text: input.text,
            author: input.author,
            post: input.post,
        };
        tables.comments.push(comment.clone());
        info!(comment_id = %comment.id, post_id = %comment.post, "comment created");

        self.dispatch(COMMENT, Transition::Created(comment.clone().into()));
        Ok(comment)
    }

    pub fn update_comment(&self, id: &str, input: UpdateCommentInput) -> Result<Comment, Error> {
        let mut tables = self.store.write();

        let comment = tables
            .comments
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| Error::not_found("comment", id))?;
        let before = comment.clone();
        comment.text = input.text;
        let after = comment.clone();
        debug!(comment_id = %id, "comment updated");

        self.dispatch(
            COMMENT,
            Transition::Updated {
                before: before.into(),
                after: after.clone().into(),
            },
        );
        Ok(after)
    }

    pub fn delete_comment(&self, id: &str) -> Result<Comment, Error> {
        let mut tables = self.store.write();

        let index = tables
            .comments
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| Error::not_found("comment", id))?;
        let comment = tables.comments.remove(index);
        info!(comment_id = %id, "comment deleted");

        self.dispatch(COMMENT, Transition::Deleted(comment.clone().into()));
        Ok(comment)
    }

    /// Notify removal of cascaded comments, then posts. Callers hold the
    /// store write lock.
    fn notify_removed(&self, posts: Vec<Post>, comments: Vec<Comment>) {
        for comment in comments {
            self.dispatch(COMMENT, Transition::Deleted(comment.into()));
        }
        for post in posts {
            self.dispatch(POST, Transition::Deleted(post.into()));
        }
    }
}

/// Remove and return every element matching `predicate`, preserving order.
fn drain_where<T>(items: &mut Vec<T>, mut predicate: impl FnMut(&T) -> bool) -> Vec<T> {
    let mut removed = Vec::new();
    let mut kept = Vec::with_capacity(items.len());
    for item in items.drain(..) {
        if predicate(&item) {
            removed.push(item);
        } else {
            kept.push(item);
        }
    }
    *items = kept;
    removed
}
