//! postfeed wire types.
//!
//! This crate defines the types shared between publishers, subscribers and
//! streaming clients: mutation kinds, topic keys, events, the blog resources
//! and the JSON payload frames sent to subscribers.

pub mod error;
pub mod input;
pub mod message;
pub mod resource;
pub mod topic;

pub use error::Error;
pub use input::{
    CreateCommentInput, CreatePostInput, CreateUserInput, UpdateCommentInput, UpdatePostInput,
    UpdateUserInput,
};
pub use message::{Event, MutationKind, SubscriptionPayload};
pub use resource::{Comment, Post, Resource, User};
pub use topic::Topic;
