//! Fake, sleep-based stand-ins for remote APIs, plus the loadable service
//! layer that wraps them.
//!
//! The plain services ([`UserService`](user::UserService),
//! [`FriendService`](friend::FriendService),
//! [`RandomNumberService`](random::RandomNumberService)) are
//! client-agnostic: each call sleeps "a while" as though performing a remote
//! operation, then fabricates a response. They know nothing about containers
//! or scheduling.
//!
//! The loadable services ([`LoadableUserService`](loadable::LoadableUserService),
//! [`LoadableFriendService`](loadable::LoadableFriendService)) wrap them to
//! return a [`LoadableContainer`](crate::container::LoadableContainer)
//! immediately, before any data exists, and drive the fulfillment protocol
//! from the background pool, delivering mutations on the main context.

pub mod friend;
pub mod loadable;
pub mod random;
pub mod user;

pub mod prelude {
    pub use super::friend::{FriendService, GetFriendsRequest, GetFriendsResponse};
    pub use super::loadable::{LoadableFriendService, LoadableUserService};
    pub use super::random::RandomNumberService;
    pub use super::user::{User, UserService};
}
