//! # loadable-cell
//!
//! A small framework for handing out *loadable observable containers*:
//! mutable cells given to a consumer before their data has arrived, later
//! populated by whatever fulfills the request, with change notifications
//! propagating to every subscriber. The consumer renders a placeholder while
//! the cell is loading and reacts to the fill-in without re-requesting or
//! re-subscribing.
//!
//! ## Core concepts
//!
//! - [`LoadableContainer`](container::LoadableContainer): the observable
//!   cell, an optional value plus an optional [`LoadState`](loading::LoadState)
//!   tag, mutable from one task and observed from another
//! - [`Registry`](registry::Registry): non-owning, request-keyed
//!   de-duplication so repeated or concurrent requests for the same logical
//!   key converge on one container
//! - [`Dispatcher`](dispatch::Dispatcher) / [`MainContext`](dispatch::MainContext):
//!   producer work on a background pool, completion delivered on the one
//!   context the presentation layer lives on
//! - [`service`]: fake, sleep-based remote APIs and their loadable wrappers,
//!   which drive the whole fulfillment sequence end to end
//!
//! ## Example usage
//!
//! ```no_run
//! use loadable_cell::prelude::*;
//!
//! # async fn demo() {
//! let (main, main_loop) = MainContext::new();
//! tokio::spawn(main_loop.run());
//!
//! let users = LoadableUserService::new(Dispatcher::new(main));
//! let user = users.get_user(42);
//!
//! // Handed out before the data exists: render a placeholder now...
//! assert_eq!(user.get_state(), Some(LoadState::Loading));
//!
//! // ...and react when it fills in.
//! let sub = user.subscribe(|changed| println!("user field changed: {changed:?}"));
//! # }
//! ```

pub mod container;
pub mod dispatch;
pub mod loading;
pub mod registry;
pub mod service;
pub mod utils;

/// Re-exports of the types needed to work with loadable containers.
pub mod prelude {
    pub use crate::container::{Changed, LoadableContainer, Subscription, WeakContainer};
    pub use crate::dispatch::{Dispatcher, MainContext, MainLoop};
    pub use crate::loading::LoadState;
    pub use crate::registry::Registry;
    pub use crate::service::prelude::*;
    pub use crate::utils::CCStr;
}
