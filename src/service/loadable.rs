//! Loadable wrappers around the fake services.
//!
//! Instead of directly returning responses, these return a
//! [`LoadableContainer`] looked up from a request-keyed [`Registry`], so
//! every caller asking for the same thing holds the same cell and a later
//! update reaches all of them. The container is handed back immediately,
//! before any data exists; the fulfillment sequence is then observable on
//! it:
//!
//!   1. state becomes [`LoadState::Loading`] (or [`LoadState::Updating`]
//!      when a value is already present and this is a refresh), set on the
//!      calling task before the work is scheduled;
//!   2. on success the value is stored and the state becomes
//!      [`LoadState::Loaded`], delivered on the main context;
//!   3. on failure the state becomes [`LoadState::Error`], the value is left
//!      untouched.
//!
//! No error detail crosses the container: service errors are logged where
//! they occur and collapse to the `Error` state. Retrying is the caller's
//! business (issue the request again).

use std::sync::Arc;

use futures_util::future::join_all;

use crate::container::LoadableContainer;
use crate::dispatch::{Dispatcher, MainContext};
use crate::loading::LoadState;
use crate::registry::Registry;

use super::friend::{FriendService, GetFriendsRequest, GetFriendsResponse};
use super::user::{User, UserService};

/// [`UserService`] wrapped to serve users through registry-deduplicated
/// containers, keyed by user id.
pub struct LoadableUserService {
    service: Arc<UserService>,
    registry: Registry<u64, User>,
    dispatcher: Dispatcher,
}

impl LoadableUserService {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self::with_service(Arc::new(UserService::new()), dispatcher)
    }

    pub fn with_service(service: Arc<UserService>, dispatcher: Dispatcher) -> Self {
        Self {
            service,
            registry: Registry::new(),
            dispatcher,
        }
    }

    /// The wrapped service, e.g. to toggle its failure mode.
    pub fn service(&self) -> &UserService {
        &self.service
    }

    /// The container registry, e.g. to inspect or sweep it.
    pub fn registry(&self) -> &Registry<u64, User> {
        &self.registry
    }

    /// Returns the container for `id` immediately and schedules its
    /// fulfillment. Repeated calls for the same id return the same container
    /// as long as someone still holds it.
    pub fn get_user(&self, id: u64) -> LoadableContainer<User> {
        let container = self.checkout(id);
        let service = Arc::clone(&self.service);
        let main = self.dispatcher.main().clone();
        let cell = container.clone();
        self.dispatcher.spawn(async move {
            let result = service.get_user_by_id(id).await;
            deliver(&main, cell, result);
        });
        container
    }

    /// Fetches several users concurrently in one background task; each
    /// container is fulfilled as its own fetch completes.
    pub fn get_users_by_ids(&self, ids: impl IntoIterator<Item = u64>) -> Vec<LoadableContainer<User>> {
        let pairs: Vec<(u64, LoadableContainer<User>)> =
            ids.into_iter().map(|id| (id, self.checkout(id))).collect();
        let containers = pairs.iter().map(|(_, c)| c.clone()).collect();

        let service = Arc::clone(&self.service);
        let main = self.dispatcher.main().clone();
        self.dispatcher.spawn(async move {
            let fetches = pairs.into_iter().map(|(id, cell)| {
                let service = Arc::clone(&service);
                let main = main.clone();
                async move {
                    let result = service.get_user_by_id(id).await;
                    deliver(&main, cell, result);
                }
            });
            join_all(fetches).await;
        });

        containers
    }

    /// "Modifies" the user and refreshes its container. Anyone already
    /// holding the container for `id` sees it go [`LoadState::Updating`]
    /// right away and receive the new user when the (slow) update completes.
    pub fn update_user(&self, id: u64) -> LoadableContainer<User> {
        let container = self.checkout(id);
        let service = Arc::clone(&self.service);
        let main = self.dispatcher.main().clone();
        let cell = container.clone();
        self.dispatcher.spawn(async move {
            let result = service.update_user(id).await;
            deliver(&main, cell, result);
        });
        container
    }

    fn checkout(&self, id: u64) -> LoadableContainer<User> {
        let container = self.registry.get_or_create(id, LoadableContainer::new);
        container.set_state(if container.has_value() {
            LoadState::Updating
        } else {
            LoadState::Loading
        });
        container
    }
}

/// [`FriendService`] wrapped the same way, keyed by the whole request
/// descriptor: two structurally-equal requests converge on one container.
pub struct LoadableFriendService {
    service: Arc<FriendService>,
    registry: Registry<GetFriendsRequest, GetFriendsResponse>,
    dispatcher: Dispatcher,
}

impl LoadableFriendService {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self::with_service(Arc::new(FriendService::new()), dispatcher)
    }

    pub fn with_service(service: Arc<FriendService>, dispatcher: Dispatcher) -> Self {
        Self {
            service,
            registry: Registry::new(),
            dispatcher,
        }
    }

    pub fn service(&self) -> &FriendService {
        &self.service
    }

    pub fn registry(&self) -> &Registry<GetFriendsRequest, GetFriendsResponse> {
        &self.registry
    }

    pub fn get_friends(&self, request: GetFriendsRequest) -> LoadableContainer<GetFriendsResponse> {
        let container = self.registry.get_or_create(request, LoadableContainer::new);
        container.set_state(if container.has_value() {
            LoadState::Updating
        } else {
            LoadState::Loading
        });

        let service = Arc::clone(&self.service);
        let main = self.dispatcher.main().clone();
        let cell = container.clone();
        self.dispatcher.spawn(async move {
            let result = service.get_friends(request).await;
            deliver(&main, cell, result);
        });
        container
    }
}

/// Final steps of the fulfillment protocol, marshaled onto the main context:
/// `set_value` (which also sets `Loaded`) on success, `set_state(Error)` on
/// failure with the value untouched.
fn deliver<V, E>(main: &MainContext, cell: LoadableContainer<V>, result: Result<V, E>)
where
    V: Send + Sync + 'static,
{
    match result {
        Ok(value) => main.post(move || cell.set_value(value)),
        Err(_) => main.post(move || cell.set_state(LoadState::Error)),
    }
}
