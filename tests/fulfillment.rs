//! End-to-end scenarios: containers fulfilled by the fake services through
//! the dispatcher, observed from the test acting as the presentation layer.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use loadable_cell::prelude::*;

/// Observer that records, per notification, which field changed and the
/// state visible at that moment. Holds the container weakly so the recorder
/// never keeps it alive.
fn record_into<V: Clone + Send + Sync + 'static>(
    container: &LoadableContainer<V>,
) -> (Arc<Mutex<Vec<(Changed, Option<LoadState>)>>>, Subscription<V>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let cell = container.downgrade();
    let sub = container.subscribe(move |changed| {
        let state = cell.upgrade().and_then(|cell| cell.get_state());
        sink.lock().unwrap().push((changed, state));
    });
    (seen, sub)
}

async fn wait_for_state<V>(container: &LoadableContainer<V>, expected: LoadState) {
    for _ in 0..500 {
        if container.get_state() == Some(expected) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("container never reached state {expected}");
}

fn test_rig() -> (Dispatcher, tokio::task::JoinHandle<()>) {
    let (main, main_loop) = MainContext::new();
    let main_loop = tokio::spawn(main_loop.run());
    (Dispatcher::new(main), main_loop)
}

#[test]
fn fulfillment_protocol_notifies_in_order() {
    // Pure container-level protocol: Loading, then the value (which also
    // sets Loaded). An observer subscribed before the sequence sees exactly
    // three notifications in that order.
    let container = LoadableContainer::new();
    let (seen, _sub) = record_into(&container);

    container.set_state(LoadState::Loading);
    container.set_value(17u32);

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            (Changed::State, Some(LoadState::Loading)),
            (Changed::Value, Some(LoadState::Loaded)),
            (Changed::State, Some(LoadState::Loaded)),
        ]
    );
    assert_eq!(container.snapshot(), (Some(17), Some(LoadState::Loaded)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn get_user_fills_the_placeholder() {
    let (dispatcher, _main_loop) = test_rig();
    let users =
        LoadableUserService::with_service(Arc::new(UserService::with_delays(10, 10)), dispatcher);

    let user = users.get_user(7);
    assert_eq!(user.get_state(), Some(LoadState::Loading));
    assert_eq!(user.get_value(), None);

    wait_for_state(&user, LoadState::Loaded).await;
    assert_eq!(user.get_value().unwrap().id, 7);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn repeated_requests_converge_on_one_container() {
    let (dispatcher, _main_loop) = test_rig();
    let users =
        LoadableUserService::with_service(Arc::new(UserService::with_delays(10, 10)), dispatcher);

    let first = users.get_user(7);
    let second = users.get_user(7);
    let other = users.get_user(8);

    assert_eq!(first, second);
    assert_ne!(first, other);
    assert_eq!(users.registry().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn update_goes_updating_then_carries_the_fresh_user() {
    let (dispatcher, _main_loop) = test_rig();
    let users =
        LoadableUserService::with_service(Arc::new(UserService::with_delays(10, 10)), dispatcher);

    let user = users.get_user(7);
    wait_for_state(&user, LoadState::Loaded).await;

    let (seen, _sub) = record_into(&user);
    let same_cell = users.update_user(7);
    assert_eq!(same_cell, user);
    assert_eq!(user.get_state(), Some(LoadState::Updating));

    wait_for_state(&user, LoadState::Loaded).await;
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            (Changed::State, Some(LoadState::Updating)),
            (Changed::Value, Some(LoadState::Loaded)),
            (Changed::State, Some(LoadState::Loaded)),
        ]
    );
    assert_eq!(user.get_value().unwrap().id, 7);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_refresh_preserves_the_stale_value() {
    let (dispatcher, _main_loop) = test_rig();
    let users =
        LoadableUserService::with_service(Arc::new(UserService::with_delays(10, 10)), dispatcher);

    let user = users.get_user(7);
    wait_for_state(&user, LoadState::Loaded).await;
    let loaded = user.get_value().unwrap();

    users.service().set_failing(true);
    let (seen, _sub) = record_into(&user);
    users.update_user(7);

    wait_for_state(&user, LoadState::Error).await;
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            (Changed::State, Some(LoadState::Updating)),
            (Changed::State, Some(LoadState::Error)),
        ]
    );
    // prior value untouched, stale-but-present
    assert_eq!(user.get_value(), Some(loaded));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_initial_load_ends_with_no_value() {
    let (dispatcher, _main_loop) = test_rig();
    let users =
        LoadableUserService::with_service(Arc::new(UserService::with_delays(10, 10)), dispatcher);
    users.service().set_failing(true);

    let user = users.get_user(7);
    wait_for_state(&user, LoadState::Error).await;
    assert_eq!(user.get_value(), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn structurally_equal_friend_requests_share_a_container() {
    let (dispatcher, _main_loop) = test_rig();
    let friends =
        LoadableFriendService::with_service(Arc::new(FriendService::with_delay(10)), dispatcher);

    let request = GetFriendsRequest {
        user_id: 5,
        per_page: 10,
        page: 1,
    };
    let page = friends.get_friends(request);
    let same_page = friends.get_friends(request);
    let next_page = friends.get_friends(GetFriendsRequest { page: 2, ..request });

    assert_eq!(page, same_page);
    assert_ne!(page, next_page);

    wait_for_state(&page, LoadState::Loaded).await;
    let response = page.get_value().unwrap();
    assert_eq!(response.friend_user_ids, vec![1, 2, 3, 4, 5]);
    assert_eq!(response.total_friend_count, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn batched_users_all_fill_in() {
    let (dispatcher, _main_loop) = test_rig();
    let users =
        LoadableUserService::with_service(Arc::new(UserService::with_delays(10, 10)), dispatcher);

    let cells = users.get_users_by_ids([1, 2, 3]);
    assert_eq!(cells.len(), 3);
    for cell in &cells {
        assert_eq!(cell.get_state(), Some(LoadState::Loading));
    }

    for (i, cell) in cells.iter().enumerate() {
        wait_for_state(cell, LoadState::Loaded).await;
        assert_eq!(cell.get_value().unwrap().id, i as u64 + 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn registry_forgets_containers_nobody_holds() {
    let (dispatcher, _main_loop) = test_rig();
    let users =
        LoadableUserService::with_service(Arc::new(UserService::with_delays(10, 10)), dispatcher);

    let user = users.get_user(7);
    wait_for_state(&user, LoadState::Loaded).await;
    assert!(users.registry().get(&7).is_some());

    drop(user);
    assert!(users.registry().get(&7).is_none());
    assert_eq!(users.registry().sweep(), 1);
    assert!(users.registry().is_empty());
}
