//! CLI walkthrough of the loadable-container pattern: the three demo
//! scenarios run back to back, printing what a presentation layer would
//! render. Run with `RUST_LOG=debug` to also see the service and container
//! plumbing.

use std::sync::Arc;

use loadable_cell::prelude::*;
use loadable_cell::utils::timestamp_to_string;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    log::info!("starting demos");
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    runtime.block_on(async {
        let (main, main_loop) = MainContext::new();
        let main_loop = tokio::spawn(main_loop.run());
        let dispatcher = Dispatcher::new(main);

        scheduler_demo(&dispatcher).await;
        loadable_demo(&dispatcher).await;
        update_demo(&dispatcher).await;

        drop(dispatcher);
        let _ = main_loop.await;
    });
    log::info!("demos finished");
}

/// Subscribes the "view" to a container, printing every change next to the
/// current snapshot. The callback holds the container weakly so watching
/// never extends its life.
fn watch<V: Clone + core::fmt::Debug + Send + Sync + 'static>(
    label: &'static str,
    container: &LoadableContainer<V>,
) -> Subscription<V> {
    let cell = container.downgrade();
    container.subscribe(move |changed| {
        if let Some(cell) = cell.upgrade() {
            let (value, state) = cell.snapshot();
            println!("[{label}] {changed:?} changed -> state={state:?} value={value:?}");
        }
    })
}

/// One-shot scheduled load: a random number arrives after a random delay,
/// the view only ever reacts to container notifications.
async fn scheduler_demo(dispatcher: &Dispatcher) {
    println!("--- scheduler demo: load a number on the background pool ---");
    let service = RandomNumberService::new(dispatcher.clone());
    let number = service.get_random_number();
    let sub = watch("number", &number);

    while number.get_state().is_some_and(|s| s.in_flight()) {
        loadable_cell::utils::async_sleep(20).await;
    }
    println!("loaded: took {:?} ms", number.get_value());
    sub.unsubscribe();
}

/// Placeholder-first list: the friends page and every friend's user are all
/// handed out as empty containers, then fill in as the fake calls complete.
async fn loadable_demo(dispatcher: &Dispatcher) {
    println!("--- loadable demo: friends list fills in as data arrives ---");
    let friends = LoadableFriendService::new(dispatcher.clone());
    let users = LoadableUserService::new(dispatcher.clone());

    let request = GetFriendsRequest {
        user_id: 5,
        per_page: 10,
        page: 1,
    };
    let page = friends.get_friends(request);
    let _page_sub = watch("friends", &page);

    while page.get_state().is_some_and(|s| s.in_flight()) {
        loadable_cell::utils::async_sleep(20).await;
    }
    let response = page.get_value().expect("page just loaded");
    println!(
        "friends {}..={} of {}",
        response.first_index, response.last_index, response.total_friend_count
    );

    let friend_cells = users.get_users_by_ids(response.friend_user_ids.iter().copied());
    for cell in &friend_cells {
        println!("placeholder row: state={:?}", cell.get_state());
    }
    while friend_cells.iter().any(|c| c.get_state().is_some_and(|s| s.in_flight())) {
        loadable_cell::utils::async_sleep(20).await;
    }
    for cell in &friend_cells {
        let user = cell.get_value().expect("all rows loaded");
        println!("row: {} (updated {})", user.name, timestamp_to_string(user.last_update));
    }
}

/// In-place update: the same container handed out earlier goes Updating and
/// then carries the fresh user, no re-request by the view.
async fn update_demo(dispatcher: &Dispatcher) {
    println!("--- update demo: refresh an already-loaded user ---");
    let users = LoadableUserService::with_service(
        // shorter delays, this demo's update would otherwise take 3 seconds
        Arc::new(UserService::with_delays(250, 800)),
        dispatcher.clone(),
    );

    let user = users.get_user(42);
    let _sub = watch("user", &user);
    while user.get_state().is_some_and(|s| s.in_flight()) {
        loadable_cell::utils::async_sleep(20).await;
    }

    let same_cell = users.update_user(42);
    assert!(same_cell == user, "registry must hand back the same container");
    while user.get_state().is_some_and(|s| s.in_flight()) {
        loadable_cell::utils::async_sleep(20).await;
    }
    let refreshed = user.get_value().expect("update completed");
    println!("refreshed: {} (updated {})", refreshed.name, timestamp_to_string(refreshed.last_update));
}
