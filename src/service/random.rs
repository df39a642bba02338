//! Fake service delivering a single random number after a random delay.
//!
//! Unlike the other services this one hands out the container itself: the
//! cell is returned empty and populated once the "remote" call completes,
//! the value being how long the call slept.

use crate::container::LoadableContainer;
use crate::dispatch::Dispatcher;
use crate::loading::LoadState;

const BASE_SLEEP_MS: u64 = 100;
const SLEEP_MORE_RANGE_MS: u64 = 900;

pub struct RandomNumberService {
    dispatcher: Dispatcher,
}

impl RandomNumberService {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Returns an empty container in state [`LoadState::Loading`] and
    /// schedules its fulfillment; the delivered value is the number of
    /// milliseconds the simulated call took.
    pub fn get_random_number(&self) -> LoadableContainer<u64> {
        let container = LoadableContainer::new();
        container.set_state(LoadState::Loading);

        let cell = container.clone();
        let main = self.dispatcher.main().clone();
        self.dispatcher.spawn(async move {
            let millis = BASE_SLEEP_MS + fastrand::u64(..SLEEP_MORE_RANGE_MS);
            crate::utils::async_sleep(millis).await;
            main.post(move || cell.set_value(millis));
        });

        container
    }
}
