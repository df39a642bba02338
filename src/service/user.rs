//! The most basic fake remote service: it fetches and "updates" users, each
//! operation taking a couple hundred milliseconds or more as though it were
//! a remote call. Requests are performed inline on the calling task; callers
//! that need the work off their own context schedule it themselves (see
//! [`crate::dispatch`]).

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::utils::{log_error_ccstr, now_timestamp, CCStr};

const LOAD_DELAY_MS: u64 = 250;
const UPDATE_DELAY_MS: u64 = 3000;

/// Data model / response object: a request for a user returns this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    /// Just the id as a string; this service fabricates its payloads.
    pub name: CCStr,
    /// Unix timestamp of the last time this user was "modified".
    pub last_update: u64,
}

impl User {
    fn fabricate(id: u64) -> Self {
        Self {
            id,
            name: CCStr::from(id.to_string()),
            last_update: now_timestamp(),
        }
    }
}

/// Fake user API. The failure toggle makes subsequent calls fail after their
/// usual delay, which is how the error path of the fulfillment protocol gets
/// exercised.
pub struct UserService {
    load_delay_ms: u64,
    update_delay_ms: u64,
    failing: AtomicBool,
}

impl Default for UserService {
    fn default() -> Self {
        Self::new()
    }
}

impl UserService {
    pub fn new() -> Self {
        Self::with_delays(LOAD_DELAY_MS, UPDATE_DELAY_MS)
    }

    /// Custom delays, mostly so tests do not have to wait for real ones.
    pub fn with_delays(load_delay_ms: u64, update_delay_ms: u64) -> Self {
        Self {
            load_delay_ms,
            update_delay_ms,
            failing: AtomicBool::new(false),
        }
    }

    /// When `true`, every subsequent call fails after its delay.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn get_user_by_id(&self, id: u64) -> Result<User, CCStr> {
        log::debug!("UserService::get_user_by_id - start ({id})");
        crate::utils::async_sleep(self.load_delay_ms).await;
        if self.failing.load(Ordering::SeqCst) {
            return Err(log_error_ccstr(format!(
                "UserService::get_user_by_id - remote call failed for user {id}"
            )));
        }
        log::debug!("UserService::get_user_by_id - finished ({id})");
        Ok(User::fabricate(id))
    }

    /// "Modifies" the user that has the given id and returns a new `User`
    /// with an up-to-date [`User::last_update`].
    pub async fn update_user(&self, id: u64) -> Result<User, CCStr> {
        log::debug!("UserService::update_user - start ({id})");
        crate::utils::async_sleep(self.update_delay_ms).await;
        if self.failing.load(Ordering::SeqCst) {
            return Err(log_error_ccstr(format!(
                "UserService::update_user - remote call failed for user {id}"
            )));
        }
        log::debug!("UserService::update_user - finished ({id})");
        Ok(User::fabricate(id))
    }
}
