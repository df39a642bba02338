//! Fake friends API: provides a page of a user's friends as a list of user
//! ids, each of which may then be fetched from the
//! [`UserService`](super::user::UserService).
//!
//! Requests take the form of an object rather than a set of method
//! parameters, so a whole request descriptor can serve as a registry key
//! (structural equality, see [`GetFriendsRequest`]).

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::utils::{log_error_ccstr, CCStr};

const LOAD_DELAY_MS: u64 = 700;

/// A request for one page of a user's friends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GetFriendsRequest {
    pub user_id: u64,
    pub per_page: u32,
    /// 1-based page number.
    pub page: u32,
}

/// The response to a [`GetFriendsRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetFriendsResponse {
    pub friend_user_ids: Vec<u64>,
    /// 1-based index of the first friend in this page.
    pub first_index: u64,
    /// 1-based index of the last friend in this page; less than `first_index`
    /// for an empty page past the end.
    pub last_index: u64,
    pub total_friend_count: u64,
}

/// Fake friends API with the same shape as [`UserService`]: a fixed delay,
/// fabricated payloads, and a failure toggle.
///
/// The fabrication rule: user N has N friends, whose user ids are 1 through
/// N.
///
/// [`UserService`]: super::user::UserService
pub struct FriendService {
    load_delay_ms: u64,
    failing: AtomicBool,
}

impl Default for FriendService {
    fn default() -> Self {
        Self::new()
    }
}

impl FriendService {
    pub fn new() -> Self {
        Self::with_delay(LOAD_DELAY_MS)
    }

    pub fn with_delay(load_delay_ms: u64) -> Self {
        Self {
            load_delay_ms,
            failing: AtomicBool::new(false),
        }
    }

    /// When `true`, every subsequent call fails after its delay.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn get_friends(&self, request: GetFriendsRequest) -> Result<GetFriendsResponse, CCStr> {
        log::debug!("FriendService::get_friends - start ({request:?})");
        crate::utils::async_sleep(self.load_delay_ms).await;
        if self.failing.load(Ordering::SeqCst) {
            return Err(log_error_ccstr(format!(
                "FriendService::get_friends - remote call failed for user {}",
                request.user_id
            )));
        }

        let total_friend_count = request.user_id; // just base it off of the user id
        let per_page = u64::from(request.per_page);
        let first_index = per_page * u64::from(request.page).saturating_sub(1) + 1;
        let last_in_page = per_page * u64::from(request.page);

        let mut friend_user_ids = Vec::with_capacity(request.per_page as usize);
        let mut i = first_index;
        while i <= total_friend_count && i <= last_in_page {
            friend_user_ids.push(i);
            i += 1;
        }

        log::debug!("FriendService::get_friends - finished ({request:?})");
        Ok(GetFriendsResponse {
            friend_user_ids,
            first_index,
            last_index: i - 1,
            total_friend_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(user_id: u64, per_page: u32, page: u32) -> GetFriendsRequest {
        GetFriendsRequest {
            user_id,
            per_page,
            page,
        }
    }

    #[tokio::test]
    async fn full_first_page() {
        let service = FriendService::with_delay(1);
        let response = service.get_friends(request(10, 4, 1)).await.unwrap();
        assert_eq!(response.friend_user_ids, vec![1, 2, 3, 4]);
        assert_eq!(response.first_index, 1);
        assert_eq!(response.last_index, 4);
        assert_eq!(response.total_friend_count, 10);
    }

    #[tokio::test]
    async fn partial_last_page() {
        let service = FriendService::with_delay(1);
        let response = service.get_friends(request(10, 4, 3)).await.unwrap();
        assert_eq!(response.friend_user_ids, vec![9, 10]);
        assert_eq!(response.first_index, 9);
        assert_eq!(response.last_index, 10);
    }

    #[tokio::test]
    async fn page_past_the_end_is_empty() {
        let service = FriendService::with_delay(1);
        let response = service.get_friends(request(10, 4, 4)).await.unwrap();
        assert!(response.friend_user_ids.is_empty());
        assert_eq!(response.first_index, 13);
        assert_eq!(response.last_index, 12);
    }

    #[test]
    fn requests_compare_structurally() {
        assert_eq!(request(7, 10, 1), request(7, 10, 1));
        assert_ne!(request(7, 10, 1), request(7, 10, 2));
    }
}
