//! License seat policy.

use serde::{Deserialize, Serialize};

/// Caps the number of seat-holding accounts.
///
/// `fail_open` lets provisioning continue past the limit (the overage is
/// reconciled with the vendor later).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeatPolicy {
    /// `None` means unlimited.
    #[serde(default)]
    pub user_limit: Option<usize>,
    #[serde(default)]
    pub fail_open: bool,
}

impl SeatPolicy {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn limited(user_limit: usize) -> Self {
        Self {
            user_limit: Some(user_limit),
            fail_open: false,
        }
    }

    /// Whether another account may take a seat given `active_users`.
    pub fn seats_available(&self, active_users: usize) -> bool {
        self.user_limit.is_none_or(|limit| active_users < limit)
    }
}
