use serde::{Deserialize, Serialize};

use super::user::{UserRecord, UserStatus};

/// Dashboard counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct UserStats {
    pub total: usize,
    pub active: usize,
    pub pending: usize,
}

impl UserStats {
    /// Single pass over the snapshot. `inactive` only counts towards `total`.
    pub fn tally<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = UserStatus>,
    {
        statuses.into_iter().fold(UserStats::default(), |mut stats, status| {
            stats.total += 1;
            match status {
                UserStatus::Active => stats.active += 1,
                UserStatus::Pending => stats.pending += 1,
                UserStatus::Inactive => {}
            }
            stats
        })
    }

    /// Counts stored status values as they are. Only the exact strings
    /// `active` and `pending` are tracked; missing or other values add to `total` only.
    pub fn tally_raw<'a, I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        statuses.into_iter().fold(UserStats::default(), |mut stats, status| {
            stats.total += 1;
            match status {
                Some("active") => stats.active += 1,
                Some("pending") => stats.pending += 1,
                _ => {}
            }
            stats
        })
    }

    pub fn from_records(records: &[UserRecord]) -> Self {
        Self::tally(records.iter().map(|r| r.status))
    }
}
