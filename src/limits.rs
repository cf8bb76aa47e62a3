//! Hard guardrails. Requests past these are rejected with `LimitExceeded`,
//! not truncated.

pub const MAX_ROOMS: usize = 10_000;
pub const MAX_CUSTOMERS: usize = 1_000_000;
pub const MAX_ROOMS_PER_RESERVATION: usize = 50;
pub const MAX_CLAIMS_PER_ROOM: usize = 100_000;

pub const MAX_NAME_LEN: usize = 255;
pub const MAX_NOTES_LEN: usize = 4_096;
pub const MAX_REFERENCE_LEN: usize = 64;
pub const CURRENCY_LEN: usize = 3;

/// Longest bookable stay, in nights.
pub const MAX_STAY_NIGHTS: i64 = 366;

/// Widest availability/free-window query, in days.
pub const MAX_QUERY_WINDOW_DAYS: i64 = 731;
