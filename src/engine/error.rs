use rust_decimal::Decimal;
use ulid::Ulid;

use crate::model::{ReservationStatus, TransitionAction};

#[derive(Debug)]
pub enum EngineError {
    NotFound(Ulid),
    /// A unique key (room number, room-type code, payment reference) is taken.
    AlreadyExists(String),
    /// Malformed input — the operation was never attempted.
    Validation(&'static str),
    /// The room already has a claim overlapping the requested stay.
    RoomUnavailable {
        room_id: Ulid,
    },
    /// The lifecycle guard rejected the operation; state is unchanged.
    InvalidTransition {
        action: TransitionAction,
        current: ReservationStatus,
    },
    /// The payment would overdraw the customer's recomputed balance.
    PaymentExceedsBalance {
        balance: Decimal,
        amount: Decimal,
    },
    LimitExceeded(&'static str),
    WalError(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::AlreadyExists(key) => write!(f, "already exists: {key}"),
            EngineError::Validation(msg) => write!(f, "invalid input: {msg}"),
            EngineError::RoomUnavailable { room_id } => {
                write!(f, "room {room_id} not available for the selected period")
            }
            EngineError::InvalidTransition { action, current } => {
                write!(
                    f,
                    "cannot {} a {} reservation",
                    action.as_str(),
                    current.as_str()
                )
            }
            EngineError::PaymentExceedsBalance { balance, amount } => {
                write!(
                    f,
                    "payment amount {amount} exceeds outstanding balance {balance}"
                )
            }
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
