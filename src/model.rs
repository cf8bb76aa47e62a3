use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds — the only wall-clock type.
pub type Ms = i64;

/// Calendar date of a unix-millisecond instant (UTC).
pub fn date_from_ms(ms: Ms) -> NaiveDate {
    chrono::DateTime::from_timestamp_millis(ms)
        .unwrap_or_default()
        .date_naive()
}

/// Half-open date interval `[check_in, check_out)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stay {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl Stay {
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Self {
        debug_assert!(check_in < check_out, "Stay check_in must be before check_out");
        Self { check_in, check_out }
    }

    /// Billable nights: whole-day difference, never less than one.
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days().max(1)
    }

    /// Strict half-open overlap — stays that touch at a boundary do not conflict.
    pub fn overlaps(&self, other: &Stay) -> bool {
        self.check_in < other.check_out && other.check_in < self.check_out
    }

    pub fn contains_date(&self, d: NaiveDate) -> bool {
        self.check_in <= d && d < self.check_out
    }
}

// ── Status enumerations ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    CheckedIn,
    CheckedOut,
    Cancelled,
}

/// Lifecycle operations a caller can request on a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionAction {
    Confirm,
    CheckIn,
    CheckOut,
    Cancel,
}

impl ReservationStatus {
    /// The transition table. `None` means the move is illegal from `self`.
    pub fn transition(self, action: TransitionAction) -> Option<ReservationStatus> {
        use ReservationStatus::*;
        match (self, action) {
            (Pending, TransitionAction::Confirm) => Some(Confirmed),
            (Confirmed, TransitionAction::CheckIn) => Some(CheckedIn),
            (CheckedIn, TransitionAction::CheckOut) => Some(CheckedOut),
            (Pending | Confirmed, TransitionAction::Cancel) => Some(Cancelled),
            _ => None,
        }
    }

    /// Any non-cancelled reservation keeps its claims on rooms.
    pub fn blocks_rooms(self) -> bool {
        !matches!(self, ReservationStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::CheckedIn => "checked_in",
            ReservationStatus::CheckedOut => "checked_out",
            ReservationStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ReservationStatus::Pending),
            "confirmed" => Some(ReservationStatus::Confirmed),
            "checked_in" => Some(ReservationStatus::CheckedIn),
            "checked_out" => Some(ReservationStatus::CheckedOut),
            "cancelled" => Some(ReservationStatus::Cancelled),
            _ => None,
        }
    }
}

impl TransitionAction {
    /// The action that moves a reservation into `target`, if any.
    pub fn toward(target: ReservationStatus) -> Option<Self> {
        match target {
            ReservationStatus::Confirmed => Some(TransitionAction::Confirm),
            ReservationStatus::CheckedIn => Some(TransitionAction::CheckIn),
            ReservationStatus::CheckedOut => Some(TransitionAction::CheckOut),
            ReservationStatus::Cancelled => Some(TransitionAction::Cancel),
            ReservationStatus::Pending => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransitionAction::Confirm => "confirm",
            TransitionAction::CheckIn => "check_in",
            TransitionAction::CheckOut => "check_out",
            TransitionAction::Cancel => "cancel",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomStatus {
    Available,
    Occupied,
    Cleaning,
    Maintenance,
}

impl RoomStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RoomStatus::Available => "available",
            RoomStatus::Occupied => "occupied",
            RoomStatus::Cleaning => "cleaning",
            RoomStatus::Maintenance => "maintenance",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "available" => Some(RoomStatus::Available),
            "occupied" => Some(RoomStatus::Occupied),
            "cleaning" => Some(RoomStatus::Cleaning),
            "maintenance" => Some(RoomStatus::Maintenance),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    Cash,
    Bankak,
    Ocash,
    Fawri,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Bankak => "bankak",
            PaymentMethod::Ocash => "ocash",
            PaymentMethod::Fawri => "fawri",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cash" => Some(PaymentMethod::Cash),
            "bankak" => Some(PaymentMethod::Bankak),
            "ocash" => Some(PaymentMethod::Ocash),
            "fawri" => Some(PaymentMethod::Fawri),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "completed" => Some(PaymentStatus::Completed),
            "failed" => Some(PaymentStatus::Failed),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CleaningKind {
    Checkout,
    Periodic,
}

impl CleaningKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CleaningKind::Checkout => "checkout",
            CleaningKind::Periodic => "periodic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CleaningStatus {
    Pending,
    Completed,
    Dismissed,
}

impl CleaningStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CleaningStatus::Pending => "pending",
            CleaningStatus::Completed => "completed",
            CleaningStatus::Dismissed => "dismissed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(CleaningStatus::Pending),
            "completed" => Some(CleaningStatus::Completed),
            "dismissed" => Some(CleaningStatus::Dismissed),
            _ => None,
        }
    }
}

// ── Aggregates ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Floor {
    pub id: Ulid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomType {
    pub id: Ulid,
    pub code: String,
    pub name: String,
    /// Max guests a room of this type sleeps.
    pub capacity: u32,
    /// Nightly price used by the ledger.
    #[serde(with = "rust_decimal::serde::str")]
    pub base_price: Decimal,
}

/// A reservation's claim on one room: the join record, with optional
/// per-room overrides of the stay dates and the agreed nightly rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomAssignment {
    pub room_id: Ulid,
    /// Per-room stay override; falls back to the reservation's stay.
    pub stay: Option<Stay>,
    #[serde(with = "rust_decimal::serde::str_option")]
    pub rate: Option<Decimal>,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Ulid,
    /// Human-facing booking code, unique.
    pub code: String,
    pub customer_id: Ulid,
    pub stay: Stay,
    pub guest_count: u32,
    pub status: ReservationStatus,
    pub notes: Option<String>,
    pub rooms: Vec<RoomAssignment>,
    pub created_at: Ms,
}

impl Reservation {
    /// Effective stay of one assignment: the per-room override when set,
    /// never "no constraint" when absent.
    pub fn effective_stay(&self, assignment: &RoomAssignment) -> Stay {
        assignment.stay.unwrap_or(self.stay)
    }
}

/// One entry in a room's occupancy list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub reservation_id: Ulid,
    pub stay: Stay,
}

#[derive(Debug, Clone)]
pub struct RoomState {
    pub id: Ulid,
    pub number: String,
    pub floor_id: Ulid,
    pub room_type_id: Ulid,
    pub status: RoomStatus,
    pub notes: Option<String>,
    /// Claims held against this room, sorted by `stay.check_in`.
    pub claims: Vec<Claim>,
}

impl RoomState {
    pub fn new(
        id: Ulid,
        number: String,
        floor_id: Ulid,
        room_type_id: Ulid,
        status: RoomStatus,
        notes: Option<String>,
    ) -> Self {
        Self {
            id,
            number,
            floor_id,
            room_type_id,
            status,
            notes,
            claims: Vec::new(),
        }
    }

    /// Insert a claim maintaining sort order by check-in date.
    pub fn insert_claim(&mut self, claim: Claim) {
        let pos = self
            .claims
            .binary_search_by_key(&claim.stay.check_in, |c| c.stay.check_in)
            .unwrap_or_else(|e| e);
        self.claims.insert(pos, claim);
    }

    /// Drop every claim held by the given reservation.
    pub fn remove_claims(&mut self, reservation_id: Ulid) {
        self.claims.retain(|c| c.reservation_id != reservation_id);
    }

    /// Claims whose stay overlaps the query window. Binary search skips
    /// claims checking in at or after `query.check_out`.
    pub fn overlapping(&self, query: &Stay) -> impl Iterator<Item = &Claim> {
        let right_bound = self
            .claims
            .partition_point(|c| c.stay.check_in < query.check_out);
        self.claims[..right_bound]
            .iter()
            .filter(move |c| c.stay.check_out > query.check_in)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Ulid,
    pub customer_id: Ulid,
    pub reservation_id: Option<Ulid>,
    /// Receipt reference, unique across all payments.
    pub reference: String,
    pub method: PaymentMethod,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub notes: Option<String>,
    pub created_at: Ms,
}

#[derive(Debug, Clone)]
pub struct CustomerState {
    pub id: Ulid,
    pub name: String,
    pub phone: Option<String>,
    pub national_id: Option<String>,
    pub address: Option<String>,
    /// Reservation ids in creation order.
    pub reservation_ids: Vec<Ulid>,
    /// Payments in creation order. Owned here so the customer lock
    /// serializes balance-checked payment creation.
    pub payments: Vec<Payment>,
}

impl CustomerState {
    pub fn new(
        id: Ulid,
        name: String,
        phone: Option<String>,
        national_id: Option<String>,
        address: Option<String>,
    ) -> Self {
        Self {
            id,
            name,
            phone,
            national_id,
            address,
            reservation_ids: Vec::new(),
            payments: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningTask {
    pub id: Ulid,
    pub room_id: Ulid,
    pub reservation_id: Option<Ulid>,
    pub kind: CleaningKind,
    pub status: CleaningStatus,
    pub notified_at: Ms,
    pub completed_at: Option<Ms>,
}

// ── WAL event format ─────────────────────────────────────────────

/// The event types — flat, no nesting beyond assignment lists. This is the
/// WAL record format: every accepted mutation is one of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    FloorCreated {
        id: Ulid,
        name: String,
    },
    RoomTypeCreated {
        id: Ulid,
        code: String,
        name: String,
        capacity: u32,
        #[serde(with = "rust_decimal::serde::str")]
        base_price: Decimal,
    },
    RoomTypeUpdated {
        id: Ulid,
        name: String,
        capacity: u32,
        #[serde(with = "rust_decimal::serde::str")]
        base_price: Decimal,
    },
    RoomCreated {
        id: Ulid,
        number: String,
        floor_id: Ulid,
        room_type_id: Ulid,
        status: RoomStatus,
        notes: Option<String>,
    },
    RoomUpdated {
        id: Ulid,
        status: RoomStatus,
        notes: Option<String>,
    },
    RoomDeleted {
        id: Ulid,
    },
    CustomerCreated {
        id: Ulid,
        name: String,
        phone: Option<String>,
        national_id: Option<String>,
        address: Option<String>,
    },
    CustomerUpdated {
        id: Ulid,
        name: String,
        phone: Option<String>,
        national_id: Option<String>,
        address: Option<String>,
    },
    ReservationCreated {
        id: Ulid,
        code: String,
        customer_id: Ulid,
        stay: Stay,
        guest_count: u32,
        status: ReservationStatus,
        notes: Option<String>,
        rooms: Vec<RoomAssignment>,
        created_at: Ms,
    },
    /// Full replacement of the mutable booking fields; claims are
    /// re-derived from `rooms` on apply.
    ReservationUpdated {
        id: Ulid,
        stay: Stay,
        guest_count: u32,
        notes: Option<String>,
        rooms: Vec<RoomAssignment>,
    },
    ReservationStatusChanged {
        id: Ulid,
        status: ReservationStatus,
    },
    ReservationDeleted {
        id: Ulid,
    },
    PaymentRecorded {
        id: Ulid,
        customer_id: Ulid,
        reservation_id: Option<Ulid>,
        reference: String,
        method: PaymentMethod,
        #[serde(with = "rust_decimal::serde::str")]
        amount: Decimal,
        currency: String,
        status: PaymentStatus,
        notes: Option<String>,
        created_at: Ms,
    },
    CleaningTaskCreated {
        id: Ulid,
        room_id: Ulid,
        reservation_id: Option<Ulid>,
        kind: CleaningKind,
        notified_at: Ms,
    },
    CleaningTaskResolved {
        id: Ulid,
        status: CleaningStatus,
        completed_at: Ms,
    },
}

// ── Query result types ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub id: Ulid,
    pub number: String,
    pub floor_id: Ulid,
    pub room_type_id: Ulid,
    pub status: RoomStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn stay_nights() {
        let s = Stay::new(d("2024-01-01"), d("2024-01-05"));
        assert_eq!(s.nights(), 4);
        // same-day turnover still bills one night
        let one = Stay::new(d("2024-01-01"), d("2024-01-02"));
        assert_eq!(one.nights(), 1);
    }

    #[test]
    fn stay_overlap_strict() {
        let a = Stay::new(d("2024-01-01"), d("2024-01-05"));
        let b = Stay::new(d("2024-01-03"), d("2024-01-06"));
        let c = Stay::new(d("2024-01-05"), d("2024-01-08"));
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        // back-to-back stays share a turnover day, not a night
        assert!(!a.overlaps(&c));
        assert!(!c.overlaps(&a));
    }

    #[test]
    fn stay_contains_date_half_open() {
        let s = Stay::new(d("2024-01-01"), d("2024-01-05"));
        assert!(s.contains_date(d("2024-01-01")));
        assert!(s.contains_date(d("2024-01-04")));
        assert!(!s.contains_date(d("2024-01-05")));
    }

    #[test]
    fn transition_table() {
        use ReservationStatus::*;
        use TransitionAction::*;
        assert_eq!(Pending.transition(Confirm), Some(Confirmed));
        assert_eq!(Confirmed.transition(CheckIn), Some(CheckedIn));
        assert_eq!(CheckedIn.transition(CheckOut), Some(CheckedOut));
        assert_eq!(Pending.transition(Cancel), Some(Cancelled));
        assert_eq!(Confirmed.transition(Cancel), Some(Cancelled));
    }

    #[test]
    fn illegal_transitions_rejected() {
        use ReservationStatus::*;
        use TransitionAction::*;
        assert_eq!(Pending.transition(CheckIn), None);
        assert_eq!(Pending.transition(CheckOut), None);
        assert_eq!(Confirmed.transition(Confirm), None);
        assert_eq!(CheckedIn.transition(Cancel), None);
        assert_eq!(CheckedOut.transition(Cancel), None);
        assert_eq!(CheckedOut.transition(CheckOut), None);
        assert_eq!(Cancelled.transition(Confirm), None);
    }

    #[test]
    fn cancelled_frees_rooms() {
        assert!(ReservationStatus::Pending.blocks_rooms());
        assert!(ReservationStatus::CheckedOut.blocks_rooms());
        assert!(!ReservationStatus::Cancelled.blocks_rooms());
    }

    #[test]
    fn status_string_roundtrip() {
        for s in [
            ReservationStatus::Pending,
            ReservationStatus::Confirmed,
            ReservationStatus::CheckedIn,
            ReservationStatus::CheckedOut,
            ReservationStatus::Cancelled,
        ] {
            assert_eq!(ReservationStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(ReservationStatus::parse("paused"), None);
    }

    #[test]
    fn claim_ordering() {
        let mut room = RoomState::new(
            Ulid::new(),
            "101".into(),
            Ulid::new(),
            Ulid::new(),
            RoomStatus::Available,
            None,
        );
        room.insert_claim(Claim {
            reservation_id: Ulid::new(),
            stay: Stay::new(d("2024-03-01"), d("2024-03-04")),
        });
        room.insert_claim(Claim {
            reservation_id: Ulid::new(),
            stay: Stay::new(d("2024-01-01"), d("2024-01-04")),
        });
        room.insert_claim(Claim {
            reservation_id: Ulid::new(),
            stay: Stay::new(d("2024-02-01"), d("2024-02-04")),
        });
        assert_eq!(room.claims[0].stay.check_in, d("2024-01-01"));
        assert_eq!(room.claims[1].stay.check_in, d("2024-02-01"));
        assert_eq!(room.claims[2].stay.check_in, d("2024-03-01"));
    }

    #[test]
    fn overlapping_skips_disjoint_claims() {
        let mut room = RoomState::new(
            Ulid::new(),
            "101".into(),
            Ulid::new(),
            Ulid::new(),
            RoomStatus::Available,
            None,
        );
        for (ci, co) in [
            ("2024-01-01", "2024-01-05"),
            ("2024-02-01", "2024-02-05"),
            ("2024-03-01", "2024-03-05"),
        ] {
            room.insert_claim(Claim {
                reservation_id: Ulid::new(),
                stay: Stay::new(d(ci), d(co)),
            });
        }
        let query = Stay::new(d("2024-02-03"), d("2024-02-10"));
        let hits: Vec<_> = room.overlapping(&query).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].stay.check_in, d("2024-02-01"));
    }

    #[test]
    fn overlapping_adjacent_not_included() {
        let mut room = RoomState::new(
            Ulid::new(),
            "101".into(),
            Ulid::new(),
            Ulid::new(),
            RoomStatus::Available,
            None,
        );
        room.insert_claim(Claim {
            reservation_id: Ulid::new(),
            stay: Stay::new(d("2024-01-01"), d("2024-01-05")),
        });
        let query = Stay::new(d("2024-01-05"), d("2024-01-08"));
        assert!(room.overlapping(&query).next().is_none());
    }

    #[test]
    fn remove_claims_by_reservation() {
        let mut room = RoomState::new(
            Ulid::new(),
            "101".into(),
            Ulid::new(),
            Ulid::new(),
            RoomStatus::Available,
            None,
        );
        let keep = Ulid::new();
        let gone = Ulid::new();
        room.insert_claim(Claim {
            reservation_id: keep,
            stay: Stay::new(d("2024-01-01"), d("2024-01-05")),
        });
        room.insert_claim(Claim {
            reservation_id: gone,
            stay: Stay::new(d("2024-02-01"), d("2024-02-05")),
        });
        room.remove_claims(gone);
        assert_eq!(room.claims.len(), 1);
        assert_eq!(room.claims[0].reservation_id, keep);
    }

    #[test]
    fn effective_stay_fallback() {
        let stay = Stay::new(d("2024-01-01"), d("2024-01-05"));
        let reservation = Reservation {
            id: Ulid::new(),
            code: "RES-TEST0001".into(),
            customer_id: Ulid::new(),
            stay,
            guest_count: 2,
            status: ReservationStatus::Pending,
            notes: None,
            rooms: Vec::new(),
            created_at: 0,
        };
        let plain = RoomAssignment {
            room_id: Ulid::new(),
            stay: None,
            rate: None,
            currency: "USD".into(),
        };
        let overridden = RoomAssignment {
            room_id: Ulid::new(),
            stay: Some(Stay::new(d("2024-01-02"), d("2024-01-04"))),
            rate: None,
            currency: "USD".into(),
        };
        assert_eq!(reservation.effective_stay(&plain), stay);
        assert_eq!(
            reservation.effective_stay(&overridden).check_in,
            d("2024-01-02")
        );
    }

    #[test]
    fn event_serialization_roundtrip() {
        let event = Event::ReservationCreated {
            id: Ulid::new(),
            code: "RES-AB12CD34".into(),
            customer_id: Ulid::new(),
            stay: Stay::new(d("2024-01-01"), d("2024-01-05")),
            guest_count: 2,
            status: ReservationStatus::Pending,
            notes: Some("late arrival".into()),
            rooms: vec![RoomAssignment {
                room_id: Ulid::new(),
                stay: None,
                rate: Some(Decimal::new(12050, 2)),
                currency: "USD".into(),
            }],
            created_at: 1_700_000_000_000,
        };
        let bytes = bincode::serialize(&event).unwrap();
        let decoded: Event = bincode::deserialize(&bytes).unwrap();
        assert_eq!(event, decoded);
    }
}
