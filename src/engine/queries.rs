use chrono::NaiveDate;
use rust_decimal::Decimal;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::availability::{conflicting_claim, free_windows, validate_stay};
use super::ledger::{
    compute_balance, compute_ledger, BalanceSummary, LedgerEntry, LedgerRoom, ReservationCharge,
};
use super::{Engine, EngineError, SharedRoomState};

impl Engine {
    /// Is this room free for the candidate stay, optionally ignoring one
    /// reservation's own claims (for re-validating an edit).
    pub async fn is_room_available(
        &self,
        room_id: Ulid,
        stay: Stay,
        exclude_reservation: Option<Ulid>,
    ) -> Result<bool, EngineError> {
        validate_stay(&stay)?;
        let room = self
            .get_room(&room_id)
            .ok_or(EngineError::NotFound(room_id))?;
        let guard = room.read().await;
        Ok(conflicting_claim(&guard, &stay, exclude_reservation).is_none())
    }

    /// Rooms free for the candidate stay, filtered by type and guest
    /// capacity. Maintenance rooms never match.
    pub async fn search_available(
        &self,
        stay: Stay,
        room_type_id: Option<Ulid>,
        guest_count: Option<u32>,
    ) -> Result<Vec<RoomInfo>, EngineError> {
        validate_stay(&stay)?;

        // Snapshot the arcs before awaiting so no shard lock is held
        // across an await point.
        let arcs: Vec<SharedRoomState> = self.rooms.iter().map(|e| e.value().clone()).collect();
        let mut out = Vec::new();
        for room in arcs {
            let guard = room.read().await;
            if guard.status == RoomStatus::Maintenance {
                continue;
            }
            if room_type_id.is_some_and(|t| guard.room_type_id != t) {
                continue;
            }
            if let Some(needed) = guest_count {
                let capacity = self
                    .room_types
                    .get(&guard.room_type_id)
                    .map(|t| t.capacity)
                    .unwrap_or(0);
                if capacity < needed {
                    continue;
                }
            }
            if conflicting_claim(&guard, &stay, None).is_none() {
                out.push(RoomInfo {
                    id: guard.id,
                    number: guard.number.clone(),
                    floor_id: guard.floor_id,
                    room_type_id: guard.room_type_id,
                    status: guard.status,
                });
            }
        }
        out.sort_by(|a, b| a.number.cmp(&b.number));
        Ok(out)
    }

    /// Free sub-windows of `query` on one room. Unknown rooms yield no
    /// windows rather than an error, like any other empty SELECT.
    pub async fn room_free_windows(
        &self,
        room_id: Ulid,
        query: Stay,
    ) -> Result<Vec<Stay>, EngineError> {
        if query.check_in >= query.check_out {
            return Err(EngineError::Validation(
                "check_out_date must be after check_in_date",
            ));
        }
        if (query.check_out - query.check_in).num_days() > MAX_QUERY_WINDOW_DAYS {
            return Err(EngineError::LimitExceeded("query window too wide"));
        }
        let room = match self.get_room(&room_id) {
            Some(room) => room,
            None => return Ok(Vec::new()),
        };
        let guard = room.read().await;
        Ok(free_windows(&guard, &query))
    }

    pub async fn list_rooms(&self) -> Vec<RoomInfo> {
        let arcs: Vec<SharedRoomState> = self.rooms.iter().map(|e| e.value().clone()).collect();
        let mut out = Vec::with_capacity(arcs.len());
        for room in arcs {
            let guard = room.read().await;
            out.push(RoomInfo {
                id: guard.id,
                number: guard.number.clone(),
                floor_id: guard.floor_id,
                room_type_id: guard.room_type_id,
                status: guard.status,
            });
        }
        out.sort_by(|a, b| a.number.cmp(&b.number));
        out
    }

    pub fn list_floors(&self) -> Vec<Floor> {
        let mut out: Vec<Floor> = self.floors.iter().map(|e| e.value().clone()).collect();
        out.sort_by_key(|f| f.id);
        out
    }

    pub fn list_room_types(&self) -> Vec<RoomType> {
        let mut out: Vec<RoomType> = self.room_types.iter().map(|e| e.value().clone()).collect();
        out.sort_by_key(|t| t.id);
        out
    }

    pub async fn get_reservation(&self, id: Ulid) -> Option<Reservation> {
        let arc = self.get_reservation_arc(&id)?;
        let guard = arc.read().await;
        Some(guard.clone())
    }

    pub async fn list_reservations(&self, customer_id: Option<Ulid>) -> Vec<Reservation> {
        let arcs: Vec<_> = self
            .reservations
            .iter()
            .map(|e| e.value().clone())
            .collect();
        let mut out = Vec::new();
        for arc in arcs {
            let guard = arc.read().await;
            if customer_id.is_some_and(|c| guard.customer_id != c) {
                continue;
            }
            out.push(guard.clone());
        }
        out.sort_by_key(|r| (r.created_at, r.id));
        out
    }

    pub async fn list_payments(&self, customer_id: Option<Ulid>) -> Vec<Payment> {
        let mut out = Vec::new();
        match customer_id {
            Some(cid) => {
                if let Some(arc) = self.get_customer_arc(&cid) {
                    out.extend(arc.read().await.payments.iter().cloned());
                }
            }
            None => {
                let arcs: Vec<_> = self.customers.iter().map(|e| e.value().clone()).collect();
                for arc in arcs {
                    out.extend(arc.read().await.payments.iter().cloned());
                }
            }
        }
        out.sort_by_key(|p| (p.created_at, p.id));
        out
    }

    pub fn list_cleaning_tasks(&self, status: Option<CleaningStatus>) -> Vec<CleaningTask> {
        let mut out: Vec<CleaningTask> = self
            .cleaning
            .iter()
            .filter(|t| status.is_none_or(|s| t.status == s))
            .map(|t| t.value().clone())
            .collect();
        out.sort_by_key(|t| (t.notified_at, t.id));
        out
    }

    /// Snapshot a customer's reservations as ledger charges, resolving
    /// each room's nightly price through its type (zero when the type is
    /// gone — the one fallback policy).
    pub(super) async fn charges_for(&self, customer: &CustomerState) -> Vec<ReservationCharge> {
        let mut charges = Vec::with_capacity(customer.reservation_ids.len());
        for rid in &customer.reservation_ids {
            let Some(arc) = self.get_reservation_arc(rid) else {
                continue;
            };
            let r = arc.read().await.clone();
            let mut rooms = Vec::with_capacity(r.rooms.len());
            for assignment in &r.rooms {
                let Some(room_arc) = self.get_room(&assignment.room_id) else {
                    continue;
                };
                let room = room_arc.read().await;
                let price = self
                    .room_types
                    .get(&room.room_type_id)
                    .map(|t| t.base_price)
                    .unwrap_or(Decimal::ZERO);
                rooms.push(LedgerRoom {
                    number: room.number.clone(),
                    nightly_price: price,
                });
            }
            charges.push(ReservationCharge {
                id: r.id,
                code: r.code,
                check_in: r.stay.check_in,
                nights: r.stay.nights(),
                rooms,
            });
        }
        charges
    }

    /// `{ total_debit, total_credit, balance }`, recomputed from source
    /// records on every call.
    pub async fn customer_balance(&self, customer_id: Ulid) -> Result<BalanceSummary, EngineError> {
        let arc = self
            .get_customer_arc(&customer_id)
            .ok_or(EngineError::NotFound(customer_id))?;
        let guard = arc.read().await;
        let charges = self.charges_for(&guard).await;
        Ok(compute_balance(&charges, &guard.payments))
    }

    /// The chronological debit/credit ledger with running balance.
    pub async fn customer_ledger(
        &self,
        customer_id: Ulid,
    ) -> Result<(Vec<LedgerEntry>, Decimal), EngineError> {
        let arc = self
            .get_customer_arc(&customer_id)
            .ok_or(EngineError::NotFound(customer_id))?;
        let guard = arc.read().await;
        let charges = self.charges_for(&guard).await;
        Ok(compute_ledger(&charges, &guard.payments))
    }

    /// Rooms occupied by a checked-in reservation for two days or more
    /// (in two-day steps) that have no pending periodic task from today.
    /// The housekeeping sweep turns these into cleaning tasks.
    pub async fn due_periodic_cleaning(&self, today: NaiveDate) -> Vec<(Ulid, Ulid)> {
        let arcs: Vec<_> = self
            .reservations
            .iter()
            .map(|e| e.value().clone())
            .collect();
        let mut due = Vec::new();
        for arc in arcs {
            let guard = arc.read().await;
            if guard.status != ReservationStatus::CheckedIn {
                continue;
            }
            if !guard.stay.contains_date(today) {
                continue;
            }
            let days = (today - guard.stay.check_in).num_days();
            if days < 2 || days % 2 != 0 {
                continue;
            }
            for assignment in &guard.rooms {
                let already = self.cleaning.iter().any(|t| {
                    t.room_id == assignment.room_id
                        && t.kind == CleaningKind::Periodic
                        && t.status == CleaningStatus::Pending
                        && date_from_ms(t.notified_at) == today
                });
                if !already {
                    due.push((assignment.room_id, guard.id));
                }
            }
        }
        due
    }
}
