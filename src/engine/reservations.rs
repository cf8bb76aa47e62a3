use std::collections::HashMap;

use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::sms::NoticeOutcome;

use super::availability::{ensure_room_free, now_ms, validate_stay};
use super::{Engine, EngineError};

/// One requested room in a create/update call.
#[derive(Debug, Clone)]
pub struct RoomRequest {
    pub room_id: Ulid,
    /// Per-room stay override.
    pub stay: Option<Stay>,
    pub rate: Option<Decimal>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewReservation {
    pub id: Ulid,
    pub customer_id: Ulid,
    pub stay: Stay,
    pub guest_count: u32,
    /// Caller-supplied initial status; defaults to pending.
    pub status: Option<ReservationStatus>,
    pub notes: Option<String>,
    pub rooms: Vec<RoomRequest>,
}

/// Partial update. `notes: Some(None)` clears the notes.
#[derive(Debug, Clone, Default)]
pub struct ReservationPatch {
    pub stay: Option<Stay>,
    pub guest_count: Option<u32>,
    pub notes: Option<Option<String>>,
    pub rooms: Option<Vec<RoomRequest>>,
}

/// Primary result of a create, plus the best-effort notice metadata.
#[derive(Debug)]
pub struct CreateOutcome {
    pub reservation: Reservation,
    pub notice: NoticeOutcome,
}

/// Primary result of a lifecycle transition, plus best-effort side-effect
/// metadata. A failed notice or cleaning-task append never undoes the
/// transition itself.
#[derive(Debug)]
pub struct TransitionOutcome {
    pub reservation: Reservation,
    pub notice: Option<NoticeOutcome>,
    /// Cleaning tasks created on check-out, one per assigned room.
    pub cleaning: Vec<Ulid>,
    pub cleaning_errors: Vec<String>,
}

fn build_assignments(requests: &[RoomRequest]) -> Result<Vec<RoomAssignment>, EngineError> {
    if requests.is_empty() {
        return Err(EngineError::Validation("at least one room required"));
    }
    if requests.len() > MAX_ROOMS_PER_RESERVATION {
        return Err(EngineError::LimitExceeded("too many rooms in one reservation"));
    }
    let mut ids: Vec<Ulid> = requests.iter().map(|r| r.room_id).collect();
    ids.sort();
    if ids.windows(2).any(|w| w[0] == w[1]) {
        return Err(EngineError::Validation("duplicate room in request"));
    }
    let mut assignments = Vec::with_capacity(requests.len());
    for r in requests {
        if let Some(s) = &r.stay {
            validate_stay(s)?;
        }
        let currency = r.currency.clone().unwrap_or_else(|| "USD".into());
        if currency.len() != CURRENCY_LEN {
            return Err(EngineError::Validation("currency must be a 3-letter code"));
        }
        if r.rate.is_some_and(|rate| rate < Decimal::ZERO) {
            return Err(EngineError::Validation("rate must not be negative"));
        }
        assignments.push(RoomAssignment {
            room_id: r.room_id,
            stay: r.stay,
            rate: r.rate,
            currency,
        });
    }
    Ok(assignments)
}

impl Engine {
    /// Book one or more rooms. All-or-nothing: write locks on every
    /// requested room are taken in sorted id order, every room is checked
    /// against its effective stay, and only then is anything committed —
    /// two concurrent requests for the same room serialize on the room
    /// lock, so both can never observe "available".
    pub async fn create_reservation(
        &self,
        req: NewReservation,
    ) -> Result<CreateOutcome, EngineError> {
        if req.guest_count == 0 {
            return Err(EngineError::Validation("guest_count must be at least 1"));
        }
        validate_stay(&req.stay)?;
        if req.notes.as_deref().is_some_and(|n| n.len() > MAX_NOTES_LEN) {
            return Err(EngineError::LimitExceeded("notes too long"));
        }
        let assignments = build_assignments(&req.rooms)?;
        if self.reservations.contains_key(&req.id) {
            return Err(EngineError::AlreadyExists(req.id.to_string()));
        }

        // Lock order: customer, then rooms sorted by id.
        let customer = self
            .get_customer_arc(&req.customer_id)
            .ok_or(EngineError::NotFound(req.customer_id))?;
        let mut customer_guard = customer.write_owned().await;

        let mut room_ids: Vec<Ulid> = assignments.iter().map(|a| a.room_id).collect();
        room_ids.sort();
        let mut guards = Vec::with_capacity(room_ids.len());
        let mut guard_of = HashMap::new();
        for rid in &room_ids {
            let room = self.get_room(rid).ok_or(EngineError::NotFound(*rid))?;
            let guard = room.write_owned().await;
            if guard.claims.len() >= MAX_CLAIMS_PER_ROOM {
                return Err(EngineError::LimitExceeded("too many claims on room"));
            }
            guard_of.insert(*rid, guards.len());
            guards.push(guard);
        }

        let status = req.status.unwrap_or(ReservationStatus::Pending);
        let id = req.id;
        let reservation = Reservation {
            id,
            code: Self::booking_code(id),
            customer_id: req.customer_id,
            stay: req.stay,
            guest_count: req.guest_count,
            status,
            notes: req.notes,
            rooms: assignments,
            created_at: now_ms(),
        };

        // Phase 1: every room must be free for its effective stay.
        for assignment in &reservation.rooms {
            let guard = &guards[guard_of[&assignment.room_id]];
            ensure_room_free(guard, &reservation.effective_stay(assignment), None)?;
        }

        // Phase 2: all validated — commit.
        let event = Event::ReservationCreated {
            id,
            code: reservation.code.clone(),
            customer_id: reservation.customer_id,
            stay: reservation.stay,
            guest_count: reservation.guest_count,
            status,
            notes: reservation.notes.clone(),
            rooms: reservation.rooms.clone(),
            created_at: reservation.created_at,
        };
        self.wal_append(&event).await?;

        if status.blocks_rooms() {
            for assignment in &reservation.rooms {
                let guard = &mut guards[guard_of[&assignment.room_id]];
                guard.insert_claim(Claim {
                    reservation_id: id,
                    stay: reservation.effective_stay(assignment),
                });
            }
        }
        customer_guard.reservation_ids.push(id);
        let phone = customer_guard.phone.clone();
        self.reservations
            .insert(id, Arc::new(RwLock::new(reservation.clone())));

        self.notify.send(id, &event);
        self.notify.send(reservation.customer_id, &event);
        for rid in &room_ids {
            self.notify.send(*rid, &event);
        }
        drop(guards);
        drop(customer_guard);

        // Best-effort guest notice, after every lock is released.
        let notice = self
            .notices
            .booking_recorded(phone.as_deref(), &reservation.code, &reservation.stay)
            .await;

        Ok(CreateOutcome { reservation, notice })
    }

    /// Update booking fields. When the dates or the room set change, every
    /// affected room is re-checked with this reservation excluded, under
    /// the same sorted-lock all-or-nothing protocol as create.
    pub async fn update_reservation(
        &self,
        id: Ulid,
        patch: ReservationPatch,
    ) -> Result<Reservation, EngineError> {
        let arc = self
            .get_reservation_arc(&id)
            .ok_or(EngineError::NotFound(id))?;
        let mut res_guard = arc.write_owned().await;

        let new_stay = patch.stay.unwrap_or(res_guard.stay);
        validate_stay(&new_stay)?;
        let new_guest_count = patch.guest_count.unwrap_or(res_guard.guest_count);
        if new_guest_count == 0 {
            return Err(EngineError::Validation("guest_count must be at least 1"));
        }
        let new_notes = match patch.notes {
            Some(n) => {
                if n.as_deref().is_some_and(|s| s.len() > MAX_NOTES_LEN) {
                    return Err(EngineError::LimitExceeded("notes too long"));
                }
                n
            }
            None => res_guard.notes.clone(),
        };
        let new_assignments = match &patch.rooms {
            Some(requests) => build_assignments(requests)?,
            None => res_guard.rooms.clone(),
        };

        let dates_changed = patch.stay.is_some_and(|s| s != res_guard.stay);
        let rooms_changed = patch.rooms.is_some();

        // Lock the union of old and new rooms, sorted. Old rooms that no
        // longer exist are skipped (only possible once their claims are
        // gone); new rooms must exist.
        let old_ids: Vec<Ulid> = res_guard.rooms.iter().map(|a| a.room_id).collect();
        let new_ids: Vec<Ulid> = new_assignments.iter().map(|a| a.room_id).collect();
        let mut affected: Vec<Ulid> = old_ids.iter().chain(new_ids.iter()).copied().collect();
        affected.sort();
        affected.dedup();

        let mut guards = Vec::with_capacity(affected.len());
        let mut guard_of = HashMap::new();
        for rid in &affected {
            match self.get_room(rid) {
                Some(room) => {
                    let guard = room.write_owned().await;
                    guard_of.insert(*rid, guards.len());
                    guards.push(guard);
                }
                None if new_ids.contains(rid) => return Err(EngineError::NotFound(*rid)),
                None => {}
            }
        }

        if dates_changed || rooms_changed {
            for assignment in &new_assignments {
                let eff = assignment.stay.unwrap_or(new_stay);
                let guard = &guards[guard_of[&assignment.room_id]];
                ensure_room_free(guard, &eff, Some(id))?;
            }
        }

        let event = Event::ReservationUpdated {
            id,
            stay: new_stay,
            guest_count: new_guest_count,
            notes: new_notes.clone(),
            rooms: new_assignments.clone(),
        };
        self.wal_append(&event).await?;

        // Re-sync: drop every old claim, then re-insert from the new set.
        for rid in &old_ids {
            if let Some(&idx) = guard_of.get(rid) {
                guards[idx].remove_claims(id);
            }
        }
        res_guard.stay = new_stay;
        res_guard.guest_count = new_guest_count;
        res_guard.notes = new_notes;
        res_guard.rooms = new_assignments;
        if res_guard.status.blocks_rooms() {
            for assignment in &res_guard.rooms {
                let eff = res_guard.effective_stay(assignment);
                let guard = &mut guards[guard_of[&assignment.room_id]];
                guard.insert_claim(Claim {
                    reservation_id: id,
                    stay: eff,
                });
            }
        }

        self.notify.send(id, &event);
        for rid in &affected {
            self.notify.send(*rid, &event);
        }

        Ok(res_guard.clone())
    }

    /// pending → confirmed, with a best-effort guest notice.
    pub async fn confirm_reservation(&self, id: Ulid) -> Result<TransitionOutcome, EngineError> {
        let reservation = self.apply_transition(id, TransitionAction::Confirm).await?;
        let phone = match self.get_customer_arc(&reservation.customer_id) {
            Some(c) => c.read().await.phone.clone(),
            None => None,
        };
        let notice = self
            .notices
            .booking_confirmed(phone.as_deref(), &reservation.code, &reservation.stay)
            .await;
        Ok(TransitionOutcome {
            reservation,
            notice: Some(notice),
            cleaning: Vec::new(),
            cleaning_errors: Vec::new(),
        })
    }

    /// confirmed → checked_in.
    pub async fn check_in_reservation(&self, id: Ulid) -> Result<TransitionOutcome, EngineError> {
        let reservation = self.apply_transition(id, TransitionAction::CheckIn).await?;
        Ok(TransitionOutcome {
            reservation,
            notice: None,
            cleaning: Vec::new(),
            cleaning_errors: Vec::new(),
        })
    }

    /// checked_in → checked_out, with a checkout cleaning task per assigned
    /// room. Task-append failures are reported in the outcome, never as an
    /// error — the guest has left either way.
    pub async fn check_out_reservation(&self, id: Ulid) -> Result<TransitionOutcome, EngineError> {
        let reservation = self.apply_transition(id, TransitionAction::CheckOut).await?;

        let mut cleaning = Vec::new();
        let mut cleaning_errors = Vec::new();
        let notified_at = now_ms();
        for assignment in &reservation.rooms {
            let task_id = Ulid::new();
            let event = Event::CleaningTaskCreated {
                id: task_id,
                room_id: assignment.room_id,
                reservation_id: Some(id),
                kind: CleaningKind::Checkout,
                notified_at,
            };
            match self.wal_append(&event).await {
                Ok(()) => {
                    self.cleaning.insert(
                        task_id,
                        CleaningTask {
                            id: task_id,
                            room_id: assignment.room_id,
                            reservation_id: Some(id),
                            kind: CleaningKind::Checkout,
                            status: CleaningStatus::Pending,
                            notified_at,
                            completed_at: None,
                        },
                    );
                    self.notify.send(assignment.room_id, &event);
                    cleaning.push(task_id);
                }
                Err(e) => {
                    warn!(reservation = %id, room = %assignment.room_id, error = %e,
                        "checkout cleaning task not recorded");
                    cleaning_errors.push(format!("room {}: {e}", assignment.room_id));
                }
            }
        }

        Ok(TransitionOutcome {
            reservation,
            notice: None,
            cleaning,
            cleaning_errors,
        })
    }

    /// pending/confirmed → cancelled; the rooms' claims are released.
    pub async fn cancel_reservation(&self, id: Ulid) -> Result<TransitionOutcome, EngineError> {
        let reservation = self.apply_transition(id, TransitionAction::Cancel).await?;
        Ok(TransitionOutcome {
            reservation,
            notice: None,
            cleaning: Vec::new(),
            cleaning_errors: Vec::new(),
        })
    }

    /// Shared transition core: guard, append, apply. Cancel also releases
    /// the reservation's claims while the rooms are locked.
    async fn apply_transition(
        &self,
        id: Ulid,
        action: TransitionAction,
    ) -> Result<Reservation, EngineError> {
        let arc = self
            .get_reservation_arc(&id)
            .ok_or(EngineError::NotFound(id))?;
        let mut guard = arc.write_owned().await;

        let current = guard.status;
        let next = current
            .transition(action)
            .ok_or(EngineError::InvalidTransition { action, current })?;

        let event = Event::ReservationStatusChanged { id, status: next };
        self.wal_append(&event).await?;
        guard.status = next;

        if !next.blocks_rooms() {
            let mut room_ids: Vec<Ulid> = guard.rooms.iter().map(|a| a.room_id).collect();
            room_ids.sort();
            room_ids.dedup();
            for rid in room_ids {
                if let Some(room) = self.get_room(&rid) {
                    room.write().await.remove_claims(id);
                }
            }
        }

        self.notify.send(id, &event);
        self.notify.send(guard.customer_id, &event);
        Ok(guard.clone())
    }

    /// Explicit delete — unconstrained by the lifecycle. Releases claims
    /// and detaches the reservation from its customer.
    pub async fn delete_reservation(&self, id: Ulid) -> Result<(), EngineError> {
        let arc = self
            .get_reservation_arc(&id)
            .ok_or(EngineError::NotFound(id))?;
        // Lock order: customer before reservation.
        let customer_id = arc.read().await.customer_id;
        let customer_guard = match self.get_customer_arc(&customer_id) {
            Some(c) => Some(c.write_owned().await),
            None => None,
        };
        let res_guard = arc.write_owned().await;
        if !self.reservations.contains_key(&id) {
            return Err(EngineError::NotFound(id));
        }

        let event = Event::ReservationDeleted { id };
        self.wal_append(&event).await?;

        let mut room_ids: Vec<Ulid> = res_guard.rooms.iter().map(|a| a.room_id).collect();
        room_ids.sort();
        room_ids.dedup();
        for rid in room_ids {
            if let Some(room) = self.get_room(&rid) {
                room.write().await.remove_claims(id);
            }
        }
        if let Some(mut cguard) = customer_guard {
            cguard.reservation_ids.retain(|r| *r != id);
        }
        drop(res_guard);
        self.reservations.remove(&id);
        self.notify.send(id, &event);
        Ok(())
    }
}
