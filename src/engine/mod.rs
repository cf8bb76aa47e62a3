mod availability;
mod error;
mod ledger;
mod mutations;
mod payments;
mod queries;
mod reservations;

pub use availability::{conflicting_claim, free_windows, merge_stays, subtract_stays};
pub use error::EngineError;
pub use ledger::{
    compute_balance, compute_ledger, BalanceSummary, LedgerEntry, LedgerEntryKind, LedgerRoom,
    ReservationCharge,
};
pub use payments::NewPayment;
pub use reservations::{
    CreateOutcome, NewReservation, ReservationPatch, RoomRequest, TransitionOutcome,
};

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot, RwLock};
use ulid::Ulid;

use crate::model::*;
use crate::notify::NotifyHub;
use crate::sms::ReservationNotices;
use crate::wal::Wal;

pub type SharedRoomState = Arc<RwLock<RoomState>>;
pub type SharedReservation = Arc<RwLock<Reservation>>;
pub type SharedCustomer = Arc<RwLock<CustomerState>>;

// ── Group-commit WAL channel ─────────────────────────────

pub(super) enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task that owns the WAL and batches appends for group commit.
/// 1. Block until the first Append arrives.
/// 2. Buffer it (no fsync).
/// 3. Drain all immediately available Appends (the batch window).
/// 4. Single flush_sync for the whole batch.
/// 5. Respond Ok to all senders.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WalCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];

                // Drain all immediately available appends
                loop {
                    match rx.try_recv() {
                        Ok(WalCommand::Append { event, response }) => {
                            batch.push((event, response));
                        }
                        Ok(other) => {
                            // Flush current batch first, then handle the non-append command
                            metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE)
                                .record(batch.len() as f64);
                            let flush_start = std::time::Instant::now();
                            let result = flush_batch(&mut wal, &mut batch);
                            metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
                                .record(flush_start.elapsed().as_secs_f64());
                            respond_batch(&mut batch, &result);
                            handle_non_append(&mut wal, other);
                            break;
                        }
                        Err(_) => break, // channel empty — flush batch
                    }
                }

                if !batch.is_empty() {
                    metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE)
                        .record(batch.len() as f64);
                    let flush_start = std::time::Instant::now();
                    let result = flush_batch(&mut wal, &mut batch);
                    metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
                        .record(flush_start.elapsed().as_secs_f64());
                    respond_batch(&mut batch, &result);
                }
            }
            other => handle_non_append(&mut wal, other),
        }
    }
}

fn flush_batch(
    wal: &mut Wal,
    batch: &mut [(Event, oneshot::Sender<io::Result<()>>)],
) -> io::Result<()> {
    let mut append_err: Option<io::Error> = None;
    for (event, _) in batch.iter() {
        if let Err(e) = wal.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // Always flush — even on append error — so partially buffered bytes
    // don't leak into the next batch (callers were told this batch failed).
    let flush_err = wal.flush_sync().err();
    if let Some(e) = append_err {
        return Err(e);
    }
    if let Some(e) = flush_err {
        return Err(e);
    }
    Ok(())
}

fn respond_batch(batch: &mut Vec<(Event, oneshot::Sender<io::Result<()>>)>, result: &io::Result<()>) {
    for (_, tx) in batch.drain(..) {
        let r = match result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let result = Wal::write_compact_file(wal.path(), &events)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { .. } => unreachable!(),
    }
}

// ── Engine ───────────────────────────────────────────────

pub struct Engine {
    pub rooms: DashMap<Ulid, SharedRoomState>,
    pub reservations: DashMap<Ulid, SharedReservation>,
    pub customers: DashMap<Ulid, SharedCustomer>,
    pub room_types: DashMap<Ulid, RoomType>,
    pub floors: DashMap<Ulid, Floor>,
    pub cleaning: DashMap<Ulid, CleaningTask>,
    /// Unique-key indexes.
    pub(super) room_numbers: DashMap<String, Ulid>,
    pub(super) type_codes: DashMap<String, Ulid>,
    pub(super) payment_refs: DashMap<String, Ulid>,
    pub(super) wal_tx: mpsc::Sender<WalCommand>,
    pub notify: Arc<NotifyHub>,
    pub(super) notices: ReservationNotices,
}

impl Engine {
    pub fn new(
        wal_path: PathBuf,
        notify: Arc<NotifyHub>,
        notices: ReservationNotices,
    ) -> io::Result<Self> {
        let events = Wal::replay(&wal_path)?;
        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let engine = Self {
            rooms: DashMap::new(),
            reservations: DashMap::new(),
            customers: DashMap::new(),
            room_types: DashMap::new(),
            floors: DashMap::new(),
            cleaning: DashMap::new(),
            room_numbers: DashMap::new(),
            type_codes: DashMap::new(),
            payment_refs: DashMap::new(),
            wal_tx,
            notify,
            notices,
        };

        // Replay — we're the sole owner of every Arc here, so try_write
        // always succeeds instantly. Never use blocking_write here because
        // this runs inside an async context.
        for event in &events {
            engine.apply_replayed(event);
        }

        Ok(engine)
    }

    /// Apply one replayed event to the in-memory state. Only used during
    /// startup replay; live mutation paths apply their events inline under
    /// the locks they already hold.
    fn apply_replayed(&self, event: &Event) {
        match event {
            Event::FloorCreated { id, name } => {
                self.floors.insert(*id, Floor { id: *id, name: name.clone() });
            }
            Event::RoomTypeCreated { id, code, name, capacity, base_price } => {
                self.room_types.insert(
                    *id,
                    RoomType {
                        id: *id,
                        code: code.clone(),
                        name: name.clone(),
                        capacity: *capacity,
                        base_price: *base_price,
                    },
                );
                self.type_codes.insert(code.clone(), *id);
            }
            Event::RoomTypeUpdated { id, name, capacity, base_price } => {
                if let Some(mut rt) = self.room_types.get_mut(id) {
                    rt.name = name.clone();
                    rt.capacity = *capacity;
                    rt.base_price = *base_price;
                }
            }
            Event::RoomCreated { id, number, floor_id, room_type_id, status, notes } => {
                let room = RoomState::new(
                    *id,
                    number.clone(),
                    *floor_id,
                    *room_type_id,
                    *status,
                    notes.clone(),
                );
                self.rooms.insert(*id, Arc::new(RwLock::new(room)));
                self.room_numbers.insert(number.clone(), *id);
            }
            Event::RoomUpdated { id, status, notes } => {
                if let Some(entry) = self.rooms.get(id) {
                    let room = entry.value().clone();
                    let mut guard = room.try_write().expect("replay: uncontended write");
                    guard.status = *status;
                    guard.notes = notes.clone();
                }
            }
            Event::RoomDeleted { id } => {
                if let Some((_, room)) = self.rooms.remove(id) {
                    let guard = room.try_read().expect("replay: uncontended read");
                    self.room_numbers.remove(&guard.number);
                }
            }
            Event::CustomerCreated { id, name, phone, national_id, address } => {
                let customer = CustomerState::new(
                    *id,
                    name.clone(),
                    phone.clone(),
                    national_id.clone(),
                    address.clone(),
                );
                self.customers.insert(*id, Arc::new(RwLock::new(customer)));
            }
            Event::CustomerUpdated { id, name, phone, national_id, address } => {
                if let Some(entry) = self.customers.get(id) {
                    let customer = entry.value().clone();
                    let mut guard = customer.try_write().expect("replay: uncontended write");
                    guard.name = name.clone();
                    guard.phone = phone.clone();
                    guard.national_id = national_id.clone();
                    guard.address = address.clone();
                }
            }
            Event::ReservationCreated {
                id,
                code,
                customer_id,
                stay,
                guest_count,
                status,
                notes,
                rooms,
                created_at,
            } => {
                let reservation = Reservation {
                    id: *id,
                    code: code.clone(),
                    customer_id: *customer_id,
                    stay: *stay,
                    guest_count: *guest_count,
                    status: *status,
                    notes: notes.clone(),
                    rooms: rooms.clone(),
                    created_at: *created_at,
                };
                if status.blocks_rooms() {
                    for assignment in &reservation.rooms {
                        self.replay_insert_claim(
                            assignment.room_id,
                            *id,
                            reservation.effective_stay(assignment),
                        );
                    }
                }
                if let Some(entry) = self.customers.get(customer_id) {
                    let customer = entry.value().clone();
                    let mut guard = customer.try_write().expect("replay: uncontended write");
                    guard.reservation_ids.push(*id);
                }
                self.reservations.insert(*id, Arc::new(RwLock::new(reservation)));
            }
            Event::ReservationUpdated { id, stay, guest_count, notes, rooms } => {
                if let Some(entry) = self.reservations.get(id) {
                    let reservation = entry.value().clone();
                    let mut guard = reservation.try_write().expect("replay: uncontended write");
                    for assignment in &guard.rooms {
                        self.replay_remove_claims(assignment.room_id, *id);
                    }
                    guard.stay = *stay;
                    guard.guest_count = *guest_count;
                    guard.notes = notes.clone();
                    guard.rooms = rooms.clone();
                    if guard.status.blocks_rooms() {
                        for assignment in &guard.rooms {
                            self.replay_insert_claim(
                                assignment.room_id,
                                *id,
                                guard.effective_stay(assignment),
                            );
                        }
                    }
                }
            }
            Event::ReservationStatusChanged { id, status } => {
                if let Some(entry) = self.reservations.get(id) {
                    let reservation = entry.value().clone();
                    let mut guard = reservation.try_write().expect("replay: uncontended write");
                    guard.status = *status;
                    if !status.blocks_rooms() {
                        for assignment in &guard.rooms {
                            self.replay_remove_claims(assignment.room_id, *id);
                        }
                    }
                }
            }
            Event::ReservationDeleted { id } => {
                if let Some((_, reservation)) = self.reservations.remove(id) {
                    let guard = reservation.try_read().expect("replay: uncontended read");
                    for assignment in &guard.rooms {
                        self.replay_remove_claims(assignment.room_id, *id);
                    }
                    if let Some(entry) = self.customers.get(&guard.customer_id) {
                        let customer = entry.value().clone();
                        let mut cguard = customer.try_write().expect("replay: uncontended write");
                        cguard.reservation_ids.retain(|r| r != id);
                    }
                }
            }
            Event::PaymentRecorded {
                id,
                customer_id,
                reservation_id,
                reference,
                method,
                amount,
                currency,
                status,
                notes,
                created_at,
            } => {
                if let Some(entry) = self.customers.get(customer_id) {
                    let customer = entry.value().clone();
                    let mut guard = customer.try_write().expect("replay: uncontended write");
                    guard.payments.push(Payment {
                        id: *id,
                        customer_id: *customer_id,
                        reservation_id: *reservation_id,
                        reference: reference.clone(),
                        method: *method,
                        amount: *amount,
                        currency: currency.clone(),
                        status: *status,
                        notes: notes.clone(),
                        created_at: *created_at,
                    });
                    self.payment_refs.insert(reference.clone(), *id);
                }
            }
            Event::CleaningTaskCreated { id, room_id, reservation_id, kind, notified_at } => {
                self.cleaning.insert(
                    *id,
                    CleaningTask {
                        id: *id,
                        room_id: *room_id,
                        reservation_id: *reservation_id,
                        kind: *kind,
                        status: CleaningStatus::Pending,
                        notified_at: *notified_at,
                        completed_at: None,
                    },
                );
            }
            Event::CleaningTaskResolved { id, status, completed_at } => {
                if let Some(mut task) = self.cleaning.get_mut(id) {
                    task.status = *status;
                    task.completed_at = Some(*completed_at);
                }
            }
        }
    }

    fn replay_insert_claim(&self, room_id: Ulid, reservation_id: Ulid, stay: Stay) {
        if let Some(entry) = self.rooms.get(&room_id) {
            let room = entry.value().clone();
            let mut guard = room.try_write().expect("replay: uncontended write");
            guard.insert_claim(Claim { reservation_id, stay });
        }
    }

    fn replay_remove_claims(&self, room_id: Ulid, reservation_id: Ulid) {
        if let Some(entry) = self.rooms.get(&room_id) {
            let room = entry.value().clone();
            let mut guard = room.try_write().expect("replay: uncontended write");
            guard.remove_claims(reservation_id);
        }
    }

    /// Write event to WAL via the background group-commit writer.
    pub(super) async fn wal_append(&self, event: &Event) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    pub fn get_room(&self, id: &Ulid) -> Option<SharedRoomState> {
        self.rooms.get(id).map(|e| e.value().clone())
    }

    pub fn get_reservation_arc(&self, id: &Ulid) -> Option<SharedReservation> {
        self.reservations.get(id).map(|e| e.value().clone())
    }

    pub fn get_customer_arc(&self, id: &Ulid) -> Option<SharedCustomer> {
        self.customers.get(id).map(|e| e.value().clone())
    }

    /// Human-facing booking code derived from the id's random tail.
    pub(super) fn booking_code(id: Ulid) -> String {
        let s = id.to_string();
        format!("RES-{}", &s[s.len() - 8..])
    }

    /// Receipt reference, `PAY-XXXXXXXX`.
    pub(super) fn payment_reference(id: Ulid) -> String {
        let s = id.to_string();
        format!("PAY-{}", &s[s.len() - 8..])
    }

    /// Compact the WAL by rewriting it with only the events needed to
    /// recreate the current state.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        let mut events = Vec::new();

        for entry in self.floors.iter() {
            events.push(Event::FloorCreated {
                id: entry.id,
                name: entry.name.clone(),
            });
        }
        for entry in self.room_types.iter() {
            events.push(Event::RoomTypeCreated {
                id: entry.id,
                code: entry.code.clone(),
                name: entry.name.clone(),
                capacity: entry.capacity,
                base_price: entry.base_price,
            });
        }
        for entry in self.rooms.iter() {
            let room = entry.value().clone();
            let guard = room.try_read().expect("compact: uncontended read");
            events.push(Event::RoomCreated {
                id: guard.id,
                number: guard.number.clone(),
                floor_id: guard.floor_id,
                room_type_id: guard.room_type_id,
                status: guard.status,
                notes: guard.notes.clone(),
            });
        }
        for entry in self.customers.iter() {
            let customer = entry.value().clone();
            let guard = customer.try_read().expect("compact: uncontended read");
            events.push(Event::CustomerCreated {
                id: guard.id,
                name: guard.name.clone(),
                phone: guard.phone.clone(),
                national_id: guard.national_id.clone(),
                address: guard.address.clone(),
            });
        }
        // Reservations sorted by creation order so replayed customer
        // reservation lists keep their ledger tie-break order.
        let mut reservations: Vec<Reservation> = self
            .reservations
            .iter()
            .map(|entry| {
                let r = entry.value().clone();
                let guard = r.try_read().expect("compact: uncontended read");
                guard.clone()
            })
            .collect();
        reservations.sort_by_key(|r| r.id);
        for r in reservations {
            events.push(Event::ReservationCreated {
                id: r.id,
                code: r.code,
                customer_id: r.customer_id,
                stay: r.stay,
                guest_count: r.guest_count,
                status: r.status,
                notes: r.notes,
                rooms: r.rooms,
                created_at: r.created_at,
            });
        }
        for entry in self.customers.iter() {
            let customer = entry.value().clone();
            let guard = customer.try_read().expect("compact: uncontended read");
            for p in &guard.payments {
                events.push(Event::PaymentRecorded {
                    id: p.id,
                    customer_id: guard.id,
                    reservation_id: p.reservation_id,
                    reference: p.reference.clone(),
                    method: p.method,
                    amount: p.amount,
                    currency: p.currency.clone(),
                    status: p.status,
                    notes: p.notes.clone(),
                    created_at: p.created_at,
                });
            }
        }
        for task in self.cleaning.iter() {
            events.push(Event::CleaningTaskCreated {
                id: task.id,
                room_id: task.room_id,
                reservation_id: task.reservation_id,
                kind: task.kind,
                notified_at: task.notified_at,
            });
            if task.status != CleaningStatus::Pending {
                events.push(Event::CleaningTaskResolved {
                    id: task.id,
                    status: task.status,
                    completed_at: task.completed_at.unwrap_or(task.notified_at),
                });
            }
        }

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact { events, response: tx })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
