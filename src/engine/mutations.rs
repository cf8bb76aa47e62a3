use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::availability::now_ms;
use super::{Engine, EngineError};

/// Registry CRUD: floors, room types, rooms, customers, cleaning tasks.
/// Reservation and payment flows live in their own modules.
impl Engine {
    pub async fn create_floor(&self, id: Ulid, name: String) -> Result<(), EngineError> {
        if name.is_empty() {
            return Err(EngineError::Validation("floor name required"));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(EngineError::LimitExceeded("floor name too long"));
        }
        if self.floors.contains_key(&id) {
            return Err(EngineError::AlreadyExists(id.to_string()));
        }

        let event = Event::FloorCreated { id, name: name.clone() };
        self.wal_append(&event).await?;
        self.floors.insert(id, Floor { id, name });
        self.notify.send(id, &event);
        Ok(())
    }

    pub async fn create_room_type(
        &self,
        id: Ulid,
        code: String,
        name: String,
        capacity: u32,
        base_price: Decimal,
    ) -> Result<(), EngineError> {
        if code.is_empty() || name.is_empty() {
            return Err(EngineError::Validation("room type code and name required"));
        }
        if code.len() > MAX_NAME_LEN || name.len() > MAX_NAME_LEN {
            return Err(EngineError::LimitExceeded("room type name too long"));
        }
        if capacity == 0 {
            return Err(EngineError::Validation("room type capacity must be at least 1"));
        }
        if base_price < Decimal::ZERO {
            return Err(EngineError::Validation("base_price must not be negative"));
        }
        if self.room_types.contains_key(&id) {
            return Err(EngineError::AlreadyExists(id.to_string()));
        }
        if self.type_codes.contains_key(&code) {
            return Err(EngineError::AlreadyExists(code));
        }

        let event = Event::RoomTypeCreated {
            id,
            code: code.clone(),
            name: name.clone(),
            capacity,
            base_price,
        };
        self.wal_append(&event).await?;
        self.room_types.insert(
            id,
            RoomType { id, code: code.clone(), name, capacity, base_price },
        );
        self.type_codes.insert(code, id);
        self.notify.send(id, &event);
        Ok(())
    }

    /// Partial update: absent fields keep their current values.
    pub async fn update_room_type(
        &self,
        id: Ulid,
        name: Option<String>,
        capacity: Option<u32>,
        base_price: Option<Decimal>,
    ) -> Result<(), EngineError> {
        let current = self
            .room_types
            .get(&id)
            .map(|rt| rt.value().clone())
            .ok_or(EngineError::NotFound(id))?;
        let name = name.unwrap_or(current.name);
        let capacity = capacity.unwrap_or(current.capacity);
        let base_price = base_price.unwrap_or(current.base_price);
        if name.is_empty() || name.len() > MAX_NAME_LEN {
            return Err(EngineError::Validation("room type name invalid"));
        }
        if capacity == 0 {
            return Err(EngineError::Validation("room type capacity must be at least 1"));
        }
        if base_price < Decimal::ZERO {
            return Err(EngineError::Validation("base_price must not be negative"));
        }

        let event = Event::RoomTypeUpdated { id, name: name.clone(), capacity, base_price };
        self.wal_append(&event).await?;
        if let Some(mut rt) = self.room_types.get_mut(&id) {
            rt.name = name;
            rt.capacity = capacity;
            rt.base_price = base_price;
        }
        self.notify.send(id, &event);
        Ok(())
    }

    pub async fn create_room(
        &self,
        id: Ulid,
        number: String,
        floor_id: Ulid,
        room_type_id: Ulid,
        status: RoomStatus,
        notes: Option<String>,
    ) -> Result<(), EngineError> {
        if number.is_empty() {
            return Err(EngineError::Validation("room number required"));
        }
        if number.len() > MAX_NAME_LEN {
            return Err(EngineError::LimitExceeded("room number too long"));
        }
        if notes.as_deref().is_some_and(|n| n.len() > MAX_NOTES_LEN) {
            return Err(EngineError::LimitExceeded("notes too long"));
        }
        if self.rooms.len() >= MAX_ROOMS {
            return Err(EngineError::LimitExceeded("too many rooms"));
        }
        if self.rooms.contains_key(&id) {
            return Err(EngineError::AlreadyExists(id.to_string()));
        }
        // Room numbers are unique across the property.
        if self.room_numbers.contains_key(&number) {
            return Err(EngineError::AlreadyExists(number));
        }
        if !self.floors.contains_key(&floor_id) {
            return Err(EngineError::NotFound(floor_id));
        }
        if !self.room_types.contains_key(&room_type_id) {
            return Err(EngineError::NotFound(room_type_id));
        }

        let event = Event::RoomCreated {
            id,
            number: number.clone(),
            floor_id,
            room_type_id,
            status,
            notes: notes.clone(),
        };
        self.wal_append(&event).await?;
        let room = RoomState::new(id, number.clone(), floor_id, room_type_id, status, notes);
        self.rooms.insert(id, Arc::new(RwLock::new(room)));
        self.room_numbers.insert(number, id);
        self.notify.send(id, &event);
        Ok(())
    }

    /// Partial update. `notes: Some(None)` clears the notes.
    pub async fn update_room(
        &self,
        id: Ulid,
        status: Option<RoomStatus>,
        notes: Option<Option<String>>,
    ) -> Result<(), EngineError> {
        if let Some(Some(n)) = &notes {
            if n.len() > MAX_NOTES_LEN {
                return Err(EngineError::LimitExceeded("notes too long"));
            }
        }
        let room = self.get_room(&id).ok_or(EngineError::NotFound(id))?;
        let mut guard = room.write().await;

        let status = status.unwrap_or(guard.status);
        let notes = notes.unwrap_or_else(|| guard.notes.clone());
        let event = Event::RoomUpdated { id, status, notes: notes.clone() };
        self.wal_append(&event).await?;
        guard.status = status;
        guard.notes = notes;
        self.notify.send(id, &event);
        Ok(())
    }

    /// Rooms with claims cannot be deleted; cancel or move the
    /// reservations first.
    pub async fn delete_room(&self, id: Ulid) -> Result<(), EngineError> {
        let room = self.get_room(&id).ok_or(EngineError::NotFound(id))?;
        let guard = room.write().await;
        if !guard.claims.is_empty() {
            return Err(EngineError::Validation("room has reservations"));
        }

        let event = Event::RoomDeleted { id };
        self.wal_append(&event).await?;
        self.room_numbers.remove(&guard.number);
        drop(guard);
        self.rooms.remove(&id);
        self.notify.send(id, &event);
        Ok(())
    }

    pub async fn create_customer(
        &self,
        id: Ulid,
        name: String,
        phone: Option<String>,
        national_id: Option<String>,
        address: Option<String>,
    ) -> Result<(), EngineError> {
        if name.is_empty() {
            return Err(EngineError::Validation("customer name required"));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(EngineError::LimitExceeded("customer name too long"));
        }
        if self.customers.len() >= MAX_CUSTOMERS {
            return Err(EngineError::LimitExceeded("too many customers"));
        }
        if self.customers.contains_key(&id) {
            return Err(EngineError::AlreadyExists(id.to_string()));
        }

        let event = Event::CustomerCreated {
            id,
            name: name.clone(),
            phone: phone.clone(),
            national_id: national_id.clone(),
            address: address.clone(),
        };
        self.wal_append(&event).await?;
        let customer = CustomerState::new(id, name, phone, national_id, address);
        self.customers.insert(id, Arc::new(RwLock::new(customer)));
        self.notify.send(id, &event);
        Ok(())
    }

    /// Partial update. `Some(None)` on an optional field clears it.
    pub async fn update_customer(
        &self,
        id: Ulid,
        name: Option<String>,
        phone: Option<Option<String>>,
        national_id: Option<Option<String>>,
        address: Option<Option<String>>,
    ) -> Result<(), EngineError> {
        let customer = self.get_customer_arc(&id).ok_or(EngineError::NotFound(id))?;
        let mut guard = customer.write().await;

        let name = name.unwrap_or_else(|| guard.name.clone());
        if name.is_empty() || name.len() > MAX_NAME_LEN {
            return Err(EngineError::Validation("customer name invalid"));
        }
        let phone = phone.unwrap_or_else(|| guard.phone.clone());
        let national_id = national_id.unwrap_or_else(|| guard.national_id.clone());
        let address = address.unwrap_or_else(|| guard.address.clone());

        let event = Event::CustomerUpdated {
            id,
            name: name.clone(),
            phone: phone.clone(),
            national_id: national_id.clone(),
            address: address.clone(),
        };
        self.wal_append(&event).await?;
        guard.name = name;
        guard.phone = phone;
        guard.national_id = national_id;
        guard.address = address;
        self.notify.send(id, &event);
        Ok(())
    }

    /// Record a cleaning task directly (housekeeping sweep and tests;
    /// checkout tasks are created by the lifecycle transition).
    pub async fn create_cleaning_task(
        &self,
        id: Ulid,
        room_id: Ulid,
        reservation_id: Option<Ulid>,
        kind: CleaningKind,
    ) -> Result<(), EngineError> {
        if !self.rooms.contains_key(&room_id) {
            return Err(EngineError::NotFound(room_id));
        }
        let notified_at = now_ms();
        let event = Event::CleaningTaskCreated { id, room_id, reservation_id, kind, notified_at };
        self.wal_append(&event).await?;
        self.cleaning.insert(
            id,
            CleaningTask {
                id,
                room_id,
                reservation_id,
                kind,
                status: CleaningStatus::Pending,
                notified_at,
                completed_at: None,
            },
        );
        self.notify.send(room_id, &event);
        Ok(())
    }

    /// Mark a pending cleaning task completed or dismissed.
    pub async fn resolve_cleaning_task(
        &self,
        id: Ulid,
        status: CleaningStatus,
    ) -> Result<(), EngineError> {
        if status == CleaningStatus::Pending {
            return Err(EngineError::Validation("cannot resolve a task back to pending"));
        }
        let room_id = match self.cleaning.get(&id) {
            Some(task) => task.room_id,
            None => return Err(EngineError::NotFound(id)),
        };

        let completed_at = now_ms();
        let event = Event::CleaningTaskResolved { id, status, completed_at };
        self.wal_append(&event).await?;
        if let Some(mut task) = self.cleaning.get_mut(&id) {
            task.status = status;
            task.completed_at = Some(completed_at);
        }
        self.notify.send(room_id, &event);
        Ok(())
    }
}
