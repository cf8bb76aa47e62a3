use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::engine::Engine;
use crate::model::{date_from_ms, CleaningKind, Ms};

fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as Ms
}

/// Background task: every tick, create a periodic cleaning task for each
/// room occupied by a checked-in guest for two days or more (in two-day
/// steps), skipping rooms that already got one today.
pub async fn run_housekeeper(engine: Arc<Engine>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        let today = date_from_ms(now_ms());
        let due = engine.due_periodic_cleaning(today).await;
        for (room_id, reservation_id) in due {
            match engine
                .create_cleaning_task(Ulid::new(), room_id, Some(reservation_id), CleaningKind::Periodic)
                .await
            {
                Ok(()) => info!(%room_id, %reservation_id, "periodic cleaning task created"),
                Err(e) => {
                    // Best-effort — the next tick retries
                    warn!(%room_id, error = %e, "periodic cleaning task not recorded");
                }
            }
        }
    }
}

/// Background task: compact the WAL once enough appends have accumulated.
pub async fn run_compactor(engine: Arc<Engine>, threshold: u64) {
    let mut ticker = tokio::time::interval(Duration::from_secs(60));
    loop {
        ticker.tick().await;
        let appends = engine.wal_appends_since_compact().await;
        if appends >= threshold {
            match engine.compact_wal().await {
                Ok(()) => info!(appends, "WAL compacted"),
                Err(e) => warn!(error = %e, "WAL compaction failed"),
            }
        } else {
            debug!(appends, threshold, "compaction not due");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;
    use crate::notify::NotifyHub;
    use crate::sms::{LogOnlySms, ReservationNotices};
    use rust_decimal::Decimal;
    use std::path::PathBuf;

    fn test_wal_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("frontdesk_test_housekeeping");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let _ = std::fs::remove_file(&path);
        path
    }

    fn test_engine(name: &str) -> Arc<Engine> {
        let notify = Arc::new(NotifyHub::new());
        let notices = ReservationNotices::new(Arc::new(LogOnlySms), "Test Hotel".into());
        Arc::new(Engine::new(test_wal_path(name), notify, notices).unwrap())
    }

    async fn seed_checked_in(
        engine: &Engine,
        check_in: &str,
        check_out: &str,
    ) -> (Ulid, Ulid) {
        let floor = Ulid::new();
        let rtype = Ulid::new();
        let room = Ulid::new();
        let customer = Ulid::new();
        engine.create_floor(floor, "1".into()).await.unwrap();
        engine
            .create_room_type(rtype, "STD".into(), "Standard".into(), 2, Decimal::from(100))
            .await
            .unwrap();
        engine
            .create_room(room, "101".into(), floor, rtype, RoomStatus::Available, None)
            .await
            .unwrap();
        engine
            .create_customer(customer, "Guest".into(), None, None, None)
            .await
            .unwrap();
        let rid = Ulid::new();
        engine
            .create_reservation(crate::engine::NewReservation {
                id: rid,
                customer_id: customer,
                stay: Stay::new(check_in.parse().unwrap(), check_out.parse().unwrap()),
                guest_count: 1,
                status: Some(ReservationStatus::CheckedIn),
                notes: None,
                rooms: vec![crate::engine::RoomRequest {
                    room_id: room,
                    stay: None,
                    rate: None,
                    currency: None,
                }],
            })
            .await
            .unwrap();
        (room, rid)
    }

    #[tokio::test]
    async fn sweep_finds_long_stays_on_even_days() {
        let engine = test_engine("sweep_even_days.wal");
        let (room, rid) = seed_checked_in(&engine, "2024-01-01", "2024-01-10").await;

        // day 4 of the stay — due
        let due = engine
            .due_periodic_cleaning("2024-01-05".parse().unwrap())
            .await;
        assert_eq!(due, vec![(room, rid)]);

        // odd day — not due
        let due = engine
            .due_periodic_cleaning("2024-01-04".parse().unwrap())
            .await;
        assert!(due.is_empty());

        // too early — not due
        let due = engine
            .due_periodic_cleaning("2024-01-02".parse().unwrap())
            .await;
        assert!(due.is_empty());
    }

    #[tokio::test]
    async fn sweep_skips_rooms_already_notified_today() {
        let engine = test_engine("sweep_dedup.wal");
        // stay built around the real today so the freshly created task's
        // notified_at date matches the sweep date
        let today = date_from_ms(now_ms());
        let check_in = today - chrono::Days::new(4);
        let check_out = today + chrono::Days::new(4);
        let (room, rid) =
            seed_checked_in(&engine, &check_in.to_string(), &check_out.to_string()).await;

        let due = engine.due_periodic_cleaning(today).await;
        assert_eq!(due, vec![(room, rid)]);

        engine
            .create_cleaning_task(Ulid::new(), room, Some(rid), CleaningKind::Periodic)
            .await
            .unwrap();
        let due = engine.due_periodic_cleaning(today).await;
        assert!(due.is_empty());
    }
}
