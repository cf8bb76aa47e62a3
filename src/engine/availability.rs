use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::EngineError;

// ── Availability Algorithm ────────────────────────────────────────

pub(crate) fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as Ms
}

/// Reject malformed or absurd stays before touching any state.
pub(crate) fn validate_stay(stay: &Stay) -> Result<(), EngineError> {
    if stay.check_in >= stay.check_out {
        return Err(EngineError::Validation(
            "check_out_date must be after check_in_date",
        ));
    }
    if (stay.check_out - stay.check_in).num_days() > MAX_STAY_NIGHTS {
        return Err(EngineError::LimitExceeded("stay too long"));
    }
    Ok(())
}

/// Find a claim on `room` that overlaps `candidate`, skipping claims held
/// by `exclude` (so a reservation being edited never conflicts with
/// itself). Returns the claiming reservation's id.
///
/// Cancelled reservations never appear here: cancellation removes their
/// claims from the room, so "ignore cancelled" holds structurally.
pub fn conflicting_claim(
    room: &RoomState,
    candidate: &Stay,
    exclude: Option<Ulid>,
) -> Option<Ulid> {
    room.overlapping(candidate)
        .find(|c| Some(c.reservation_id) != exclude)
        .map(|c| c.reservation_id)
}

/// The booking-path wrapper: a conflict surfaces as `RoomUnavailable`
/// carrying the offending room id.
pub(crate) fn ensure_room_free(
    room: &RoomState,
    candidate: &Stay,
    exclude: Option<Ulid>,
) -> Result<(), EngineError> {
    match conflicting_claim(room, candidate, exclude) {
        None => Ok(()),
        Some(_) => Err(EngineError::RoomUnavailable { room_id: room.id }),
    }
}

/// Merge sorted overlapping/adjacent stays into disjoint windows.
pub fn merge_stays(sorted: &[Stay]) -> Vec<Stay> {
    let mut merged: Vec<Stay> = Vec::new();
    for &stay in sorted {
        if let Some(last) = merged.last_mut()
            && stay.check_in <= last.check_out {
                last.check_out = last.check_out.max(stay.check_out);
                continue;
            }
        merged.push(stay);
    }
    merged
}

/// Subtract `to_remove` (sorted, disjoint) from `base` (sorted, disjoint),
/// returning the remaining free windows.
pub fn subtract_stays(base: &[Stay], to_remove: &[Stay]) -> Vec<Stay> {
    let mut result = Vec::new();
    let mut ri = 0;

    for &b in base {
        let mut current_start = b.check_in;
        let current_end = b.check_out;

        while ri < to_remove.len() && to_remove[ri].check_out <= current_start {
            ri += 1;
        }

        let mut j = ri;
        while j < to_remove.len() && to_remove[j].check_in < current_end {
            let r = &to_remove[j];
            if r.check_in > current_start {
                result.push(Stay::new(current_start, r.check_in));
            }
            current_start = current_start.max(r.check_out);
            j += 1;
        }

        if current_start < current_end {
            result.push(Stay::new(current_start, current_end));
        }
    }

    result
}

/// Free sub-windows of `query` on one room: the query window minus the
/// merged claims overlapping it.
pub fn free_windows(room: &RoomState, query: &Stay) -> Vec<Stay> {
    let mut claimed: Vec<Stay> = room
        .overlapping(query)
        .map(|c| {
            Stay::new(
                c.stay.check_in.max(query.check_in),
                c.stay.check_out.min(query.check_out),
            )
        })
        .collect();
    claimed.sort_by_key(|s| s.check_in);
    let claimed = merge_stays(&claimed);
    subtract_stays(&[*query], &claimed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn stay(ci: &str, co: &str) -> Stay {
        Stay::new(d(ci), d(co))
    }

    fn room_with_claims(claims: Vec<(&str, &str)>) -> RoomState {
        let mut room = RoomState::new(
            Ulid::new(),
            "101".into(),
            Ulid::new(),
            Ulid::new(),
            RoomStatus::Available,
            None,
        );
        for (ci, co) in claims {
            room.insert_claim(Claim {
                reservation_id: Ulid::new(),
                stay: stay(ci, co),
            });
        }
        room
    }

    #[test]
    fn overlap_detected() {
        let room = room_with_claims(vec![("2024-01-01", "2024-01-05")]);
        assert!(conflicting_claim(&room, &stay("2024-01-03", "2024-01-06"), None).is_some());
        assert!(conflicting_claim(&room, &stay("2023-12-30", "2024-01-02"), None).is_some());
        // candidate fully inside the claim
        assert!(conflicting_claim(&room, &stay("2024-01-02", "2024-01-03"), None).is_some());
        // claim fully inside the candidate
        assert!(conflicting_claim(&room, &stay("2023-12-01", "2024-02-01"), None).is_some());
    }

    #[test]
    fn boundary_touch_is_free() {
        let room = room_with_claims(vec![("2024-01-01", "2024-01-05")]);
        // new stay starting the day the old one ends
        assert!(conflicting_claim(&room, &stay("2024-01-05", "2024-01-08"), None).is_none());
        // new stay ending the day the old one starts
        assert!(conflicting_claim(&room, &stay("2023-12-28", "2024-01-01"), None).is_none());
    }

    #[test]
    fn exclude_own_reservation() {
        let mut room = room_with_claims(vec![]);
        let own = Ulid::new();
        room.insert_claim(Claim {
            reservation_id: own,
            stay: stay("2024-01-01", "2024-01-05"),
        });
        // editing your own dates must not conflict with yourself
        assert!(conflicting_claim(&room, &stay("2024-01-02", "2024-01-06"), Some(own)).is_none());
        // but a second reservation's claim still counts
        let other = Ulid::new();
        room.insert_claim(Claim {
            reservation_id: other,
            stay: stay("2024-01-06", "2024-01-09"),
        });
        assert_eq!(
            conflicting_claim(&room, &stay("2024-01-02", "2024-01-07"), Some(own)),
            Some(other)
        );
    }

    #[test]
    fn ensure_room_free_carries_room_id() {
        let room = room_with_claims(vec![("2024-01-01", "2024-01-05")]);
        match ensure_room_free(&room, &stay("2024-01-03", "2024-01-06"), None) {
            Err(EngineError::RoomUnavailable { room_id }) => assert_eq!(room_id, room.id),
            other => panic!("expected RoomUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn validate_stay_rejects_inverted() {
        assert!(validate_stay(&Stay {
            check_in: d("2024-01-05"),
            check_out: d("2024-01-05"),
        })
        .is_err());
        assert!(validate_stay(&Stay {
            check_in: d("2024-01-06"),
            check_out: d("2024-01-05"),
        })
        .is_err());
        assert!(validate_stay(&stay("2024-01-05", "2024-01-06")).is_ok());
    }

    #[test]
    fn validate_stay_rejects_absurd_length() {
        assert!(matches!(
            validate_stay(&stay("2024-01-01", "2026-01-01")),
            Err(EngineError::LimitExceeded(_))
        ));
    }

    #[test]
    fn merge_adjacent_and_overlapping() {
        let merged = merge_stays(&[
            stay("2024-01-01", "2024-01-03"),
            stay("2024-01-03", "2024-01-05"),
            stay("2024-01-04", "2024-01-08"),
            stay("2024-02-01", "2024-02-02"),
        ]);
        assert_eq!(
            merged,
            vec![stay("2024-01-01", "2024-01-08"), stay("2024-02-01", "2024-02-02")]
        );
    }

    #[test]
    fn subtract_carves_holes() {
        let free = subtract_stays(
            &[stay("2024-01-01", "2024-01-31")],
            &[stay("2024-01-05", "2024-01-08"), stay("2024-01-20", "2024-01-25")],
        );
        assert_eq!(
            free,
            vec![
                stay("2024-01-01", "2024-01-05"),
                stay("2024-01-08", "2024-01-20"),
                stay("2024-01-25", "2024-01-31"),
            ]
        );
    }

    #[test]
    fn subtract_full_cover() {
        let free = subtract_stays(
            &[stay("2024-01-05", "2024-01-10")],
            &[stay("2024-01-01", "2024-01-31")],
        );
        assert!(free.is_empty());
    }

    #[test]
    fn free_windows_on_busy_room() {
        let room = room_with_claims(vec![
            ("2024-01-05", "2024-01-08"),
            ("2024-01-10", "2024-01-12"),
        ]);
        let free = free_windows(&room, &stay("2024-01-01", "2024-01-15"));
        assert_eq!(
            free,
            vec![
                stay("2024-01-01", "2024-01-05"),
                stay("2024-01-08", "2024-01-10"),
                stay("2024-01-12", "2024-01-15"),
            ]
        );
    }

    #[test]
    fn free_windows_empty_room() {
        let room = room_with_claims(vec![]);
        let query = stay("2024-01-01", "2024-01-15");
        assert_eq!(free_windows(&room, &query), vec![query]);
    }

    #[test]
    fn free_windows_clamps_to_query() {
        // claim starts before and ends after the query window
        let room = room_with_claims(vec![("2023-12-01", "2024-02-01")]);
        assert!(free_windows(&room, &stay("2024-01-01", "2024-01-15")).is_empty());
    }
}
