use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::showtime::{SeatBlock, Showtime};

fn check_seat_list(seat_ids: &[String]) -> Result<()> {
    if seat_ids.is_empty() {
        return Err(Error::InvalidRequest("seat list must not be empty".to_string()));
    }
    for (i, seat) in seat_ids.iter().enumerate() {
        if seat_ids[..i].contains(seat) {
            return Err(Error::InvalidRequest(format!("duplicate seat '{seat}' in request")));
        }
    }
    Ok(())
}

/// Places a time-bounded hold on every requested seat, all-or-nothing.
///
/// Expired blocks count as available and are purged as part of the write.
/// The caller (store) is responsible for committing the mutated showtime
/// atomically; this transition never partially applies.
pub fn block_seats(
    showtime: &mut Showtime,
    seat_ids: &[String],
    user_id: Uuid,
    session_id: &str,
    now: DateTime<Utc>,
    hold: Duration,
) -> Result<()> {
    check_seat_list(seat_ids)?;

    // Validate the whole request before mutating anything.
    for seat_id in seat_ids {
        showtime.row_index_for_seat(seat_id)?;
        if showtime.is_booked(seat_id) {
            return Err(Error::Conflict(format!("seat '{seat_id}' is already booked")));
        }
        if showtime.live_block_for(seat_id, now).is_some() {
            return Err(Error::Conflict(format!("seat '{seat_id}' is already blocked")));
        }
    }

    showtime.purge_expired(now);
    for seat_id in seat_ids {
        showtime.blocked_seats.push(SeatBlock {
            seat_id: seat_id.clone(),
            user_id,
            session_id: session_id.to_string(),
            blocked_at: now,
            expires_at: now + hold,
        });
    }
    showtime.refresh_counters(now);
    Ok(())
}

/// Releases the caller's holds on the requested seats.
///
/// Only the original holder (matching user AND session) may release a live
/// block. Releasing an expired or absent block is an idempotent no-op.
pub fn release_seats(
    showtime: &mut Showtime,
    seat_ids: &[String],
    user_id: Uuid,
    session_id: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    check_seat_list(seat_ids)?;

    for seat_id in seat_ids {
        showtime.row_index_for_seat(seat_id)?;
        if let Some(block) = showtime.live_block_for(seat_id, now) {
            if block.user_id != user_id || block.session_id != session_id {
                return Err(Error::Unauthorized(format!(
                    "seat '{seat_id}' is held by another session"
                )));
            }
        }
    }

    showtime.purge_expired(now);
    showtime
        .blocked_seats
        .retain(|b| !(seat_ids.contains(&b.seat_id) && b.user_id == user_id && b.session_id == session_id));
    showtime.refresh_counters(now);
    Ok(())
}
