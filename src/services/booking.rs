use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::models::showtime::Showtime;

/// Promotes the requested seats into the permanent booked set, all-or-nothing.
///
/// Finalization is authorized by an upstream payment confirmation, so the
/// original block holder is not re-verified here: a validly blocked seat (any
/// holder) and a plain available seat are both bookable. The transition is
/// irreversible through this interface.
pub fn book_seats(showtime: &mut Showtime, seat_ids: &[String], now: DateTime<Utc>) -> Result<()> {
    if seat_ids.is_empty() {
        return Err(Error::InvalidRequest("seat list must not be empty".to_string()));
    }
    for (i, seat) in seat_ids.iter().enumerate() {
        if seat_ids[..i].contains(seat) {
            return Err(Error::InvalidRequest(format!("duplicate seat '{seat}' in request")));
        }
    }

    // No partial commit: reject the whole request before touching state.
    for seat_id in seat_ids {
        showtime.row_index_for_seat(seat_id)?;
        if showtime.is_booked(seat_id) {
            return Err(Error::Conflict(format!("seat '{seat_id}' is already booked")));
        }
    }

    showtime.purge_expired(now);
    for seat_id in seat_ids {
        // Any remaining block on this seat (live or not) is consumed.
        showtime.blocked_seats.retain(|b| &b.seat_id != seat_id);
        let row = showtime.row_index_for_seat(seat_id)?;
        showtime.row_pricing[row].booked_seats.push(seat_id.clone());
        showtime.booked_seats.push(seat_id.clone());
    }
    showtime.refresh_counters(now);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::showtime::tests::sample_showtime;
    use crate::services::blocking::block_seats;
    use chrono::Duration;
    use uuid::Uuid;

    fn seats(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn booking_a_blocked_seat_consumes_the_block() {
        let mut st = sample_showtime();
        let now = Utc::now();
        let user = Uuid::new_v4();
        block_seats(&mut st, &seats(&["A1"]), user, "sess-1", now, Duration::minutes(10)).unwrap();

        book_seats(&mut st, &seats(&["A1"]), now).unwrap();

        assert!(st.blocked_seats.is_empty());
        assert_eq!(st.booked_seats, vec!["A1".to_string()]);
        assert_eq!(st.row_pricing[0].booked_seats, vec!["A1".to_string()]);
        assert_eq!(st.available_seats, 14);
    }

    #[test]
    fn booking_an_unblocked_seat_is_allowed() {
        // Payment confirmation is trusted; a plain available seat is bookable.
        let mut st = sample_showtime();
        let now = Utc::now();
        book_seats(&mut st, &seats(&["B7"]), now).unwrap();
        assert!(st.is_booked("B7"));
        assert_eq!(st.available_seats, 14);
    }

    #[test]
    fn booking_is_atomic_across_the_request() {
        let mut st = sample_showtime();
        let now = Utc::now();
        book_seats(&mut st, &seats(&["B2"]), now).unwrap();

        // A1 is bookable, B2 is already booked: A1 must stay un-booked.
        let err = book_seats(&mut st, &seats(&["A1", "B2"]), now).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert!(!st.is_booked("A1"));
        assert_eq!(st.booked_seats.len(), 1);
        assert_eq!(st.available_seats, 14);
    }

    #[test]
    fn booking_rejects_unknown_seats_and_keeps_invariant() {
        let mut st = sample_showtime();
        let now = Utc::now();
        assert!(matches!(
            book_seats(&mut st, &seats(&["Q1"]), now),
            Err(Error::InvalidRequest(_))
        ));
        assert!(matches!(
            book_seats(&mut st, &[], now),
            Err(Error::InvalidRequest(_))
        ));

        book_seats(&mut st, &seats(&["A1", "B1", "B2"]), now).unwrap();
        let row_sum: u32 = st.row_pricing.iter().map(|r| r.available_seats).sum();
        assert_eq!(row_sum, st.available_seats);
        assert_eq!(st.available_seats, st.total_seats - 3);
    }
}
