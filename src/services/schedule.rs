use chrono::{Duration, NaiveTime};

use crate::error::{Error, Result};
use crate::models::showtime::Showtime;

/// Screen-cleanup buffer added to the movie runtime when deriving an end time.
pub const DEFAULT_RUNTIME_BUFFER_MINUTES: u32 = 15;

/// Standard half-open interval test: `[start, end)` windows conflict when
/// they intersect; end-equals-start adjacency is not a conflict.
pub fn windows_overlap(
    existing_start: NaiveTime,
    existing_end: NaiveTime,
    new_start: NaiveTime,
    new_end: NaiveTime,
) -> bool {
    existing_start < new_end && new_start < existing_end
}

/// True when `candidate` occupies the same screen and calendar date as the
/// proposed window and their exhibition intervals intersect.
pub fn conflicts_with(
    candidate: &Showtime,
    screen_id: uuid::Uuid,
    show_date: chrono::NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
    exclude_id: Option<uuid::Uuid>,
) -> bool {
    if exclude_id == Some(candidate.id) {
        return false;
    }
    candidate.screen_id == screen_id
        && candidate.show_date == show_date
        && windows_overlap(candidate.show_time, candidate.end_time, start, end)
}

/// Derives the end time of a screening from the movie runtime plus the
/// cleanup buffer. Shows must end on the same calendar day.
pub fn end_time_for(show_time: NaiveTime, runtime_minutes: u32, buffer_minutes: u32) -> Result<NaiveTime> {
    if runtime_minutes == 0 {
        return Err(Error::InvalidRequest("runtime must be positive".to_string()));
    }
    let total = Duration::minutes((runtime_minutes + buffer_minutes) as i64);
    let (end, wrapped) = show_time.overflowing_add_signed(total);
    if wrapped != 0 || end <= show_time {
        return Err(Error::InvalidRequest(
            "show must end on the same calendar day".to_string(),
        ));
    }
    Ok(end)
}
