use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Exhibition format of a screening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShowFormat {
    #[serde(rename = "2D")]
    TwoD,
    #[serde(rename = "3D")]
    ThreeD,
    #[serde(rename = "IMAX")]
    Imax,
    #[serde(rename = "4DX")]
    FourDx,
    #[serde(rename = "Dolby")]
    Dolby,
}

impl ShowFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShowFormat::TwoD => "2D",
            ShowFormat::ThreeD => "3D",
            ShowFormat::Imax => "IMAX",
            ShowFormat::FourDx => "4DX",
            ShowFormat::Dolby => "Dolby",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "2D" => Some(ShowFormat::TwoD),
            "3D" => Some(ShowFormat::ThreeD),
            "IMAX" => Some(ShowFormat::Imax),
            "4DX" => Some(ShowFormat::FourDx),
            "Dolby" => Some(ShowFormat::Dolby),
            _ => None,
        }
    }
}

impl fmt::Display for ShowFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Seat category of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeatType {
    #[serde(rename = "VIP")]
    Vip,
    Premium,
    Normal,
}

/// Per-row pricing and availability bookkeeping.
///
/// Row counters are mutated atomically alongside the parent showtime's
/// booked/blocked sets; they must never diverge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowPricing {
    pub row_label: String,
    pub seat_type: SeatType,
    pub base_price: i64,
    pub showtime_price: i64,
    pub total_seats: u32,
    pub available_seats: u32,
    pub booked_seats: Vec<String>,
}

/// A time-bounded hold on one seat. At most one live block per seat.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatBlock {
    pub seat_id: String,
    pub user_id: Uuid,
    pub session_id: String,
    pub blocked_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SeatBlock {
    /// A block is void once `now > expires_at`, whether or not it has been
    /// physically purged.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// One scheduled exhibition of a movie on a screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Showtime {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub movie_id: Uuid,
    pub theater_id: Uuid,
    pub screen_id: Uuid,
    pub show_date: NaiveDate,
    pub show_time: NaiveTime,
    pub end_time: NaiveTime,
    pub format: ShowFormat,
    pub language: String,
    pub row_pricing: Vec<RowPricing>,
    pub total_seats: u32,
    pub available_seats: u32,
    pub booked_seats: Vec<String>,
    pub blocked_seats: Vec<SeatBlock>,
    pub is_active: bool,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row layout supplied at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowSpec {
    pub row_label: String,
    pub seat_type: SeatType,
    pub base_price: i64,
    #[serde(default)]
    pub showtime_price: Option<i64>,
    pub total_seats: u32,
}

/// Creation payload for a showtime.
#[derive(Debug, Clone)]
pub struct NewShowtime {
    pub owner_id: Uuid,
    pub movie_id: Uuid,
    pub theater_id: Uuid,
    pub screen_id: Uuid,
    pub show_date: NaiveDate,
    pub show_time: NaiveTime,
    pub end_time: NaiveTime,
    pub format: ShowFormat,
    pub language: String,
    pub rows: Vec<RowSpec>,
}

/// Owner-edit payload; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowtimeUpdate {
    pub show_date: Option<NaiveDate>,
    pub show_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub format: Option<ShowFormat>,
    pub language: Option<String>,
}

impl ShowtimeUpdate {
    /// True when the update can move the showtime into another exhibition
    /// window, requiring the overlap check to run again.
    pub fn touches_schedule(&self) -> bool {
        self.show_date.is_some() || self.show_time.is_some() || self.end_time.is_some()
    }
}

/// Splits a seat id like `A12` into its row label and 1-based seat number.
///
/// Blocks and bookings are matched by the raw string, so only the canonical
/// spelling is a valid id: `A01` is rejected, not treated as `A1`.
pub fn split_seat_id(seat_id: &str) -> Option<(&str, u32)> {
    let digits_at = seat_id.find(|c: char| c.is_ascii_digit())?;
    let (label, number) = seat_id.split_at(digits_at);
    if label.is_empty() || !label.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    if number.starts_with('0') {
        return None;
    }
    let number: u32 = number.parse().ok()?;
    Some((label, number))
}

impl Showtime {
    /// Builds a fresh showtime from a creation payload. Validates the time
    /// range and the row layout; schedule overlap is the store's job.
    pub fn new(req: NewShowtime, now: DateTime<Utc>) -> Result<Self> {
        if req.show_time >= req.end_time {
            return Err(Error::InvalidRequest(
                "showTime must be strictly before endTime".to_string(),
            ));
        }
        if req.rows.is_empty() {
            return Err(Error::InvalidRequest("rowPricing must not be empty".to_string()));
        }
        if req.language.trim().is_empty() {
            return Err(Error::InvalidRequest("language must not be empty".to_string()));
        }

        let mut row_pricing = Vec::with_capacity(req.rows.len());
        for row in &req.rows {
            if row.row_label.is_empty() || !row.row_label.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(Error::InvalidRequest(format!(
                    "invalid row label '{}'",
                    row.row_label
                )));
            }
            if row_pricing
                .iter()
                .any(|r: &RowPricing| r.row_label == row.row_label)
            {
                return Err(Error::InvalidRequest(format!(
                    "duplicate row label '{}'",
                    row.row_label
                )));
            }
            if row.total_seats == 0 {
                return Err(Error::InvalidRequest(format!(
                    "row '{}' must have at least one seat",
                    row.row_label
                )));
            }
            let showtime_price = row.showtime_price.unwrap_or(row.base_price);
            if row.base_price < 0 || showtime_price < 0 {
                return Err(Error::InvalidRequest(format!(
                    "row '{}' has a negative price",
                    row.row_label
                )));
            }
            row_pricing.push(RowPricing {
                row_label: row.row_label.clone(),
                seat_type: row.seat_type,
                base_price: row.base_price,
                showtime_price,
                total_seats: row.total_seats,
                available_seats: row.total_seats,
                booked_seats: Vec::new(),
            });
        }

        let total_seats: u32 = row_pricing.iter().map(|r| r.total_seats).sum();

        Ok(Showtime {
            id: Uuid::new_v4(),
            owner_id: req.owner_id,
            movie_id: req.movie_id,
            theater_id: req.theater_id,
            screen_id: req.screen_id,
            show_date: req.show_date,
            show_time: req.show_time,
            end_time: req.end_time,
            format: req.format,
            language: req.language,
            row_pricing,
            total_seats,
            available_seats: total_seats,
            booked_seats: Vec::new(),
            blocked_seats: Vec::new(),
            is_active: true,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// Index into `row_pricing` for a seat id, or `InvalidRequest` when the
    /// seat falls outside the configured layout.
    pub fn row_index_for_seat(&self, seat_id: &str) -> Result<usize> {
        let (label, number) = split_seat_id(seat_id)
            .ok_or_else(|| Error::InvalidRequest(format!("seat '{seat_id}' not in layout")))?;
        self.row_pricing
            .iter()
            .position(|r| r.row_label == label && number <= r.total_seats)
            .ok_or_else(|| Error::InvalidRequest(format!("seat '{seat_id}' not in layout")))
    }

    pub fn is_booked(&self, seat_id: &str) -> bool {
        self.booked_seats.iter().any(|s| s == seat_id)
    }

    /// The live (non-expired) block holding a seat, if any.
    pub fn live_block_for(&self, seat_id: &str, now: DateTime<Utc>) -> Option<&SeatBlock> {
        self.blocked_seats
            .iter()
            .find(|b| b.seat_id == seat_id && !b.is_expired(now))
    }

    pub fn live_block_count(&self, now: DateTime<Utc>) -> u32 {
        self.blocked_seats.iter().filter(|b| !b.is_expired(now)).count() as u32
    }

    /// Availability as seen at `now`: expired blocks count as available even
    /// before the sweep has physically purged them.
    pub fn effective_available(&self, now: DateTime<Utc>) -> u32 {
        self.total_seats
            .saturating_sub(self.booked_seats.len() as u32)
            .saturating_sub(self.live_block_count(now))
    }

    /// Recomputes the aggregate and per-row availability counters from the
    /// booked set and the live blocks. Called after every seat mutation.
    pub fn refresh_counters(&mut self, now: DateTime<Utc>) {
        for row in &mut self.row_pricing {
            let blocked_in_row = self
                .blocked_seats
                .iter()
                .filter(|b| {
                    !b.is_expired(now)
                        && split_seat_id(&b.seat_id)
                            .map(|(label, _)| label == row.row_label)
                            .unwrap_or(false)
                })
                .count() as u32;
            row.available_seats = row
                .total_seats
                .saturating_sub(row.booked_seats.len() as u32)
                .saturating_sub(blocked_in_row);
        }
        self.available_seats = self.row_pricing.iter().map(|r| r.available_seats).sum();
    }

    /// Physically removes expired blocks and repairs the counters.
    /// Returns the number of blocks purged.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.blocked_seats.len();
        self.blocked_seats.retain(|b| !b.is_expired(now));
        let purged = before - self.blocked_seats.len();
        if purged > 0 {
            self.refresh_counters(now);
        }
        purged
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    pub(crate) fn sample_rows() -> Vec<RowSpec> {
        vec![
            RowSpec {
                row_label: "A".to_string(),
                seat_type: SeatType::Vip,
                base_price: 500,
                showtime_price: Some(550),
                total_seats: 5,
            },
            RowSpec {
                row_label: "B".to_string(),
                seat_type: SeatType::Normal,
                base_price: 200,
                showtime_price: None,
                total_seats: 10,
            },
        ]
    }

    pub(crate) fn sample_showtime() -> Showtime {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        Showtime::new(
            NewShowtime {
                owner_id: Uuid::new_v4(),
                movie_id: Uuid::new_v4(),
                theater_id: Uuid::new_v4(),
                screen_id: Uuid::new_v4(),
                show_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
                show_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(20, 30, 0).unwrap(),
                format: ShowFormat::Imax,
                language: "English".to_string(),
                rows: sample_rows(),
            },
            now,
        )
        .unwrap()
    }

    #[test]
    fn new_showtime_sums_row_seats() {
        let st = sample_showtime();
        assert_eq!(st.total_seats, 15);
        assert_eq!(st.available_seats, 15);
        assert_eq!(st.row_pricing[1].showtime_price, 200);
        assert!(st.is_active);
    }

    #[test]
    fn rejects_malformed_time_range() {
        let now = Utc::now();
        let mut req = NewShowtime {
            owner_id: Uuid::new_v4(),
            movie_id: Uuid::new_v4(),
            theater_id: Uuid::new_v4(),
            screen_id: Uuid::new_v4(),
            show_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            show_time: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            format: ShowFormat::TwoD,
            language: "Hindi".to_string(),
            rows: sample_rows(),
        };
        assert!(matches!(
            Showtime::new(req.clone(), now),
            Err(Error::InvalidRequest(_))
        ));

        req.end_time = NaiveTime::from_hms_opt(20, 0, 0).unwrap();
        assert!(matches!(
            Showtime::new(req, now),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn rejects_duplicate_row_labels() {
        let now = Utc::now();
        let mut rows = sample_rows();
        rows[1].row_label = "A".to_string();
        let req = NewShowtime {
            owner_id: Uuid::new_v4(),
            movie_id: Uuid::new_v4(),
            theater_id: Uuid::new_v4(),
            screen_id: Uuid::new_v4(),
            show_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            show_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
            format: ShowFormat::TwoD,
            language: "Hindi".to_string(),
            rows,
        };
        assert!(matches!(
            Showtime::new(req, now),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn seat_id_parsing() {
        assert_eq!(split_seat_id("A12"), Some(("A", 12)));
        assert_eq!(split_seat_id("AB3"), Some(("AB", 3)));
        assert_eq!(split_seat_id("A0"), None);
        // Non-canonical spellings must not alias another seat.
        assert_eq!(split_seat_id("A01"), None);
        assert_eq!(split_seat_id("B007"), None);
        assert_eq!(split_seat_id("12"), None);
        assert_eq!(split_seat_id("A"), None);
        assert_eq!(split_seat_id(""), None);
    }

    #[test]
    fn seat_outside_layout_is_rejected() {
        let st = sample_showtime();
        assert!(st.row_index_for_seat("A3").is_ok());
        assert!(st.row_index_for_seat("B10").is_ok());
        // Row A only has 5 seats.
        assert!(matches!(
            st.row_index_for_seat("A6"),
            Err(Error::InvalidRequest(_))
        ));
        assert!(matches!(
            st.row_index_for_seat("C1"),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn expired_blocks_count_as_available() {
        let mut st = sample_showtime();
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 17, 0, 0).unwrap();
        st.blocked_seats.push(SeatBlock {
            seat_id: "A1".to_string(),
            user_id: Uuid::new_v4(),
            session_id: "s1".to_string(),
            blocked_at: now - Duration::minutes(20),
            expires_at: now - Duration::minutes(10),
        });
        st.blocked_seats.push(SeatBlock {
            seat_id: "A2".to_string(),
            user_id: Uuid::new_v4(),
            session_id: "s2".to_string(),
            blocked_at: now,
            expires_at: now + Duration::minutes(10),
        });

        // One live block, one expired: 15 - 0 booked - 1 live = 14.
        assert_eq!(st.effective_available(now), 14);

        let purged = st.purge_expired(now);
        assert_eq!(purged, 1);
        assert_eq!(st.blocked_seats.len(), 1);
        assert_eq!(st.available_seats, 14);
        assert_eq!(st.row_pricing[0].available_seats, 4);
    }

    #[test]
    fn refresh_counters_keeps_rows_and_aggregate_in_sync() {
        let mut st = sample_showtime();
        let now = Utc::now();
        st.booked_seats.push("B1".to_string());
        st.row_pricing[1].booked_seats.push("B1".to_string());
        st.refresh_counters(now);

        assert_eq!(st.row_pricing[1].available_seats, 9);
        assert_eq!(st.available_seats, 14);
        let row_sum: u32 = st.row_pricing.iter().map(|r| r.available_seats).sum();
        assert_eq!(row_sum, st.available_seats);
    }
}
