use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::showtime::{ShowFormat, Showtime};

/// Sortable fields of a showtime listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    ShowDate,
    ShowTime,
    Language,
    Format,
    TotalSeats,
    AvailableSeats,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Conjunctive filter set for showtime listings. Every field is optional;
/// absent fields do not constrain the result.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowtimeFilters {
    pub search: Option<String>,
    pub show_date: Option<NaiveDate>,
    pub is_active: Option<bool>,
    pub format: Option<ShowFormat>,
    pub language: Option<String>,
    pub theater_id: Option<Uuid>,
    pub screen_id: Option<Uuid>,
    pub movie_id: Option<Uuid>,
    #[serde(default)]
    pub sort_by: SortField,
    #[serde(default)]
    pub sort_order: SortOrder,
}

/// One page of showtime results. `total` reflects the filtered set, not the
/// unpaginated corpus.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowtimePage {
    pub showtimes: Vec<Showtime>,
    pub total: u64,
    pub current_page: u32,
    pub total_pages: u32,
    pub page_size: u32,
}

/// Total page count for a result set; pages past the end stay addressable
/// (they return an empty slice), so this never errors.
pub fn total_pages(total: u64, page_size: u32) -> u32 {
    if total == 0 {
        0
    } else {
        total.div_ceil(page_size as u64) as u32
    }
}
