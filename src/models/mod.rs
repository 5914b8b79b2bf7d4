pub mod pricing;
pub mod query;
pub mod showtime;

pub use pricing::{compute_joiner_price, Coupon, GroupInvite, InviteSeat, JoinerQuote, Participant};
pub use query::{total_pages, ShowtimeFilters, ShowtimePage, SortField, SortOrder};
pub use showtime::{
    split_seat_id, NewShowtime, RowPricing, RowSpec, SeatBlock, SeatType, ShowFormat, Showtime,
    ShowtimeUpdate,
};
