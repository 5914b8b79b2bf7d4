use std::cmp::Ordering;

use crate::models::query::{total_pages, ShowtimeFilters, ShowtimePage, SortField, SortOrder};
use crate::models::showtime::Showtime;

/// Conjunctive filter match. `search` does a case-insensitive substring match
/// over language and format.
pub fn matches(showtime: &Showtime, filters: &ShowtimeFilters) -> bool {
    if let Some(search) = &filters.search {
        let needle = search.to_lowercase();
        if !needle.is_empty() {
            let in_language = showtime.language.to_lowercase().contains(&needle);
            let in_format = showtime.format.as_str().to_lowercase().contains(&needle);
            if !in_language && !in_format {
                return false;
            }
        }
    }
    if let Some(date) = filters.show_date {
        if showtime.show_date != date {
            return false;
        }
    }
    if let Some(active) = filters.is_active {
        if showtime.is_active != active {
            return false;
        }
    }
    if let Some(format) = filters.format {
        if showtime.format != format {
            return false;
        }
    }
    if let Some(language) = &filters.language {
        if !showtime.language.eq_ignore_ascii_case(language) {
            return false;
        }
    }
    if let Some(theater_id) = filters.theater_id {
        if showtime.theater_id != theater_id {
            return false;
        }
    }
    if let Some(screen_id) = filters.screen_id {
        if showtime.screen_id != screen_id {
            return false;
        }
    }
    if let Some(movie_id) = filters.movie_id {
        if showtime.movie_id != movie_id {
            return false;
        }
    }
    true
}

fn compare(a: &Showtime, b: &Showtime, field: SortField) -> Ordering {
    match field {
        SortField::ShowDate => a
            .show_date
            .cmp(&b.show_date)
            .then(a.show_time.cmp(&b.show_time)),
        SortField::ShowTime => a.show_time.cmp(&b.show_time),
        SortField::Language => a.language.cmp(&b.language),
        SortField::Format => a.format.as_str().cmp(b.format.as_str()),
        SortField::TotalSeats => a.total_seats.cmp(&b.total_seats),
        SortField::AvailableSeats => a.available_seats.cmp(&b.available_seats),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
    }
}

pub fn sort(showtimes: &mut [Showtime], field: SortField, order: SortOrder) {
    showtimes.sort_by(|a, b| {
        let ord = compare(a, b, field).then(a.id.cmp(&b.id));
        match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
}

/// Filters, sorts and slices one page out of a showtime corpus. Pages past
/// the end return an empty list with the correct totals.
pub fn run(
    showtimes: Vec<Showtime>,
    page: u32,
    limit: u32,
    filters: &ShowtimeFilters,
) -> ShowtimePage {
    let page = page.max(1);
    let limit = limit.max(1);

    let mut matched: Vec<Showtime> = showtimes
        .into_iter()
        .filter(|s| matches(s, filters))
        .collect();
    sort(&mut matched, filters.sort_by, filters.sort_order);

    let total = matched.len() as u64;
    let offset = ((page - 1) as usize).saturating_mul(limit as usize);
    let slice: Vec<Showtime> = matched
        .into_iter()
        .skip(offset)
        .take(limit as usize)
        .collect();

    ShowtimePage {
        showtimes: slice,
        total,
        current_page: page,
        total_pages: total_pages(total, limit),
        page_size: limit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::showtime::tests::sample_showtime;
    use crate::models::showtime::ShowFormat;
    use chrono::NaiveTime;

    fn corpus(n: usize) -> Vec<Showtime> {
        (0..n)
            .map(|i| {
                let mut st = sample_showtime();
                st.show_time = NaiveTime::from_hms_opt(8 + (i as u32 % 14), 0, 0).unwrap();
                st.language = if i % 2 == 0 { "English" } else { "Hindi" }.to_string();
                st.format = if i % 3 == 0 { ShowFormat::Imax } else { ShowFormat::TwoD };
                st.is_active = i % 4 != 0;
                st
            })
            .collect()
    }

    #[test]
    fn filters_are_conjunctive() {
        let shows = corpus(24);
        let filters = ShowtimeFilters {
            is_active: Some(true),
            format: Some(ShowFormat::Imax),
            language: Some("english".to_string()),
            ..Default::default()
        };
        let expected = shows
            .iter()
            .filter(|s| s.is_active && s.format == ShowFormat::Imax && s.language == "English")
            .count() as u64;
        let page = run(shows, 1, 50, &filters);
        assert_eq!(page.total, expected);
        assert!(page
            .showtimes
            .iter()
            .all(|s| s.is_active && s.format == ShowFormat::Imax));
    }

    #[test]
    fn search_matches_language_and_format() {
        let shows = corpus(12);
        let by_language = run(
            shows.clone(),
            1,
            50,
            &ShowtimeFilters { search: Some("hind".to_string()), ..Default::default() },
        );
        assert!(by_language.total > 0);
        assert!(by_language.showtimes.iter().all(|s| s.language == "Hindi"));

        let by_format = run(
            shows,
            1,
            50,
            &ShowtimeFilters { search: Some("imax".to_string()), ..Default::default() },
        );
        assert!(by_format.total > 0);
        assert!(by_format.showtimes.iter().all(|s| s.format == ShowFormat::Imax));
    }

    #[test]
    fn sorting_respects_field_and_order() {
        let shows = corpus(10);
        let filters = ShowtimeFilters {
            sort_by: SortField::ShowTime,
            sort_order: SortOrder::Desc,
            ..Default::default()
        };
        let page = run(shows, 1, 50, &filters);
        for pair in page.showtimes.windows(2) {
            assert!(pair[0].show_time >= pair[1].show_time);
        }
    }

    #[test]
    fn page_two_is_the_second_slice_of_the_sorted_set() {
        let shows = corpus(25);
        let filters = ShowtimeFilters { is_active: Some(true), ..Default::default() };
        let mut matched: Vec<Showtime> =
            shows.iter().filter(|s| s.is_active).cloned().collect();
        sort(&mut matched, filters.sort_by, filters.sort_order);

        let page = run(shows, 2, 10, &filters);
        assert_eq!(page.total, matched.len() as u64);
        assert_eq!(page.current_page, 2);
        assert_eq!(page.page_size, 10);
        let expected: Vec<_> = matched.iter().skip(10).take(10).map(|s| s.id).collect();
        let got: Vec<_> = page.showtimes.iter().map(|s| s.id).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn page_past_the_end_is_empty_with_correct_totals() {
        let shows = corpus(5);
        let page = run(shows, 4, 10, &ShowtimeFilters::default());
        assert!(page.showtimes.is_empty());
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.current_page, 4);
    }
}
