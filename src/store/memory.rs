use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use crate::config::BookingConfig;
use crate::error::{Error, Result};
use crate::models::query::{ShowtimeFilters, ShowtimePage};
use crate::models::showtime::{NewShowtime, Showtime, ShowtimeUpdate};
use crate::services::{blocking, booking, query, schedule};

use super::{ShowtimeRepository, SweepReport};

/// In-process showtime store.
///
/// Runs the same optimistic protocol as the Postgres backend: every seat
/// mutation snapshots the record, applies a pure transition, and commits only
/// if the version field is unchanged. Used in tests and when no DATABASE_URL
/// is configured.
pub struct MemoryRepository {
    shows: RwLock<HashMap<Uuid, Showtime>>,
    hold: Duration,
    max_retries: u32,
}

impl MemoryRepository {
    pub fn new(hold_secs: u64, max_retries: u32) -> Self {
        Self {
            shows: RwLock::new(HashMap::new()),
            hold: Duration::seconds(hold_secs as i64),
            max_retries,
        }
    }

    pub fn from_config(cfg: &BookingConfig) -> Self {
        Self::new(cfg.hold_duration_secs, cfg.max_cas_retries)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<Uuid, Showtime>>> {
        self.shows
            .read()
            .map_err(|_| Error::Internal("showtime store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<Uuid, Showtime>>> {
        self.shows
            .write()
            .map_err(|_| Error::Internal("showtime store lock poisoned".to_string()))
    }

    /// Read-side view of a showtime: expired blocks are dropped from the
    /// clone so availability answers are correct regardless of sweep timing.
    fn normalized(mut showtime: Showtime, now: DateTime<Utc>) -> Showtime {
        showtime.purge_expired(now);
        showtime
    }

    fn snapshot(&self, id: Uuid) -> Result<Showtime> {
        self.read()?
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("showtime {id} not found")))
    }

    /// Optimistic read-modify-write against one showtime. Losing a race
    /// against a concurrent writer retries with a fresh snapshot; the retry
    /// budget exhausting surfaces as `Conflict`.
    fn mutate<F>(&self, id: Uuid, transition: F) -> Result<Showtime>
    where
        F: Fn(&mut Showtime, DateTime<Utc>) -> Result<()>,
    {
        for _ in 0..=self.max_retries {
            let now = Utc::now();
            let snapshot = self.snapshot(id)?;
            let mut next = snapshot.clone();
            transition(&mut next, now)?;
            next.version += 1;
            next.updated_at = now;

            let mut shows = self.write()?;
            match shows.get_mut(&id) {
                Some(current) if current.version == snapshot.version => {
                    *current = next.clone();
                    return Ok(next);
                }
                Some(_) => continue, // lost the race, retry on a fresh snapshot
                None => return Err(Error::NotFound(format!("showtime {id} not found"))),
            }
        }
        Err(Error::Conflict(
            "showtime is being modified concurrently, try again".to_string(),
        ))
    }

    fn collect<P>(&self, predicate: P) -> Result<Vec<Showtime>>
    where
        P: Fn(&Showtime) -> bool,
    {
        let now = Utc::now();
        let mut found: Vec<Showtime> = self
            .read()?
            .values()
            .filter(|s| predicate(s))
            .cloned()
            .map(|s| Self::normalized(s, now))
            .collect();
        found.sort_by(|a, b| {
            (a.show_date, a.show_time, a.id).cmp(&(b.show_date, b.show_time, b.id))
        });
        Ok(found)
    }
}

#[async_trait]
impl ShowtimeRepository for MemoryRepository {
    async fn create(&self, req: NewShowtime) -> Result<Showtime> {
        let now = Utc::now();
        let showtime = Showtime::new(req, now)?;

        // Overlap and duplicate checks run under the write lock so racing
        // creates cannot both slip through.
        let mut shows = self.write()?;
        for existing in shows.values() {
            if schedule::conflicts_with(
                existing,
                showtime.screen_id,
                showtime.show_date,
                showtime.show_time,
                showtime.end_time,
                None,
            ) {
                return Err(Error::Conflict(
                    "time slot conflicts with an existing show on this screen".to_string(),
                ));
            }
            if existing.screen_id == showtime.screen_id
                && existing.show_date == showtime.show_date
                && existing.show_time == showtime.show_time
            {
                return Err(Error::Conflict(
                    "a show already exists at this exact time on this screen".to_string(),
                ));
            }
        }
        shows.insert(showtime.id, showtime.clone());
        Ok(showtime)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Showtime> {
        Ok(Self::normalized(self.snapshot(id)?, Utc::now()))
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<Showtime>> {
        self.collect(|s| s.owner_id == owner_id)
    }

    async fn find_by_movie_and_date(&self, movie_id: Uuid, date: NaiveDate) -> Result<Vec<Showtime>> {
        self.collect(|s| s.movie_id == movie_id && s.show_date == date && s.is_active)
    }

    async fn find_by_theater_and_date(&self, theater_id: Uuid, date: NaiveDate) -> Result<Vec<Showtime>> {
        self.collect(|s| s.theater_id == theater_id && s.show_date == date && s.is_active)
    }

    async fn find_by_screen_and_date(&self, screen_id: Uuid, date: NaiveDate) -> Result<Vec<Showtime>> {
        self.collect(|s| s.screen_id == screen_id && s.show_date == date)
    }

    async fn update_by_id(&self, id: Uuid, update: ShowtimeUpdate) -> Result<Showtime> {
        let now = Utc::now();
        let mut shows = self.write()?;

        let mut next = shows
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("showtime {id} not found")))?;

        let reschedule = update.touches_schedule();
        if let Some(date) = update.show_date {
            next.show_date = date;
        }
        if let Some(start) = update.show_time {
            next.show_time = start;
        }
        if let Some(end) = update.end_time {
            next.end_time = end;
        }
        if let Some(format) = update.format {
            next.format = format;
        }
        if let Some(language) = update.language {
            if language.trim().is_empty() {
                return Err(Error::InvalidRequest("language must not be empty".to_string()));
            }
            next.language = language;
        }

        if reschedule {
            if next.show_time >= next.end_time {
                return Err(Error::InvalidRequest(
                    "showTime must be strictly before endTime".to_string(),
                ));
            }
            for existing in shows.values() {
                if schedule::conflicts_with(
                    existing,
                    next.screen_id,
                    next.show_date,
                    next.show_time,
                    next.end_time,
                    Some(id),
                ) {
                    return Err(Error::Conflict(
                        "time slot conflicts with an existing show on this screen".to_string(),
                    ));
                }
            }
        }

        next.version += 1;
        next.updated_at = now;
        shows.insert(id, next.clone());
        Ok(next)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<()> {
        let mut shows = self.write()?;
        let showtime = shows
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("showtime {id} not found")))?;

        if showtime.booked_seats.is_empty() {
            shows.remove(&id);
        } else {
            // Bookings still reference this showtime: soft-deactivate only.
            showtime.is_active = false;
            showtime.version += 1;
            showtime.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn update_status(&self, id: Uuid, is_active: bool) -> Result<Showtime> {
        self.mutate(id, |showtime, _| {
            showtime.is_active = is_active;
            Ok(())
        })
    }

    async fn find_all_paginated(
        &self,
        page: u32,
        limit: u32,
        filters: &ShowtimeFilters,
    ) -> Result<ShowtimePage> {
        let all = self.collect(|_| true)?;
        Ok(query::run(all, page, limit, filters))
    }

    async fn find_by_screen_paginated(
        &self,
        screen_id: Uuid,
        page: u32,
        limit: u32,
        filters: &ShowtimeFilters,
    ) -> Result<ShowtimePage> {
        let scoped = self.collect(|s| s.screen_id == screen_id)?;
        Ok(query::run(scoped, page, limit, filters))
    }

    async fn check_time_slot_overlap(
        &self,
        screen_id: Uuid,
        show_date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        exclude_id: Option<Uuid>,
    ) -> Result<bool> {
        if start >= end {
            return Err(Error::InvalidRequest(
                "startTime must be strictly before endTime".to_string(),
            ));
        }
        Ok(self.read()?.values().any(|s| {
            schedule::conflicts_with(s, screen_id, show_date, start, end, exclude_id)
        }))
    }

    async fn exists_by_screen_and_time(
        &self,
        screen_id: Uuid,
        show_date: NaiveDate,
        show_time: NaiveTime,
    ) -> Result<bool> {
        Ok(self.read()?.values().any(|s| {
            s.screen_id == screen_id && s.show_date == show_date && s.show_time == show_time
        }))
    }

    async fn block_seats(
        &self,
        id: Uuid,
        seat_ids: &[String],
        user_id: Uuid,
        session_id: &str,
    ) -> Result<Showtime> {
        self.mutate(id, |showtime, now| {
            blocking::block_seats(showtime, seat_ids, user_id, session_id, now, self.hold)
        })
    }

    async fn release_seats(
        &self,
        id: Uuid,
        seat_ids: &[String],
        user_id: Uuid,
        session_id: &str,
    ) -> Result<Showtime> {
        self.mutate(id, |showtime, now| {
            blocking::release_seats(showtime, seat_ids, user_id, session_id, now)
        })
    }

    async fn book_seats(&self, id: Uuid, seat_ids: &[String]) -> Result<Showtime> {
        self.mutate(id, |showtime, now| booking::book_seats(showtime, seat_ids, now))
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<Vec<SweepReport>> {
        let ids: Vec<Uuid> = self.read()?.keys().copied().collect();
        let mut reports = Vec::new();

        for id in ids {
            // Best-effort per showtime: persistent contention is left for the
            // next sweep pass rather than failing the whole run.
            for _ in 0..=self.max_retries {
                let snapshot = match self.snapshot(id) {
                    Ok(s) => s,
                    Err(_) => break, // deleted since we listed ids
                };
                if !snapshot.blocked_seats.iter().any(|b| b.is_expired(now)) {
                    break;
                }
                let mut next = snapshot.clone();
                let purged = next.purge_expired(now);
                next.version += 1;
                next.updated_at = now;

                let mut shows = self.write()?;
                match shows.get_mut(&id) {
                    Some(current) if current.version == snapshot.version => {
                        *current = next.clone();
                        reports.push(SweepReport {
                            showtime_id: id,
                            purged_blocks: purged,
                            available_seats: next.available_seats,
                            blocked_seats: next.blocked_seats.len() as u32,
                            booked_seats: next.booked_seats.len() as u32,
                        });
                        break;
                    }
                    Some(_) => continue,
                    None => break,
                }
            }
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::showtime::{RowSpec, SeatType, ShowFormat};

    fn new_showtime_on(screen_id: Uuid, start: (u32, u32), end: (u32, u32)) -> NewShowtime {
        NewShowtime {
            owner_id: Uuid::new_v4(),
            movie_id: Uuid::new_v4(),
            theater_id: Uuid::new_v4(),
            screen_id,
            show_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            show_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
            format: ShowFormat::TwoD,
            language: "English".to_string(),
            rows: vec![RowSpec {
                row_label: "A".to_string(),
                seat_type: SeatType::Normal,
                base_price: 200,
                showtime_price: None,
                total_seats: 10,
            }],
        }
    }

    fn repo() -> MemoryRepository {
        MemoryRepository::new(600, 8)
    }

    fn seats(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn create_rejects_overlap_but_allows_adjacency() {
        let repo = repo();
        let screen = Uuid::new_v4();
        repo.create(new_showtime_on(screen, (19, 0), (21, 0))).await.unwrap();

        let err = repo
            .create(new_showtime_on(screen, (18, 0), (20, 0)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        // End-equals-start adjacency is allowed.
        repo.create(new_showtime_on(screen, (21, 0), (23, 0))).await.unwrap();
        // Other screens never contend.
        repo.create(new_showtime_on(Uuid::new_v4(), (19, 30), (20, 30)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn overlap_check_matches_spec_vectors() {
        let repo = repo();
        let screen = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let created = repo.create(new_showtime_on(screen, (19, 0), (21, 0))).await.unwrap();

        let t = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap();
        assert!(repo
            .check_time_slot_overlap(screen, date, t(18), t(20), None)
            .await
            .unwrap());
        assert!(!repo
            .check_time_slot_overlap(screen, date, t(21), t(23), None)
            .await
            .unwrap());
        // Excluding the conflicting showtime itself clears the check.
        assert!(!repo
            .check_time_slot_overlap(screen, date, t(18), t(20), Some(created.id))
            .await
            .unwrap());
        // Malformed range is rejected outright.
        assert!(repo
            .check_time_slot_overlap(screen, date, t(20), t(18), None)
            .await
            .is_err());

        assert!(repo
            .exists_by_screen_and_time(screen, date, t(19))
            .await
            .unwrap());
        assert!(!repo
            .exists_by_screen_and_time(screen, date, t(18))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn update_can_move_into_adjacent_slot_but_not_overlap() {
        let repo = repo();
        let screen = Uuid::new_v4();
        repo.create(new_showtime_on(screen, (12, 0), (14, 0))).await.unwrap();
        let movable = repo.create(new_showtime_on(screen, (18, 0), (20, 0))).await.unwrap();

        // Moving onto the first showtime's window is rejected.
        let err = repo
            .update_by_id(
                movable.id,
                ShowtimeUpdate {
                    show_time: Some(NaiveTime::from_hms_opt(13, 0, 0).unwrap()),
                    end_time: Some(NaiveTime::from_hms_opt(15, 0, 0).unwrap()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        // A shift inside its own window only excludes itself.
        let updated = repo
            .update_by_id(
                movable.id,
                ShowtimeUpdate {
                    show_time: Some(NaiveTime::from_hms_opt(19, 0, 0).unwrap()),
                    end_time: Some(NaiveTime::from_hms_opt(21, 0, 0).unwrap()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.show_time, NaiveTime::from_hms_opt(19, 0, 0).unwrap());
        assert!(updated.version > movable.version);
    }

    #[tokio::test]
    async fn update_can_change_language_and_schedule_together() {
        let repo = repo();
        let screen = Uuid::new_v4();
        repo.create(new_showtime_on(screen, (12, 0), (14, 0))).await.unwrap();
        let movable = repo.create(new_showtime_on(screen, (18, 0), (20, 0))).await.unwrap();

        // Language and window in one request: the overlap re-check must still
        // run after the language field has been applied.
        let updated = repo
            .update_by_id(
                movable.id,
                ShowtimeUpdate {
                    language: Some("Hindi".to_string()),
                    show_time: Some(NaiveTime::from_hms_opt(14, 0, 0).unwrap()),
                    end_time: Some(NaiveTime::from_hms_opt(16, 0, 0).unwrap()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.language, "Hindi");
        assert_eq!(updated.show_time, NaiveTime::from_hms_opt(14, 0, 0).unwrap());

        let err = repo
            .update_by_id(
                movable.id,
                ShowtimeUpdate {
                    language: Some("English".to_string()),
                    show_time: Some(NaiveTime::from_hms_opt(13, 0, 0).unwrap()),
                    end_time: Some(NaiveTime::from_hms_opt(15, 0, 0).unwrap()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn block_book_release_round_trip() {
        let repo = repo();
        let created = repo
            .create(new_showtime_on(Uuid::new_v4(), (18, 0), (20, 0)))
            .await
            .unwrap();
        let user = Uuid::new_v4();

        let blocked = repo
            .block_seats(created.id, &seats(&["A1", "A2"]), user, "sess-1")
            .await
            .unwrap();
        assert_eq!(blocked.available_seats, 8);

        // Another session cannot steal or release those seats.
        assert!(matches!(
            repo.block_seats(created.id, &seats(&["A2", "A3"]), Uuid::new_v4(), "sess-2")
                .await,
            Err(Error::Conflict(_))
        ));
        assert!(matches!(
            repo.release_seats(created.id, &seats(&["A1"]), Uuid::new_v4(), "sess-2")
                .await,
            Err(Error::Unauthorized(_))
        ));

        let after_release = repo
            .release_seats(created.id, &seats(&["A2"]), user, "sess-1")
            .await
            .unwrap();
        assert_eq!(after_release.available_seats, 9);

        let booked = repo.book_seats(created.id, &seats(&["A1"])).await.unwrap();
        assert_eq!(booked.booked_seats, vec!["A1".to_string()]);
        assert_eq!(booked.available_seats, 9);
        assert!(booked.blocked_seats.is_empty());

        // Booked seats cannot be booked again, atomically.
        assert!(matches!(
            repo.book_seats(created.id, &seats(&["A3", "A1"])).await,
            Err(Error::Conflict(_))
        ));
        let current = repo.find_by_id(created.id).await.unwrap();
        assert!(!current.is_booked("A3"));
    }

    #[tokio::test]
    async fn expired_blocks_are_available_on_read_and_swept() {
        // Zero-second hold: blocks expire immediately after creation.
        let repo = MemoryRepository::new(0, 8);
        let created = repo
            .create(new_showtime_on(Uuid::new_v4(), (18, 0), (20, 0)))
            .await
            .unwrap();
        repo.block_seats(created.id, &seats(&["A1"]), Uuid::new_v4(), "sess-1")
            .await
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        // Reads self-heal across the expiry boundary, before any sweep.
        let seen = repo.find_by_id(created.id).await.unwrap();
        assert_eq!(seen.available_seats, 10);
        assert!(seen.blocked_seats.is_empty());

        // The next block attempt treats the seat as free.
        let other = Uuid::new_v4();
        repo.block_seats(created.id, &seats(&["A1"]), other, "sess-2")
            .await
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let reports = repo.sweep_expired(Utc::now()).await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].purged_blocks, 1);
        assert_eq!(reports[0].available_seats, 10);
    }

    #[tokio::test]
    async fn delete_soft_deactivates_when_booked() {
        let repo = repo();
        let kept = repo
            .create(new_showtime_on(Uuid::new_v4(), (18, 0), (20, 0)))
            .await
            .unwrap();
        repo.book_seats(kept.id, &seats(&["A1"])).await.unwrap();
        repo.delete_by_id(kept.id).await.unwrap();
        let still_there = repo.find_by_id(kept.id).await.unwrap();
        assert!(!still_there.is_active);

        let removable = repo
            .create(new_showtime_on(Uuid::new_v4(), (18, 0), (20, 0)))
            .await
            .unwrap();
        repo.delete_by_id(removable.id).await.unwrap();
        assert!(matches!(
            repo.find_by_id(removable.id).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn unknown_showtime_is_not_found() {
        let repo = repo();
        assert!(matches!(
            repo.block_seats(Uuid::new_v4(), &seats(&["A1"]), Uuid::new_v4(), "s")
                .await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            repo.find_by_id(Uuid::new_v4()).await,
            Err(Error::NotFound(_))
        ));
    }
}
