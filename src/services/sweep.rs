use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info};

use crate::events::{DomainEvent, EventBus};
use crate::store::ShowtimeRepository;

/// Background reclamation of expired seat blocks.
///
/// Availability answers never depend on this task: every read already treats
/// expired blocks as void. The sweep only bounds row-counter drift and memory
/// by physically purging dead blocks, and announces the reclaimed seats on
/// the event bus.
pub struct SweepService {
    repo: Arc<dyn ShowtimeRepository>,
    events: EventBus,
    interval: Duration,
}

#[derive(Debug, Default)]
pub struct SweepStats {
    pub showtimes_touched: usize,
    pub blocks_purged: usize,
}

impl SweepService {
    pub fn new(repo: Arc<dyn ShowtimeRepository>, events: EventBus, interval_secs: u64) -> Self {
        Self {
            repo,
            events,
            interval: Duration::from_secs(interval_secs),
        }
    }

    /// Periodic loop; spawned once at startup.
    pub async fn run(self) {
        info!("block sweep running every {:?}", self.interval);
        loop {
            tokio::time::sleep(self.interval).await;
            self.run_once().await;
        }
    }

    /// One sweep pass. Contended showtimes are skipped and picked up on the
    /// next pass.
    pub async fn run_once(&self) -> SweepStats {
        let reports = match self.repo.sweep_expired(Utc::now()).await {
            Ok(reports) => reports,
            Err(e) => {
                error!("block sweep failed: {e}");
                return SweepStats::default();
            }
        };

        let mut stats = SweepStats::default();
        for report in reports {
            stats.showtimes_touched += 1;
            stats.blocks_purged += report.purged_blocks;
            debug!(
                "sweep reclaimed {} block(s) on showtime {}",
                report.purged_blocks, report.showtime_id
            );
            self.events.publish(DomainEvent::SeatStateChanged {
                showtime_id: report.showtime_id,
                available_seats: report.available_seats,
                blocked_seats: report.blocked_seats,
                booked_seats: report.booked_seats,
            });
        }

        if stats.blocks_purged > 0 {
            info!(
                "sweep purged {} expired block(s) across {} showtime(s)",
                stats.blocks_purged, stats.showtimes_touched
            );
        }
        stats
    }
}
