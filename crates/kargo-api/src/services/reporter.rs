//! Scheduled daily summary
//!
//! One task: sleep until the configured local wall-clock time, then push a
//! per-group summary of the day's numbers through the bridge.

use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Utc};
use chrono_tz::Tz;
use kargo_core::auth::TenantScope;
use kargo_core::errors::CoreResult;
use kargo_db::repositories::{DailyStats, GroupRepository, StatsRepository};
use kargo_db::StorageAdapter;
use kargo_whatsapp::{BridgeClient, OutboundMessage};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

pub struct Reporter {
    adapter: Arc<StorageAdapter>,
    bridge: Arc<BridgeClient>,
    time_zone: Tz,
    report_time: NaiveTime,
}

impl Reporter {
    pub fn new(
        adapter: Arc<StorageAdapter>,
        bridge: Arc<BridgeClient>,
        time_zone: Tz,
        report_time: NaiveTime,
    ) -> Self {
        Self {
            adapter,
            bridge,
            time_zone,
            report_time,
        }
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        info!(at = %self.report_time, zone = %self.time_zone, "report scheduler started");
        loop {
            let wait = next_occurrence_delay(Utc::now(), self.report_time, self.time_zone);
            tokio::time::sleep(wait).await;
            if let Err(report_error) = self.broadcast().await {
                error!(%report_error, "daily report failed");
            }
        }
    }

    /// One summary per active group, scoped to that group's numbers.
    async fn broadcast(&self) -> CoreResult<()> {
        let groups = GroupRepository::new(&self.adapter)
            .list(TenantScope::Unrestricted)
            .await?;
        let stats_repo = StatsRepository::new(&self.adapter);

        for group in groups.into_iter().filter(|group| group.is_active) {
            let stats = stats_repo
                .daily(None, Some(group.agency_id), Some(group.id))
                .await?;
            let text = format_report(&group.name, &stats);
            if let Err(send_error) = self
                .bridge
                .send(&OutboundMessage::new(group.external_id.clone(), text))
                .await
            {
                error!(group_id = group.id, %send_error, "report send failed");
            }
        }
        Ok(())
    }
}

/// Time until the next local occurrence of `at` in `zone`.
pub fn next_occurrence_delay(now: DateTime<Utc>, at: NaiveTime, zone: Tz) -> Duration {
    let local_now = now.with_timezone(&zone);
    let mut date = local_now.date_naive();
    if local_now.time() >= at {
        date += ChronoDuration::days(1);
    }

    // On DST gaps take the earliest valid instant of that wall-clock time.
    let target = date
        .and_time(at)
        .and_local_timezone(zone)
        .earliest()
        .unwrap_or_else(|| {
            (date.and_time(at) + ChronoDuration::hours(1))
                .and_local_timezone(zone)
                .unwrap()
        });

    (target.with_timezone(&Utc) - now)
        .to_std()
        .unwrap_or(Duration::from_secs(60))
}

/// Plain-text summary for one group.
pub fn format_report(group_name: &str, stats: &DailyStats) -> String {
    let mut lines = vec![
        format!("📊 Rapport du {} — {}", stats.date.format("%d/%m/%Y"), group_name),
        format!("Total livraisons: {}", stats.total),
    ];
    for (status, count) in &stats.by_status {
        if *count > 0 {
            lines.push(format!("  {}: {}", status, count));
        }
    }
    lines.push(format!("Encaissé: {} FCFA", stats.collected));
    lines.push(format!("Restant: {} FCFA", stats.remaining));
    lines.push(format!("Attendu: {} FCFA", stats.due));
    lines.join("\n")
}
