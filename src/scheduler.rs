use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Days, NaiveTime, Utc, Weekday};
use log::{error, info};

use crate::clients::SongSource;
use crate::refresh::Refresher;

/// Something that says when the next refresh is due
pub trait Trigger: Send + 'static {
    /// Resolves when a run is due. `false` ends the schedule.
    fn tick(&mut self) -> impl Future<Output = bool> + Send;
}

/// Fires once a week on `weekday` at `time` (UTC)
#[derive(Debug, Clone, Copy)]
pub struct WeeklyTrigger {
    weekday: Weekday,
    time: NaiveTime,
}

impl WeeklyTrigger {
    pub fn new(weekday: Weekday, time: NaiveTime) -> Self {
        WeeklyTrigger { weekday, time }
    }

    /// First matching instant strictly after `now`
    pub fn next_run_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let days_ahead = (7 + self.weekday.num_days_from_monday()
            - now.weekday().num_days_from_monday())
            % 7;
        let date = now.date_naive() + Days::new(u64::from(days_ahead));
        let candidate = date.and_time(self.time).and_utc();
        if candidate > now {
            candidate
        } else {
            candidate + Days::new(7)
        }
    }
}

impl Default for WeeklyTrigger {
    fn default() -> Self {
        WeeklyTrigger::new(Weekday::Wed, NaiveTime::MIN)
    }
}

impl Trigger for WeeklyTrigger {
    async fn tick(&mut self) -> bool {
        let now = Utc::now();
        let next = self.next_run_after(now);
        info!("Next billboard update scheduled for {next}");
        let wait = (next - now).to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;
        true
    }
}

/// Cold fill (optional), then one refresh per trigger tick until the trigger is exhausted.
/// A failed run is logged and the schedule carries on with stale data.
pub async fn run_schedule<S, T>(refresher: Arc<Refresher<S>>, mut trigger: T, initial_refresh: bool)
where
    S: SongSource,
    T: Trigger,
{
    if initial_refresh {
        run_once(&refresher).await;
    }
    while trigger.tick().await {
        run_once(&refresher).await;
    }
    info!("Billboard schedule stopped");
}

async fn run_once<S: SongSource>(refresher: &Refresher<S>) {
    if let Err(e) = refresher.refresh().await {
        error!("Billboard update failed, keeping previous data: {e}");
    }
}
