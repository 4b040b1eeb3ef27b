use chrono::{DateTime, Days, NaiveTime, Utc};
use tracing::{error, info};

use crate::pipeline::Pipeline;

/// Next UTC midnight strictly after `now`.
pub fn next_daily_run(now: DateTime<Utc>) -> DateTime<Utc> {
    let next_day = now.date_naive() + Days::new(1);
    next_day.and_time(NaiveTime::MIN).and_utc()
}

/// Run `pipeline` once per UTC day, forever.
///
/// Only the upcoming slot is ever scheduled, so slots missed while the process
/// was down or a run overran are skipped rather than replayed.
pub async fn run_daily(pipeline: &Pipeline) {
    loop {
        let now = Utc::now();
        let next = next_daily_run(now);
        let wait = (next - now).to_std().unwrap_or_default();

        info!(next_run = %next, "Waiting for next scheduled run");
        tokio::time::sleep(wait).await;

        match pipeline.run(Utc::now()).await {
            Ok(report) => info!(file = %report.file_name, "Scheduled run succeeded"),
            Err(e) => error!(error = %e, "Scheduled run failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{PipelineError, Result},
        model::WeatherReading,
        pipeline::{ProbePolicy, RetryPolicy},
        provider::WeatherProvider,
        sink::ObjectStoreSink,
    };
    use async_trait::async_trait;
    use chrono::TimeZone;
    use object_store::memory::InMemory;
    use std::{
        sync::{
            Arc,
            atomic::{AtomicU32, Ordering},
        },
        time::Duration,
    };

    #[derive(Debug)]
    struct NeverReady {
        pokes: Arc<AtomicU32>,
    }

    #[async_trait]
    impl WeatherProvider for NeverReady {
        async fn is_ready(&self) -> Result<bool> {
            self.pokes.fetch_add(1, Ordering::SeqCst);
            Ok(false)
        }

        async fn fetch(&self) -> Result<WeatherReading> {
            Err(PipelineError::Extraction("not expected".into()))
        }
    }

    #[test]
    fn next_run_is_following_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 11, 1, 10, 8, 54).unwrap();
        assert_eq!(next_daily_run(now), Utc.with_ymd_and_hms(2024, 11, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn exactly_midnight_schedules_the_next_day() {
        let now = Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap();
        assert_eq!(next_daily_run(now), Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn late_evening_rolls_over_month() {
        let now = Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap();
        assert_eq!(next_daily_run(now), Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_runs_do_not_stop_the_daily_loop() {
        let pokes = Arc::new(AtomicU32::new(0));
        let pipeline = Pipeline::new(
            "jakarta",
            Box::new(NeverReady { pokes: pokes.clone() }),
            vec![Box::new(ObjectStoreSink::with_store("bucket", Arc::new(InMemory::new())))],
            RetryPolicy { retries: 0, retry_delay: Duration::ZERO },
            ProbePolicy { poke_interval: Duration::ZERO, timeout: Duration::ZERO },
        );

        // Each slot is at most a day away, so three days cover at least two failed runs.
        let outcome =
            tokio::time::timeout(Duration::from_secs(3 * 86_400), run_daily(&pipeline)).await;

        assert!(outcome.is_err(), "the daily loop must never return");
        assert!(pokes.load(Ordering::SeqCst) >= 2);
    }
}
