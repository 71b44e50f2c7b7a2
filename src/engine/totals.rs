use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use futures::future::try_join_all;
use serde::Deserialize;
use tracing::debug;

use crate::engine::query::{parse_date_range, present, PickupFilter};
use crate::error::{AppError, RepositoryError};
use crate::models::pickup::CourierId;
use crate::models::totals::{DetailedPickupTotals, PickupTotals, TimeFrame, TotalsWindow, STATUS_BUCKETS};
use crate::state::AppState;

pub const DEFAULT_TIME_FRAME: TimeFrame = TimeFrame::Month;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TotalsParams {
    pub time_frame: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Window bounds for `frame`, anchored to local midnight of `now` in `offset`.
///
/// Weeks start on Sunday.
pub fn window_for(
    frame: TimeFrame,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> Result<TotalsWindow, AppError> {
    let today = now.with_timezone(&offset).date_naive();

    let (start, end) = match frame {
        TimeFrame::Day => (Some(today), today.succ_opt()),
        TimeFrame::Week => {
            let back = i64::from(today.weekday().num_days_from_sunday());
            let start = today.checked_sub_signed(Duration::days(back));
            (start, start.and_then(|day| day.checked_add_signed(Duration::days(7))))
        }
        TimeFrame::Month => {
            let start = NaiveDate::from_ymd_opt(today.year(), today.month(), 1);
            let end = if today.month() == 12 {
                NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)
            } else {
                NaiveDate::from_ymd_opt(today.year(), today.month() + 1, 1)
            };
            (start, end)
        }
        TimeFrame::Year => (
            NaiveDate::from_ymd_opt(today.year(), 1, 1),
            NaiveDate::from_ymd_opt(today.year() + 1, 1, 1),
        ),
    };

    match (start, end) {
        (Some(start), Some(end)) => Ok(TotalsWindow {
            start: local_midnight(start, offset)?,
            end: local_midnight(end, offset)?,
        }),
        _ => Err(AppError::InvalidDateRange(format!(
            "{frame} window around {today} is out of range"
        ))),
    }
}

fn local_midnight(day: NaiveDate, offset: FixedOffset) -> Result<DateTime<Utc>, AppError> {
    offset
        .from_local_datetime(&day.and_time(NaiveTime::MIN))
        .single()
        .map(|instant| instant.with_timezone(&Utc))
        .ok_or_else(|| AppError::InvalidDateRange(format!("{day} is out of range")))
}

/// Explicit bounds win over `time_frame`; with neither, the default frame applies.
pub fn resolve_window(
    params: &TotalsParams,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> Result<(Option<TimeFrame>, TotalsWindow), AppError> {
    let start = present(&params.start_date);
    let end = present(&params.end_date);

    match (start, end) {
        (Some(_), Some(_)) => match parse_date_range(start, end, offset)? {
            (Some(start), Some(end)) => Ok((None, TotalsWindow { start, end })),
            _ => Err(AppError::InvalidDateRange(
                "start_date and end_date are both required".to_string(),
            )),
        },
        (Some(_), None) | (None, Some(_)) => Err(AppError::InvalidDateRange(
            "start_date and end_date must be given together".to_string(),
        )),
        (None, None) => {
            let frame = match present(&params.time_frame) {
                Some(raw) => raw.parse::<TimeFrame>().map_err(AppError::InvalidTimeFrame)?,
                None => DEFAULT_TIME_FRAME,
            };
            Ok((Some(frame), window_for(frame, now, offset)?))
        }
    }
}

pub async fn calculate_totals(
    state: &AppState,
    courier_id: CourierId,
    params: &TotalsParams,
) -> Result<PickupTotals, AppError> {
    let started = Instant::now();
    let (frame, window) =
        resolve_window(params, state.clock.now(), state.query_settings.utc_offset)?;
    let totals = totals_in_window(state, courier_id, frame, window).await;

    state
        .metrics
        .totals_latency_seconds
        .with_label_values(&["single"])
        .observe(started.elapsed().as_secs_f64());
    totals
}

/// Day, week, month and year totals, computed concurrently against one `now`.
pub async fn detailed_totals(
    state: &AppState,
    courier_id: CourierId,
) -> Result<DetailedPickupTotals, AppError> {
    let started = Instant::now();
    let now = state.clock.now();
    let offset = state.query_settings.utc_offset;

    let frame_totals = move |frame: TimeFrame| async move {
        let window = window_for(frame, now, offset)?;
        totals_in_window(state, courier_id, Some(frame), window).await
    };

    let joined = futures::try_join!(
        frame_totals(TimeFrame::Day),
        frame_totals(TimeFrame::Week),
        frame_totals(TimeFrame::Month),
        frame_totals(TimeFrame::Year),
    );

    state
        .metrics
        .totals_latency_seconds
        .with_label_values(&["detailed"])
        .observe(started.elapsed().as_secs_f64());
    let (day, week, month, year) = joined?;
    Ok(DetailedPickupTotals {
        day,
        week,
        month,
        year,
    })
}

async fn totals_in_window(
    state: &AppState,
    courier_id: CourierId,
    time_frame: Option<TimeFrame>,
    window: TotalsWindow,
) -> Result<PickupTotals, AppError> {
    let counts = try_join_all(STATUS_BUCKETS.into_iter().map(|(status, bucket)| {
        let filter = PickupFilter {
            courier_id: Some(courier_id),
            status: Some(status),
            created_within: Some(window),
            ..PickupFilter::default()
        };
        async move {
            let count = state.pickups.count(&filter).await?;
            Ok::<_, RepositoryError>((bucket.to_string(), count))
        }
    }));
    let balance = state.points.balance(courier_id, window.end);

    let (counts, balance) = futures::try_join!(counts, balance)?;
    let buckets: BTreeMap<String, u64> = counts.into_iter().collect();

    debug!(
        courier_id,
        start = %window.start,
        end = %window.end,
        "pickup totals computed"
    );

    Ok(PickupTotals {
        courier_id,
        time_frame,
        window,
        buckets,
        point_balance: balance.unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration as StdDuration;

    use async_trait::async_trait;
    use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
    use tokio::sync::Barrier;

    use super::{calculate_totals, detailed_totals, resolve_window, window_for, TotalsParams};
    use crate::clock::FixedClock;
    use crate::engine::query::{PickupFilter, PickupQuery, QuerySettings};
    use crate::error::{AppError, RepositoryError};
    use crate::models::pickup::{CourierId, PickupId, PickupPatch, PickupRequest, PickupStatus};
    use crate::models::totals::{TimeFrame, STATUS_BUCKETS};
    use crate::repository::{CourierPointsRepository, InMemoryStore, PickupRepository};
    use crate::state::AppState;

    fn now() -> DateTime<Utc> {
        // A Wednesday.
        Utc.with_ymd_and_hms(2024, 5, 15, 10, 30, 0).unwrap()
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn pickup(id: PickupId, courier_id: CourierId, status: PickupStatus, created_at: DateTime<Utc>) -> PickupRequest {
        PickupRequest {
            id,
            address: format!("Jl. Pahlawan {id}"),
            requested_at: created_at,
            status,
            courier_id: Some(courier_id),
            reason: (status == PickupStatus::Cancelled).then(|| "resident away".to_string()),
            waste_details: Vec::new(),
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn windows_follow_calendar_boundaries() {
        let day = window_for(TimeFrame::Day, now(), utc()).unwrap();
        assert_eq!(day.start, Utc.with_ymd_and_hms(2024, 5, 15, 0, 0, 0).unwrap());
        assert_eq!(day.end, Utc.with_ymd_and_hms(2024, 5, 16, 0, 0, 0).unwrap());

        let week = window_for(TimeFrame::Week, now(), utc()).unwrap();
        assert_eq!(week.start, Utc.with_ymd_and_hms(2024, 5, 12, 0, 0, 0).unwrap());
        assert_eq!(week.end - week.start, Duration::days(7));

        let month = window_for(TimeFrame::Month, now(), utc()).unwrap();
        assert_eq!(month.start, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        assert_eq!(month.end, Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());

        let year = window_for(TimeFrame::Year, now(), utc()).unwrap();
        assert_eq!(year.start, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(year.end, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn december_rolls_into_next_year() {
        let late = Utc.with_ymd_and_hms(2023, 12, 31, 23, 0, 0).unwrap();
        let month = window_for(TimeFrame::Month, late, utc()).unwrap();
        assert_eq!(month.end, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn windows_anchor_to_the_local_offset() {
        let jakarta = FixedOffset::east_opt(7 * 3600).unwrap();
        // 20:00 UTC on the 15th is already the 16th in UTC+7.
        let evening = Utc.with_ymd_and_hms(2024, 5, 15, 20, 0, 0).unwrap();
        let day = window_for(TimeFrame::Day, evening, jakarta).unwrap();
        assert_eq!(day.start, Utc.with_ymd_and_hms(2024, 5, 15, 17, 0, 0).unwrap());
    }

    #[test]
    fn explicit_bounds_override_time_frame() {
        let params = TotalsParams {
            time_frame: Some("day".into()),
            start_date: Some("2024-01-01".into()),
            end_date: Some("2024-03-31".into()),
        };
        let (frame, window) = resolve_window(&params, now(), utc()).unwrap();
        assert_eq!(frame, None);
        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn bad_windows_are_rejected() {
        let unknown = TotalsParams {
            time_frame: Some("decade".into()),
            ..TotalsParams::default()
        };
        assert!(matches!(
            resolve_window(&unknown, now(), utc()).unwrap_err(),
            AppError::InvalidTimeFrame(_)
        ));

        let lonely = TotalsParams {
            start_date: Some("2024-01-01".into()),
            ..TotalsParams::default()
        };
        assert!(matches!(
            resolve_window(&lonely, now(), utc()).unwrap_err(),
            AppError::InvalidDateRange(_)
        ));

        let reversed = TotalsParams {
            start_date: Some("2024-03-01".into()),
            end_date: Some("2024-01-01".into()),
            ..TotalsParams::default()
        };
        assert!(matches!(
            resolve_window(&reversed, now(), utc()).unwrap_err(),
            AppError::InvalidDateRange(_)
        ));
    }

    #[tokio::test]
    async fn monthly_totals_count_each_bucket() {
        let store = Arc::new(InMemoryStore::new());
        let this_month = Utc.with_ymd_and_hms(2024, 5, 3, 9, 0, 0).unwrap();
        let last_month = Utc.with_ymd_and_hms(2024, 4, 20, 9, 0, 0).unwrap();
        store.insert_pickup(pickup(1, 3, PickupStatus::Accepted, this_month));
        store.insert_pickup(pickup(2, 3, PickupStatus::Accepted, this_month));
        store.insert_pickup(pickup(3, 3, PickupStatus::Cancelled, this_month));
        store.insert_pickup(pickup(4, 3, PickupStatus::Completed, last_month));
        store.insert_pickup(pickup(5, 9, PickupStatus::Completed, this_month));
        store.record_points(3, last_month, 120);

        let state = AppState::in_memory(store, Arc::new(FixedClock(now())), QuerySettings::default());
        let totals = calculate_totals(
            &state,
            3,
            &TotalsParams {
                time_frame: Some("month".into()),
                ..TotalsParams::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(totals.buckets["total_delivered"], 2);
        assert_eq!(totals.buckets["total_cancelled"], 1);
        assert_eq!(totals.buckets["total_completed"], 0);
        assert_eq!(totals.count_for(PickupStatus::Requested), 0);
        assert_eq!(totals.point_balance, 120);
        assert_eq!(totals.time_frame, Some(TimeFrame::Month));
    }

    #[tokio::test]
    async fn courier_without_history_gets_zeroes() {
        let store = Arc::new(InMemoryStore::new());
        let state = AppState::in_memory(store, Arc::new(FixedClock(now())), QuerySettings::default());

        let totals = calculate_totals(&state, 42, &TotalsParams::default()).await.unwrap();

        assert_eq!(totals.buckets.len(), STATUS_BUCKETS.len());
        assert!(totals.buckets.values().all(|count| *count == 0));
        assert_eq!(totals.point_balance, 0);
    }

    /// Every `count` waits until all expected callers are in flight at once.
    struct RendezvousRepository {
        barrier: Barrier,
    }

    #[async_trait]
    impl PickupRepository for RendezvousRepository {
        async fn find_by_id(&self, _id: PickupId) -> Result<Option<PickupRequest>, RepositoryError> {
            Ok(None)
        }

        async fn find_many(&self, _query: &PickupQuery) -> Result<Vec<PickupRequest>, RepositoryError> {
            Ok(Vec::new())
        }

        async fn count(&self, _filter: &PickupFilter) -> Result<u64, RepositoryError> {
            self.barrier.wait().await;
            Ok(1)
        }

        async fn update(&self, id: PickupId, _patch: PickupPatch) -> Result<PickupRequest, RepositoryError> {
            Err(RepositoryError::NotFound(id))
        }
    }

    #[async_trait]
    impl CourierPointsRepository for RendezvousRepository {
        async fn balance(
            &self,
            _courier_id: CourierId,
            _before: DateTime<Utc>,
        ) -> Result<Option<i64>, RepositoryError> {
            Ok(Some(5))
        }
    }

    #[tokio::test]
    async fn detailed_totals_issue_every_window_concurrently() {
        let repo = Arc::new(RendezvousRepository {
            barrier: Barrier::new(4 * STATUS_BUCKETS.len()),
        });
        let store = Arc::new(InMemoryStore::new());
        let state = AppState::new(
            repo.clone(),
            repo,
            store.clone(),
            store.clone(),
            store,
            Arc::new(FixedClock(now())),
            QuerySettings::default(),
        );

        let detailed = tokio::time::timeout(StdDuration::from_secs(5), detailed_totals(&state, 3))
            .await
            .expect("window queries were serialized")
            .unwrap();

        assert_eq!(detailed.day.count_for(PickupStatus::Accepted), 1);
        assert_eq!(detailed.year.point_balance, 5);
        assert_eq!(detailed.week.time_frame, Some(TimeFrame::Week));
    }

    #[tokio::test]
    async fn detailed_windows_nest() {
        let store = Arc::new(InMemoryStore::new());
        store.insert_pickup(pickup(1, 3, PickupStatus::Completed, now()));
        for (id, created) in [
            (2, Utc.with_ymd_and_hms(2024, 5, 13, 8, 0, 0).unwrap()),
            (3, Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap()),
            (4, Utc.with_ymd_and_hms(2024, 2, 2, 8, 0, 0).unwrap()),
        ] {
            store.insert_pickup(pickup(id, 3, PickupStatus::Completed, created));
        }
        let state = AppState::in_memory(store, Arc::new(FixedClock(now())), QuerySettings::default());

        let detailed = detailed_totals(&state, 3).await.unwrap();

        assert_eq!(detailed.day.count_for(PickupStatus::Completed), 1);
        assert_eq!(detailed.week.count_for(PickupStatus::Completed), 2);
        assert_eq!(detailed.month.count_for(PickupStatus::Completed), 3);
        assert_eq!(detailed.year.count_for(PickupStatus::Completed), 4);
    }

    #[tokio::test]
    async fn balance_recorded_at_the_window_end_belongs_to_the_next_window() {
        let store = Arc::new(InMemoryStore::new());
        store.record_points(3, Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap(), 100);
        store.record_points(3, Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(), 999);
        let state = AppState::in_memory(store, Arc::new(FixedClock(now())), QuerySettings::default());

        let may = calculate_totals(&state, 3, &TotalsParams::default()).await.unwrap();

        assert_eq!(may.window.end, Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        assert_eq!(may.point_balance, 100);
    }

    /// Counting always fails, as when the backing store is unreachable.
    struct UnavailableRepository;

    #[async_trait]
    impl PickupRepository for UnavailableRepository {
        async fn find_by_id(&self, _id: PickupId) -> Result<Option<PickupRequest>, RepositoryError> {
            Err(RepositoryError::Backend("connection refused".into()))
        }

        async fn find_many(&self, _query: &PickupQuery) -> Result<Vec<PickupRequest>, RepositoryError> {
            Err(RepositoryError::Backend("connection refused".into()))
        }

        async fn count(&self, _filter: &PickupFilter) -> Result<u64, RepositoryError> {
            Err(RepositoryError::Backend("connection refused".into()))
        }

        async fn update(&self, _id: PickupId, _patch: PickupPatch) -> Result<PickupRequest, RepositoryError> {
            Err(RepositoryError::Backend("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn failed_totals_still_record_latency() {
        let store = Arc::new(InMemoryStore::new());
        let state = AppState::new(
            Arc::new(UnavailableRepository),
            store.clone(),
            store.clone(),
            store.clone(),
            store,
            Arc::new(FixedClock(now())),
            QuerySettings::default(),
        );

        let err = detailed_totals(&state, 3).await.unwrap_err();
        assert!(matches!(err, AppError::Repository(_)));
        let err = calculate_totals(&state, 3, &TotalsParams::default()).await.unwrap_err();
        assert!(matches!(err, AppError::Repository(_)));

        let latency = &state.metrics.totals_latency_seconds;
        assert_eq!(latency.with_label_values(&["detailed"]).get_sample_count(), 1);
        assert_eq!(latency.with_label_values(&["single"]).get_sample_count(), 1);
    }
}
