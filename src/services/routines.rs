use crate::api::backend::RowStore;
use crate::api::models::{NewRoutineBlock, ROUTINE_BLOCKS, RoutineBlock, RoutineStatus, RoutineUpdate};
use crate::api::query::{Order, Query};
use crate::error::ApiError;
use crate::services::messages::decode_rows;
use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use std::sync::Arc;

/// Routine blocks a coach schedules for their clients.
pub struct RoutineService<B> {
    backend: Arc<B>,
}

impl<B> Clone for RoutineService<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

/// UTC bounds `[start, end)` of `date` as seen in `tz`.
pub fn day_bounds<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let next = date.checked_add_days(Days::new(1))?;
    let start = tz.from_local_datetime(&date.and_hms_opt(0, 0, 0)?).earliest()?;
    let end = tz.from_local_datetime(&next.and_hms_opt(0, 0, 0)?).earliest()?;
    Some((start.with_timezone(&Utc), end.with_timezone(&Utc)))
}

impl<B: RowStore> RoutineService<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Blocks starting on `date` (local to `tz`), in start order.
    pub async fn list_for_day<Tz: TimeZone>(
        &self,
        coach_id: &str,
        date: NaiveDate,
        tz: &Tz,
    ) -> Result<Vec<RoutineBlock>, ApiError> {
        let Some((start, end)) = day_bounds(date, tz) else {
            return Ok(Vec::new());
        };
        let query = Query::new()
            .eq("coach_id", coach_id)
            .gte("start_time", start.to_rfc3339())
            .lt("start_time", end.to_rfc3339())
            .order("start_time", Order::Asc);
        decode_rows(self.backend.select(ROUTINE_BLOCKS, &query).await?)
    }

    pub async fn create(&self, block: &NewRoutineBlock) -> Result<RoutineBlock, ApiError> {
        let row = self
            .backend
            .insert(ROUTINE_BLOCKS, serde_json::to_value(block)?)
            .await?;
        Ok(serde_json::from_value(row)?)
    }

    pub async fn update(&self, id: &str, patch: &RoutineUpdate) -> Result<RoutineBlock, ApiError> {
        let query = Query::new().eq("id", id);
        let rows = self
            .backend
            .update(ROUTINE_BLOCKS, &query, serde_json::to_value(patch)?)
            .await?;
        decode_rows::<RoutineBlock>(rows)?
            .into_iter()
            .next()
            .ok_or(ApiError::MissingRow("routine update"))
    }

    pub async fn set_status(&self, id: &str, status: RoutineStatus) -> Result<RoutineBlock, ApiError> {
        let patch = RoutineUpdate {
            status: Some(status),
            ..RoutineUpdate::default()
        };
        self.update(id, &patch).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.backend.delete(ROUTINE_BLOCKS, &Query::new().eq("id", id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::EffortLevel;
    use crate::testing::FakeBackend;
    use chrono::FixedOffset;
    use serde_json::json;

    fn block_row(id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "coach_id": "coach-1",
            "client_id": "client-9",
            "title": "Intervals",
            "type": "cardio",
            "effort_level": "medium",
            "status": "pending",
            "start_time": "2025-01-31T07:00:00Z",
            "end_time": "2025-01-31T07:40:00Z"
        })
    }

    #[test]
    fn day_bounds_follow_the_local_zone() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        let (start, end) = day_bounds(date, &Utc).unwrap();
        assert_eq!(start.to_rfc3339(), "2025-01-31T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2025-02-01T00:00:00+00:00");

        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let (start, _) = day_bounds(date, &plus_two).unwrap();
        assert_eq!(start.to_rfc3339(), "2025-01-30T22:00:00+00:00");
    }

    #[tokio::test]
    async fn lists_one_day_in_start_order() {
        let backend = Arc::new(FakeBackend::new().with_rows(ROUTINE_BLOCKS, vec![block_row("r1")]));
        let svc = RoutineService::new(Arc::clone(&backend));
        let date = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();

        let blocks = svc.list_for_day("coach-1", date, &Utc).await.unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].effort_level, EffortLevel::Medium);

        let call = &backend.calls_for("select")[0];
        let starts: Vec<_> = call.params.iter().filter(|(k, _)| k == "start_time").map(|(_, v)| v.as_str()).collect();
        assert_eq!(starts, ["gte.2025-01-31T00:00:00+00:00", "lt.2025-02-01T00:00:00+00:00"]);
        assert_eq!(call.param("order"), Some("start_time.asc"));
    }

    #[tokio::test]
    async fn set_status_patches_only_status() {
        let backend = Arc::new(FakeBackend::new().with_rows(ROUTINE_BLOCKS, vec![block_row("r1")]));
        let svc = RoutineService::new(Arc::clone(&backend));

        let updated = svc.set_status("r1", RoutineStatus::Completed).await.unwrap();
        assert_eq!(updated.status, RoutineStatus::Completed);

        let call = &backend.calls_for("update")[0];
        assert_eq!(call.param("id"), Some("eq.r1"));
        assert_eq!(call.body, Some(json!({ "status": "completed" })));
    }

    #[tokio::test]
    async fn update_of_missing_row_is_an_error() {
        let svc = RoutineService::new(Arc::new(FakeBackend::new()));
        assert!(matches!(
            svc.set_status("gone", RoutineStatus::Skipped).await,
            Err(ApiError::MissingRow(_))
        ));
    }

    #[tokio::test]
    async fn create_and_delete_hit_routine_table() {
        let backend = Arc::new(FakeBackend::new());
        let svc = RoutineService::new(Arc::clone(&backend));
        let new = NewRoutineBlock {
            coach_id: "coach-1".into(),
            client_id: None,
            title: "Mobility".into(),
            block_type: "recovery".into(),
            effort_level: EffortLevel::Low,
            status: RoutineStatus::Pending,
            start_time: "2025-01-31T18:00:00Z".parse().unwrap(),
            end_time: "2025-01-31T18:20:00Z".parse().unwrap(),
            location: Some("Home".into()),
            notes: None,
        };
        let created = svc.create(&new).await.unwrap();
        assert_eq!(created.id, "new-1");
        assert_eq!(created.location.as_deref(), Some("Home"));

        svc.delete("new-1").await.unwrap();
        let call = &backend.calls_for("delete")[0];
        assert_eq!(call.target, ROUTINE_BLOCKS);
        assert_eq!(call.param("id"), Some("eq.new-1"));
    }
}
