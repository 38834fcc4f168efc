// HTTP request handlers
use crate::domain::completion::{self, CompletionStatus};
use crate::domain::session::RequestContext;
use crate::domain::timer::{TimerServiceItem, TimerSnapshot};
use crate::infrastructure::chunked_json::chunked_json_stream;
use crate::infrastructure::http_response::{accepts_brotli, json_response};
use crate::presentation::app_state::AppState;
use crate::presentation::errors::ApiError;
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Response,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
pub struct DateQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct EvaluateTimersRequest {
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
    pub items: Vec<TimerServiceItem>,
}

#[derive(Deserialize)]
pub struct ClassifyCompletionRequest {
    pub expected_minutes: i64,
    pub actual_minutes: i64,
    #[serde(default)]
    pub has_completion_signal: bool,
}

#[derive(Serialize)]
pub struct ClassifyCompletionResponse {
    pub status: CompletionStatus,
}

#[derive(Serialize)]
pub struct AutoApproveResponse {
    pub approved: u64,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Evaluate elapsed time and status for a set of service lines
pub async fn evaluate_timers(Json(request): Json<EvaluateTimersRequest>) -> Json<TimerSnapshot> {
    let now = request.now.unwrap_or_else(Utc::now);
    Json(TimerSnapshot::evaluate(&request.items, now))
}

pub async fn classify_completion(
    Json(request): Json<ClassifyCompletionRequest>,
) -> Json<ClassifyCompletionResponse> {
    let status = completion::classify_completion(
        request.expected_minutes,
        request.actual_minutes,
        request.has_completion_signal,
    );
    Json(ClassifyCompletionResponse { status })
}

/// Per-technician ticket grid for one business date
pub async fn daily_detail(
    ctx: RequestContext,
    Query(query): Query<DateQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let now = Utc::now();
    let date = query
        .date
        .unwrap_or_else(|| state.report_service.business_date(now));

    let details = state.report_service.daily_detail(&ctx, date, now).await?;
    Ok(json_response(&details, accepts_brotli(&headers)).await?)
}

pub async fn tip_report(
    ctx: RequestContext,
    Query(query): Query<DateQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let today = state.report_service.business_date(Utc::now());
    let date = query.date.unwrap_or(today);

    let report = state.report_service.tip_report(&ctx, date, today).await?;
    Ok(json_response(&report, accepts_brotli(&headers)).await?)
}

pub async fn auto_approve(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
) -> Result<Json<AutoApproveResponse>, ApiError> {
    let approved = state.report_service.trigger_auto_approval(&ctx).await?;
    Ok(Json(AutoApproveResponse { approved }))
}

/// Stream timer snapshots for a ticket as NDJSON until its timers stop
pub async fn stream_ticket_timers(
    ctx: RequestContext,
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let stream = state.timer_stream_service.stream_ticket_timers(&ctx, &id).await?;
    Ok(chunked_json_stream(stream)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::report_service::{ReportService, ReportSettings};
    use crate::application::ticket_repository::TicketRepository;
    use crate::application::timer_stream_service::TimerStreamService;
    use crate::domain::ticket::fixtures::{at, item, ticket};
    use crate::domain::ticket::SaleTicket;
    use crate::presentation::context::{EMPLOYEE_ID_HEADER, ROLES_HEADER, STORE_ID_HEADER};
    use crate::presentation::router;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    struct FakeRepository {
        tickets: Vec<SaleTicket>,
    }

    #[async_trait]
    impl TicketRepository for FakeRepository {
        async fn tickets_for_date(&self, _store_id: &str, _date: NaiveDate) -> anyhow::Result<Vec<SaleTicket>> {
            Ok(self.tickets.clone())
        }

        async fn ticket_by_id(&self, store_id: &str, ticket_id: &str) -> anyhow::Result<Option<SaleTicket>> {
            Ok(self
                .tickets
                .iter()
                .find(|t| t.id == ticket_id && t.store_id == store_id)
                .cloned())
        }

        async fn run_auto_approval(&self, _source: &str) -> anyhow::Result<u64> {
            Ok(3)
        }
    }

    fn app() -> axum::Router {
        let mut finished = item("i1", "e-ana", "Ana", 30.0);
        finished.started_at = Some(at(10, 0));
        finished.completed_at = Some(at(10, 32));

        let repo = Arc::new(FakeRepository {
            tickets: vec![ticket(
                "t1",
                at(10, 0),
                vec![finished, item("i2", "e-bo", "Bo", 45.0)],
            )],
        });

        router(Arc::new(AppState {
            report_service: ReportService::new(repo.clone(), ReportSettings::default()),
            timer_stream_service: TimerStreamService::new(repo, Duration::from_secs(1)),
        }))
    }

    fn get_as(uri: &str, employee_id: &str, roles: &str) -> Request<Body> {
        get_in_store(uri, "store-1", employee_id, roles)
    }

    fn get_in_store(uri: &str, store_id: &str, employee_id: &str, roles: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(STORE_ID_HEADER, store_id)
            .header(EMPLOYEE_ID_HEADER, employee_id)
            .header(ROLES_HEADER, roles)
            .body(Body::empty())
            .unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = app()
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_evaluate_timers() {
        let request = post_json(
            "/timers/evaluate",
            json!({
                "now": "2025-03-14T11:00:00Z",
                "items": [
                    { "started_at": "2025-03-14T10:00:00Z", "completed_at": "2025-03-14T10:20:00Z" },
                    { "started_at": "2025-03-14T10:15:00Z" },
                    {}
                ]
            }),
        );

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["total_minutes"], 65);
        assert_eq!(body["total_label"], "1h 5m");
        assert_eq!(body["any_active"], true);
        assert_eq!(body["items"][0]["status"], "stopped");
        assert_eq!(body["items"][1]["status"], "active");
        assert_eq!(body["items"][2]["status"], "none");
    }

    #[tokio::test]
    async fn test_classify_completion() {
        let cases = [
            (110, "on_time"),
            (111, "moderate_deviation"),
            (131, "extreme_deviation"),
        ];
        for (actual, expected) in cases {
            let request = post_json(
                "/completion/classify",
                json!({ "expected_minutes": 100, "actual_minutes": actual, "has_completion_signal": true }),
            );
            let body = body_json(app().oneshot(request).await.unwrap()).await;
            assert_eq!(body["status"], expected, "actual {}", actual);
        }

        let request = post_json(
            "/completion/classify",
            json!({ "expected_minutes": 100, "actual_minutes": 100 }),
        );
        let body = body_json(app().oneshot(request).await.unwrap()).await;
        assert_eq!(body["status"], "unknown");
    }

    #[tokio::test]
    async fn test_reports_require_caller_headers() {
        let request = Request::builder()
            .uri("/reports/daily-detail")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "missing x-store-id header");
    }

    #[tokio::test]
    async fn test_technician_daily_detail_is_scoped() {
        let response = app()
            .oneshot(get_as("/reports/daily-detail?date=2025-03-14", "e-bo", "Technician"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["technician_id"], "e-bo");
    }

    #[tokio::test]
    async fn test_cashier_is_denied_tip_report() {
        let response = app()
            .oneshot(get_as("/reports/tips", "e-cash", "Cashier"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_json(response).await["error"],
            "not permitted to view the tip report"
        );
    }

    #[tokio::test]
    async fn test_malformed_date_is_bad_request() {
        let response = app()
            .oneshot(get_as("/reports/tips?date=yesterday", "e-own", "Owner"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_auto_approve() {
        let mut request = get_as("/tickets/auto-approve", "e-mgr", "Manager");
        *request.method_mut() = axum::http::Method::POST;

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["approved"], 3);
    }

    #[tokio::test]
    async fn test_timer_stream_emits_ndjson_until_complete() {
        let response = app()
            .oneshot(get_as("/tickets/t1/timers/stream", "e-desk", "Receptionist"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/x-ndjson");

        let lines = stream_lines(response).await;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["snapshot"]["items"].as_array().unwrap().len(), 2);
        assert_eq!(lines[0]["type"], "snapshot");
        assert_eq!(lines[0]["snapshot"]["total_minutes"], 32);
        assert_eq!(lines[1]["type"], "complete");
        assert_eq!(lines[1]["ticks"], 1);
    }

    async fn stream_lines(response: Response) -> Vec<Value> {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        std::str::from_utf8(&bytes)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_timer_stream_for_unknown_ticket() {
        let response = app()
            .oneshot(get_as("/tickets/zzz/timers/stream", "e-desk", "Receptionist"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "ticket zzz not found");
    }

    #[tokio::test]
    async fn test_timer_stream_of_another_store_is_not_found() {
        let response = app()
            .oneshot(get_in_store("/tickets/t1/timers/stream", "store-9", "e-other", "Technician"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app()
            .oneshot(get_in_store("/tickets/t1/timers/stream", "store-9", "e-own", "Owner"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_timer_stream_shows_technician_only_own_lines() {
        let response = app()
            .oneshot(get_as("/tickets/t1/timers/stream", "e-ana", "Technician"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let lines = stream_lines(response).await;
        assert_eq!(lines[0]["type"], "snapshot");
        assert_eq!(lines[0]["snapshot"]["items"].as_array().unwrap().len(), 1);
        assert_eq!(lines[0]["snapshot"]["total_minutes"], 32);

        let response = app()
            .oneshot(get_as("/tickets/t1/timers/stream", "e-other", "Technician"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
