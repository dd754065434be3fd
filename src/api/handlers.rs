// HTTP request handlers for API endpoints

use actix_web::{http::StatusCode, web, HttpResponse, Result};
use chrono::{DateTime, Utc};

use crate::api::models::*;
use crate::diamonds::{refine, DiamondError, FilterCriteria, NivodaClient, RefineCriteria};

/// Shared per-server state. Cloned into every worker through `web::Data`.
pub struct AppState {
    pub client: NivodaClient,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(client: NivodaClient) -> Self {
        Self {
            client,
            started_at: Utc::now(),
        }
    }
}

/// Status code for each failure class.
pub fn status_for(err: &DiamondError) -> StatusCode {
    match err {
        DiamondError::InvalidArgument { .. } => StatusCode::BAD_REQUEST,
        DiamondError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        DiamondError::AuthenticationFailure(_)
        | DiamondError::UpstreamError { .. }
        | DiamondError::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
        DiamondError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
    }
}

pub fn error_response(err: &DiamondError) -> HttpResponse {
    let mut detail = ErrorDetail::new(err.code(), err.to_string());
    if let DiamondError::InvalidArgument { field, .. } = err {
        detail.field = Some((*field).to_string());
    }
    HttpResponse::build(status_for(err)).json(ApiResponse::<()>::error(detail))
}

/// Liveness. Never calls upstream.
pub async fn health_check(state: web::Data<AppState>) -> Result<HttpResponse> {
    let token_cached = state.client.token_expires_at().await.is_some();
    let uptime = (Utc::now() - state.started_at).num_seconds().max(0) as u64;

    let response = ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        token_cached,
        uptime_seconds: uptime,
    });

    Ok(HttpResponse::Ok().json(response))
}

/// Run one upstream search page, optionally re-sorted for display.
pub async fn search_diamonds(
    payload: web::Json<SearchRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let SearchRequest { filter, sort } = payload.into_inner();

    let criteria = match FilterCriteria::try_from(filter) {
        Ok(c) => c,
        Err(e) => {
            tracing::info!(error = %e, "Rejected diamond search request");
            return Ok(error_response(&e));
        }
    };

    match state.client.search(&criteria).await {
        Ok(mut result) => {
            if let Some(order) = sort {
                result.items = refine(&result.items, &RefineCriteria::default(), order);
            }
            Ok(HttpResponse::Ok().json(ApiResponse::success(result)))
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                shape = %criteria.shape(),
                auth = e.is_authorization(),
                "Diamond search failed"
            );
            Ok(error_response(&e))
        }
    }
}

/// Narrow and reorder a batch the caller already holds.
pub async fn refine_diamonds(payload: web::Json<RefineRequest>) -> Result<HttpResponse> {
    let RefineRequest {
        items,
        criteria,
        sort,
    } = payload.into_inner();

    let refined = refine(&items, &criteria, sort);
    tracing::debug!(input = items.len(), output = refined.len(), "Refined diamond batch");

    let response = ApiResponse::success(RefineResponse {
        count: refined.len(),
        items: refined,
    });
    Ok(HttpResponse::Ok().json(response))
}

/// JSON bodies that fail to deserialize get the standard error envelope.
pub fn json_error_handler(
    err: actix_web::error::JsonPayloadError,
    _req: &actix_web::HttpRequest,
) -> actix_web::Error {
    let detail = ErrorDetail::new("invalid_body", err.to_string());
    let response = HttpResponse::BadRequest().json(ApiResponse::<()>::error(detail));
    actix_web::error::InternalError::from_response(err, response).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::routes::configure_routes;
    use crate::diamonds::testing::{FakeClock, ScriptedTransport};
    use crate::diamonds::{Credentials, NivodaConfig};
    use actix_web::{test, App};
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn auth_ok() -> Value {
        json!({ "data": { "authenticate": { "username_and_password": { "token": "tok" } } } })
    }

    fn page(items: Value) -> Value {
        json!({ "data": { "as": { "diamonds_by_query": { "items": items, "total_count": 2 } } } })
    }

    fn state(transport: Arc<ScriptedTransport>) -> web::Data<AppState> {
        let cfg = NivodaConfig::for_endpoint("http://nivoda.test/graphql")
            .with_credentials(Credentials::new("user", "pass"));
        let client = NivodaClient::with_parts(cfg, transport, Arc::new(FakeClock::default()));
        web::Data::new(AppState::new(client))
    }

    #[actix_web::test]
    async fn missing_shape_is_bad_request_without_upstream_call() {
        let transport = Arc::new(ScriptedTransport::new());
        let app = test::init_service(
            App::new()
                .app_data(state(transport.clone()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/diamonds/search")
            .set_json(json!({ "carat_min": 1.0 }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 400);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["error"]["code"], json!("invalid_argument"));
        assert_eq!(body["error"]["field"], json!("shape"));
        assert!(transport.requests().is_empty());
    }

    #[actix_web::test]
    async fn search_applies_requested_sort() {
        let transport = Arc::new(
            ScriptedTransport::new().reply(200, auth_ok()).reply(
                200,
                page(json!([
                    { "id": "small", "price": 500.0,
                      "diamond": { "image": "https://img/s.jpg",
                                   "certificate": { "carats": 0.5 } } },
                    { "id": "big", "price": 900.0,
                      "diamond": { "image": "https://img/b.jpg",
                                   "certificate": { "carats": 1.5 } } }
                ])),
            ),
        );
        let app = test::init_service(
            App::new()
                .app_data(state(transport.clone()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/diamonds/search")
            .set_json(json!({
                "shape": "round",
                "limit": 10,
                "sort": { "key": "carat", "direction": "desc" }
            }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 200);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["data"]["items"][0]["id"], json!("big"));
        assert_eq!(body["data"]["items"][1]["id"], json!("small"));
        assert_eq!(body["data"]["total_count"], json!(2));
        assert_eq!(body["data"]["has_more"], json!(false));

        let sent = &transport.requests()[1].body;
        assert_eq!(sent["variables"]["limit"], json!(10));
        assert_eq!(sent["variables"]["query"]["shapes"], json!("ROUND"));
    }

    #[actix_web::test]
    async fn upstream_failure_maps_to_bad_gateway() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .reply(200, auth_ok())
                .reply(500, json!({ "message": "boom" })),
        );
        let app = test::init_service(
            App::new()
                .app_data(state(transport))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/diamonds/search")
            .set_json(json!({ "shape": "oval" }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 502);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["error"]["code"], json!("upstream_error"));
    }

    #[actix_web::test]
    async fn refine_filters_locally() {
        let transport = Arc::new(ScriptedTransport::new());
        let app = test::init_service(
            App::new()
                .app_data(state(transport.clone()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/diamonds/refine")
            .set_json(json!({
                "items": [
                    { "id": "a", "price": 2000.0, "diamond": { "certificate": { "cut": "EX" } } },
                    { "id": "b", "price": 1000.0, "diamond": { "certificate": { "cut": "VG" } } },
                    { "id": "c", "price": 1500.0,
                      "diamond": { "certificate": { "cut": "Excellent" } } }
                ],
                "criteria": { "cuts": ["Excellent"] }
            }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 200);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["data"]["count"], json!(2));
        assert_eq!(body["data"]["items"][0]["id"], json!("c"));
        assert_eq!(body["data"]["items"][1]["id"], json!("a"));
        assert!(transport.requests().is_empty());
    }

    #[actix_web::test]
    async fn unreadable_body_uses_error_envelope() {
        let app = test::init_service(
            App::new()
                .app_data(state(Arc::new(ScriptedTransport::new())))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/diamonds/refine")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 400);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["error"]["code"], json!("invalid_body"));
    }

    #[actix_web::test]
    async fn health_reports_without_touching_upstream() {
        let transport = Arc::new(ScriptedTransport::new());
        let app = test::init_service(
            App::new()
                .app_data(state(transport.clone()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 200);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["data"]["token_cached"], json!(false));
        assert!(transport.requests().is_empty());
    }

    #[actix_web::test]
    async fn status_mapping() {
        use std::time::Duration;
        assert_eq!(
            status_for(&DiamondError::invalid("shape", "missing")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&DiamondError::Configuration("no creds".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&DiamondError::AuthenticationFailure("bad".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&DiamondError::Timeout(Duration::from_secs(1))),
            StatusCode::GATEWAY_TIMEOUT
        );
    }
}
