// REST surface over the mock API
//
// Thin axum router so the mock backend can be driven over HTTP. Every JSON
// reply uses the same envelope: { success, data, error }.

use crate::api::{ContributionAdded, ContributionRemoved, MockApi};
use crate::entities::*;
use crate::error::ApiError;
use crate::receipt::ReceiptPayload;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// API Response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// ApiError rendered as an HTTP response
pub struct ApiFailure(ApiError);

impl From<ApiError> for ApiFailure {
    fn from(err: ApiError) -> Self {
        ApiFailure(err)
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Failure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(self.0.to_string()),
        };
        (status, Json(body)).into_response()
    }
}

type Reply<T> = Result<Json<ApiResponse<T>>, ApiFailure>;

fn ok<T>(data: T) -> Reply<T> {
    Ok(Json(ApiResponse::ok(data)))
}

type AppState = Arc<MockApi>;

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/health
async fn health_check() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::ok("OK"))
}

async fn list_foranes(State(api): State<AppState>) -> Reply<Vec<Forane>> {
    ok(api.fetch_foranes().await?)
}

async fn create_forane(State(api): State<AppState>, Json(req): Json<NewForane>) -> Reply<Forane> {
    ok(api.add_forane(req).await?)
}

async fn edit_forane(State(api): State<AppState>, Path(id): Path<u64>, Json(patch): Json<ForanePatch>) -> Reply<Forane> {
    ok(api.update_forane(id, patch).await?)
}

async fn remove_forane(State(api): State<AppState>, Path(id): Path<u64>) -> Reply<u64> {
    ok(api.delete_forane(id).await?)
}

#[derive(Debug, Deserialize)]
struct ParishFilter {
    forane_id: Option<u64>,
}

async fn list_parishes(State(api): State<AppState>, Query(filter): Query<ParishFilter>) -> Reply<Vec<Parish>> {
    ok(api.fetch_parishes(filter.forane_id).await?)
}

async fn create_parish(State(api): State<AppState>, Json(req): Json<NewParish>) -> Reply<Parish> {
    ok(api.add_parish(req).await?)
}

async fn edit_parish(State(api): State<AppState>, Path(id): Path<u64>, Json(patch): Json<ParishPatch>) -> Reply<Parish> {
    ok(api.update_parish(id, patch).await?)
}

async fn remove_parish(State(api): State<AppState>, Path(id): Path<u64>) -> Reply<u64> {
    ok(api.delete_parish(id).await?)
}

async fn list_communities(State(api): State<AppState>, Path((kind, id)): Path<(String, u64)>) -> Reply<Vec<Community>> {
    let parent = ParentRef { kind: kind.parse()?, id };
    ok(api.fetch_communities(parent).await?)
}

async fn create_community(State(api): State<AppState>, Json(req): Json<NewCommunity>) -> Reply<Community> {
    ok(api.add_community(req).await?)
}

async fn edit_community(
    State(api): State<AppState>,
    Path(id): Path<u64>,
    Json(patch): Json<CommunityPatch>,
) -> Reply<Community> {
    ok(api.update_community(id, patch).await?)
}

async fn remove_community(State(api): State<AppState>, Path(id): Path<u64>) -> Reply<u64> {
    ok(api.delete_community(id).await?)
}

async fn list_families(State(api): State<AppState>, Path(community_id): Path<u64>) -> Reply<Vec<Family>> {
    ok(api.fetch_families(community_id).await?)
}

async fn create_family(State(api): State<AppState>, Json(req): Json<NewFamily>) -> Reply<Family> {
    ok(api.add_family(req).await?)
}

async fn edit_family(State(api): State<AppState>, Path(id): Path<u64>, Json(patch): Json<FamilyPatch>) -> Reply<Family> {
    ok(api.update_family(id, patch).await?)
}

async fn remove_family(State(api): State<AppState>, Path(id): Path<u64>) -> Reply<u64> {
    ok(api.delete_family(id).await?)
}

async fn list_individuals(State(api): State<AppState>) -> Reply<Vec<Individual>> {
    ok(api.fetch_individuals().await?)
}

async fn create_individual(State(api): State<AppState>, Json(req): Json<NewIndividual>) -> Reply<Individual> {
    ok(api.add_individual(req).await?)
}

async fn edit_individual(
    State(api): State<AppState>,
    Path(id): Path<u64>,
    Json(patch): Json<IndividualPatch>,
) -> Reply<Individual> {
    ok(api.update_individual(id, patch).await?)
}

async fn remove_individual(State(api): State<AppState>, Path(id): Path<u64>) -> Reply<u64> {
    ok(api.delete_individual(id).await?)
}

async fn list_institutions(State(api): State<AppState>) -> Reply<Vec<Institution>> {
    ok(api.fetch_institutions().await?)
}

async fn create_institution(State(api): State<AppState>, Json(req): Json<NewInstitution>) -> Reply<Institution> {
    ok(api.add_institution(req).await?)
}

async fn edit_institution(
    State(api): State<AppState>,
    Path(id): Path<u64>,
    Json(patch): Json<InstitutionPatch>,
) -> Reply<Institution> {
    ok(api.update_institution(id, patch).await?)
}

async fn remove_institution(State(api): State<AppState>, Path(id): Path<u64>) -> Reply<u64> {
    ok(api.delete_institution(id).await?)
}

async fn list_contributions(
    State(api): State<AppState>,
    Path((kind, id)): Path<(String, u64)>,
) -> Reply<Vec<Contribution>> {
    let owner = ContributionOwner::parse(&kind, id)?;
    ok(api.fetch_contributions(owner).await?)
}

async fn create_contribution(State(api): State<AppState>, Json(req): Json<NewContribution>) -> Reply<ContributionAdded> {
    ok(api.add_contribution(req).await?)
}

async fn remove_contribution(State(api): State<AppState>, Path(id): Path<u64>) -> Reply<ContributionRemoved> {
    ok(api.delete_contribution(id).await?)
}

/// GET /api/receipt/contribution/:id - printable HTML receipt
async fn contribution_receipt(State(api): State<AppState>, Path(id): Path<u64>) -> Result<Html<String>, ApiFailure> {
    let contribution = api.get_contribution(id).await?;
    let contributor = api.contributor_name(contribution.owner).await?;
    let payload = ReceiptPayload::for_contribution(&contribution, &contributor, "Parish Office");
    let html = payload
        .render_html()
        .map_err(|e| ApiError::Failure(e.to_string()))?;
    Ok(Html(html))
}

/// Build the `/api` router
pub fn router(api: Arc<MockApi>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/foranes", get(list_foranes).post(create_forane))
        .route("/foranes/:id", put(edit_forane).delete(remove_forane))
        .route("/parishes", get(list_parishes).post(create_parish))
        .route("/parishes/:id", put(edit_parish).delete(remove_parish))
        .route("/communities", axum::routing::post(create_community))
        .route("/communities/:kind/:id", get(list_communities))
        .route("/community/:id", put(edit_community).delete(remove_community))
        .route("/families", axum::routing::post(create_family))
        .route("/families/:community_id", get(list_families))
        .route("/family/:id", put(edit_family).delete(remove_family))
        .route("/individuals", get(list_individuals).post(create_individual))
        .route("/individuals/:id", put(edit_individual).delete(remove_individual))
        .route("/institutions", get(list_institutions).post(create_institution))
        .route("/institutions/:id", put(edit_institution).delete(remove_institution))
        .route("/contributions", axum::routing::post(create_contribution))
        .route("/contributions/:kind/:id", get(list_contributions))
        .route("/contribution/:id", axum::routing::delete(remove_contribution))
        .route("/receipt/contribution/:id", get(contribution_receipt))
        .with_state(api)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Latency;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new().nest("/api", router(Arc::new(MockApi::seeded(Latency::none()))))
    }

    async fn call(app: Router, method: Method, uri: &str, body: Option<serde_json::Value>) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(match body {
                Some(json) => Body::from(json.to_string()),
                None => Body::empty(),
            })
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null))
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = call(app(), Method::GET, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], "OK");
    }

    #[tokio::test]
    async fn test_list_parishes_with_filter() {
        let (status, body) = call(app(), Method::GET, "/api/parishes?forane_id=1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["name"], "St Mary's");
    }

    #[tokio::test]
    async fn test_create_community_auto_number() {
        let (status, body) = call(
            app(),
            Method::POST,
            "/api/communities",
            Some(serde_json::json!({"name": "St Jude", "parent": {"kind": "parish", "id": 1}})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["number"], 3);
        assert_eq!(body["data"]["id"], 5);
    }

    #[tokio::test]
    async fn test_unknown_parent_kind_is_bad_request() {
        let (status, body) = call(app(), Method::GET, "/api/communities/diocese/1", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let (status, body) = call(app(), Method::DELETE, "/api/family/99", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Family not found");
    }

    #[tokio::test]
    async fn test_add_contribution_over_http() {
        let (status, body) = call(
            app(),
            Method::POST,
            "/api/contributions",
            Some(serde_json::json!({"owner": {"kind": "family", "id": 3}, "amount": 500.0, "purpose": "Feast"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["owner_total"], "Rs. 500");
    }

    #[tokio::test]
    async fn test_receipt_html() {
        let request = Request::builder()
            .uri("/api/receipt/contribution/1")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("Kallarackal (Mathew)"));
        assert!(html.contains("Rs. 1,000.00"));
    }
}
