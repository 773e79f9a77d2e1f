use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, patch, post},
};
use proto::sso::v1::{
    Empty, GetByIdRequest, LoginRequest as SsoLoginRequest, RefreshRequest as SsoRefreshRequest,
    RegisterRequest as SsoRegisterRequest, UpdateRequest as SsoUpdateRequest,
    sso_service_client::SsoServiceClient,
};
use serde::{Deserialize, Serialize};
use tonic::{Request as RpcRequest, transport::Channel};

use crate::error::ApiError;

const RPC_TIMEOUT: Duration = Duration::from_secs(10);
const SESSION_COOKIE: &str = "session";

#[derive(Clone)]
pub struct AppState {
    sso: SsoServiceClient<Channel>,
}

impl AppState {
    pub fn new(sso: SsoServiceClient<Channel>) -> Self {
        Self { sso }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/register", post(register))
        .route("/api/v1/login", post(login))
        .route("/api/v1/refresh", post(refresh))
        .route("/api/v1/user", patch(update_user).get(get_self))
        .route("/api/v1/user/:id", get(get_user_by_id))
        .with_state(state)
}

#[derive(Deserialize)]
struct RegisterBody {
    email: String,
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct RefreshBody {
    refresh_token: String,
}

#[derive(Deserialize)]
struct UpdateBody {
    username: String,
}

#[derive(Serialize)]
struct TokenResponse {
    access: String,
    refresh: String,
}

#[derive(Serialize)]
struct UserResponse {
    id: String,
    email: String,
    username: String,
}

/// Every handler below mirrors one method of
/// `rest-gateway/internal/application/services/service.go`'s
/// `restGatewayService`, including its gateway-side timeout short-circuit
/// (`if err := ctx.Err(); err != nil { return ..., http.StatusGatewayTimeout, err }`),
/// expressed here as a bounded deadline on the outbound RPC.
async fn call_with_timeout<F, T>(future: F) -> Result<T, ApiError>
where
    F: std::future::Future<Output = Result<T, tonic::Status>>,
{
    match tokio::time::timeout(RPC_TIMEOUT, future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(status)) => Err(ApiError::from_status(status)),
        Err(_) => Err(ApiError::GatewayTimeout(
            "upstream request timed out".to_string(),
        )),
    }
}

fn session_cookie(headers: &HeaderMap) -> Result<String, ApiError> {
    let cookie_header = headers
        .get(axum::http::header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("invalid token".to_string()))?;

    cookie_header
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix(&format!("{SESSION_COOKIE}=")))
        .map(ToString::to_string)
        .ok_or_else(|| ApiError::Unauthorized("invalid token".to_string()))
}

fn with_session<T>(mut request: RpcRequest<T>, session: &str) -> RpcRequest<T> {
    request
        .metadata_mut()
        .insert("session", session.parse().unwrap());
    request
}

async fn register(
    State(mut state): State<AppState>,
    Json(body): Json<RegisterBody>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    let token = call_with_timeout(
        state.sso.register(SsoRegisterRequest {
            email: body.email,
            username: body.username,
            password: body.password,
        }),
    )
    .await?
    .into_inner();

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            access: token.access,
            refresh: token.refresh,
        }),
    ))
}

async fn login(
    State(mut state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = call_with_timeout(state.sso.login(SsoLoginRequest {
        email: body.email,
        password: body.password,
    }))
    .await?
    .into_inner();

    Ok(Json(TokenResponse {
        access: token.access,
        refresh: token.refresh,
    }))
}

async fn refresh(
    State(mut state): State<AppState>,
    Json(body): Json<RefreshBody>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = call_with_timeout(state.sso.refresh(SsoRefreshRequest {
        refresh_token: body.refresh_token,
    }))
    .await?
    .into_inner();

    Ok(Json(TokenResponse {
        access: token.access,
        refresh: token.refresh,
    }))
}

async fn update_user(
    State(mut state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<UpdateBody>,
) -> Result<StatusCode, ApiError> {
    let session = session_cookie(&headers)?;
    let request = with_session(
        RpcRequest::new(SsoUpdateRequest {
            username: body.username,
        }),
        &session,
    );
    call_with_timeout(state.sso.update_user(request)).await?;
    Ok(StatusCode::OK)
}

async fn get_self(
    State(mut state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserResponse>, ApiError> {
    let session = session_cookie(&headers)?;
    let request = with_session(RpcRequest::new(Empty {}), &session);
    let user = call_with_timeout(state.sso.get_self(request)).await?.into_inner();

    Ok(Json(UserResponse {
        id: user.id,
        email: user.email,
        username: user.username,
    }))
}

async fn get_user_by_id(
    State(mut state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = call_with_timeout(state.sso.get_user_by_id(GetByIdRequest { user_id: id }))
        .await?
        .into_inner();

    Ok(Json(UserResponse {
        id: user.id,
        email: user.email,
        username: user.username,
    }))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use tonic::transport::Endpoint;
    use tower::ServiceExt;

    use super::*;

    fn test_router() -> Router {
        let channel = Endpoint::from_static("http://127.0.0.1:1").connect_lazy();
        build_router(AppState::new(SsoServiceClient::new(channel)))
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let app = test_router();
        let response = app
            .oneshot(axum::http::Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_user_without_session_cookie_is_unauthorized() {
        let app = test_router();
        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .method(axum::http::Method::PATCH)
                    .uri("/api/v1/user")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"username":"bob"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn session_cookie_is_parsed_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            "other=1; session=abc123; another=2".parse().unwrap(),
        );
        assert_eq!(session_cookie(&headers).unwrap(), "abc123");
    }

    #[test]
    fn missing_session_cookie_is_unauthorized() {
        let headers = HeaderMap::new();
        assert!(matches!(
            session_cookie(&headers),
            Err(ApiError::Unauthorized(_))
        ));
    }
}
