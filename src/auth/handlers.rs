use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, instrument, warn};

use crate::{
    auth::{
        dto::{
            LoginRequest, LoginResponse, SignupCode, SignupRequest, SignupResponse, UserResponse,
            VerifyOtpCode, VerifyOtpRequest, VerifyOtpResponse,
        },
        jwt::AuthUser,
        repo::User,
        services::{self, AuthError, SignupOutcome, VerifyOtpOutcome},
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/verify-otp", post(verify_otp))
        .route("/auth/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

/// Validation failures are plain 400s; everything past validation comes back
/// as the `{success, code, ...}` envelope so the client can branch on `code`.
#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(mut payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), (StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();
    payload.name = payload.name.trim().to_string();

    if !services::is_valid_email(&payload.email) {
        warn!("signup with invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }
    if !services::is_valid_password(&payload.password) {
        warn!("signup with invalid password");
        return Err((
            StatusCode::BAD_REQUEST,
            "Password must be at least 8 characters and contain a letter and a digit".into(),
        ));
    }
    if payload.name.is_empty() {
        warn!("signup with empty name");
        return Err((StatusCode::BAD_REQUEST, "Name must not be empty".into()));
    }

    match services::signup(&state, &payload.email, &payload.name, &payload.password).await {
        Ok(SignupOutcome::OtpSent { user_id }) => Ok((
            StatusCode::OK,
            Json(SignupResponse {
                success: true,
                code: SignupCode::OtpSent,
                user_id: Some(user_id),
            }),
        )),
        Ok(SignupOutcome::EmailExistsVerified) => Ok((
            StatusCode::OK,
            Json(SignupResponse {
                success: false,
                code: SignupCode::EmailExistsVerified,
                user_id: None,
            }),
        )),
        Err(e) => {
            error!(error = %e, "signup failed");
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SignupResponse {
                    success: false,
                    code: SignupCode::InternalServerError,
                    user_id: None,
                }),
            ))
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(payload): Json<VerifyOtpRequest>,
) -> (StatusCode, Json<VerifyOtpResponse>) {
    match services::verify_otp(&state, payload.user_id, &payload.otp).await {
        Ok(VerifyOtpOutcome::UserCreated { token }) => (
            StatusCode::OK,
            Json(VerifyOtpResponse {
                success: true,
                code: VerifyOtpCode::UserCreated,
                token: Some(token),
            }),
        ),
        Ok(VerifyOtpOutcome::OtpExpired) => (
            StatusCode::OK,
            Json(VerifyOtpResponse {
                success: false,
                code: VerifyOtpCode::OtpExpired,
                token: None,
            }),
        ),
        Ok(VerifyOtpOutcome::InvalidOtp) => (
            StatusCode::OK,
            Json(VerifyOtpResponse {
                success: false,
                code: VerifyOtpCode::InvalidOtp,
                token: None,
            }),
        ),
        Err(e) => {
            error!(error = %e, user_id = %payload.user_id, "verify otp failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(VerifyOtpResponse {
                    success: false,
                    code: VerifyOtpCode::InternalServerError,
                    token: None,
                }),
            )
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, (StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();

    if !services::is_valid_email(&payload.email) {
        warn!("login with invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    match services::login(&state, &payload.email, &payload.password).await {
        Ok(session) => Ok(Json(LoginResponse {
            success: true,
            token: session.token,
            id: session.user.id,
            name: session.user.name,
            email: session.user.email,
        })),
        Err(AuthError::Unauthorized) => Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into())),
        Err(e) => {
            error!(error = %e, "login failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".into(),
            ))
        }
    }
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserResponse>, (StatusCode, String)> {
    let user = User::find_by_id(&state.db, user_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            warn!(user_id = %user_id, "token for unknown user");
            (StatusCode::UNAUTHORIZED, "User not found".to_string())
        })?;

    Ok(Json(UserResponse {
        id: user.id,
        name: user.name,
        email: user.email,
    }))
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    error!(error = %e, "internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".into(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    // Validation runs before any service call, so these never touch the
    // (lazily connected) test pool.

    #[tokio::test]
    async fn signup_rejects_invalid_email() {
        let state = AppState::fake();
        let payload = SignupRequest {
            email: "not-an-email".into(),
            password: "abcd1234".into(),
            name: "Buyer".into(),
        };
        let err = signup(State(state), Json(payload)).await.unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
        assert_eq!(err.1, "Invalid email");
    }

    #[tokio::test]
    async fn signup_rejects_weak_password() {
        let state = AppState::fake();
        let payload = SignupRequest {
            email: "buyer@example.com".into(),
            password: "abcdefgh".into(),
            name: "Buyer".into(),
        };
        let err = signup(State(state), Json(payload)).await.unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn signup_rejects_blank_name() {
        let state = AppState::fake();
        let payload = SignupRequest {
            email: "buyer@example.com".into(),
            password: "abcd1234".into(),
            name: "   ".into(),
        };
        let err = signup(State(state), Json(payload)).await.unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
        assert_eq!(err.1, "Name must not be empty");
    }

    #[tokio::test]
    async fn login_rejects_invalid_email_after_normalization() {
        let state = AppState::fake();
        let payload = LoginRequest {
            email: "  not an email  ".into(),
            password: "abcd1234".into(),
        };
        let err = login(State(state), Json(payload)).await.unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn user_response_serialization() {
        let response = UserResponse {
            id: uuid::Uuid::new_v4(),
            name: "Buyer".to_string(),
            email: "buyer@example.com".to_string(),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("buyer@example.com"));
        assert!(json.contains("\"name\":\"Buyer\""));
    }
}
