use chrono::{Duration, NaiveDateTime, Utc};
use rocket::http::{Cookie, CookieJar, SameSite, Status};
use rocket::request::{FromRequest, Outcome};
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::Request;
use sqlx::SqlitePool;

use crate::config::AppConfig;
use crate::db::{get_session_by_token, get_user};
use crate::error::{AppError, ErrorResponse};

use super::User;

/// Session settings shared by the login/logout handlers and the [`User`] guard.
/// Built once from [`AppConfig`] and kept in Rocket managed state.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub cookie_name: String,
    pub session_ttl: Duration,
    pub secure_cookies: bool,
}

impl AuthContext {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            cookie_name: "session_token".to_string(),
            session_ttl: Duration::try_hours(config.session_ttl_hours).unwrap_or(Duration::MAX),
            secure_cookies: config.secure_cookies,
        }
    }

    pub fn session_expiry(&self) -> Result<NaiveDateTime, AppError> {
        Utc::now()
            .checked_add_signed(self.session_ttl)
            .map(|expiry| expiry.naive_utc())
            .ok_or_else(|| AppError::Internal("Session expiry is out of range".to_string()))
    }

    pub fn set_session_cookie(&self, cookies: &CookieJar<'_>, token: String) {
        let max_age = rocket::time::Duration::seconds(self.session_ttl.num_seconds());

        cookies.add_private(
            Cookie::build((self.cookie_name.clone(), token))
                .same_site(SameSite::Lax)
                .http_only(true)
                .secure(self.secure_cookies)
                .path("/")
                .max_age(max_age),
        );
    }

    pub fn session_token(&self, cookies: &CookieJar<'_>) -> Option<String> {
        cookies
            .get_private(&self.cookie_name)
            .map(|c| c.value().to_string())
    }

    pub fn clear_session_cookie(&self, cookies: &CookieJar<'_>) {
        cookies.remove_private(Cookie::build(self.cookie_name.clone()).path("/"));
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for User {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let auth_span = tracing::info_span!("user_auth_guard");
        let _guard = auth_span.enter();

        let (db, auth) = match (
            request.rocket().state::<SqlitePool>(),
            request.rocket().state::<AuthContext>(),
        ) {
            (Some(pool), Some(auth)) => (pool, auth),
            _ => {
                tracing::error!("Database pool or auth context not found in managed state");
                return Outcome::Error((Status::InternalServerError, ()));
            }
        };

        let Some(token) = auth.session_token(request.cookies()) else {
            return Outcome::Error((Status::Unauthorized, ()));
        };

        match get_session_by_token(db, &token).await {
            Ok(session) => {
                if !session.is_valid() {
                    tracing::warn!(session_id = session.id, "Session token expired");
                    return Outcome::Error((Status::Unauthorized, ()));
                }

                match get_user(db, session.user_id).await {
                    Ok(user) => {
                        tracing::info!(username = %user.username, is_admin = user.is_admin, "User authenticated via session token");
                        Outcome::Success(user)
                    }
                    Err(err) => {
                        tracing::error!(user_id = %session.user_id, error = ?err, "Failed to fetch user for valid session");
                        Outcome::Error((Status::InternalServerError, ()))
                    }
                }
            }
            Err(err) => {
                tracing::warn!(error = ?err, "Invalid session token");
                Outcome::Error((Status::Unauthorized, ()))
            }
        }
    }
}

#[catch(401)]
pub fn unauthorized_api(_req: &Request) -> Custom<Json<ErrorResponse>> {
    Custom(
        Status::Unauthorized,
        Json(ErrorResponse::new("Authentication required")),
    )
}

#[catch(400)]
pub fn bad_request_api(_req: &Request) -> Custom<Json<ErrorResponse>> {
    Custom(Status::BadRequest, Json(ErrorResponse::new("Bad request")))
}

#[catch(404)]
pub fn not_found_api(_req: &Request) -> Custom<Json<ErrorResponse>> {
    Custom(Status::NotFound, Json(ErrorResponse::new("Resource not found")))
}

/// JSON bodies are parsed through a `Result` data guard, so the only 422 left
/// is a path segment that fails to parse, such as a non-numeric id.
#[catch(422)]
pub fn unprocessable_api(_req: &Request) -> Custom<Json<ErrorResponse>> {
    Custom(Status::NotFound, Json(ErrorResponse::new("Resource not found")))
}

#[catch(500)]
pub fn internal_error_api(_req: &Request) -> Custom<Json<ErrorResponse>> {
    Custom(
        Status::InternalServerError,
        Json(ErrorResponse::new("Internal server error")),
    )
}
