use chrono::{Datelike, Utc};
use rocket::http::{CookieJar, Status};
use rocket::response::status::Custom;
use rocket::serde::{json::Json, Deserialize, Serialize};
use rocket::State;
use sqlx::{Pool, Sqlite};
use validator::Validate;

use crate::auth::{AuthContext, User, UserSession};
use crate::db::{
    authenticate_user, create_race_result, create_user, create_user_session, delete_race_result,
    driver_standings, get_driver_current_team, get_race_result, invalidate_session,
    list_drivers, list_race_results, list_races, list_teams, race_report, season_statistics,
    team_standings, update_race_result, DriverStanding, RaceReport, SeasonStatistics,
    TeamStanding,
};
use crate::error::AppError;
use crate::models::{
    CurrentTeam, DriverListItem, NewRaceResult, RaceListItem, RaceResult, RaceResultListing,
    RaceResultPatch, TeamListItem,
};
use crate::validation::{JsonBody, JsonBodyExt, ValidateExt};

#[derive(Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

#[derive(Deserialize, Validate)]
pub struct CredentialsRequest {
    #[validate(length(min = 1, max = 80, message = "Username must be between 1 and 80 characters"))]
    username: Option<String>,
    #[validate(length(min = 1, message = "Password must not be empty"))]
    password: Option<String>,
}

impl CredentialsRequest {
    fn into_pair(self) -> Result<(String, String), AppError> {
        match (self.username, self.password) {
            (Some(username), Some(password)) => Ok((username, password)),
            _ => Err(AppError::Validation(
                "Missing username or password".to_string(),
            )),
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub message: String,
    pub is_admin: bool,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct AuthStatus {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
}

#[post("/auth/register", data = "<registration>")]
pub async fn api_register(
    registration: JsonBody<'_, CredentialsRequest>,
    db: &State<Pool<Sqlite>>,
) -> Result<Custom<Json<MessageResponse>>, AppError> {
    let (username, password) = registration.into_body()?.validated()?.into_pair()?;

    create_user(db, &username, &password, false).await?;

    Ok(Custom(
        Status::Created,
        MessageResponse::new("User registered successfully"),
    ))
}

#[post("/auth/login", data = "<login>")]
pub async fn api_login(
    login: JsonBody<'_, CredentialsRequest>,
    cookies: &CookieJar<'_>,
    auth: &State<AuthContext>,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<LoginResponse>, AppError> {
    let (username, password) = login.into_body()?.into_pair()?;

    let Some(user) = authenticate_user(db, &username, &password).await? else {
        return Err(AppError::Authentication(
            "Invalid username or password".to_string(),
        ));
    };

    let token = UserSession::generate_token();
    create_user_session(db, user.id, &token, auth.session_expiry()?).await?;
    auth.set_session_cookie(cookies, token);

    tracing::info!(username = %user.username, "User logged in");

    Ok(Json(LoginResponse {
        message: "Logged in successfully".to_string(),
        is_admin: user.is_admin,
    }))
}

async fn end_session(cookies: &CookieJar<'_>, auth: &AuthContext, db: &Pool<Sqlite>) {
    if let Some(token) = auth.session_token(cookies) {
        if let Err(err) = invalidate_session(db, &token).await {
            tracing::warn!(error = ?err, "Failed to invalidate session on logout");
        }
    }

    auth.clear_session_cookie(cookies);
}

#[get("/auth/logout")]
pub async fn api_logout(
    cookies: &CookieJar<'_>,
    auth: &State<AuthContext>,
    db: &State<Pool<Sqlite>>,
) -> Json<MessageResponse> {
    end_session(cookies, auth, db).await;
    MessageResponse::new("Logged out successfully")
}

#[post("/auth/logout")]
pub async fn api_logout_post(
    cookies: &CookieJar<'_>,
    auth: &State<AuthContext>,
    db: &State<Pool<Sqlite>>,
) -> Json<MessageResponse> {
    end_session(cookies, auth, db).await;
    MessageResponse::new("Logged out successfully")
}

#[get("/auth/status")]
pub async fn api_auth_status(user: Option<User>) -> Json<AuthStatus> {
    Json(match user {
        Some(user) => AuthStatus {
            authenticated: true,
            username: Some(user.username),
            is_admin: Some(user.is_admin),
        },
        None => AuthStatus {
            authenticated: false,
            username: None,
            is_admin: None,
        },
    })
}

#[get("/drivers/standings")]
pub async fn api_driver_standings(
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<DriverStanding>>, AppError> {
    Ok(Json(driver_standings(db).await?))
}

#[get("/teams/standings")]
pub async fn api_team_standings(
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<TeamStanding>>, AppError> {
    Ok(Json(team_standings(db).await?))
}

#[get("/season/statistics")]
pub async fn api_season_statistics(
    db: &State<Pool<Sqlite>>,
) -> Result<Json<SeasonStatistics>, AppError> {
    Ok(Json(season_statistics(db).await?))
}

#[get("/races/<id>/report")]
pub async fn api_race_report(
    id: i64,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<RaceReport>, AppError> {
    Ok(Json(race_report(db, id).await?))
}

#[get("/race-results")]
pub async fn api_get_race_results(
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<RaceResultListing>>, AppError> {
    Ok(Json(list_race_results(db).await?))
}

#[get("/race-results/<id>")]
pub async fn api_get_race_result(
    id: i64,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<RaceResult>, AppError> {
    Ok(Json(get_race_result(db, id).await?))
}

#[post("/race-results", data = "<result>")]
pub async fn api_create_race_result(
    user: User,
    result: JsonBody<'_, NewRaceResult>,
    db: &State<Pool<Sqlite>>,
) -> Result<Custom<Json<RaceResult>>, AppError> {
    let fields = result.into_body()?.into_fields()?;

    let created = create_race_result(db, &fields).await?;
    tracing::info!(result_id = created.result_id, username = %user.username, "Race result created");

    Ok(Custom(Status::Created, Json(created)))
}

#[put("/race-results/<id>", data = "<patch>")]
pub async fn api_update_race_result(
    id: i64,
    user: User,
    patch: JsonBody<'_, RaceResultPatch>,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<RaceResult>, AppError> {
    let patch = patch.into_body()?;

    let updated = update_race_result(db, id, patch).await?;
    tracing::info!(result_id = id, username = %user.username, "Race result updated");

    Ok(Json(updated))
}

#[delete("/race-results/<id>")]
pub async fn api_delete_race_result(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, AppError> {
    delete_race_result(db, id).await?;
    tracing::info!(result_id = id, username = %user.username, "Race result deleted");

    Ok(Status::NoContent)
}

#[get("/races")]
pub async fn api_get_races(
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<RaceListItem>>, AppError> {
    Ok(Json(list_races(db).await?))
}

#[get("/drivers")]
pub async fn api_get_drivers(
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<DriverListItem>>, AppError> {
    Ok(Json(list_drivers(db).await?))
}

#[get("/teams")]
pub async fn api_get_teams(
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<TeamListItem>>, AppError> {
    Ok(Json(list_teams(db).await?))
}

#[get("/drivers/<id>/current-team")]
pub async fn api_driver_current_team(
    id: i64,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<CurrentTeam>, AppError> {
    let season = i64::from(Utc::now().year());
    Ok(Json(get_driver_current_team(db, id, season).await?))
}

#[get("/health")]
pub fn health() -> &'static str {
    "OK"
}

#[derive(Serialize, Deserialize, Debug)]
pub struct HelloResponse {
    pub hello: String,
}

#[get("/hello")]
pub fn hello() -> Json<HelloResponse> {
    Json(HelloResponse {
        hello: "Welcome to F1 Race Management System!".to_string(),
    })
}
