//! Read-only views aggregated from `race_results`.
//!
//! Standings count a podium for any `finish_position <= 3` whatever the
//! status, while season statistics only count podiums of `Finished` results.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::models::ResultStatus;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DriverStanding {
    pub driver_id: i64,
    pub name: String,
    pub nationality: String,
    pub number: Option<i64>,
    pub code: Option<String>,
    pub total_points: f64,
    pub total_wins: i64,
    pub pole_positions: i64,
    pub podiums: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TeamStanding {
    pub team_id: i64,
    pub name: String,
    pub nationality: String,
    pub total_points: f64,
    pub total_wins: i64,
    pub pole_positions: i64,
    pub podiums: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeasonStatistics {
    pub total_races: i64,
    pub pole_positions: BTreeMap<String, i64>,
    pub podium_finishes: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceDetails {
    pub name: String,
    pub season: i64,
    pub date: NaiveDate,
    pub weather_conditions: Option<String>,
    pub safety_car_appearances: i64,
    pub red_flags: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDriver {
    pub name: String,
    pub code: Option<String>,
    pub nationality: String,
    pub number: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportTeam {
    pub name: String,
    pub nationality: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Performance {
    pub grid_position: Option<i64>,
    pub finish_position: Option<i64>,
    pub points_earned: f64,
    pub laps_completed: Option<i64>,
    pub status: ResultStatus,
    pub gap_to_leader: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceReportEntry {
    pub driver: ReportDriver,
    pub team: ReportTeam,
    pub performance: Performance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceReport {
    pub race_details: RaceDetails,
    pub results: Vec<RaceReportEntry>,
}

#[derive(sqlx::FromRow)]
struct DbRaceReportRow {
    grand_prix_name: String,
    season: i64,
    date: NaiveDate,
    weather_conditions: Option<String>,
    safety_car_appearances: i64,
    red_flags: i64,
    result_id: Option<i64>,
    grid_position: Option<i64>,
    finish_position: Option<i64>,
    points_earned: Option<f64>,
    laps_completed: Option<i64>,
    status: Option<String>,
    gap_to_leader: Option<String>,
    driver_name: Option<String>,
    driver_code: Option<String>,
    driver_nationality: Option<String>,
    driver_number: Option<i64>,
    team_name: Option<String>,
    team_nationality: Option<String>,
}

impl DbRaceReportRow {
    fn details(&self) -> RaceDetails {
        RaceDetails {
            name: self.grand_prix_name.clone(),
            season: self.season,
            date: self.date,
            weather_conditions: self.weather_conditions.clone(),
            safety_car_appearances: self.safety_car_appearances,
            red_flags: self.red_flags,
        }
    }

    fn into_entry(self) -> Result<RaceReportEntry, AppError> {
        let status = match self.status.as_deref() {
            Some(status) => status.parse()?,
            None => ResultStatus::Finished,
        };

        Ok(RaceReportEntry {
            driver: ReportDriver {
                name: self.driver_name.unwrap_or_default(),
                code: self.driver_code,
                nationality: self.driver_nationality.unwrap_or_default(),
                number: self.driver_number,
            },
            team: ReportTeam {
                name: self.team_name.unwrap_or_default(),
                nationality: self.team_nationality.unwrap_or_default(),
            },
            performance: Performance {
                grid_position: self.grid_position,
                finish_position: self.finish_position,
                points_earned: self.points_earned.unwrap_or_default(),
                laps_completed: self.laps_completed,
                status,
                gap_to_leader: self.gap_to_leader,
            },
        })
    }
}

/// Points, wins, poles and podiums per driver, highest points first.
/// Equal points fall back to driver id.
#[instrument]
pub async fn driver_standings(pool: &Pool<Sqlite>) -> Result<Vec<DriverStanding>, AppError> {
    info!("Computing driver standings");
    let standings = sqlx::query_as::<_, DriverStanding>(
        "SELECT d.driver_id AS driver_id,
                d.name AS name,
                d.nationality AS nationality,
                d.number AS number,
                d.code AS code,
                CAST(COALESCE(SUM(r.points_earned), 0) AS REAL) AS total_points,
                COUNT(CASE WHEN r.finish_position = 1 THEN 1 END) AS total_wins,
                COUNT(CASE WHEN r.grid_position = 1 THEN 1 END) AS pole_positions,
                COUNT(CASE WHEN r.finish_position <= 3 THEN 1 END) AS podiums
         FROM drivers d
         LEFT JOIN race_results r ON d.driver_id = r.driver_id
         GROUP BY d.driver_id, d.name, d.nationality, d.number, d.code
         ORDER BY total_points DESC, d.driver_id",
    )
    .fetch_all(pool)
    .await?;

    Ok(standings)
}

/// Same aggregation as [`driver_standings`], grouped by team.
#[instrument]
pub async fn team_standings(pool: &Pool<Sqlite>) -> Result<Vec<TeamStanding>, AppError> {
    info!("Computing team standings");
    let standings = sqlx::query_as::<_, TeamStanding>(
        "SELECT t.team_id AS team_id,
                t.name AS name,
                t.nationality AS nationality,
                CAST(COALESCE(SUM(r.points_earned), 0) AS REAL) AS total_points,
                COUNT(CASE WHEN r.finish_position = 1 THEN 1 END) AS total_wins,
                COUNT(CASE WHEN r.grid_position = 1 THEN 1 END) AS pole_positions,
                COUNT(CASE WHEN r.finish_position <= 3 THEN 1 END) AS podiums
         FROM teams t
         LEFT JOIN race_results r ON t.team_id = r.team_id
         GROUP BY t.team_id, t.name, t.nationality
         ORDER BY total_points DESC, t.team_id",
    )
    .fetch_all(pool)
    .await?;

    Ok(standings)
}

#[instrument]
pub async fn season_statistics(pool: &Pool<Sqlite>) -> Result<SeasonStatistics, AppError> {
    info!("Computing season statistics");

    let total_races: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM races")
        .fetch_one(pool)
        .await?;

    let pole_positions = sqlx::query_as::<_, (String, i64)>(
        "SELECT d.name, COUNT(r.result_id)
         FROM drivers d
         JOIN race_results r ON r.driver_id = d.driver_id
         WHERE r.grid_position = 1
         GROUP BY d.name",
    )
    .fetch_all(pool)
    .await?;

    let podium_finishes = sqlx::query_as::<_, (String, i64)>(
        "SELECT d.name, COUNT(r.result_id)
         FROM drivers d
         JOIN race_results r ON r.driver_id = d.driver_id
         WHERE r.finish_position <= 3 AND r.status = ?
         GROUP BY d.name",
    )
    .bind(ResultStatus::Finished.as_str())
    .fetch_all(pool)
    .await?;

    Ok(SeasonStatistics {
        total_races,
        pole_positions: pole_positions.into_iter().collect(),
        podium_finishes: podium_finishes.into_iter().collect(),
    })
}

/// Race metadata plus every result of the race, classified finishers first
/// and unclassified results last.
#[instrument]
pub async fn race_report(pool: &Pool<Sqlite>, race_id: i64) -> Result<RaceReport, AppError> {
    info!("Building race report");
    let rows = sqlx::query_as::<_, DbRaceReportRow>(
        "SELECT r.grand_prix_name AS grand_prix_name,
                r.season AS season,
                r.date AS date,
                r.weather_conditions AS weather_conditions,
                r.safety_car_appearances AS safety_car_appearances,
                r.red_flags AS red_flags,
                rr.result_id AS result_id,
                rr.grid_position AS grid_position,
                rr.finish_position AS finish_position,
                rr.points_earned AS points_earned,
                rr.laps_completed AS laps_completed,
                rr.status AS status,
                rr.gap_to_leader AS gap_to_leader,
                d.name AS driver_name,
                d.code AS driver_code,
                d.nationality AS driver_nationality,
                d.number AS driver_number,
                t.name AS team_name,
                t.nationality AS team_nationality
         FROM races r
         LEFT JOIN race_results rr ON r.race_id = rr.race_id
         LEFT JOIN drivers d ON rr.driver_id = d.driver_id
         LEFT JOIN teams t ON rr.team_id = t.team_id
         WHERE r.race_id = ?
         ORDER BY rr.finish_position ASC NULLS LAST, rr.result_id",
    )
    .bind(race_id)
    .fetch_all(pool)
    .await?;

    let Some(first) = rows.first() else {
        return Err(AppError::NotFound("Race not found".to_string()));
    };
    let race_details = first.details();

    let results = rows
        .into_iter()
        .filter(|row| row.result_id.is_some())
        .map(DbRaceReportRow::into_entry)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RaceReport {
        race_details,
        results,
    })
}
