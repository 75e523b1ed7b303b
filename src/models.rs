use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultStatus {
    Finished,
    #[serde(rename = "DNF")]
    Dnf,
    #[serde(rename = "DSQ")]
    Dsq,
    #[serde(rename = "DNS")]
    Dns,
}

impl ResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultStatus::Finished => "Finished",
            ResultStatus::Dnf => "DNF",
            ResultStatus::Dsq => "DSQ",
            ResultStatus::Dns => "DNS",
        }
    }
}

impl FromStr for ResultStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Finished" => Ok(ResultStatus::Finished),
            "DNF" => Ok(ResultStatus::Dnf),
            "DSQ" => Ok(ResultStatus::Dsq),
            "DNS" => Ok(ResultStatus::Dns),
            _ => Err(AppError::Validation(format!("Unknown result status: {}", s))),
        }
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractStatus {
    Active,
    Terminated,
    Completed,
}

impl ContractStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractStatus::Active => "Active",
            ContractStatus::Terminated => "Terminated",
            ContractStatus::Completed => "Completed",
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Driver {
    pub driver_id: i64,
    pub name: String,
    pub nationality: String,
    pub date_of_birth: NaiveDate,
    pub number: Option<i64>,
    pub code: Option<String>,
    pub championships_won: i64,
    /// Cached count of classified wins, kept in step with `race_results`.
    pub race_wins: i64,
    pub active_status: bool,
    pub first_race_date: Option<NaiveDate>,
    pub total_points: f64,
}

#[derive(Debug, Clone)]
pub struct NewDriver {
    pub name: String,
    pub nationality: String,
    pub date_of_birth: NaiveDate,
    pub number: Option<i64>,
    pub code: Option<String>,
    pub championships_won: i64,
    pub active_status: bool,
    pub first_race_date: Option<NaiveDate>,
    pub total_points: f64,
}

#[derive(Debug, Clone)]
pub struct NewTeam {
    pub name: String,
    pub nationality: String,
    pub engine_supplier: Option<String>,
    pub first_entry_year: Option<i64>,
    pub championships_won: i64,
    pub base_location: Option<String>,
    pub technical_director: Option<String>,
    pub team_principal: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewCircuit {
    pub name: String,
    pub location: String,
    pub country: String,
    pub length_km: f64,
    pub lap_record: Option<f64>,
    pub lap_record_holder_id: Option<i64>,
    pub number_of_laps: Option<i64>,
    pub circuit_type: Option<String>,
    pub number_of_drs_zones: i64,
    pub first_gp_held: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewRace {
    pub season: i64,
    pub round_number: i64,
    pub grand_prix_name: String,
    pub circuit_id: i64,
    pub date: NaiveDate,
    pub weather_conditions: Option<String>,
    pub safety_car_appearances: i64,
    pub red_flags: i64,
}

#[derive(Debug, Clone)]
pub struct NewCar {
    pub team_id: i64,
    pub season: i64,
    pub model_name: Option<String>,
    pub engine_specification: Option<String>,
    pub total_wins: i64,
    pub total_poles: i64,
}

#[derive(Debug, Clone)]
pub struct NewQualifying {
    pub race_id: i64,
    pub driver_id: i64,
    pub q1_time: Option<f64>,
    pub q2_time: Option<f64>,
    pub q3_time: Option<f64>,
    pub final_position: Option<i64>,
    pub weather_conditions: Option<String>,
    pub tire_compound_used: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPitStop {
    pub race_id: i64,
    pub driver_id: i64,
    pub stop_number: i64,
    pub lap_number: i64,
    pub stop_time: f64,
    pub tire_compound: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewContract {
    pub driver_id: i64,
    pub team_id: i64,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: Option<ContractStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RaceResult {
    pub result_id: i64,
    pub race_id: i64,
    pub driver_id: i64,
    pub team_id: i64,
    pub car_id: i64,
    pub grid_position: Option<i64>,
    pub finish_position: Option<i64>,
    pub points_earned: f64,
    pub laps_completed: Option<i64>,
    pub status: ResultStatus,
    pub gap_to_leader: Option<String>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbRaceResult {
    pub result_id: i64,
    pub race_id: i64,
    pub driver_id: i64,
    pub team_id: i64,
    pub car_id: i64,
    pub grid_position: Option<i64>,
    pub finish_position: Option<i64>,
    pub points_earned: Option<f64>,
    pub laps_completed: Option<i64>,
    pub status: String,
    pub gap_to_leader: Option<String>,
}

impl TryFrom<DbRaceResult> for RaceResult {
    type Error = AppError;

    fn try_from(row: DbRaceResult) -> Result<Self, Self::Error> {
        Ok(Self {
            result_id: row.result_id,
            race_id: row.race_id,
            driver_id: row.driver_id,
            team_id: row.team_id,
            car_id: row.car_id,
            grid_position: row.grid_position,
            finish_position: row.finish_position,
            points_earned: row.points_earned.unwrap_or_default(),
            laps_completed: row.laps_completed,
            status: row
                .status
                .parse()
                .map_err(|_| AppError::Internal(format!("Stored status {:?} is invalid", row.status)))?,
            gap_to_leader: row.gap_to_leader,
        })
    }
}

/// A race result joined with the display names of its race, driver and team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceResultListing {
    pub result_id: i64,
    pub race_id: i64,
    pub race_name: String,
    pub driver_id: i64,
    pub driver_name: String,
    pub team_id: i64,
    pub team_name: String,
    pub car_id: i64,
    pub grid_position: Option<i64>,
    pub finish_position: Option<i64>,
    pub points_earned: f64,
    pub laps_completed: Option<i64>,
    pub status: ResultStatus,
    pub gap_to_leader: Option<String>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbRaceResultListing {
    #[sqlx(flatten)]
    pub result: DbRaceResult,
    pub race_name: String,
    pub driver_name: String,
    pub team_name: String,
}

impl TryFrom<DbRaceResultListing> for RaceResultListing {
    type Error = AppError;

    fn try_from(row: DbRaceResultListing) -> Result<Self, Self::Error> {
        let result = RaceResult::try_from(row.result)?;

        Ok(Self {
            result_id: result.result_id,
            race_id: result.race_id,
            race_name: row.race_name,
            driver_id: result.driver_id,
            driver_name: row.driver_name,
            team_id: result.team_id,
            team_name: row.team_name,
            car_id: result.car_id,
            grid_position: result.grid_position,
            finish_position: result.finish_position,
            points_earned: result.points_earned,
            laps_completed: result.laps_completed,
            status: result.status,
            gap_to_leader: result.gap_to_leader,
        })
    }
}

/// Every writable column of a race result. Both create and update validate
/// one of these before touching the database.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct RaceResultFields {
    pub race_id: i64,
    pub driver_id: i64,
    pub team_id: i64,
    pub car_id: i64,
    #[validate(range(min = 1, message = "grid_position must be at least 1"))]
    pub grid_position: Option<i64>,
    #[validate(range(min = 1, message = "finish_position must be at least 1"))]
    pub finish_position: Option<i64>,
    #[validate(range(min = 0.0, message = "points_earned must not be negative"))]
    pub points_earned: Option<f64>,
    #[validate(range(min = 0, message = "laps_completed must not be negative"))]
    pub laps_completed: Option<i64>,
    pub status: ResultStatus,
    #[validate(length(max = 20, message = "gap_to_leader must be at most 20 characters"))]
    pub gap_to_leader: Option<String>,
}

impl From<RaceResult> for RaceResultFields {
    fn from(result: RaceResult) -> Self {
        Self {
            race_id: result.race_id,
            driver_id: result.driver_id,
            team_id: result.team_id,
            car_id: result.car_id,
            grid_position: result.grid_position,
            finish_position: result.finish_position,
            points_earned: Some(result.points_earned),
            laps_completed: result.laps_completed,
            status: result.status,
            gap_to_leader: result.gap_to_leader,
        }
    }
}

/// Body of `POST /api/race-results`. The four references are required but
/// kept optional here so a missing one can be reported by name.
#[derive(Debug, Default, Deserialize)]
pub struct NewRaceResult {
    pub race_id: Option<i64>,
    pub driver_id: Option<i64>,
    pub team_id: Option<i64>,
    pub car_id: Option<i64>,
    pub grid_position: Option<i64>,
    pub finish_position: Option<i64>,
    pub points_earned: Option<f64>,
    pub laps_completed: Option<i64>,
    pub status: Option<ResultStatus>,
    pub gap_to_leader: Option<String>,
}

impl NewRaceResult {
    pub fn into_fields(self) -> Result<RaceResultFields, AppError> {
        fn required(value: Option<i64>, field: &str) -> Result<i64, AppError> {
            value.ok_or_else(|| AppError::Validation(format!("Missing required field: {}", field)))
        }

        Ok(RaceResultFields {
            race_id: required(self.race_id, "race_id")?,
            driver_id: required(self.driver_id, "driver_id")?,
            team_id: required(self.team_id, "team_id")?,
            car_id: required(self.car_id, "car_id")?,
            grid_position: self.grid_position,
            finish_position: self.finish_position,
            points_earned: Some(self.points_earned.unwrap_or(0.0)),
            laps_completed: self.laps_completed,
            status: self.status.unwrap_or(ResultStatus::Finished),
            gap_to_leader: self.gap_to_leader,
        })
    }
}

/// Distinguishes an absent key (`None`) from an explicit `null` (`Some(None)`).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Body of `PUT /api/race-results/<id>`. Only present keys are applied.
#[derive(Debug, Default, Deserialize)]
pub struct RaceResultPatch {
    pub race_id: Option<i64>,
    pub driver_id: Option<i64>,
    pub team_id: Option<i64>,
    pub car_id: Option<i64>,
    #[serde(default, deserialize_with = "nullable")]
    pub grid_position: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub finish_position: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub points_earned: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub laps_completed: Option<Option<i64>>,
    pub status: Option<ResultStatus>,
    #[serde(default, deserialize_with = "nullable")]
    pub gap_to_leader: Option<Option<String>>,
}

impl RaceResultPatch {
    pub fn apply(self, mut fields: RaceResultFields) -> RaceResultFields {
        if let Some(race_id) = self.race_id {
            fields.race_id = race_id;
        }
        if let Some(driver_id) = self.driver_id {
            fields.driver_id = driver_id;
        }
        if let Some(team_id) = self.team_id {
            fields.team_id = team_id;
        }
        if let Some(car_id) = self.car_id {
            fields.car_id = car_id;
        }
        if let Some(grid_position) = self.grid_position {
            fields.grid_position = grid_position;
        }
        if let Some(finish_position) = self.finish_position {
            fields.finish_position = finish_position;
        }
        if let Some(points_earned) = self.points_earned {
            fields.points_earned = points_earned;
        }
        if let Some(laps_completed) = self.laps_completed {
            fields.laps_completed = laps_completed;
        }
        if let Some(status) = self.status {
            fields.status = status;
        }
        if let Some(gap_to_leader) = self.gap_to_leader {
            fields.gap_to_leader = gap_to_leader;
        }

        fields
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RaceListItem {
    pub race_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DriverListItem {
    pub driver_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TeamListItem {
    pub team_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CurrentTeam {
    pub team_id: i64,
    pub car_id: i64,
}
