use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::models::{
    ContractStatus, CurrentTeam, Driver, DriverListItem, NewCar, NewCircuit, NewContract,
    NewDriver, NewPitStop, NewQualifying, NewRace, NewTeam, RaceListItem, TeamListItem,
};

#[instrument(skip(pool))]
pub async fn insert_driver(pool: &Pool<Sqlite>, driver: &NewDriver) -> Result<i64, AppError> {
    info!("Inserting driver");
    let res = sqlx::query(
        "INSERT INTO drivers
         (name, nationality, date_of_birth, number, code, championships_won,
          active_status, first_race_date, total_points)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&driver.name)
    .bind(&driver.nationality)
    .bind(driver.date_of_birth)
    .bind(driver.number)
    .bind(driver.code.as_deref())
    .bind(driver.championships_won)
    .bind(driver.active_status)
    .bind(driver.first_race_date)
    .bind(driver.total_points)
    .execute(pool)
    .await
    .map_err(AppError::from_write)?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool))]
pub async fn insert_team(pool: &Pool<Sqlite>, team: &NewTeam) -> Result<i64, AppError> {
    info!("Inserting team");
    let res = sqlx::query(
        "INSERT INTO teams
         (name, nationality, engine_supplier, first_entry_year, championships_won,
          base_location, technical_director, team_principal)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&team.name)
    .bind(&team.nationality)
    .bind(team.engine_supplier.as_deref())
    .bind(team.first_entry_year)
    .bind(team.championships_won)
    .bind(team.base_location.as_deref())
    .bind(team.technical_director.as_deref())
    .bind(team.team_principal.as_deref())
    .execute(pool)
    .await
    .map_err(AppError::from_write)?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool))]
pub async fn insert_circuit(pool: &Pool<Sqlite>, circuit: &NewCircuit) -> Result<i64, AppError> {
    info!("Inserting circuit");
    let res = sqlx::query(
        "INSERT INTO circuits
         (name, location, country, length_km, lap_record, lap_record_holder_id,
          number_of_laps, circuit_type, number_of_drs_zones, first_gp_held)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&circuit.name)
    .bind(&circuit.location)
    .bind(&circuit.country)
    .bind(circuit.length_km)
    .bind(circuit.lap_record)
    .bind(circuit.lap_record_holder_id)
    .bind(circuit.number_of_laps)
    .bind(circuit.circuit_type.as_deref())
    .bind(circuit.number_of_drs_zones)
    .bind(circuit.first_gp_held)
    .execute(pool)
    .await
    .map_err(AppError::from_write)?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool))]
pub async fn insert_race(pool: &Pool<Sqlite>, race: &NewRace) -> Result<i64, AppError> {
    info!("Inserting race");
    let res = sqlx::query(
        "INSERT INTO races
         (season, round_number, grand_prix_name, circuit_id, date,
          weather_conditions, safety_car_appearances, red_flags)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(race.season)
    .bind(race.round_number)
    .bind(&race.grand_prix_name)
    .bind(race.circuit_id)
    .bind(race.date)
    .bind(race.weather_conditions.as_deref())
    .bind(race.safety_car_appearances)
    .bind(race.red_flags)
    .execute(pool)
    .await
    .map_err(AppError::from_write)?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool))]
pub async fn insert_car(pool: &Pool<Sqlite>, car: &NewCar) -> Result<i64, AppError> {
    info!("Inserting car");
    let res = sqlx::query(
        "INSERT INTO cars
         (team_id, season, model_name, engine_specification, total_wins, total_poles)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(car.team_id)
    .bind(car.season)
    .bind(car.model_name.as_deref())
    .bind(car.engine_specification.as_deref())
    .bind(car.total_wins)
    .bind(car.total_poles)
    .execute(pool)
    .await
    .map_err(AppError::from_write)?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool))]
pub async fn insert_contract(pool: &Pool<Sqlite>, contract: &NewContract) -> Result<i64, AppError> {
    info!("Inserting driver contract");
    let res = sqlx::query(
        "INSERT INTO driver_team_contracts (driver_id, team_id, start_date, end_date, status)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(contract.driver_id)
    .bind(contract.team_id)
    .bind(contract.start_date)
    .bind(contract.end_date)
    .bind(contract.status.map(|s| s.as_str()))
    .execute(pool)
    .await
    .map_err(AppError::from_write)?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool))]
pub async fn insert_qualifying(
    pool: &Pool<Sqlite>,
    qualifying: &NewQualifying,
) -> Result<i64, AppError> {
    info!("Inserting qualifying record");
    let res = sqlx::query(
        "INSERT INTO qualifying
         (race_id, driver_id, q1_time, q2_time, q3_time, final_position,
          weather_conditions, tire_compound_used)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(qualifying.race_id)
    .bind(qualifying.driver_id)
    .bind(qualifying.q1_time)
    .bind(qualifying.q2_time)
    .bind(qualifying.q3_time)
    .bind(qualifying.final_position)
    .bind(qualifying.weather_conditions.as_deref())
    .bind(qualifying.tire_compound_used.as_deref())
    .execute(pool)
    .await
    .map_err(AppError::from_write)?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool))]
pub async fn insert_pit_stop(pool: &Pool<Sqlite>, stop: &NewPitStop) -> Result<i64, AppError> {
    info!("Inserting pit stop");
    let res = sqlx::query(
        "INSERT INTO pit_stops
         (race_id, driver_id, stop_number, lap_number, stop_time, tire_compound)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(stop.race_id)
    .bind(stop.driver_id)
    .bind(stop.stop_number)
    .bind(stop.lap_number)
    .bind(stop.stop_time)
    .bind(stop.tire_compound.as_deref())
    .execute(pool)
    .await
    .map_err(AppError::from_write)?;

    Ok(res.last_insert_rowid())
}

#[instrument]
pub async fn get_driver(pool: &Pool<Sqlite>, driver_id: i64) -> Result<Driver, AppError> {
    info!("Fetching driver");
    sqlx::query_as::<_, Driver>(
        "SELECT driver_id, name, nationality, date_of_birth, number, code, championships_won,
                race_wins, active_status, first_race_date, total_points
         FROM drivers WHERE driver_id = ?",
    )
    .bind(driver_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Driver {} not found", driver_id)))
}

#[instrument]
pub async fn list_races(pool: &Pool<Sqlite>) -> Result<Vec<RaceListItem>, AppError> {
    info!("Listing races");
    let races = sqlx::query_as::<_, RaceListItem>(
        "SELECT race_id, grand_prix_name || ' ' || season AS name
         FROM races
         ORDER BY date DESC, race_id",
    )
    .fetch_all(pool)
    .await?;

    Ok(races)
}

/// Drivers as `Name (CODE)`; drivers without a code are listed by name alone.
#[instrument]
pub async fn list_drivers(pool: &Pool<Sqlite>) -> Result<Vec<DriverListItem>, AppError> {
    info!("Listing drivers");
    let drivers = sqlx::query_as::<_, DriverListItem>(
        "SELECT driver_id,
                CASE WHEN code IS NULL THEN name ELSE name || ' (' || code || ')' END AS name
         FROM drivers
         ORDER BY drivers.name, driver_id",
    )
    .fetch_all(pool)
    .await?;

    Ok(drivers)
}

#[instrument]
pub async fn list_teams(pool: &Pool<Sqlite>) -> Result<Vec<TeamListItem>, AppError> {
    info!("Listing teams");
    let teams = sqlx::query_as::<_, TeamListItem>(
        "SELECT team_id, name FROM teams ORDER BY name, team_id",
    )
    .fetch_all(pool)
    .await?;

    Ok(teams)
}

/// Resolves a driver's team from their active contract and that team's car
/// for `season`. With several active contracts the oldest one wins.
#[instrument]
pub async fn get_driver_current_team(
    pool: &Pool<Sqlite>,
    driver_id: i64,
    season: i64,
) -> Result<CurrentTeam, AppError> {
    info!("Resolving current team for driver");

    let team_id: Option<i64> = sqlx::query_scalar(
        "SELECT team_id FROM driver_team_contracts
         WHERE driver_id = ? AND status = ?
         ORDER BY contract_id
         LIMIT 1",
    )
    .bind(driver_id)
    .bind(ContractStatus::Active.as_str())
    .fetch_optional(pool)
    .await?;

    let Some(team_id) = team_id else {
        return Err(AppError::NotFound(
            "No active team contract found for driver".to_string(),
        ));
    };

    let car_id: Option<i64> = sqlx::query_scalar(
        "SELECT car_id FROM cars
         WHERE team_id = ? AND season = ?
         ORDER BY car_id
         LIMIT 1",
    )
    .bind(team_id)
    .bind(season)
    .fetch_optional(pool)
    .await?;

    match car_id {
        Some(car_id) => Ok(CurrentTeam { team_id, car_id }),
        None => Err(AppError::NotFound(
            "No current car found for team".to_string(),
        )),
    }
}
