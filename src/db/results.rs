use sqlx::{Pool, Sqlite, SqliteConnection, SqliteExecutor};
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::error::AppError;
use crate::models::{
    DbRaceResult, DbRaceResultListing, RaceResult, RaceResultFields, RaceResultListing,
    RaceResultPatch, ResultStatus,
};

const SELECT_RESULT: &str = "SELECT result_id, race_id, driver_id, team_id, car_id,
        grid_position, finish_position, points_earned, laps_completed, status, gap_to_leader
     FROM race_results
     WHERE result_id = ?";

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Race result {} not found", id))
}

async fn fetch_race_result<'e, E>(executor: E, id: i64) -> Result<Option<RaceResult>, AppError>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query_as::<_, DbRaceResult>(SELECT_RESULT)
        .bind(id)
        .fetch_optional(executor)
        .await?;

    row.map(RaceResult::try_from).transpose()
}

/// Recounts a driver's classified wins and stores the total on the driver row.
///
/// Runs on the caller's connection so it commits or rolls back together with
/// the result write that triggered it. Returns `None` when the driver row does
/// not exist, in which case nothing is written.
#[instrument(skip(conn))]
pub async fn refresh_driver_wins(
    conn: &mut SqliteConnection,
    driver_id: i64,
) -> Result<Option<i64>, AppError> {
    let wins: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM race_results
         WHERE driver_id = ? AND finish_position = 1 AND status = ?",
    )
    .bind(driver_id)
    .bind(ResultStatus::Finished.as_str())
    .fetch_one(&mut *conn)
    .await?;

    let updated = sqlx::query("UPDATE drivers SET race_wins = ? WHERE driver_id = ?")
        .bind(wins)
        .bind(driver_id)
        .execute(&mut *conn)
        .await?;

    if updated.rows_affected() == 0 {
        warn!("Driver row missing, win count not refreshed");
        return Ok(None);
    }

    info!(wins, "Refreshed driver win count");
    Ok(Some(wins))
}

#[instrument]
pub async fn get_race_result(pool: &Pool<Sqlite>, id: i64) -> Result<RaceResult, AppError> {
    info!("Getting race result");
    fetch_race_result(pool, id).await?.ok_or_else(|| not_found(id))
}

#[instrument]
pub async fn list_race_results(pool: &Pool<Sqlite>) -> Result<Vec<RaceResultListing>, AppError> {
    info!("Listing race results");
    let rows = sqlx::query_as::<_, DbRaceResultListing>(
        "SELECT rr.result_id AS result_id,
                rr.race_id AS race_id,
                rr.driver_id AS driver_id,
                rr.team_id AS team_id,
                rr.car_id AS car_id,
                rr.grid_position AS grid_position,
                rr.finish_position AS finish_position,
                rr.points_earned AS points_earned,
                rr.laps_completed AS laps_completed,
                rr.status AS status,
                rr.gap_to_leader AS gap_to_leader,
                r.grand_prix_name AS race_name,
                d.name AS driver_name,
                t.name AS team_name
         FROM race_results rr
         JOIN races r ON rr.race_id = r.race_id
         JOIN drivers d ON rr.driver_id = d.driver_id
         JOIN teams t ON rr.team_id = t.team_id
         ORDER BY r.date DESC, rr.finish_position ASC NULLS LAST, rr.result_id",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(RaceResultListing::try_from).collect()
}

#[instrument(skip(pool))]
pub async fn create_race_result(
    pool: &Pool<Sqlite>,
    fields: &RaceResultFields,
) -> Result<RaceResult, AppError> {
    info!(race_id = fields.race_id, driver_id = fields.driver_id, "Creating race result");
    fields.validate()?;

    let mut tx = pool.begin().await?;

    let res = sqlx::query(
        "INSERT INTO race_results
         (race_id, driver_id, team_id, car_id, grid_position, finish_position,
          points_earned, laps_completed, status, gap_to_leader)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(fields.race_id)
    .bind(fields.driver_id)
    .bind(fields.team_id)
    .bind(fields.car_id)
    .bind(fields.grid_position)
    .bind(fields.finish_position)
    .bind(fields.points_earned)
    .bind(fields.laps_completed)
    .bind(fields.status.as_str())
    .bind(fields.gap_to_leader.as_deref())
    .execute(&mut *tx)
    .await
    .map_err(AppError::from_write)?;

    let id = res.last_insert_rowid();

    refresh_driver_wins(&mut tx, fields.driver_id).await?;

    let created = fetch_race_result(&mut *tx, id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Race result {} vanished after insert", id)))?;

    tx.commit().await?;

    Ok(created)
}

/// Applies a partial update and refreshes the win count of the driver the
/// result belongs to afterwards. When the patch moves the result to another
/// driver, the previous driver's count is left as it was.
#[instrument(skip(pool, patch))]
pub async fn update_race_result(
    pool: &Pool<Sqlite>,
    id: i64,
    patch: RaceResultPatch,
) -> Result<RaceResult, AppError> {
    info!("Updating race result");

    let mut tx = pool.begin().await?;

    let existing = fetch_race_result(&mut *tx, id)
        .await?
        .ok_or_else(|| not_found(id))?;

    let fields = patch.apply(RaceResultFields::from(existing));
    fields.validate()?;

    sqlx::query(
        "UPDATE race_results
         SET race_id = ?, driver_id = ?, team_id = ?, car_id = ?,
             grid_position = ?, finish_position = ?, points_earned = ?,
             laps_completed = ?, status = ?, gap_to_leader = ?
         WHERE result_id = ?",
    )
    .bind(fields.race_id)
    .bind(fields.driver_id)
    .bind(fields.team_id)
    .bind(fields.car_id)
    .bind(fields.grid_position)
    .bind(fields.finish_position)
    .bind(fields.points_earned)
    .bind(fields.laps_completed)
    .bind(fields.status.as_str())
    .bind(fields.gap_to_leader.as_deref())
    .bind(id)
    .execute(&mut *tx)
    .await
    .map_err(AppError::from_write)?;

    refresh_driver_wins(&mut tx, fields.driver_id).await?;

    let updated = fetch_race_result(&mut *tx, id)
        .await?
        .ok_or_else(|| not_found(id))?;

    tx.commit().await?;

    Ok(updated)
}

/// Deletes a result. The driver's cached win count is not recomputed.
#[instrument]
pub async fn delete_race_result(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Deleting race result");

    let res = sqlx::query("DELETE FROM race_results WHERE result_id = ?")
        .bind(id)
        .execute(pool)
        .await
        .map_err(AppError::from_write)?;

    if res.rows_affected() == 0 {
        return Err(not_found(id));
    }

    Ok(())
}
