use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};
use f1_race_api::config::AppConfig;
use f1_race_api::db::create_user;
use sqlx::SqlitePool;

fn prompt(lines: &mut impl Iterator<Item = io::Result<String>>, label: &str) -> Result<String> {
    print!("{label}: ");
    io::stdout().flush()?;

    let line = lines
        .next()
        .context("Unexpected end of input")?
        .context("Failed to read from stdin")?;

    let value = line.trim().to_string();
    if value.is_empty() {
        bail!("{label} must not be empty");
    }

    Ok(value)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    let username = prompt(&mut lines, "Username")?;
    let password = prompt(&mut lines, "Password")?;

    let pool = SqlitePool::connect(&config.database_url)
        .await
        .context("Failed to connect to SQLite database")?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let id = create_user(&pool, &username, &password, true).await?;
    println!("Admin user {username} created with id {id}");

    Ok(())
}
