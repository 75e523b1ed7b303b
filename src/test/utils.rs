#[cfg(test)]
pub mod test_utils {
    use std::collections::HashMap;
    use std::sync::Once;

    use chrono::{Datelike, NaiveDate, Utc};
    use rocket::http::{ContentType, Status};
    use rocket::local::asynchronous::Client;
    use serde_json::json;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::{Pool, Sqlite};

    use crate::config::AppConfig;
    use crate::db::{
        create_race_result, create_user, get_driver, insert_car, insert_circuit, insert_contract,
        insert_driver, insert_race, insert_team,
    };
    use crate::error::AppError;
    use crate::init_rocket;
    use crate::models::{
        ContractStatus, NewCar, NewCircuit, NewContract, NewDriver, NewRace, NewTeam, RaceResult,
        RaceResultFields, ResultStatus,
    };

    static INIT: Once = Once::new();
    pub static STANDARD_PASSWORD: &str = "password123";

    pub fn current_season() -> i64 {
        i64::from(Utc::now().year())
    }

    fn date(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("fixture dates are valid")
    }

    pub async fn memory_pool() -> Result<Pool<Sqlite>, AppError> {
        // Every connection to `sqlite::memory:` opens its own database, so the
        // pool must never hold more than one and never recycle it.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(pool)
    }

    struct TestDriver {
        name: String,
        code: Option<String>,
        number: Option<i64>,
    }

    struct TestRace {
        name: String,
        season: i64,
        round: i64,
        date: NaiveDate,
    }

    struct TestCar {
        team: String,
        season: i64,
    }

    struct TestContract {
        driver: String,
        team: String,
        status: ContractStatus,
    }

    struct TestUser {
        username: String,
        is_admin: bool,
    }

    #[derive(Default)]
    pub struct TestDbBuilder {
        drivers: Vec<TestDriver>,
        teams: Vec<String>,
        races: Vec<TestRace>,
        cars: Vec<TestCar>,
        contracts: Vec<TestContract>,
        users: Vec<TestUser>,
    }

    impl TestDbBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn driver(mut self, name: &str, code: Option<&str>, number: Option<i64>) -> Self {
            self.drivers.push(TestDriver {
                name: name.to_string(),
                code: code.map(String::from),
                number,
            });
            self
        }

        pub fn team(mut self, name: &str) -> Self {
            self.teams.push(name.to_string());
            self
        }

        pub fn race(mut self, name: &str, season: i64, round: i64, date_str: &str) -> Self {
            self.races.push(TestRace {
                name: name.to_string(),
                season,
                round,
                date: date(date_str),
            });
            self
        }

        pub fn car(mut self, team: &str, season: i64) -> Self {
            self.cars.push(TestCar {
                team: team.to_string(),
                season,
            });
            self
        }

        pub fn contract(mut self, driver: &str, team: &str, status: ContractStatus) -> Self {
            self.contracts.push(TestContract {
                driver: driver.to_string(),
                team: team.to_string(),
                status,
            });
            self
        }

        pub fn user(mut self, username: &str, is_admin: bool) -> Self {
            self.users.push(TestUser {
                username: username.to_string(),
                is_admin,
            });
            self
        }

        pub async fn build(self) -> Result<TestDb, AppError> {
            INIT.call_once(|| {
                let _ = tracing_subscriber::fmt()
                    .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
                    .with_test_writer()
                    .try_init();
            });

            let pool = memory_pool().await?;

            let circuit_id = insert_circuit(
                &pool,
                &NewCircuit {
                    name: "Bahrain International Circuit".to_string(),
                    location: "Sakhir".to_string(),
                    country: "Bahrain".to_string(),
                    length_km: 5.412,
                    lap_record: Some(91.447),
                    lap_record_holder_id: None,
                    number_of_laps: Some(57),
                    circuit_type: Some("Permanent".to_string()),
                    number_of_drs_zones: 3,
                    first_gp_held: Some(2004),
                },
            )
            .await?;

            let mut team_ids = HashMap::new();
            for team in &self.teams {
                let id = insert_team(
                    &pool,
                    &NewTeam {
                        name: team.clone(),
                        nationality: "British".to_string(),
                        engine_supplier: None,
                        first_entry_year: Some(2005),
                        championships_won: 0,
                        base_location: None,
                        technical_director: None,
                        team_principal: None,
                    },
                )
                .await?;
                team_ids.insert(team.clone(), id);
            }

            let mut driver_ids = HashMap::new();
            for driver in &self.drivers {
                let id = insert_driver(
                    &pool,
                    &NewDriver {
                        name: driver.name.clone(),
                        nationality: "Dutch".to_string(),
                        date_of_birth: date("1997-09-30"),
                        number: driver.number,
                        code: driver.code.clone(),
                        championships_won: 0,
                        active_status: true,
                        first_race_date: None,
                        total_points: 0.0,
                    },
                )
                .await?;
                driver_ids.insert(driver.name.clone(), id);
            }

            let mut car_ids = HashMap::new();
            for car in &self.cars {
                let team_id = team_ids[&car.team];
                let id = insert_car(
                    &pool,
                    &NewCar {
                        team_id,
                        season: car.season,
                        model_name: Some(format!("{} {}", car.team, car.season)),
                        engine_specification: None,
                        total_wins: 0,
                        total_poles: 0,
                    },
                )
                .await?;
                car_ids.insert((car.team.clone(), car.season), id);
            }

            let mut race_ids = HashMap::new();
            for race in &self.races {
                let id = insert_race(
                    &pool,
                    &NewRace {
                        season: race.season,
                        round_number: race.round,
                        grand_prix_name: race.name.clone(),
                        circuit_id,
                        date: race.date,
                        weather_conditions: Some("Dry".to_string()),
                        safety_car_appearances: 0,
                        red_flags: 0,
                    },
                )
                .await?;
                race_ids.insert(race.name.clone(), id);
            }

            for contract in &self.contracts {
                insert_contract(
                    &pool,
                    &NewContract {
                        driver_id: driver_ids[&contract.driver],
                        team_id: team_ids[&contract.team],
                        start_date: date("2023-01-01"),
                        end_date: None,
                        status: Some(contract.status),
                    },
                )
                .await?;
            }

            for user in &self.users {
                create_user(&pool, &user.username, STANDARD_PASSWORD, user.is_admin).await?;
            }

            Ok(TestDb {
                pool,
                driver_ids,
                team_ids,
                car_ids,
                race_ids,
            })
        }
    }

    pub struct TestDb {
        pub pool: Pool<Sqlite>,
        pub driver_ids: HashMap<String, i64>,
        pub team_ids: HashMap<String, i64>,
        pub car_ids: HashMap<(String, i64), i64>,
        pub race_ids: HashMap<String, i64>,
    }

    impl TestDb {
        pub fn driver_id(&self, name: &str) -> i64 {
            self.driver_ids[name]
        }

        pub fn team_id(&self, name: &str) -> i64 {
            self.team_ids[name]
        }

        pub fn car_id(&self, team: &str, season: i64) -> i64 {
            self.car_ids[&(team.to_string(), season)]
        }

        pub fn race_id(&self, name: &str) -> i64 {
            self.race_ids[name]
        }

        /// A finished result for `driver` in `race`, driving the team's 2024 car.
        pub fn result_fields(&self, race: &str, driver: &str, team: &str) -> RaceResultFields {
            RaceResultFields {
                race_id: self.race_id(race),
                driver_id: self.driver_id(driver),
                team_id: self.team_id(team),
                car_id: self.car_id(team, 2024),
                grid_position: None,
                finish_position: None,
                points_earned: Some(0.0),
                laps_completed: Some(57),
                status: ResultStatus::Finished,
                gap_to_leader: None,
            }
        }

        pub async fn add_result(&self, fields: RaceResultFields) -> RaceResult {
            create_race_result(&self.pool, &fields)
                .await
                .expect("Failed to create race result")
        }

        pub async fn race_wins(&self, driver: &str) -> i64 {
            get_driver(&self.pool, self.driver_id(driver))
                .await
                .expect("Failed to fetch driver")
                .race_wins
        }
    }

    /// Three drivers, three teams with a 2024 car and a car for the current
    /// season, two 2024 races and one regular user.
    pub async fn create_standard_test_db() -> TestDb {
        let season = current_season();

        TestDbBuilder::new()
            .team("Red Bull Racing")
            .team("Mercedes")
            .team("Ferrari")
            .driver("Max Verstappen", Some("VER"), Some(1))
            .driver("Lewis Hamilton", Some("HAM"), Some(44))
            .driver("Charles Leclerc", Some("LEC"), Some(16))
            .car("Red Bull Racing", 2024)
            .car("Mercedes", 2024)
            .car("Ferrari", 2024)
            .car("Red Bull Racing", season)
            .race("Bahrain Grand Prix", 2024, 1, "2024-03-02")
            .race("Saudi Arabian Grand Prix", 2024, 2, "2024-03-09")
            .contract("Max Verstappen", "Red Bull Racing", ContractStatus::Active)
            .contract("Lewis Hamilton", "Mercedes", ContractStatus::Active)
            .contract("Charles Leclerc", "Ferrari", ContractStatus::Terminated)
            .user("race_admin", false)
            .build()
            .await
            .expect("Failed to build standard test database")
    }

    pub fn test_config() -> AppConfig {
        AppConfig {
            database_url: "sqlite::memory:".to_string(),
            secret_key: None,
            session_ttl_hours: 24,
            secure_cookies: false,
            cors_allowed_origins: vec!["http://localhost:3000".to_string()],
            environment: "test".to_string(),
            telemetry: None,
        }
    }

    pub async fn setup_test_client(test_db: TestDb) -> (Client, TestDb) {
        let rocket = init_rocket(test_db.pool.clone(), &test_config());

        let client = Client::tracked(rocket)
            .await
            .expect("Failed to create Rocket test client");

        (client, test_db)
    }

    /// Logs in through the API. The tracked client keeps the session cookie
    /// for every later request.
    pub async fn login_test_user(client: &Client, username: &str, password: &str) {
        let response = client
            .post("/api/auth/login")
            .header(ContentType::JSON)
            .body(json!({ "username": username, "password": password }).to_string())
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok, "Login failed for {}", username);
    }
}
