//! Throwaway `PostgreSQL` databases for integration tests.

use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr, Statement};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::migrations::Migrator;

/// Server the test databases are created on.
///
/// Read from `TEST_DB_HOST`, `TEST_DB_PORT`, `TEST_DB_USER` and
/// `TEST_DB_PASSWORD`.
#[derive(Debug, Clone)]
pub struct TestDbConfig {
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Role allowed to create databases.
    pub username: String,
    /// Password for `username`.
    pub password: String,
}

impl TestDbConfig {
    /// Settings from the environment, falling back to the local test server.
    #[must_use]
    pub fn from_env() -> Self {
        let var = |name: &str, default: &str| {
            std::env::var(name).unwrap_or_else(|_| default.to_string())
        };
        Self {
            host: var("TEST_DB_HOST", "localhost"),
            port: var("TEST_DB_PORT", "5433").parse().unwrap_or(5433),
            username: var("TEST_DB_USER", "dashpilot_test"),
            password: var("TEST_DB_PASSWORD", "dashpilot_test"),
        }
    }

    /// Connection URL for `database` on this server.
    #[must_use]
    pub fn url(&self, database: &str) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{database}",
            self.username, self.password, self.host, self.port
        )
    }

    async fn admin(&self, sql: String) -> Result<(), DbErr> {
        let conn = Database::connect(&self.url("postgres")).await?;
        let result = conn
            .execute(Statement::from_string(DatabaseBackend::Postgres, sql))
            .await;
        conn.close().await?;
        result.map(|_| ())
    }
}

/// A migrated database that exists for one test.
pub struct TestDatabase {
    conn: DatabaseConnection,
    name: String,
    config: TestDbConfig,
}

impl TestDatabase {
    /// Create a database with a random name and run the migrations on it.
    pub async fn create_unique() -> Result<Self, DbErr> {
        let config = TestDbConfig::from_env();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let name = format!("dashpilot_test_{}", &suffix[..8]);

        config.admin(format!("CREATE DATABASE \"{name}\"")).await?;
        let conn = Database::connect(&config.url(&name)).await?;
        Migrator::up(&conn, None).await?;

        info!(database = %name, "Created test database");
        Ok(Self { conn, name, config })
    }

    /// Connection to the test database.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Close the connection and drop the database.
    pub async fn drop_database(self) -> Result<(), DbErr> {
        self.conn.close().await?;
        self.config
            .admin(format!("DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)", self.name))
            .await?;

        info!(database = %self.name, "Dropped test database");
        Ok(())
    }
}
