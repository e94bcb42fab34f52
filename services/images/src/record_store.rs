use crate::config::DatabaseConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use tracing::{debug, info, instrument};

/// Relational index of stored images, keyed by (service id, service type)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert one image record and return its database-assigned id
    async fn insert(&self, image_url: &str, service_id: i64, service_type: i64) -> Result<u64>;

    /// All image URLs for the pair, in insertion order
    async fn query_by_key(&self, service_id: i64, service_type: i64) -> Result<Vec<String>>;

    /// Round trip to the database, backs `/ready`
    async fn ping(&self) -> Result<()>;
}

/// MySQL record store over a shared connection pool
pub struct MySqlRecordStore {
    pool: MySqlPool,
}

impl MySqlRecordStore {
    /// Create a new record store with connection pool
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let pool = pool_options(config)
            .connect_with(connect_options(config))
            .await
            .context("Failed to connect to MySQL")?;

        info!(
            host = %config.host,
            port = config.port,
            database = %config.name,
            "Connected to MySQL database"
        );

        Ok(Self { pool })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run migrations")?;

        info!("Database migrations completed");
        Ok(())
    }
}

fn connect_options(config: &DatabaseConfig) -> MySqlConnectOptions {
    MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.name)
}

fn pool_options(config: &DatabaseConfig) -> MySqlPoolOptions {
    MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.connect_timeout())
        .idle_timeout(Some(config.idle_timeout()))
}

#[async_trait]
impl RecordStore for MySqlRecordStore {
    #[instrument(skip(self, image_url))]
    async fn insert(&self, image_url: &str, service_id: i64, service_type: i64) -> Result<u64> {
        let result = sqlx::query(
            "INSERT INTO Imagen (imagenURL, idServicio, tipoServicio) VALUES (?, ?, ?)",
        )
        .bind(image_url)
        .bind(service_id)
        .bind(service_type)
        .execute(&self.pool)
        .await
        .context("Failed to insert image record")?;

        let record_id = result.last_insert_id();

        debug!(record_id = record_id, image_url = %image_url, "Image record inserted");

        Ok(record_id)
    }

    #[instrument(skip(self))]
    async fn query_by_key(&self, service_id: i64, service_type: i64) -> Result<Vec<String>> {
        let urls = sqlx::query_scalar::<_, String>(
            r#"
            SELECT imagenURL FROM Imagen
            WHERE idServicio = ? AND tipoServicio = ?
            ORDER BY idImagen ASC
            "#,
        )
        .bind(service_id)
        .bind(service_type)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query image records")?;

        Ok(urls)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database ping failed")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_config() -> DatabaseConfig {
        DatabaseConfig {
            user: "app".to_string(),
            password: "secret".to_string(),
            host: "127.0.0.1".to_string(),
            port: 1,
            name: "images".to_string(),
            max_connections: 1,
            min_connections: 0,
            connect_timeout_secs: 1,
            idle_timeout_secs: 60,
            run_migrations: false,
        }
    }

    #[tokio::test]
    async fn test_unreachable_database_surfaces_errors() {
        let config = unreachable_config();
        let pool = pool_options(&config).connect_lazy_with(connect_options(&config));
        let store = MySqlRecordStore::from_pool(pool);

        assert!(store.ping().await.is_err());

        let err = store.query_by_key(7, 1).await.unwrap_err();
        assert!(format!("{err:#}").contains("Failed to query image records"));
    }
}
