use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    config::Config,
    error::StoreError,
    models::{IdentityPatch, IdentityRecord, NewIdentityRecord},
    services::identity_store::IdentityStore,
    utils::address_key,
};

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let url = config
            .database_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set for the postgres store"))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn store_error(err: sqlx::Error, address: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            StoreError::Duplicate(address.to_string())
        }
        _ => StoreError::Connectivity(err.to_string()),
    }
}

// ==================== USER QUERIES ====================
#[async_trait::async_trait]
impl IdentityStore for Database {
    async fn get(&self, address: &str) -> Result<Option<IdentityRecord>, StoreError> {
        sqlx::query_as::<_, IdentityRecord>("SELECT * FROM users WHERE wallet_address = $1")
            .bind(address_key(address))
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| store_error(err, address))
    }

    async fn create(&self, record: NewIdentityRecord) -> Result<IdentityRecord, StoreError> {
        let record = record.keyed();
        sqlx::query_as::<_, IdentityRecord>(
            r#"
            INSERT INTO users
                (wallet_address, username, highest_score, total_accumulated_score, games_played)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&record.wallet_address)
        .bind(&record.username)
        .bind(record.highest_score)
        .bind(record.total_accumulated_score)
        .bind(record.games_played)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| store_error(err, &record.wallet_address))
    }

    async fn update(
        &self,
        address: &str,
        patch: IdentityPatch,
    ) -> Result<IdentityRecord, StoreError> {
        // NULL parameters leave the column untouched
        sqlx::query_as::<_, IdentityRecord>(
            r#"
            UPDATE users
            SET username        = COALESCE($2, username),
                updated         = COALESCE($3, updated),
                registration_tx = COALESCE($4, registration_tx),
                updated_at      = NOW()
            WHERE wallet_address = $1
            RETURNING *
            "#,
        )
        .bind(address_key(address))
        .bind(patch.username)
        .bind(patch.on_chain_confirmed)
        .bind(patch.registration_tx)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| store_error(err, address))?
        .ok_or_else(|| StoreError::RecordMissing(address.to_string()))
    }

    async fn delete(&self, address: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE wallet_address = $1")
            .bind(address_key(address))
            .execute(&self.pool)
            .await
            .map_err(|err| store_error(err, address))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::RecordMissing(address.to_string()));
        }
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "postgres"
    }
}
