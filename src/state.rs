use sqlx::PgPool;
use std::env;

use crate::db;
use crate::domains::passes::store::PassStore;
use crate::domains::passes::token::PassTokenCodec;

/// Shared application state: the database pool, the pass store over it, the
/// token codec holding the signing key, and the operator session secret.
/// Both secrets are injected here at startup and nowhere else.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub passes: PassStore,
    pub codec: PassTokenCodec,
    pub jwt_secret: String,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|e| anyhow::anyhow!("DATABASE_URL must be set: {}", e))?;
        let db_pool = db::create_pg_pool(&database_url).await?;

        db::init_schema(&db_pool).await?;
        if let Ok(seed_password) = env::var("ADMIN_SEED_PASSWORD") {
            db::seed_admin_accounts(&db_pool, &seed_password).await?;
        }

        let signing_secret = env::var("PASS_SIGNING_SECRET")
            .map_err(|e| anyhow::anyhow!("PASS_SIGNING_SECRET must be set: {}", e))?;
        let codec = PassTokenCodec::new(signing_secret.as_bytes())?;

        let jwt_secret =
            env::var("JWT_SECRET").map_err(|e| anyhow::anyhow!("JWT_SECRET must be set: {}", e))?;

        Ok(AppState {
            passes: PassStore::new(db_pool.clone()),
            db_pool,
            codec,
            jwt_secret,
        })
    }
}
