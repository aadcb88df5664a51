use std::time::Duration;

use storyloom_common::{define_module_client, required_env};
use sqlx::{postgres::PgPoolOptions, PgPool};

define_module_client! {
    (struct PostgresClient, "postgres")
    client_type: PgPool,
    env: ["DATABASE_URL"],
    setup: async {
        let database_url = required_env("DATABASE_URL")?;
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(10))
            .connect(&database_url)
            .await?;
        anyhow::Ok(pool)
    }
}
