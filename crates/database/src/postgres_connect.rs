/// Initializes the connection pool for the application and optionally bootstraps tables.
///
/// # Generated Functions
/// - `async fn connect(drop_tables: bool, create_tables: bool) -> anyhow::Result<&'static sqlx::PgPool>`
///
/// # Example
/// ```rust,ignore
/// init_databases!(
///     default: [Session, StoryPart]
/// );
///
/// let pool = connect(false, true).await?;
/// ```
#[macro_export]
macro_rules! init_databases {
    (
        default: [$($default_type:ty),* $(,)?]
    ) => {
        static POOL: tokio::sync::OnceCell<sqlx::PgPool> = tokio::sync::OnceCell::const_new();

        pub async fn connect(drop_tables: bool, create_tables: bool) -> anyhow::Result<&'static sqlx::PgPool> {
            POOL.get_or_try_init(|| async {
                let database_url = std::env::var("DATABASE_URL")
                    .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable not set"))?;

                let pool = sqlx::postgres::PgPoolOptions::new()
                    .acquire_timeout(std::time::Duration::from_secs(10))
                    .connect(&database_url)
                    .await?;

                if drop_tables {
                    // Reverse order so referencing tables go first.
                    let mut drops: Vec<String> = Vec::new();
                    $(
                        drops.push(<$default_type as $crate::SqlxSchema>::drop_table_sql());
                    )*
                    for drop_table_sql_str in drops.into_iter().rev() {
                        if let Err(e) = sqlx::query(&drop_table_sql_str).execute(&pool).await {
                            tracing::warn!("[init_databases] Failed to drop table. SQL: {}. Error: {:?}", drop_table_sql_str, e);
                        }
                    }
                }

                if create_tables {
                    $(
                        let create_table_sql_str = <$default_type as $crate::SqlxSchema>::create_table_sql();
                        sqlx::query(&create_table_sql_str).execute(&pool).await
                            .map_err(|e| anyhow::anyhow!("Failed to create table for '{}': {:?}", stringify!($default_type), e))?;

                        for index_sql in <$default_type as $crate::SqlxSchema>::INDEXES_SQL {
                            sqlx::query(index_sql).execute(&pool).await
                                .map_err(|e| anyhow::anyhow!("Failed to create index for '{}'. SQL: {}. Error: {:?}", stringify!($default_type), index_sql, e))?;
                        }
                    )*
                    tracing::info!("[init_databases] Tables are in place");
                }

                Ok::<_, anyhow::Error>(pool)
            }).await
        }
    };
}
