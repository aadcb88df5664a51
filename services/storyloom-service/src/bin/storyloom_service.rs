use anyhow::Result;

use storyloom_clients::{LlmClient, PostgresClient, R2Client};
use storyloom_common::{env_flag, EnvVars, ModuleClient};
use storyloom_database::init_databases;
use storyloom_runtime::RuntimeEnv;
use storyloom_service_api::{app, setup_tracing, ApiServerEnv, GlobalState};

init_databases!(
    default: [
        storyloom_runtime::Session,
        storyloom_runtime::StoryPart
    ]
);

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    setup_tracing();

    let api_env = ApiServerEnv::load()?;
    let runtime_env = RuntimeEnv::load()?;

    let create_tables = env_flag("CREATE_TABLES", false);
    let db_pool = connect(false, create_tables).await?;
    let db = PostgresClient::from_client(db_pool.clone());
    let llm = LlmClient::setup_connection().await?;
    let r2 = R2Client::setup_connection().await?;

    let global_state = GlobalState::connect(db, llm, r2, &runtime_env, &api_env);
    let router = app(global_state, api_env.request_timeout());

    let listener = tokio::net::TcpListener::bind(format!(":::{}", api_env.port)).await?;

    tracing::info!("LISTENING ON {}", api_env.port);
    axum::serve(listener, router.into_make_service()).await?;
    Ok(())
}
