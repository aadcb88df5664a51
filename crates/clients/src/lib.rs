#[cfg(feature = "llm")]
mod llm;
#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "r2")]
mod r2;

#[cfg(feature = "llm")]
pub use llm::LlmClient;
#[cfg(feature = "postgres")]
pub use postgres::PostgresClient;
#[cfg(feature = "r2")]
pub use r2::{R2Client, ImageUpload};
