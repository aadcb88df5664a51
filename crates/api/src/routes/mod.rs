mod generate;
mod misc;
mod sessions;

pub use generate::generate_routes;
pub use misc::misc_routes;
pub use sessions::session_routes;
