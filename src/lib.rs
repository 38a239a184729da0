pub mod config;
pub mod error;
pub mod routes;
pub mod timings;

pub use config::Config;
pub use error::AppError;
pub use routes::build_router;
pub use timings::{compute_event_timings, compute_timings, ActivityRecord, EventTimings};
