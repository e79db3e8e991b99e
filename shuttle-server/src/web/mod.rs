//! Web layer for the shuttle trip planner.
//!
//! JSON endpoints for stops, vehicles, and trip planning.

mod dto;
mod limit;
mod routes;
mod state;

pub use dto::*;
pub use limit::{FixedWindowLimiter, LimitConfig, LimitError, RateLimiter, allow};
pub use routes::{AppError, create_router};
pub use state::AppState;
