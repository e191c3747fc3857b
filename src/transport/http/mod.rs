pub mod auth;
pub mod csrf;
pub mod error;
pub mod middleware;
pub mod rate_limit;
pub mod router;
pub mod types;
pub mod handlers {
    pub mod assets;
    pub mod csrf;
    pub mod governance;
    pub mod health;
    pub mod metrics;
    pub mod token;
}

pub use error::{ApiError, ApiResult};
pub use router::{api_routes, create_router, ApiDoc};
pub use types::AppState;
