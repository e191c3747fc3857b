pub mod app;
pub mod crypto;
pub mod devtools;
pub mod domain;
pub mod infra;
pub mod storage;
pub mod transport;

// Convenience re-exports (keeps call-sites clean)
pub use app::{AssetService, GovernanceService, TokenomicsService};
pub use infra::config::Config;
pub use infra::solana::{InMemoryLedger, SolanaLedger, TokenLedger};
pub use storage::{MemoryStore, PgStore};
pub use transport::http::{create_router, ApiDoc, AppState};
