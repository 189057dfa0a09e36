pub mod client;
pub mod error;
pub mod server_info;
pub mod token_store;

pub use client::{ApiResponse, PendingRequest, SyncClient};
pub use error::SyncError;
pub use server_info::ApiEndpoint;
pub use token_store::{NoopRefresher, TokenRefresher, TokenStore, DEFAULT_REFRESH_COOLDOWN};
