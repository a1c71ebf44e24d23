//! # Built-in middleware
//!
//! Ready-made middleware for the common wrapping patterns: memoization,
//! permission checks, timeouts, timing and failure recovery.

pub mod cache;
pub mod permission;
pub mod recover;
pub mod timeout;
pub mod timing;

pub use cache::{CacheMiddleware, CACHE_HIT_FIELD};
pub use permission::PermissionMiddleware;
pub use recover::RecoverMiddleware;
pub use timeout::{TimeoutConfig, TimeoutMiddleware};
pub use timing::{TimingMiddleware, ELAPSED_FIELD, STARTED_AT_FIELD};
