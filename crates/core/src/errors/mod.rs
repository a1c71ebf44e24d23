pub mod core;

pub use self::core::{DomainFailure, HookError, MessageError};
