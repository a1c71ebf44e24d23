pub mod hooks_config;
pub mod validation;

pub use hooks_config::*;
pub use validation::*;
