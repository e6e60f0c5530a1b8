mod config;
mod error;
mod factory;
mod sandbox;

pub use config::{ResourceLimits, SandboxSpec, parse_memory_limit};
pub use error::{Result, SandboxError};
pub use factory::SandboxFactory;
pub use sandbox::{OutputSnapshot, Sandbox, SandboxStatus, UsageSample};
