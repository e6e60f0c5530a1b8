//! Per-project isolated dependency environments: deterministic ids, a
//! `CREATED -> READY -> DESTROYED` lifecycle, and provisioning behind an
//! injectable backend.

mod manager;
mod provision;

pub use manager::{EnvManagerConfig, EnvironmentManager};
pub use provision::{Provisioner, VenvProvisioner};
