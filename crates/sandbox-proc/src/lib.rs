//! Process-backed sandbox: runs the entry program as a child process in its
//! own process group, with kernel-enforced resource limits and captured
//! output.

mod factory;
mod proc_stats;
mod sandbox;

pub use factory::ProcessFactory;
pub use sandbox::ProcessSandbox;
