//! Process gateway: the only channel to the window manager's query surface.
//!
//! One OS process per call, no retries. Retrying and caching belong to the
//! query cache; this module only spawns, waits and reports.

mod dry_run;
mod process;
mod r#trait;

#[cfg(test)]
pub mod testing;

pub use self::dry_run::DryRunGateway;
pub use self::process::{build_env_overrides, CommandGateway};
pub use self::r#trait::{create_gateway, Invocation, ProcessGateway, ProcessOutput};
