//! Engine module: assembles and sequences the external commands of a run.
//!
//! # Architecture
//!
//! - **Executor**: runs a `CommandSpec` (program, args, directory, env overrides).
//!   `SystemExecutor` spawns real processes; `MockExecutor` records calls for tests.
//!
//! - **git / toolchain**: build the `CommandSpec`s for repository operations
//!   (rev-parse, clone, checkout) and toolchain operations (make.bash,
//!   toolstash save, go install, the comparison build).
//!
//! The `workflow` submodule strings these together into a single linear run.
//!
//! # Boundaries
//!
//! - Command builders never execute anything.
//! - Executors never decide what runs next; the workflow does.

pub mod executor;
pub mod git;
pub mod toolchain;
pub mod workflow;

// Re-export key types for convenience
pub use executor::{CommandSpec, Executor, MockExecutor, Step, SystemExecutor};
pub use toolchain::GoToolchain;
pub use workflow::{CheckOutcome, Revisions, Stage, resolve_revisions, run};
