//! Command implementations for aimgr-cli

pub mod info;
pub mod init;
pub mod package;
pub mod prune;
pub mod resources;
pub mod source;
pub mod sync;
pub mod verify;

pub use info::{run_info, run_show};
pub use init::{run_drop, run_init};
pub use package::run_create_package;
pub use prune::run_prune;
pub use resources::{run_list, run_rm};
pub use source::{AddArgs, run_add, run_remove};
pub use sync::run_sync;
pub use verify::{run_repair, run_verify};
