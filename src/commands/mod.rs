//! Use cases behind the CLI subcommands.
//!
//! Each action coordinates the manifest reader and the marker
//! environment over a [`Runtime`](crate::runtime::Runtime), so the CLI
//! layer only formats results.

mod check;
mod env;
mod list;
mod show;

pub use check::{CheckAction, CheckOutcome};
pub use env::environment_text;
pub use list::{ListAction, ListOutcome, RequirementInfo};
pub use show::{ShowAction, ShowOutcome};
