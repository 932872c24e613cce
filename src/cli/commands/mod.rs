//! CLI command implementations

pub mod config;
pub mod list;
pub mod run;

pub use config::execute as config;
pub use list::execute as list;
pub use run::execute as run;
