//! Command implementations behind the CLI

pub mod check;
pub mod list;
pub mod new;
pub mod show;
pub mod tags;
pub mod watch;
