//! Updaemon keeps systemd-managed services current: it asks a
//! distribution plugin for the latest version of each registered
//! service, downloads new releases into versioned directories under the
//! service root, and cuts over atomically through a `current` symlink
//! before reconciling the unit.

pub mod client;
pub mod config;
pub mod detect;
pub mod error;
pub mod paths;
pub mod permissions;
pub mod secrets;
pub mod symlink;
pub mod systemd;
pub mod timer;
pub mod unitfile;
pub mod update;

pub use error::{Result, UpdaemonError};
