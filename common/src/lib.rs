//! Shared building blocks for updaemon and its distribution plugins.
//!
//! A distribution plugin is a standalone executable linked against this
//! crate. It implements [`Distribution`] and hands the implementation to
//! [`host::run`], which owns the `--pipe-name` socket, the line-delimited
//! JSON framing, and the request dispatch loop. The updaemon core links
//! the same crate for the wire types and the version model.

pub mod distribution;
pub mod host;
pub mod rpc;
pub mod secrets;
pub mod version;

pub use distribution::Distribution;
pub use secrets::SecretCollection;
pub use version::Version;
