//! `gatekeeper-bridge` – the synchronous half of the sync/async bridge.
//!
//! A [`CommandExecutor`] owns the device registry and a single dedicated
//! worker thread that drains a FIFO command queue, executing each command
//! against the hardware strictly in submission order. Device-originated
//! events travel the other way: an edge callback builds a payload on the
//! worker side and hands it to a thread-safe [`EventCallback`] which is the
//! only bridge into the cooperative loop.

pub mod executor;

pub use executor::{CommandExecutor, EventCallback};
