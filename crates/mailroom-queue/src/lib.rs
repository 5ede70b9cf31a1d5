//! Tokio-channel implementation of the Mailroom job queue

pub mod plugin;
pub mod queue;

pub use plugin::QueuePlugin;
pub use queue::BroadcastQueue;
