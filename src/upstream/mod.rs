pub mod client;
pub mod messages;

pub use client::{UpstreamConnection, UpstreamReader, UpstreamWriter};
pub use messages::{RealtimeCommand, RealtimeServerEvent, SessionUpdate};
