//! Inbound HTTP push transport.

mod server;

pub use server::HttpPushTransport;
