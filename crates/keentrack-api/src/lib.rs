// keentrack-api: Async Rust client for the Keenetic router command interface.

pub mod client;
pub mod digest;
pub mod error;
pub mod models;
pub mod packet;
pub mod transport;

pub use client::DigestClient;
pub use error::Error;
pub use models::{Lease, PollSnapshot, Station};
pub use packet::{decode_packet, encode_packet, ShowCommand};
