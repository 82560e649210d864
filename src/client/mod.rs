//! Store transport
//!
//! - **Transport**: the three capabilities the query layer needs
//! - **InfluxClient**: InfluxDB 1.x HTTP implementation
//! - **MemoryTransport**: recording in-process implementation
//! - **TabularResponse**: the table every query comes back as

mod error;
mod influx;
mod response;
mod transport;

pub use error::TransportError;
pub use influx::InfluxClient;
pub use response::TabularResponse;
pub use transport::{MemoryTransport, Transport};
