//! Collaborator traits for the OXM SDK
//!
//! The lifecycle core never performs I/O itself. These are the seams it
//! calls into:
//!
//! - [`AdTransport`]: issue an ad request and return the raw response
//! - [`LocationSource`]: last known device location for auto-detection

pub mod location;
pub mod transport;

pub use location::{LocationReading, LocationSource, NoLocation};
pub use transport::{AdResponse, AdTransport, TransportResult};
