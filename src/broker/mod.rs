//! Broker metadata access.
//!
//! # Data Flow
//! ```text
//! bootstrap list (string)
//!     → address.rs (parse host:port entries)
//!     → MetadataConnector::connect (lazy, no I/O yet)
//!     → MetadataClient::list_topics (one metadata round trip per call)
//! ```
//!
//! # Design Decisions
//! - The client is a trait so the readiness probe can be driven by any broker
//!   implementation, including scripted ones in tests
//! - Every failure carries its retry classification (`is_retriable`); broker
//!   error codes use the protocol's own table (`ResponseError`)
//! - Connections are owned by the client value; dropping it releases them

pub mod address;
pub mod kafka;

use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;

pub use address::{AddressError, BootstrapServers, BrokerAddress};
pub use kafka::{KafkaConnector, KafkaMetadataClient};
pub use kafka_protocol::ResponseError;

use crate::resilience::timeouts::TimedOut;

/// Errors returned by a metadata fetch.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The broker did not answer within the per-call timeout.
    #[error("metadata request timed out after {0:?}")]
    Timeout(Duration),

    /// No connection could be established, or it broke mid-request.
    #[error("broker {broker} unreachable: {source}")]
    Unreachable {
        broker: String,
        #[source]
        source: std::io::Error,
    },

    /// The request as a whole was answered with an error code. Errors
    /// attached to single topics only hide those topics from the listing.
    #[error("broker returned {0} ({code})", code = .0.code())]
    Broker(ResponseError),

    /// The response could not be encoded or decoded.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl MetadataError {
    /// Returns true for transient causes: timeouts, unreachable brokers and
    /// retriable broker error codes.
    pub fn is_retriable(&self) -> bool {
        match self {
            MetadataError::Timeout(_) => true,
            MetadataError::Unreachable { .. } => true,
            MetadataError::Broker(code) => code.is_retriable(),
            MetadataError::Protocol(_) => false,
        }
    }
}

impl From<TimedOut> for MetadataError {
    fn from(e: TimedOut) -> Self {
        MetadataError::Timeout(e.0)
    }
}

/// Options for the administrative metadata connection.
#[derive(Debug, Clone)]
pub struct AdminOptions {
    /// Client id sent with every request.
    pub client_id: String,
    /// Per-call timeout.
    pub request_timeout: Duration,
}

/// A lightweight administrative connection able to list topic names.
pub trait MetadataClient: Send {
    /// List all non-internal topic names known to the cluster.
    fn list_topics(
        &mut self,
    ) -> impl Future<Output = Result<BTreeSet<String>, MetadataError>> + Send;
}

/// Creates metadata clients bound to a bootstrap list.
pub trait MetadataConnector {
    type Client: MetadataClient;

    /// Create a client. Connecting is lazy: failures surface on the first
    /// `list_topics` call so they get the same retry treatment.
    fn connect(&self, servers: &BootstrapServers, options: &AdminOptions) -> Self::Client;
}
