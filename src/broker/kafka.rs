//! Kafka wire-protocol metadata client.
//!
//! Speaks just enough of the protocol to list topics: a Metadata v1 request
//! for all topics over a size-prefixed TCP frame.

use std::collections::BTreeSet;

use bytes::{BufMut, Bytes, BytesMut};
use kafka_protocol::error::ParseResponseErrorCode;
use kafka_protocol::messages::{
    ApiKey, MetadataRequest, MetadataResponse, RequestHeader, ResponseHeader,
};
use kafka_protocol::protocol::{Decodable, Encodable, StrBytes};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::broker::{
    AdminOptions, BootstrapServers, BrokerAddress, MetadataClient, MetadataConnector,
    MetadataError,
};
use crate::resilience::timeouts::call_with_timeout;

/// Metadata v1 is the oldest version that reports `is_internal` and accepts
/// a null topic list meaning "all topics".
const METADATA_VERSION: i16 = 1;
const REQUEST_HEADER_VERSION: i16 = 1;
const RESPONSE_HEADER_VERSION: i16 = 0;

/// Upper bound on a response frame; anything larger is not a metadata reply.
const MAX_RESPONSE_BYTES: usize = 64 * 1024 * 1024;

/// Creates [`KafkaMetadataClient`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct KafkaConnector;

impl MetadataConnector for KafkaConnector {
    type Client = KafkaMetadataClient;

    fn connect(&self, servers: &BootstrapServers, options: &AdminOptions) -> KafkaMetadataClient {
        KafkaMetadataClient::new(servers.clone(), options.clone())
    }
}

/// Administrative metadata client over a single lazily opened connection.
///
/// On any transport failure the connection is dropped and the next
/// bootstrap broker is tried on the following call.
#[derive(Debug)]
pub struct KafkaMetadataClient {
    servers: BootstrapServers,
    options: AdminOptions,
    stream: Option<TcpStream>,
    next_broker: usize,
    correlation_id: i32,
}

impl KafkaMetadataClient {
    pub fn new(servers: BootstrapServers, options: AdminOptions) -> Self {
        Self {
            servers,
            options,
            stream: None,
            next_broker: 0,
            correlation_id: 0,
        }
    }

    /// Whether a broker connection is currently held.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn current_broker(&self) -> &BrokerAddress {
        let brokers = self.servers.brokers();
        &brokers[self.next_broker % brokers.len()]
    }

    fn rotate_broker(&mut self) {
        self.next_broker = (self.next_broker + 1) % self.servers.len().max(1);
    }

    async fn open(&self) -> Result<TcpStream, MetadataError> {
        let broker = self.current_broker();
        let stream = TcpStream::connect((broker.host.as_str(), broker.port))
            .await
            .map_err(|source| MetadataError::Unreachable {
                broker: broker.to_string(),
                source,
            })?;
        stream.set_nodelay(true).ok();

        tracing::trace!(broker = %broker, "Opened metadata connection");
        Ok(stream)
    }

    fn encode_request(&mut self, request: &MetadataRequest) -> Result<BytesMut, MetadataError> {
        self.correlation_id = self.correlation_id.wrapping_add(1);

        let header = RequestHeader::default()
            .with_request_api_key(ApiKey::Metadata as i16)
            .with_request_api_version(METADATA_VERSION)
            .with_correlation_id(self.correlation_id)
            .with_client_id(Some(StrBytes::from_string(self.options.client_id.clone())));

        let mut buf = BytesMut::new();
        header
            .encode(&mut buf, REQUEST_HEADER_VERSION)
            .map_err(|e| MetadataError::Protocol(format!("encode header: {}", e)))?;
        request
            .encode(&mut buf, METADATA_VERSION)
            .map_err(|e| MetadataError::Protocol(format!("encode request: {}", e)))?;

        let mut frame = BytesMut::with_capacity(4 + buf.len());
        frame.put_i32(buf.len() as i32);
        frame.extend_from_slice(&buf);
        Ok(frame)
    }

    async fn fetch_metadata(&mut self) -> Result<MetadataResponse, MetadataError> {
        let request = MetadataRequest::default().with_topics(None);
        let frame = self.encode_request(&request)?;
        let correlation_id = self.correlation_id;

        let mut stream = match self.stream.take() {
            Some(stream) => stream,
            None => self.open().await?,
        };

        let broker = self.current_broker().to_string();
        let body = round_trip(&mut stream, &frame, &broker).await?;
        // Only a connection that completed a round trip is kept.
        self.stream = Some(stream);

        decode_response(body, correlation_id)
    }
}

impl MetadataClient for KafkaMetadataClient {
    async fn list_topics(&mut self) -> Result<BTreeSet<String>, MetadataError> {
        let limit = self.options.request_timeout;
        let result = match call_with_timeout(limit, self.fetch_metadata()).await {
            Ok(result) => result,
            Err(elapsed) => Err(elapsed.into()),
        };

        match result {
            Ok(response) => Ok(topic_names(&response)),
            Err(e) => {
                if matches!(
                    e,
                    MetadataError::Timeout(_) | MetadataError::Unreachable { .. }
                ) {
                    self.stream = None;
                    self.rotate_broker();
                }
                Err(e)
            }
        }
    }
}

async fn round_trip(
    stream: &mut TcpStream,
    frame: &[u8],
    broker: &str,
) -> Result<Bytes, MetadataError> {
    let unreachable = |source| MetadataError::Unreachable {
        broker: broker.to_string(),
        source,
    };

    stream.write_all(frame).await.map_err(unreachable)?;
    stream.flush().await.map_err(unreachable)?;

    let len = stream.read_i32().await.map_err(unreachable)?;
    if len < 0 || len as usize > MAX_RESPONSE_BYTES {
        return Err(MetadataError::Protocol(format!(
            "invalid response size {} from {}",
            len, broker
        )));
    }

    let mut body = vec![0u8; len as usize];
    stream.read_exact(&mut body).await.map_err(unreachable)?;
    Ok(Bytes::from(body))
}

fn decode_response(mut body: Bytes, expected_correlation_id: i32) -> Result<MetadataResponse, MetadataError> {
    let header = ResponseHeader::decode(&mut body, RESPONSE_HEADER_VERSION)
        .map_err(|e| MetadataError::Protocol(format!("decode header: {}", e)))?;
    if header.correlation_id != expected_correlation_id {
        return Err(MetadataError::Protocol(format!(
            "correlation id mismatch: expected {}, got {}",
            expected_correlation_id, header.correlation_id
        )));
    }

    MetadataResponse::decode(&mut body, METADATA_VERSION)
        .map_err(|e| MetadataError::Protocol(format!("decode response: {}", e)))
}

/// Extract the names of healthy, non-internal topics.
///
/// A topic carrying an error code is left out: it is not usable yet, and it
/// must not hide the topics that are.
fn topic_names(response: &MetadataResponse) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for topic in &response.topics {
        let Some(name) = topic.name.as_ref().map(|n| n.as_str()) else {
            continue;
        };
        if let Some(code) = topic.error_code.err() {
            tracing::trace!(topic = %name, error = %code, "Skipping topic with error");
            continue;
        }
        if !topic.is_internal {
            names.insert(name.to_string());
        }
    }
    names
}
