//! gRPC client for the consensus application
//!
//! The application exposes a single unary `StoreBlock` method. Messages are
//! declared here with `prost` derives instead of generated code, since the
//! client only needs these two.

use super::{attestation_from_reply, ConsensusGate};
use crate::{config::ConsensusConfig, types::Hash, Error, Result};
use async_trait::async_trait;
use std::time::Duration;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};

/// `StoreBlock` request
#[derive(Clone, PartialEq, prost::Message)]
pub struct RequestStoreBlock {
    /// Serialized submission
    #[prost(string, tag = "1")]
    pub block_info: String,
}

/// `StoreBlock` response
#[derive(Clone, PartialEq, prost::Message)]
pub struct ResponseStoreBlock {
    /// Attestation reference, empty when the payload was not accepted
    #[prost(string, tag = "1")]
    pub data: String,
}

/// Consensus gate backed by a gRPC channel
#[derive(Debug, Clone)]
pub struct GrpcConsensusGate {
    channel: Channel,
    path: PathAndQuery,
}

impl GrpcConsensusGate {
    /// Build a lazily connecting client
    ///
    /// No connection is attempted until the first validation, so the node can
    /// start before the application is up.
    pub fn connect_lazy(config: &ConsensusConfig) -> Result<Self> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let endpoint = Endpoint::from_shared(config.endpoint.clone())
            .map_err(|e| Error::Config(format!("Invalid consensus endpoint: {}", e)))?
            .connect_timeout(timeout);

        let path = PathAndQuery::try_from(config.method_path.as_str())
            .map_err(|e| Error::Config(format!("Invalid consensus method path: {}", e)))?;

        tracing::info!(
            endpoint = %config.endpoint,
            method = %config.method_path,
            "Consensus client configured"
        );

        Ok(Self {
            channel: endpoint.connect_lazy(),
            path,
        })
    }
}

#[async_trait]
impl ConsensusGate for GrpcConsensusGate {
    async fn validate(&self, payload: &[u8], deadline: Duration) -> Result<Hash> {
        let mut client = tonic::client::Grpc::new(self.channel.clone());
        client.ready().await.map_err(|e| {
            tracing::warn!(error = %e, "Consensus application unreachable");
            Error::ValidationFailure(format!("Consensus application unreachable: {}", e))
        })?;

        let mut request = tonic::Request::new(RequestStoreBlock {
            block_info: String::from_utf8_lossy(payload).into_owned(),
        });
        request.set_timeout(deadline);

        let codec: ProstCodec<RequestStoreBlock, ResponseStoreBlock> = ProstCodec::default();
        let response = client
            .unary(request, self.path.clone(), codec)
            .await
            .map_err(|status| {
                tracing::warn!(code = ?status.code(), "StoreBlock call failed");
                Error::ValidationFailure(format!("StoreBlock failed: {}", status.message()))
            })?;

        attestation_from_reply(&response.into_inner().data)
    }
}
