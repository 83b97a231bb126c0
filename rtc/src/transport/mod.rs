use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use interceptor::{Attributes, RTCPReader, RTPReader, StreamInfo};
use shared::crypto::KeyingMaterialExporter;
use shared::error::Result;
use srtp::session::{ReadStream, Session};
use tokio::sync::watch;

use crate::relay::RelayClient;
use crate::rtp_transceiver::{RtpCodecKind, SSRC};

pub mod fingerprint;
pub mod ice;
pub mod parameters;
pub mod role;
pub mod shared_transport;
pub mod state;

pub use fingerprint::RTCDtlsFingerprint;
pub use ice::IceTransport;
pub use parameters::SecurityParameters;
pub use role::RTCDtlsRole;
pub use shared_transport::RTCSharedTransport;
pub use state::RTCSecurityTransportState;

pub type OnStateChangeHdlrFn = Box<dyn (Fn(RTCSecurityTransportState)) + Send + Sync>;

/// SecurityTransportType tells which kind of key establishment a transport uses.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SecurityTransportType {
    /// Keys come from a DTLS handshake with the remote peer.
    Dtls,
    /// Keys come from a secret shared by the whole group.
    Shared,
}

/// SrtpReadiness is the value carried by the readiness signal.
///
/// It leaves `Pending` exactly once. `Ready` may later turn into `Closed`
/// when the transport stops; `Failed` and `Closed` never change again.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum SrtpReadiness {
    #[default]
    Pending,
    /// Both sessions exist.
    Ready,
    /// start failed, the sessions will never exist.
    Failed,
    /// The transport was stopped.
    Closed,
}

impl SrtpReadiness {
    pub fn is_ready(&self) -> bool {
        *self == SrtpReadiness::Ready
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SrtpReadiness::Failed | SrtpReadiness::Closed)
    }
}

/// SessionPair holds the SRTP and SRTCP sessions of a started transport.
/// Both are installed and removed together.
pub struct SessionPair {
    pub srtp: Arc<dyn Session>,
    pub srtcp: Arc<dyn Session>,
}

/// TrackStreams maintains the RTP/RTCP streams opened for one remote SSRC,
/// together with the interceptor readers bound on top of them.
pub struct TrackStreams {
    pub ssrc: SSRC,
    pub stream_info: StreamInfo,

    pub rtp_read_stream: Arc<dyn ReadStream>,
    pub rtp_interceptor: Arc<dyn RTPReader + Send + Sync>,

    pub rtcp_read_stream: Arc<dyn ReadStream>,
    pub rtcp_interceptor: Arc<dyn RTCPReader + Send + Sync>,
}

/// SecurityTransport protects the RTP and RTCP traffic of senders and receivers.
#[async_trait]
pub trait SecurityTransport: Send + Sync {
    fn transport_type(&self) -> SecurityTransportType;

    /// ice_transport returns the currently-configured ICE transport or None
    /// if one has not been configured
    fn ice_transport(&self) -> Option<Arc<dyn IceTransport>>;

    /// relay_client returns the relay used for relay delivery, if any.
    fn relay_client(&self) -> Option<Arc<dyn RelayClient>>;

    /// on_state_change sets a handler that is fired when the transport state
    /// changes. Setting a new handler replaces the previous one.
    async fn on_state_change(&self, f: OnStateChangeHdlrFn);

    async fn state(&self) -> RTCSecurityTransportState;

    /// write_rtcp encrypts user provided RTCP packets and sends them to the
    /// connected peer.
    async fn write_rtcp(&self, pkts: &[Box<dyn rtcp::packet::Packet + Send + Sync>])
    -> Result<usize>;

    async fn write_insecure_rtcp(
        &self,
        pkts: &[Box<dyn rtcp::packet::Packet + Send + Sync>],
    ) -> Result<usize>;

    /// write_relay_rtcp encrypts user provided RTCP packets and forwards them
    /// on the relay channel of `kind`.
    async fn write_relay_rtcp(
        &self,
        pkts: &[Box<dyn rtcp::packet::Packet + Send + Sync>],
        kind: RtpCodecKind,
    ) -> Result<usize>;

    async fn write_insecure_relay_rtcp(
        &self,
        pkts: &[Box<dyn rtcp::packet::Packet + Send + Sync>],
        kind: RtpCodecKind,
    ) -> Result<usize>;

    fn get_local_parameters(&self) -> Result<SecurityParameters>;

    /// get_remote_certificate returns the certificate chain in use by the remote side
    /// returns an empty list prior to selection of the remote certificate
    fn get_remote_certificate(&self) -> Bytes;

    fn dtls_role(&self) -> RTCDtlsRole;

    async fn start(&self, remote_parameters: SecurityParameters) -> Result<()>;

    /// stop releases every resource the transport owns and reports all
    /// failures together.
    async fn stop(&self) -> Result<()>;

    fn srtp_session(&self) -> Option<Arc<dyn Session>>;

    fn srtcp_session(&self) -> Option<Arc<dyn Session>>;

    async fn store_simulcast_stream(&self, stream: Arc<dyn ReadStream>);

    async fn streams_for_ssrc(&self, ssrc: SSRC, stream_info: &StreamInfo) -> Result<TrackStreams>;

    /// srtp_ready returns a receiver that observes `Ready` once both sessions
    /// exist, or `Failed`/`Closed` when they never will.
    fn srtp_ready(&self) -> watch::Receiver<SrtpReadiness>;
}

/// GroupKeyAgreement is implemented by transports whose keys are rotated by a
/// group key agreement protocol.
#[async_trait]
pub trait GroupKeyAgreement {
    async fn update_keys(&self, exporter: &dyn KeyingMaterialExporter) -> Result<()>;
}

/// ReadStreamReader adapts a session read stream to the interceptor reader traits.
pub(crate) struct ReadStreamReader {
    stream: Arc<dyn ReadStream>,
}

impl ReadStreamReader {
    pub(crate) fn new(stream: Arc<dyn ReadStream>) -> Self {
        ReadStreamReader { stream }
    }
}

#[async_trait]
impl RTPReader for ReadStreamReader {
    async fn read(&self, buf: &mut [u8], attributes: &Attributes) -> Result<(usize, Attributes)> {
        let n = self.stream.read(buf).await?;
        Ok((n, attributes.clone()))
    }
}

#[async_trait]
impl RTCPReader for ReadStreamReader {
    async fn read(&self, buf: &mut [u8], attributes: &Attributes) -> Result<(usize, Attributes)> {
        let n = self.stream.read(buf).await?;
        Ok((n, attributes.clone()))
    }
}
