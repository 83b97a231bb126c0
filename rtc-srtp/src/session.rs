use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use shared::conn::Conn;
use shared::error::Result;

use crate::config::{Config, SessionKeys};
use crate::protection_profile::ProtectionProfile;

/// SessionKind tells which packets a session protects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKind {
    Srtp,
    Srtcp,
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            SessionKind::Srtp => "SRTP",
            SessionKind::Srtcp => "SRTCP",
        };
        write!(f, "{s}")
    }
}

/// ReadStream delivers the decrypted packets of one SSRC.
#[async_trait]
pub trait ReadStream: Send + Sync {
    fn ssrc(&self) -> u32;

    /// read blocks until a packet for this SSRC arrives or the stream closes.
    async fn read(&self, buf: &mut [u8]) -> Result<usize>;

    async fn close(&self) -> Result<()>;
}

/// WriteStream protects outgoing packets with the session's local context.
#[async_trait]
pub trait WriteStream: Send + Sync {
    /// write encrypts a marshaled packet and sends it.
    async fn write(&self, buf: &[u8]) -> Result<usize>;

    /// write_insecure sends a marshaled packet as is.
    async fn write_insecure(&self, buf: &[u8]) -> Result<usize>;

    async fn write_rtp(&self, header: &rtp::header::Header, payload: &[u8]) -> Result<usize>;

    async fn write_insecure_rtp(
        &self,
        header: &rtp::header::Header,
        payload: &[u8],
    ) -> Result<usize>;

    /// encrypt protects a marshaled packet and hands it back instead of sending it.
    async fn encrypt(&self, buf: &[u8]) -> Result<Bytes>;

    async fn encrypt_rtp(&self, header: &rtp::header::Header, payload: &[u8]) -> Result<Bytes>;
}

/// Session is one live SRTP or SRTCP context pair (local and remote).
///
/// Read streams are keyed by SSRC, opening the same SSRC twice returns the
/// stream that is already open.
#[async_trait]
pub trait Session: Send + Sync {
    fn kind(&self) -> SessionKind;

    async fn open_read_stream(&self, ssrc: u32) -> Result<Arc<dyn ReadStream>>;

    async fn open_write_stream(&self) -> Result<Arc<dyn WriteStream>>;

    /// update_keys swaps the master keys of both contexts in place.
    /// Streams that are already open keep working with the new keys.
    async fn update_keys(&self, keys: &SessionKeys, profile: ProtectionProfile) -> Result<()>;

    /// decrypt feeds a protected packet that arrived outside the session's
    /// endpoint into the session, as if it had been read from it.
    async fn decrypt(&self, buf: &[u8]) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// SessionBackend builds sessions on top of an endpoint.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn new_session(
        &self,
        kind: SessionKind,
        conn: Arc<dyn Conn + Send + Sync>,
        config: &Config,
    ) -> Result<Arc<dyn Session>>;
}
