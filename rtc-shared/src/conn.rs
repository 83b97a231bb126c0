use async_trait::async_trait;

use crate::error::Result;

/// Conn is a datagram endpoint handed out by the connectivity layer.
///
/// Every endpoint only sees the packets its match function accepted, so
/// SRTP and SRTCP sessions can share one socket.
#[async_trait]
pub trait Conn {
    async fn recv(&self, buf: &mut [u8]) -> Result<usize>;
    async fn send(&self, buf: &[u8]) -> Result<usize>;
    async fn close(&self) -> Result<()>;
}
