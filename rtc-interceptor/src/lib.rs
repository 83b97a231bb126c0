//! RTC Interceptor - async reader interceptors for decrypted RTP/RTCP streams.
//!
//! A secure transport opens one SRTP and one SRTCP read stream per remote
//! SSRC. Before handing them to the application it binds them through an
//! [`Interceptor`], which may wrap the readers to inspect packets, attach
//! [`Attributes`], or generate feedback.
//!
//! # Stream Binding
//!
//! ```ignore
//! use std::sync::Arc;
//! use rtc_interceptor::{Interceptor, Registry, StreamInfo};
//!
//! let chain = Registry::new().build();
//!
//! let info = StreamInfo {
//!     ssrc: 0x12345678,
//!     clock_rate: 90000,
//!     mime_type: "video/VP8".to_string(),
//!     ..Default::default()
//! };
//!
//! let rtp_reader = chain.bind_remote_stream(&info, rtp_read_stream).await;
//! let rtcp_reader = chain.bind_rtcp_reader(rtcp_read_stream).await;
//! ```

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use shared::error::Result;

mod noop;
mod registry;
pub(crate) mod stream_info;

pub use noop::NoopInterceptor;
pub use registry::{Chain, Registry};
pub use stream_info::{AssociatedStreamInfo, Attributes, RTCPFeedback, RTPHeaderExtension, StreamInfo};

/// RTPReader is used by an Interceptor to read decrypted RTP packets.
#[async_trait]
pub trait RTPReader {
    /// read a marshaled rtp packet into buf, returning its size and the
    /// attributes collected along the chain.
    async fn read(&self, buf: &mut [u8], attributes: &Attributes) -> Result<(usize, Attributes)>;
}

/// RTCPReader is used by an Interceptor to read decrypted RTCP packets.
#[async_trait]
pub trait RTCPReader {
    async fn read(&self, buf: &mut [u8], attributes: &Attributes) -> Result<(usize, Attributes)>;
}

/// Interceptor can be used to add functionality to the readers of remote streams.
///
/// Every bind call receives the reader of the layer below and returns the
/// reader the layer above should use. Returning the argument unchanged is a
/// valid pass-through.
#[async_trait]
pub trait Interceptor {
    /// bind_rtcp_reader lets you modify any incoming RTCP packets. It is called once per sender/receiver, however this might
    /// change in the future. The returned reader will be called once per packet batch.
    async fn bind_rtcp_reader(
        &self,
        reader: Arc<dyn RTCPReader + Send + Sync>,
    ) -> Arc<dyn RTCPReader + Send + Sync>;

    /// bind_remote_stream lets you modify any incoming RTP packets. It is called once for per RemoteStream. The returned reader
    /// will be called once per rtp packet.
    async fn bind_remote_stream(
        &self,
        info: &StreamInfo,
        reader: Arc<dyn RTPReader + Send + Sync>,
    ) -> Arc<dyn RTPReader + Send + Sync>;

    /// unbind_remote_stream is called when the Stream is removed. It can be used to clean up any data related to that track.
    async fn unbind_remote_stream(&self, info: &StreamInfo);

    /// close closes the Interceptor, cleaning up any data if necessary.
    async fn close(&self) -> Result<()>;
}
