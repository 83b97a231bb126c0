use std::sync::Arc;

use arc_swap::ArcSwapOption;
use bytes::{Bytes, BytesMut};
use shared::error::{Error, Result};
use srtp::session::{ReadStream, WriteStream};
use tokio::sync::{watch, Mutex};
use util::marshal::Marshal;

use crate::configuration::setting_engine::{SettingEngine, WriterReadiness};
use crate::relay::produce_payload;
use crate::rtp_transceiver::{RtpCodecKind, SSRC};
use crate::transport::{SecurityTransport, SrtpReadiness};

/// Streams a writer binds once the sessions are ready.
struct BoundStreams {
    rtcp_read_stream: Arc<dyn ReadStream>,
    rtp_write_stream: Arc<dyn WriteStream>,
}

/// SrtpWriterFuture blocks read/write calls until
/// the SRTP Session is available
pub struct SrtpWriterFuture {
    ssrc: SSRC,
    kind: RtpCodecKind,
    transport: Arc<dyn SecurityTransport>,
    setting_engine: Arc<SettingEngine>,
    readiness: WriterReadiness,
    stop_called_rx: watch::Receiver<bool>,

    streams: ArcSwapOption<BoundStreams>,
    closed: Mutex<bool>,
}

impl SrtpWriterFuture {
    /// new creates a writer for one sender SSRC.
    ///
    /// `stop_called_rx` is the sender's stop signal. Once it observes `true`,
    /// a writer that is still waiting for the sessions gives up with
    /// `ErrClosedPipe`.
    pub(crate) fn new(
        ssrc: SSRC,
        kind: RtpCodecKind,
        transport: Arc<dyn SecurityTransport>,
        setting_engine: Arc<SettingEngine>,
        stop_called_rx: watch::Receiver<bool>,
    ) -> Self {
        let readiness = setting_engine.writer_readiness;
        SrtpWriterFuture {
            ssrc,
            kind,
            transport,
            setting_engine,
            readiness,
            stop_called_rx,
            streams: ArcSwapOption::empty(),
            closed: Mutex::new(false),
        }
    }

    /// with_readiness overrides the readiness mode taken from the setting engine.
    pub fn with_readiness(mut self, readiness: WriterReadiness) -> Self {
        self.readiness = readiness;
        self
    }

    pub fn ssrc(&self) -> SSRC {
        self.ssrc
    }

    pub fn kind(&self) -> RtpCodecKind {
        self.kind
    }

    pub fn is_bound(&self) -> bool {
        self.streams.load().is_some()
    }

    async fn wait_for_srtp(&self, readiness: WriterReadiness) -> Result<()> {
        let mut srtp_ready = self.transport.srtp_ready();
        let mut stop_called = self.stop_called_rx.clone();

        if *stop_called.borrow() {
            return Err(Error::ErrClosedPipe);
        }

        let outcome = match readiness {
            WriterReadiness::ReturnImmediately => *srtp_ready.borrow(),
            WriterReadiness::Block => {
                tokio::select! {
                    biased;
                    _ = async {
                        // a dropped stop sender never signals
                        if stop_called.wait_for(|stopped| *stopped).await.is_err() {
                            std::future::pending::<()>().await;
                        }
                    } => {
                        return Err(Error::ErrClosedPipe);
                    }
                    outcome = async {
                        srtp_ready
                            .wait_for(|ready| *ready != SrtpReadiness::Pending)
                            .await
                            .map(|outcome| *outcome)
                            .unwrap_or(SrtpReadiness::Closed)
                    } => outcome,
                }
            }
        };

        match outcome {
            SrtpReadiness::Ready => Ok(()),
            SrtpReadiness::Pending | SrtpReadiness::Failed => Err(Error::ErrSessionNotStarted),
            SrtpReadiness::Closed => Err(Error::ErrClosedPipe),
        }
    }

    async fn init(&self, readiness: WriterReadiness) -> Result<Arc<BoundStreams>> {
        if let Err(err) = self.wait_for_srtp(readiness).await {
            if err == Error::ErrClosedPipe {
                let mut closed = self.closed.lock().await;
                *closed = true;
            }
            return Err(err);
        }

        let closed = self.closed.lock().await;
        if *closed {
            return Err(Error::ErrClosedPipe);
        }

        // another caller may have bound while this one waited for the lock
        if let Some(streams) = self.streams.load_full() {
            return Ok(streams);
        }

        let srtcp_session = self
            .transport
            .srtcp_session()
            .ok_or(Error::ErrSessionNotStarted)?;
        let rtcp_read_stream = srtcp_session.open_read_stream(self.ssrc).await?;

        let srtp_session = self
            .transport
            .srtp_session()
            .ok_or(Error::ErrSessionNotStarted)?;
        let rtp_write_stream = srtp_session.open_write_stream().await?;

        let streams = Arc::new(BoundStreams {
            rtcp_read_stream,
            rtp_write_stream,
        });
        self.streams.store(Some(Arc::clone(&streams)));
        log::trace!("srtp writer for ssrc {} bound", self.ssrc);

        Ok(streams)
    }

    async fn bound_streams(&self, readiness: WriterReadiness) -> Result<Arc<BoundStreams>> {
        match self.streams.load_full() {
            Some(streams) => Ok(streams),
            None => self.init(readiness).await,
        }
    }

    fn relay_delivery(&self) -> bool {
        self.setting_engine.relay_delivery_enabled()
    }

    /// close closes the RTCP read stream if it was bound. Calling it again is a no-op.
    pub async fn close(&self) -> Result<()> {
        let mut closed = self.closed.lock().await;
        if *closed {
            return Ok(());
        }
        *closed = true;

        if let Some(streams) = self.streams.load_full() {
            streams.rtcp_read_stream.close().await
        } else {
            Ok(())
        }
    }

    /// read reads RTCP addressed to the sender, waiting for the sessions if needed.
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let streams = self.bound_streams(WriterReadiness::Block).await?;
        streams.rtcp_read_stream.read(buf).await
    }

    pub async fn write_rtp(&self, header: &rtp::header::Header, payload: &[u8]) -> Result<usize> {
        if self.relay_delivery() {
            return self.write_relay_rtp(header, payload).await;
        }

        let streams = self.bound_streams(self.readiness).await?;
        streams.rtp_write_stream.write_rtp(header, payload).await
    }

    pub async fn write_insecure_rtp(
        &self,
        header: &rtp::header::Header,
        payload: &[u8],
    ) -> Result<usize> {
        if self.relay_delivery() {
            return self.write_insecure_relay_rtp(header, payload).await;
        }

        let streams = self.bound_streams(self.readiness).await?;
        streams
            .rtp_write_stream
            .write_insecure_rtp(header, payload)
            .await
    }

    pub async fn write(&self, buf: &[u8]) -> Result<usize> {
        if self.relay_delivery() {
            return self.write_relay(buf).await;
        }

        let streams = self.bound_streams(self.readiness).await?;
        streams.rtp_write_stream.write(buf).await
    }

    pub async fn write_insecure(&self, buf: &[u8]) -> Result<usize> {
        if self.relay_delivery() {
            return self.send_relay(Bytes::copy_from_slice(buf)).await;
        }

        let streams = self.bound_streams(self.readiness).await?;
        streams.rtp_write_stream.write_insecure(buf).await
    }

    async fn write_relay_rtp(&self, header: &rtp::header::Header, payload: &[u8]) -> Result<usize> {
        let streams = self.bound_streams(self.readiness).await?;
        let encrypted = streams.rtp_write_stream.encrypt_rtp(header, payload).await?;
        self.send_relay(encrypted).await
    }

    async fn write_insecure_relay_rtp(
        &self,
        header: &rtp::header::Header,
        payload: &[u8],
    ) -> Result<usize> {
        let header_raw = header
            .marshal()
            .map_err(|err| Error::OtherRtpErr(err.to_string()))?;

        let mut raw = BytesMut::with_capacity(header_raw.len() + payload.len());
        raw.extend_from_slice(&header_raw);
        raw.extend_from_slice(payload);
        self.send_relay(raw.freeze()).await
    }

    async fn write_relay(&self, buf: &[u8]) -> Result<usize> {
        let streams = self.bound_streams(self.readiness).await?;
        let encrypted = streams.rtp_write_stream.encrypt(buf).await?;
        self.send_relay(encrypted).await
    }

    async fn send_relay(&self, payload: Bytes) -> Result<usize> {
        let relay_client = self
            .transport
            .relay_client()
            .ok_or(Error::ErrRelayClientNotConfigured)?;
        produce_payload(relay_client.as_ref(), self.kind, payload).await
    }
}
