use std::sync::Arc;

use interceptor::{Interceptor, NoopInterceptor};
use shared::error::{Error, Result};
use srtp::session::SessionBackend;
use tokio::sync::watch;

use crate::configuration::setting_engine::SettingEngine;
use crate::relay::RelayClient;
use crate::rtp_transceiver::srtp_writer_future::SrtpWriterFuture;
use crate::rtp_transceiver::{RtpCodecKind, SSRC};
use crate::transport::{IceTransport, RTCSharedTransport, SecurityTransport};

/// API bundles the global functions of the secure transport API.
///
/// Everything created from one API shares its [`SettingEngine`], its
/// [`Interceptor`] and the [`SessionBackend`] that builds SRTP/SRTCP sessions.
pub struct API {
    pub(crate) setting_engine: Arc<SettingEngine>,
    pub(crate) interceptor: Arc<dyn Interceptor + Send + Sync>,
    pub(crate) session_backend: Arc<dyn SessionBackend>,
}

impl API {
    /// new_shared_transport creates a transport whose keys come from a secret
    /// shared by the whole group.
    ///
    /// Without an ICE transport, start fails with `ErrConnectionNotReady`.
    /// The relay client is only needed for relay delivery.
    pub fn new_shared_transport(
        &self,
        ice_transport: Option<Arc<dyn IceTransport>>,
        relay_client: Option<Arc<dyn RelayClient>>,
    ) -> RTCSharedTransport {
        RTCSharedTransport::new(
            ice_transport,
            relay_client,
            Arc::clone(&self.setting_engine),
            Arc::clone(&self.interceptor),
            Arc::clone(&self.session_backend),
        )
    }

    /// new_srtp_writer_future creates the writer of one sender. Writes made
    /// before `transport` is ready wait for it, or fail, depending on
    /// the setting engine's writer readiness.
    pub fn new_srtp_writer_future(
        &self,
        ssrc: SSRC,
        kind: RtpCodecKind,
        transport: Arc<dyn SecurityTransport>,
        stop_called_rx: watch::Receiver<bool>,
    ) -> SrtpWriterFuture {
        SrtpWriterFuture::new(
            ssrc,
            kind,
            transport,
            Arc::clone(&self.setting_engine),
            stop_called_rx,
        )
    }

    /// Returns the internal [`SettingEngine`].
    pub fn setting_engine(&self) -> &SettingEngine {
        &self.setting_engine
    }

    /// Returns the interceptor remote streams are bound through.
    pub fn interceptor(&self) -> Arc<dyn Interceptor + Send + Sync> {
        Arc::clone(&self.interceptor)
    }

    /// close closes the interceptor shared by every transport of this API.
    ///
    /// Stopping a transport only unbinds its own remote streams; call close
    /// once all transports are stopped.
    pub async fn close(&self) -> Result<()> {
        self.interceptor.close().await
    }
}

#[derive(Default)]
pub struct APIBuilder {
    setting_engine: Option<Arc<SettingEngine>>,
    interceptor: Option<Arc<dyn Interceptor + Send + Sync>>,
    session_backend: Option<Arc<dyn SessionBackend>>,
}

impl APIBuilder {
    pub fn new() -> Self {
        APIBuilder::default()
    }

    /// build returns the API, or `ErrNoSessionBackend` when no session
    /// backend was set.
    pub fn build(mut self) -> Result<API> {
        Ok(API {
            setting_engine: self
                .setting_engine
                .take()
                .unwrap_or_else(|| Arc::new(SettingEngine::default())),
            interceptor: self
                .interceptor
                .take()
                .unwrap_or_else(|| Arc::new(NoopInterceptor::new())),
            session_backend: self
                .session_backend
                .take()
                .ok_or(Error::ErrNoSessionBackend)?,
        })
    }

    /// WithSettingEngine allows providing a SettingEngine to the API.
    /// Settings should not be changed after passing the engine to an API.
    pub fn with_setting_engine(mut self, setting_engine: SettingEngine) -> Self {
        self.setting_engine = Some(Arc::new(setting_engine));
        self
    }

    /// with_interceptor allows providing the interceptor chain remote streams
    /// are bound through. Defaults to a [`NoopInterceptor`].
    pub fn with_interceptor(mut self, interceptor: Arc<dyn Interceptor + Send + Sync>) -> Self {
        self.interceptor = Some(interceptor);
        self
    }

    /// with_session_backend sets the backend that builds SRTP/SRTCP sessions.
    pub fn with_session_backend(mut self, session_backend: Arc<dyn SessionBackend>) -> Self {
        self.session_backend = Some(session_backend);
        self
    }
}
