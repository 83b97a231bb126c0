use std::sync::Arc;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use bytes::Bytes;
use interceptor::{Interceptor, StreamInfo};
use shared::conn::Conn;
use shared::crypto::{HkdfExporter, KeyingMaterialExporter};
use shared::error::{flatten_errs, Error, Result};
use shared::util::{match_srtcp, match_srtp};
use srtp::config::Config;
use srtp::protection_profile::ProtectionProfile;
use srtp::session::{ReadStream, Session, SessionBackend, SessionKind};
use tokio::sync::{watch, RwLock};

use super::*;
use crate::configuration::setting_engine::SettingEngine;
use crate::relay::{produce_payload, RelayCallback, RelayClient};

struct SharedTransportInternal {
    state: RTCSecurityTransportState,
    on_state_change_handler: Option<OnStateChangeHdlrFn>,

    srtp_protection_profile: ProtectionProfile,
    /// Keys installed by update_keys, used by the next start.
    srtp_config: Option<Config>,

    srtp_endpoint: Option<Arc<dyn Conn + Send + Sync>>,
    srtcp_endpoint: Option<Arc<dyn Conn + Send + Sync>>,
    simulcast_streams: Vec<Arc<dyn ReadStream>>,
    /// Remote streams bound through the interceptor, unbound on stop.
    remote_streams: Vec<StreamInfo>,
}

impl SharedTransportInternal {
    /// state_change requires the caller holds the lock
    fn state_change(&mut self, state: RTCSecurityTransportState) {
        if self.state == state {
            return;
        }
        log::debug!("shared transport state changed: {} -> {}", self.state, state);
        self.state = state;
        if let Some(handler) = &self.on_state_change_handler {
            handler(state);
        }
    }
}

/// RTCSharedTransport allows an application access to information about the
/// shared-key transport over which RTP and RTCP packets are sent and received
/// by senders and receivers.
///
/// Instead of running a DTLS handshake, the SRTP/SRTCP session keys are
/// exported from a secret the whole group shares. The secret is delivered by
/// [`GroupKeyAgreement::update_keys`], which can be called again at any time
/// to rotate the keys of the running sessions.
pub struct RTCSharedTransport {
    ice_transport: Option<Arc<dyn IceTransport>>,
    relay_client: Option<Arc<dyn RelayClient>>,

    setting_engine: Arc<SettingEngine>,
    interceptor: Arc<dyn Interceptor + Send + Sync>,
    session_backend: Arc<dyn SessionBackend>,

    internal: RwLock<SharedTransportInternal>,
    sessions: Arc<ArcSwapOption<SessionPair>>,

    srtp_ready_tx: watch::Sender<SrtpReadiness>,
}

impl RTCSharedTransport {
    pub(crate) fn new(
        ice_transport: Option<Arc<dyn IceTransport>>,
        relay_client: Option<Arc<dyn RelayClient>>,
        setting_engine: Arc<SettingEngine>,
        interceptor: Arc<dyn Interceptor + Send + Sync>,
        session_backend: Arc<dyn SessionBackend>,
    ) -> Self {
        let (srtp_ready_tx, _) = watch::channel(SrtpReadiness::Pending);
        let srtp_protection_profile = setting_engine.srtp_protection_profile;

        RTCSharedTransport {
            ice_transport,
            relay_client,
            setting_engine,
            interceptor,
            session_backend,
            internal: RwLock::new(SharedTransportInternal {
                state: RTCSecurityTransportState::New,
                on_state_change_handler: None,
                srtp_protection_profile,
                srtp_config: None,
                srtp_endpoint: None,
                srtcp_endpoint: None,
                simulcast_streams: vec![],
                remote_streams: vec![],
            }),
            sessions: Arc::new(ArcSwapOption::empty()),
            srtp_ready_tx,
        }
    }

    /// set_readiness moves the readiness signal forward. Terminal values stick.
    fn set_readiness(&self, next: SrtpReadiness) {
        self.srtp_ready_tx.send_if_modified(|current| {
            if *current == next || current.is_terminal() {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    fn ensure_ice_conn(&self) -> Result<Arc<dyn IceTransport>> {
        self.ice_transport
            .clone()
            .ok_or(Error::ErrConnectionNotReady)
    }

    /// srtp_protection_profile returns the profile the next sessions or key
    /// rotation will use.
    pub async fn srtp_protection_profile(&self) -> ProtectionProfile {
        let internal = self.internal.read().await;
        internal.srtp_protection_profile
    }

    /// update_keys_with_profile rotates the keys and switches the protection
    /// profile of both sessions together.
    pub async fn update_keys_with_profile(
        &self,
        exporter: &dyn KeyingMaterialExporter,
        profile: ProtectionProfile,
    ) -> Result<()> {
        let mut internal = self.internal.write().await;

        let mut srtp_config = Config::new(profile);
        srtp_config.extract_session_keys_from_shared(exporter)?;

        if profile.family() != internal.srtp_protection_profile.family() {
            log::debug!(
                "switching SRTP protection profile from {} to {}",
                internal.srtp_protection_profile,
                profile
            );
        }

        let Some(sessions) = self.sessions.load_full() else {
            log::debug!("sessions not started, keys will be used on start");
            internal.srtp_protection_profile = profile;
            internal.srtp_config = Some(srtp_config);
            return Ok(());
        };

        // profile and keys only change once the SRTP session runs them
        sessions
            .srtp
            .update_keys(&srtp_config.keys, profile)
            .await
            .map_err(|err| Error::ErrSRTPKeyUpdateFailed(err.to_string()))?;
        internal.srtp_protection_profile = profile;
        internal.srtp_config = Some(srtp_config.clone());

        if let Err(err) = sessions.srtcp.update_keys(&srtp_config.keys, profile).await {
            log::error!("SRTCP key update failed after SRTP was rotated: {err}");
            return Err(Error::ErrSRTCPKeyUpdateFailed(err.to_string()));
        }

        log::debug!("rotated SRTP/SRTCP session keys");
        Ok(())
    }

    async fn start_srtp(
        &self,
        internal: &SharedTransportInternal,
        srtp_endpoint: Arc<dyn Conn + Send + Sync>,
        srtcp_endpoint: Arc<dyn Conn + Send + Sync>,
    ) -> Result<()> {
        let mut srtp_config = match &internal.srtp_config {
            Some(srtp_config) => srtp_config.clone(),
            None => {
                let secret = self
                    .setting_engine
                    .bootstrap_secret
                    .as_ref()
                    .ok_or(Error::ErrNoKeyingMaterial)?;
                log::warn!("no group keys installed, starting with the bootstrap secret");

                let mut srtp_config = Config::new(internal.srtp_protection_profile);
                srtp_config.extract_session_keys_from_shared(&HkdfExporter::new(secret.clone()))?;
                srtp_config
            }
        };
        self.setting_engine.apply_session_options(&mut srtp_config);

        let srtp_session = self
            .session_backend
            .new_session(SessionKind::Srtp, srtp_endpoint, &srtp_config)
            .await
            .map_err(|err| Error::ErrFailedToStartSRTP(err.to_string()))?;

        let srtcp_session = match self
            .session_backend
            .new_session(SessionKind::Srtcp, srtcp_endpoint, &srtp_config)
            .await
        {
            Ok(srtcp_session) => srtcp_session,
            Err(err) => {
                if let Err(close_err) = srtp_session.close().await {
                    log::warn!("failed to close SRTP session: {close_err}");
                }
                return Err(Error::ErrFailedToStartSRTCP(err.to_string()));
            }
        };

        self.sessions.store(Some(Arc::new(SessionPair {
            srtp: srtp_session,
            srtcp: srtcp_session,
        })));

        self.set_readiness(SrtpReadiness::Ready);

        if let Some(relay_client) = &self.relay_client {
            relay_client
                .set_callback(RelayCallback::new(Arc::clone(&self.sessions)))
                .await;
        }

        Ok(())
    }

    fn srtcp_session_or_err(&self) -> Result<Arc<dyn Session>> {
        self.srtcp_session().ok_or(Error::ErrSessionNotStarted)
    }
}

fn marshal_rtcp(pkts: &[Box<dyn rtcp::packet::Packet + Send + Sync>]) -> Result<Bytes> {
    rtcp::packet::marshal(pkts).map_err(|err| Error::OtherRtcpErr(err.to_string()))
}

async fn close_endpoint(endpoint: Option<Arc<dyn Conn + Send + Sync>>) {
    if let Some(endpoint) = endpoint {
        if let Err(err) = endpoint.close().await {
            log::warn!("failed to close endpoint: {err}");
        }
    }
}

#[async_trait]
impl SecurityTransport for RTCSharedTransport {
    fn transport_type(&self) -> SecurityTransportType {
        SecurityTransportType::Shared
    }

    fn ice_transport(&self) -> Option<Arc<dyn IceTransport>> {
        self.ice_transport.clone()
    }

    fn relay_client(&self) -> Option<Arc<dyn RelayClient>> {
        self.relay_client.clone()
    }

    async fn on_state_change(&self, f: OnStateChangeHdlrFn) {
        let mut internal = self.internal.write().await;
        internal.on_state_change_handler = Some(f);
    }

    async fn state(&self) -> RTCSecurityTransportState {
        let internal = self.internal.read().await;
        internal.state
    }

    async fn write_rtcp(
        &self,
        pkts: &[Box<dyn rtcp::packet::Packet + Send + Sync>],
    ) -> Result<usize> {
        let raw = marshal_rtcp(pkts)?;
        let write_stream = self.srtcp_session_or_err()?.open_write_stream().await?;
        write_stream.write(&raw).await
    }

    async fn write_insecure_rtcp(
        &self,
        pkts: &[Box<dyn rtcp::packet::Packet + Send + Sync>],
    ) -> Result<usize> {
        let raw = marshal_rtcp(pkts)?;
        let write_stream = self.srtcp_session_or_err()?.open_write_stream().await?;
        write_stream.write_insecure(&raw).await
    }

    async fn write_relay_rtcp(
        &self,
        pkts: &[Box<dyn rtcp::packet::Packet + Send + Sync>],
        kind: RtpCodecKind,
    ) -> Result<usize> {
        let relay_client = self
            .relay_client
            .clone()
            .ok_or(Error::ErrRelayClientNotConfigured)?;

        let raw = marshal_rtcp(pkts)?;
        let write_stream = self.srtcp_session_or_err()?.open_write_stream().await?;
        let encrypted = write_stream.encrypt(&raw).await?;

        produce_payload(relay_client.as_ref(), kind, encrypted).await
    }

    async fn write_insecure_relay_rtcp(
        &self,
        pkts: &[Box<dyn rtcp::packet::Packet + Send + Sync>],
        kind: RtpCodecKind,
    ) -> Result<usize> {
        let relay_client = self
            .relay_client
            .clone()
            .ok_or(Error::ErrRelayClientNotConfigured)?;

        let raw = marshal_rtcp(pkts)?;
        produce_payload(relay_client.as_ref(), kind, raw).await
    }

    /// get_local_parameters always reports the auto role and no fingerprints,
    /// there is no certificate behind a shared key.
    fn get_local_parameters(&self) -> Result<SecurityParameters> {
        Ok(SecurityParameters {
            role: RTCDtlsRole::Auto,
            fingerprints: vec![],
        })
    }

    fn get_remote_certificate(&self) -> Bytes {
        Bytes::new()
    }

    fn dtls_role(&self) -> RTCDtlsRole {
        RTCDtlsRole::Auto
    }

    /// start sets up the SRTP/SRTCP endpoints and sessions.
    async fn start(&self, _remote_parameters: SecurityParameters) -> Result<()> {
        let mut internal = self.internal.write().await;

        let ice_transport = self.ensure_ice_conn()?;
        if internal.state != RTCSecurityTransportState::New {
            return Err(Error::ErrInvalidSecurityTransportStart);
        }

        internal.state_change(RTCSecurityTransportState::Connecting);

        let srtp_endpoint = ice_transport.new_endpoint(Box::new(match_srtp));
        let srtcp_endpoint = ice_transport.new_endpoint(Box::new(match_srtcp));
        let (srtp_endpoint, srtcp_endpoint) = match (srtp_endpoint, srtcp_endpoint) {
            (Some(srtp_endpoint), Some(srtcp_endpoint)) => (srtp_endpoint, srtcp_endpoint),
            (srtp_endpoint, srtcp_endpoint) => {
                let missing = if srtp_endpoint.is_none() {
                    SessionKind::Srtp
                } else {
                    SessionKind::Srtcp
                };
                close_endpoint(srtp_endpoint).await;
                close_endpoint(srtcp_endpoint).await;
                internal.state_change(RTCSecurityTransportState::Failed);
                self.set_readiness(SrtpReadiness::Failed);
                return Err(Error::ErrNoEndpoint(missing.to_string()));
            }
        };
        internal.srtp_endpoint = Some(Arc::clone(&srtp_endpoint));
        internal.srtcp_endpoint = Some(Arc::clone(&srtcp_endpoint));

        internal.state_change(RTCSecurityTransportState::Connected);

        if let Err(err) = self
            .start_srtp(&internal, srtp_endpoint, srtcp_endpoint)
            .await
        {
            log::error!("failed to start shared transport: {err}");
            close_endpoint(internal.srtp_endpoint.take()).await;
            close_endpoint(internal.srtcp_endpoint.take()).await;
            internal.state_change(RTCSecurityTransportState::Failed);
            self.set_readiness(SrtpReadiness::Failed);
            return Err(err);
        }

        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let mut internal = self.internal.write().await;

        if internal.state == RTCSecurityTransportState::Closed {
            return Ok(());
        }

        // waiting writers give up before the sessions go away
        self.set_readiness(SrtpReadiness::Closed);

        // Try closing everything and collect the errors
        let mut close_errs: Vec<Error> = vec![];

        if let Some(sessions) = self.sessions.swap(None) {
            if let Err(err) = sessions.srtp.close().await {
                close_errs.push(err);
            }
            if let Err(err) = sessions.srtcp.close().await {
                close_errs.push(err);
            }
        }

        for stream in internal.simulcast_streams.drain(..) {
            if let Err(err) = stream.close().await {
                close_errs.push(err);
            }
        }

        for stream_info in internal.remote_streams.drain(..) {
            self.interceptor.unbind_remote_stream(&stream_info).await;
        }

        // the sessions own their endpoints once started
        internal.srtp_endpoint = None;
        internal.srtcp_endpoint = None;

        if internal.state != RTCSecurityTransportState::Failed {
            internal.state_change(RTCSecurityTransportState::Closed);
        }

        flatten_errs(close_errs)
    }

    fn srtp_session(&self) -> Option<Arc<dyn Session>> {
        self.sessions
            .load_full()
            .map(|sessions| Arc::clone(&sessions.srtp))
    }

    fn srtcp_session(&self) -> Option<Arc<dyn Session>> {
        self.sessions
            .load_full()
            .map(|sessions| Arc::clone(&sessions.srtcp))
    }

    async fn store_simulcast_stream(&self, stream: Arc<dyn ReadStream>) {
        let mut internal = self.internal.write().await;
        internal.simulcast_streams.push(stream);
    }

    async fn streams_for_ssrc(&self, ssrc: SSRC, stream_info: &StreamInfo) -> Result<TrackStreams> {
        if !self.srtp_ready_tx.borrow().is_ready() {
            return Err(Error::ErrSessionNotStarted);
        }
        let sessions = self.sessions.load_full().ok_or(Error::ErrSessionNotStarted)?;

        let rtp_read_stream = sessions.srtp.open_read_stream(ssrc).await?;
        let rtp_interceptor = self
            .interceptor
            .bind_remote_stream(
                stream_info,
                Arc::new(ReadStreamReader::new(Arc::clone(&rtp_read_stream))),
            )
            .await;

        let rtcp_read_stream = sessions.srtcp.open_read_stream(ssrc).await?;
        let rtcp_interceptor = self
            .interceptor
            .bind_rtcp_reader(Arc::new(ReadStreamReader::new(Arc::clone(
                &rtcp_read_stream,
            ))))
            .await;

        {
            let mut internal = self.internal.write().await;
            internal.remote_streams.push(stream_info.clone());
        }

        Ok(TrackStreams {
            ssrc,
            stream_info: stream_info.clone(),
            rtp_read_stream,
            rtp_interceptor,
            rtcp_read_stream,
            rtcp_interceptor,
        })
    }

    fn srtp_ready(&self) -> watch::Receiver<SrtpReadiness> {
        self.srtp_ready_tx.subscribe()
    }
}

#[async_trait]
impl GroupKeyAgreement for RTCSharedTransport {
    /// update_keys derives fresh session keys from `exporter` with the current
    /// protection profile.
    ///
    /// Before start the keys are only stored and picked up by start. Once the
    /// sessions run, the keys are pushed into the SRTP session first and the
    /// SRTCP session second.
    async fn update_keys(&self, exporter: &dyn KeyingMaterialExporter) -> Result<()> {
        let profile = self.srtp_protection_profile().await;
        self.update_keys_with_profile(exporter, profile).await
    }
}
