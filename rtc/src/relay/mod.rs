//! Relay delivery path.
//!
//! When relay delivery is enabled, media is not sent over the transport's own
//! endpoints. Writers protect packets with the local session and hand the
//! ciphertext to a [`RelayClient`], which forwards it to the other group
//! members. Packets coming back from the relay are pushed into the sessions
//! through the callbacks registered with [`RelayClient::set_callback`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use bytes::Bytes;
use shared::error::{Error, Result};
use srtp::session::SessionKind;

use crate::rtp_transceiver::RtpCodecKind;
use crate::transport::SessionPair;

/// RelayCallbackFn receives a protected payload from the relay together with
/// its sequence index on the relay channel.
pub type RelayCallbackFn = Box<
    dyn (Fn(Bytes, u64) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>) + Send + Sync,
>;

/// RelayCallback bundles the inbound handlers of the three relay channels.
pub struct RelayCallback {
    pub on_audio: RelayCallbackFn,
    pub on_video: RelayCallbackFn,
    pub on_rtcp: RelayCallbackFn,
}

/// RelayClient forwards protected media through an external relay service.
#[async_trait]
pub trait RelayClient: Send + Sync {
    /// set_callback replaces the inbound handlers.
    async fn set_callback(&self, callback: RelayCallback);

    async fn produce_audio_payload(&self, payload: Bytes) -> Result<()>;

    async fn produce_video_payload(&self, payload: Bytes) -> Result<()>;
}

/// produce_payload sends a payload on the relay channel of `kind` and returns
/// the number of bytes handed over.
pub(crate) async fn produce_payload(
    client: &dyn RelayClient,
    kind: RtpCodecKind,
    payload: Bytes,
) -> Result<usize> {
    let n = payload.len();
    match kind {
        RtpCodecKind::Audio => client.produce_audio_payload(payload).await?,
        RtpCodecKind::Video => client.produce_video_payload(payload).await?,
        RtpCodecKind::Unspecified => return Err(Error::ErrUnsupportedCodecKind),
    }
    Ok(n)
}

impl RelayCallback {
    /// new builds the callbacks that feed relayed packets into `sessions`.
    pub(crate) fn new(sessions: Arc<ArcSwapOption<SessionPair>>) -> Self {
        RelayCallback {
            on_audio: receive_audio(Arc::clone(&sessions)),
            on_video: receive_video(Arc::clone(&sessions)),
            on_rtcp: receive_rtcp(sessions),
        }
    }
}

pub(crate) fn receive_audio(sessions: Arc<ArcSwapOption<SessionPair>>) -> RelayCallbackFn {
    receive(sessions, SessionKind::Srtp)
}

pub(crate) fn receive_video(sessions: Arc<ArcSwapOption<SessionPair>>) -> RelayCallbackFn {
    receive(sessions, SessionKind::Srtp)
}

pub(crate) fn receive_rtcp(sessions: Arc<ArcSwapOption<SessionPair>>) -> RelayCallbackFn {
    receive(sessions, SessionKind::Srtcp)
}

// Failures are dropped, the relay has no way to act on them.
fn receive(sessions: Arc<ArcSwapOption<SessionPair>>, kind: SessionKind) -> RelayCallbackFn {
    Box::new(move |payload: Bytes, index: u64| {
        let sessions = Arc::clone(&sessions);
        Box::pin(async move {
            let Some(pair) = sessions.load_full() else {
                log::trace!("dropping relayed {kind} packet #{index}: session not started");
                return;
            };
            let session = match kind {
                SessionKind::Srtp => &pair.srtp,
                SessionKind::Srtcp => &pair.srtcp,
            };
            if let Err(err) = session.decrypt(&payload).await {
                log::trace!("dropping relayed {kind} packet #{index}: {err}");
            }
        })
    })
}
