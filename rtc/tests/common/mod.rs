//! In-memory doubles for the collaborators of a security transport.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use shared::conn::Conn;
use shared::error::{Error, Result};
use shared::util::MatchFunc;
use srtp::config::{Config, SessionKeys};
use srtp::protection_profile::ProtectionProfile;
use srtp::session::{ReadStream, Session, SessionBackend, SessionKind, WriteStream};
use tokio::sync::mpsc;
use util::marshal::Marshal;

use rtc_secure_transport::api::{APIBuilder, API};
use rtc_secure_transport::configuration::setting_engine::SettingEngine;
use rtc_secure_transport::relay::{RelayCallback, RelayClient};
use rtc_secure_transport::transport::IceTransport;

pub fn init_log() {
    env_logger::builder().is_test(true).try_init().ok();
}

pub fn build_api(setting_engine: SettingEngine, backend: Arc<MockBackend>) -> API {
    match APIBuilder::new()
        .with_setting_engine(setting_engine)
        .with_session_backend(backend)
        .build()
    {
        Ok(api) => api,
        Err(err) => panic!("failed to build api: {err}"),
    }
}

pub fn rtp_header(ssrc: u32, sequence_number: u16) -> rtp::header::Header {
    rtp::header::Header {
        version: 2,
        payload_type: 96,
        sequence_number,
        timestamp: 3000,
        ssrc,
        ..Default::default()
    }
}

#[derive(Default)]
pub struct MockConn {
    pub closed: AtomicBool,
    pub sent: Mutex<Vec<Bytes>>,
}

#[async_trait]
impl Conn for MockConn {
    async fn recv(&self, _buf: &mut [u8]) -> Result<usize> {
        Err(Error::ErrClosedPipe)
    }

    async fn send(&self, buf: &[u8]) -> Result<usize> {
        self.sent.lock().unwrap().push(Bytes::copy_from_slice(buf));
        Ok(buf.len())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// MockIce hands out endpoints and remembers which packets each one accepts.
#[derive(Default)]
pub struct MockIce {
    /// Number of endpoints handed out before new_endpoint returns None.
    pub endpoint_limit: Option<usize>,
    pub endpoints: Mutex<Vec<(Arc<MockConn>, MatchFunc)>>,
}

impl MockIce {
    pub fn with_endpoint_limit(limit: usize) -> Self {
        MockIce {
            endpoint_limit: Some(limit),
            ..Default::default()
        }
    }

    /// accepts reports which endpoint indexes would receive `buf`.
    pub fn accepts(&self, buf: &[u8]) -> Vec<usize> {
        let endpoints = self.endpoints.lock().unwrap();
        endpoints
            .iter()
            .enumerate()
            .filter(|(_, (_, match_fn))| match_fn(buf))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn conn(&self, i: usize) -> Arc<MockConn> {
        Arc::clone(&self.endpoints.lock().unwrap()[i].0)
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoints.lock().unwrap().len()
    }
}

impl IceTransport for MockIce {
    fn new_endpoint(&self, match_fn: MatchFunc) -> Option<Arc<dyn Conn + Send + Sync>> {
        let mut endpoints = self.endpoints.lock().unwrap();
        if let Some(limit) = self.endpoint_limit {
            if endpoints.len() >= limit {
                return None;
            }
        }
        let conn = Arc::new(MockConn::default());
        endpoints.push((Arc::clone(&conn), match_fn));
        Some(conn)
    }
}

pub struct MockReadStream {
    pub ssrc: u32,
    pub fail_close: AtomicBool,
    pub close_count: AtomicUsize,
    tx: mpsc::UnboundedSender<Bytes>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Bytes>>,
}

impl MockReadStream {
    pub fn new(ssrc: u32) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        MockReadStream {
            ssrc,
            fail_close: AtomicBool::new(false),
            close_count: AtomicUsize::new(0),
            tx,
            rx: tokio::sync::Mutex::new(rx),
        }
    }

    pub fn failing_close(ssrc: u32) -> Self {
        let stream = MockReadStream::new(ssrc);
        stream.fail_close.store(true, Ordering::SeqCst);
        stream
    }

    pub fn push(&self, packet: Bytes) {
        let _ = self.tx.send(packet);
    }

    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReadStream for MockReadStream {
    fn ssrc(&self) -> u32 {
        self.ssrc
    }

    async fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let mut rx = self.rx.lock().await;
        match rx.recv().await {
            Some(packet) => {
                let n = packet.len().min(buf.len());
                buf[..n].copy_from_slice(&packet[..n]);
                Ok(n)
            }
            None => Err(Error::ErrClosedPipe),
        }
    }

    async fn close(&self) -> Result<()> {
        self.close_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_close.load(Ordering::SeqCst) {
            Err(Error::Other(format!("close stream {}", self.ssrc)))
        } else {
            Ok(())
        }
    }
}

/// MockSession "encrypts" by prefixing the first byte of the local master key,
/// so tests can tell which keys protected a packet.
pub struct MockSession {
    pub kind: SessionKind,
    pub conn: Arc<dyn Conn + Send + Sync>,
    pub config: Config,
    pub keys: Mutex<(SessionKeys, ProtectionProfile)>,
    pub key_updates: Mutex<Vec<(SessionKeys, ProtectionProfile)>>,
    pub fail_update: AtomicBool,
    pub fail_close: AtomicBool,
    pub close_count: AtomicUsize,
    pub read_streams: Mutex<HashMap<u32, Arc<MockReadStream>>>,
    pub written: Mutex<Vec<Bytes>>,
    pub decrypted: Mutex<Vec<Bytes>>,
}

impl MockSession {
    fn new(kind: SessionKind, conn: Arc<dyn Conn + Send + Sync>, config: &Config) -> Self {
        MockSession {
            kind,
            conn,
            config: config.clone(),
            keys: Mutex::new((config.keys.clone(), config.profile)),
            key_updates: Mutex::new(vec![]),
            fail_update: AtomicBool::new(false),
            fail_close: AtomicBool::new(false),
            close_count: AtomicUsize::new(0),
            read_streams: Mutex::new(HashMap::new()),
            written: Mutex::new(vec![]),
            decrypted: Mutex::new(vec![]),
        }
    }

    pub fn current_keys(&self) -> (SessionKeys, ProtectionProfile) {
        self.keys.lock().unwrap().clone()
    }

    pub fn written(&self) -> Vec<Bytes> {
        self.written.lock().unwrap().clone()
    }

    pub fn decrypted(&self) -> Vec<Bytes> {
        self.decrypted.lock().unwrap().clone()
    }

    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }

    pub fn read_stream(&self, ssrc: u32) -> Option<Arc<MockReadStream>> {
        self.read_streams.lock().unwrap().get(&ssrc).cloned()
    }

    fn seal(&self, buf: &[u8]) -> Bytes {
        let tag = self.keys.lock().unwrap().0.local_master_key.first().copied().unwrap_or(0);
        let mut sealed = BytesMut::with_capacity(buf.len() + 1);
        sealed.extend_from_slice(&[tag]);
        sealed.extend_from_slice(buf);
        sealed.freeze()
    }
}

fn marshal_rtp(header: &rtp::header::Header, payload: &[u8]) -> Result<Bytes> {
    let header_raw = header
        .marshal()
        .map_err(|err| Error::OtherRtpErr(err.to_string()))?;
    let mut raw = BytesMut::with_capacity(header_raw.len() + payload.len());
    raw.extend_from_slice(&header_raw);
    raw.extend_from_slice(payload);
    Ok(raw.freeze())
}

pub struct MockWriteStream {
    session: Arc<MockSession>,
}

#[async_trait]
impl WriteStream for MockWriteStream {
    async fn write(&self, buf: &[u8]) -> Result<usize> {
        let sealed = self.session.seal(buf);
        self.session.written.lock().unwrap().push(sealed.clone());
        self.session.conn.send(&sealed).await
    }

    async fn write_insecure(&self, buf: &[u8]) -> Result<usize> {
        self.session
            .written
            .lock()
            .unwrap()
            .push(Bytes::copy_from_slice(buf));
        self.session.conn.send(buf).await
    }

    async fn write_rtp(&self, header: &rtp::header::Header, payload: &[u8]) -> Result<usize> {
        let raw = marshal_rtp(header, payload)?;
        self.write(&raw).await
    }

    async fn write_insecure_rtp(
        &self,
        header: &rtp::header::Header,
        payload: &[u8],
    ) -> Result<usize> {
        let raw = marshal_rtp(header, payload)?;
        self.write_insecure(&raw).await
    }

    async fn encrypt(&self, buf: &[u8]) -> Result<Bytes> {
        Ok(self.session.seal(buf))
    }

    async fn encrypt_rtp(&self, header: &rtp::header::Header, payload: &[u8]) -> Result<Bytes> {
        let raw = marshal_rtp(header, payload)?;
        Ok(self.session.seal(&raw))
    }
}

/// SessionHandle lets the session trait be implemented on an Arc so write
/// streams can point back at the session that opened them.
pub struct SessionHandle(pub Arc<MockSession>);

#[async_trait]
impl Session for SessionHandle {
    fn kind(&self) -> SessionKind {
        self.0.kind
    }

    async fn open_read_stream(&self, ssrc: u32) -> Result<Arc<dyn ReadStream>> {
        let mut read_streams = self.0.read_streams.lock().unwrap();
        let stream = read_streams
            .entry(ssrc)
            .or_insert_with(|| Arc::new(MockReadStream::new(ssrc)));
        Ok(Arc::clone(stream) as Arc<dyn ReadStream>)
    }

    async fn open_write_stream(&self) -> Result<Arc<dyn WriteStream>> {
        Ok(Arc::new(MockWriteStream {
            session: Arc::clone(&self.0),
        }))
    }

    async fn update_keys(&self, keys: &SessionKeys, profile: ProtectionProfile) -> Result<()> {
        if self.0.fail_update.load(Ordering::SeqCst) {
            return Err(Error::Other(format!("{} refused new keys", self.0.kind)));
        }
        srtp::config::validate_keys(keys, profile)?;
        *self.0.keys.lock().unwrap() = (keys.clone(), profile);
        self.0
            .key_updates
            .lock()
            .unwrap()
            .push((keys.clone(), profile));
        Ok(())
    }

    async fn decrypt(&self, buf: &[u8]) -> Result<()> {
        let tag = self.0.keys.lock().unwrap().0.local_master_key.first().copied();
        match (buf.split_first(), tag) {
            (Some((first, rest)), Some(tag)) if *first == tag => {
                self.0
                    .decrypted
                    .lock()
                    .unwrap()
                    .push(Bytes::copy_from_slice(rest));
                Ok(())
            }
            _ => Err(Error::OtherSrtpErr("authentication failed".to_owned())),
        }
    }

    async fn close(&self) -> Result<()> {
        self.0.close_count.fetch_add(1, Ordering::SeqCst);
        self.0.conn.close().await?;
        if self.0.fail_close.load(Ordering::SeqCst) {
            Err(Error::Other(format!("close {}", self.0.kind)))
        } else {
            Ok(())
        }
    }
}

#[derive(Default)]
pub struct MockBackend {
    pub fail_kind: Mutex<Option<SessionKind>>,
    pub sessions: Mutex<Vec<Arc<MockSession>>>,
}

impl MockBackend {
    pub fn failing(kind: SessionKind) -> Self {
        MockBackend {
            fail_kind: Mutex::new(Some(kind)),
            ..Default::default()
        }
    }

    pub fn session(&self, kind: SessionKind) -> Option<Arc<MockSession>> {
        self.sessions
            .lock()
            .unwrap()
            .iter()
            .find(|session| session.kind == kind)
            .cloned()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }
}

#[async_trait]
impl SessionBackend for MockBackend {
    async fn new_session(
        &self,
        kind: SessionKind,
        conn: Arc<dyn Conn + Send + Sync>,
        config: &Config,
    ) -> Result<Arc<dyn Session>> {
        if *self.fail_kind.lock().unwrap() == Some(kind) {
            return Err(Error::Other(format!("cannot build {kind} context")));
        }
        config.validate()?;

        let session = Arc::new(MockSession::new(kind, conn, config));
        self.sessions.lock().unwrap().push(Arc::clone(&session));
        Ok(Arc::new(SessionHandle(session)))
    }
}

#[derive(Default)]
pub struct MockRelay {
    pub callback: tokio::sync::Mutex<Option<RelayCallback>>,
    pub audio: Mutex<Vec<Bytes>>,
    pub video: Mutex<Vec<Bytes>>,
}

impl MockRelay {
    pub fn audio(&self) -> Vec<Bytes> {
        self.audio.lock().unwrap().clone()
    }

    pub fn video(&self) -> Vec<Bytes> {
        self.video.lock().unwrap().clone()
    }

    pub async fn has_callback(&self) -> bool {
        self.callback.lock().await.is_some()
    }

    pub async fn deliver_audio(&self, payload: Bytes, index: u64) {
        let callback = self.callback.lock().await;
        if let Some(callback) = &*callback {
            (callback.on_audio)(payload, index).await;
        }
    }

    pub async fn deliver_video(&self, payload: Bytes, index: u64) {
        let callback = self.callback.lock().await;
        if let Some(callback) = &*callback {
            (callback.on_video)(payload, index).await;
        }
    }

    pub async fn deliver_rtcp(&self, payload: Bytes, index: u64) {
        let callback = self.callback.lock().await;
        if let Some(callback) = &*callback {
            (callback.on_rtcp)(payload, index).await;
        }
    }
}

#[async_trait]
impl RelayClient for MockRelay {
    async fn set_callback(&self, callback: RelayCallback) {
        let mut current = self.callback.lock().await;
        *current = Some(callback);
    }

    async fn produce_audio_payload(&self, payload: Bytes) -> Result<()> {
        self.audio.lock().unwrap().push(payload);
        Ok(())
    }

    async fn produce_video_payload(&self, payload: Bytes) -> Result<()> {
        self.video.lock().unwrap().push(payload);
        Ok(())
    }
}
