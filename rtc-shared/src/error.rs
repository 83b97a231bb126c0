#![allow(dead_code)]

use std::io;
use thiserror::Error;

use crate::crypto::KeyingMaterialExporterError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    //Transport
    /// ErrConnectionNotReady indicates that the security transport was started
    /// without a connectivity (ICE) transport to carry its traffic.
    #[error("ICE connection not started")]
    ErrConnectionNotReady,
    /// ErrSessionNotStarted indicates that an operation needs the SRTP/SRTCP
    /// sessions but they have not been constructed yet or were torn down.
    #[error("SRTP/SRTCP session not started")]
    ErrSessionNotStarted,
    #[error("security transport can only be started in the new state")]
    ErrInvalidSecurityTransportStart,
    #[error("ICE transport did not provide an endpoint for {0}")]
    ErrNoEndpoint(String),
    /// ErrNoKeyingMaterial indicates that no session keys were installed with
    /// update_keys and no bootstrap secret was configured.
    #[error("no keying material available to derive SRTP session keys")]
    ErrNoKeyingMaterial,
    #[error("failed to start SRTP: {0}")]
    ErrFailedToStartSRTP(String),
    #[error("failed to start SRTCP: {0}")]
    ErrFailedToStartSRTCP(String),
    /// ErrSRTPKeyUpdateFailed indicates the SRTP session rejected new keys.
    /// The SRTCP session was not touched, both still use the previous keys.
    #[error("SRTP key update failed: {0}")]
    ErrSRTPKeyUpdateFailed(String),
    /// ErrSRTCPKeyUpdateFailed indicates the SRTCP session rejected new keys
    /// after the SRTP session already accepted them.
    #[error("SRTCP key update failed, SRTP session already rotated: {0}")]
    ErrSRTCPKeyUpdateFailed(String),
    #[error("no SRTP session backend configured")]
    ErrNoSessionBackend,
    #[error("io: read/write on closed pipe")]
    ErrClosedPipe,
    #[error("{}", join_errs(.0))]
    ErrTeardown(Vec<Error>),

    //Relay
    #[error("relay client is not configured")]
    ErrRelayClientNotConfigured,
    #[error("relay delivery only supports audio and video senders")]
    ErrUnsupportedCodecKind,

    //SRTP
    #[error("SRTP master key is not long enough")]
    ErrShortSrtpMasterKey,
    #[error("SRTP master salt is not long enough")]
    ErrShortSrtpMasterSalt,
    #[error("SRTP Master Key must be len {0}, got {1}")]
    SrtpMasterKeyLength(usize, usize),
    #[error("SRTP Salt must be len {0}, got {1}")]
    SrtpSaltLength(usize, usize),
    #[error("SessionSRTP has been closed")]
    SessionSrtpAlreadyClosed,

    //Third Party Error
    #[error("keying material: {0}")]
    KeyingMaterial(#[from] KeyingMaterialExporterError),
    #[error("{0}")]
    Io(#[source] IoError),

    //Other Errors
    #[error("Other RTCP Err: {0}")]
    OtherRtcpErr(String),
    #[error("Other RTP Err: {0}")]
    OtherRtpErr(String),
    #[error("Other SRTP Err: {0}")]
    OtherSrtpErr(String),
    #[error("{0}")]
    Other(String),
}

fn join_errs(errs: &[Error]) -> String {
    errs.iter()
        .map(|e| e.to_string())
        .collect::<Vec<String>>()
        .join("\n")
}

#[derive(Debug, Error)]
#[error("io error: {0}")]
pub struct IoError(#[from] pub io::Error);

// Workaround for wanting PartialEq for io::Error.
impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(IoError(e))
    }
}

/// flatten_errs folds the failures of several independent operations into one
/// result. Every individual error is kept in [`Error::ErrTeardown`].
pub fn flatten_errs(errs: Vec<impl Into<Error>>) -> Result<()> {
    if errs.is_empty() {
        Ok(())
    } else {
        Err(Error::ErrTeardown(
            errs.into_iter().map(|e| e.into()).collect(),
        ))
    }
}
