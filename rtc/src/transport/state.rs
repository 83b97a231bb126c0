use std::fmt;

pub(crate) const UNSPECIFIED_STR: &str = "Unspecified";

/// Indicates the establishment state of a security transport.
///
/// # State Progression
///
/// ```text
/// New → Connecting → Connected → Closed
///            │            │
///            └────────────┴─────→ Failed
/// ```
///
/// `Closed` and `Failed` are terminal: once reached, the transport never
/// reports another state.
///
/// # String Conversion
///
/// ```
/// use rtc_secure_transport::transport::RTCSecurityTransportState;
///
/// let state = RTCSecurityTransportState::Connected;
/// assert_eq!(state.to_string(), "connected");
///
/// let parsed: RTCSecurityTransportState = "connecting".into();
/// assert_eq!(parsed, RTCSecurityTransportState::Connecting);
/// ```
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RTCSecurityTransportState {
    /// State not specified. This should not occur in normal operation.
    #[default]
    Unspecified = 0,

    /// The transport has not started negotiating yet.
    New = 1,

    /// Session endpoints are being set up and keys derived.
    Connecting = 2,

    /// Endpoints are in place. SRTP/SRTCP sessions become usable once the
    /// readiness signal fires.
    Connected = 3,

    /// The transport has been closed intentionally by calling stop().
    Closed = 4,

    /// The transport has failed as the result of an error, such as missing
    /// keying material or a session that could not be constructed.
    Failed = 5,
}

const SECURITY_TRANSPORT_STATE_NEW_STR: &str = "new";
const SECURITY_TRANSPORT_STATE_CONNECTING_STR: &str = "connecting";
const SECURITY_TRANSPORT_STATE_CONNECTED_STR: &str = "connected";
const SECURITY_TRANSPORT_STATE_CLOSED_STR: &str = "closed";
const SECURITY_TRANSPORT_STATE_FAILED_STR: &str = "failed";

impl From<&str> for RTCSecurityTransportState {
    fn from(raw: &str) -> Self {
        match raw {
            SECURITY_TRANSPORT_STATE_NEW_STR => RTCSecurityTransportState::New,
            SECURITY_TRANSPORT_STATE_CONNECTING_STR => RTCSecurityTransportState::Connecting,
            SECURITY_TRANSPORT_STATE_CONNECTED_STR => RTCSecurityTransportState::Connected,
            SECURITY_TRANSPORT_STATE_CLOSED_STR => RTCSecurityTransportState::Closed,
            SECURITY_TRANSPORT_STATE_FAILED_STR => RTCSecurityTransportState::Failed,
            _ => RTCSecurityTransportState::Unspecified,
        }
    }
}

impl From<u8> for RTCSecurityTransportState {
    fn from(v: u8) -> Self {
        match v {
            1 => RTCSecurityTransportState::New,
            2 => RTCSecurityTransportState::Connecting,
            3 => RTCSecurityTransportState::Connected,
            4 => RTCSecurityTransportState::Closed,
            5 => RTCSecurityTransportState::Failed,
            _ => RTCSecurityTransportState::Unspecified,
        }
    }
}

impl fmt::Display for RTCSecurityTransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RTCSecurityTransportState::New => SECURITY_TRANSPORT_STATE_NEW_STR,
            RTCSecurityTransportState::Connecting => SECURITY_TRANSPORT_STATE_CONNECTING_STR,
            RTCSecurityTransportState::Connected => SECURITY_TRANSPORT_STATE_CONNECTED_STR,
            RTCSecurityTransportState::Closed => SECURITY_TRANSPORT_STATE_CLOSED_STR,
            RTCSecurityTransportState::Failed => SECURITY_TRANSPORT_STATE_FAILED_STR,
            RTCSecurityTransportState::Unspecified => UNSPECIFIED_STR,
        };
        write!(f, "{s}")
    }
}

impl RTCSecurityTransportState {
    /// is_terminal reports whether the transport can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            *self,
            RTCSecurityTransportState::Closed | RTCSecurityTransportState::Failed
        )
    }
}
