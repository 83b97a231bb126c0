use serde::{Deserialize, Serialize};

/// DTLS certificate fingerprint, as signaled out-of-band.
///
/// The fingerprint value is a colon-separated sequence of hexadecimal bytes,
/// for example: `"AB:CD:EF:01:23:45:67:89:..."`
///
/// - [RFC 4572] - Connection-Oriented Media Transport over TLS
/// - [W3C RTCDtlsFingerprint]
///
/// [RFC 4572]: https://datatracker.ietf.org/doc/html/rfc4572
/// [W3C RTCDtlsFingerprint]: https://w3c.github.io/webrtc-pc/#rtcdtlsfingerprint
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RTCDtlsFingerprint {
    /// Hash function algorithm name, such as `"sha-256"`.
    pub algorithm: String,

    /// Certificate fingerprint value.
    pub value: String,
}
