use serde::{Deserialize, Serialize};

use super::fingerprint::*;
use super::role::*;

/// SecurityParameters holds information relating to security configuration.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityParameters {
    pub role: RTCDtlsRole,
    pub fingerprints: Vec<RTCDtlsFingerprint>,
}
