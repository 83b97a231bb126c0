use std::collections::HashMap;

/// Generic key/value store used by interceptors to attach metadata to packets
/// as they are read.
pub type Attributes = HashMap<usize, usize>;

/// RTP header extension as negotiated via SDP (RFC 5285).
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct RTPHeaderExtension {
    pub uri: String,
    pub id: u16,
}

/// Association between an auxiliary stream (RTX, FEC) and its primary stream.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct AssociatedStreamInfo {
    pub ssrc: u32,
    pub payload_type: u8,
}

/// RTCP feedback mechanism negotiated for the stream.
///
/// See: <https://draft.ortc.org/#dom-rtcrtcpfeedback>
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct RTCPFeedback {
    /// Valid values: "ack", "ccm", "nack", "goog-remb", "transport-cc"
    pub typ: String,
    /// For example, `typ="nack"` with `parameter="pli"` enables Picture Loss Indicator packets.
    pub parameter: String,
}

/// StreamInfo describes the remote stream a reader is bound for.
///
/// The secure transport hands it to [`Interceptor::bind_remote_stream`](crate::Interceptor::bind_remote_stream)
/// together with the decrypted SRTP read stream of the same SSRC.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct StreamInfo {
    pub id: String,
    pub attributes: Attributes,
    pub ssrc: u32,
    pub payload_type: u8,
    pub rtp_header_extensions: Vec<RTPHeaderExtension>,
    /// MIME type of the codec (e.g., "video/VP8", "audio/opus")
    pub mime_type: String,
    pub clock_rate: u32,
    pub channels: u16,
    pub sdp_fmtp_line: String,
    pub rtcp_feedback: Vec<RTCPFeedback>,
    pub associated_stream: Option<AssociatedStreamInfo>,
}

impl StreamInfo {
    /// has_feedback reports whether a feedback type was negotiated for the stream.
    pub fn has_feedback(&self, typ: &str) -> bool {
        self.rtcp_feedback.iter().any(|fb| fb.typ == typ)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_stream_info_has_feedback() {
        let info = StreamInfo {
            ssrc: 0x12345678,
            mime_type: "video/VP8".to_string(),
            clock_rate: 90000,
            rtcp_feedback: vec![RTCPFeedback {
                typ: "nack".to_string(),
                parameter: "pli".to_string(),
            }],
            ..Default::default()
        };

        assert!(info.has_feedback("nack"));
        assert!(!info.has_feedback("transport-cc"));
    }
}
