//! Advanced configuration engine for shared-key security transports.
//!
//! The `SettingEngine` controls how SRTP/SRTCP sessions are built when a
//! transport starts, whether media is delivered locally or through a relay,
//! and how writers behave while the sessions do not exist yet.
//!
//! # Examples
//!
//! ## Configuring replay protection
//!
//! ```
//! use rtc_secure_transport::configuration::setting_engine::SettingEngine;
//!
//! let mut setting_engine = SettingEngine::default();
//!
//! setting_engine.set_srtp_replay_protection_window(256);
//! setting_engine.set_srtcp_replay_protection_window(128);
//! ```
//!
//! ## Relay delivery
//!
//! ```
//! use rtc_secure_transport::configuration::setting_engine::SettingEngine;
//!
//! let mut setting_engine = SettingEngine::default();
//! setting_engine.enable_relay_delivery(true);
//! assert!(setting_engine.relay_delivery_enabled());
//! ```

use srtp::config::Config;
use srtp::option::*;
use srtp::protection_profile::ProtectionProfile;

/// Replay attack protection window sizes.
///
/// Set to 0 to keep the session default (64 packets).
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub struct ReplayProtection {
    /// SRTP replay protection window size (in packets).
    pub srtp: usize,

    /// SRTCP replay protection window size (in packets).
    pub srtcp: usize,
}

/// WriterReadiness selects what a writer does when it is called before the
/// SRTP/SRTCP sessions exist.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum WriterReadiness {
    /// Wait until the sessions are ready or the sender is stopped.
    #[default]
    Block,

    /// Fail with `ErrSessionNotStarted` right away.
    ReturnImmediately,
}

/// SettingEngine allows influencing behavior in ways that are not
/// supported by the WebRTC API. This allows us to support additional
/// use-cases without deviating from the WebRTC API elsewhere.
#[derive(Default, Clone)]
pub struct SettingEngine {
    pub(crate) replay_protection: ReplayProtection,
    pub(crate) disable_srtp_replay_protection: bool,
    pub(crate) disable_srtcp_replay_protection: bool,
    pub(crate) disable_srtp_decrypt: bool,
    pub(crate) disable_srtcp_decrypt: bool,
    pub(crate) srtp_protection_profile: ProtectionProfile,
    pub(crate) relay_delivery: bool,
    pub(crate) bootstrap_secret: Option<Vec<u8>>,
    pub(crate) writer_readiness: WriterReadiness,
}

impl std::fmt::Debug for SettingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingEngine")
            .field("replay_protection", &self.replay_protection)
            .field(
                "disable_srtp_replay_protection",
                &self.disable_srtp_replay_protection,
            )
            .field(
                "disable_srtcp_replay_protection",
                &self.disable_srtcp_replay_protection,
            )
            .field("disable_srtp_decrypt", &self.disable_srtp_decrypt)
            .field("disable_srtcp_decrypt", &self.disable_srtcp_decrypt)
            .field("srtp_protection_profile", &self.srtp_protection_profile)
            .field("relay_delivery", &self.relay_delivery)
            .field("bootstrap_secret", &self.bootstrap_secret.is_some())
            .field("writer_readiness", &self.writer_readiness)
            .finish()
    }
}

impl SettingEngine {
    /// set_srtp_replay_protection_window sets a replay attack protection window size of SRTP session.
    ///
    /// * `n` - Window size in packets (0 = session default)
    pub fn set_srtp_replay_protection_window(&mut self, n: usize) {
        self.disable_srtp_replay_protection = false;
        self.replay_protection.srtp = n;
    }

    /// set_srtcp_replay_protection_window sets a replay attack protection window size of SRTCP session.
    pub fn set_srtcp_replay_protection_window(&mut self, n: usize) {
        self.disable_srtcp_replay_protection = false;
        self.replay_protection.srtcp = n;
    }

    /// disable_srtp_replay_protection disables SRTP replay protection.
    pub fn disable_srtp_replay_protection(&mut self, is_disabled: bool) {
        self.disable_srtp_replay_protection = is_disabled;
    }

    /// disable_srtcp_replay_protection disables SRTCP replay protection.
    pub fn disable_srtcp_replay_protection(&mut self, is_disabled: bool) {
        self.disable_srtcp_replay_protection = is_disabled;
    }

    /// disable_srtp_decrypt lets incoming SRTP through to readers without
    /// decrypting it. Useful when packets are forwarded to a member that holds
    /// the keys.
    pub fn disable_srtp_decrypt(&mut self, is_disabled: bool) {
        self.disable_srtp_decrypt = is_disabled;
    }

    /// disable_srtcp_decrypt lets incoming SRTCP through without decrypting it.
    pub fn disable_srtcp_decrypt(&mut self, is_disabled: bool) {
        self.disable_srtcp_decrypt = is_disabled;
    }

    /// set_srtp_protection_profile selects the cipher suite used by shared transports.
    pub fn set_srtp_protection_profile(&mut self, profile: ProtectionProfile) {
        self.srtp_protection_profile = profile;
    }

    /// enable_relay_delivery sends media through the transport's relay client
    /// instead of its own endpoints. The flag is read on every write, so it
    /// can be flipped while senders are running.
    pub fn enable_relay_delivery(&mut self, is_enabled: bool) {
        self.relay_delivery = is_enabled;
    }

    pub fn relay_delivery_enabled(&self) -> bool {
        self.relay_delivery
    }

    /// set_bootstrap_secret lets a shared transport start before any group key
    /// agreement delivered keys.
    ///
    /// Every member configured with the same secret derives the same session
    /// keys, so the secret must only be used for test setups or be replaced by
    /// update_keys as soon as possible.
    pub fn set_bootstrap_secret(&mut self, secret: impl Into<Vec<u8>>) {
        self.bootstrap_secret = Some(secret.into());
    }

    pub fn clear_bootstrap_secret(&mut self) {
        self.bootstrap_secret = None;
    }

    /// set_writer_readiness selects what writers do before the sessions exist.
    pub fn set_writer_readiness(&mut self, readiness: WriterReadiness) {
        self.writer_readiness = readiness;
    }

    /// apply_session_options appends the remote context options this engine
    /// asks for to a session config.
    pub(crate) fn apply_session_options(&self, config: &mut Config) {
        if self.disable_srtp_decrypt {
            config.remote_rtp_options.push(srtp_no_decrypt());
        }
        if self.disable_srtcp_decrypt {
            config.remote_rtcp_options.push(srtcp_no_decrypt());
        }

        if self.replay_protection.srtp != 0 {
            config
                .remote_rtp_options
                .push(srtp_replay_protection(self.replay_protection.srtp));
        }
        if self.disable_srtp_replay_protection {
            config.remote_rtp_options.push(srtp_no_replay_protection());
        }

        if self.replay_protection.srtcp != 0 {
            config
                .remote_rtcp_options
                .push(srtcp_replay_protection(self.replay_protection.srtcp));
        }
        if self.disable_srtcp_replay_protection {
            config.remote_rtcp_options.push(srtcp_no_replay_protection());
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_setting_engine_defaults() {
        let s = SettingEngine::default();
        assert_eq!(s.writer_readiness, WriterReadiness::Block);
        assert_eq!(s.srtp_protection_profile, ProtectionProfile::Aes128CmHmacSha1_80);
        assert!(s.bootstrap_secret.is_none());
        assert!(!s.relay_delivery_enabled());

        let mut config = Config::default();
        s.apply_session_options(&mut config);
        assert!(config.remote_rtp_options.is_empty());
        assert!(config.remote_rtcp_options.is_empty());
    }

    #[test]
    fn test_setting_engine_session_options() {
        let mut s = SettingEngine::default();
        s.set_srtp_replay_protection_window(256);
        s.set_srtcp_replay_protection_window(128);
        s.disable_srtcp_replay_protection(true);
        s.disable_srtp_decrypt(true);

        let mut config = Config::default();
        s.apply_session_options(&mut config);

        assert_eq!(
            config.remote_rtp_options,
            vec![srtp_no_decrypt(), srtp_replay_protection(256)]
        );
        assert_eq!(
            config.remote_rtcp_options,
            vec![
                srtcp_replay_protection(128),
                srtcp_no_replay_protection()
            ]
        );
        assert_eq!(replay_window(&config.remote_rtp_options, 64), Some(256));
        assert_eq!(replay_window(&config.remote_rtcp_options, 64), None);
        assert!(config.local_rtp_options.is_empty());
    }

    #[test]
    fn test_setting_engine_debug_hides_secret() {
        let mut s = SettingEngine::default();
        s.set_bootstrap_secret("hunter2");
        let debug = format!("{s:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("bootstrap_secret: true"));

        s.clear_bootstrap_secret();
        assert!(s.bootstrap_secret.is_none());
    }
}
