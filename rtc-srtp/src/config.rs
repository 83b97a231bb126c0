use shared::crypto::KeyingMaterialExporter;
use shared::error::{Error, Result};

use crate::option::ContextOption;
use crate::protection_profile::ProtectionProfile;

const LABEL_EXTRACTOR_DTLS_SRTP: &str = "EXTRACTOR-dtls_srtp";

/// SessionKeys bundles the keys required to setup an SRTP session
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct SessionKeys {
    pub local_master_key: Vec<u8>,
    pub local_master_salt: Vec<u8>,
    pub remote_master_key: Vec<u8>,
    pub remote_master_salt: Vec<u8>,
}

/// Config is used to configure a session.
/// You can provide either a KeyingMaterialExporter to export keys
/// or directly pass the keys themselves.
/// After a Config is passed to a session it must not be modified.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Config {
    pub keys: SessionKeys,
    pub profile: ProtectionProfile,

    /// List of local/remote context options.
    /// ReplayProtection is enabled on remote context by default.
    /// Default replay protection window size is 64.
    pub local_rtp_options: Vec<ContextOption>,
    pub remote_rtp_options: Vec<ContextOption>,

    pub local_rtcp_options: Vec<ContextOption>,
    pub remote_rtcp_options: Vec<ContextOption>,
}

impl Config {
    pub fn new(profile: ProtectionProfile) -> Self {
        Config {
            profile,
            ..Default::default()
        }
    }

    /// extract_session_keys_from_shared derives keys that every member of a
    /// group holds identically.
    ///
    /// One key and one salt are exported and installed for both the local and
    /// the remote context, so packets sealed by any member open for all others.
    pub fn extract_session_keys_from_shared(
        &mut self,
        exporter: &dyn KeyingMaterialExporter,
    ) -> Result<()> {
        let key_len = self.profile.key_len();
        let salt_len = self.profile.salt_len();

        let keying_material =
            exporter.export_keying_material(LABEL_EXTRACTOR_DTLS_SRTP, &[], key_len + salt_len)?;
        if keying_material.len() < key_len {
            return Err(Error::ErrShortSrtpMasterKey);
        }
        if keying_material.len() < key_len + salt_len {
            return Err(Error::ErrShortSrtpMasterSalt);
        }

        let master_key = keying_material[..key_len].to_vec();
        let master_salt = keying_material[key_len..key_len + salt_len].to_vec();

        self.keys = SessionKeys {
            local_master_key: master_key.clone(),
            local_master_salt: master_salt.clone(),
            remote_master_key: master_key,
            remote_master_salt: master_salt,
        };

        log::trace!(
            "extracted {} byte master key and {} byte salt for {}",
            key_len,
            salt_len,
            self.profile
        );

        Ok(())
    }

    /// validate checks that the installed keys fit the profile.
    pub fn validate(&self) -> Result<()> {
        validate_keys(&self.keys, self.profile)
    }
}

/// validate_keys checks master key and salt lengths of both directions
/// against a protection profile.
pub fn validate_keys(keys: &SessionKeys, profile: ProtectionProfile) -> Result<()> {
    let key_len = profile.key_len();
    let salt_len = profile.salt_len();

    for key in [&keys.local_master_key, &keys.remote_master_key] {
        if key.len() != key_len {
            return Err(Error::SrtpMasterKeyLength(key_len, key.len()));
        }
    }
    for salt in [&keys.local_master_salt, &keys.remote_master_salt] {
        if salt.len() != salt_len {
            return Err(Error::SrtpSaltLength(salt_len, salt.len()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use shared::crypto::{HkdfExporter, KeyingMaterialExporterError};

    struct FixedExporter(Vec<u8>);

    impl KeyingMaterialExporter for FixedExporter {
        fn export_keying_material(
            &self,
            label: &str,
            context: &[u8],
            length: usize,
        ) -> std::result::Result<Vec<u8>, KeyingMaterialExporterError> {
            assert_eq!(label, LABEL_EXTRACTOR_DTLS_SRTP);
            assert!(context.is_empty());
            Ok(self.0.iter().copied().take(length).collect())
        }
    }

    struct FailingExporter;

    impl KeyingMaterialExporter for FailingExporter {
        fn export_keying_material(
            &self,
            _label: &str,
            _context: &[u8],
            _length: usize,
        ) -> std::result::Result<Vec<u8>, KeyingMaterialExporterError> {
            Err(KeyingMaterialExporterError::HandshakeInProgress)
        }
    }

    #[test]
    fn test_extract_session_keys_from_shared() -> Result<()> {
        let material: Vec<u8> = (0u8..30).collect();
        let mut config = Config::new(ProtectionProfile::Aes128CmHmacSha1_80);
        config.extract_session_keys_from_shared(&FixedExporter(material.clone()))?;

        assert_eq!(config.keys.local_master_key, material[..16].to_vec());
        assert_eq!(config.keys.local_master_salt, material[16..30].to_vec());
        assert_eq!(config.keys.local_master_key, config.keys.remote_master_key);
        assert_eq!(config.keys.local_master_salt, config.keys.remote_master_salt);
        config.validate()
    }

    #[test]
    fn test_extract_session_keys_uses_profile_lengths() -> Result<()> {
        let mut config = Config::new(ProtectionProfile::AeadAes256Gcm);
        config.extract_session_keys_from_shared(&HkdfExporter::new(b"hunter2".to_vec()))?;

        assert_eq!(config.keys.local_master_key.len(), 32);
        assert_eq!(config.keys.local_master_salt.len(), 12);
        config.validate()
    }

    #[test]
    fn test_extract_session_keys_is_deterministic() -> Result<()> {
        let exporter = HkdfExporter::new(b"group epoch 7".to_vec());

        let mut a = Config::default();
        a.extract_session_keys_from_shared(&exporter)?;
        let mut b = Config::default();
        b.extract_session_keys_from_shared(&exporter)?;
        assert_eq!(a.keys, b.keys);

        let mut c = Config::default();
        c.extract_session_keys_from_shared(&HkdfExporter::new(b"group epoch 8".to_vec()))?;
        assert_ne!(a.keys, c.keys);

        Ok(())
    }

    #[test]
    fn test_extract_session_keys_short_material() {
        let mut config = Config::default();
        let result = config.extract_session_keys_from_shared(&FixedExporter(vec![0u8; 8]));
        assert_eq!(result, Err(Error::ErrShortSrtpMasterKey));

        let result = config.extract_session_keys_from_shared(&FixedExporter(vec![0u8; 20]));
        assert_eq!(result, Err(Error::ErrShortSrtpMasterSalt));
    }

    #[test]
    fn test_extract_session_keys_exporter_error() {
        let mut config = Config::default();
        let result = config.extract_session_keys_from_shared(&FailingExporter);
        assert_eq!(
            result,
            Err(Error::KeyingMaterial(
                KeyingMaterialExporterError::HandshakeInProgress
            ))
        );
        assert_eq!(config.keys, SessionKeys::default());
    }

    #[test]
    fn test_validate_keys() {
        let keys = SessionKeys {
            local_master_key: vec![0u8; 16],
            local_master_salt: vec![0u8; 14],
            remote_master_key: vec![0u8; 15],
            remote_master_salt: vec![0u8; 14],
        };
        assert_eq!(
            validate_keys(&keys, ProtectionProfile::Aes128CmHmacSha1_80),
            Err(Error::SrtpMasterKeyLength(16, 15))
        );
        assert_eq!(
            validate_keys(&keys, ProtectionProfile::AeadAes256Gcm),
            Err(Error::SrtpMasterKeyLength(32, 16))
        );
    }
}
