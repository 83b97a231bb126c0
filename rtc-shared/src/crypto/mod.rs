use hkdf::Hkdf;
use sha2::Sha256;
use thiserror::Error;

/// KeyingMaterialExporter to extract keying material.
///
/// This trait sits here to avoid getting a direct dependency between
/// the transports that own a secret (a DTLS connection, a group key
/// agreement) and the srtp crate that consumes it.
pub trait KeyingMaterialExporter: Send + Sync {
    fn export_keying_material(
        &self,
        label: &str,
        context: &[u8],
        length: usize,
    ) -> std::result::Result<Vec<u8>, KeyingMaterialExporterError>;
}

/// Possible errors while exporting keying material.
#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum KeyingMaterialExporterError {
    #[error("tls handshake is in progress")]
    HandshakeInProgress,
    #[error("context is not supported for export_keying_material")]
    ContextUnsupported,
    #[error("export_keying_material can not be used with a reserved label")]
    ReservedExportKeyingMaterial,
    #[error("export_keying_material hash: {0}")]
    Hash(String),
}

/// HkdfExporter derives keying material from a shared secret with
/// HKDF-SHA256, using the label as salt and the context as info.
///
/// The output only depends on (secret, label, context, length), so every
/// member holding the same secret derives the same keys.
#[derive(Clone)]
pub struct HkdfExporter {
    secret: Vec<u8>,
}

impl HkdfExporter {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        HkdfExporter {
            secret: secret.into(),
        }
    }
}

impl std::fmt::Debug for HkdfExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HkdfExporter")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl KeyingMaterialExporter for HkdfExporter {
    fn export_keying_material(
        &self,
        label: &str,
        context: &[u8],
        length: usize,
    ) -> std::result::Result<Vec<u8>, KeyingMaterialExporterError> {
        let hk = Hkdf::<Sha256>::new(Some(label.as_bytes()), &self.secret);
        let mut keying_material = vec![0u8; length];
        hk.expand(context, &mut keying_material)
            .map_err(|err| KeyingMaterialExporterError::Hash(err.to_string()))?;
        Ok(keying_material)
    }
}
