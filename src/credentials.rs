//! Certificate credentials for the agents.
//!
//! Agents sign in to the portals with an A1 certificate (`.pfx`/`.p12`) and
//! its password. The certificate is copied into the data directory and the
//! password is kept encrypted with AES-256-GCM under a key that is provisioned
//! once with `courtfile credentials init`. Nothing here creates the key on
//! demand: a store without a key refuses to save or read credentials.

use crate::context::DataContext;
use crate::error::{FilingError, Result};
use crate::fs::atomic_write_private;
use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const CERTIFICATE_EXTENSIONS: [&str; 2] = ["pfx", "p12"];

/// Certificate file and password handed to the agent.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    #[serde(rename = "arquivo")]
    pub file: PathBuf,
    #[serde(rename = "senha")]
    pub secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("file", &self.file)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Source of the credential snapshot taken once per submission.
pub trait CredentialStore {
    /// # Errors
    ///
    /// Fails if no credentials are configured or the certificate file is gone.
    fn credentials(&self) -> Result<Credentials>;
}

/// What `courtfile credentials status` reports. Never includes the secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialStatus {
    pub key_provisioned: bool,
    pub configured: bool,
    pub file: Option<PathBuf>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EncryptedSecret {
    nonce_b64: String,
    ciphertext_b64: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CredentialRecord {
    file: PathBuf,
    secret: EncryptedSecret,
    updated_at: DateTime<Utc>,
}

/// Credential store backed by files in the data directory.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    record_path: PathBuf,
    key_path: PathBuf,
    certificate_dir: PathBuf,
}

impl FileCredentialStore {
    pub fn new(ctx: &DataContext) -> Self {
        Self {
            record_path: ctx.credential_record_path(),
            key_path: ctx.credential_key_path(),
            certificate_dir: ctx.credentials_dir.clone(),
        }
    }

    /// Create the encryption key if it does not exist yet.
    ///
    /// Returns `true` when a new key was written. An existing key is never
    /// replaced, since that would make the stored password unreadable.
    pub fn provision_key(&self) -> Result<bool> {
        if self.key_path.exists() {
            return Ok(false);
        }

        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        atomic_write_private(&self.key_path, BASE64.encode(key).as_bytes())?;
        Ok(true)
    }

    /// Store a certificate and its password.
    ///
    /// The certificate must exist and have a `.pfx` or `.p12` extension. It is
    /// copied next to the record so later moves of the original do not break
    /// submissions.
    pub fn save(&self, certificate: &Path, secret: &str) -> Result<CredentialStatus> {
        let source = validate_certificate(certificate)?;
        if secret.is_empty() {
            return Err(FilingError::Credentials(
                "certificate password is required".to_string(),
            ));
        }

        let key = self.load_key()?;
        let extension = source
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_else(|| "pfx".to_string());
        let destination = self
            .certificate_dir
            .join(format!("certificate_a1.{}", extension));

        fs::create_dir_all(&self.certificate_dir).map_err(|e| {
            FilingError::UserError(format!(
                "failed to create credentials directory '{}': {}",
                self.certificate_dir.display(),
                e
            ))
        })?;
        if source != destination {
            fs::copy(&source, &destination).map_err(|e| {
                FilingError::UserError(format!(
                    "failed to copy certificate to '{}': {}",
                    destination.display(),
                    e
                ))
            })?;
        }

        let record = CredentialRecord {
            file: destination,
            secret: encrypt(&key, secret)?,
            updated_at: Utc::now(),
        };
        let serialized = serde_json::to_vec_pretty(&record).map_err(|e| {
            FilingError::UserError(format!("failed to serialize credential record: {}", e))
        })?;
        atomic_write_private(&self.record_path, &serialized)?;

        self.status()
    }

    /// Current state, without decrypting anything.
    pub fn status(&self) -> Result<CredentialStatus> {
        let key_provisioned = self.key_path.exists();
        let Some(record) = self.read_record()? else {
            return Ok(CredentialStatus {
                key_provisioned,
                configured: false,
                file: None,
                updated_at: None,
            });
        };

        let exists = record.file.is_file();
        Ok(CredentialStatus {
            key_provisioned,
            configured: exists,
            file: exists.then_some(record.file),
            updated_at: Some(record.updated_at),
        })
    }

    fn read_record(&self) -> Result<Option<CredentialRecord>> {
        if !self.record_path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.record_path).map_err(|e| {
            FilingError::Credentials(format!(
                "failed to read credential record '{}': {}",
                self.record_path.display(),
                e
            ))
        })?;
        serde_json::from_str(&raw).map(Some).map_err(|e| {
            FilingError::Credentials(format!(
                "credential record '{}' is corrupt: {}",
                self.record_path.display(),
                e
            ))
        })
    }

    fn load_key(&self) -> Result<[u8; KEY_LEN]> {
        if !self.key_path.exists() {
            return Err(FilingError::Credentials(format!(
                "encryption key not found at '{}'.\n\
                 Run `courtfile credentials init` to provision it.",
                self.key_path.display()
            )));
        }

        let encoded = fs::read_to_string(&self.key_path).map_err(|e| {
            FilingError::Credentials(format!(
                "failed to read encryption key '{}': {}",
                self.key_path.display(),
                e
            ))
        })?;
        let decoded = BASE64
            .decode(encoded.trim().as_bytes())
            .map_err(|e| FilingError::Credentials(format!("encryption key is not base64: {}", e)))?;
        <[u8; KEY_LEN]>::try_from(decoded.as_slice()).map_err(|_| {
            FilingError::Credentials(format!(
                "encryption key must be {} bytes, found {}",
                KEY_LEN,
                decoded.len()
            ))
        })
    }
}

impl CredentialStore for FileCredentialStore {
    fn credentials(&self) -> Result<Credentials> {
        let record = self.read_record()?.ok_or_else(|| {
            FilingError::Credentials(
                "no A1 certificate configured. Run `courtfile credentials set` first.".to_string(),
            )
        })?;
        if !record.file.is_file() {
            return Err(FilingError::Credentials(format!(
                "configured certificate '{}' was not found. Run `courtfile credentials set` again.",
                record.file.display()
            )));
        }

        let key = self.load_key()?;
        Ok(Credentials {
            secret: decrypt(&key, &record.secret)?,
            file: record.file,
        })
    }
}

fn validate_certificate(path: &Path) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(FilingError::Credentials(
            "certificate path is required".to_string(),
        ));
    }
    if !path.is_file() {
        return Err(FilingError::Credentials(format!(
            "certificate file not found: {}",
            path.display()
        )));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    if !CERTIFICATE_EXTENSIONS.contains(&extension.as_str()) {
        return Err(FilingError::Credentials(
            "invalid certificate. Use a .pfx or .p12 file.".to_string(),
        ));
    }

    path.canonicalize().map_err(|e| {
        FilingError::Credentials(format!(
            "failed to resolve certificate path '{}': {}",
            path.display(),
            e
        ))
    })
}

fn encrypt(key: &[u8; KEY_LEN], secret: &str) -> Result<EncryptedSecret> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|_| FilingError::Credentials("invalid encryption key".to_string()))?;
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), secret.as_bytes())
        .map_err(|_| FilingError::Credentials("failed to encrypt certificate password".to_string()))?;

    Ok(EncryptedSecret {
        nonce_b64: BASE64.encode(nonce_bytes),
        ciphertext_b64: BASE64.encode(ciphertext),
    })
}

fn decrypt(key: &[u8; KEY_LEN], secret: &EncryptedSecret) -> Result<String> {
    let corrupt = || {
        FilingError::Credentials(
            "stored certificate password cannot be decrypted with the current key".to_string(),
        )
    };

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| corrupt())?;
    let nonce = BASE64
        .decode(secret.nonce_b64.as_bytes())
        .map_err(|_| corrupt())?;
    if nonce.len() != NONCE_LEN {
        return Err(corrupt());
    }
    let ciphertext = BASE64
        .decode(secret.ciphertext_b64.as_bytes())
        .map_err(|_| corrupt())?;
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&nonce), ciphertext.as_ref())
        .map_err(|_| corrupt())?;

    String::from_utf8(plaintext).map_err(|_| corrupt())
}
