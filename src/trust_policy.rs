//! Gem signature verification using X.509 certificates.

use anyhow::{Context, Result};
use der::DecodePem;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use tar::Archive;
use thiserror::Error;
use x509_cert::Certificate;
use x509_verify::{Signature, VerifyInfo, VerifyingKey};

/// Trust policy levels for gem signature verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustPolicy {
    /// All gems must be signed and verified
    HighSecurity,
    /// All signed gems must be verified (allows unsigned gems)
    MediumSecurity,
    /// Warns about unsigned gems but allows them
    LowSecurity,
    /// No verification (default)
    NoSecurity,
}

impl TrustPolicy {
    /// Parse trust policy from string
    ///
    /// # Example
    ///
    /// ```
    /// use lode::trust_policy::TrustPolicy;
    ///
    /// assert_eq!(TrustPolicy::parse("HighSecurity"), Some(TrustPolicy::HighSecurity));
    /// assert_eq!(TrustPolicy::parse("MediumSecurity"), Some(TrustPolicy::MediumSecurity));
    /// assert_eq!(TrustPolicy::parse("invalid"), None);
    /// ```
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "HighSecurity" => Some(Self::HighSecurity),
            "MediumSecurity" => Some(Self::MediumSecurity),
            "LowSecurity" => Some(Self::LowSecurity),
            "NoSecurity" => Some(Self::NoSecurity),
            _ => None,
        }
    }

    /// Returns whether this policy requires signature verification
    #[must_use]
    pub const fn requires_verification(self) -> bool {
        matches!(
            self,
            Self::HighSecurity | Self::MediumSecurity | Self::LowSecurity
        )
    }

    /// Returns whether this policy allows unsigned gems
    #[must_use]
    pub const fn allows_unsigned(self) -> bool {
        !matches!(self, Self::HighSecurity)
    }
}

impl std::fmt::Display for TrustPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HighSecurity => write!(f, "HighSecurity"),
            Self::MediumSecurity => write!(f, "MediumSecurity"),
            Self::LowSecurity => write!(f, "LowSecurity"),
            Self::NoSecurity => write!(f, "NoSecurity"),
        }
    }
}

/// Errors that can occur during gem signature verification
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("Gem is not signed: {gem_path}")]
    UnsignedGem { gem_path: String },

    #[error("Invalid signature for {gem_path}: {reason}")]
    InvalidSignature { gem_path: String, reason: String },

    #[error("No trusted certificate found for {gem_path}")]
    NoTrustedCertificate { gem_path: String },

    #[error("Failed to load certificate from {path}: {source}")]
    CertificateLoadError {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Trust policy violation for {gem_path}: {reason}")]
    PolicyViolation { gem_path: String, reason: String },
}

/// Gem signature verifier
///
/// Loads trusted certificates and verifies gem signatures according to the trust policy.
#[derive(Debug)]
pub struct GemVerifier {
    policy: TrustPolicy,
    trust_dir: PathBuf,
    certificates: HashMap<String, String>,
}

impl GemVerifier {
    /// Create a new gem verifier with the specified trust policy
    ///
    /// Loads certificates from `~/.gem/trust/` directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the trust directory cannot be accessed or certificates cannot be loaded.
    pub fn new(policy: TrustPolicy) -> Result<Self> {
        let home = dirs::home_dir().context("Failed to find home directory")?;
        let trust_dir = home.join(".gem").join("trust");

        let mut verifier = Self {
            policy,
            trust_dir,
            certificates: HashMap::new(),
        };

        // Load certificates if verification is needed
        if policy.requires_verification() {
            verifier.load_certificates()?;
        }

        Ok(verifier)
    }

    /// Load trusted certificates from the trust directory
    fn load_certificates(&mut self) -> Result<()> {
        // Create trust directory if it doesn't exist
        if !self.trust_dir.exists() {
            fs::create_dir_all(&self.trust_dir).with_context(|| {
                format!(
                    "Failed to create trust directory: {}",
                    self.trust_dir.display()
                )
            })?;
            return Ok(());
        }

        // Read all .pem files from trust directory
        for entry in fs::read_dir(&self.trust_dir).with_context(|| {
            format!(
                "Failed to read trust directory: {}",
                self.trust_dir.display()
            )
        })? {
            let entry = entry?;
            let path = entry.path();

            if path.extension().is_some_and(|ext| ext == "pem") {
                let cert_data = fs::read_to_string(&path).map_err(|err| {
                    VerificationError::CertificateLoadError {
                        path: path.display().to_string(),
                        source: anyhow::Error::new(err),
                    }
                })?;

                let filename = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("unknown")
                    .to_string();

                self.certificates.insert(filename, cert_data);
            }
        }

        Ok(())
    }

    /// Verify a gem file according to the trust policy.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The gem is unsigned and the policy requires signatures
    /// - The gem has an invalid signature
    /// - No trusted certificate is found for the gem
    pub fn verify_gem(&self, gem_path: &Path) -> Result<(), VerificationError> {
        // NoSecurity policy: skip all verification
        if self.policy == TrustPolicy::NoSecurity {
            return Ok(());
        }

        let gem_path_str = gem_path.display().to_string();

        let is_signed = Self::is_gem_signed(gem_path)?;

        if !is_signed {
            return match self.policy {
                TrustPolicy::HighSecurity => Err(VerificationError::UnsignedGem {
                    gem_path: gem_path_str,
                }),
                TrustPolicy::MediumSecurity | TrustPolicy::LowSecurity => {
                    if self.policy == TrustPolicy::LowSecurity {
                        eprintln!("  Warning: Gem is not signed: {gem_path_str}");
                    }
                    Ok(())
                }
                TrustPolicy::NoSecurity => Ok(()),
            };
        }

        self.verify_signature(gem_path)?;

        Ok(())
    }

    /// Check if a gem file is signed
    ///
    /// A gem is considered signed if it contains signature files (*.sig) in its archive.
    fn is_gem_signed(gem_path: &Path) -> Result<bool, VerificationError> {
        let file = fs::File::open(gem_path).map_err(|err| VerificationError::InvalidSignature {
            gem_path: gem_path.display().to_string(),
            reason: format!("Failed to open gem file: {err}"),
        })?;

        let mut archive = tar::Archive::new(file);

        for entry_result in
            archive
                .entries()
                .map_err(|err| VerificationError::InvalidSignature {
                    gem_path: gem_path.display().to_string(),
                    reason: format!("Failed to read gem archive: {err}"),
                })?
        {
            let entry = entry_result.map_err(|err| VerificationError::InvalidSignature {
                gem_path: gem_path.display().to_string(),
                reason: format!("Failed to read archive entry: {err}"),
            })?;

            let path = entry
                .path()
                .map_err(|err| VerificationError::InvalidSignature {
                    gem_path: gem_path.display().to_string(),
                    reason: format!("Failed to read entry path: {err}"),
                })?;

            // Check for signature files (case-insensitive)
            if path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("sig"))
            {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Verify the signature of a signed gem using X.509 certificates
    ///
    /// Extracts signature files from the gem archive and verifies them against
    /// trusted certificates using RSA/SHA256 verification.
    fn verify_signature(&self, gem_path: &Path) -> Result<(), VerificationError> {
        let gem_path_str = gem_path.display().to_string();

        if self.certificates.is_empty() {
            return Err(VerificationError::NoTrustedCertificate {
                gem_path: gem_path_str,
            });
        }

        let (data_content, sig_content) =
            Self::extract_gem_signature_files(gem_path).map_err(|e| {
                VerificationError::InvalidSignature {
                    gem_path: gem_path_str.clone(),
                    reason: format!("Failed to extract signature files: {e}"),
                }
            })?;

        let mut last_error = None;
        for (cert_name, cert_pem) in &self.certificates {
            match Self::verify_with_certificate(&data_content, &sig_content, cert_pem) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    last_error = Some(format!("Certificate '{cert_name}': {e}"));
                }
            }
        }

        Err(VerificationError::InvalidSignature {
            gem_path: gem_path_str,
            reason: last_error.unwrap_or_else(|| "No matching certificate found".to_string()),
        })
    }

    /// Extract data.tar.gz and data.tar.gz.sig from gem archive
    fn extract_gem_signature_files(gem_path: &Path) -> Result<(Vec<u8>, Vec<u8>)> {
        let file = File::open(gem_path)
            .with_context(|| format!("Failed to open gem file: {}", gem_path.display()))?;
        let mut archive = Archive::new(file);

        let mut data_content = None;
        let mut sig_content = None;

        for entry_result in archive.entries()? {
            let mut entry = entry_result?;
            let path = entry.path()?;
            let path_str = path.to_string_lossy();

            if path_str == "data.tar.gz" {
                let mut content = Vec::new();
                entry.read_to_end(&mut content)?;
                data_content = Some(content);
            } else if path_str == "data.tar.gz.sig" {
                let mut content = Vec::new();
                entry.read_to_end(&mut content)?;
                sig_content = Some(content);
            }

            if data_content.is_some() && sig_content.is_some() {
                break;
            }
        }

        match (data_content, sig_content) {
            (Some(data), Some(sig)) => Ok((data, sig)),
            (None, _) => anyhow::bail!("data.tar.gz not found in gem archive"),
            (_, None) => anyhow::bail!("data.tar.gz.sig not found in gem archive"),
        }
    }

    /// Verify signature using a specific certificate
    fn verify_with_certificate(data: &[u8], sig_bytes: &[u8], cert_pem: &str) -> Result<()> {
        // Parse the X.509 certificate
        let cert = Certificate::from_pem(cert_pem).context("Failed to parse X.509 certificate")?;

        // Create Signature - gem signatures use the same algorithm as the certificate signature
        let signature = Signature::new(&cert.signature_algorithm, sig_bytes);

        // Create VerifyInfo with the data to verify and the signature
        let verify_info = VerifyInfo::new(data.to_vec().into(), signature);

        // Extract VerifyingKey from the certificate's subject public key info
        let key: VerifyingKey = cert
            .tbs_certificate
            .subject_public_key_info
            .try_into()
            .map_err(|e| anyhow::anyhow!("Failed to extract public key from certificate: {e:?}"))?;

        // Verify the signature (x509-verify handles hashing internally)
        key.verify(&verify_info)
            .map_err(|e| anyhow::anyhow!("Signature verification failed: {e:?}"))?;

        Ok(())
    }

    /// Get the current trust policy
    #[must_use]
    pub const fn policy(&self) -> TrustPolicy {
        self.policy
    }

    /// Get the number of loaded trusted certificates
    #[must_use]
    pub fn certificate_count(&self) -> usize {
        self.certificates.len()
    }
}
