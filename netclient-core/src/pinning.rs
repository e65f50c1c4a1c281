// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Certificate Pinning Validator
//!
//! Decides whether a server-presented chain is trusted, either against a
//! locally pinned certificate or an allow-list of public-key hashes.
//! Default trust evaluation always runs first and a failure there rejects
//! regardless of the pinning outcome.

use std::collections::HashSet;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use ring::digest::{digest, SHA256};
use thiserror::Error;
use x509_parser::prelude::*;

/// ASN.1 SubjectPublicKeyInfo header of an RSA-2048 key, prepended to the
/// raw key bytes before hashing.
const RSA_2048_ASN1_HEADER: [u8; 24] = [
    0x30, 0x82, 0x01, 0x22, 0x30, 0x0d, 0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01,
    0x01, 0x05, 0x00, 0x03, 0x82, 0x01, 0x0f, 0x00,
];

/// Trust evaluation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrustError {
    #[error("Server presented an empty certificate chain")]
    EmptyChain,

    #[error("Certificate chain not trusted: {0}")]
    Untrusted(String),

    #[error("Invalid PEM certificate: {0}")]
    InvalidPem(String),
}

/// What the server presented during the handshake. Leaf certificate first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerTrust {
    pub host: String,
    pub chain: Vec<Vec<u8>>,
}

impl ServerTrust {
    pub fn new(host: impl Into<String>, chain: Vec<Vec<u8>>) -> Self {
        ServerTrust {
            host: host.into(),
            chain,
        }
    }

    pub fn leaf(&self) -> Option<&[u8]> {
        self.chain.first().map(Vec::as_slice)
    }
}

/// Pinning policy fixed at session construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinningPolicy {
    /// DER bytes of the only accepted leaf certificate.
    Certificate(Vec<u8>),
    /// Base64 public-key hashes, optionally evaluated against `domain`.
    PublicKeyHashes {
        hashes: HashSet<String>,
        domain: Option<String>,
    },
}

impl PinningPolicy {
    pub fn certificate_der(der: impl Into<Vec<u8>>) -> Self {
        PinningPolicy::Certificate(der.into())
    }

    /// Pins the first certificate of a PEM document.
    pub fn certificate_pem(pem: &str) -> Result<Self, TrustError> {
        let body: String = pem
            .lines()
            .map(str::trim)
            .skip_while(|line| !line.starts_with("-----BEGIN CERTIFICATE-----"))
            .skip(1)
            .take_while(|line| !line.starts_with("-----END CERTIFICATE-----"))
            .collect();
        if body.is_empty() {
            return Err(TrustError::InvalidPem("no certificate block".into()));
        }
        let der = STANDARD
            .decode(body.as_bytes())
            .map_err(|e| TrustError::InvalidPem(e.to_string()))?;
        Ok(PinningPolicy::Certificate(der))
    }

    pub fn public_key_hashes<I, S>(hashes: I, domain: Option<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PinningPolicy::PublicKeyHashes {
            hashes: hashes.into_iter().map(Into::into).collect(),
            domain,
        }
    }
}

/// Default (CA chain and hostname) trust evaluation.
pub trait TrustEvaluator: Send + Sync {
    fn evaluate(&self, trust: &ServerTrust, host: &str) -> Result<(), TrustError>;
}

/// Evaluator with a fixed verdict.
#[derive(Debug, Clone, Copy)]
pub struct StaticTrustEvaluator {
    trusted: bool,
}

impl StaticTrustEvaluator {
    pub fn trusting() -> Self {
        StaticTrustEvaluator { trusted: true }
    }

    pub fn rejecting() -> Self {
        StaticTrustEvaluator { trusted: false }
    }
}

impl TrustEvaluator for StaticTrustEvaluator {
    fn evaluate(&self, trust: &ServerTrust, host: &str) -> Result<(), TrustError> {
        if trust.chain.is_empty() {
            return Err(TrustError::EmptyChain);
        }
        if self.trusted {
            Ok(())
        } else {
            Err(TrustError::Untrusted(format!("rejected chain for {}", host)))
        }
    }
}

/// Computes the pin of a raw public key: base64(SHA-256(header ‖ key)).
pub fn public_key_hash(raw_key: &[u8]) -> String {
    let mut input = Vec::with_capacity(RSA_2048_ASN1_HEADER.len() + raw_key.len());
    input.extend_from_slice(&RSA_2048_ASN1_HEADER);
    input.extend_from_slice(raw_key);
    STANDARD.encode(digest(&SHA256, &input).as_ref())
}

/// Pin of a DER certificate's subject public key, `None` if it can't be parsed.
pub fn public_key_hash_for_certificate(der: &[u8]) -> Option<String> {
    let (_, cert) = X509Certificate::from_der(der).ok()?;
    let key = &cert.tbs_certificate.subject_pki.subject_public_key.data;
    Some(public_key_hash(key.as_ref()))
}

/// Evaluates server trust against an optional pinning policy.
pub struct CertificatePinningValidator {
    policy: Option<PinningPolicy>,
    evaluator: Arc<dyn TrustEvaluator>,
}

impl CertificatePinningValidator {
    pub fn new(policy: Option<PinningPolicy>, evaluator: Arc<dyn TrustEvaluator>) -> Self {
        CertificatePinningValidator { policy, evaluator }
    }

    pub fn policy(&self) -> Option<&PinningPolicy> {
        self.policy.as_ref()
    }

    pub fn is_pinning(&self) -> bool {
        self.policy.is_some()
    }

    /// Returns whether the presented chain is trusted.
    pub fn evaluate(&self, trust: &ServerTrust) -> bool {
        match &self.policy {
            None => self.default_trust(trust, &trust.host),
            Some(PinningPolicy::Certificate(pinned)) => {
                self.default_trust(trust, &trust.host)
                    && trust.leaf().is_some_and(|leaf| leaf == pinned.as_slice())
            }
            Some(PinningPolicy::PublicKeyHashes { hashes, domain }) => {
                if hashes.is_empty() || trust.chain.is_empty() {
                    return false;
                }
                let host = domain.as_deref().unwrap_or(&trust.host);
                if !self.default_trust(trust, host) {
                    return false;
                }
                chain_matches_pins(&trust.chain, hashes)
            }
        }
    }

    /// Evaluates off the calling thread and calls `completion` once.
    ///
    /// Runs inline when no tokio runtime is available.
    pub fn evaluate_async<F>(self: &Arc<Self>, trust: ServerTrust, completion: F)
    where
        F: FnOnce(bool) + Send + 'static,
    {
        let validator = Arc::clone(self);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || completion(validator.evaluate(&trust)));
            }
            Err(_) => completion(validator.evaluate(&trust)),
        }
    }

    fn default_trust(&self, trust: &ServerTrust, host: &str) -> bool {
        match self.evaluator.evaluate(trust, host) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(host, error = %e, "default trust evaluation failed");
                false
            }
        }
    }
}

impl std::fmt::Debug for CertificatePinningValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificatePinningValidator")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Walks the chain until a pinned key is found; a certificate without an
/// extractable key before that point rejects.
fn chain_matches_pins(chain: &[Vec<u8>], hashes: &HashSet<String>) -> bool {
    for der in chain {
        match public_key_hash_for_certificate(der) {
            Some(hash) if hashes.contains(&hash) => return true,
            Some(_) => {}
            None => {
                tracing::warn!("public key extraction failed for chain certificate");
                return false;
            }
        }
    }
    false
}
