// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! TLS trust for the HTTP transport.
//!
//! [`WebPkiTrustEvaluator`] is the default platform evaluation (webpki
//! roots). `PinningVerifier` plugs the session's challenge handling into
//! the rustls handshake: every server certificate is turned into a
//! server-trust challenge and the handshake waits for the decision.

use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::crypto::{ring as ring_provider, verify_tls12_signature, verify_tls13_signature};
use rustls::crypto::WebPkiSupportedAlgorithms;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, Error as TlsError, RootCertStore, SignatureScheme};

use super::{AuthChallenge, ChallengeDisposition, SessionDelegate};
use crate::pinning::{ServerTrust, TrustError, TrustEvaluator};

/// Delegate shared between the transport and its TLS verifier.
pub(crate) type DelegateSlot = Arc<Mutex<Option<Arc<dyn SessionDelegate>>>>;

fn webpki_roots_store() -> RootCertStore {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    roots
}

fn build_webpki_verifier(roots: RootCertStore) -> Result<Arc<WebPkiServerVerifier>, TrustError> {
    WebPkiServerVerifier::builder_with_provider(
        Arc::new(roots),
        Arc::new(ring_provider::default_provider()),
    )
    .build()
    .map_err(|e| TrustError::Untrusted(e.to_string()))
}

fn host_of(server_name: &ServerName<'_>) -> Option<String> {
    match server_name {
        ServerName::DnsName(name) => Some(name.as_ref().to_string()),
        ServerName::IpAddress(ip) => Some(std::net::IpAddr::from(*ip).to_string()),
        _ => None,
    }
}

/// Chain and hostname validation against the webpki root store.
#[derive(Debug, Clone)]
pub struct WebPkiTrustEvaluator {
    verifier: Arc<WebPkiServerVerifier>,
}

impl WebPkiTrustEvaluator {
    pub fn new() -> Result<Self, TrustError> {
        Self::with_roots(webpki_roots_store())
    }

    /// Evaluates against custom roots instead of the webpki set.
    pub fn with_roots(roots: RootCertStore) -> Result<Self, TrustError> {
        Ok(WebPkiTrustEvaluator {
            verifier: build_webpki_verifier(roots)?,
        })
    }
}

impl TrustEvaluator for WebPkiTrustEvaluator {
    fn evaluate(&self, trust: &ServerTrust, host: &str) -> Result<(), TrustError> {
        let (leaf, rest) = trust.chain.split_first().ok_or(TrustError::EmptyChain)?;
        let end_entity = CertificateDer::from(leaf.as_slice());
        let intermediates: Vec<CertificateDer<'_>> = rest
            .iter()
            .map(|der| CertificateDer::from(der.as_slice()))
            .collect();
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|e| TrustError::Untrusted(e.to_string()))?;

        self.verifier
            .verify_server_cert(&end_entity, &intermediates, &server_name, &[], UnixTime::now())
            .map(|_| ())
            .map_err(|e| TrustError::Untrusted(e.to_string()))
    }
}

/// rustls verifier that defers the trust decision to the session delegate.
pub(crate) struct PinningVerifier {
    delegate: DelegateSlot,
    fallback: Arc<WebPkiServerVerifier>,
    algorithms: WebPkiSupportedAlgorithms,
    decision_timeout: Duration,
}

impl PinningVerifier {
    pub(crate) fn new(delegate: DelegateSlot, decision_timeout: Duration) -> Result<Self, TrustError> {
        Ok(PinningVerifier {
            delegate,
            fallback: build_webpki_verifier(webpki_roots_store())?,
            algorithms: ring_provider::default_provider().signature_verification_algorithms,
            decision_timeout,
        })
    }

    fn decide(&self, trust: ServerTrust) -> Result<ChallengeDisposition, TlsError> {
        let delegate = self
            .delegate
            .lock()
            .clone()
            .ok_or_else(|| TlsError::General("no session delegate attached".into()))?;

        let (tx, rx) = std_mpsc::sync_channel(1);
        delegate.did_receive_challenge(
            AuthChallenge::server_trust(trust),
            Box::new(move |disposition| {
                let _ = tx.send(disposition);
            }),
        );
        rx.recv_timeout(self.decision_timeout)
            .map_err(|_| TlsError::General("server trust decision timed out".into()))
    }
}

impl std::fmt::Debug for PinningVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinningVerifier")
            .field("decision_timeout", &self.decision_timeout)
            .finish_non_exhaustive()
    }
}

impl ServerCertVerifier for PinningVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, TlsError> {
        let host = host_of(server_name)
            .ok_or_else(|| TlsError::General("unsupported server name".into()))?;
        let chain = std::iter::once(end_entity)
            .chain(intermediates.iter())
            .map(|der| der.as_ref().to_vec())
            .collect();

        match self.decide(ServerTrust::new(host.clone(), chain))? {
            ChallengeDisposition::UseCredential => Ok(ServerCertVerified::assertion()),
            ChallengeDisposition::PerformDefaultHandling => self.fallback.verify_server_cert(
                end_entity,
                intermediates,
                server_name,
                ocsp_response,
                now,
            ),
            ChallengeDisposition::CancelChallenge => {
                tracing::warn!(%host, "server trust rejected");
                Err(TlsError::General(format!("server trust rejected for {}", host)))
            }
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        verify_tls12_signature(message, cert, dss, &self.algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        verify_tls13_signature(message, cert, dss, &self.algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.algorithms.supported_schemes()
    }
}

/// Client config whose only trust authority is the session delegate.
pub(crate) fn client_config(
    delegate: DelegateSlot,
    decision_timeout: Duration,
) -> Result<rustls::ClientConfig, TlsError> {
    let verifier = PinningVerifier::new(delegate, decision_timeout)
        .map_err(|e| TlsError::General(e.to_string()))?;
    let mut config = rustls::ClientConfig::builder_with_provider(Arc::new(
        ring_provider::default_provider(),
    ))
    .with_safe_default_protocol_versions()?
    .dangerous()
    .with_custom_certificate_verifier(Arc::new(verifier))
    .with_no_client_auth();
    config.alpn_protocols = vec![b"http/1.1".to_vec()];
    Ok(config)
}

// INLINE_TEST_REQUIRED: Tests crate-private delegate slot handling
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verifier_without_delegate_rejects() {
        let slot: DelegateSlot = Arc::new(Mutex::new(None));
        let verifier = PinningVerifier::new(slot, Duration::from_millis(50)).unwrap();
        let trust = ServerTrust::new("example.com", vec![vec![1, 2, 3]]);
        assert!(verifier.decide(trust).is_err());
    }

    #[test]
    fn test_webpki_rejects_empty_chain() {
        let evaluator = WebPkiTrustEvaluator::new().unwrap();
        let trust = ServerTrust::new("example.com", vec![]);
        assert_eq!(evaluator.evaluate(&trust, "example.com"), Err(TrustError::EmptyChain));
    }

    #[test]
    fn test_webpki_rejects_garbage_leaf() {
        let evaluator = WebPkiTrustEvaluator::new().unwrap();
        let trust = ServerTrust::new("example.com", vec![b"not a certificate".to_vec()]);
        assert!(evaluator.evaluate(&trust, "example.com").is_err());
    }
}
