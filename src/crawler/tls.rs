//! Browser-like TLS client configuration
//!
//! Orders cipher suites and key-exchange groups the way a current desktop
//! Chrome does and restricts ALPN to HTTP/1.1. Only the parts rustls exposes
//! are shaped; extension order and GREASE values are not.

use rustls::crypto::{ring, CryptoProvider};
use rustls::{ClientConfig, RootCertStore};
use std::sync::Arc;

/// Crypto provider with browser cipher-suite and key-exchange order
pub fn browser_crypto_provider() -> CryptoProvider {
    use ring::cipher_suite::*;

    let cipher_suites = vec![
        TLS13_AES_128_GCM_SHA256,
        TLS13_AES_256_GCM_SHA384,
        TLS13_CHACHA20_POLY1305_SHA256,
        TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
        TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
        TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,
        TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,
        TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256,
        TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256,
    ];

    CryptoProvider {
        cipher_suites,
        kx_groups: vec![
            ring::kx_group::X25519,
            ring::kx_group::SECP256R1,
            ring::kx_group::SECP384R1,
        ],
        ..ring::default_provider()
    }
}

/// Builds the rustls configuration used for direct (non-proxied) connections
pub fn browser_tls_config() -> Result<ClientConfig, rustls::Error> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let mut config = ClientConfig::builder_with_provider(Arc::new(browser_crypto_provider()))
        .with_protocol_versions(&[&rustls::version::TLS13, &rustls::version::TLS12])?
        .with_root_certificates(roots)
        .with_no_client_auth();

    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(config)
}
