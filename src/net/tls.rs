//! TLS configuration and certificate loading.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;

use crate::config::TlsConfig;

/// Errors raised while loading TLS material.
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("{kind} file not found: {path:?}")]
    MissingFile { kind: &'static str, path: PathBuf },

    #[error("no certificates found in {0:?}")]
    NoCertificates(PathBuf),

    #[error("no private key found in {0:?}")]
    NoPrivateKey(PathBuf),

    #[error("failed to read TLS material: {0}")]
    Io(#[from] std::io::Error),
}

/// Load TLS configuration from certificate and key files.
pub async fn load_tls_config(config: &TlsConfig) -> Result<RustlsConfig, TlsError> {
    let cert_path = Path::new(&config.cert_path);
    let key_path = Path::new(&config.key_path);

    let certs = read_certificates(cert_path)?;
    let key = read_private_key(key_path)?;

    tracing::info!(
        cert_path = %cert_path.display(),
        certificates = certs.len(),
        "TLS material loaded"
    );

    Ok(RustlsConfig::from_der(certs, key).await?)
}

/// Read every PEM certificate in the chain file as DER.
fn read_certificates(path: &Path) -> Result<Vec<Vec<u8>>, TlsError> {
    let mut reader = open(path, "Certificate")?;
    let certs = rustls_pemfile::certs(&mut reader)
        .map(|cert| cert.map(|der| der.as_ref().to_vec()))
        .collect::<Result<Vec<_>, _>>()?;

    if certs.is_empty() {
        return Err(TlsError::NoCertificates(path.to_path_buf()));
    }
    Ok(certs)
}

/// Read the first PKCS#1, PKCS#8 or SEC1 private key as DER.
fn read_private_key(path: &Path) -> Result<Vec<u8>, TlsError> {
    let mut reader = open(path, "Private key")?;
    rustls_pemfile::private_key(&mut reader)?
        .map(|key| key.secret_der().to_vec())
        .ok_or_else(|| TlsError::NoPrivateKey(path.to_path_buf()))
}

fn open(path: &Path, kind: &'static str) -> Result<BufReader<File>, TlsError> {
    if !path.exists() {
        return Err(TlsError::MissingFile {
            kind,
            path: path.to_path_buf(),
        });
    }
    Ok(BufReader::new(File::open(path)?))
}
