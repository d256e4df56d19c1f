//! TLS termination (§6 `TLS_CERT_FILE`/`TLS_KEY_FILE`): builds a `rustls`
//! server config from PEM files, mirroring the teacher's `tls.rs`.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rustls::pki_types::PrivateKeyDer;
use rustls::ServerConfig;
use rustls_pemfile::{certs, pkcs8_private_keys};

use crate::config::TlsArgs;
use crate::error::PlasmaError;

pub fn build_server_config(args: &TlsArgs) -> Result<ServerConfig, PlasmaError> {
    let cert_path = args
        .tls_cert_file
        .as_ref()
        .ok_or_else(|| PlasmaError::Tls("PLASMA_TLS_CERT_FILE not set".into()))?;
    let key_path = args
        .tls_key_file
        .as_ref()
        .ok_or_else(|| PlasmaError::Tls("PLASMA_TLS_KEY_FILE not set".into()))?;

    let cert_chain = load_certs(cert_path)?;
    let mut keys = load_keys(key_path)?;
    if keys.is_empty() {
        return Err(PlasmaError::Tls(format!(
            "no PKCS#8 private keys found in {}",
            key_path.display()
        )));
    }

    ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(cert_chain, keys.remove(0))
        .map_err(|e| PlasmaError::Tls(e.to_string()))
}

pub fn build_rustls_config(
    args: &TlsArgs,
) -> Result<axum_server::tls_rustls::RustlsConfig, PlasmaError> {
    let config = build_server_config(args)?;
    Ok(axum_server::tls_rustls::RustlsConfig::from_config(Arc::new(
        config,
    )))
}

fn load_certs(path: &Path) -> Result<Vec<rustls::pki_types::CertificateDer<'static>>, PlasmaError> {
    let file = File::open(path)
        .map_err(|e| PlasmaError::Tls(format!("reading {}: {e}", path.display())))?;
    let mut reader = BufReader::new(file);
    certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| PlasmaError::Tls(format!("parsing {}: {e}", path.display())))
}

fn load_keys(path: &Path) -> Result<Vec<PrivateKeyDer<'static>>, PlasmaError> {
    let file = File::open(path)
        .map_err(|e| PlasmaError::Tls(format!("reading {}: {e}", path.display())))?;
    let mut reader = BufReader::new(file);
    pkcs8_private_keys(&mut reader)
        .map(|result| result.map(PrivateKeyDer::from))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| PlasmaError::Tls(format!("parsing {}: {e}", path.display())))
}
