//! Mutually-authenticated HTTPS transport.
//!
//! Every call builds a fresh TLS context from the configured identity
//! material: the client certificate and key are presented to the peer, only
//! the configured CA bundle is trusted, and hostname verification stays on.
//! Failing to load or parse any of that material is a configuration error
//! raised before a connection is attempted. No connection state survives
//! between calls.

use crate::{ApiError, HttpResponse, Method, Transport};
use roost_config::{EndpointConfig, IdentityConfig};
use std::io::Read;
use std::path::Path;
use std::time::{Duration, Instant};
use ureq::tls::{parse_pem, Certificate, ClientCert, PemItem, PrivateKey, RootCerts, TlsConfig};
use ureq::Agent;

pub struct SecureTransport {
    endpoint: EndpointConfig,
    identity: IdentityConfig,
    timeout: Option<Duration>,
}

impl SecureTransport {
    pub fn new(
        endpoint: EndpointConfig,
        identity: IdentityConfig,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            endpoint,
            identity,
            timeout,
        }
    }

    pub(crate) fn url(&self, endpoint: &str) -> String {
        format!(
            "https://{}:{}{}{}",
            self.endpoint.host, self.endpoint.port, self.endpoint.path_root, endpoint
        )
    }

    /// Build a one-shot agent carrying the mutual-TLS context.
    fn agent(&self) -> Result<Agent, ApiError> {
        let chain = read_certificates(&self.identity.certificate, "client certificate")?;
        let key = read_private_key(&self.identity.key)?;
        let roots = read_certificates(&self.identity.ca_bundle, "CA bundle")?;

        let tls = TlsConfig::builder()
            .root_certs(RootCerts::new_with_certs(&roots))
            .client_cert(Some(ClientCert::new_with_certs(&chain, key)))
            .build();

        let config = Agent::config_builder()
            .tls_config(tls)
            .http_status_as_error(false)
            .timeout_global(self.timeout)
            .build();
        Ok(config.new_agent())
    }
}

impl Transport for SecureTransport {
    fn request(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, &str)],
        headers: &[(&str, &str)],
        body: Option<&[u8]>,
    ) -> Result<HttpResponse, ApiError> {
        let agent = self.agent()?;
        let url = self.url(endpoint);

        let started = Instant::now();
        let result = match method {
            Method::Get | Method::Delete => {
                let mut req = match method {
                    Method::Get => agent.get(&url),
                    _ => agent.delete(&url),
                };
                for (key, value) in query {
                    req = req.query(*key, *value);
                }
                for (name, value) in headers {
                    req = req.header(*name, *value);
                }
                req.call()
            }
            Method::Put | Method::Post | Method::Patch => {
                let mut req = match method {
                    Method::Put => agent.put(&url),
                    Method::Post => agent.post(&url),
                    _ => agent.patch(&url),
                };
                for (key, value) in query {
                    req = req.query(*key, *value);
                }
                for (name, value) in headers {
                    req = req.header(*name, *value);
                }
                req.send(body.unwrap_or_default())
            }
        };

        let response = result.map_err(|e| ApiError::Connection(e.to_string()))?;
        let status = response.status().as_u16();
        let mut collected = Vec::new();
        for (name, value) in response.headers() {
            collected.push((
                name.as_str().to_owned(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            ));
        }
        let mut reader = response.into_body().into_reader();
        let mut payload = Vec::new();
        reader
            .read_to_end(&mut payload)
            .map_err(|e| ApiError::Connection(e.to_string()))?;
        tracing::debug!(
            "{method} {url} -> {status} in {:.1} ms",
            started.elapsed().as_secs_f64() * 1000.0
        );

        Ok(HttpResponse {
            status,
            headers: collected,
            body: payload,
        })
    }
}

fn read_certificates(path: &Path, role: &str) -> Result<Vec<Certificate<'static>>, ApiError> {
    let pem = std::fs::read(path)
        .map_err(|e| ApiError::Identity(format!("cannot read {role} {}: {e}", path.display())))?;
    let mut certs = Vec::new();
    for item in parse_pem(&pem) {
        match item {
            Ok(PemItem::Certificate(cert)) => certs.push(cert.to_owned()),
            Ok(_) => {}
            Err(e) => {
                return Err(ApiError::Identity(format!(
                    "invalid PEM in {role} {}: {e}",
                    path.display()
                )))
            }
        }
    }
    if certs.is_empty() {
        return Err(ApiError::Identity(format!(
            "no certificates found in {role} {}",
            path.display()
        )));
    }
    Ok(certs)
}

fn read_private_key(path: &Path) -> Result<PrivateKey<'static>, ApiError> {
    let pem = std::fs::read(path).map_err(|e| {
        ApiError::Identity(format!("cannot read private key {}: {e}", path.display()))
    })?;
    let key = PrivateKey::from_pem(&pem).map_err(|e| {
        ApiError::Identity(format!("invalid private key {}: {e}", path.display()))
    })?;
    Ok(key.to_owned())
}
