//! S3 SigV4 query-string presigning.

use super::{ObjectStorage, PresignVerb, StorageError};
use crate::config::S3Config;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Url;
use sha2::{Digest, Sha256};
use std::fmt::Write;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SERVICE: &str = "s3";
/// Limite imposée par SigV4 (7 jours)
const MAX_EXPIRES_SECS: u64 = 604_800;

#[derive(Clone)]
pub struct S3Storage {
    config: S3Config,
    scheme: String,
    endpoint_host: String,
    http: reqwest::Client,
}

impl S3Storage {
    pub fn new(config: S3Config) -> Result<Self, StorageError> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| StorageError::InvalidEndpoint(format!("{}: {e}", config.endpoint)))?;
        let host = endpoint
            .host_str()
            .ok_or_else(|| StorageError::InvalidEndpoint(config.endpoint.clone()))?;
        let endpoint_host = match endpoint.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        Ok(Self {
            scheme: endpoint.scheme().to_string(),
            endpoint_host,
            config,
            http: reqwest::Client::new(),
        })
    }

    fn host_and_path(&self, key: &str) -> (String, String) {
        let key = uri_encode(key.trim_start_matches('/'), false);
        if self.config.path_style {
            (
                self.endpoint_host.clone(),
                format!("/{}/{key}", uri_encode(&self.config.bucket, true)),
            )
        } else {
            (
                format!("{}.{}", self.config.bucket, self.endpoint_host),
                format!("/{key}"),
            )
        }
    }

    pub fn presign_at(
        &self,
        key: &str,
        verb: PresignVerb,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> String {
        let (host, path) = self.host_and_path(key);
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();
        let scope = format!("{date}/{}/{SERVICE}/aws4_request", self.config.region);
        let expires = ttl.as_secs().clamp(1, MAX_EXPIRES_SECS);

        // Déjà triés par nom de paramètre
        let credential = format!("{}/{scope}", self.config.access_key);
        let expires = expires.to_string();
        let params = [
            ("X-Amz-Algorithm", ALGORITHM),
            ("X-Amz-Credential", credential.as_str()),
            ("X-Amz-Date", amz_date.as_str()),
            ("X-Amz-Expires", expires.as_str()),
            ("X-Amz-SignedHeaders", "host"),
        ];
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", uri_encode(k, true), uri_encode(v, true)))
            .collect::<Vec<_>>()
            .join("&");

        let canonical_request = format!(
            "{}\n{path}\n{query}\nhost:{host}\n\nhost\nUNSIGNED-PAYLOAD",
            verb.as_str()
        );
        let string_to_sign = format!(
            "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let signing_key = signing_key(&self.config.secret_key, &date, &self.config.region);
        let signature = hex::encode(hmac(&signing_key, string_to_sign.as_bytes()));

        format!(
            "{}://{host}{path}?{query}&X-Amz-Signature={signature}",
            self.scheme
        )
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    fn presign(&self, key: &str, verb: PresignVerb, ttl: Duration) -> Result<String, StorageError> {
        Ok(self.presign_at(key, verb, ttl, Utc::now()))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let url = self.presign_at(key, PresignVerb::Delete, Duration::from_secs(60), Utc::now());
        let response = self.http.delete(url).send().await?;

        let status = response.status();
        // Un objet déjà absent compte comme supprimé
        if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!(key, "Object deleted");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(StorageError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).unwrap_or_else(|_| unreachable!());
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn signing_key(secret: &str, date: &str, region: &str) -> Vec<u8> {
    let k_date = hmac(format!("AWS4{secret}").as_bytes(), date.as_bytes());
    let k_region = hmac(&k_date, region.as_bytes());
    let k_service = hmac(&k_region, SERVICE.as_bytes());
    hmac(&k_service, b"aws4_request")
}

/// Encodage URI de SigV4: seuls les caractères non réservés restent tels quels
fn uri_encode(input: &str, encode_slash: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            b'/' if !encode_slash => out.push('/'),
            _ => {
                let _ = write!(out, "%{byte:02X}");
            }
        }
    }
    out
}
