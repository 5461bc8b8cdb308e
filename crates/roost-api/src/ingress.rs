//! Advisory archive upload to the Roost ingress API.
//!
//! The upload is write-once per registration attempt: a failure here must
//! surface to the caller and is never retried, because a duplicate upload
//! could create duplicate remote records. The multipart body is assembled
//! by hand; the archive file and the canonical-facts JSON travel as two
//! parts of one `multipart/form-data` request.

use crate::{ApiError, Method, Transport};
use serde::Deserialize;
use std::path::Path;
use uuid::Uuid;

/// Acknowledgment returned by the ingress service for an accepted upload.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadReceipt {
    pub request_id: String,
}

pub struct Ingress<T: Transport> {
    transport: T,
}

impl<T: Transport> Ingress<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Upload an advisory archive with its accompanying facts payload.
    pub fn upload(
        &self,
        archive: &Path,
        content_type: &str,
        facts: &serde_json::Value,
    ) -> Result<UploadReceipt, ApiError> {
        let payload = std::fs::read(archive)?;
        let filename = archive
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("archive");
        let boundary = format!("roost-{}", Uuid::new_v4());
        let body = multipart_body(&boundary, filename, content_type, &payload, facts)?;
        tracing::debug!(
            "uploading archive {} ({} bytes) as {content_type}",
            archive.display(),
            payload.len()
        );

        let header = format!("multipart/form-data; boundary={boundary}");
        let response = self.transport.request(
            Method::Post,
            "/upload",
            &[],
            &[("Content-Type", &header)],
            Some(&body),
        )?;
        if !response.is_success() {
            return Err(ApiError::Status {
                status: response.status,
                body: response.body_excerpt(),
            });
        }
        serde_json::from_slice(&response.body).map_err(|e| ApiError::Malformed(e.to_string()))
    }
}

fn multipart_body(
    boundary: &str,
    filename: &str,
    content_type: &str,
    payload: &[u8],
    facts: &serde_json::Value,
) -> Result<Vec<u8>, ApiError> {
    let facts_json = serde_json::to_vec(facts).map_err(|e| ApiError::Malformed(e.to_string()))?;
    let mut body = Vec::with_capacity(payload.len() + facts_json.len() + 512);
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; \
             filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(payload);
    body.extend_from_slice(
        format!(
            "\r\n--{boundary}\r\nContent-Disposition: form-data; name=\"metadata\"\r\n\
             Content-Type: application/json\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(&facts_json);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    Ok(body)
}
