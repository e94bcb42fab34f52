//! Upload pipeline and lookup over the object and record stores.
//!
//! An upload runs validate → token → decode → put blob → insert record, and
//! stops at the first failing step. The blob write and the record insert are
//! not atomic: when the insert fails the blob stays in the bucket and the
//! error names its key.

use crate::error::ImageError;
use crate::keys::{storage_key, TokenGenerator};
use crate::object_store::ObjectStore;
use crate::record_store::RecordStore;
use base64::alphabet;
use base64::engine::{GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Upload request body
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSubmission {
    #[serde(default, alias = "idServicio")]
    pub service_id: Option<i64>,
    #[serde(default, alias = "tipoServicio")]
    pub service_type: Option<i64>,
    /// Data-URL style string: `<prefix>,<base64>`
    #[serde(default, alias = "imagen")]
    pub image: Option<String>,
}

/// Submission fields that passed validation
#[derive(Debug, Clone, Copy)]
struct ValidSubmission<'a> {
    service_id: i64,
    service_type: i64,
    image: &'a str,
}

impl ImageSubmission {
    fn validate(&self) -> Result<ValidSubmission<'_>, ImageError> {
        let mut missing = Vec::new();

        let service_id = self.service_id.filter(|id| *id != 0);
        if service_id.is_none() {
            missing.push("serviceId");
        }
        let service_type = self.service_type.filter(|ty| *ty != 0);
        if service_type.is_none() {
            missing.push("serviceType");
        }
        let image = self.image.as_deref().filter(|data| !data.is_empty());
        if image.is_none() {
            missing.push("image");
        }

        match (service_id, service_type, image) {
            (Some(service_id), Some(service_type), Some(image)) => Ok(ValidSubmission {
                service_id,
                service_type,
                image,
            }),
            _ => Err(ImageError::Validation(
                missing
                    .iter()
                    .map(|field| format!("{field} is required"))
                    .collect::<Vec<_>>()
                    .join("; "),
            )),
        }
    }
}

/// Lookup request body. Absent fields filter on 0.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupKey {
    #[serde(default, alias = "idServicio")]
    pub service_id: i64,
    #[serde(default, alias = "tipoServicio")]
    pub service_type: i64,
}

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub record_id: u64,
    pub image_url: String,
    pub object_key: String,
}

/// Base64 payload of a data-URL style string: everything after the first
/// comma, or the whole string when there is none.
pub fn extract_payload(image_data: &str) -> &str {
    image_data
        .split_once(',')
        .map_or(image_data, |(_, payload)| payload)
}

/// Standard padded alphabet that tolerates non-zero trailing bits, as
/// browser and Go encoders produce them.
const IMAGE_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// Decode an image payload. Line breaks inside the payload are ignored.
pub fn decode_payload(payload: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let cleaned: Vec<u8> = payload
        .bytes()
        .filter(|b| !matches!(*b, b'\r' | b'\n'))
        .collect();
    IMAGE_BASE64.decode(cleaned)
}

/// Upload and lookup operations shared by all requests
pub struct ImageService {
    objects: Arc<dyn ObjectStore>,
    records: Arc<dyn RecordStore>,
    tokens: Arc<dyn TokenGenerator>,
}

impl ImageService {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        records: Arc<dyn RecordStore>,
        tokens: Arc<dyn TokenGenerator>,
    ) -> Self {
        Self {
            objects,
            records,
            tokens,
        }
    }

    /// Store one submitted image and index it
    #[instrument(skip(self, submission), fields(service_id = ?submission.service_id, service_type = ?submission.service_type))]
    pub async fn upload(&self, submission: &ImageSubmission) -> Result<UploadOutcome, ImageError> {
        let result = self.run_upload(submission).await;

        match &result {
            Ok(outcome) => {
                metrics::counter!("images.uploads.succeeded").increment(1);
                info!(
                    record_id = outcome.record_id,
                    image_url = %outcome.image_url,
                    "Image upload completed"
                );
            }
            Err(e) => {
                metrics::counter!("images.uploads.failed", "kind" => e.kind()).increment(1);
                match e.orphaned_object() {
                    Some(object_key) => warn!(
                        error = %e,
                        object_key = %object_key,
                        "Image record insert failed, stored object is orphaned"
                    ),
                    None => warn!(error = %e, kind = e.kind(), "Image upload rejected"),
                }
            }
        }

        result
    }

    async fn run_upload(&self, submission: &ImageSubmission) -> Result<UploadOutcome, ImageError> {
        let valid = submission.validate()?;

        let object_key = storage_key(&self.tokens.next_token());

        let bytes = decode_payload(extract_payload(valid.image))?;

        let image_url = self
            .objects
            .put(&object_key, bytes)
            .await
            .map_err(|e| ImageError::Storage(format!("{e:#}")))?;

        let record_id = self
            .records
            .insert(&image_url, valid.service_id, valid.service_type)
            .await
            .map_err(|e| ImageError::Persistence {
                object_key: object_key.clone(),
                cause: format!("{e:#}"),
            })?;

        Ok(UploadOutcome {
            record_id,
            image_url,
            object_key,
        })
    }

    /// All image URLs stored for the key, oldest first
    #[instrument(skip(self))]
    pub async fn lookup(&self, key: LookupKey) -> Result<Vec<String>, ImageError> {
        metrics::counter!("images.lookups").increment(1);

        self.records
            .query_by_key(key.service_id, key.service_type)
            .await
            .map_err(|e| {
                let err = ImageError::Query(format!("{e:#}"));
                warn!(error = %err, "Image lookup failed");
                err
            })
    }

    /// Whether the record store answers
    pub async fn ready(&self) -> anyhow::Result<()> {
        self.records.ping().await
    }
}
