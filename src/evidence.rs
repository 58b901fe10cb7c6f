//! Evidence intake: misconduct reports with optional photo upload.
//!
//! The client sends inline base64 image bytes; the core owns decoding and
//! the blob-store path, so clients can never forge a locator. Upload failure
//! is logged and swallowed: evidence is optional and the report still lands.

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::stores::ReportRepository;
use crate::types::{
    MisconductReport, OperatorId, PassengerId, ReportId, ReportReason, ReportStatus, TripId,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, PutPayload};
use std::sync::Arc;
use uuid::Uuid;

/// Content type of every evidence photo.
const EVIDENCE_CONTENT_TYPE: &str = "image/jpeg";

/// Blob storage for evidence photos, selected by URL scheme:
/// `s3://bucket/prefix`, `file:///path`, or `memory:`.
#[derive(Clone)]
pub struct BlobStore {
    store: Arc<dyn ObjectStore>,
    prefix: String,
    base: String,
}

impl BlobStore {
    /// Build a store from its URL.
    ///
    /// # Errors
    ///
    /// Returns `INTERNAL` for an unsupported scheme or backend construction
    /// failure.
    pub fn from_url(url: &str) -> Result<Self> {
        let base = url.trim_end_matches('/').to_string();

        let (store, prefix): (Arc<dyn ObjectStore>, String) = if url == "memory:" {
            (Arc::new(object_store::memory::InMemory::new()), String::new())
        } else if let Some(rest) = url.strip_prefix("s3://") {
            let (bucket, prefix) = match rest.split_once('/') {
                Some((bucket, prefix)) => (bucket, prefix.trim_end_matches('/')),
                None => (rest, ""),
            };
            if bucket.is_empty() {
                return Err(Error::internal(anyhow::anyhow!(
                    "s3 blob URL must include a bucket name"
                )));
            }
            // Credentials, region, and custom endpoints come from the
            // environment (AWS_ACCESS_KEY_ID, AWS_REGION, AWS_ENDPOINT).
            let s3 = object_store::aws::AmazonS3Builder::from_env()
                .with_bucket_name(bucket)
                .build()
                .map_err(Error::internal)?;
            (Arc::new(s3), prefix.to_string())
        } else if let Some(path) = url.strip_prefix("file://") {
            std::fs::create_dir_all(path).map_err(Error::internal)?;
            let local = object_store::local::LocalFileSystem::new_with_prefix(path)
                .map_err(Error::internal)?;
            (Arc::new(local), String::new())
        } else {
            return Err(Error::internal(anyhow::anyhow!(
                "unsupported blob store URL scheme: {url}"
            )));
        };

        Ok(Self { store, prefix, base })
    }

    /// In-memory store (tests and local development).
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(object_store::memory::InMemory::new()),
            prefix: String::new(),
            base: "memory:".to_string(),
        }
    }

    /// Store a JPEG at `path`, returning its locator.
    ///
    /// # Errors
    ///
    /// Returns `INTERNAL` if the backend rejects the write; EVID swallows
    /// that per policy.
    pub async fn put_jpeg(&self, path: &str, bytes: Bytes) -> Result<String> {
        let full = if self.prefix.is_empty() {
            path.to_string()
        } else {
            format!("{}/{path}", self.prefix)
        };

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, EVIDENCE_CONTENT_TYPE.into());

        self.store
            .put_opts(
                &ObjectPath::from(full.as_str()),
                PutPayload::from(bytes),
                PutOptions {
                    attributes,
                    ..Default::default()
                },
            )
            .await
            .map_err(Error::internal)?;

        Ok(format!("{}/{full}", self.base))
    }
}

/// Misconduct-report intake.
#[derive(Clone)]
pub struct EvidenceService {
    blob: BlobStore,
    reports: ReportRepository,
    clock: Arc<dyn Clock>,
}

impl EvidenceService {
    /// Assemble the service from its collaborators.
    #[must_use]
    pub fn new(blob: BlobStore, reports: ReportRepository, clock: Arc<dyn Clock>) -> Self {
        Self {
            blob,
            reports,
            clock,
        }
    }

    /// File a misconduct report, uploading the evidence photo if one was
    /// attached.
    ///
    /// # Errors
    ///
    /// `COMMENTS_REQUIRED` for an OTHER report without comments,
    /// `MALFORMED_REQUEST` for undecodable image bytes, or a storage error
    /// from the report insert. Blob upload failure is not an error.
    pub async fn submit_report(
        &self,
        operator_id: OperatorId,
        passenger_id: PassengerId,
        trip_id: TripId,
        reason: ReportReason,
        comments: Option<String>,
        image_base64: Option<String>,
    ) -> Result<ReportId> {
        validate_report(reason, comments.as_deref())?;

        let image = match image_base64.as_deref().map(str::trim) {
            Some(encoded) if !encoded.is_empty() => Some(Bytes::from(
                STANDARD
                    .decode(encoded)
                    .map_err(|_| Error::MalformedRequest)?,
            )),
            _ => None,
        };

        let mut evidence_locator = None;
        if let Some(bytes) = image {
            let path = evidence_path(passenger_id);
            match self.blob.put_jpeg(&path, bytes).await {
                Ok(locator) => evidence_locator = Some(locator),
                Err(err) => {
                    // Evidence is optional: the report proceeds without it.
                    tracing::error!(%passenger_id, %trip_id, error = %err, "evidence upload failed");
                }
            }
        }

        let report = MisconductReport {
            report_id: ReportId::new(),
            passenger_id,
            trip_id,
            operator_id,
            reason,
            comments: comments.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
            evidence_locator,
            status: ReportStatus::Pending,
            reported_at: self.clock.now(),
        };
        self.reports.insert(&report).await?;

        tracing::info!(report_id = %report.report_id, %passenger_id, %trip_id, "misconduct report filed");
        Ok(report.report_id)
    }
}

/// OTHER reports must explain themselves.
///
/// # Errors
///
/// Returns `COMMENTS_REQUIRED` when an OTHER report has no usable comments.
pub fn validate_report(reason: ReportReason, comments: Option<&str>) -> Result<()> {
    if reason == ReportReason::Other && comments.map_or(true, |c| c.trim().is_empty()) {
        return Err(Error::CommentsRequired);
    }
    Ok(())
}

/// Blob path for an evidence photo: `misconduct/{passenger_id}/{uuid}.jpg`.
fn evidence_path(passenger_id: PassengerId) -> String {
    format!("misconduct/{passenger_id}/{}.jpg", Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_requires_comments() {
        assert!(validate_report(ReportReason::Other, None).is_err());
        assert!(validate_report(ReportReason::Other, Some("   ")).is_err());
        assert!(validate_report(ReportReason::Other, Some("refused to show token")).is_ok());
    }

    #[test]
    fn named_reasons_do_not_require_comments() {
        assert!(validate_report(ReportReason::Behavior, None).is_ok());
        assert!(validate_report(ReportReason::InvalidBoardingAttempt, None).is_ok());
    }

    #[test]
    fn evidence_paths_are_scoped_per_passenger() {
        let passenger = PassengerId::new();
        let path = evidence_path(passenger);

        assert!(path.starts_with(&format!("misconduct/{passenger}/")));
        assert!(path.ends_with(".jpg"));
        assert_ne!(evidence_path(passenger), path, "uuid makes paths unique");
    }

    #[tokio::test]
    async fn put_jpeg_returns_a_locator_under_the_base() {
        let blob = BlobStore::in_memory();
        let locator = blob
            .put_jpeg("misconduct/p1/photo.jpg", Bytes::from_static(b"\xff\xd8\xff"))
            .await
            .unwrap();
        assert_eq!(locator, "memory:/misconduct/p1/photo.jpg");
    }
}
