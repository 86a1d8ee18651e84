//! Thumbnail upload and public URL resolution

use std::io::Write;
use std::sync::Arc;

use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Object prefix every thumbnail is stored under
pub const THUMBNAIL_PREFIX: &str = "localitymap-thumbnail/";

/// Derives the image file name for a row: `"MG Road", "Pune"` -> `mg-road-pune.png`
pub fn thumbnail_file_name(sublocation: &str, city: &str) -> String {
    format!("{} {}.png", sublocation, city)
        .replace(' ', "-")
        .to_lowercase()
}

/// Uploads images to a bucket and resolves their public URLs
#[derive(Clone)]
pub struct ThumbnailStore {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    public_base_url: String,
}

impl ThumbnailStore {
    /// Wraps an already-configured object store
    pub fn new(
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            public_base_url: public_base_url.into(),
        }
    }

    /// Connects to Google Cloud Storage with service-account JSON contents
    ///
    /// The credentials are written to a transient file for the client
    /// builder, and that same file handle removes it afterwards.
    pub fn connect_gcs(
        credentials_json: &str,
        bucket: impl Into<String>,
        public_base_url: impl Into<String>,
    ) -> Result<Self> {
        let bucket = bucket.into();

        let mut credentials = tempfile::Builder::new()
            .prefix("credentials-")
            .suffix(".json")
            .tempfile()?;
        credentials.write_all(credentials_json.as_bytes())?;
        credentials.flush()?;

        let built = GoogleCloudStorageBuilder::new()
            .with_bucket_name(&bucket)
            .with_service_account_path(credentials.path().to_string_lossy())
            .build();

        if let Err(e) = credentials.close() {
            warn!(error = %e, "failed to remove transient credentials file");
        }

        let store = built.map_err(|e| Error::Config(format!("failed to connect to storage: {}", e)))?;
        Ok(Self::new(Arc::new(store), bucket, public_base_url))
    }

    /// Bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Confirms the bucket is reachable by listing the thumbnail prefix
    pub async fn verify(&self) -> Result<()> {
        let prefix = ObjectPath::from(THUMBNAIL_PREFIX.trim_end_matches('/'));
        self.store
            .list_with_delimiter(Some(&prefix))
            .await
            .map_err(|e| Error::Config(format!("bucket {} is not reachable: {}", self.bucket, e)))?;
        Ok(())
    }

    /// Object path for a thumbnail file name
    pub fn object_path(&self, file_name: &str) -> String {
        format!("{}{}", THUMBNAIL_PREFIX, file_name)
    }

    /// Public URL for an object path
    ///
    /// The URL is `{base}/{bucket}/{object_path}` with every `{bucket}/`
    /// segment then stripped.
    pub fn public_url(&self, object_path: &str) -> String {
        let full = format!(
            "{}/{}/{}",
            self.public_base_url.trim_end_matches('/'),
            self.bucket,
            object_path
        );
        full.replace(&format!("{}/", self.bucket), "")
    }

    /// Uploads image bytes under the thumbnail prefix and returns the public URL
    ///
    /// The URL is derived from the stored key, so characters the store
    /// percent-encodes appear encoded in the URL too.
    pub async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<String> {
        let location = ObjectPath::from(self.object_path(file_name));
        let size = bytes.len();

        self.store.put(&location, PutPayload::from(bytes)).await?;

        debug!(object = %location, bytes = size, "uploaded thumbnail");
        Ok(self.public_url(location.as_ref()))
    }
}
