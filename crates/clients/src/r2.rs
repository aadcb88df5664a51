use anyhow::{anyhow, Result};
use storyloom_common::{define_module_client, required_env, ModuleClient};

use aws_sdk_s3::{Client as S3Client, config::{Builder as S3ConfigBuilder, Credentials, Region}};

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub key: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl ImageUpload {
    pub fn png(key: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            key: key.into(),
            content_type: "image/png".to_string(),
            data,
        }
    }
}

define_module_client! {
    (struct R2Client, "r2")
    client_type: S3Client,
    env: ["R2_ACCOUNT_ID", "R2_ACCESS_KEY_ID", "R2_SECRET_ACCESS_KEY", "R2_BUCKET_NAME"],
    setup: async {
        let account_id = required_env("R2_ACCOUNT_ID")?;
        let access_key_id = required_env("R2_ACCESS_KEY_ID")?;
        let secret_access_key = required_env("R2_SECRET_ACCESS_KEY")?;

        let endpoint_url = format!("https://{}.r2.cloudflarestorage.com", account_id);

        let credentials = Credentials::new(
            access_key_id,
            secret_access_key,
            None,
            None,
            "r2-client"
        );

        let s3_config = S3ConfigBuilder::new()
            .endpoint_url(endpoint_url)
            .credentials_provider(credentials)
            .region(Region::new("auto"))
            .behavior_version_latest()
            .build();

        anyhow::Ok(S3Client::from_conf(s3_config))
    }
}

impl R2Client {
    pub fn bucket_name(&self) -> Result<String> {
        required_env("R2_BUCKET_NAME")
    }

    pub fn public_url(&self, key: &str) -> Result<String> {
        let bucket = self.bucket_name()?;
        let domain = std::env::var("R2_PUBLIC_DOMAIN").unwrap_or_else(|_| format!("{}.r2.dev", bucket));
        Ok(format!("https://{}/{}", domain.trim_end_matches('/'), key))
    }

    /// Stores the object and returns its public URL.
    pub async fn upload(&self, upload: ImageUpload) -> Result<String> {
        let bucket = self.bucket_name()?;

        self.get_client()
            .put_object()
            .bucket(bucket)
            .key(&upload.key)
            .body(aws_sdk_s3::primitives::ByteStream::from(upload.data))
            .content_type(upload.content_type)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to upload image to R2: {}", e))?;

        tracing::debug!("[R2Client::upload] Uploaded {}", upload.key);
        self.public_url(&upload.key)
    }
}
