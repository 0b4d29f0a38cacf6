//! S3 transport.
//!
//! Built on the AWS SDK. Credentials come from the SDK's default provider
//! chain (environment, shared profile, web identity, ECS, instance metadata)
//! unless static keys are configured. With an endpoint override the bucket is
//! addressed path style, for S3-compatible stores and local test servers.

use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, Region, RequestChecksumCalculation};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::primitives::ByteStream;
use pickem_core::{PickemState, StateStore, StoreError, codec};
use secrecy::ExposeSecret;
use tracing::{debug, error, instrument};

use crate::config::S3Config;

/// Provider name reported for credentials taken from the bot's own config.
const STATIC_CREDENTIALS_PROVIDER: &str = "pickem-config";

/// State stored as a single S3 object.
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
    key: String,
}

impl S3Store {
    /// A store for `s3://{bucket}/{key}` using an existing SDK client.
    #[must_use]
    pub const fn new(client: Client, bucket: String, key: String) -> Self {
        Self {
            client,
            bucket,
            key,
        }
    }

    /// Build an SDK client from `config` and return a store for the object.
    pub async fn connect(config: &S3Config, bucket: String, key: String) -> Self {
        Self::new(sdk_client(config).await, bucket, key)
    }

    fn location(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }
}

/// Resolve the SDK configuration for `config`.
async fn sdk_client(config: &S3Config) -> Client {
    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));

    if let Some(credentials) = &config.credentials {
        loader = loader.credentials_provider(Credentials::new(
            credentials.access_key_id.clone(),
            credentials.secret_access_key.expose_secret().to_string(),
            credentials
                .session_token
                .as_ref()
                .map(|token| token.expose_secret().to_string()),
            None,
            STATIC_CREDENTIALS_PROVIDER,
        ));
    }
    if let Some(endpoint) = &config.endpoint {
        loader = loader.endpoint_url(endpoint.as_str().trim_end_matches('/'));
    }

    let shared = loader.load().await;
    let mut s3 = aws_sdk_s3::config::Builder::from(&shared);
    if config.endpoint.is_some() {
        // S3-compatible stores often reject the SDK's optional checksums.
        s3 = s3
            .force_path_style(true)
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired);
    }
    Client::from_conf(s3.build())
}

impl StateStore for S3Store {
    #[instrument(skip(self), fields(bucket = %self.bucket, key = %self.key))]
    async fn load(&self) -> Result<PickemState, StoreError> {
        let not_readable = |reason: String| StoreError::NotReadable {
            location: self.location(),
            reason,
        };

        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) => {
                let missing = err
                    .as_service_error()
                    .is_some_and(GetObjectError::is_no_such_key)
                    || err
                        .raw_response()
                        .is_some_and(|response| response.status().as_u16() == 404);
                if missing {
                    debug!("State object does not exist yet");
                    return Ok(PickemState::new());
                }

                let reason = DisplayErrorContext(&err).to_string();
                error!(error = %reason, "S3 GetObject failed");
                return Err(not_readable(reason));
            }
        };

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| not_readable(e.to_string()))?
            .into_bytes();
        debug!(bytes = bytes.len(), "Fetched state object");

        codec::decode(&bytes).map_err(|source| StoreError::Malformed {
            location: self.location(),
            source,
        })
    }

    #[instrument(skip(self, state), fields(bucket = %self.bucket, key = %self.key))]
    async fn save(&self, state: &PickemState) -> Result<(), StoreError> {
        let write_failed = |reason: String| StoreError::WriteFailed {
            location: self.location(),
            reason,
        };

        let bytes = codec::encode(state).map_err(|e| write_failed(e.to_string()))?;
        let len = bytes.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .content_type("application/json")
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|err| {
                let reason = DisplayErrorContext(&err).to_string();
                error!(error = %reason, "S3 PutObject failed");
                write_failed(reason)
            })?;

        debug!(bytes = len, "Stored state object");
        Ok(())
    }
}
