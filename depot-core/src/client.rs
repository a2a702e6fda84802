use aws_sdk_s3::Client;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object store rejected credentials for {target}: {detail}")]
    Auth { target: String, detail: String },
    #[error("object store unreachable for {target}: {detail}")]
    Connectivity { target: String, detail: String },
    #[error("object not found: {target}")]
    NotFound { target: String },
    #[error("listing entry {key} carries no entity tag")]
    MissingFingerprint { key: String },
    #[error("unexpected object store response for {target}: {detail}")]
    Unexpected { target: String, detail: String },
}

/// One object from a listing. `fingerprint` is the store's entity tag with
/// surrounding quotes stripped; equality means unchanged content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub path: String,
    pub fingerprint: String,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub endpoint: String,
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub access_key_secret: String,
}

pub struct StoreClient {
    client: Client,
    bucket: String,
}

impl StoreClient {
    pub fn new(config: StoreConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key_id,
            config.access_key_secret,
            None,
            None,
            "depot-config",
        );
        // Path-style addressing keeps custom endpoints working without
        // per-bucket DNS; retries stay off so failures surface to the caller.
        let sdk_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region))
            .endpoint_url(config.endpoint)
            .credentials_provider(credentials)
            .force_path_style(true)
            .retry_config(RetryConfig::disabled())
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket,
        }
    }

    pub async fn list(&self, namespace: &str) -> Result<Vec<RemoteEntry>, StoreError> {
        let mut entries = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(namespace);
            if let Some(token) = continuation_token.take() {
                request = request.continuation_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|err| classify(err, namespace))?;

            for object in response.contents() {
                let Some(key) = object.key() else {
                    continue;
                };
                let fingerprint =
                    object
                        .e_tag()
                        .ok_or_else(|| StoreError::MissingFingerprint {
                            key: key.to_string(),
                        })?;
                entries.push(RemoteEntry {
                    name: object_name(key).to_string(),
                    path: key.to_string(),
                    fingerprint: normalize_fingerprint(fingerprint),
                });
            }

            match response.next_continuation_token() {
                Some(token) => continuation_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(entries)
    }

    pub async fn fetch(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|err| classify(err, path))?;

        let body = response
            .body
            .collect()
            .await
            .map_err(|err| StoreError::Connectivity {
                target: path.to_string(),
                detail: err.to_string(),
            })?;

        Ok(body.into_bytes().to_vec())
    }
}

fn object_name(key: &str) -> &str {
    key.rsplit_once('/').map_or(key, |(_, name)| name)
}

fn normalize_fingerprint(etag: &str) -> String {
    etag.trim_matches('"').to_string()
}

fn classify<E>(err: SdkError<E>, target: &str) -> StoreError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let target = target.to_string();
    let detail = DisplayErrorContext(&err).to_string();
    match &err {
        SdkError::ServiceError(context) => match context.raw().status().as_u16() {
            401 | 403 => StoreError::Auth { target, detail },
            404 => StoreError::NotFound { target },
            status if status >= 500 => StoreError::Connectivity { target, detail },
            _ => StoreError::Unexpected { target, detail },
        },
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) | SdkError::ResponseError(_) => {
            StoreError::Connectivity { target, detail }
        }
        _ => StoreError::Unexpected { target, detail },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_name_is_last_key_segment() {
        assert_eq!(object_name("global/server.jar"), "server.jar");
        assert_eq!(object_name("global/nested/config.yml"), "config.yml");
        assert_eq!(object_name("plain.txt"), "plain.txt");
    }

    #[test]
    fn directory_placeholder_keys_derive_empty_names() {
        assert_eq!(object_name("global/"), "");
    }

    #[test]
    fn normalize_fingerprint_strips_surrounding_quotes() {
        assert_eq!(normalize_fingerprint("\"abc123\""), "abc123");
        assert_eq!(normalize_fingerprint("abc123"), "abc123");
    }
}
