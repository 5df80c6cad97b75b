//! S3-compatible object storage
//!
//! The pipeline is synchronous, so [`S3Storage`] owns a current-thread tokio
//! runtime and blocks on each SDK call.

use crate::config::S3Settings;
use crate::errors::{BackupError, Result};
use aws_sdk_s3 as s3;
use s3::config::Region;
use s3::primitives::ByteStream;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;
use tracing::{debug, info};

const DESTINATION: &str = "S3";

/// Object storage operations used by the pipeline
pub trait ObjectStorage: Send + Sync {
    /// Upload `path` under `key` and return the object URL
    fn upload(&self, path: &Path, key: &str) -> Result<String>;

    /// Keys starting with `prefix`, in listing order
    fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Download `key` into `target`
    fn download(&self, key: &str, target: &Path) -> Result<PathBuf>;
}

/// Object key of `file_name` under the configured path
pub fn object_key(settings: &S3Settings, file_name: &str) -> String {
    if settings.path.is_empty() {
        file_name.to_string()
    } else {
        format!("{}/{}", settings.path, file_name)
    }
}

/// Public URL of an uploaded object
pub fn object_url(settings: &S3Settings, key: &str) -> String {
    format!(
        "{}/{}/{}",
        settings.storage_url.trim_end_matches('/'),
        settings.bucket_name,
        key
    )
}

pub struct S3Storage {
    settings: S3Settings,
    client: s3::Client,
    runtime: Runtime,
}

impl S3Storage {
    /// Build a client for the configured endpoint with static credentials
    pub fn connect(settings: S3Settings) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| BackupError::io("Failed to start async runtime", e))?;

        let sdk_config = runtime.block_on(
            aws_config::defaults(s3::config::BehaviorVersion::latest())
                .endpoint_url(&settings.storage_url)
                .region(Region::new(settings.region_name.clone()))
                .credentials_provider(s3::config::Credentials::new(
                    &settings.access_key_id,
                    &settings.secret_access_key,
                    None,
                    None,
                    "Static",
                ))
                .load(),
        );

        let s3_config = s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();
        let client = s3::Client::from_conf(s3_config);

        Ok(Self {
            settings,
            client,
            runtime,
        })
    }

    pub fn settings(&self) -> &S3Settings {
        &self.settings
    }
}

impl ObjectStorage for S3Storage {
    fn upload(&self, path: &Path, key: &str) -> Result<String> {
        let bucket = &self.settings.bucket_name;
        debug!("Executing request (upload) to S3: {} -> {}", path.display(), key);

        self.runtime.block_on(async {
            let body = ByteStream::from_path(path).await.map_err(|e| {
                BackupError::transfer_with(
                    DESTINATION,
                    format!("Couldn't read {}", path.display()),
                    e,
                )
            })?;

            self.client
                .put_object()
                .bucket(bucket)
                .key(key)
                .body(body)
                .send()
                .await
                .map_err(|e| {
                    BackupError::transfer_with(
                        DESTINATION,
                        format!("Couldn't upload {} to bucket {}", path.display(), bucket),
                        e,
                    )
                })?;

            Ok::<(), BackupError>(())
        })?;

        Ok(object_url(&self.settings, key))
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let bucket = &self.settings.bucket_name;

        self.runtime.block_on(async {
            let mut keys = Vec::new();
            let mut token: Option<String> = None;

            loop {
                let response = self
                    .client
                    .list_objects_v2()
                    .bucket(bucket)
                    .prefix(prefix)
                    .set_continuation_token(token.take())
                    .send()
                    .await
                    .map_err(|e| {
                        BackupError::transfer_with(
                            DESTINATION,
                            format!("Couldn't list objects with prefix {}", prefix),
                            e,
                        )
                    })?;

                keys.extend(
                    response
                        .contents()
                        .iter()
                        .filter_map(|object| object.key().map(String::from)),
                );

                match response.next_continuation_token() {
                    Some(next) if response.is_truncated() == Some(true) => {
                        token = Some(next.to_string())
                    }
                    _ => break,
                }
            }

            Ok::<Vec<String>, BackupError>(keys)
        })
    }

    fn download(&self, key: &str, target: &Path) -> Result<PathBuf> {
        let bucket = &self.settings.bucket_name;
        debug!("Executing request (download) from S3: {} -> {}", key, target.display());

        let downloaded = self.runtime.block_on(async {
            let mut object = self
                .client
                .get_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .map_err(|e| {
                    BackupError::transfer_with(
                        DESTINATION,
                        format!("Couldn't get object s3://{}/{}", bucket, key),
                        e,
                    )
                })?;

            let mut file = fs::File::create(target)
                .map_err(|e| BackupError::io(format!("Failed to create {}", target.display()), e))?;
            let mut total: usize = 0;

            while let Some(chunk) = object.body.try_next().await.map_err(|e| {
                BackupError::transfer_with(DESTINATION, format!("Couldn't read object {}", key), e)
            })? {
                file.write_all(&chunk).map_err(|e| {
                    BackupError::io(format!("Failed to write {}", target.display()), e)
                })?;
                total += chunk.len();
            }

            Ok::<usize, BackupError>(total)
        })?;

        info!("downloaded {} bytes from s3://{}/{}", downloaded, bucket, key);
        Ok(target.to_path_buf())
    }
}

/// In-memory storage for tests
/// Available for use in external test crates
#[allow(dead_code)]
pub mod mock {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    /// Recorded storage call
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum StorageCall {
        Upload { key: String },
        List { prefix: String },
        Download { key: String },
    }

    #[derive(Clone)]
    pub struct MockObjectStorage {
        settings: S3Settings,
        pub calls: Arc<Mutex<Vec<StorageCall>>>,
        pub objects: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
        fail_uploads: Arc<Mutex<bool>>,
    }

    impl MockObjectStorage {
        pub fn new(settings: S3Settings) -> Self {
            Self {
                settings,
                calls: Arc::new(Mutex::new(Vec::new())),
                objects: Arc::new(Mutex::new(BTreeMap::new())),
                fail_uploads: Arc::new(Mutex::new(false)),
            }
        }

        /// Make every upload fail with a transfer error
        pub fn failing_uploads(self) -> Self {
            *self.fail_uploads.lock().unwrap() = true;
            self
        }

        pub fn put(&self, key: &str, contents: &[u8]) {
            self.objects
                .lock()
                .unwrap()
                .insert(key.to_string(), contents.to_vec());
        }

        pub fn get_calls(&self) -> Vec<StorageCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn keys(&self) -> Vec<String> {
            self.objects.lock().unwrap().keys().cloned().collect()
        }

        pub fn object(&self, key: &str) -> Option<Vec<u8>> {
            self.objects.lock().unwrap().get(key).cloned()
        }
    }

    impl ObjectStorage for MockObjectStorage {
        fn upload(&self, path: &Path, key: &str) -> Result<String> {
            self.calls.lock().unwrap().push(StorageCall::Upload {
                key: key.to_string(),
            });

            if *self.fail_uploads.lock().unwrap() {
                return Err(BackupError::transfer(DESTINATION, "simulated upload failure"));
            }

            let contents = fs::read(path).map_err(|e| {
                BackupError::transfer_with(DESTINATION, format!("Couldn't read {}", path.display()), e)
            })?;
            self.put(key, &contents);
            Ok(object_url(&self.settings, key))
        }

        fn list(&self, prefix: &str) -> Result<Vec<String>> {
            self.calls.lock().unwrap().push(StorageCall::List {
                prefix: prefix.to_string(),
            });
            Ok(self
                .keys()
                .into_iter()
                .filter(|key| key.starts_with(prefix))
                .collect())
        }

        fn download(&self, key: &str, target: &Path) -> Result<PathBuf> {
            self.calls.lock().unwrap().push(StorageCall::Download {
                key: key.to_string(),
            });
            let contents = self
                .object(key)
                .ok_or_else(|| BackupError::transfer(DESTINATION, format!("NoSuchKey: {}", key)))?;
            fs::write(target, contents)
                .map_err(|e| BackupError::io(format!("Failed to write {}", target.display()), e))?;
            Ok(target.to_path_buf())
        }
    }
}
