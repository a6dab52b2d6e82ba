//! In-memory blob storage recording every call in order.

use super::readers::TrackedReader;
use async_trait::async_trait;
use clamflow_services::{BlobStorage, ObjectStream, StorageBackend, StorageError, StorageResult};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageCall {
    Get { bucket: String, key: String },
    Copy { src: String, dest: String, key: String },
    Delete { bucket: String, key: String },
}

#[derive(Default)]
pub struct MockBlobStorage {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    calls: Mutex<Vec<StorageCall>>,
    released: Arc<AtomicUsize>,
    fail_copy: Mutex<bool>,
    fail_delete: Mutex<bool>,
}

impl MockBlobStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(self, bucket: &str, key: &str, data: &[u8]) -> Self {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), data.to_vec());
        self
    }

    pub fn failing_copy(self) -> Self {
        *self.fail_copy.lock().unwrap() = true;
        self
    }

    pub fn failing_delete(self) -> Self {
        *self.fail_delete.lock().unwrap() = true;
        self
    }

    pub fn calls(&self) -> Vec<StorageCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.objects
            .lock()
            .unwrap()
            .contains_key(&(bucket.to_string(), key.to_string()))
    }

    /// Number of object streams dropped so far.
    pub fn streams_released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    fn record(&self, call: StorageCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl BlobStorage for MockBlobStorage {
    async fn get_stream_with_size(&self, bucket: &str, key: &str) -> StorageResult<ObjectStream> {
        self.record(StorageCall::Get {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });

        let data = self
            .objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("{}/{}", bucket, key)))?;

        let size = data.len() as u64;
        let reader = TrackedReader::new(Cursor::new(data), self.released.clone());
        Ok(ObjectStream::new(Box::pin(reader), size))
    }

    async fn copy_object(
        &self,
        src_bucket: &str,
        dest_bucket: &str,
        key: &str,
    ) -> StorageResult<()> {
        self.record(StorageCall::Copy {
            src: src_bucket.to_string(),
            dest: dest_bucket.to_string(),
            key: key.to_string(),
        });

        if *self.fail_copy.lock().unwrap() {
            return Err(StorageError::CopyFailed("injected copy failure".to_string()));
        }

        let mut objects = self.objects.lock().unwrap();
        let data = objects
            .get(&(src_bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("{}/{}", src_bucket, key)))?;
        objects.insert((dest_bucket.to_string(), key.to_string()), data);
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        self.record(StorageCall::Delete {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });

        if *self.fail_delete.lock().unwrap() {
            return Err(StorageError::DeleteFailed(
                "injected delete failure".to_string(),
            ));
        }

        self.objects
            .lock()
            .unwrap()
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
