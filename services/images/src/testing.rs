//! In-memory stores for exercising the pipeline and router without AWS or MySQL.

use crate::keys::{public_url, TokenGenerator};
use crate::object_store::ObjectStore;
use crate::record_store::RecordStore;
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub struct MemoryObjectStore {
    bucket: String,
    region: String,
    objects: Mutex<Vec<(String, Vec<u8>)>>,
    fail: bool,
}

impl MemoryObjectStore {
    pub fn new(bucket: &str, region: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            region: region.to_string(),
            objects: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new("images-bucket", "us-east-1")
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().iter().any(|(k, _)| k == key)
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, body: Vec<u8>) -> Result<String> {
        if self.fail {
            bail!("AccessDenied: write refused");
        }
        self.objects.lock().unwrap().push((key.to_string(), body));
        Ok(public_url(&self.bucket, &self.region, key))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: u64,
    pub image_url: String,
    pub service_id: i64,
    pub service_type: i64,
}

pub struct MemoryRecordStore {
    rows: Mutex<Vec<Row>>,
    fail: bool,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn seed(&self, image_url: &str, service_id: i64, service_type: i64) -> u64 {
        let mut rows = self.rows.lock().unwrap();
        let id = rows.len() as u64 + 1;
        rows.push(Row {
            id,
            image_url: image_url.to_string(),
            service_id,
            service_type,
        });
        id
    }

    pub fn rows(&self) -> Vec<Row> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert(&self, image_url: &str, service_id: i64, service_type: i64) -> Result<u64> {
        if self.fail {
            bail!("Lost connection to MySQL server during query");
        }
        Ok(self.seed(image_url, service_id, service_type))
    }

    async fn query_by_key(&self, service_id: i64, service_type: i64) -> Result<Vec<String>> {
        if self.fail {
            bail!("Lost connection to MySQL server during query");
        }
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|row| row.service_id == service_id && row.service_type == service_type)
            .map(|row| row.image_url.clone())
            .collect())
    }

    async fn ping(&self) -> Result<()> {
        if self.fail {
            bail!("Can't connect to MySQL server");
        }
        Ok(())
    }
}

/// `tok-1`, `tok-2`, ...
#[derive(Default)]
pub struct SequentialTokens(AtomicUsize);

impl TokenGenerator for SequentialTokens {
    fn next_token(&self) -> String {
        format!("tok-{}", self.0.fetch_add(1, Ordering::SeqCst) + 1)
    }
}
