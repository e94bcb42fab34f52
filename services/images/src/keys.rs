//! Storage key and public URL composition.
//!
//! Key format: `Proyecto_Grupo5/{token}.jpg`. The extension is fixed whatever
//! the uploaded bytes actually encode, and stored URLs depend on it.

use uuid::Uuid;

/// Logical folder holding every uploaded image
pub const IMAGE_FOLDER: &str = "Proyecto_Grupo5";

/// Extension appended to every object key
pub const IMAGE_EXTENSION: &str = "jpg";

/// Source of globally unique tokens for object keys
#[cfg_attr(test, mockall::automock)]
pub trait TokenGenerator: Send + Sync {
    fn next_token(&self) -> String;
}

/// Random UUID v4 tokens
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidTokens;

impl TokenGenerator for UuidTokens {
    fn next_token(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Object key for a freshly generated token
pub fn storage_key(token: &str) -> String {
    format!("{IMAGE_FOLDER}/{token}.{IMAGE_EXTENSION}")
}

/// Virtual-hosted style URL of an object. Reachability is never checked.
pub fn public_url(bucket: &str, region: &str, key: &str) -> String {
    format!("https://{bucket}.s3.{region}.amazonaws.com/{key}")
}
