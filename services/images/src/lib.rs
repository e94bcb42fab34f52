//! Image Attachment Service
//!
//! Attaches images to records identified by `(serviceId, serviceType)` for
//! clients that cannot talk to object storage themselves. An upload carries
//! a base64 data-URL; the decoded bytes go to S3 and the public URL is
//! indexed in MySQL, where it can be looked up by the same identifier pair.
//!
//! ## Endpoints
//!
//! - `GET /`: constant greeting
//! - `POST /upload`: store an image, `201` with the record id and URL
//! - `POST /getImage`: all URLs stored for an identifier pair
//! - `GET /health`, `GET /ready`: liveness and readiness checks
//!
//! ## Architecture
//!
//! ```text
//!   HTTP (axum)              S3 Bucket                  MySQL
//! ┌──────────────┐        ┌──────────────────┐      ┌──────────────┐
//! │ /upload      │        │ Proyecto_Grupo5/ │      │ Imagen       │
//! │ /getImage    │        │   {token}.jpg    │      └──────────────┘
//! └──────────────┘        └──────────────────┘             ▲
//!        │                         ▲                       │
//!        ▼                         │                       │
//! ┌──────────────┐        ┌──────────────────┐             │
//! │ Image        │───────▶│ Object Store     │             │
//! │ Service      │        └──────────────────┘             │
//! │              │        ┌──────────────────┐             │
//! │              │───────▶│ Record Store     │─────────────┘
//! └──────────────┘        └──────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod keys;
pub mod object_store;
pub mod pipeline;
pub mod record_store;

#[cfg(test)]
mod testing;

pub use api::{create_router, start_api_server, AppState};
pub use config::Config;
pub use error::ImageError;
pub use keys::{TokenGenerator, UuidTokens};
pub use object_store::{ObjectStore, S3ObjectStore};
pub use pipeline::{ImageService, ImageSubmission, LookupKey, UploadOutcome};
pub use record_store::{MySqlRecordStore, RecordStore};
