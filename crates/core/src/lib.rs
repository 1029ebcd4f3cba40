//! Core domain types and shared logic for the satchel file transfer service.
//!
//! This crate defines the canonical model used across all other crates:
//! - Sealed-blob encryption and per-file capability keys
//! - Server-assigned file identifiers
//! - Transfer response payloads and size presentation
//! - Application configuration

pub mod config;
pub mod crypto;
pub mod error;
pub mod transfer;

pub use config::{AppConfig, MetadataConfig, RetentionConfig, ServerConfig};
pub use crypto::{generate_id, open, seal, SecretKey, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use error::{Error, Result};
pub use transfer::{human_size, CompletedUpload, FileInfo};
