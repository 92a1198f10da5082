//! # pushwatch-transfer
//!
//! Protocol-polymorphic upload pipeline.
//!
//! [`Uploader::upload`] mirrors one local file onto the server named by a
//! [`RemoteConfig`](pushwatch_core::RemoteConfig), opening a fresh FTP or
//! SFTP session for that single upload.

pub mod ensure;
pub mod error;
pub mod ftp;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod session;
pub mod sftp;
pub mod uploader;

pub use error::UploadError;
pub use session::{ProtocolSessionFactory, RemoteSession, SessionFactory};
pub use uploader::{UploadOutcome, Uploader};
