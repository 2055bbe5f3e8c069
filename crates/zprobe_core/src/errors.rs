//! Error Types
//!
//! Tracking itself never fails: every degraded condition resolves to a safe
//! default (no backup, default identity, zeroed stats). Errors only exist at
//! two boundaries:
//!
//! - [`CaptureError`] is returned by the GPU collaborator that creates and
//!   fills backup textures. The capture store logs it and records the clear
//!   without a backup.
//! - [`ZprobeError`] is returned by host-facing calls such as
//!   [`DetectionSettings::validate`](crate::DetectionSettings::validate).

use thiserror::Error;

use crate::format::DepthFormat;
use crate::resource::{BackupKey, ResourceId};

/// Failure of the backup-texture collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The backend could not allocate a backup texture.
    #[error("Failed to create backup texture ({key}): {reason}")]
    BackupCreateFailed {
        /// Format and size that were requested
        key: BackupKey,
        /// Backend-specific failure description
        reason: String,
    },

    /// The copy command could not be recorded.
    #[error("Failed to copy {resource:?} into backup texture: {reason}")]
    CopyFailed {
        /// Depth-stencil resource that was being copied
        resource: ResourceId,
        /// Backend-specific failure description
        reason: String,
    },

    /// The collaborator does not know the resource (already destroyed or never registered).
    #[error("Unknown resource: {0:?}")]
    UnknownResource(ResourceId),

    /// The depth format has no backend equivalent for a backup texture.
    #[error("Unsupported backup format: {0:?}")]
    UnsupportedFormat(DepthFormat),
}

/// Host-facing error type.
#[derive(Error, Debug)]
pub enum ZprobeError {
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    /// Settings combination that cannot take effect.
    #[error("Invalid detection settings: {0}")]
    InvalidSettings(String),
}

/// Alias for `Result<T, ZprobeError>`.
pub type Result<T> = std::result::Result<T, ZprobeError>;
