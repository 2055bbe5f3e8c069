//! Core types shared by every zprobe crate.
//!
//! - [`DrawStats`]: vertex / draw-call counter pair
//! - [`ResourceId`], [`ResourceDesc`], [`ResourceIdentity`]: arena keys for
//!   physical GPU resources plus their cached attributes
//! - [`DepthFormat`], [`FormatFilter`]: typeless depth format families
//! - [`ClearFlags`]: channels destroyed by a clear
//! - [`DetectionSettings`]: tracking and selection configuration
//! - [`errors`]: collaborator and host-facing error types

pub mod clear;
pub mod errors;
pub mod format;
pub mod resource;
pub mod settings;
pub mod stats;

pub use clear::ClearFlags;
pub use errors::{CaptureError, Result, ZprobeError};
pub use format::{DepthFormat, FormatFilter};
pub use resource::{BackupKey, ResourceDesc, ResourceId, ResourceIdentity};
pub use settings::DetectionSettings;
pub use stats::DrawStats;
