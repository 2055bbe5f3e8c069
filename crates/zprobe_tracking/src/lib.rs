//! Draw-call and clear tracking for depth-buffer provenance detection.
//!
//! - [`FrameStatsRegistry`]: per-stream draw statistics keyed by depth-stencil
//! - [`ClearCaptureStore`]: meaningful clears and their backup copies
//! - [`SelectionEngine`]: ranks candidates and picks the scene depth source
//! - [`DeviceTracker`]: lock-protected device-level state tying them together
//! - [`ResourceCopier`]: the GPU collaborator that creates and fills backups

pub mod backup_cache;
pub mod capture;
pub mod copier;
pub mod device;
pub mod registry;
pub mod selection;

pub use backup_cache::{AcquiredBackup, BackupCache};
pub use capture::{ClearCaptureStore, ClearRecord};
pub use copier::ResourceCopier;
pub use device::{DeviceState, DeviceTracker};
pub use registry::{DepthSourceInfo, DepthStencilEntry, FrameStatsRegistry};
pub use selection::{DepthSelection, SelectionEngine, SelectionKind};
