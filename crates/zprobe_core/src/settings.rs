//! Detection Settings
//!
//! [`DetectionSettings`] holds every tunable that influences tracking and
//! selection. It is a plain value: the host loads it from (and saves it to)
//! whatever configuration store it uses, hands it to the device tracker once,
//! and replaces it when the user edits it in a debug UI.
//!
//! # Fields
//!
//! | Field                      | Description                                      | Default |
//! |----------------------------|--------------------------------------------------|---------|
//! | `preserve_depth_buffers`   | Copy depth before clears that destroy depth      | `false` |
//! | `preserve_stencil_buffers` | Copy depth before clears that destroy stencil    | `false` |
//! | `clear_index_override`     | `0` = best fit, `n` = pin the n-th clear         | `0`     |
//! | `use_aspect_ratio_filter`  | Reject candidates that do not match the target   | `true`  |
//! | `depth_format_filter`      | `0` = any, `1..=4` = one typeless family         | `0`     |
//! | `extended_detection`       | Keep every meaningful clear visible              | `false` |
//! | `stale_entry_frames`       | Prune entries untouched for this many frames     | `120`   |
//! | `backup_idle_frames`       | Destroy backups unused for this many frames      | `30`    |
//!
//! # Example
//!
//! ```rust,ignore
//! use zprobe_core::DetectionSettings;
//!
//! let settings = DetectionSettings {
//!     preserve_depth_buffers: true,
//!     clear_index_override: 2,
//!     ..Default::default()
//! };
//! settings.validate()?;
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{Result, ZprobeError};
use crate::format::FormatFilter;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    /// Enables clear-capture for clears that destroy the depth channel.
    pub preserve_depth_buffers: bool,

    /// Enables clear-capture for clears that destroy the stencil channel.
    pub preserve_stencil_buffers: bool,

    /// Frame-local clear occurrence to pin. `0` selects automatically.
    pub clear_index_override: u32,

    /// Enables the aspect-ratio rejection test in both selection modes.
    pub use_aspect_ratio_filter: bool,

    /// Index into [`FormatFilter::FAMILIES`], offset by one. See [`FormatFilter::from_index`].
    pub depth_format_filter: u32,

    /// Records clears of multisampled or filtered sources too, and never
    /// prunes trailing records from the debug enumeration.
    ///
    /// When disabled, clears of those sources consume no clear index, so
    /// toggling this flag renumbers the later clears of a frame and a pinned
    /// `clear_index_override` may then name a different clear.
    pub extended_detection: bool,

    /// Entries not touched for this many frames are pruned on reset. `0` disables pruning.
    pub stale_entry_frames: u32,

    /// Backup textures unused for this many frames are destroyed on reset. `0` disables trimming.
    pub backup_idle_frames: u32,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            preserve_depth_buffers: false,
            preserve_stencil_buffers: false,
            clear_index_override: 0,
            use_aspect_ratio_filter: true,
            depth_format_filter: 0,
            extended_detection: false,
            stale_entry_frames: 120,
            backup_idle_frames: 30,
        }
    }
}

impl DetectionSettings {
    /// Returns `true` when selection works from clear-time backups.
    #[inline]
    #[must_use]
    pub fn clear_capture_active(&self) -> bool {
        self.preserve_depth_buffers || self.preserve_stencil_buffers
    }

    #[inline]
    #[must_use]
    pub fn format_filter(&self) -> FormatFilter {
        FormatFilter::from_index(self.depth_format_filter)
    }

    /// The pinned clear index, if any.
    #[inline]
    #[must_use]
    pub fn target_clear_index(&self) -> Option<u32> {
        (self.clear_index_override != 0).then_some(self.clear_index_override)
    }

    /// Rejects combinations that cannot have an effect.
    ///
    /// A pinned clear index without clear-capture enabled is almost always a
    /// configuration mistake: the index would be silently ignored.
    pub fn validate(&self) -> Result<()> {
        if self.clear_index_override != 0 && !self.clear_capture_active() {
            return Err(ZprobeError::InvalidSettings(format!(
                "clear_index_override = {} requires preserve_depth_buffers or preserve_stencil_buffers",
                self.clear_index_override
            )));
        }
        Ok(())
    }
}
