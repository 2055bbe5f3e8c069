//! # zprobe
//!
//! Depth-buffer provenance detection for intercepted graphics API streams.
//!
//! A post-processing layer injected into a game needs the scene's depth
//! buffer, but the game never says which of its depth-stencil resources that
//! is. zprobe watches bind, draw, clear and present events, accumulates draw
//! statistics per depth-stencil, optionally copies depth content right before
//! destructive clears, and picks the most plausible source on request.
//!
//! # Crates
//!
//! | Crate             | Contents                                                        |
//! |-------------------|-----------------------------------------------------------------|
//! | `zprobe_core`     | Stats, identities, formats, clear flags, settings, errors       |
//! | `zprobe_tracking` | Registry, clear capture, selection and the device tracker       |
//! | `zprobe_hooks`    | Backend adapters for Direct3D 11, OpenGL and Vulkan             |
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use zprobe::prelude::*;
//! use zprobe::hooks::d3d11::{D3d11, D3D11_CLEAR_DEPTH};
//!
//! let tracker = Arc::new(DeviceTracker::new(DetectionSettings::default()));
//! let mut adapter = HookAdapter::<D3d11>::new(Arc::clone(&tracker));
//!
//! adapter.om_set_render_targets(&[backbuffer], Some(scene_depth));
//! adapter.draw_vertices(36_000);
//! adapter.clear_depth_stencil_view(scene_depth, D3D11_CLEAR_DEPTH, &mut device);
//!
//! let depth = adapter.find_best_depth_texture(1920, 1080, None);
//! adapter.present(1920, 1080, 0, &mut device);
//! ```

pub use zprobe_core as core;
pub use zprobe_hooks as hooks;
pub use zprobe_tracking as tracking;

pub use zprobe_core::{
    BackupKey, CaptureError, ClearFlags, DepthFormat, DetectionSettings, DrawStats,
    FormatFilter, ResourceDesc, ResourceId, ResourceIdentity, Result, ZprobeError,
};
pub use zprobe_hooks::{Backend, HookAdapter, NativeDevice, NativeTextureDesc};
pub use zprobe_tracking::{
    ClearCaptureStore, ClearRecord, DepthSelection, DeviceTracker, FrameStatsRegistry,
    ResourceCopier, SelectionEngine, SelectionKind,
};

/// Commonly used types.
pub mod prelude {
    pub use zprobe_core::{
        ClearFlags, DepthFormat, DetectionSettings, DrawStats, ResourceDesc, ResourceId,
        ResourceIdentity,
    };
    pub use zprobe_hooks::{HookAdapter, NativeDevice};
    pub use zprobe_tracking::{DeviceTracker, FrameStatsRegistry, ResourceCopier};
}
