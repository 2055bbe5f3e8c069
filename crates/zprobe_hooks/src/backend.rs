//! Backend Abstraction
//!
//! Each intercepted graphics API provides two things:
//!
//! - A [`Backend`] marker type: the native handle type plus the translation
//!   of native clear masks and depth formats into core values.
//! - A [`NativeDevice`] implementation supplied by the hook layer: the thin
//!   wrapper around the real device that allocates, copies and frees backup
//!   textures.

use std::fmt::Debug;
use std::hash::Hash;

use zprobe_core::{BackupKey, ClearFlags, DepthFormat, ResourceDesc};

pub trait Backend: 'static {
    /// Native handle of a texture, image or attachment.
    type Handle: Copy + Eq + Hash + Debug;

    /// Name used in log messages.
    const NAME: &'static str;

    /// Translates a native clear mask into the cleared channels.
    fn clear_flags(native: u32) -> ClearFlags;

    /// Translates a native format code into its typeless depth family.
    fn depth_format(native: u32) -> DepthFormat;

    /// Handle that stands for the implicit default depth buffer, if the API has one.
    fn default_depth_handle() -> Option<Self::Handle> {
        None
    }
}

/// Native attributes of a texture at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeTextureDesc {
    pub width: u32,
    pub height: u32,
    pub sample_count: u32,
    /// Native format code (`DXGI_FORMAT`, GL internal format or `VkFormat`).
    pub format: u32,
}

impl NativeTextureDesc {
    #[must_use]
    pub const fn new(width: u32, height: u32, format: u32) -> Self {
        Self {
            width,
            height,
            sample_count: 1,
            format,
        }
    }

    #[must_use]
    pub const fn with_samples(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count;
        self
    }

    /// Converts to a core description using the backend's format table.
    #[must_use]
    pub fn to_desc<B: Backend>(&self) -> ResourceDesc {
        ResourceDesc::new(self.width, self.height, B::depth_format(self.format))
            .with_samples(self.sample_count.max(1))
    }
}

/// Device operations needed to maintain backup textures.
///
/// Errors are plain descriptions; the adapter wraps them into
/// [`CaptureError`](zprobe_core::CaptureError) values.
pub trait NativeDevice<B: Backend> {
    fn create_texture(&mut self, key: BackupKey) -> Result<B::Handle, String>;

    fn copy_texture(&mut self, source: B::Handle, destination: B::Handle) -> Result<(), String>;

    fn destroy_texture(&mut self, texture: B::Handle);
}
