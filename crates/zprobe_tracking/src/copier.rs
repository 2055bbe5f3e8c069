//! GPU Collaborator
//!
//! The tracking core never talks to a graphics API. Whenever a clear is about
//! to destroy a depth buffer worth keeping, [`ClearCaptureStore`](crate::ClearCaptureStore)
//! asks a [`ResourceCopier`] to allocate backup storage and record a
//! full-resource copy into it.
//!
//! Backup textures live in the same key space as application resources: the
//! copier allocates their [`ResourceId`] from the arena that also holds the
//! application's textures, so a selection result can name either kind.

use zprobe_core::{BackupKey, CaptureError, ResourceId};

/// Creates, fills and destroys backup textures on behalf of the capture store.
pub trait ResourceCopier {
    /// Allocates a depth texture with the given format and size.
    ///
    /// The texture must be usable both as a copy destination and as a shader
    /// resource.
    fn create_backup(&mut self, key: BackupKey) -> Result<ResourceId, CaptureError>;

    /// Records a full-resource copy of `source` into `backup`.
    fn copy_resource(&mut self, source: ResourceId, backup: ResourceId) -> Result<(), CaptureError>;

    /// Destroys a texture previously returned by [`create_backup`](Self::create_backup).
    fn destroy_backup(&mut self, backup: ResourceId);
}
