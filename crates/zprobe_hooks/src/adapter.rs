//! Hook Adapter
//!
//! [`HookAdapter`] sits between an intercepted graphics API and the tracking
//! core. It owns the resource arena that maps native handles to
//! [`ResourceId`] keys, translates native values through its [`Backend`],
//! and forwards every event to the shared [`DeviceTracker`].
//!
//! # Arena
//!
//! | Slot kind     | Inserted by                        | Removed by                      |
//! |---------------|------------------------------------|---------------------------------|
//! | `Application` | [`register`](HookAdapter::register) or first bind | [`destroy`](HookAdapter::destroy) |
//! | `Backup`      | the capture store, on a cache miss | backup trimming or release      |
//!
//! Backups share the arena with application textures so a selection result
//! always resolves back to a native handle through [`HookAdapter::native`].
//!
//! # Streams
//!
//! Immediate-context events (`bind`, `draw`, `clear`) update the device
//! registry directly. Deferred recordings (D3D11 deferred contexts, Vulkan
//! command buffers) accumulate into a caller-owned [`FrameStatsRegistry`]
//! through the `record_*` methods and are folded in with [`HookAdapter::submit`].

use std::marker::PhantomData;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use smallvec::SmallVec;

use zprobe_core::{BackupKey, CaptureError, ResourceDesc, ResourceId, ResourceIdentity};
use zprobe_tracking::{
    DepthSelection, DeviceTracker, FrameStatsRegistry, ResourceCopier, SelectionKind,
};

use crate::backend::{Backend, NativeDevice, NativeTextureDesc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotKind {
    Application,
    Backup,
}

#[derive(Debug, Clone, Copy)]
struct NativeSlot<H> {
    handle: H,
    desc: ResourceDesc,
    kind: SlotKind,
}

/// Translates native events of one device into tracking calls.
pub struct HookAdapter<B: Backend> {
    tracker: Arc<DeviceTracker>,
    arena: SlotMap<ResourceId, NativeSlot<B::Handle>>,
    by_handle: FxHashMap<B::Handle, ResourceId>,
    default_desc: ResourceDesc,
    /// Depth-stencil of the most recent immediate bind, for APIs whose clear
    /// targets the current binding.
    bound_depth_stencil: Option<B::Handle>,
    _backend: PhantomData<B>,
}

impl<B: Backend> HookAdapter<B> {
    #[must_use]
    pub fn new(tracker: Arc<DeviceTracker>) -> Self {
        Self {
            tracker,
            arena: SlotMap::with_key(),
            by_handle: FxHashMap::default(),
            default_desc: ResourceDesc::default(),
            bound_depth_stencil: None,
            _backend: PhantomData,
        }
    }

    #[inline]
    #[must_use]
    pub fn tracker(&self) -> &Arc<DeviceTracker> {
        &self.tracker
    }

    // ─── Resource Lifetime ────────────────────────────────────────────────────

    /// Registers a native texture.
    ///
    /// Registering a known handle again keeps its key and replaces the cached
    /// description (storage redefinition, or a render target first seen
    /// without attributes).
    pub fn register(&mut self, handle: B::Handle, desc: NativeTextureDesc) -> ResourceIdentity {
        let desc = desc.to_desc::<B>();

        if B::default_depth_handle() == Some(handle) {
            return ResourceIdentity::new(ResourceId::default_depth(), self.default_desc);
        }
        if let Some(&id) = self.by_handle.get(&handle)
            && let Some(slot) = self.arena.get_mut(id)
        {
            slot.desc = desc;
            return ResourceIdentity::new(id, desc);
        }

        let id = self.arena.insert(NativeSlot {
            handle,
            desc,
            kind: SlotKind::Application,
        });
        self.by_handle.insert(handle, id);
        log::trace!("[{}] Registered {handle:?} as {id:?}", B::NAME);
        ResourceIdentity::new(id, desc)
    }

    /// Forgets a destroyed native texture.
    pub fn destroy(&mut self, handle: B::Handle) {
        let Some(id) = self.by_handle.remove(&handle) else {
            return;
        };
        self.arena.remove(id);
        self.tracker.on_resource_destroyed(id);
        if self.bound_depth_stencil == Some(handle) {
            self.bound_depth_stencil = None;
        }
    }

    /// Identity of a native handle, if it is known.
    #[must_use]
    pub fn identity(&self, handle: B::Handle) -> Option<ResourceIdentity> {
        if B::default_depth_handle() == Some(handle) {
            return Some(ResourceIdentity::new(
                ResourceId::default_depth(),
                self.default_desc,
            ));
        }
        let id = *self.by_handle.get(&handle)?;
        self.identity_of(id)
    }

    /// Identity of an arena key, if it is still alive.
    #[must_use]
    pub fn identity_of(&self, id: ResourceId) -> Option<ResourceIdentity> {
        if id.is_default_depth() {
            return Some(ResourceIdentity::new(id, self.default_desc));
        }
        self.arena
            .get(id)
            .map(|slot| ResourceIdentity::new(id, slot.desc))
    }

    /// Resolves an arena key back to its native handle.
    #[must_use]
    pub fn native(&self, id: ResourceId) -> Option<B::Handle> {
        if id.is_default_depth() {
            return B::default_depth_handle();
        }
        self.arena.get(id).map(|slot| slot.handle)
    }

    /// Returns `true` if `id` names a backup texture created by the capture store.
    #[must_use]
    pub fn is_backup(&self, id: ResourceId) -> bool {
        self.arena
            .get(id)
            .is_some_and(|slot| slot.kind == SlotKind::Backup)
    }

    fn target_id(&mut self, handle: B::Handle) -> ResourceId {
        match self.identity(handle) {
            Some(identity) => identity.id,
            None => self.register(handle, NativeTextureDesc::new(0, 0, 0)).id,
        }
    }

    fn depth_identity(&self, handle: Option<B::Handle>) -> Option<ResourceIdentity> {
        let handle = handle?;
        let identity = self.identity(handle);
        if identity.is_none() {
            log::warn!("[{}] Unregistered depth-stencil {handle:?}", B::NAME);
        }
        identity
    }

    fn target_ids(&mut self, render_targets: &[B::Handle]) -> SmallVec<[ResourceId; 8]> {
        render_targets
            .iter()
            .map(|&handle| self.target_id(handle))
            .collect()
    }

    // ─── Frame ────────────────────────────────────────────────────────────────

    /// Frame boundary. `native_format` is the default depth buffer's format code.
    pub fn present<D: NativeDevice<B>>(
        &mut self,
        width: u32,
        height: u32,
        native_format: u32,
        device: &mut D,
    ) {
        self.default_desc = ResourceDesc::new(width, height, B::depth_format(native_format));
        let mut copier = ArenaCopier::<B, D> {
            arena: &mut self.arena,
            device,
        };
        self.tracker.begin_frame(
            width,
            height,
            self.default_desc.format,
            &mut copier,
        );
    }

    /// Drops all tracking state and destroys every backup texture.
    pub fn release<D: NativeDevice<B>>(&mut self, device: &mut D) {
        let mut copier = ArenaCopier::<B, D> {
            arena: &mut self.arena,
            device,
        };
        self.tracker.release(&mut copier);
        self.bound_depth_stencil = None;
    }

    // ─── Immediate Stream ─────────────────────────────────────────────────────

    pub fn bind(&mut self, render_targets: &[B::Handle], depth_stencil: Option<B::Handle>) {
        let targets = self.target_ids(render_targets);
        let identity = self.depth_identity(depth_stencil);
        self.bound_depth_stencil = identity.and(depth_stencil);
        self.tracker.on_bind_render_targets(&targets, identity);
    }

    #[inline]
    pub fn draw(&self, vertices: u64) {
        self.tracker.on_draw(vertices);
    }

    /// Clears `depth_stencil`. `native_flags` is the API's clear mask.
    pub fn clear<D: NativeDevice<B>>(
        &mut self,
        depth_stencil: B::Handle,
        native_flags: u32,
        device: &mut D,
    ) -> Option<u32> {
        let identity = self.depth_identity(Some(depth_stencil))?;
        let mut copier = ArenaCopier::<B, D> {
            arena: &mut self.arena,
            device,
        };
        self.tracker
            .on_clear(identity, B::clear_flags(native_flags), &mut copier)
    }

    /// Clears whatever depth-stencil the last immediate bind attached.
    pub fn clear_bound<D: NativeDevice<B>>(
        &mut self,
        native_flags: u32,
        device: &mut D,
    ) -> Option<u32> {
        let handle = self.bound_depth_stencil?;
        self.clear(handle, native_flags, device)
    }

    // ─── Deferred Streams ─────────────────────────────────────────────────────

    pub fn record_bind(
        &mut self,
        stream: &mut FrameStatsRegistry,
        render_targets: &[B::Handle],
        depth_stencil: Option<B::Handle>,
    ) {
        let targets = self.target_ids(render_targets);
        let identity = self.depth_identity(depth_stencil);
        stream.on_bind_render_targets(&targets, identity);
    }

    pub fn record_clear<D: NativeDevice<B>>(
        &mut self,
        stream: &mut FrameStatsRegistry,
        depth_stencil: B::Handle,
        native_flags: u32,
        device: &mut D,
    ) -> Option<u32> {
        let identity = self.depth_identity(Some(depth_stencil))?;
        self.record_clear_identity(stream, identity, native_flags, device)
    }

    /// Clears the depth-stencil currently bound in `stream`.
    pub fn record_clear_bound<D: NativeDevice<B>>(
        &mut self,
        stream: &mut FrameStatsRegistry,
        native_flags: u32,
        device: &mut D,
    ) -> Option<u32> {
        let identity = self.identity_of(stream.bound_depth_stencil()?)?;
        self.record_clear_identity(stream, identity, native_flags, device)
    }

    fn record_clear_identity<D: NativeDevice<B>>(
        &mut self,
        stream: &mut FrameStatsRegistry,
        identity: ResourceIdentity,
        native_flags: u32,
        device: &mut D,
    ) -> Option<u32> {
        let mut copier = ArenaCopier::<B, D> {
            arena: &mut self.arena,
            device,
        };
        self.tracker.on_clear_deferred(
            stream,
            identity,
            B::clear_flags(native_flags),
            &mut copier,
        )
    }

    /// Folds a finished deferred recording into the device statistics.
    pub fn submit(&self, stream: &FrameStatsRegistry) {
        self.tracker.merge(stream);
    }

    // ─── Selection ────────────────────────────────────────────────────────────

    #[must_use]
    pub fn select(
        &self,
        target_width: u32,
        target_height: u32,
        override_handle: Option<B::Handle>,
    ) -> DepthSelection {
        let override_id = match override_handle {
            Some(handle) => match self.identity(handle) {
                Some(identity) => Some(identity.id),
                None => {
                    log::warn!("[{}] Depth override {handle:?} is not registered", B::NAME);
                    return DepthSelection {
                        resource: ResourceId::default_depth(),
                        desc: self.default_desc,
                        kind: SelectionKind::Default,
                    };
                }
            },
            None => None,
        };
        self.tracker.select(target_width, target_height, override_id)
    }

    /// Native handle of the best depth source.
    ///
    /// `None` means the default depth buffer on APIs without a handle for it.
    #[must_use]
    pub fn find_best_depth_texture(
        &self,
        target_width: u32,
        target_height: u32,
        override_handle: Option<B::Handle>,
    ) -> Option<B::Handle> {
        self.native(self.select(target_width, target_height, override_handle).resource)
    }
}

// ─── Backup Copier ────────────────────────────────────────────────────────────

/// Bridges the capture store to a [`NativeDevice`], allocating backup keys
/// from the adapter's arena.
struct ArenaCopier<'a, B: Backend, D: ?Sized> {
    arena: &'a mut SlotMap<ResourceId, NativeSlot<B::Handle>>,
    device: &'a mut D,
}

impl<B: Backend, D: NativeDevice<B> + ?Sized> ArenaCopier<'_, B, D> {
    fn handle(&self, id: ResourceId) -> Result<B::Handle, CaptureError> {
        if id.is_default_depth() {
            return B::default_depth_handle().ok_or(CaptureError::UnknownResource(id));
        }
        self.arena
            .get(id)
            .map(|slot| slot.handle)
            .ok_or(CaptureError::UnknownResource(id))
    }
}

impl<B: Backend, D: NativeDevice<B> + ?Sized> ResourceCopier for ArenaCopier<'_, B, D> {
    fn create_backup(&mut self, key: BackupKey) -> Result<ResourceId, CaptureError> {
        if !key.format.is_known() {
            return Err(CaptureError::UnsupportedFormat(key.format));
        }

        let handle = self
            .device
            .create_texture(key)
            .map_err(|reason| CaptureError::BackupCreateFailed { key, reason })?;

        Ok(self.arena.insert(NativeSlot {
            handle,
            desc: ResourceDesc::new(key.width, key.height, key.format),
            kind: SlotKind::Backup,
        }))
    }

    fn copy_resource(&mut self, source: ResourceId, backup: ResourceId) -> Result<(), CaptureError> {
        let source_handle = self.handle(source)?;
        let backup_handle = self.handle(backup)?;
        self.device
            .copy_texture(source_handle, backup_handle)
            .map_err(|reason| CaptureError::CopyFailed {
                resource: source,
                reason,
            })
    }

    fn destroy_backup(&mut self, backup: ResourceId) {
        match self.arena.get(backup) {
            Some(slot) if slot.kind == SlotKind::Backup => {
                let handle = slot.handle;
                self.arena.remove(backup);
                self.device.destroy_texture(handle);
            }
            _ => log::warn!("[{}] Refusing to destroy non-backup {backup:?}", B::NAME),
        }
    }
}
