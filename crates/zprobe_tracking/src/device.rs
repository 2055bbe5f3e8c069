//! Device Tracker
//!
//! Owns the device-level state shared by every command stream of one
//! graphics device: the immediate registry, the clear capture store and the
//! active [`DetectionSettings`].
//!
//! # Concurrency
//!
//! All state sits behind a single [`parking_lot::Mutex`]. Deferred recording
//! contexts accumulate into their own [`FrameStatsRegistry`] without locking
//! and only take the lock when a clear needs a device-unique clear index, or
//! when their registry is merged on submission.
//!
//! ```text
//!  thread A (immediate)        thread B (deferred)
//!  ─────────────────────       ─────────────────────────────
//!  on_bind / on_draw  ──lock─▶ registry_b.on_bind / on_draw   (no lock)
//!                              on_clear_deferred(&mut registry_b) ──lock─▶
//!  merge(&registry_b) ──lock─▶
//! ```

use parking_lot::{Mutex, MutexGuard};

use zprobe_core::{
    ClearFlags, DepthFormat, DetectionSettings, ResourceId, ResourceIdentity,
};

use crate::capture::ClearCaptureStore;
use crate::copier::ResourceCopier;
use crate::registry::FrameStatsRegistry;
use crate::selection::{DepthSelection, SelectionEngine};

/// Device-level tracking state. Obtained through [`DeviceTracker::lock`].
#[derive(Default)]
pub struct DeviceState {
    pub registry: FrameStatsRegistry,
    pub captures: ClearCaptureStore,
    pub settings: DetectionSettings,
}

/// Thread-safe entry point for one tracked device.
#[derive(Default)]
pub struct DeviceTracker {
    state: Mutex<DeviceState>,
}

impl DeviceTracker {
    #[must_use]
    pub fn new(settings: DetectionSettings) -> Self {
        if let Err(e) = settings.validate() {
            log::warn!("{e}");
        }
        Self {
            state: Mutex::new(DeviceState {
                settings,
                ..Default::default()
            }),
        }
    }

    /// Locks the device state for a batch of operations or a debug listing.
    pub fn lock(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock()
    }

    // ── Settings ───────────────────────────────────────────────────────────

    #[must_use]
    pub fn settings(&self) -> DetectionSettings {
        self.state.lock().settings.clone()
    }

    /// Replaces the settings. Takes effect for the next event.
    pub fn set_settings(&self, settings: DetectionSettings) {
        if let Err(e) = settings.validate() {
            log::warn!("{e}");
        }
        log::info!("Depth detection settings updated: {settings:?}");
        self.state.lock().settings = settings;
    }

    // ── Frame boundary ─────────────────────────────────────────────────────

    /// Starts a new frame. Called on present.
    pub fn begin_frame(
        &self,
        default_width: u32,
        default_height: u32,
        default_format: DepthFormat,
        copier: &mut dyn ResourceCopier,
    ) {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        state
            .registry
            .reset(default_width, default_height, default_format);
        state.registry.prune_stale(state.settings.stale_entry_frames);
        state.captures.reset(&state.settings, copier);
    }

    /// Drops all tracking state and destroys every backup texture.
    pub fn release(&self, copier: &mut dyn ResourceCopier) {
        let mut guard = self.state.lock();
        guard.registry.release();
        guard.captures.release(copier);
        log::debug!("Released depth tracking state");
    }

    // ── Immediate stream ───────────────────────────────────────────────────

    pub fn on_bind_render_targets(
        &self,
        render_targets: &[ResourceId],
        depth_stencil: Option<ResourceIdentity>,
    ) {
        self.state
            .lock()
            .registry
            .on_bind_render_targets(render_targets, depth_stencil);
    }

    pub fn on_draw(&self, vertices: u64) {
        self.state.lock().registry.on_draw(vertices);
    }

    /// Clear on the immediate stream. See [`ClearCaptureStore::on_clear`].
    pub fn on_clear(
        &self,
        depth_stencil: ResourceIdentity,
        flags: ClearFlags,
        copier: &mut dyn ResourceCopier,
    ) -> Option<u32> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.captures.on_clear(
            &mut state.registry,
            depth_stencil,
            flags,
            &state.settings,
            copier,
        )
    }

    // ── Deferred streams ───────────────────────────────────────────────────

    /// Clear recorded into a deferred context.
    ///
    /// Statistics are read from and reset in `registry`; the clear index is
    /// drawn from the device counter so indices stay unique per frame.
    /// Indices follow recording order, not execution order.
    pub fn on_clear_deferred(
        &self,
        registry: &mut FrameStatsRegistry,
        depth_stencil: ResourceIdentity,
        flags: ClearFlags,
        copier: &mut dyn ResourceCopier,
    ) -> Option<u32> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let mut counter = state.registry.clear_index_counter();
        let index = state.captures.on_clear_shared(
            registry,
            &mut counter,
            depth_stencil,
            flags,
            &state.settings,
            copier,
        );
        state.registry.set_clear_index_counter(counter);
        index
    }

    /// Folds a deferred context's registry into the device registry.
    pub fn merge(&self, other: &FrameStatsRegistry) {
        self.state.lock().registry.merge(other);
    }

    // ── Lifetime ───────────────────────────────────────────────────────────

    pub fn on_resource_destroyed(&self, id: ResourceId) {
        let mut guard = self.state.lock();
        guard.registry.on_resource_destroyed(id);
        guard.captures.on_resource_destroyed(id);
    }

    // ── Selection ──────────────────────────────────────────────────────────

    #[must_use]
    pub fn find_best_depth_texture(
        &self,
        target_width: u32,
        target_height: u32,
        override_id: Option<ResourceId>,
    ) -> ResourceId {
        self.select(target_width, target_height, override_id).resource
    }

    #[must_use]
    pub fn select(
        &self,
        target_width: u32,
        target_height: u32,
        override_id: Option<ResourceId>,
    ) -> DepthSelection {
        let state = self.state.lock();
        SelectionEngine::new(&state.settings).select(
            &state.registry,
            &state.captures,
            target_width,
            target_height,
            override_id,
        )
    }
}
