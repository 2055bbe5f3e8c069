//! Clear-Time Capture
//!
//! Many renderers clear their main depth buffer several times per frame (for
//! instance once for the scene and once again for a first-person weapon or UI
//! pass). By the time the frame is presented the interesting content is gone,
//! so with clear-capture enabled the scene depth is copied into a backup
//! texture right before the clear that destroys it.
//!
//! # Clear indices
//!
//! Every *meaningful* clear (one that follows at least one draw into the
//! cleared resource since its previous clear) consumes the next frame-local
//! clear index, starting at 1. Clears of empty buffers are ignored and do
//! not shift later indices.
//!
//! # Which clear is copied
//!
//! | `clear_index_override` | Copied clear                                          |
//! |------------------------|-------------------------------------------------------|
//! | `0` (best effort)      | Each clear whose pre-clear weight beats the best copy |
//! | `n`                    | Exactly the n-th meaningful clear                     |
//!
//! Clears that share a backup texture overwrite it; the overwritten record
//! loses its backup reference so it is never selected with foreign content.

use std::collections::BTreeMap;

use zprobe_core::{
    BackupKey, ClearFlags, DetectionSettings, DrawStats, ResourceDesc, ResourceId,
    ResourceIdentity,
};

use crate::backup_cache::BackupCache;
use crate::copier::ResourceCopier;
use crate::registry::FrameStatsRegistry;

/// One meaningful clear observed this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearRecord {
    pub clear_index: u32,
    /// The depth-stencil resource that was cleared.
    pub source: ResourceId,
    /// Attributes of `source` at clear time.
    pub source_desc: ResourceDesc,
    /// Draws into `source` since its previous clear.
    pub stats_at_clear: DrawStats,
    /// Backup texture holding the pre-clear content, if one was made and not overwritten.
    pub backup: Option<ResourceId>,
}

impl ClearRecord {
    #[inline]
    #[must_use]
    pub fn has_backup(&self) -> bool {
        self.backup.is_some()
    }
}

/// Per-frame list of meaningful clears plus the backup textures that outlive it.
#[derive(Default)]
pub struct ClearCaptureStore {
    records: BTreeMap<u32, ClearRecord>,
    /// Stats of the heaviest workload copied this frame in best-effort mode.
    best_copy_stats: Option<DrawStats>,
    backups: BackupCache,
}

impl ClearCaptureStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ── Events ─────────────────────────────────────────────────────────────

    /// Handles a depth-stencil clear on the stream tracked by `registry`.
    ///
    /// Returns the assigned clear index, or `None` when the clear was not
    /// recorded (capture disabled for the cleared channels, filtered source,
    /// or nothing drawn since the previous clear).
    pub fn on_clear(
        &mut self,
        registry: &mut FrameStatsRegistry,
        depth_stencil: ResourceIdentity,
        flags: ClearFlags,
        settings: &DetectionSettings,
        copier: &mut dyn ResourceCopier,
    ) -> Option<u32> {
        let mut counter = registry.clear_index_counter();
        let index = self.on_clear_shared(
            registry,
            &mut counter,
            depth_stencil,
            flags,
            settings,
            copier,
        );
        registry.set_clear_index_counter(counter);
        index
    }

    /// Handles a clear whose statistics live in `registry` but whose clear
    /// index comes from a counter owned elsewhere.
    ///
    /// Deferred recording contexts keep their own registry while clear
    /// indices stay unique across the whole device frame.
    pub fn on_clear_shared(
        &mut self,
        registry: &mut FrameStatsRegistry,
        clear_index_counter: &mut u32,
        depth_stencil: ResourceIdentity,
        flags: ClearFlags,
        settings: &DetectionSettings,
        copier: &mut dyn ResourceCopier,
    ) -> Option<u32> {
        if !flags.touches_preserved(
            settings.preserve_depth_buffers,
            settings.preserve_stencil_buffers,
        ) {
            return None;
        }

        let desc = depth_stencil.desc;
        if !settings.extended_detection
            && (desc.is_multisampled() || !settings.format_filter().allows(desc.format))
        {
            return None;
        }

        let indirect = registry.has_indirect_draws();
        let current = registry.entry_mut(depth_stencil).current_stats();
        if current.is_empty() {
            return None;
        }

        *clear_index_counter += 1;
        let clear_index = *clear_index_counter;

        let wants_copy = !desc.is_multisampled()
            && match settings.target_clear_index() {
                Some(target) => clear_index == target,
                None => self
                    .best_copy_stats
                    .is_none_or(|best| current.weight(indirect) > best.weight(indirect)),
            };

        let backup = if wants_copy {
            self.copy_into_backup(depth_stencil, clear_index, current, copier)
        } else {
            None
        };

        self.records.insert(
            clear_index,
            ClearRecord {
                clear_index,
                source: depth_stencil.id,
                source_desc: desc,
                stats_at_clear: current,
                backup,
            },
        );
        registry.finish_clear(depth_stencil.id, clear_index);

        Some(clear_index)
    }

    fn copy_into_backup(
        &mut self,
        source: ResourceIdentity,
        clear_index: u32,
        stats: DrawStats,
        copier: &mut dyn ResourceCopier,
    ) -> Option<ResourceId> {
        let key = BackupKey::of(&source.desc);

        let acquired = match self.backups.acquire(key, copier) {
            Ok(acquired) => acquired,
            Err(e) => {
                log::warn!("Clear {clear_index}: {e}");
                return None;
            }
        };

        if let Err(e) = copier.copy_resource(source.id, acquired.texture) {
            log::warn!("Clear {clear_index}: {e}");
            return None;
        }

        if let Some(previous) = acquired.overwrites
            && let Some(record) = self.records.get_mut(&previous)
        {
            record.backup = None;
        }

        self.backups.mark_written(key, clear_index);
        self.best_copy_stats = Some(stats);
        Some(acquired.texture)
    }

    /// Starts a new frame: drops this frame's records and trims idle backups.
    pub fn reset(&mut self, settings: &DetectionSettings, copier: &mut dyn ResourceCopier) {
        self.records.clear();
        self.best_copy_stats = None;
        self.backups.end_frame();

        if settings.backup_idle_frames != 0 {
            self.backups.trim(settings.backup_idle_frames, copier);
        }
    }

    /// Drops all records and destroys every backup texture.
    pub fn release(&mut self, copier: &mut dyn ResourceCopier) {
        self.records.clear();
        self.best_copy_stats = None;
        self.backups.release(copier);
    }

    /// Drops the records of a destroyed source resource.
    pub fn on_resource_destroyed(&mut self, id: ResourceId) {
        self.records.retain(|_, record| record.source != id);
    }

    // ── Queries ────────────────────────────────────────────────────────────

    /// Looks up the record for a clear index.
    #[must_use]
    pub fn find_backup(&self, clear_index: u32) -> Option<&ClearRecord> {
        self.records.get(&clear_index)
    }

    /// Every record of this frame, ordered by clear index.
    pub fn records(&self) -> impl DoubleEndedIterator<Item = &ClearRecord> + Clone {
        self.records.values()
    }

    /// Records of one source resource, ordered by clear index.
    ///
    /// The iterator is lazy and cloneable; calling this again restarts the
    /// enumeration.
    pub fn all_records(&self, source: ResourceId) -> impl Iterator<Item = &ClearRecord> + Clone {
        self.records
            .values()
            .filter(move |record| record.source == source)
    }

    /// Records shown in a debug listing.
    ///
    /// Without extended detection, trailing records after the last one that
    /// still holds a backup are hidden: they only describe clears of buffers
    /// that were never worth copying.
    pub fn visible_records<'a>(
        &'a self,
        settings: &DetectionSettings,
    ) -> impl Iterator<Item = &'a ClearRecord> + Clone + use<'a> {
        let last_visible = if settings.extended_detection {
            u32::MAX
        } else {
            self.records
                .values()
                .rev()
                .find(|record| record.has_backup())
                .map_or(0, |record| record.clear_index)
        };

        self.records
            .values()
            .take_while(move |record| record.clear_index <= last_visible)
    }

    #[must_use]
    pub fn is_backup(&self, id: ResourceId) -> bool {
        self.backups.contains_texture(id)
    }

    /// Record whose backup is `backup`, if that texture currently holds a copy.
    #[must_use]
    pub fn record_for_backup(&self, backup: ResourceId) -> Option<&ClearRecord> {
        self.records
            .values()
            .find(|record| record.backup == Some(backup))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn backup_count(&self) -> usize {
        self.backups.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;
    use zprobe_core::{CaptureError, DepthFormat};

    #[derive(Default)]
    struct RecordingCopier {
        arena: SlotMap<ResourceId, ()>,
        copies: Vec<(ResourceId, ResourceId)>,
        fail_copies: bool,
    }

    impl RecordingCopier {
        fn resource(&mut self) -> ResourceId {
            self.arena.insert(())
        }
    }

    impl ResourceCopier for RecordingCopier {
        fn create_backup(&mut self, _: BackupKey) -> Result<ResourceId, CaptureError> {
            Ok(self.arena.insert(()))
        }

        fn copy_resource(&mut self, source: ResourceId, backup: ResourceId) -> Result<(), CaptureError> {
            if self.fail_copies {
                return Err(CaptureError::CopyFailed {
                    resource: source,
                    reason: "device lost".into(),
                });
            }
            self.copies.push((source, backup));
            Ok(())
        }

        fn destroy_backup(&mut self, backup: ResourceId) {
            self.arena.remove(backup);
        }
    }

    fn capture_settings() -> DetectionSettings {
        DetectionSettings {
            preserve_depth_buffers: true,
            ..Default::default()
        }
    }

    fn setup() -> (FrameStatsRegistry, ClearCaptureStore, RecordingCopier) {
        let mut registry = FrameStatsRegistry::new();
        registry.reset(1920, 1080, DepthFormat::D24S8);
        (registry, ClearCaptureStore::new(), RecordingCopier::default())
    }

    fn draw_into(registry: &mut FrameStatsRegistry, ds: ResourceIdentity, draws: u64, vertices: u64) {
        registry.on_bind_render_targets(&[], Some(ds));
        for _ in 0..draws {
            registry.on_draw(vertices);
        }
    }

    #[test]
    fn empty_clear_consumes_no_index() {
        let (mut registry, mut store, mut copier) = setup();
        let ds = ResourceIdentity::new(copier.resource(), ResourceDesc::new(1920, 1080, DepthFormat::D32));
        registry.on_bind_render_targets(&[], Some(ds));

        let index = store.on_clear(&mut registry, ds, ClearFlags::DEPTH, &capture_settings(), &mut copier);
        assert_eq!(index, None);
        assert_eq!(registry.clear_index_counter(), 0);
    }

    #[test]
    fn stencil_only_clear_ignored_when_only_depth_preserved() {
        let (mut registry, mut store, mut copier) = setup();
        let ds = ResourceIdentity::new(copier.resource(), ResourceDesc::new(1920, 1080, DepthFormat::D24S8));
        draw_into(&mut registry, ds, 3, 30);

        let index = store.on_clear(&mut registry, ds, ClearFlags::STENCIL, &capture_settings(), &mut copier);
        assert_eq!(index, None);
        assert_eq!(registry.entry(ds.id).unwrap().current_stats(), DrawStats::new(90, 3));
    }

    #[test]
    fn multisampled_source_skipped_without_extended_detection() {
        let (mut registry, mut store, mut copier) = setup();
        let desc = ResourceDesc::new(1920, 1080, DepthFormat::D32).with_samples(4);
        let ds = ResourceIdentity::new(copier.resource(), desc);
        draw_into(&mut registry, ds, 2, 30);

        let settings = capture_settings();
        assert_eq!(store.on_clear(&mut registry, ds, ClearFlags::DEPTH, &settings, &mut copier), None);

        let extended = DetectionSettings {
            extended_detection: true,
            ..settings
        };
        assert_eq!(store.on_clear(&mut registry, ds, ClearFlags::DEPTH, &extended, &mut copier), Some(1));
        assert!(!store.find_backup(1).unwrap().has_backup());
        assert!(copier.copies.is_empty());
    }

    #[test]
    fn skipped_sources_do_not_consume_clear_indices() {
        let (mut registry, mut store, mut copier) = setup();
        let msaa = ResourceIdentity::new(
            copier.resource(),
            ResourceDesc::new(1920, 1080, DepthFormat::D32).with_samples(4),
        );
        let scene = ResourceIdentity::new(copier.resource(), ResourceDesc::new(1920, 1080, DepthFormat::D32));
        let settings = capture_settings();

        draw_into(&mut registry, msaa, 2, 30);
        assert_eq!(store.on_clear(&mut registry, msaa, ClearFlags::DEPTH, &settings, &mut copier), None);
        draw_into(&mut registry, scene, 2, 30);
        assert_eq!(store.on_clear(&mut registry, scene, ClearFlags::DEPTH, &settings, &mut copier), Some(1));

        registry.reset(1920, 1080, DepthFormat::D24S8);
        store.reset(&settings, &mut copier);
        let extended = DetectionSettings {
            extended_detection: true,
            ..settings
        };

        draw_into(&mut registry, msaa, 2, 30);
        assert_eq!(store.on_clear(&mut registry, msaa, ClearFlags::DEPTH, &extended, &mut copier), Some(1));
        draw_into(&mut registry, scene, 2, 30);
        assert_eq!(store.on_clear(&mut registry, scene, ClearFlags::DEPTH, &extended, &mut copier), Some(2));
    }

    #[test]
    fn failed_copy_records_clear_without_backup() {
        let (mut registry, mut store, mut copier) = setup();
        copier.fail_copies = true;
        let ds = ResourceIdentity::new(copier.resource(), ResourceDesc::new(1920, 1080, DepthFormat::D32));
        draw_into(&mut registry, ds, 1, 3);

        let index = store.on_clear(&mut registry, ds, ClearFlags::DEPTH, &capture_settings(), &mut copier);
        assert_eq!(index, Some(1));
        assert_eq!(store.find_backup(1).unwrap().backup, None);
    }

    #[test]
    fn later_copy_into_shared_backup_invalidates_earlier_record() {
        let (mut registry, mut store, mut copier) = setup();
        let desc = ResourceDesc::new(1920, 1080, DepthFormat::D32);
        let ds = ResourceIdentity::new(copier.resource(), desc);
        let settings = capture_settings();

        draw_into(&mut registry, ds, 1, 100);
        store.on_clear(&mut registry, ds, ClearFlags::DEPTH, &settings, &mut copier);
        draw_into(&mut registry, ds, 1, 500);
        store.on_clear(&mut registry, ds, ClearFlags::DEPTH, &settings, &mut copier);

        assert_eq!(store.find_backup(1).unwrap().backup, None);
        assert!(store.find_backup(2).unwrap().has_backup());
        assert_eq!(store.backup_count(), 1);
    }

    #[test]
    fn visible_records_hide_trailing_uncopied_clears() {
        let (mut registry, mut store, mut copier) = setup();
        let ds = ResourceIdentity::new(copier.resource(), ResourceDesc::new(1920, 1080, DepthFormat::D32));
        let settings = capture_settings();

        draw_into(&mut registry, ds, 10, 100);
        store.on_clear(&mut registry, ds, ClearFlags::DEPTH, &settings, &mut copier);
        draw_into(&mut registry, ds, 1, 3);
        store.on_clear(&mut registry, ds, ClearFlags::DEPTH, &settings, &mut copier);

        let visible: Vec<u32> = store.visible_records(&settings).map(|r| r.clear_index).collect();
        assert_eq!(visible, vec![1]);

        let extended = DetectionSettings {
            extended_detection: true,
            ..settings
        };
        assert_eq!(store.visible_records(&extended).count(), 2);
    }

    #[test]
    fn reset_drops_records_but_keeps_backups() {
        let (mut registry, mut store, mut copier) = setup();
        let ds = ResourceIdentity::new(copier.resource(), ResourceDesc::new(1920, 1080, DepthFormat::D32));
        let settings = capture_settings();
        draw_into(&mut registry, ds, 1, 3);
        store.on_clear(&mut registry, ds, ClearFlags::DEPTH, &settings, &mut copier);

        store.reset(&settings, &mut copier);
        assert!(store.is_empty());
        assert_eq!(store.backup_count(), 1);

        store.release(&mut copier);
        assert_eq!(store.backup_count(), 0);
    }
}
