//! Backup Texture Cache
//!
//! One backup texture per distinct `(format, width, height)`. Backups survive
//! across frames so a game that clears the same depth buffer every frame
//! reuses a single allocation; textures whose key has not been written for
//! `backup_idle_frames` frames are destroyed on frame reset.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use zprobe_core::{BackupKey, CaptureError, ResourceId};

use crate::copier::ResourceCopier;

struct CachedBackup {
    texture: ResourceId,
    /// Clear index whose content the texture currently holds, if written this frame.
    written_by: Option<u32>,
    /// Frames since the texture was last written.
    idle_frames: u32,
}

/// Keyed cache of backup textures.
#[derive(Default)]
pub struct BackupCache {
    slots: FxHashMap<BackupKey, CachedBackup>,
}

/// Result of [`BackupCache::acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquiredBackup {
    pub texture: ResourceId,
    /// Clear index of an earlier copy this frame that the next write overwrites.
    pub overwrites: Option<u32>,
}

impl BackupCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the backup texture for `key`, creating it on a cache miss.
    pub fn acquire(
        &mut self,
        key: BackupKey,
        copier: &mut dyn ResourceCopier,
    ) -> Result<AcquiredBackup, CaptureError> {
        if let Some(slot) = self.slots.get(&key) {
            return Ok(AcquiredBackup {
                texture: slot.texture,
                overwrites: slot.written_by,
            });
        }

        let texture = copier.create_backup(key)?;
        log::debug!("Created backup texture {texture:?} for {key}");
        self.slots.insert(
            key,
            CachedBackup {
                texture,
                written_by: None,
                idle_frames: 0,
            },
        );

        Ok(AcquiredBackup {
            texture,
            overwrites: None,
        })
    }

    /// Marks the backup for `key` as holding the copy made at `clear_index`.
    pub fn mark_written(&mut self, key: BackupKey, clear_index: u32) {
        if let Some(slot) = self.slots.get_mut(&key) {
            slot.written_by = Some(clear_index);
            slot.idle_frames = 0;
        }
    }

    /// Advances the idle counters. Called once per frame boundary.
    pub fn end_frame(&mut self) {
        for slot in self.slots.values_mut() {
            if slot.written_by.take().is_none() {
                slot.idle_frames = slot.idle_frames.saturating_add(1);
            }
        }
    }

    /// Destroys backups idle for more than `max_idle_frames` frames.
    ///
    /// Returns the number of destroyed textures.
    pub fn trim(&mut self, max_idle_frames: u32, copier: &mut dyn ResourceCopier) -> usize {
        let expired: SmallVec<[BackupKey; 4]> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.idle_frames > max_idle_frames)
            .map(|(&key, _)| key)
            .collect();

        for key in &expired {
            if let Some(slot) = self.slots.remove(key) {
                copier.destroy_backup(slot.texture);
                log::debug!("Destroyed idle backup texture for {key}");
            }
        }
        expired.len()
    }

    /// Destroys every backup.
    pub fn release(&mut self, copier: &mut dyn ResourceCopier) {
        for (_, slot) in self.slots.drain() {
            copier.destroy_backup(slot.texture);
        }
    }

    #[must_use]
    pub fn contains_texture(&self, texture: ResourceId) -> bool {
        self.slots.values().any(|slot| slot.texture == texture)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
