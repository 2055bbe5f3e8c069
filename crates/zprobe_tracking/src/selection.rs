//! Depth Source Selection
//!
//! Picks the resource whose content most likely is the scene's main depth
//! buffer. Selection is a pure query over a [`FrameStatsRegistry`] and a
//! [`ClearCaptureStore`]; calling it repeatedly without intervening events
//! yields the same result.
//!
//! # Order of precedence
//!
//! 1. An explicit override, if it names a tracked resource or backup.
//! 2. Clear-capture mode: the backup of the pinned clear, else the latest
//!    backup that passes the aspect-ratio test.
//! 3. Heuristic mode: the highest-scoring tracked resource.
//! 4. The default depth buffer.
//!
//! # Heuristic score
//!
//! ```text
//! score = weight × (1.2 − drawcalls / global_drawcalls)
//! ```
//!
//! `weight` is the frame's vertex count, or its draw-call count once indirect
//! draws have been observed. The second factor penalizes a resource that
//! receives nearly every draw call of the frame, which is typical of
//! full-screen helper passes rather than scene geometry. Ties favor the most
//! recently bound resource.

use std::cmp::Ordering;

use zprobe_core::{DetectionSettings, DrawStats, ResourceDesc, ResourceId};

use crate::capture::ClearCaptureStore;
use crate::registry::FrameStatsRegistry;

/// Why a resource was selected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionKind {
    /// The caller's override named an existing resource.
    Override,
    /// A backup made before clear `clear_index` of `source`.
    ClearBackup { clear_index: u32, source: ResourceId },
    /// A live tracked resource ranked by the heuristic.
    Heuristic { score: f64 },
    /// Nothing suitable; the default depth buffer.
    Default,
}

/// Result of a selection query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthSelection {
    pub resource: ResourceId,
    pub desc: ResourceDesc,
    pub kind: SelectionKind,
}

/// Stateless selection over borrowed settings.
#[derive(Debug, Clone, Copy)]
pub struct SelectionEngine<'a> {
    settings: &'a DetectionSettings,
}

impl<'a> SelectionEngine<'a> {
    #[must_use]
    pub fn new(settings: &'a DetectionSettings) -> Self {
        Self { settings }
    }

    /// Returns the best depth source for an effect target of the given size.
    ///
    /// Never fails; falls back to the default depth buffer.
    #[must_use]
    pub fn find_best_depth_texture(
        &self,
        registry: &FrameStatsRegistry,
        captures: &ClearCaptureStore,
        target_width: u32,
        target_height: u32,
        override_id: Option<ResourceId>,
    ) -> ResourceId {
        self.select(registry, captures, target_width, target_height, override_id)
            .resource
    }

    /// Like [`find_best_depth_texture`](Self::find_best_depth_texture), but
    /// also reports why the resource was chosen.
    #[must_use]
    pub fn select(
        &self,
        registry: &FrameStatsRegistry,
        captures: &ClearCaptureStore,
        target_width: u32,
        target_height: u32,
        override_id: Option<ResourceId>,
    ) -> DepthSelection {
        if let Some(id) = override_id {
            if let Some(selection) = Self::resolve_override(registry, captures, id) {
                return selection;
            }
            log::warn!("Depth override {id:?} is not tracked, falling back to default");
            return Self::default_selection(registry);
        }

        let best = if self.settings.clear_capture_active() {
            self.select_backup(captures, target_width, target_height)
        } else {
            self.select_heuristic(registry, target_width, target_height)
        };

        best.unwrap_or_else(|| Self::default_selection(registry))
    }

    /// Heuristic score of `stats` against the frame totals.
    #[must_use]
    pub fn score(stats: DrawStats, global: DrawStats, indirect: bool) -> f64 {
        let share = if global.drawcalls == 0 {
            0.0
        } else {
            stats.drawcalls as f64 / global.drawcalls as f64
        };
        stats.weight(indirect) as f64 * (1.2 - share)
    }

    // ─── Modes ────────────────────────────────────────────────────────────────

    fn resolve_override(
        registry: &FrameStatsRegistry,
        captures: &ClearCaptureStore,
        id: ResourceId,
    ) -> Option<DepthSelection> {
        if let Some(entry) = registry.entry(id) {
            return Some(DepthSelection {
                resource: id,
                desc: *entry.desc(),
                kind: SelectionKind::Override,
            });
        }

        if captures.is_backup(id) {
            let desc = captures
                .record_for_backup(id)
                .map(|record| record.source_desc)
                .unwrap_or_default();
            return Some(DepthSelection {
                resource: id,
                desc,
                kind: SelectionKind::Override,
            });
        }

        None
    }

    fn select_backup(
        &self,
        captures: &ClearCaptureStore,
        target_width: u32,
        target_height: u32,
    ) -> Option<DepthSelection> {
        let pinned = self
            .settings
            .target_clear_index()
            .and_then(|index| captures.find_backup(index))
            .filter(|record| record.has_backup());

        let record = pinned.or_else(|| {
            captures.records().rev().find(|record| {
                record.has_backup()
                    && (!self.settings.use_aspect_ratio_filter
                        || record.source_desc.fits_target(target_width, target_height))
            })
        })?;

        let resource = record.backup?;
        Some(DepthSelection {
            resource,
            desc: record.source_desc,
            kind: SelectionKind::ClearBackup {
                clear_index: record.clear_index,
                source: record.source,
            },
        })
    }

    fn select_heuristic(
        &self,
        registry: &FrameStatsRegistry,
        target_width: u32,
        target_height: u32,
    ) -> Option<DepthSelection> {
        let filter = self.settings.format_filter();
        let global = registry.global_stats();
        let indirect = registry.has_indirect_draws();

        let mut best: Option<(f64, u64, ResourceId, ResourceDesc)> = None;

        for (id, entry) in registry.entries() {
            let desc = entry.desc();
            if entry.total_stats().drawcalls == 0
                || desc.is_multisampled()
                || !filter.allows(desc.format)
            {
                continue;
            }
            if self.settings.use_aspect_ratio_filter && !desc.fits_target(target_width, target_height)
            {
                continue;
            }

            let score = Self::score(entry.frame_stats(), global, indirect);
            let candidate = (score, entry.last_bound(), id, *desc);

            let better = best.as_ref().is_none_or(|current| {
                match candidate.0.total_cmp(&current.0) {
                    Ordering::Greater => true,
                    Ordering::Less => false,
                    Ordering::Equal => (candidate.1, candidate.2) > (current.1, current.2),
                }
            });
            if better {
                best = Some(candidate);
            }
        }

        best.map(|(score, _, resource, desc)| DepthSelection {
            resource,
            desc,
            kind: SelectionKind::Heuristic { score },
        })
    }

    fn default_selection(registry: &FrameStatsRegistry) -> DepthSelection {
        let resource = ResourceId::default_depth();
        DepthSelection {
            resource,
            desc: registry
                .entry(resource)
                .map(|entry| *entry.desc())
                .unwrap_or_default(),
            kind: SelectionKind::Default,
        }
    }
}
