//! Frame Statistics Registry
//!
//! Accumulates draw statistics per depth-stencil resource. One registry exists
//! per command stream: the device-level (immediate) registry owned by
//! [`DeviceTracker`](crate::DeviceTracker), plus one per deferred recording
//! context that is folded in with [`FrameStatsRegistry::merge`] when the
//! recording is submitted.
//!
//! # Windows
//!
//! ```text
//!  total_stats    ──────────────────────────────────────────────▶ until release()
//!  frame_stats    ─────────────────────▶ reset()  ──────────────▶
//!  current_stats  ────▶ clear ───▶ clear ──▶ reset() ──▶ clear ─▶
//! ```
//!
//! - `total_stats` spans the whole tracking session.
//! - `frame_stats` spans the current frame and is what selection scores
//!   against the frame's `global_stats`.
//! - `current_stats` restarts at every recorded clear and drives the
//!   clear-capture decision.
//!
//! Entries survive across frames so cached attributes and long-run statistics
//! are kept; stale entries are removed by [`FrameStatsRegistry::on_resource_destroyed`]
//! or by [`FrameStatsRegistry::prune_stale`].

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use zprobe_core::{DepthFormat, DrawStats, ResourceDesc, ResourceId, ResourceIdentity};

// ─── Entries ──────────────────────────────────────────────────────────────────

/// Statistics accumulated for one depth-stencil resource.
#[derive(Debug, Clone, Default)]
pub struct DepthStencilEntry {
    desc: ResourceDesc,
    total_stats: DrawStats,
    frame_stats: DrawStats,
    current_stats: DrawStats,
    /// Draws issued while each render target was bound together with this entry.
    render_targets: FxHashMap<ResourceId, DrawStats>,
    /// Clear indices recorded for this resource during the current frame, ascending.
    clears: SmallVec<[u32; 4]>,
    /// Registry-wide bind sequence number of the most recent bind.
    last_bound: u64,
    /// Frame number of the most recent bind, draw or clear.
    last_touched: u64,
}

impl DepthStencilEntry {
    fn new(desc: ResourceDesc, frame: u64) -> Self {
        Self {
            desc,
            last_touched: frame,
            ..Default::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn desc(&self) -> &ResourceDesc {
        &self.desc
    }

    #[inline]
    #[must_use]
    pub fn total_stats(&self) -> DrawStats {
        self.total_stats
    }

    #[inline]
    #[must_use]
    pub fn frame_stats(&self) -> DrawStats {
        self.frame_stats
    }

    #[inline]
    #[must_use]
    pub fn current_stats(&self) -> DrawStats {
        self.current_stats
    }

    #[inline]
    #[must_use]
    pub fn render_targets(&self) -> &FxHashMap<ResourceId, DrawStats> {
        &self.render_targets
    }

    #[inline]
    #[must_use]
    pub fn clears(&self) -> &[u32] {
        &self.clears
    }

    #[inline]
    #[must_use]
    pub fn last_bound(&self) -> u64 {
        self.last_bound
    }

    #[inline]
    #[must_use]
    pub fn last_touched(&self) -> u64 {
        self.last_touched
    }

    fn add_draw(&mut self, stats: DrawStats) {
        self.total_stats += stats;
        self.frame_stats += stats;
        self.current_stats += stats;
    }
}

/// Owned snapshot of an entry for debug listings.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthSourceInfo {
    pub id: ResourceId,
    pub desc: ResourceDesc,
    pub total_stats: DrawStats,
    pub frame_stats: DrawStats,
    pub current_stats: DrawStats,
    /// Associated render targets, sorted by id.
    pub render_targets: Vec<(ResourceId, DrawStats)>,
    pub clears: Vec<u32>,
}

// ─── Registry ─────────────────────────────────────────────────────────────────

/// Per-command-stream draw statistics, keyed by depth-stencil resource.
///
/// # Thread Safety
///
/// Not synchronized. A registry is only ever touched by the thread that owns
/// its command stream; cross-stream folding goes through
/// [`DeviceTracker::merge`](crate::DeviceTracker::merge), which holds the
/// device lock.
#[derive(Debug, Clone, Default)]
pub struct FrameStatsRegistry {
    global_stats: DrawStats,
    entries: FxHashMap<ResourceId, DepthStencilEntry>,
    clear_index_counter: u32,
    has_indirect_draws: bool,

    bound_depth_stencil: Option<ResourceId>,
    bound_render_targets: SmallVec<[ResourceId; 8]>,
    bind_sequence: u64,
    frame: u64,
}

impl FrameStatsRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ── Frame boundary ─────────────────────────────────────────────────────

    /// Starts a new frame.
    ///
    /// Zeroes the frame-scoped counters and re-seeds the entry for the
    /// implicit default depth buffer with the current backbuffer size and
    /// format. `total_stats` and the binding state are left untouched.
    pub fn reset(&mut self, default_width: u32, default_height: u32, default_format: DepthFormat) {
        self.frame += 1;
        self.global_stats = DrawStats::ZERO;
        self.clear_index_counter = 0;
        self.has_indirect_draws = false;

        for entry in self.entries.values_mut() {
            entry.frame_stats = DrawStats::ZERO;
            entry.current_stats = DrawStats::ZERO;
            entry.clears.clear();
        }

        let frame = self.frame;
        let desc = ResourceDesc::new(default_width, default_height, default_format);
        let entry = self
            .entries
            .entry(ResourceId::default_depth())
            .or_insert_with(|| DepthStencilEntry::new(desc, frame));
        entry.desc = desc;
        entry.last_touched = frame;
    }

    /// Removes entries that have not been bound, drawn to or cleared for more
    /// than `max_idle_frames` frames. The default entry and the currently
    /// bound depth-stencil are never pruned.
    ///
    /// Returns the number of removed entries.
    pub fn prune_stale(&mut self, max_idle_frames: u32) -> usize {
        if max_idle_frames == 0 {
            return 0;
        }

        let frame = self.frame;
        let bound = self.bound_depth_stencil;
        let stale: SmallVec<[ResourceId; 8]> = self
            .entries
            .iter()
            .filter(|(id, entry)| {
                !id.is_default_depth()
                    && bound != Some(**id)
                    && frame.saturating_sub(entry.last_touched) > u64::from(max_idle_frames)
            })
            .map(|(&id, _)| id)
            .collect();

        for &id in &stale {
            self.on_resource_destroyed(id);
        }

        if !stale.is_empty() {
            log::debug!("Pruned {} stale depth-stencil entries", stale.len());
        }
        stale.len()
    }

    /// Forgets everything. Called on device or swapchain teardown.
    pub fn release(&mut self) {
        self.global_stats = DrawStats::ZERO;
        self.entries.clear();
        self.clear_index_counter = 0;
        self.has_indirect_draws = false;
        self.bound_depth_stencil = None;
        self.bound_render_targets.clear();
    }

    // ── Events ─────────────────────────────────────────────────────────────

    /// Records a render-target / depth-stencil binding.
    ///
    /// Subsequent draws are attributed to `depth_stencil`. Binding no
    /// depth-stencil only detaches future draws; nothing is recorded.
    pub fn on_bind_render_targets(
        &mut self,
        render_targets: &[ResourceId],
        depth_stencil: Option<ResourceIdentity>,
    ) {
        self.bound_render_targets.clear();

        let Some(depth_stencil) = depth_stencil else {
            self.bound_depth_stencil = None;
            return;
        };

        self.bind_sequence += 1;
        let sequence = self.bind_sequence;
        let frame = self.frame;

        let entry = self.entry_mut(depth_stencil);
        entry.last_bound = sequence;
        entry.last_touched = frame;
        for &target in render_targets {
            entry.render_targets.entry(target).or_default();
        }

        self.bound_depth_stencil = Some(depth_stencil.id);
        self.bound_render_targets.extend_from_slice(render_targets);
    }

    /// Records a draw call of `vertices` vertices.
    ///
    /// A vertex count of zero marks an indirect draw whose size is unknown.
    pub fn on_draw(&mut self, vertices: u64) {
        let stats = DrawStats::single(vertices);
        self.global_stats += stats;
        if vertices == 0 {
            self.has_indirect_draws = true;
        }

        let Some(id) = self.bound_depth_stencil else {
            return;
        };
        let Some(entry) = self.entries.get_mut(&id) else {
            return;
        };

        entry.add_draw(stats);
        entry.last_touched = self.frame;

        for target in &self.bound_render_targets {
            if let Some(target_stats) = entry.render_targets.get_mut(target) {
                *target_stats += stats;
            } else {
                log::debug!("Draw on untracked render target {target:?}");
            }
        }
    }

    /// Folds the statistics of another registry into this one.
    ///
    /// Used when a deferred recording is submitted for execution. Counter
    /// accumulation is associative and commutative. Bind sequence numbers of
    /// `other` are rebased after this registry's, so binds recorded in a
    /// later submission count as more recent.
    pub fn merge(&mut self, other: &FrameStatsRegistry) {
        self.global_stats += other.global_stats;
        self.has_indirect_draws |= other.has_indirect_draws;

        let frame = self.frame;
        let sequence_base = self.bind_sequence;
        for (&id, source) in &other.entries {
            let target = self
                .entries
                .entry(id)
                .or_insert_with(|| DepthStencilEntry::new(source.desc, frame));

            target.total_stats += source.total_stats;
            target.frame_stats += source.frame_stats;
            target.current_stats += source.current_stats;
            if source.last_bound != 0 {
                target.last_bound = sequence_base + source.last_bound;
            }
            target.last_touched = frame;

            for (&rt, &stats) in &source.render_targets {
                *target.render_targets.entry(rt).or_default() += stats;
            }

            for &index in &source.clears {
                if let Err(pos) = target.clears.binary_search(&index) {
                    target.clears.insert(pos, index);
                }
            }
        }

        self.bind_sequence += other.bind_sequence;
    }

    /// Drops every reference to a destroyed resource.
    pub fn on_resource_destroyed(&mut self, id: ResourceId) {
        if id.is_default_depth() {
            return;
        }

        self.entries.remove(&id);
        for entry in self.entries.values_mut() {
            entry.render_targets.remove(&id);
        }

        if self.bound_depth_stencil == Some(id) {
            self.bound_depth_stencil = None;
        }
        self.bound_render_targets.retain(|target| *target != id);
    }

    // ── Crate-internal mutation ────────────────────────────────────────────

    /// Returns the entry for `identity`, creating it on first observation.
    pub(crate) fn entry_mut(&mut self, identity: ResourceIdentity) -> &mut DepthStencilEntry {
        let frame = self.frame;
        self.entries
            .entry(identity.id)
            .or_insert_with(|| DepthStencilEntry::new(identity.desc, frame))
    }

    /// Appends a recorded clear to the entry and restarts its clear window.
    pub(crate) fn finish_clear(&mut self, id: ResourceId, clear_index: u32) {
        let frame = self.frame;
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.clears.push(clear_index);
            entry.current_stats = DrawStats::ZERO;
            entry.last_touched = frame;
        }
    }

    pub(crate) fn set_clear_index_counter(&mut self, value: u32) {
        self.clear_index_counter = value;
    }

    // ── Queries ────────────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub fn global_stats(&self) -> DrawStats {
        self.global_stats
    }

    #[inline]
    #[must_use]
    pub fn clear_index_counter(&self) -> u32 {
        self.clear_index_counter
    }

    #[inline]
    #[must_use]
    pub fn has_indirect_draws(&self) -> bool {
        self.has_indirect_draws
    }

    #[inline]
    #[must_use]
    pub fn bound_depth_stencil(&self) -> Option<ResourceId> {
        self.bound_depth_stencil
    }

    /// Number of frames started with [`reset`](Self::reset).
    #[inline]
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    #[inline]
    #[must_use]
    pub fn entry(&self, id: ResourceId) -> Option<&DepthStencilEntry> {
        self.entries.get(&id)
    }

    /// Entries in unspecified order.
    pub fn entries(&self) -> impl Iterator<Item = (ResourceId, &DepthStencilEntry)> {
        self.entries.iter().map(|(&id, entry)| (id, entry))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of every entry sorted by id, for debug listings.
    #[must_use]
    pub fn depth_sources(&self) -> Vec<DepthSourceInfo> {
        let mut sources: Vec<DepthSourceInfo> = self
            .entries
            .iter()
            .map(|(&id, entry)| {
                let mut render_targets: Vec<_> = entry
                    .render_targets
                    .iter()
                    .map(|(&rt, &stats)| (rt, stats))
                    .collect();
                render_targets.sort_unstable_by_key(|(rt, _)| *rt);

                DepthSourceInfo {
                    id,
                    desc: entry.desc,
                    total_stats: entry.total_stats,
                    frame_stats: entry.frame_stats,
                    current_stats: entry.current_stats,
                    render_targets,
                    clears: entry.clears.to_vec(),
                }
            })
            .collect();
        sources.sort_unstable_by_key(|info| info.id);
        sources
    }
}
