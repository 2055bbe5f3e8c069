//! Resource Identities
//!
//! The tracking core never holds native GPU objects. Every physical resource
//! an adapter observes is registered in an arena owned by the adapter, and
//! the core only stores the arena key ([`ResourceId`]) together with the
//! static attributes captured on first observation ([`ResourceDesc`]).
//!
//! The null key is reserved for the application's implicit default depth
//! buffer (the one attached to the swapchain / default framebuffer).

use slotmap::{Key, new_key_type};
use std::hash::{Hash, Hasher};

use crate::format::DepthFormat;

new_key_type! {
    /// Opaque, comparable key for a physical depth-stencil or render-target
    /// resource. Allocated by the adapter's arena.
    pub struct ResourceId;
}

impl ResourceId {
    /// The implicit, backbuffer-sized default depth buffer.
    #[inline]
    #[must_use]
    pub fn default_depth() -> Self {
        Self::null()
    }

    #[inline]
    #[must_use]
    pub fn is_default_depth(self) -> bool {
        self.is_null()
    }
}

/// Maximum relative aspect ratio difference tolerated by [`ResourceDesc::fits_target`].
pub const ASPECT_RATIO_TOLERANCE: f64 = 0.1;
/// Smallest accepted `target / candidate` size factor.
pub const MIN_SIZE_FACTOR: f64 = 0.5;
/// Largest accepted `target / candidate` size factor.
pub const MAX_SIZE_FACTOR: f64 = 1.85;

/// Static attributes of a resource, cached the first time it is observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ResourceDesc {
    pub width: u32,
    pub height: u32,
    pub sample_count: u32,
    pub format: DepthFormat,
}

impl ResourceDesc {
    #[must_use]
    pub const fn new(width: u32, height: u32, format: DepthFormat) -> Self {
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

    #[inline]
    #[must_use]
    pub const fn is_multisampled(&self) -> bool {
        self.sample_count > 1
    }

    /// Aspect-ratio test against the effect target size.
    ///
    /// Rejects candidates whose aspect ratio differs from the target's by more
    /// than [`ASPECT_RATIO_TOLERANCE`], or whose per-axis `target / candidate`
    /// factor lies outside `[MIN_SIZE_FACTOR, MAX_SIZE_FACTOR]`. A zero-sized
    /// target accepts everything; a zero-sized candidate is always rejected.
    #[must_use]
    pub fn fits_target(&self, target_width: u32, target_height: u32) -> bool {
        if target_width == 0 || target_height == 0 {
            return true;
        }
        if self.width == 0 || self.height == 0 {
            return false;
        }

        let (tw, th) = (f64::from(target_width), f64::from(target_height));
        let (cw, ch) = (f64::from(self.width), f64::from(self.height));

        let aspect_delta = (cw / ch - tw / th).abs();
        let width_factor = tw / cw;
        let height_factor = th / ch;

        aspect_delta <= ASPECT_RATIO_TOLERANCE
            && (MIN_SIZE_FACTOR..=MAX_SIZE_FACTOR).contains(&width_factor)
            && (MIN_SIZE_FACTOR..=MAX_SIZE_FACTOR).contains(&height_factor)
    }
}

/// Cache key of a backup texture: same-format, same-size copies share storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BackupKey {
    pub format: DepthFormat,
    pub width: u32,
    pub height: u32,
}

impl BackupKey {
    #[inline]
    #[must_use]
    pub const fn of(desc: &ResourceDesc) -> Self {
        Self {
            format: desc.format,
            width: desc.width,
            height: desc.height,
        }
    }
}

impl std::fmt::Display for BackupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} {}x{}", self.format, self.width, self.height)
    }
}

/// A resource key together with its cached attributes.
///
/// Equality and hashing only consider the key: two identities naming the same
/// physical resource are equal even if one carries a stale description.
#[derive(Debug, Clone, Copy)]
pub struct ResourceIdentity {
    pub id: ResourceId,
    pub desc: ResourceDesc,
}

impl ResourceIdentity {
    #[inline]
    #[must_use]
    pub const fn new(id: ResourceId, desc: ResourceDesc) -> Self {
        Self { id, desc }
    }

    /// Identity of the default depth buffer with the given backbuffer size.
    #[must_use]
    pub fn default_depth(width: u32, height: u32, format: DepthFormat) -> Self {
        Self::new(
            ResourceId::default_depth(),
            ResourceDesc::new(width, height, format),
        )
    }
}

impl PartialEq for ResourceIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ResourceIdentity {}

impl Hash for ResourceIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
