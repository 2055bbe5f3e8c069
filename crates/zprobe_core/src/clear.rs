use bitflags::bitflags;

bitflags! {
    /// Channels of a depth-stencil resource affected by a clear.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ClearFlags: u8 {
        const DEPTH   = 1 << 0;
        const STENCIL = 1 << 1;
    }
}

impl ClearFlags {
    /// Returns `true` if the clear destroys a channel whose preservation is enabled.
    #[inline]
    #[must_use]
    pub fn touches_preserved(self, preserve_depth: bool, preserve_stencil: bool) -> bool {
        (preserve_depth && self.contains(Self::DEPTH))
            || (preserve_stencil && self.contains(Self::STENCIL))
    }
}
