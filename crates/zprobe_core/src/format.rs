//! Depth Formats
//!
//! Backends describe depth-stencil resources with their own format enums
//! (DXGI, GL internal formats, `VkFormat`). The tracking core only cares
//! about the *family* a format belongs to, which corresponds to the typeless
//! storage layout a backup copy has to be created with.
//!
//! # Format Filter
//!
//! | Index | Family           | DXGI typeless format   |
//! |-------|------------------|------------------------|
//! | 0     | any              | —                      |
//! | 1     | [`D16`]          | `R16_TYPELESS`         |
//! | 2     | [`D32`]          | `R32_TYPELESS`         |
//! | 3     | [`D24S8`]        | `R24G8_TYPELESS`       |
//! | 4     | [`D32S8`]        | `R32G8X24_TYPELESS`    |
//!
//! Any other index allows every format.
//!
//! [`D16`]: DepthFormat::D16
//! [`D32`]: DepthFormat::D32
//! [`D24S8`]: DepthFormat::D24S8
//! [`D32S8`]: DepthFormat::D32S8

use serde::{Deserialize, Serialize};

/// Typeless depth-stencil format family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DepthFormat {
    /// Format could not be mapped to a known depth family.
    #[default]
    Unknown,
    /// 16-bit unorm depth (optionally with an 8-bit stencil on Vulkan).
    D16,
    /// 24-bit unorm depth with 8-bit stencil (or 8 unused bits).
    D24S8,
    /// 32-bit float depth.
    D32,
    /// 32-bit float depth with 8-bit stencil.
    D32S8,
}

impl DepthFormat {
    /// Returns `true` when the family stores a stencil channel.
    #[inline]
    #[must_use]
    pub const fn has_stencil(self) -> bool {
        matches!(self, Self::D24S8 | Self::D32S8)
    }

    /// Returns `true` for formats that can be recreated for a backup copy.
    #[inline]
    #[must_use]
    pub const fn is_known(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// Allow-list applied to candidate depth-stencil formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FormatFilter {
    #[default]
    Any,
    Only(DepthFormat),
}

impl FormatFilter {
    /// Families selectable by a non-zero filter index, in index order.
    pub const FAMILIES: [DepthFormat; 4] = [
        DepthFormat::D16,
        DepthFormat::D32,
        DepthFormat::D24S8,
        DepthFormat::D32S8,
    ];

    /// Maps a configured filter index to a filter.
    ///
    /// `0` and indices outside the known set allow all formats.
    #[must_use]
    pub fn from_index(index: u32) -> Self {
        match index {
            0 => Self::Any,
            i => Self::FAMILIES
                .get(i as usize - 1)
                .map_or(Self::Any, |&format| Self::Only(format)),
        }
    }

    #[inline]
    #[must_use]
    pub fn allows(self, format: DepthFormat) -> bool {
        match self {
            Self::Any => true,
            Self::Only(expected) => expected == format,
        }
    }
}
