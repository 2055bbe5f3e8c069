//! Vulkan
//!
//! Every command buffer is a deferred stream: the hook layer keeps one
//! [`FrameStatsRegistry`] per `VkCommandBuffer`, replaces it on
//! `vkBeginCommandBuffer`, and submits it on `vkQueueSubmit`. Handles are
//! `VkImage` values.
//!
//! A render pass whose depth attachment uses `VK_ATTACHMENT_LOAD_OP_CLEAR`
//! clears the attachment at `vkCmdBeginRenderPass`, before any draw of the
//! pass; the clear is recorded ahead of the new binding.

use zprobe_core::{ClearFlags, DepthFormat, ResourceIdentity};
use zprobe_tracking::FrameStatsRegistry;

use crate::adapter::HookAdapter;
use crate::backend::{Backend, NativeDevice, NativeTextureDesc};

pub const VK_IMAGE_ASPECT_DEPTH_BIT: u32 = 0x2;
pub const VK_IMAGE_ASPECT_STENCIL_BIT: u32 = 0x4;

pub const VK_IMAGE_USAGE_DEPTH_STENCIL_ATTACHMENT_BIT: u32 = 0x20;

pub const VK_FORMAT_D16_UNORM: u32 = 124;
pub const VK_FORMAT_X8_D24_UNORM_PACK32: u32 = 125;
pub const VK_FORMAT_D32_SFLOAT: u32 = 126;
pub const VK_FORMAT_D16_UNORM_S8_UINT: u32 = 128;
pub const VK_FORMAT_D24_UNORM_S8_UINT: u32 = 129;
pub const VK_FORMAT_D32_SFLOAT_S8_UINT: u32 = 130;

pub struct Vulkan;

impl Backend for Vulkan {
    type Handle = u64;

    const NAME: &'static str = "Vulkan";

    fn clear_flags(native: u32) -> ClearFlags {
        let mut flags = ClearFlags::empty();
        flags.set(ClearFlags::DEPTH, native & VK_IMAGE_ASPECT_DEPTH_BIT != 0);
        flags.set(ClearFlags::STENCIL, native & VK_IMAGE_ASPECT_STENCIL_BIT != 0);
        flags
    }

    fn depth_format(native: u32) -> DepthFormat {
        match native {
            VK_FORMAT_D16_UNORM | VK_FORMAT_D16_UNORM_S8_UINT => DepthFormat::D16,
            VK_FORMAT_X8_D24_UNORM_PACK32 | VK_FORMAT_D24_UNORM_S8_UINT => DepthFormat::D24S8,
            VK_FORMAT_D32_SFLOAT => DepthFormat::D32,
            VK_FORMAT_D32_SFLOAT_S8_UINT => DepthFormat::D32S8,
            _ => DepthFormat::Unknown,
        }
    }
}

/// The subset of `VkImageCreateInfo` the adapter looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub format: u32,
    pub samples: u32,
    pub usage: u32,
}

/// Depth attachment of a render pass instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthAttachment {
    pub image: u64,
    /// `loadOp == VK_ATTACHMENT_LOAD_OP_CLEAR`
    pub clear_depth: bool,
    /// `stencilLoadOp == VK_ATTACHMENT_LOAD_OP_CLEAR`
    pub clear_stencil: bool,
}

impl HookAdapter<Vulkan> {
    /// `vkCreateImage`. Only depth-stencil attachments are registered.
    pub fn create_image(&mut self, image: u64, info: &ImageInfo) -> Option<ResourceIdentity> {
        if info.usage & VK_IMAGE_USAGE_DEPTH_STENCIL_ATTACHMENT_BIT == 0 {
            return None;
        }
        let desc = NativeTextureDesc::new(info.width, info.height, info.format)
            .with_samples(info.samples);
        Some(self.register(image, desc))
    }

    pub fn destroy_image(&mut self, image: u64) {
        self.destroy(image);
    }

    pub fn cmd_begin_render_pass<D: NativeDevice<Vulkan>>(
        &mut self,
        cmd: &mut FrameStatsRegistry,
        color: &[u64],
        depth: Option<DepthAttachment>,
        device: &mut D,
    ) {
        if let Some(attachment) = depth {
            let mut aspects = 0;
            if attachment.clear_depth {
                aspects |= VK_IMAGE_ASPECT_DEPTH_BIT;
            }
            if attachment.clear_stencil {
                aspects |= VK_IMAGE_ASPECT_STENCIL_BIT;
            }
            if aspects != 0 {
                self.record_clear(cmd, attachment.image, aspects, device);
            }
        }
        self.record_bind(cmd, color, depth.map(|attachment| attachment.image));
    }

    pub fn cmd_end_render_pass(&mut self, cmd: &mut FrameStatsRegistry) {
        self.record_bind(cmd, &[], None);
    }

    /// `vkCmdClearDepthStencilImage` (outside a render pass).
    pub fn cmd_clear_depth_stencil_image<D: NativeDevice<Vulkan>>(
        &mut self,
        cmd: &mut FrameStatsRegistry,
        image: u64,
        aspect_mask: u32,
        device: &mut D,
    ) -> Option<u32> {
        self.record_clear(cmd, image, aspect_mask, device)
    }

    /// `vkCmdClearAttachments` targeting the current pass's depth attachment.
    pub fn cmd_clear_attachments<D: NativeDevice<Vulkan>>(
        &mut self,
        cmd: &mut FrameStatsRegistry,
        aspect_mask: u32,
        device: &mut D,
    ) -> Option<u32> {
        self.record_clear_bound(cmd, aspect_mask, device)
    }

    /// `vkCmdDraw` / `vkCmdDrawIndexed`.
    pub fn cmd_draw(cmd: &mut FrameStatsRegistry, count: u32, instance_count: u32) {
        let vertices = u64::from(count) * u64::from(instance_count);
        if vertices != 0 {
            cmd.on_draw(vertices);
        }
    }

    /// `vkCmdDrawIndirect` / `vkCmdDrawIndexedIndirect` and their count variants.
    pub fn cmd_draw_indirect(cmd: &mut FrameStatsRegistry) {
        cmd.on_draw(0);
    }

    /// `vkQueueSubmit`: folds each submitted command buffer into the device statistics.
    pub fn queue_submit(&self, command_buffers: &[&FrameStatsRegistry]) {
        for cmd in command_buffers {
            self.submit(cmd);
        }
    }
}
