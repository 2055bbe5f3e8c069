//! Direct3D 11
//!
//! Handles are the integer value of the `ID3D11Texture2D` pointer behind a
//! view; the hook layer resolves views to their resource before calling in.
//! D3D11 has no implicit depth buffer: every depth-stencil is an explicit
//! texture, so the default identity only appears when nothing else qualifies.
//!
//! Deferred contexts record into their own [`FrameStatsRegistry`] and are
//! merged by [`HookAdapter::execute_command_list`].

use zprobe_core::{ClearFlags, DepthFormat, ResourceIdentity};
use zprobe_tracking::FrameStatsRegistry;

use crate::adapter::HookAdapter;
use crate::backend::{Backend, NativeDevice, NativeTextureDesc};

pub const D3D11_CLEAR_DEPTH: u32 = 0x1;
pub const D3D11_CLEAR_STENCIL: u32 = 0x2;

pub const D3D11_BIND_RENDER_TARGET: u32 = 0x20;
pub const D3D11_BIND_DEPTH_STENCIL: u32 = 0x40;

/// `DXGI_FORMAT` codes of the depth families.
pub mod dxgi {
    pub const R32G8X24_TYPELESS: u32 = 19;
    pub const D32_FLOAT_S8X24_UINT: u32 = 20;
    pub const R32_FLOAT_X8X24_TYPELESS: u32 = 21;
    pub const R32_TYPELESS: u32 = 39;
    pub const D32_FLOAT: u32 = 40;
    pub const R32_FLOAT: u32 = 41;
    pub const R24G8_TYPELESS: u32 = 44;
    pub const D24_UNORM_S8_UINT: u32 = 45;
    pub const R24_UNORM_X8_TYPELESS: u32 = 46;
    pub const R16_TYPELESS: u32 = 53;
    pub const D16_UNORM: u32 = 55;
    pub const R16_UNORM: u32 = 56;
}

pub struct D3d11;

impl Backend for D3d11 {
    type Handle = u64;

    const NAME: &'static str = "D3D11";

    fn clear_flags(native: u32) -> ClearFlags {
        let mut flags = ClearFlags::empty();
        flags.set(ClearFlags::DEPTH, native & D3D11_CLEAR_DEPTH != 0);
        flags.set(ClearFlags::STENCIL, native & D3D11_CLEAR_STENCIL != 0);
        flags
    }

    fn depth_format(native: u32) -> DepthFormat {
        use dxgi::{
            D16_UNORM, D24_UNORM_S8_UINT, D32_FLOAT, D32_FLOAT_S8X24_UINT, R16_TYPELESS,
            R16_UNORM, R24_UNORM_X8_TYPELESS, R24G8_TYPELESS, R32_FLOAT, R32_FLOAT_X8X24_TYPELESS,
            R32_TYPELESS, R32G8X24_TYPELESS,
        };
        match native {
            R16_TYPELESS | D16_UNORM | R16_UNORM => DepthFormat::D16,
            R24G8_TYPELESS | D24_UNORM_S8_UINT | R24_UNORM_X8_TYPELESS => DepthFormat::D24S8,
            R32_TYPELESS | D32_FLOAT | R32_FLOAT => DepthFormat::D32,
            R32G8X24_TYPELESS | D32_FLOAT_S8X24_UINT | R32_FLOAT_X8X24_TYPELESS => {
                DepthFormat::D32S8
            }
            _ => DepthFormat::Unknown,
        }
    }
}

/// The subset of `D3D11_TEXTURE2D_DESC` the adapter looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Texture2dDesc {
    pub width: u32,
    pub height: u32,
    pub format: u32,
    pub sample_count: u32,
    pub bind_flags: u32,
}

impl HookAdapter<D3d11> {
    /// `ID3D11Device::CreateTexture2D`. Only depth-stencil textures are registered.
    pub fn create_texture_2d(&mut self, texture: u64, desc: &Texture2dDesc) -> Option<ResourceIdentity> {
        if desc.bind_flags & D3D11_BIND_DEPTH_STENCIL == 0 {
            return None;
        }
        let native = NativeTextureDesc::new(desc.width, desc.height, desc.format)
            .with_samples(desc.sample_count);
        Some(self.register(texture, native))
    }

    /// `ID3D11DeviceContext::OMSetRenderTargets` on the immediate context.
    pub fn om_set_render_targets(&mut self, render_targets: &[u64], depth_stencil: Option<u64>) {
        self.bind(render_targets, depth_stencil);
    }

    /// `ID3D11DeviceContext::ClearDepthStencilView` on the immediate context.
    pub fn clear_depth_stencil_view<D: NativeDevice<D3d11>>(
        &mut self,
        depth_stencil: u64,
        clear_flags: u32,
        device: &mut D,
    ) -> Option<u32> {
        self.clear(depth_stencil, clear_flags, device)
    }

    pub fn draw_vertices(&self, vertex_count: u32) {
        if vertex_count != 0 {
            self.draw(u64::from(vertex_count));
        }
    }

    /// `DrawInstanced` and `DrawIndexedInstanced`; counts every instance's vertices.
    pub fn draw_instanced(&self, count_per_instance: u32, instance_count: u32) {
        let vertices = u64::from(count_per_instance) * u64::from(instance_count);
        if vertices != 0 {
            self.draw(vertices);
        }
    }

    /// `DrawAuto`, `DrawInstancedIndirect` and `DrawIndexedInstancedIndirect`.
    pub fn draw_indirect(&self) {
        self.draw(0);
    }

    /// `ID3D11DeviceContext::ExecuteCommandList`.
    pub fn execute_command_list(&self, command_list: &FrameStatsRegistry) {
        self.submit(command_list);
    }
}
