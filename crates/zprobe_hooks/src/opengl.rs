//! OpenGL
//!
//! Textures and renderbuffers live in separate name spaces, so handles carry
//! their object kind. Framebuffer object 0 (the window's default framebuffer)
//! maps to the default depth identity.
//!
//! `glClear` has no target argument; it clears the depth attachment of the
//! framebuffer bound for drawing, which the adapter remembers from the last
//! [`HookAdapter::bind_draw_framebuffer`].

use zprobe_core::{ClearFlags, DepthFormat, ResourceIdentity};

use crate::adapter::HookAdapter;
use crate::backend::{Backend, NativeDevice, NativeTextureDesc};

pub const GL_DEPTH_BUFFER_BIT: u32 = 0x0000_0100;
pub const GL_STENCIL_BUFFER_BIT: u32 = 0x0000_0400;
pub const GL_COLOR_BUFFER_BIT: u32 = 0x0000_4000;

pub const GL_DEPTH_COMPONENT16: u32 = 0x81A5;
pub const GL_DEPTH_COMPONENT24: u32 = 0x81A6;
pub const GL_DEPTH_COMPONENT32: u32 = 0x81A7;
pub const GL_DEPTH_COMPONENT32F: u32 = 0x8CAC;
pub const GL_DEPTH24_STENCIL8: u32 = 0x88F0;
pub const GL_DEPTH32F_STENCIL8: u32 = 0x8CAD;

/// A GL object that can serve as a framebuffer attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlObject {
    /// Depth buffer of the default framebuffer.
    DefaultFramebuffer,
    Texture(u32),
    Renderbuffer(u32),
}

pub struct OpenGl;

impl Backend for OpenGl {
    type Handle = GlObject;

    const NAME: &'static str = "OpenGL";

    fn clear_flags(native: u32) -> ClearFlags {
        let mut flags = ClearFlags::empty();
        flags.set(ClearFlags::DEPTH, native & GL_DEPTH_BUFFER_BIT != 0);
        flags.set(ClearFlags::STENCIL, native & GL_STENCIL_BUFFER_BIT != 0);
        flags
    }

    fn depth_format(native: u32) -> DepthFormat {
        match native {
            GL_DEPTH_COMPONENT16 => DepthFormat::D16,
            GL_DEPTH_COMPONENT24 | GL_DEPTH24_STENCIL8 => DepthFormat::D24S8,
            GL_DEPTH_COMPONENT32 | GL_DEPTH_COMPONENT32F => DepthFormat::D32,
            GL_DEPTH32F_STENCIL8 => DepthFormat::D32S8,
            _ => DepthFormat::Unknown,
        }
    }

    fn default_depth_handle() -> Option<GlObject> {
        Some(GlObject::DefaultFramebuffer)
    }
}

fn vertex_count(count: i32) -> Option<u64> {
    u64::try_from(count).ok().filter(|&count| count != 0)
}

impl HookAdapter<OpenGl> {
    /// `glTexStorage2D(Multisample)` / `glRenderbufferStorage(Multisample)` with a depth format.
    pub fn define_storage(
        &mut self,
        object: GlObject,
        internal_format: u32,
        width: u32,
        height: u32,
        samples: u32,
    ) -> Option<ResourceIdentity> {
        if !OpenGl::depth_format(internal_format).is_known() {
            return None;
        }
        let desc = NativeTextureDesc::new(width, height, internal_format).with_samples(samples);
        Some(self.register(object, desc))
    }

    /// `glDeleteTextures` / `glDeleteRenderbuffers`.
    pub fn delete_objects(&mut self, objects: &[GlObject]) {
        for &object in objects {
            self.destroy(object);
        }
    }

    /// Attachments of the framebuffer newly bound to `GL_DRAW_FRAMEBUFFER`.
    pub fn bind_draw_framebuffer(&mut self, color: &[GlObject], depth: Option<GlObject>) {
        self.bind(color, depth);
    }

    /// `glClear`.
    pub fn gl_clear<D: NativeDevice<OpenGl>>(&mut self, mask: u32, device: &mut D) -> Option<u32> {
        self.clear_bound(mask, device)
    }

    /// `glDrawArrays` / `glDrawElements` and their range variants.
    pub fn gl_draw(&self, count: i32) {
        if let Some(vertices) = vertex_count(count) {
            self.draw(vertices);
        }
    }

    pub fn gl_draw_instanced(&self, count: i32, instance_count: i32) {
        if let (Some(vertices), Some(instances)) = (vertex_count(count), vertex_count(instance_count)) {
            self.draw(vertices * instances);
        }
    }

    /// `glMultiDrawArrays` / `glMultiDrawElements`: one draw call per sub-draw.
    pub fn gl_multi_draw(&self, counts: &[i32]) {
        for &count in counts {
            self.gl_draw(count);
        }
    }

    /// `glDrawArraysIndirect`, `glDrawElementsIndirect` and the multi-indirect variants.
    pub fn gl_draw_indirect(&self) {
        self.draw(0);
    }
}
