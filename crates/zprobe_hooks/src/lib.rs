//! Backend adapters for zprobe.
//!
//! [`HookAdapter`] is generic over a [`Backend`] and owns the arena that maps
//! native handles to tracking keys. Backend modules add API-shaped entry
//! points on top of it:
//!
//! | Backend           | Handle               | Default depth         | Deferred streams  |
//! |-------------------|----------------------|-----------------------|-------------------|
//! | [`d3d11::D3d11`]  | texture pointer      | none                  | deferred contexts |
//! | [`opengl::OpenGl`] | [`opengl::GlObject`] | default framebuffer   | none              |
//! | [`vulkan::Vulkan`] | `VkImage`            | none                  | command buffers   |

pub mod adapter;
pub mod backend;
pub mod d3d11;
pub mod opengl;
pub mod vulkan;

pub use adapter::HookAdapter;
pub use backend::{Backend, NativeDevice, NativeTextureDesc};
