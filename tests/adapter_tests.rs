//! Hook Adapter Tests
//!
//! Tests for:
//! - D3D11: texture registration, immediate and deferred streams, backups
//! - OpenGL: default framebuffer identity, `glClear` on the bound framebuffer
//! - Vulkan: render-pass load-op clears, command buffer submission
//! - Arena lifetime: destruction, release, backup trimming

mod common;

use std::sync::Arc;

use zprobe::hooks::d3d11::{
    D3D11_BIND_DEPTH_STENCIL, D3D11_BIND_RENDER_TARGET, D3D11_CLEAR_DEPTH, D3d11, Texture2dDesc,
    dxgi,
};
use zprobe::hooks::opengl::{GL_COLOR_BUFFER_BIT, GL_DEPTH_BUFFER_BIT, GL_DEPTH24_STENCIL8, GlObject, OpenGl};
use zprobe::hooks::vulkan::{
    DepthAttachment, ImageInfo, VK_FORMAT_D32_SFLOAT, VK_IMAGE_USAGE_DEPTH_STENCIL_ATTACHMENT_BIT,
    Vulkan,
};
use zprobe::{
    BackupKey, DetectionSettings, DeviceTracker, FrameStatsRegistry, HookAdapter, NativeDevice,
    ResourceId, SelectionKind,
};

/// Fake device for the pointer-handle backends.
#[derive(Default)]
struct MockDevice {
    next_handle: u64,
    created: Vec<BackupKey>,
    copies: Vec<(u64, u64)>,
    destroyed: Vec<u64>,
}

impl MockDevice {
    fn allocate(&mut self, key: BackupKey) -> u64 {
        self.next_handle += 1;
        self.created.push(key);
        0xB000_0000 + self.next_handle
    }
}

impl NativeDevice<D3d11> for MockDevice {
    fn create_texture(&mut self, key: BackupKey) -> Result<u64, String> {
        Ok(self.allocate(key))
    }

    fn copy_texture(&mut self, source: u64, destination: u64) -> Result<(), String> {
        self.copies.push((source, destination));
        Ok(())
    }

    fn destroy_texture(&mut self, texture: u64) {
        self.destroyed.push(texture);
    }
}

impl NativeDevice<Vulkan> for MockDevice {
    fn create_texture(&mut self, key: BackupKey) -> Result<u64, String> {
        Ok(self.allocate(key))
    }

    fn copy_texture(&mut self, source: u64, destination: u64) -> Result<(), String> {
        self.copies.push((source, destination));
        Ok(())
    }

    fn destroy_texture(&mut self, texture: u64) {
        self.destroyed.push(texture);
    }
}

#[derive(Default)]
struct MockGl {
    next_name: u32,
    copies: Vec<(GlObject, GlObject)>,
}

impl NativeDevice<OpenGl> for MockGl {
    fn create_texture(&mut self, _: BackupKey) -> Result<GlObject, String> {
        self.next_name += 1;
        Ok(GlObject::Texture(1000 + self.next_name))
    }

    fn copy_texture(&mut self, source: GlObject, destination: GlObject) -> Result<(), String> {
        self.copies.push((source, destination));
        Ok(())
    }

    fn destroy_texture(&mut self, _: GlObject) {}
}

fn tracker(settings: DetectionSettings) -> Arc<DeviceTracker> {
    common::init_logging();
    Arc::new(DeviceTracker::new(settings))
}

fn preserve_depth() -> DetectionSettings {
    DetectionSettings {
        preserve_depth_buffers: true,
        ..Default::default()
    }
}

fn depth_texture(width: u32, height: u32) -> Texture2dDesc {
    Texture2dDesc {
        width,
        height,
        format: dxgi::R24G8_TYPELESS,
        sample_count: 1,
        bind_flags: D3D11_BIND_DEPTH_STENCIL,
    }
}

const BACKBUFFER: u64 = 0x1000;
const SCENE_DEPTH: u64 = 0x2000;
const SHADOW_DEPTH: u64 = 0x3000;

// ============================================================================
// Direct3D 11 Tests
// ============================================================================

#[test]
fn d3d11_only_depth_textures_are_registered() {
    let mut adapter = HookAdapter::<D3d11>::new(tracker(DetectionSettings::default()));

    let color = Texture2dDesc {
        bind_flags: D3D11_BIND_RENDER_TARGET,
        format: 28,
        ..depth_texture(1920, 1080)
    };
    assert!(adapter.create_texture_2d(BACKBUFFER, &color).is_none());

    let identity = adapter.create_texture_2d(SCENE_DEPTH, &depth_texture(1920, 1080)).unwrap();
    assert_eq!(adapter.native(identity.id), Some(SCENE_DEPTH));
    assert_eq!(adapter.identity(SCENE_DEPTH), Some(identity));
}

#[test]
fn d3d11_scene_depth_selected_from_immediate_draws() {
    let mut device = MockDevice::default();
    let mut adapter = HookAdapter::<D3d11>::new(tracker(DetectionSettings::default()));
    adapter.present(1920, 1080, dxgi::D24_UNORM_S8_UINT, &mut device);

    adapter.create_texture_2d(SCENE_DEPTH, &depth_texture(1920, 1080));
    adapter.create_texture_2d(SHADOW_DEPTH, &depth_texture(2048, 2048));

    adapter.om_set_render_targets(&[], Some(SHADOW_DEPTH));
    for _ in 0..50 {
        adapter.draw_vertices(3000);
    }
    adapter.om_set_render_targets(&[BACKBUFFER], Some(SCENE_DEPTH));
    for _ in 0..200 {
        adapter.draw_instanced(36, 4);
    }

    assert_eq!(adapter.find_best_depth_texture(1920, 1080, None), Some(SCENE_DEPTH));
}

#[test]
fn d3d11_clear_copies_into_backup_and_selects_it() {
    let mut device = MockDevice::default();
    let mut adapter = HookAdapter::<D3d11>::new(tracker(preserve_depth()));
    adapter.present(1920, 1080, dxgi::D24_UNORM_S8_UINT, &mut device);
    adapter.create_texture_2d(SCENE_DEPTH, &depth_texture(1920, 1080));

    adapter.om_set_render_targets(&[BACKBUFFER], Some(SCENE_DEPTH));
    adapter.draw_vertices(9000);
    let index = adapter.clear_depth_stencil_view(SCENE_DEPTH, D3D11_CLEAR_DEPTH, &mut device);

    assert_eq!(index, Some(1));
    assert_eq!(device.copies.len(), 1);
    let (source, backup) = device.copies[0];
    assert_eq!(source, SCENE_DEPTH);

    let selection = adapter.select(1920, 1080, None);
    assert!(matches!(selection.kind, SelectionKind::ClearBackup { clear_index: 1, .. }));
    assert!(adapter.is_backup(selection.resource));
    assert_eq!(adapter.native(selection.resource), Some(backup));
}

#[test]
fn d3d11_unknown_format_clear_is_recorded_without_backup() {
    let mut device = MockDevice::default();
    let mut adapter = HookAdapter::<D3d11>::new(tracker(preserve_depth()));
    adapter.present(1920, 1080, dxgi::D24_UNORM_S8_UINT, &mut device);

    let odd = Texture2dDesc {
        format: 28,
        ..depth_texture(1920, 1080)
    };
    adapter.create_texture_2d(SCENE_DEPTH, &odd);
    adapter.om_set_render_targets(&[], Some(SCENE_DEPTH));
    adapter.draw_vertices(300);

    assert_eq!(adapter.clear_depth_stencil_view(SCENE_DEPTH, D3D11_CLEAR_DEPTH, &mut device), Some(1));
    assert!(device.created.is_empty());
    assert_eq!(adapter.find_best_depth_texture(1920, 1080, None), None);
}

#[test]
fn d3d11_deferred_context_is_merged_on_execute() {
    let mut device = MockDevice::default();
    let mut adapter = HookAdapter::<D3d11>::new(tracker(DetectionSettings::default()));
    adapter.present(1920, 1080, dxgi::D24_UNORM_S8_UINT, &mut device);
    adapter.create_texture_2d(SCENE_DEPTH, &depth_texture(1920, 1080));

    let mut command_list = FrameStatsRegistry::new();
    adapter.record_bind(&mut command_list, &[BACKBUFFER], Some(SCENE_DEPTH));
    command_list.on_draw(600);
    command_list.on_draw(600);

    assert_eq!(adapter.find_best_depth_texture(1920, 1080, None), None);
    adapter.execute_command_list(&command_list);
    assert_eq!(adapter.find_best_depth_texture(1920, 1080, None), Some(SCENE_DEPTH));
}

#[test]
fn d3d11_destroyed_texture_is_no_longer_selected() {
    let mut device = MockDevice::default();
    let mut adapter = HookAdapter::<D3d11>::new(tracker(DetectionSettings::default()));
    adapter.present(1920, 1080, dxgi::D24_UNORM_S8_UINT, &mut device);
    let identity = adapter.create_texture_2d(SCENE_DEPTH, &depth_texture(1920, 1080)).unwrap();

    adapter.om_set_render_targets(&[], Some(SCENE_DEPTH));
    adapter.draw_vertices(300);
    adapter.destroy(SCENE_DEPTH);

    assert_eq!(adapter.identity(SCENE_DEPTH), None);
    assert!(adapter.tracker().lock().registry.entry(identity.id).is_none());
    assert_eq!(adapter.find_best_depth_texture(1920, 1080, None), None);
}

#[test]
fn d3d11_unregistered_override_falls_back_to_default() {
    let mut device = MockDevice::default();
    let mut adapter = HookAdapter::<D3d11>::new(tracker(DetectionSettings::default()));
    adapter.present(1920, 1080, dxgi::D24_UNORM_S8_UINT, &mut device);

    let selection = adapter.select(1920, 1080, Some(0xDEAD));
    assert_eq!(selection.resource, ResourceId::default_depth());
    assert_eq!(selection.kind, SelectionKind::Default);
    assert_eq!(selection.desc.width, 1920);
}

// ============================================================================
// OpenGL Tests
// ============================================================================

#[test]
fn gl_default_framebuffer_is_a_candidate() {
    let mut gl = MockGl::default();
    let mut adapter = HookAdapter::<OpenGl>::new(tracker(DetectionSettings::default()));
    adapter.present(1920, 1080, GL_DEPTH24_STENCIL8, &mut gl);

    adapter.bind_draw_framebuffer(&[], Some(GlObject::DefaultFramebuffer));
    adapter.gl_draw(3600);
    adapter.gl_multi_draw(&[36, 0, -4, 72]);

    let state = adapter.tracker().lock();
    let default = state.registry.entry(ResourceId::default_depth()).unwrap();
    assert_eq!(default.total_stats().drawcalls, 3);
    assert_eq!(default.total_stats().vertices, 3708);
    drop(state);

    assert_eq!(
        adapter.find_best_depth_texture(1920, 1080, None),
        Some(GlObject::DefaultFramebuffer)
    );
}

#[test]
fn gl_clear_targets_the_bound_framebuffer() {
    let mut gl = MockGl::default();
    let mut adapter = HookAdapter::<OpenGl>::new(tracker(preserve_depth()));
    adapter.present(1920, 1080, GL_DEPTH24_STENCIL8, &mut gl);

    let scene = GlObject::Renderbuffer(7);
    adapter.define_storage(scene, GL_DEPTH24_STENCIL8, 1920, 1080, 1).unwrap();
    adapter.bind_draw_framebuffer(&[GlObject::Texture(3)], Some(scene));
    adapter.gl_draw_instanced(36, 100);

    assert_eq!(adapter.gl_clear(GL_COLOR_BUFFER_BIT, &mut gl), None);
    assert_eq!(adapter.gl_clear(GL_COLOR_BUFFER_BIT | GL_DEPTH_BUFFER_BIT, &mut gl), Some(1));
    assert_eq!(gl.copies, vec![(scene, GlObject::Texture(1001))]);

    // Nothing bound: glClear has no depth attachment to hit.
    adapter.bind_draw_framebuffer(&[], None);
    assert_eq!(adapter.gl_clear(GL_DEPTH_BUFFER_BIT, &mut gl), None);
}

#[test]
fn gl_texture_and_renderbuffer_names_do_not_collide() {
    let mut adapter = HookAdapter::<OpenGl>::new(tracker(DetectionSettings::default()));
    let texture = adapter.define_storage(GlObject::Texture(5), GL_DEPTH24_STENCIL8, 1920, 1080, 1);
    let renderbuffer =
        adapter.define_storage(GlObject::Renderbuffer(5), GL_DEPTH24_STENCIL8, 1920, 1080, 4);

    assert_ne!(texture.unwrap().id, renderbuffer.unwrap().id);
    assert!(renderbuffer.unwrap().desc.is_multisampled());
}

// ============================================================================
// Vulkan Tests
// ============================================================================

const DEPTH_IMAGE: u64 = 0x7000;
const COLOR_IMAGE: u64 = 0x7100;

fn depth_image_info() -> ImageInfo {
    ImageInfo {
        width: 2560,
        height: 1440,
        format: VK_FORMAT_D32_SFLOAT,
        samples: 1,
        usage: VK_IMAGE_USAGE_DEPTH_STENCIL_ATTACHMENT_BIT,
    }
}

#[test]
fn vulkan_load_op_clear_captures_previous_pass() {
    let mut device = MockDevice::default();
    let mut adapter = HookAdapter::<Vulkan>::new(tracker(preserve_depth()));
    adapter.present(2560, 1440, 0, &mut device);
    adapter.create_image(DEPTH_IMAGE, &depth_image_info());

    let mut cmd = FrameStatsRegistry::new();
    let keep = DepthAttachment {
        image: DEPTH_IMAGE,
        clear_depth: false,
        clear_stencil: false,
    };
    adapter.cmd_begin_render_pass(&mut cmd, &[COLOR_IMAGE], Some(keep), &mut device);
    HookAdapter::<Vulkan>::cmd_draw(&mut cmd, 36, 500);
    adapter.cmd_end_render_pass(&mut cmd);

    let clear = DepthAttachment {
        clear_depth: true,
        ..keep
    };
    adapter.cmd_begin_render_pass(&mut cmd, &[COLOR_IMAGE], Some(clear), &mut device);
    HookAdapter::<Vulkan>::cmd_draw(&mut cmd, 6, 1);
    adapter.cmd_end_render_pass(&mut cmd);

    adapter.queue_submit(&[&cmd]);

    assert_eq!(device.copies.len(), 1);
    assert_eq!(device.copies[0].0, DEPTH_IMAGE);
    let selection = adapter.select(2560, 1440, None);
    assert!(matches!(selection.kind, SelectionKind::ClearBackup { clear_index: 1, .. }));
    assert_eq!(adapter.tracker().lock().registry.global_stats().drawcalls, 2);
}

#[test]
fn vulkan_clear_attachments_uses_pass_depth() {
    let mut device = MockDevice::default();
    let mut adapter = HookAdapter::<Vulkan>::new(tracker(preserve_depth()));
    adapter.present(2560, 1440, 0, &mut device);
    adapter.create_image(DEPTH_IMAGE, &depth_image_info());

    let mut cmd = FrameStatsRegistry::new();
    let attachment = DepthAttachment {
        image: DEPTH_IMAGE,
        clear_depth: false,
        clear_stencil: false,
    };
    adapter.cmd_begin_render_pass(&mut cmd, &[], Some(attachment), &mut device);
    HookAdapter::<Vulkan>::cmd_draw_indirect(&mut cmd);

    assert_eq!(adapter.cmd_clear_attachments(&mut cmd, 0x2, &mut device), Some(1));
    assert!(cmd.has_indirect_draws());
}

// ============================================================================
// Arena Lifetime Tests
// ============================================================================

#[test]
fn release_destroys_every_backup() {
    let mut device = MockDevice::default();
    let mut adapter = HookAdapter::<D3d11>::new(tracker(preserve_depth()));
    adapter.present(1920, 1080, dxgi::D24_UNORM_S8_UINT, &mut device);
    adapter.create_texture_2d(SCENE_DEPTH, &depth_texture(1920, 1080));

    adapter.om_set_render_targets(&[], Some(SCENE_DEPTH));
    adapter.draw_vertices(30);
    adapter.clear_depth_stencil_view(SCENE_DEPTH, D3D11_CLEAR_DEPTH, &mut device);
    let backup = device.copies[0].1;

    adapter.release(&mut device);
    assert_eq!(device.destroyed, vec![backup]);
    assert!(adapter.tracker().lock().captures.is_empty());
}

#[test]
fn idle_backups_are_trimmed_on_present() {
    let mut device = MockDevice::default();
    let mut adapter = HookAdapter::<D3d11>::new(tracker(DetectionSettings {
        backup_idle_frames: 1,
        ..preserve_depth()
    }));
    adapter.present(1920, 1080, dxgi::D24_UNORM_S8_UINT, &mut device);
    adapter.create_texture_2d(SCENE_DEPTH, &depth_texture(1920, 1080));

    adapter.om_set_render_targets(&[], Some(SCENE_DEPTH));
    adapter.draw_vertices(30);
    adapter.clear_depth_stencil_view(SCENE_DEPTH, D3D11_CLEAR_DEPTH, &mut device);

    for _ in 0..3 {
        adapter.present(1920, 1080, dxgi::D24_UNORM_S8_UINT, &mut device);
    }
    assert_eq!(device.destroyed.len(), 1);
    assert_eq!(adapter.tracker().lock().captures.backup_count(), 0);
}
