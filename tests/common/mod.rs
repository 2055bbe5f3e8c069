//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use slotmap::SlotMap;

use zprobe::tracking::ResourceCopier;
use zprobe::{
    BackupKey, CaptureError, DepthFormat, FrameStatsRegistry, ResourceDesc, ResourceId,
    ResourceIdentity,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Copier that allocates ids from its own arena and records every call.
#[derive(Default)]
pub struct RecordingCopier {
    arena: SlotMap<ResourceId, ()>,
    pub created: Vec<BackupKey>,
    pub copies: Vec<(ResourceId, ResourceId)>,
    pub destroyed: Vec<ResourceId>,
    pub fail_create: bool,
}

impl RecordingCopier {
    /// Allocates an application resource id from the shared arena.
    pub fn resource(&mut self) -> ResourceId {
        self.arena.insert(())
    }

    pub fn depth(&mut self, width: u32, height: u32, format: DepthFormat) -> ResourceIdentity {
        ResourceIdentity::new(self.resource(), ResourceDesc::new(width, height, format))
    }

    pub fn depth_desc(&mut self, desc: ResourceDesc) -> ResourceIdentity {
        ResourceIdentity::new(self.resource(), desc)
    }
}

impl ResourceCopier for RecordingCopier {
    fn create_backup(&mut self, key: BackupKey) -> Result<ResourceId, CaptureError> {
        if self.fail_create {
            return Err(CaptureError::BackupCreateFailed {
                key,
                reason: "out of video memory".into(),
            });
        }
        self.created.push(key);
        Ok(self.arena.insert(()))
    }

    fn copy_resource(&mut self, source: ResourceId, backup: ResourceId) -> Result<(), CaptureError> {
        self.copies.push((source, backup));
        Ok(())
    }

    fn destroy_backup(&mut self, backup: ResourceId) {
        self.arena.remove(backup);
        self.destroyed.push(backup);
    }
}

/// Binds `depth` and issues `drawcalls` draws, spreading `vertices` evenly.
pub fn draw_into(
    registry: &mut FrameStatsRegistry,
    depth: ResourceIdentity,
    drawcalls: u64,
    vertices: u64,
) {
    registry.on_bind_render_targets(&[], Some(depth));
    let per_draw = vertices / drawcalls;
    for _ in 0..drawcalls {
        registry.on_draw(per_draw);
    }
}
