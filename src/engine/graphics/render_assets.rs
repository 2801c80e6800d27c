use std::collections::HashMap;

use crate::engine::graphics::mesh::CpuMesh;
use crate::engine::graphics::primitives::{CpuMeshHandle, MeshHandle, TextureHandle};
use crate::engine::graphics::texture_loader;
use crate::engine::graphics::{MeshUploader, TextureUploader};

/// Bridge between scene-side asset identities and renderer-owned GPU resources.
///
/// - Scene nodes refer to geometry by `CpuMeshHandle` and to textures by path.
/// - The renderer owns GPU resources and returns `MeshHandle` / `TextureHandle`.
/// - Uploads happen lazily, the first time a frame needs them, and are cached.
#[derive(Debug, Default)]
pub struct RenderAssets {
    cpu_meshes: Vec<CpuMesh>,
    gpu_meshes: HashMap<CpuMeshHandle, MeshHandle>,
    /// `None` marks a texture that failed to load; it is not retried.
    textures: HashMap<String, Option<TextureHandle>>,
}

impl RenderAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register CPU mesh data and get a stable handle. Share the handle to reuse the mesh.
    pub fn register_mesh(&mut self, mesh: CpuMesh) -> CpuMeshHandle {
        let h = CpuMeshHandle(self.cpu_meshes.len() as u32);
        self.cpu_meshes.push(mesh);
        h
    }

    pub fn cpu_mesh(&self, h: CpuMeshHandle) -> Option<&CpuMesh> {
        self.cpu_meshes.get(h.0 as usize)
    }

    pub fn mesh_count(&self) -> usize {
        self.cpu_meshes.len()
    }

    /// Get (or upload) the GPU mesh for a CPU mesh handle.
    pub fn gpu_mesh_handle(
        &mut self,
        uploader: &mut dyn MeshUploader,
        cpu_mesh: CpuMeshHandle,
    ) -> Result<MeshHandle, Box<dyn std::error::Error>> {
        if let Some(h) = self.gpu_meshes.get(&cpu_mesh).copied() {
            return Ok(h);
        }

        let mesh = self
            .cpu_mesh(cpu_mesh)
            .ok_or("RenderAssets: invalid CpuMeshHandle")?;
        let h = uploader.upload_mesh(mesh)?;
        self.gpu_meshes.insert(cpu_mesh, h);
        Ok(h)
    }

    /// Get (or load and upload) the texture at `uri`.
    ///
    /// Failures are logged once and remembered; callers draw without the texture.
    pub fn texture_handle(
        &mut self,
        uploader: &mut dyn TextureUploader,
        uri: &str,
    ) -> Option<TextureHandle> {
        if let Some(cached) = self.textures.get(uri) {
            return *cached;
        }

        let result = texture_loader::load(uri)
            .map_err(|e| -> Box<dyn std::error::Error> { Box::new(e) })
            .and_then(|tex| uploader.upload_texture_rgba8(&tex.pixels, tex.width, tex.height));

        let handle = match result {
            Ok(h) => {
                log::info!("loaded texture '{uri}'");
                Some(h)
            }
            Err(e) => {
                log::warn!("texture '{uri}' unavailable, drawing without it: {e}");
                None
            }
        };

        self.textures.insert(uri.to_string(), handle);
        handle
    }
}
