pub mod mesh;
pub mod pipeline_descriptor_set_layouts;
pub mod primitives;
pub mod render_assets;
pub mod texture_loader;
pub mod visual_world;
pub mod vulkano_renderer;

pub use mesh::CpuMesh;
pub use primitives::{MeshHandle, TextureHandle};
pub use render_assets::RenderAssets;
pub use visual_world::VisualWorld;
pub use vulkano_renderer::VulkanoRenderer as Renderer;

/// Uploads CPU meshes into renderer-owned GPU buffers.
pub trait MeshUploader {
    fn upload_mesh(&mut self, mesh: &CpuMesh) -> Result<MeshHandle, Box<dyn std::error::Error>>;
}

/// Uploads decoded texture data into renderer-owned GPU images.
pub trait TextureUploader {
    fn upload_texture_rgba8(
        &mut self,
        rgba: &[u8],
        width: u32,
        height: u32,
    ) -> Result<TextureHandle, Box<dyn std::error::Error>>;
}
