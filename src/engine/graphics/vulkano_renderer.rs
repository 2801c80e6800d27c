use crate::engine::graphics::MeshUploader;
use crate::engine::graphics::TextureUploader;
use crate::engine::graphics::mesh::CpuMesh;
use crate::engine::graphics::primitives::{MeshHandle, Shading, TextureHandle};
use crate::engine::graphics::render_assets::RenderAssets;
use crate::engine::graphics::visual_world::VisualWorld;
use std::sync::Arc;
use winit::window::Window;

mod vulkano_backend {
    use std::collections::HashMap;
    use std::mem::size_of;
    use std::sync::Arc;

    use crate::engine::graphics::mesh::{CpuMesh, CpuVertex};
    use crate::engine::graphics::pipeline_descriptor_set_layouts::PipelineDescriptorSetLayouts;
    use crate::engine::graphics::primitives::MeshHandle;
    use crate::engine::graphics::primitives::TextureHandle;
    use crate::engine::graphics::visual_world::VisualWorld;
    use vulkano::buffer::{Buffer, BufferContents, BufferCreateInfo, BufferUsage, Subbuffer};
    use vulkano::command_buffer::{
        AutoCommandBufferBuilder, CommandBufferUsage, CopyBufferInfo, PrimaryCommandBufferAbstract,
        RenderPassBeginInfo, SubpassBeginInfo, SubpassEndInfo,
        allocator::StandardCommandBufferAllocator,
    };
    use vulkano::descriptor_set::allocator::StandardDescriptorSetAllocator;
    use vulkano::descriptor_set::layout::DescriptorSetLayout;
    use vulkano::descriptor_set::{DescriptorSet, WriteDescriptorSet};
    use vulkano::device::Device;
    use vulkano::format::ClearValue;
    use vulkano::image::view::ImageView;
    use vulkano::image::{Image, ImageCreateInfo, ImageType, ImageUsage};
    use vulkano::memory::allocator::{
        AllocationCreateInfo, MemoryTypeFilter, StandardMemoryAllocator,
    };
    use vulkano::pipeline::graphics::color_blend::{
        AttachmentBlend, BlendFactor, BlendOp, ColorBlendAttachmentState, ColorBlendState,
        ColorComponents,
    };
    use vulkano::pipeline::graphics::depth_stencil::{DepthState, DepthStencilState};
    use vulkano::pipeline::graphics::input_assembly::InputAssemblyState;
    use vulkano::pipeline::graphics::multisample::MultisampleState;
    use vulkano::pipeline::graphics::rasterization::RasterizationState;
    use vulkano::pipeline::graphics::subpass::PipelineSubpassType;
    use vulkano::pipeline::graphics::vertex_input::{
        VertexInputAttributeDescription, VertexInputBindingDescription, VertexInputRate,
        VertexInputState,
    };
    use vulkano::pipeline::graphics::viewport::{Scissor, Viewport, ViewportState};
    use vulkano::pipeline::graphics::GraphicsPipelineCreateInfo;
    use vulkano::pipeline::layout::{PipelineLayout, PipelineLayoutCreateInfo};
    use vulkano::shader::EntryPoint;

    use vulkano::DeviceSize;
    use vulkano::command_buffer::CopyBufferToImageInfo;
    use vulkano::format::Format;
    use vulkano::image::sampler::{Filter, Sampler, SamplerAddressMode, SamplerCreateInfo};
    use vulkano::pipeline::{
        DynamicState, GraphicsPipeline, Pipeline, PipelineBindPoint, PipelineShaderStageCreateInfo,
    };
    use vulkano::render_pass::{Framebuffer, FramebufferCreateInfo, RenderPass, Subpass};
    use vulkano::swapchain::{self, Surface, Swapchain, SwapchainCreateInfo, SwapchainPresentInfo};
    use vulkano::sync::{self, GpuFuture};
    use vulkano::{Validated, VulkanError};
    use vulkano_util::context::{VulkanoConfig, VulkanoContext};
    use winit::window::Window;

    mod scene_mesh_vs {
        vulkano_shaders::shader! {
            ty: "vertex",
            path: "assets/shaders/scene-mesh.vert",
        }
    }

    mod scene_mesh_fs {
        vulkano_shaders::shader! {
            ty: "fragment",
            path: "assets/shaders/scene-mesh.frag",
        }
    }

    mod background_vs {
        vulkano_shaders::shader! {
            ty: "vertex",
            path: "assets/shaders/background.vert",
        }
    }

    mod background_fs {
        vulkano_shaders::shader! {
            ty: "fragment",
            path: "assets/shaders/background.frag",
        }
    }

    const DEPTH_FORMAT: Format = Format::D16_UNORM;
    const MAX_POINT_LIGHTS: usize = 64;

    #[derive(BufferContents, Clone, Copy, Debug, Default)]
    #[repr(C, align(16))]
    struct CameraUBO {
        view: [[f32; 4]; 4],
        proj: [[f32; 4]; 4],
        camera_pos: [f32; 4],
        // rgb summed ambient light, w unused
        ambient: [f32; 4],
    }

    #[derive(BufferContents, Clone, Copy, Debug, Default)]
    #[repr(C, align(16))]
    struct MaterialUBO {
        lit: u32,
        has_map: u32,
        has_normal_map: u32,
        _pad0: u32,
    }

    #[derive(BufferContents, Clone, Copy, Debug, Default)]
    #[repr(C, align(16))]
    struct GpuPointLight {
        // xyz position (world), w intensity
        pos_intensity: [f32; 4],
        // rgb color, w cutoff distance (0 = unlimited)
        color_distance: [f32; 4],
    }

    #[derive(BufferContents, Clone, Copy, Debug)]
    #[repr(C, align(16))]
    struct LightsSSBO {
        count: u32,
        _pad0: [u32; 3],
        lights: [GpuPointLight; MAX_POINT_LIGHTS],
    }

    impl Default for LightsSSBO {
        fn default() -> Self {
            Self {
                count: 0,
                _pad0: [0, 0, 0],
                lights: [GpuPointLight::default(); MAX_POINT_LIGHTS],
            }
        }
    }

    #[derive(
        BufferContents,
        vulkano::pipeline::graphics::vertex_input::Vertex,
        Clone,
        Copy,
        Debug,
        Default,
    )]
    #[repr(C)]
    struct InstanceData {
        #[format(R32G32B32A32_SFLOAT)]
        i_model_c0: [f32; 4],
        #[format(R32G32B32A32_SFLOAT)]
        i_model_c1: [f32; 4],
        #[format(R32G32B32A32_SFLOAT)]
        i_model_c2: [f32; 4],
        #[format(R32G32B32A32_SFLOAT)]
        i_model_c3: [f32; 4],
        #[format(R32G32B32A32_SFLOAT)]
        i_color: [f32; 4],
    }

    /// A draw batch with its GPU resources already resolved.
    #[derive(Debug, Clone, Copy)]
    pub struct ResolvedDraw {
        pub mesh: MeshHandle,
        pub map: Option<TextureHandle>,
        pub normal_map: Option<TextureHandle>,
        pub lit: bool,
        pub start: u32,
        pub count: u32,
    }

    struct VulkanoGpuMesh {
        vertices: Subbuffer<[CpuVertex]>,
        indices: Subbuffer<[u32]>,
        index_count: u32,
    }

    pub struct VulkanoState {
        context: VulkanoContext,
        window: Arc<Window>,
        swapchain: Arc<Swapchain>,
        render_pass: Arc<RenderPass>,
        framebuffers: Vec<Arc<Framebuffer>>,

        command_buffer_allocator: Arc<StandardCommandBufferAllocator>,
        descriptor_set_allocator: Arc<StandardDescriptorSetAllocator>,
        set_layouts: PipelineDescriptorSetLayouts,

        meshes: HashMap<MeshHandle, VulkanoGpuMesh>,
        textures: HashMap<TextureHandle, Arc<ImageView>>,
        sampler: Arc<Sampler>,
        background_sampler: Arc<Sampler>,
        default_white_texture: TextureHandle,

        pipeline_mesh: Arc<GraphicsPipeline>,
        pipeline_background: Arc<GraphicsPipeline>,

        pub window_resized: bool,
        recreate_swapchain: bool,
        previous_frame_end: Option<Box<dyn GpuFuture>>,
    }

    fn host_buffer_alloc() -> AllocationCreateInfo {
        AllocationCreateInfo {
            memory_type_filter: MemoryTypeFilter::PREFER_HOST
                | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
            ..Default::default()
        }
    }

    fn create_depth_view(
        allocator: Arc<StandardMemoryAllocator>,
        extent: [u32; 2],
    ) -> Result<Arc<ImageView>, Box<dyn std::error::Error>> {
        let image = Image::new(
            allocator,
            ImageCreateInfo {
                image_type: ImageType::Dim2d,
                format: DEPTH_FORMAT,
                extent: [extent[0], extent[1], 1],
                usage: ImageUsage::DEPTH_STENCIL_ATTACHMENT | ImageUsage::TRANSIENT_ATTACHMENT,
                ..Default::default()
            },
            AllocationCreateInfo::default(),
        )?;
        Ok(ImageView::new_default(image)?)
    }

    fn create_framebuffers(
        render_pass: &Arc<RenderPass>,
        images: Vec<Arc<Image>>,
        depth: &Arc<ImageView>,
    ) -> Result<Vec<Arc<Framebuffer>>, Box<dyn std::error::Error>> {
        images
            .into_iter()
            .map(|image| -> Result<Arc<Framebuffer>, Box<dyn std::error::Error>> {
                let view = ImageView::new_default(image)?;
                let fb = Framebuffer::new(
                    render_pass.clone(),
                    FramebufferCreateInfo {
                        attachments: vec![view, depth.clone()],
                        ..Default::default()
                    },
                )?;
                Ok(fb)
            })
            .collect()
    }

    /// Per-pipeline fixed-function settings; the rest of the state is shared.
    struct FixedFunction {
        vertex_input: VertexInputState,
        depth_stencil: DepthStencilState,
        blend: Option<AttachmentBlend>,
    }

    impl FixedFunction {
        /// Instanced meshes, depth tested, straight alpha so PNG transparency blends over what
        /// is behind it.
        fn mesh() -> Self {
            Self {
                vertex_input: mesh_vertex_input(),
                depth_stencil: DepthStencilState {
                    depth: Some(DepthState::simple()),
                    ..Default::default()
                },
                blend: Some(AttachmentBlend {
                    src_color_blend_factor: BlendFactor::SrcAlpha,
                    dst_color_blend_factor: BlendFactor::OneMinusSrcAlpha,
                    color_blend_op: BlendOp::Add,
                    src_alpha_blend_factor: BlendFactor::One,
                    dst_alpha_blend_factor: BlendFactor::OneMinusSrcAlpha,
                    alpha_blend_op: BlendOp::Add,
                }),
            }
        }

        /// Fullscreen triangle with no vertex buffers. No depth test or write: the background
        /// is drawn first and everything covers it.
        fn background() -> Self {
            Self {
                vertex_input: VertexInputState::new(),
                depth_stencil: DepthStencilState::default(),
                blend: None,
            }
        }
    }

    fn pipeline(
        device: &Arc<Device>,
        render_pass: &Arc<RenderPass>,
        vs: EntryPoint,
        fs: EntryPoint,
        set_layouts: Vec<Arc<DescriptorSetLayout>>,
        fixed: FixedFunction,
    ) -> Result<Arc<GraphicsPipeline>, Box<dyn std::error::Error>> {
        let layout = PipelineLayout::new(
            device.clone(),
            PipelineLayoutCreateInfo {
                set_layouts,
                ..Default::default()
            },
        )?;

        let subpass = Subpass::from(render_pass.clone(), 0).ok_or("missing subpass 0")?;
        let mut pipeline_ci = GraphicsPipelineCreateInfo::layout(layout);
        pipeline_ci.stages = [
            PipelineShaderStageCreateInfo::new(vs),
            PipelineShaderStageCreateInfo::new(fs),
        ]
        .into_iter()
        .collect();
        pipeline_ci.vertex_input_state = Some(fixed.vertex_input);
        pipeline_ci.input_assembly_state = Some(InputAssemblyState::default());
        pipeline_ci.viewport_state = Some(ViewportState::default());
        pipeline_ci.rasterization_state = Some(RasterizationState::default());
        pipeline_ci.multisample_state = Some(MultisampleState::default());
        pipeline_ci.depth_stencil_state = Some(fixed.depth_stencil);
        pipeline_ci.color_blend_state = Some(ColorBlendState::with_attachment_states(
            1,
            ColorBlendAttachmentState {
                blend: fixed.blend,
                color_write_enable: true,
                color_write_mask: ColorComponents::all(),
            },
        ));
        pipeline_ci.dynamic_state = [DynamicState::Viewport, DynamicState::Scissor]
            .into_iter()
            .collect();
        pipeline_ci.subpass = Some(PipelineSubpassType::BeginRenderPass(subpass));

        Ok(GraphicsPipeline::new(device.clone(), None, pipeline_ci)?)
    }

    fn mesh_vertex_input() -> VertexInputState {
        let mut state = VertexInputState::new()
            .binding(
                0,
                VertexInputBindingDescription {
                    stride: size_of::<CpuVertex>() as u32,
                    input_rate: VertexInputRate::Vertex,
                    ..Default::default()
                },
            )
            .binding(
                1,
                VertexInputBindingDescription {
                    stride: size_of::<InstanceData>() as u32,
                    input_rate: VertexInputRate::Instance { divisor: 1 },
                    ..Default::default()
                },
            );

        // CpuVertex: pos, normal, uv
        for (location, format, offset) in [
            (0, Format::R32G32B32_SFLOAT, 0),
            (1, Format::R32G32B32_SFLOAT, 12),
            (2, Format::R32G32_SFLOAT, 24),
        ] {
            state = state.attribute(
                location,
                VertexInputAttributeDescription {
                    binding: 0,
                    format,
                    offset,
                    ..Default::default()
                },
            );
        }

        // InstanceData: four model columns then colour, locations 3-7.
        for i in 0..5u32 {
            state = state.attribute(
                3 + i,
                VertexInputAttributeDescription {
                    binding: 1,
                    format: Format::R32G32B32A32_SFLOAT,
                    offset: 16 * i,
                    ..Default::default()
                },
            );
        }

        state
    }

    impl VulkanoState {
        pub fn new(window: Arc<Window>) -> Result<Self, Box<dyn std::error::Error>> {
            let context = VulkanoContext::new(VulkanoConfig::default());
            let device = context.device().clone();

            let surface = Surface::from_window(device.instance().clone(), window.clone())?;

            let surface_capabilities = device
                .physical_device()
                .surface_capabilities(&surface, Default::default())?;

            // Textures are uploaded as UNORM, so prefer a UNORM target and keep colours as authored.
            let formats = device
                .physical_device()
                .surface_formats(&surface, Default::default())?;
            let image_format = formats
                .iter()
                .map(|(f, _)| *f)
                .find(|f| *f == Format::B8G8R8A8_UNORM || *f == Format::R8G8B8A8_UNORM)
                .or_else(|| formats.first().map(|(f, _)| *f))
                .ok_or("no supported surface formats")?;

            let mut min_image_count = 2u32.max(surface_capabilities.min_image_count);
            if let Some(max_image_count) = surface_capabilities.max_image_count {
                min_image_count = min_image_count.min(max_image_count);
            }

            let (swapchain, images) = Swapchain::new(
                device.clone(),
                surface,
                SwapchainCreateInfo {
                    min_image_count,
                    image_format,
                    image_extent: window.inner_size().into(),
                    image_usage: ImageUsage::COLOR_ATTACHMENT,
                    composite_alpha: surface_capabilities
                        .supported_composite_alpha
                        .into_iter()
                        .next()
                        .ok_or("no supported composite alpha")?,
                    ..Default::default()
                },
            )?;

            let render_pass = vulkano::single_pass_renderpass!(
                device.clone(),
                attachments: {
                    color: {
                        format: swapchain.image_format(),
                        samples: 1,
                        load_op: Clear,
                        store_op: Store,
                    },
                    depth: {
                        format: DEPTH_FORMAT,
                        samples: 1,
                        load_op: Clear,
                        store_op: DontCare,
                    },
                },
                pass: {
                    color: [color],
                    depth_stencil: {depth},
                }
            )?;

            let depth_view =
                create_depth_view(context.memory_allocator().clone(), swapchain.image_extent())?;
            let framebuffers = create_framebuffers(&render_pass, images, &depth_view)?;

            let set_layouts = PipelineDescriptorSetLayouts::new(device.clone())?;

            let mesh_vs = scene_mesh_vs::load(device.clone())?
                .entry_point("main")
                .ok_or("missing scene-mesh.vert entry point")?;
            let mesh_fs = scene_mesh_fs::load(device.clone())?
                .entry_point("main")
                .ok_or("missing scene-mesh.frag entry point")?;

            let pipeline_mesh = pipeline(
                &device,
                &render_pass,
                mesh_vs,
                mesh_fs,
                vec![set_layouts.global.clone(), set_layouts.material.clone()],
                FixedFunction::mesh(),
            )?;

            let bg_vs = background_vs::load(device.clone())?
                .entry_point("main")
                .ok_or("missing background.vert entry point")?;
            let bg_fs = background_fs::load(device.clone())?
                .entry_point("main")
                .ok_or("missing background.frag entry point")?;

            let pipeline_background = pipeline(
                &device,
                &render_pass,
                bg_vs,
                bg_fs,
                vec![set_layouts.background.clone()],
                FixedFunction::background(),
            )?;

            let command_buffer_allocator = Arc::new(StandardCommandBufferAllocator::new(
                device.clone(),
                Default::default(),
            ));

            let descriptor_set_allocator = Arc::new(StandardDescriptorSetAllocator::new(
                device.clone(),
                Default::default(),
            ));

            let sampler = Sampler::new(device.clone(), SamplerCreateInfo::simple_repeat_linear())?;
            let background_sampler = Sampler::new(
                device.clone(),
                SamplerCreateInfo {
                    mag_filter: Filter::Linear,
                    min_filter: Filter::Linear,
                    address_mode: [SamplerAddressMode::ClampToEdge; 3],
                    ..Default::default()
                },
            )?;

            let mut state = Self {
                context,
                window,
                swapchain,
                render_pass,
                framebuffers,

                command_buffer_allocator,
                descriptor_set_allocator,
                set_layouts,

                meshes: HashMap::new(),
                textures: HashMap::new(),
                sampler,
                background_sampler,
                default_white_texture: TextureHandle(0),

                pipeline_mesh,
                pipeline_background,

                window_resized: false,
                recreate_swapchain: false,
                previous_frame_end: Some(sync::now(device).boxed()),
            };

            // 1x1 white so untextured materials can still bind a sampler.
            state.upload_texture_rgba8(TextureHandle(0), &[255, 255, 255, 255], 1, 1)?;

            Ok(state)
        }

        fn recreate_swapchain_if_needed(&mut self) -> Result<(), Box<dyn std::error::Error>> {
            if !(self.window_resized || self.recreate_swapchain) {
                return Ok(());
            }

            self.recreate_swapchain = false;
            let new_dimensions = self.window.inner_size();
            if new_dimensions.width == 0 || new_dimensions.height == 0 {
                // Minimized; try again once the window has a size.
                return Ok(());
            }

            let (new_swapchain, new_images) = match self.swapchain.recreate(SwapchainCreateInfo {
                image_extent: new_dimensions.into(),
                ..self.swapchain.create_info()
            }) {
                Ok(r) => r,
                Err(e) => {
                    self.recreate_swapchain = true;
                    log::warn!("failed to recreate swapchain: {}", Validated::unwrap(e));
                    return Ok(());
                }
            };

            self.swapchain = new_swapchain;
            let depth_view = create_depth_view(
                self.context.memory_allocator().clone(),
                self.swapchain.image_extent(),
            )?;
            self.framebuffers = create_framebuffers(&self.render_pass, new_images, &depth_view)?;

            self.window_resized = false;
            Ok(())
        }

        pub fn render(
            &mut self,
            visual_world: &VisualWorld,
            draws: &[ResolvedDraw],
            background: Option<TextureHandle>,
        ) -> Result<(), Box<dyn std::error::Error>> {
            self.recreate_swapchain_if_needed()?;

            let device = self.context.device().clone();
            let queue = self.context.graphics_queue().clone();
            let allocator = self.context.memory_allocator().clone();

            if let Some(previous_frame_end) = self.previous_frame_end.as_mut() {
                previous_frame_end.cleanup_finished();
            }

            let (image_i, suboptimal, acquire_future) =
                match swapchain::acquire_next_image(self.swapchain.clone(), None)
                    .map_err(Validated::unwrap)
                {
                    Ok(r) => r,
                    Err(VulkanError::OutOfDate) => {
                        self.recreate_swapchain = true;
                        return Ok(());
                    }
                    Err(e) => return Err(Box::new(e)),
                };

            if suboptimal {
                self.recreate_swapchain = true;
            }

            let instance_buffer: Option<Subbuffer<[InstanceData]>> =
                if visual_world.instances().is_empty() {
                    None
                } else {
                    Some(Buffer::from_iter(
                        allocator.clone(),
                        BufferCreateInfo {
                            usage: BufferUsage::VERTEX_BUFFER,
                            ..Default::default()
                        },
                        host_buffer_alloc(),
                        visual_world.instances().iter().map(|inst| InstanceData {
                            i_model_c0: inst.model[0],
                            i_model_c1: inst.model[1],
                            i_model_c2: inst.model[2],
                            i_model_c3: inst.model[3],
                            i_color: inst.color,
                        }),
                    )?)
                };

            let [cx, cy, cz] = visual_world.camera_position();
            let [ar, ag, ab] = visual_world.ambient();
            let camera_buffer: Subbuffer<CameraUBO> = Buffer::from_data(
                allocator.clone(),
                BufferCreateInfo {
                    usage: BufferUsage::UNIFORM_BUFFER,
                    ..Default::default()
                },
                host_buffer_alloc(),
                CameraUBO {
                    view: visual_world.camera_view(),
                    proj: visual_world.camera_proj(),
                    camera_pos: [cx, cy, cz, 1.0],
                    ambient: [ar, ag, ab, 0.0],
                },
            )?;

            let mut lights_ssbo = LightsSSBO::default();
            let lights = visual_world.point_lights();
            let count = lights.len().min(MAX_POINT_LIGHTS);
            lights_ssbo.count = count as u32;
            for (slot, l) in lights_ssbo.lights.iter_mut().zip(lights.iter().take(count)) {
                let [x, y, z] = l.position_ws;
                let [r, g, b] = l.color;
                *slot = GpuPointLight {
                    pos_intensity: [x, y, z, l.intensity],
                    color_distance: [r, g, b, 0.0],
                };
            }

            let lights_buffer: Subbuffer<LightsSSBO> = Buffer::from_data(
                allocator.clone(),
                BufferCreateInfo {
                    usage: BufferUsage::STORAGE_BUFFER,
                    ..Default::default()
                },
                host_buffer_alloc(),
                lights_ssbo,
            )?;

            let global_set = DescriptorSet::new(
                self.descriptor_set_allocator.clone(),
                self.set_layouts.global.clone(),
                [
                    WriteDescriptorSet::buffer(0, camera_buffer),
                    WriteDescriptorSet::buffer(1, lights_buffer),
                ],
                [],
            )?;

            let framebuffer = self.framebuffers[image_i as usize].clone();
            let mut render_pass_begin = RenderPassBeginInfo::framebuffer(framebuffer);
            render_pass_begin.clear_values = vec![
                Some(ClearValue::from([0.0f32, 0.0, 0.0, 1.0])),
                Some(ClearValue::from(1.0f32)),
            ];

            let extent = self.swapchain.image_extent();
            let viewport = Viewport {
                offset: [0.0, 0.0],
                extent: [extent[0] as f32, extent[1] as f32],
                depth_range: 0.0..=1.0,
                ..Default::default()
            };

            let mut cbb = AutoCommandBufferBuilder::primary(
                self.command_buffer_allocator.clone(),
                queue.queue_family_index(),
                CommandBufferUsage::OneTimeSubmit,
            )?;

            cbb.begin_render_pass(render_pass_begin, SubpassBeginInfo::default())?;

            cbb.set_viewport(0, vec![viewport].into())?;
            cbb.set_scissor(
                0,
                vec![Scissor {
                    offset: [0, 0],
                    extent: [extent[0], extent[1]],
                    ..Default::default()
                }]
                .into(),
            )?;

            if let Some(view) = background.and_then(|h| self.textures.get(&h)) {
                let background_set = DescriptorSet::new(
                    self.descriptor_set_allocator.clone(),
                    self.set_layouts.background.clone(),
                    [WriteDescriptorSet::image_view_sampler(
                        0,
                        view.clone(),
                        self.background_sampler.clone(),
                    )],
                    [],
                )?;

                cbb.bind_pipeline_graphics(self.pipeline_background.clone())?;
                cbb.bind_descriptor_sets(
                    PipelineBindPoint::Graphics,
                    self.pipeline_background.layout().clone(),
                    0,
                    background_set,
                )?;
                unsafe {
                    cbb.draw(3, 1, 0, 0)?;
                }
            }

            if let Some(instance_buffer) = instance_buffer {
                cbb.bind_pipeline_graphics(self.pipeline_mesh.clone())?;

                for draw in draws {
                    let Some(mesh) = self.meshes.get(&draw.mesh) else {
                        continue;
                    };
                    let Some(white) = self.textures.get(&self.default_white_texture) else {
                        continue;
                    };
                    let map = draw
                        .map
                        .and_then(|h| self.textures.get(&h))
                        .unwrap_or(white);
                    let normal_map = draw
                        .normal_map
                        .and_then(|h| self.textures.get(&h))
                        .unwrap_or(white);

                    let material_buffer: Subbuffer<MaterialUBO> = Buffer::from_data(
                        allocator.clone(),
                        BufferCreateInfo {
                            usage: BufferUsage::UNIFORM_BUFFER,
                            ..Default::default()
                        },
                        host_buffer_alloc(),
                        MaterialUBO {
                            lit: draw.lit as u32,
                            has_map: draw.map.is_some() as u32,
                            has_normal_map: draw.normal_map.is_some() as u32,
                            _pad0: 0,
                        },
                    )?;

                    let material_set = DescriptorSet::new(
                        self.descriptor_set_allocator.clone(),
                        self.set_layouts.material.clone(),
                        [
                            WriteDescriptorSet::buffer(0, material_buffer),
                            WriteDescriptorSet::image_view_sampler(
                                1,
                                map.clone(),
                                self.sampler.clone(),
                            ),
                            WriteDescriptorSet::image_view_sampler(
                                2,
                                normal_map.clone(),
                                self.sampler.clone(),
                            ),
                        ],
                        [],
                    )?;

                    cbb.bind_descriptor_sets(
                        PipelineBindPoint::Graphics,
                        self.pipeline_mesh.layout().clone(),
                        0,
                        (global_set.clone(), material_set),
                    )?;
                    cbb.bind_vertex_buffers(0, (mesh.vertices.clone(), instance_buffer.clone()))?;
                    cbb.bind_index_buffer(mesh.indices.clone())?;

                    unsafe {
                        cbb.draw_indexed(mesh.index_count, draw.count, 0, 0, draw.start)?;
                    }
                }
            }

            cbb.end_render_pass(SubpassEndInfo::default())?;

            let cb = cbb.build()?;

            let start_future: Box<dyn GpuFuture> = self
                .previous_frame_end
                .take()
                .unwrap_or_else(|| sync::now(device.clone()).boxed());

            let execution = start_future
                .join(acquire_future)
                .then_execute(queue.clone(), cb)?
                .then_swapchain_present(
                    queue.clone(),
                    SwapchainPresentInfo::swapchain_image_index(self.swapchain.clone(), image_i),
                )
                .then_signal_fence_and_flush();

            match execution.map_err(Validated::unwrap) {
                Ok(future) => {
                    self.previous_frame_end = Some(future.boxed());
                }
                Err(VulkanError::OutOfDate) => {
                    self.recreate_swapchain = true;
                    self.previous_frame_end = Some(sync::now(device).boxed());
                }
                Err(e) => {
                    log::error!("failed to flush frame: {e}");
                    self.previous_frame_end = Some(sync::now(device).boxed());
                }
            }

            Ok(())
        }

        fn upload_image(
            &mut self,
            handle: TextureHandle,
            data: &[u8],
            format: Format,
            width: u32,
            height: u32,
        ) -> Result<(), Box<dyn std::error::Error>> {
            let memory_allocator = self.context.memory_allocator().clone();
            let queue = self.context.graphics_queue().clone();

            let staging = Buffer::from_iter(
                memory_allocator.clone(),
                BufferCreateInfo {
                    usage: BufferUsage::TRANSFER_SRC,
                    ..Default::default()
                },
                host_buffer_alloc(),
                data.iter().copied(),
            )?;

            let image = Image::new(
                memory_allocator,
                ImageCreateInfo {
                    image_type: ImageType::Dim2d,
                    format,
                    extent: [width, height, 1],
                    usage: ImageUsage::TRANSFER_DST | ImageUsage::SAMPLED,
                    ..Default::default()
                },
                AllocationCreateInfo {
                    memory_type_filter: MemoryTypeFilter::PREFER_DEVICE,
                    ..Default::default()
                },
            )?;

            let mut cbb = AutoCommandBufferBuilder::primary(
                self.command_buffer_allocator.clone(),
                queue.queue_family_index(),
                CommandBufferUsage::OneTimeSubmit,
            )?;

            cbb.copy_buffer_to_image(CopyBufferToImageInfo::buffer_image(staging, image.clone()))?;

            cbb.build()?
                .execute(queue.clone())?
                .then_signal_fence_and_flush()?
                .wait(None)?;

            self.textures.insert(handle, ImageView::new_default(image)?);
            Ok(())
        }

        pub fn upload_texture_rgba8(
            &mut self,
            handle: TextureHandle,
            rgba: &[u8],
            width: u32,
            height: u32,
        ) -> Result<(), Box<dyn std::error::Error>> {
            if self.textures.contains_key(&handle) {
                return Ok(());
            }

            if width == 0 || height == 0 {
                return Err("texture has zero size".into());
            }

            let expected_len = width as usize * height as usize * 4;
            if rgba.len() != expected_len {
                return Err(format!(
                    "texture rgba length mismatch: got={}, expected={}",
                    rgba.len(),
                    expected_len
                )
                .into());
            }

            self.upload_image(handle, rgba, Format::R8G8B8A8_UNORM, width, height)
        }

        pub fn upload_mesh(
            &mut self,
            handle: MeshHandle,
            mesh: &CpuMesh,
        ) -> Result<(), Box<dyn std::error::Error>> {
            if self.meshes.contains_key(&handle) {
                return Ok(());
            }

            if mesh.vertices.is_empty() {
                return Err("mesh has no vertices".into());
            }
            if mesh.indices_u32.is_empty() {
                return Err("mesh has no indices".into());
            }

            let memory_allocator = self.context.memory_allocator().clone();
            let queue = self.context.graphics_queue().clone();

            let vertices_src = Buffer::from_iter(
                memory_allocator.clone(),
                BufferCreateInfo {
                    usage: BufferUsage::TRANSFER_SRC,
                    ..Default::default()
                },
                host_buffer_alloc(),
                mesh.vertices.iter().copied(),
            )?;

            let indices_src = Buffer::from_iter(
                memory_allocator.clone(),
                BufferCreateInfo {
                    usage: BufferUsage::TRANSFER_SRC,
                    ..Default::default()
                },
                host_buffer_alloc(),
                mesh.indices_u32.iter().copied(),
            )?;

            let vertices_dst = Buffer::new_slice::<CpuVertex>(
                memory_allocator.clone(),
                BufferCreateInfo {
                    usage: BufferUsage::VERTEX_BUFFER | BufferUsage::TRANSFER_DST,
                    ..Default::default()
                },
                AllocationCreateInfo {
                    memory_type_filter: MemoryTypeFilter::PREFER_DEVICE,
                    ..Default::default()
                },
                mesh.vertices.len() as DeviceSize,
            )?;

            let indices_dst = Buffer::new_slice::<u32>(
                memory_allocator,
                BufferCreateInfo {
                    usage: BufferUsage::INDEX_BUFFER | BufferUsage::TRANSFER_DST,
                    ..Default::default()
                },
                AllocationCreateInfo {
                    memory_type_filter: MemoryTypeFilter::PREFER_DEVICE,
                    ..Default::default()
                },
                mesh.indices_u32.len() as DeviceSize,
            )?;

            let mut cbb = AutoCommandBufferBuilder::primary(
                self.command_buffer_allocator.clone(),
                queue.queue_family_index(),
                CommandBufferUsage::OneTimeSubmit,
            )?;

            cbb.copy_buffer(CopyBufferInfo::buffers(vertices_src, vertices_dst.clone()))?;
            cbb.copy_buffer(CopyBufferInfo::buffers(indices_src, indices_dst.clone()))?;

            cbb.build()?
                .execute(queue.clone())?
                .then_signal_fence_and_flush()?
                .wait(None)?;

            self.meshes.insert(
                handle,
                VulkanoGpuMesh {
                    vertices: vertices_dst,
                    indices: indices_dst,
                    index_count: mesh.index_count(),
                },
            );
            log::debug!(
                "uploaded mesh {:?}: {} vertices, {} indices",
                handle,
                mesh.vertex_count(),
                mesh.index_count()
            );

            Ok(())
        }
    }

}

const NOT_INITIALIZED: &str = "VulkanoRenderer not initialized (call init_for_window first)";

/// Vulkano-only renderer.
///
/// GPU meshes and textures are created on demand through `RenderAssets`, which calls back into
/// this type's `MeshUploader`/`TextureUploader` impls.
pub struct VulkanoRenderer {
    vulkano: Option<vulkano_backend::VulkanoState>,
    next_mesh_handle: u32,
    next_texture_handle: u32,
    did_log_first_frame: bool,
}

impl Default for VulkanoRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl VulkanoRenderer {
    pub fn new() -> Self {
        Self {
            vulkano: None,
            next_mesh_handle: 0,
            // Handle 0 is the default white texture.
            next_texture_handle: 1,
            did_log_first_frame: false,
        }
    }

    pub fn init_for_window(
        &mut self,
        window: &Arc<Window>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if self.vulkano.is_none() {
            self.vulkano = Some(vulkano_backend::VulkanoState::new(window.clone())?);
            log::info!("swapchain and pipelines initialized");
        }

        Ok(())
    }

    pub fn resize(&mut self, size: winit::dpi::PhysicalSize<u32>) {
        log::debug!("resize to {}x{}", size.width, size.height);
        if let Some(vulkano) = self.vulkano.as_mut() {
            vulkano.window_resized = true;
        }
    }

    /// Draw one frame of `visual_world`, uploading any meshes or textures it needs first.
    pub fn render(
        &mut self,
        visual_world: &VisualWorld,
        assets: &mut RenderAssets,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if self.vulkano.is_none() {
            return Err(NOT_INITIALIZED.into());
        }

        let mut draws = Vec::with_capacity(visual_world.draw_batches().len());
        for batch in visual_world.draw_batches() {
            let Some(material) = visual_world.material(batch.material) else {
                continue;
            };

            let mesh = assets.gpu_mesh_handle(self, batch.mesh)?;
            let map = material
                .map
                .as_deref()
                .and_then(|uri| assets.texture_handle(self, uri));
            let normal_map = material
                .normal_map
                .as_deref()
                .and_then(|uri| assets.texture_handle(self, uri));

            draws.push(vulkano_backend::ResolvedDraw {
                mesh,
                map,
                normal_map,
                lit: material.shading == Shading::Standard,
                start: batch.start,
                count: batch.count,
            });
        }

        let background = visual_world
            .background()
            .and_then(|uri| assets.texture_handle(self, uri));

        if !self.did_log_first_frame {
            self.did_log_first_frame = true;
            log::info!(
                "first frame: {} draws, {} instances",
                draws.len(),
                visual_world.instances().len()
            );
        }

        let vulkano = self.vulkano.as_mut().ok_or(NOT_INITIALIZED)?;
        vulkano.render(visual_world, &draws, background)
    }
}

impl MeshUploader for VulkanoRenderer {
    fn upload_mesh(&mut self, mesh: &CpuMesh) -> Result<MeshHandle, Box<dyn std::error::Error>> {
        let vulkano = self.vulkano.as_mut().ok_or(NOT_INITIALIZED)?;

        let handle = MeshHandle(self.next_mesh_handle);
        self.next_mesh_handle = self.next_mesh_handle.wrapping_add(1);

        vulkano.upload_mesh(handle, mesh)?;
        Ok(handle)
    }
}

impl TextureUploader for VulkanoRenderer {
    fn upload_texture_rgba8(
        &mut self,
        rgba: &[u8],
        width: u32,
        height: u32,
    ) -> Result<TextureHandle, Box<dyn std::error::Error>> {
        let vulkano = self.vulkano.as_mut().ok_or(NOT_INITIALIZED)?;

        let handle = TextureHandle(self.next_texture_handle);
        self.next_texture_handle = self.next_texture_handle.wrapping_add(1);

        vulkano.upload_texture_rgba8(handle, rgba, width, height)?;
        Ok(handle)
    }
}
