use std::collections::BTreeMap;
use std::sync::Arc;

use vulkano::descriptor_set::layout::{
    DescriptorSetLayout, DescriptorSetLayoutBinding, DescriptorSetLayoutCreateInfo, DescriptorType,
};
use vulkano::device::Device;
use vulkano::shader::ShaderStages;

pub struct PipelineDescriptorSetLayouts {
    /// Mesh set 0: per-frame data (camera, lights).
    pub global: Arc<DescriptorSetLayout>,

    /// Mesh set 1: material params, colour map, normal map.
    pub material: Arc<DescriptorSetLayout>,

    /// Background set 0: the background image.
    pub background: Arc<DescriptorSetLayout>,
}

fn binding(ty: DescriptorType, stages: ShaderStages) -> DescriptorSetLayoutBinding {
    let mut b = DescriptorSetLayoutBinding::descriptor_type(ty);
    b.descriptor_count = 1;
    b.stages = stages;
    b
}

fn layout(
    device: &Arc<Device>,
    bindings: BTreeMap<u32, DescriptorSetLayoutBinding>,
) -> Result<Arc<DescriptorSetLayout>, Box<dyn std::error::Error>> {
    Ok(DescriptorSetLayout::new(
        device.clone(),
        DescriptorSetLayoutCreateInfo {
            bindings,
            ..Default::default()
        },
    )?)
}

impl PipelineDescriptorSetLayouts {
    pub fn new(device: Arc<Device>) -> Result<Self, Box<dyn std::error::Error>> {
        // Set 0 (global):
        // - binding 0: camera + ambient UBO, read in both stages
        // - binding 1: point lights SSBO
        let global = layout(
            &device,
            BTreeMap::from([
                (
                    0,
                    binding(
                        DescriptorType::UniformBuffer,
                        ShaderStages::VERTEX | ShaderStages::FRAGMENT,
                    ),
                ),
                (
                    1,
                    binding(DescriptorType::StorageBuffer, ShaderStages::FRAGMENT),
                ),
            ]),
        )?;

        // Set 1 (material):
        // - binding 0: MaterialUBO
        // - binding 1: colour map
        // - binding 2: normal map
        let material = layout(
            &device,
            BTreeMap::from([
                (
                    0,
                    binding(DescriptorType::UniformBuffer, ShaderStages::FRAGMENT),
                ),
                (
                    1,
                    binding(DescriptorType::CombinedImageSampler, ShaderStages::FRAGMENT),
                ),
                (
                    2,
                    binding(DescriptorType::CombinedImageSampler, ShaderStages::FRAGMENT),
                ),
            ]),
        )?;

        let background = layout(
            &device,
            BTreeMap::from([(
                0,
                binding(DescriptorType::CombinedImageSampler, ShaderStages::FRAGMENT),
            )]),
        )?;

        Ok(Self {
            global,
            material,
            background,
        })
    }
}
