use std::num::NonZeroU32;

use generational_arena::Index;
use itertools::Itertools;
use wgpu::{
    BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout, BindGroupLayoutDescriptor,
    BindGroupLayoutEntry, Buffer, BufferBinding, BufferDescriptor, BufferUsages, Device, Extent3d,
    Sampler, SamplerBindingType, SamplerDescriptor, ShaderStages, Texture, TextureDescriptor,
    TextureFormat, TextureSampleType, TextureUsages, TextureView, TextureViewDescriptor,
    TextureViewDimension, VertexAttribute, VertexBufferLayout, VertexStepMode,
};

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct BindHandle(pub Index);

/// What a single binding slot holds. The gpu resource is created from this description when the
/// [Bind] is built.
#[derive(Clone, Debug)]
pub enum BindEntryType {
    BufferUniform {
        size: u64,
        usages: BufferUsages,
    },
    Sampler {
        binding_type: SamplerBindingType,
        descriptor: SamplerDescriptor<'static>,
    },
    Texture {
        sample_type: TextureSampleType,
        view_dimension: TextureViewDimension,
        sample_count: u32,
        format: TextureFormat,
        size: Extent3d,
        usage: TextureUsages,
    },
}

#[derive(Debug)]
pub enum BindEntryResource {
    Buffer(Buffer),
    Texture(Texture, TextureView),
    Sampler(Sampler),
}

impl BindEntryResource {
    pub fn buffer(&self) -> Option<&Buffer> {
        match self {
            BindEntryResource::Buffer(buffer) => Some(buffer),
            _ => None,
        }
    }

    pub fn sampler(&self) -> Option<&Sampler> {
        match self {
            BindEntryResource::Sampler(sampler) => Some(sampler),
            _ => None,
        }
    }

    pub fn texture(&self) -> Option<(&Texture, &TextureView)> {
        match self {
            BindEntryResource::Texture(texture, view) => Some((texture, view)),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct BindEntry {
    pub visibility: ShaderStages,
    pub ty: BindEntryType,
    pub count: Option<NonZeroU32>,
}

impl BindEntry {
    pub fn layout_entry(&self, binding: u32) -> BindGroupLayoutEntry {
        BindGroupLayoutEntry {
            binding,
            visibility: self.visibility,
            ty: match &self.ty {
                BindEntryType::BufferUniform { .. } => wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                BindEntryType::Sampler { binding_type, .. } => {
                    wgpu::BindingType::Sampler(*binding_type)
                }
                BindEntryType::Texture {
                    sample_type,
                    view_dimension,
                    sample_count,
                    ..
                } => wgpu::BindingType::Texture {
                    sample_type: *sample_type,
                    view_dimension: *view_dimension,
                    multisampled: *sample_count != 1,
                },
            },
            count: self.count,
        }
    }

    /// Pair this entry with its resource. `None` if the resource is of the wrong kind.
    pub fn group_entry<'b>(
        &self,
        binding: u32,
        resource: &'b BindEntryResource,
    ) -> Option<BindGroupEntry<'b>> {
        let binding_resource = match &self.ty {
            BindEntryType::BufferUniform { .. } => wgpu::BindingResource::Buffer(BufferBinding {
                buffer: resource.buffer()?,
                offset: 0,
                size: None,
            }),
            BindEntryType::Sampler { .. } => wgpu::BindingResource::Sampler(resource.sampler()?),
            BindEntryType::Texture { .. } => {
                wgpu::BindingResource::TextureView(resource.texture()?.1)
            }
        };

        Some(BindGroupEntry {
            binding,
            resource: binding_resource,
        })
    }

    pub fn binding_resource(&self, device: &Device) -> BindEntryResource {
        match &self.ty {
            BindEntryType::BufferUniform { size, usages } => {
                BindEntryResource::Buffer(device.create_buffer(&BufferDescriptor {
                    label: None,
                    size: *size,
                    usage: *usages,
                    mapped_at_creation: false,
                }))
            }
            BindEntryType::Sampler { descriptor, .. } => {
                BindEntryResource::Sampler(device.create_sampler(descriptor))
            }
            BindEntryType::Texture {
                view_dimension,
                sample_count,
                format,
                size,
                usage,
                ..
            } => {
                let texture = device.create_texture(&TextureDescriptor {
                    label: None,
                    size: *size,
                    mip_level_count: 1,
                    sample_count: *sample_count,
                    dimension: view_dimension.compatible_texture_dimension(),
                    format: *format,
                    usage: *usage,
                    view_formats: &[],
                });
                let view = texture.create_view(&TextureViewDescriptor::default());
                BindEntryResource::Texture(texture, view)
            }
        }
    }
}

/// A bind group together with its layout and the resources it owns.
///
/// Entry `i` is bound at binding index `i`.
#[derive(Debug)]
pub struct Bind {
    pub bg: BindGroup,
    pub bgl: BindGroupLayout,
    pub resources: Vec<BindEntryResource>,
    pub bind_entries: Vec<BindEntry>,
}

impl Bind {
    pub fn new(bind_entries: Vec<BindEntry>, device: &Device) -> Self {
        let layout_entries = bind_entries
            .iter()
            .enumerate()
            .map(|(idx, g)| g.layout_entry(idx as u32))
            .collect_vec();

        let bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: None,
            entries: &layout_entries,
        });
        let resources = bind_entries
            .iter()
            .map(|g| g.binding_resource(device))
            .collect_vec();
        let bg = create_bind_group(device, &bgl, &bind_entries, &resources);

        Self {
            bg,
            bgl,
            resources,
            bind_entries,
        }
    }

    pub fn resource(&self, binding: u32) -> Option<&BindEntryResource> {
        self.resources.get(binding as usize)
    }
}

fn create_bind_group(
    device: &Device,
    bgl: &BindGroupLayout,
    bind_entries: &[BindEntry],
    resources: &[BindEntryResource],
) -> BindGroup {
    // Resources are created from their own entries, so kinds always line up.
    let group_entries = bind_entries
        .iter()
        .zip(resources)
        .enumerate()
        .filter_map(|(idx, (entry, resource))| entry.group_entry(idx as u32, resource))
        .collect_vec();
    device.create_bind_group(&BindGroupDescriptor {
        label: None,
        layout: bgl,
        entries: &group_entries,
    })
}

pub struct VertexBufferEntry {
    pub array_stride: u64,
    pub step_mode: VertexStepMode,
    pub attributes: Vec<VertexAttribute>,
}

impl VertexBufferEntry {
    pub fn layout(&self) -> VertexBufferLayout {
        VertexBufferLayout {
            array_stride: self.array_stride,
            step_mode: self.step_mode,
            attributes: self.attributes.as_slice(),
        }
    }
}
