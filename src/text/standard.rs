use wgpu::{
    vertex_attr_array, AddressMode, BlendComponent, BlendFactor, BlendOperation, BlendState,
    BufferUsages, Extent3d, FilterMode, RenderPass, SamplerBindingType, SamplerDescriptor,
    ShaderStages, TextureFormat, TextureSampleType, TextureUsages, TextureViewDimension,
    VertexAttribute, VertexStepMode,
};

use super::{
    font::{FontFace, FontMetrics},
    technique::{Technique, TechniqueBinding, TechniqueError},
};
use crate::{
    bind::{BindEntry, BindEntryType, BindHandle},
    camera::TextUniform,
    pipeline::{PipelineBuilder, PipelineHandle},
    plain::Plain,
    render::Render,
    shader::{StageKind, TEXT_FRAGMENT, TEXT_VERTEX},
};

/// Source-over for colour, while the target keeps the glyph's coverage as its alpha.
pub const TEXT_BLEND: BlendState = BlendState {
    color: BlendComponent {
        src_factor: BlendFactor::SrcAlpha,
        dst_factor: BlendFactor::OneMinusSrcAlpha,
        operation: BlendOperation::Add,
    },
    alpha: BlendComponent {
        src_factor: BlendFactor::One,
        dst_factor: BlendFactor::Zero,
        operation: BlendOperation::Add,
    },
};

pub const POSITION_ATTRIBUTES: [VertexAttribute; 1] = vertex_attr_array![0 => Float32x3];
pub const COLOR_ATTRIBUTES: [VertexAttribute; 1] = vertex_attr_array![1 => Float32x3];
pub const TEX_COORD_ATTRIBUTES: [VertexAttribute; 1] = vertex_attr_array![2 => Float32x2];

pub const ATLAS_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;

/// Alpha blended, depth tested, textured glyph quads sampling the font atlas.
///
/// Bind group 0 holds the atlas texture and its sampler, bind group 1 the [TextUniform].
/// Vertex buffers are expected in slots 0, 1 and 2 for position, colour and texture coordinate.
#[derive(Debug)]
pub struct StandardTechnique {
    pipeline: PipelineHandle,
    atlas_bind: BindHandle,
    uniform_bind: BindHandle,
    metrics: FontMetrics,
}

impl StandardTechnique {
    pub fn pipeline(&self) -> PipelineHandle {
        self.pipeline
    }

    pub fn atlas_bind(&self) -> BindHandle {
        self.atlas_bind
    }

    pub fn uniform_bind(&self) -> BindHandle {
        self.uniform_bind
    }

    /// Metrics of the font this technique was built for.
    pub fn metrics(&self) -> FontMetrics {
        self.metrics
    }

    pub fn write_uniform(&self, render: &Render, uniform: &TextUniform) -> anyhow::Result<()> {
        render.write_buffer(uniform.as_bytes(), self.uniform_bind, 0)
    }
}

fn atlas_entries(width: u32, height: u32) -> [BindEntry; 2] {
    [
        BindEntry {
            visibility: ShaderStages::FRAGMENT,
            ty: BindEntryType::Texture {
                sample_type: TextureSampleType::Float { filterable: true },
                view_dimension: TextureViewDimension::D2,
                sample_count: 1,
                format: ATLAS_FORMAT,
                size: Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                usage: TextureUsages::COPY_DST | TextureUsages::TEXTURE_BINDING,
            },
            count: None,
        },
        BindEntry {
            visibility: ShaderStages::FRAGMENT,
            ty: BindEntryType::Sampler {
                binding_type: SamplerBindingType::Filtering,
                descriptor: SamplerDescriptor {
                    address_mode_u: AddressMode::ClampToEdge,
                    address_mode_v: AddressMode::ClampToEdge,
                    mag_filter: FilterMode::Linear,
                    min_filter: FilterMode::Linear,
                    ..Default::default()
                },
            },
            count: None,
        },
    ]
}

fn uniform_entries() -> [BindEntry; 1] {
    [BindEntry {
        visibility: ShaderStages::VERTEX,
        ty: BindEntryType::BufferUniform {
            size: std::mem::size_of::<TextUniform>() as u64,
            usages: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        },
        count: None,
    }]
}

impl Technique for StandardTechnique {
    type Context = Render;

    fn create(face: &FontFace, render: &mut Render) -> Result<Self, TechniqueError> {
        let vertex = render.compile_shader(TEXT_VERTEX, StageKind::Vertex)?;
        let fragment = render.compile_shader(TEXT_FRAGMENT, StageKind::Fragment)?;

        let atlas = face.atlas();
        if atlas.width() == 0 || atlas.height() == 0 {
            return Err(TechniqueError::Atlas(anyhow::anyhow!(
                "atlas of font '{}' is empty",
                face.name()
            )));
        }

        let atlas_bind = render.build_bind(&atlas_entries(atlas.width(), atlas.height()));
        let uniform_bind = render.build_bind(&uniform_entries());

        let built = render
            .write_texture(atlas, atlas_bind, 0)
            .and_then(|_| render.write_buffer(TextUniform::default().as_bytes(), uniform_bind, 0))
            .map_err(TechniqueError::Atlas)
            .and_then(|_| {
                PipelineBuilder::new()
                    .with_label("text")
                    .with_cull_mode(None)
                    .with_vertex_stage(&vertex)
                    .with_fragment_stage(&fragment)
                    .with_blend(Some(TEXT_BLEND))
                    .with_depth(render.depth_format())
                    .with_sample_count(render.sample_count())
                    .with_bind(atlas_bind)
                    .with_bind(uniform_bind)
                    .with_vb::<[f32; 3]>(VertexStepMode::Vertex, &POSITION_ATTRIBUTES)
                    .with_vb::<[f32; 3]>(VertexStepMode::Vertex, &COLOR_ATTRIBUTES)
                    .with_vb::<[f32; 2]>(VertexStepMode::Vertex, &TEX_COORD_ATTRIBUTES)
                    .build(render)
                    .map_err(TechniqueError::from)
            });

        let pipeline = match built {
            Ok(pipeline) => pipeline,
            Err(err) => {
                render.remove_bind(atlas_bind);
                render.remove_bind(uniform_bind);
                return Err(err);
            }
        };

        Ok(Self {
            pipeline: render.add_pipeline(pipeline),
            atlas_bind,
            uniform_bind,
            metrics: face.metrics(),
        })
    }
}

impl TechniqueBinding for StandardTechnique {
    fn apply<'a>(&'a self, render: &'a Render, rpass: &mut RenderPass<'a>) -> anyhow::Result<()> {
        let pipeline = render.get_pipeline(self.pipeline)?;
        rpass.set_pipeline(&pipeline.pipeline);
        for (group, handle) in pipeline.binds.iter().enumerate() {
            rpass.set_bind_group(group as u32, &render.get_bind(*handle)?.bg, &[]);
        }
        Ok(())
    }
}
