use generational_arena::Index;
use itertools::Itertools;
use wgpu::{
    BlendState, ColorTargetState, ColorWrites, CompareFunction, DepthBiasState, DepthStencilState,
    Face, FragmentState, MultisampleState, PipelineCompilationOptions, PipelineLayoutDescriptor,
    PrimitiveState, RenderPipeline, RenderPipelineDescriptor, StencilState, TextureFormat,
    VertexAttribute, VertexState, VertexStepMode,
};

use crate::{
    bind::{BindHandle, VertexBufferEntry},
    render::Render,
    shader::ShaderStage,
};

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct PipelineHandle(pub Index);

/// A render pipeline together with the binds it expects, in bind group order.
///
/// Construct one with a [PipelineBuilder], then hand it to [Render::add_pipeline].
#[derive(Debug)]
pub struct Pipeline {
    pub pipeline: RenderPipeline,
    pub binds: Vec<BindHandle>,
}

#[derive(thiserror::Error, Debug)]
pub enum PipelineBuildError {
    #[error("pipeline is missing its {0} stage")]
    MissingStage(&'static str),
    #[error("bind {0:?} does not exist")]
    MissingBind(BindHandle),
    #[error("pipeline validation failed: {0}")]
    Validation(String),
}

pub struct PipelineBuilder<'a> {
    label: Option<&'a str>,
    binds: Vec<BindHandle>,
    vertex: Option<&'a ShaderStage>,
    fragment: Option<&'a ShaderStage>,
    primitive_state: PrimitiveState,
    blend: Option<BlendState>,
    format: Option<TextureFormat>,
    depth_format: Option<TextureFormat>,
    sample_count: u32,
    vertex_entries: Vec<VertexBufferEntry>,
}

impl<'a> PipelineBuilder<'a> {
    pub fn new() -> Self {
        Self {
            label: None,
            binds: Vec::new(),
            vertex: None,
            fragment: None,
            primitive_state: PrimitiveState::default(),
            blend: Some(BlendState::ALPHA_BLENDING),
            format: None,
            depth_format: None,
            sample_count: 1,
            vertex_entries: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: &'a str) -> Self {
        self.label = Some(label);
        self
    }

    pub fn with_cull_mode(mut self, cull_mode: Option<Face>) -> Self {
        self.primitive_state.cull_mode = cull_mode;
        self
    }

    pub fn with_vertex_stage(mut self, stage: &'a ShaderStage) -> Self {
        self.vertex = Some(stage);
        self
    }

    pub fn with_fragment_stage(mut self, stage: &'a ShaderStage) -> Self {
        self.fragment = Some(stage);
        self
    }

    pub fn with_blend(mut self, blend: Option<BlendState>) -> Self {
        self.blend = blend;
        self
    }

    /// Override the colour target format. Defaults to the [Render]'s colour format.
    pub fn with_format(mut self, format: TextureFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_depth(mut self, depth_format: Option<TextureFormat>) -> Self {
        self.depth_format = depth_format;
        self
    }

    pub fn with_sample_count(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count;
        self
    }

    pub fn with_bind(mut self, handle: BindHandle) -> Self {
        self.binds.push(handle);
        self
    }

    pub fn with_vb<T>(mut self, step_mode: VertexStepMode, attributes: &[VertexAttribute]) -> Self {
        self.vertex_entries.push(VertexBufferEntry {
            array_stride: std::mem::size_of::<T>() as u64,
            step_mode,
            attributes: attributes.into(),
        });
        self
    }

    pub fn build(self, render: &Render) -> Result<Pipeline, PipelineBuildError> {
        let vertex = self.vertex.ok_or(PipelineBuildError::MissingStage("vertex"))?;
        let fragment = self
            .fragment
            .ok_or(PipelineBuildError::MissingStage("fragment"))?;

        let bgls = self
            .binds
            .iter()
            .map(|handle| {
                render
                    .get_bind(*handle)
                    .map(|bind| &bind.bgl)
                    .map_err(|_| PipelineBuildError::MissingBind(*handle))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let device = render.device();
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: self.label,
            bind_group_layouts: bgls.as_slice(),
            push_constant_ranges: &[],
        });

        let vbs = self
            .vertex_entries
            .iter()
            .map(|ent| ent.layout())
            .collect_vec();

        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: self.label,
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: &vertex.module,
                entry_point: vertex.entry_point(),
                buffers: vbs.as_slice(),
                compilation_options: PipelineCompilationOptions::default(),
            },
            primitive: self.primitive_state,
            depth_stencil: self.depth_format.map(|format| DepthStencilState {
                format,
                depth_write_enabled: true,
                depth_compare: CompareFunction::Less,
                stencil: StencilState::default(),
                bias: DepthBiasState::default(),
            }),
            multisample: MultisampleState {
                count: self.sample_count,
                ..Default::default()
            },
            fragment: Some(FragmentState {
                module: &fragment.module,
                entry_point: fragment.entry_point(),
                targets: &[Some(ColorTargetState {
                    format: self.format.unwrap_or(render.color_format()),
                    blend: self.blend,
                    write_mask: ColorWrites::ALL,
                })],
                compilation_options: PipelineCompilationOptions::default(),
            }),
            multiview: None,
        });

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(PipelineBuildError::Validation(err.to_string()));
        }

        Ok(Pipeline {
            pipeline,
            binds: self.binds,
        })
    }
}

impl<'a> Default for PipelineBuilder<'a> {
    fn default() -> Self {
        Self::new()
    }
}
