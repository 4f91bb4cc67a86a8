use anyhow::{anyhow, Result};
use generational_arena::Arena;
use wgpu::{
    Adapter, Device, DeviceDescriptor, Extent3d, ImageDataLayout, Instance, Queue,
    RequestAdapterOptions, Surface, TextureFormat,
};

use crate::{
    bind::{Bind, BindEntry, BindEntryResource, BindHandle},
    pipeline::{Pipeline, PipelineHandle},
    shader::{ShaderError, ShaderLibrary, ShaderStage, StageKind},
    texture::Texture,
};

/// Target configuration every pipeline built through a [Render] shares.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderSettings {
    pub color_format: TextureFormat,
    pub depth_format: Option<TextureFormat>,
    pub sample_count: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            color_format: TextureFormat::Bgra8UnormSrgb,
            depth_format: Some(TextureFormat::Depth32Float),
            sample_count: 1,
        }
    }
}

/// Explicit gpu context: the device and queue, shader sources, and arenas owning every pipeline
/// and bind created through it. Everything else refers to those by handle.
pub struct Render {
    device: Device,
    queue: Queue,
    settings: RenderSettings,
    shaders: ShaderLibrary,
    pipelines: Arena<Pipeline>,
    binds: Arena<Bind>,
}

impl Render {
    pub fn new(device: Device, queue: Queue, settings: RenderSettings, shaders: ShaderLibrary) -> Self {
        Self {
            device,
            queue,
            settings,
            shaders,
            pipelines: Arena::new(),
            binds: Arena::new(),
        }
    }

    /// Request an adapter and device from `instance`, optionally compatible with a surface.
    pub async fn request(
        instance: &Instance,
        compatible_surface: Option<&Surface<'_>>,
        settings: RenderSettings,
        shaders: ShaderLibrary,
    ) -> Result<(Adapter, Self)> {
        let adapter = instance
            .request_adapter(&RequestAdapterOptions {
                compatible_surface,
                ..Default::default()
            })
            .await
            .ok_or(anyhow!("No suitable adapter found."))?;

        let (device, queue) = adapter
            .request_device(&DeviceDescriptor::default(), None)
            .await?;
        log::info!("using adapter {:?}", adapter.get_info().name);

        Ok((adapter, Self::new(device, queue, settings, shaders)))
    }

    /// A context with no surface, using the built-in shaders.
    pub fn headless(settings: RenderSettings) -> Result<Self> {
        let instance = Instance::default();
        let (_, render) = pollster::block_on(Self::request(
            &instance,
            None,
            settings,
            ShaderLibrary::builtin(),
        ))?;
        Ok(render)
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn settings(&self) -> RenderSettings {
        self.settings
    }

    pub fn color_format(&self) -> TextureFormat {
        self.settings.color_format
    }

    pub fn depth_format(&self) -> Option<TextureFormat> {
        self.settings.depth_format
    }

    pub fn sample_count(&self) -> u32 {
        self.settings.sample_count
    }

    pub fn shaders(&self) -> &ShaderLibrary {
        &self.shaders
    }

    pub fn shaders_mut(&mut self) -> &mut ShaderLibrary {
        &mut self.shaders
    }

    pub fn compile_shader(&self, name: &str, kind: StageKind) -> Result<ShaderStage, ShaderError> {
        self.shaders.compile(&self.device, name, kind)
    }

    pub fn add_pipeline(&mut self, pipeline: Pipeline) -> PipelineHandle {
        PipelineHandle(self.pipelines.insert(pipeline))
    }

    pub fn get_pipeline(&self, handle: PipelineHandle) -> Result<&Pipeline> {
        self.pipelines
            .get(handle.0)
            .ok_or(anyhow!("No pipeline found at index {:?}.", handle))
    }

    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    pub fn build_bind(&mut self, bind_entries: &[BindEntry]) -> BindHandle {
        let bind = Bind::new(bind_entries.to_vec(), &self.device);
        BindHandle(self.binds.insert(bind))
    }

    pub fn get_bind(&self, handle: BindHandle) -> Result<&Bind> {
        self.binds
            .get(handle.0)
            .ok_or(anyhow!("No Bind for handle {:?}", handle))
    }

    pub fn remove_bind(&mut self, handle: BindHandle) -> Option<Bind> {
        self.binds.remove(handle.0)
    }

    pub fn bind_count(&self) -> usize {
        self.binds.len()
    }

    /// Write `data` at the start of the uniform buffer at `binding`.
    pub fn write_buffer(&self, data: &[u8], handle: BindHandle, binding: u32) -> Result<()> {
        let buffer = self
            .get_bind(handle)?
            .resource(binding)
            .and_then(BindEntryResource::buffer)
            .ok_or(anyhow!("Binding {} of {:?} is not a buffer", binding, handle))?;
        self.queue.write_buffer(buffer, 0, data);
        Ok(())
    }

    /// Upload `texture` into the texture resource at `binding`. Sizes must match.
    pub fn write_texture(&self, texture: &Texture, handle: BindHandle, binding: u32) -> Result<()> {
        let (target, _) = self
            .get_bind(handle)?
            .resource(binding)
            .and_then(BindEntryResource::texture)
            .ok_or(anyhow!("Binding {} of {:?} is not a texture", binding, handle))?;

        if (target.width(), target.height()) != (texture.width(), texture.height()) {
            return Err(anyhow!(
                "Texture is {}x{} but binding {} of {:?} is {}x{}",
                texture.width(),
                texture.height(),
                binding,
                handle,
                target.width(),
                target.height()
            ));
        }

        self.queue.write_texture(
            target.as_image_copy(),
            &texture.data,
            ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(texture.bytes_per_row()),
                rows_per_image: Some(texture.height()),
            },
            Extent3d {
                width: texture.width(),
                height: texture.height(),
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }
}
