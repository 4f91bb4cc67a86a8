//! Tests that need a gpu adapter. Each returns early when none is available.

use std::sync::Arc;

use atlas_text::{
    camera::TextUniform,
    render::{Render, RenderSettings},
    shader::{ShaderError, ShaderLibrary, TEXT_FRAGMENT, TEXT_VERTEX},
    text::{
        Font, FontDescriptor, StandardTechnique, TechniqueBinding, TechniqueError, TextDraw,
        TextMesh,
    },
    texture::Texture,
};
use nalgebra::{point, vector};
use wgpu::{
    Color, CommandEncoderDescriptor, Extent3d, LoadOp, Operations, RenderPassColorAttachment,
    RenderPassDepthStencilAttachment, RenderPassDescriptor, StoreOp, TextureDescriptor,
    TextureDimension, TextureUsages, TextureViewDescriptor,
};

const DESCRIPTOR: &str = "\
info face=\"Fixture\" size=8 bold=0
common lineHeight=10 base=6 scaleW=16 scaleH=16 pages=1 packed=0
page id=0 file=\"fixture.png\"
chars count=2
char id=32 x=0 y=0 width=0 height=0 xoffset=0 yoffset=0 xadvance=4 page=0 chnl=15
char id=65 x=0 y=0 width=8 height=8 xoffset=0 yoffset=0 xadvance=8 page=0 chnl=15
";

fn render() -> Option<Render> {
    match Render::headless(RenderSettings {
        color_format: wgpu::TextureFormat::Rgba8UnormSrgb,
        ..Default::default()
    }) {
        Ok(render) => Some(render),
        Err(err) => {
            log::warn!("skipping gpu test: {:#}", err);
            None
        }
    }
}

fn font() -> Font {
    let descriptor: FontDescriptor = DESCRIPTOR.parse().unwrap();
    let atlas = Texture {
        data: vec![255; 16 * 16 * 4],
        width: 16,
        height: 16,
    };
    Font::from_parts("fixture", Arc::new(atlas), &descriptor).unwrap()
}

#[test_log::test]
fn standard_technique_is_built_once() {
    let Some(mut render) = render() else { return };
    let mut font = font();

    let first = font.technique::<StandardTechnique>(&mut render).unwrap() as *const _;
    let second = font.technique::<StandardTechnique>(&mut render).unwrap() as *const _;

    assert_eq!(first, second);
    assert_eq!(render.pipeline_count(), 1);
    assert_eq!(render.bind_count(), 2);
    assert_eq!(font.techniques().count(), 1);

    let technique = font.existing_technique::<StandardTechnique>().unwrap();
    assert_eq!(technique.metrics(), font.metrics());
    technique
        .write_uniform(&render, &TextUniform::default())
        .unwrap();
}

#[test]
fn uncompilable_stage_fails_construction() {
    let Some(mut render) = render() else { return };
    render
        .shaders_mut()
        .register(TEXT_FRAGMENT, "this is not wgsl");
    let mut font = font();

    let result = font.technique::<StandardTechnique>(&mut render);
    assert!(matches!(
        result,
        Err(TechniqueError::Shader(ShaderError::Compile { .. }))
    ));
    assert!(font.existing_technique::<StandardTechnique>().is_none());
    assert_eq!(render.pipeline_count(), 0);
    assert_eq!(render.bind_count(), 0);
}

#[test]
fn missing_stage_fails_construction() {
    let Some(mut render) = render() else { return };
    let mut shaders = ShaderLibrary::new();
    shaders.register(
        TEXT_FRAGMENT,
        ShaderLibrary::builtin().get(TEXT_FRAGMENT).unwrap(),
    );
    *render.shaders_mut() = shaders;
    let mut font = font();

    match font.technique::<StandardTechnique>(&mut render) {
        Err(TechniqueError::Shader(ShaderError::Unavailable { name })) => {
            assert_eq!(name, TEXT_VERTEX)
        }
        other => panic!("expected a missing vertex stage, got {:?}", other),
    }
    assert_eq!(font.techniques().count(), 0);
}

#[test]
fn draws_laid_out_text() {
    let Some(mut render) = render() else { return };
    let mut font = font();
    font.technique::<StandardTechnique>(&mut render).unwrap();
    let technique = font.existing_technique::<StandardTechnique>().unwrap();

    let mesh = TextMesh::layout(font.face(), point![0.0, 0.0, 0.0], vector![1.0, 0.0, 0.0], "A A")
        .unwrap();
    assert_eq!(mesh.quad_count(), 2);
    let draw = TextDraw::new(&render, &mesh);

    let size = Extent3d {
        width: 32,
        height: 32,
        depth_or_array_layers: 1,
    };
    let target = |format| {
        render.device().create_texture(&TextureDescriptor {
            label: None,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format,
            usage: TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
    };
    let color = target(render.color_format());
    let depth = target(render.depth_format().unwrap());
    let color_view = color.create_view(&TextureViewDescriptor::default());
    let depth_view = depth.create_view(&TextureViewDescriptor::default());

    render
        .device()
        .push_error_scope(wgpu::ErrorFilter::Validation);
    let mut encoder = render
        .device()
        .create_command_encoder(&CommandEncoderDescriptor::default());
    {
        let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: None,
            color_attachments: &[Some(RenderPassColorAttachment {
                view: &color_view,
                resolve_target: None,
                ops: Operations {
                    load: LoadOp::Clear(Color::BLACK),
                    store: StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                view: &depth_view,
                depth_ops: Some(Operations {
                    load: LoadOp::Clear(1.0),
                    store: StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        technique.apply(&render, &mut rpass).unwrap();
        draw.draw(&mut rpass);
    }
    render.queue().submit([encoder.finish()]);
    let error = pollster::block_on(render.device().pop_error_scope());
    assert!(error.is_none(), "{:?}", error);
}
