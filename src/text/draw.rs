use wgpu::{
    util::{BufferInitDescriptor, DeviceExt},
    Buffer, BufferUsages, IndexFormat, RenderPass,
};

use super::layout::TextMesh;
use crate::{plain::PlainSlice, render::Render};

/// A [TextMesh] uploaded to the gpu, drawn with whatever technique was applied before it.
#[derive(Debug)]
pub struct TextDraw {
    positions: Buffer,
    colors: Buffer,
    tex_coords: Buffer,
    indices: Buffer,
    index_count: u32,
}

impl TextDraw {
    pub fn new(render: &Render, mesh: &TextMesh) -> Self {
        let vertex_buffer = |label: &str, contents: &[u8]| {
            render.device().create_buffer_init(&BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: BufferUsages::VERTEX,
            })
        };

        Self {
            positions: vertex_buffer("text positions", mesh.positions.as_slice().as_bytes()),
            colors: vertex_buffer("text colors", mesh.colors.as_slice().as_bytes()),
            tex_coords: vertex_buffer("text tex coords", mesh.tex_coords.as_slice().as_bytes()),
            indices: render.device().create_buffer_init(&BufferInitDescriptor {
                label: Some("text indices"),
                contents: mesh.indices.as_slice().as_bytes(),
                usage: BufferUsages::INDEX,
            }),
            index_count: mesh.index_count(),
        }
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Record the draw. Nothing is recorded for a mesh without quads.
    pub fn draw<'a>(&'a self, rpass: &mut RenderPass<'a>) {
        if self.index_count == 0 {
            return;
        }
        rpass.set_vertex_buffer(0, self.positions.slice(..));
        rpass.set_vertex_buffer(1, self.colors.slice(..));
        rpass.set_vertex_buffer(2, self.tex_coords.slice(..));
        rpass.set_index_buffer(self.indices.slice(..), IndexFormat::Uint16);
        rpass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}
