use nalgebra::{Isometry3, Matrix4, Orthographic3, Perspective3, Point3, Vector3};

use crate::plain::Plain;

/// Maps OpenGL clip space depth (-1..1) onto wgpu's (0..1).
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.5,
    0.0, 0.0, 0.0, 1.0,
);

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ProjectionType {
    Perspective {
        aspect: f32,
        fovy: f32,
        near: f32,
        far: f32,
    },
    Orthographic {
        left: f32,
        right: f32,
        top: f32,
        bottom: f32,
        near: f32,
        far: f32,
    },
}

/// The 128 bytes of transform state the text vertex stage reads.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextUniform {
    pub projection: Matrix4<f32>,
    pub model_view: Matrix4<f32>,
}

unsafe impl Plain for TextUniform {}

impl Default for TextUniform {
    fn default() -> Self {
        Self {
            projection: Matrix4::identity(),
            model_view: Matrix4::identity(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Camera {
    pub eye: Point3<f32>,
    pub target: Point3<f32>,
    pub projection_type: ProjectionType,
}

impl Camera {
    pub fn new(eye: Point3<f32>, target: Point3<f32>, projection_type: ProjectionType) -> Self {
        Self {
            eye,
            target,
            projection_type,
        }
    }

    pub fn view(&self) -> Matrix4<f32> {
        Isometry3::look_at_rh(&self.eye, &self.target, &Vector3::y()).to_homogeneous()
    }

    /// Projection into wgpu clip space.
    pub fn projection(&self) -> Matrix4<f32> {
        let projection = match self.projection_type {
            ProjectionType::Perspective {
                aspect,
                fovy,
                near,
                far,
            } => Perspective3::new(aspect, fovy, near, far).into_inner(),

            ProjectionType::Orthographic {
                left,
                right,
                bottom,
                top,
                near,
                far,
            } => Orthographic3::new(left, right, bottom, top, near, far).into_inner(),
        };
        OPENGL_TO_WGPU_MATRIX * projection
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection() * self.view()
    }

    pub fn uniform(&self, model: Matrix4<f32>) -> TextUniform {
        TextUniform {
            projection: self.projection(),
            model_view: self.view() * model,
        }
    }

    /// Keep the projection's aspect ratio in step with a resized target.
    pub fn set_aspect(&mut self, aspect: f32) {
        if let ProjectionType::Perspective { aspect: a, .. } = &mut self.projection_type {
            *a = aspect;
        }
    }
}
