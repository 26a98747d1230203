//! Umbra Renderer - progressive CPU path tracing
//!
//! A Monte Carlo path tracer over a uniform grid, with a coordinator that
//! keeps refining one image using a variable number of worker threads.

mod accel;
mod accumulator;
mod aligned;
mod camera;
mod disc;
mod error;
mod grid;
mod image;
mod instance;
mod material;
mod pipe;
mod scene;
mod sphere;
mod surface;
mod tracer;
mod triangle;

pub use accel::{AccelerationStructure, Hit, ObjectList};
pub use accumulator::{Accumulator, LandingBuffer};
pub use aligned::{AlignedBox, AlignedSquare, Axis};
pub use camera::{screen_coordinates, Camera, CameraConfig};
pub use disc::Disc;
pub use error::{RenderError, RenderResult};
pub use grid::{Grid, GridStats, DEFAULT_LAMBDA};
pub use crate::image::{Dimensions, Image};
pub use instance::{RenderInstance, RenderStats};
pub use material::{color_from_rgb_hex, Color, Material};
pub use pipe::Pipe;
pub use scene::{Scene, SceneRegistry};
pub use sphere::Sphere;
pub use surface::{Intersection, Object, Surface};
pub use tracer::{RenderConfig, Tracer};
pub use triangle::Triangle;

/// Re-export the math types from umbra_math
pub use umbra_math::{Aabb, Ray, Vector, VectorExt};
