//! Surface materials.
//!
//! A material is either diffuse (Lambertian) or a perfect mirror, and may
//! additionally emit light.

use serde::{Deserialize, Serialize};
use umbra_math::Vector;

/// Color type alias (linear RGB, nominally 0-1 but not clamped)
pub type Color = Vector;

/// Build a color from a packed `0xRRGGBB` value.
pub fn color_from_rgb_hex(rgb: u32) -> Color {
    let r = (rgb >> 16) & 0xff;
    let g = (rgb >> 8) & 0xff;
    let b = rgb & 0xff;
    Color::new(r as f64, g as f64, b as f64) / 255.0
}

/// How light interacts with a surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Reflectance for diffuse surfaces, emission tint for lights
    pub colour: Color,
    /// Emitted radiance scale; 0 means the surface does not emit
    pub emittance: f64,
    /// Perfect mirror instead of diffuse scattering
    pub mirror: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            colour: Color::ONE,
            emittance: 0.0,
            mirror: false,
        }
    }
}

impl Material {
    /// Diffuse (Lambertian) material with the given reflectance.
    pub fn diffuse(colour: Color) -> Self {
        Self {
            colour,
            ..Default::default()
        }
    }

    /// Light emitting material.
    pub fn emitter(colour: Color, emittance: f64) -> Self {
        Self {
            colour,
            emittance,
            mirror: false,
        }
    }

    /// White perfect mirror.
    pub fn mirror() -> Self {
        Self {
            mirror: true,
            ..Default::default()
        }
    }

    /// True if the material emits light.
    pub fn is_emissive(&self) -> bool {
        self.emittance != 0.0
    }
}
