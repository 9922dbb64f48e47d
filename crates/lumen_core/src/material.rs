//! Surface reflectance models.
//!
//! `Material` is a closed set of BRDFs. Every model offers evaluation and
//! importance sampling; sampled densities are with respect to solid angle.
//! Directions passed in (`outgoing`, `incoming`) both point away from the
//! surface.

use std::f32::consts::{FRAC_1_PI, PI};
use std::sync::Arc;

use lumen_math::{Color, Vec2, Vec3};
use rand::RngCore;

use crate::sampling::{cosine_hemisphere, gen_f32, to_world};
use crate::texture::Texture;

/// Material used for geometry loaded without one.
pub static FAIL_SAFE: Material = Material::FailSafe(FailSafe {
    albedo: Vec3::new(0.8, 0.8, 0.8),
});

/// An importance-sampled incoming direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialSample {
    pub direction: Vec3,
    /// Solid-angle density; zero marks a failed sample.
    pub density: f32,
}

impl MaterialSample {
    const INVALID: MaterialSample = MaterialSample {
        direction: Vec3::ZERO,
        density: 0.0,
    };
}

#[derive(Debug, Clone)]
pub enum Material {
    FailSafe(FailSafe),
    OrenNayar(OrenNayar),
    CookTorrance(CookTorrance),
    Mixture(Mixture),
}

impl Material {
    /// BRDF value for light arriving from `incoming` and leaving along `outgoing`.
    pub fn eval(&self, uv: Vec2, normal: Vec3, outgoing: Vec3, incoming: Vec3) -> Color {
        match self {
            Material::FailSafe(m) => m.eval(normal, outgoing, incoming),
            Material::OrenNayar(m) => m.eval(uv, normal, outgoing, incoming),
            Material::CookTorrance(m) => m.eval(uv, normal, outgoing, incoming),
            Material::Mixture(m) => {
                m.first.eval(uv, normal, outgoing, incoming) * m.ratio
                    + m.second.eval(uv, normal, outgoing, incoming) * (1.0 - m.ratio)
            }
        }
    }

    /// Draw an incoming direction proportional to (an approximation of) the BRDF.
    pub fn sample(&self, rng: &mut dyn RngCore, uv: Vec2, normal: Vec3, outgoing: Vec3) -> MaterialSample {
        match self {
            Material::FailSafe(_) | Material::OrenNayar(_) => {
                let (direction, density) = cosine_hemisphere(rng, normal);
                MaterialSample { direction, density }
            }
            Material::CookTorrance(m) => m.sample(rng, uv, normal, outgoing),
            Material::Mixture(m) => {
                let component = if gen_f32(rng) < m.ratio { &m.first } else { &m.second };
                let s = component.sample(rng, uv, normal, outgoing);
                if s.density <= 0.0 {
                    return MaterialSample::INVALID;
                }
                // Either component may have produced the direction.
                let density = self.density(uv, normal, outgoing, s.direction);
                MaterialSample { density, ..s }
            }
        }
    }

    /// Solid-angle density with which `sample` returns `incoming`.
    pub fn density(&self, uv: Vec2, normal: Vec3, outgoing: Vec3, incoming: Vec3) -> f32 {
        match self {
            Material::FailSafe(_) | Material::OrenNayar(_) => normal.dot(incoming).max(0.0) * FRAC_1_PI,
            Material::CookTorrance(m) => m.density(uv, normal, outgoing, incoming),
            Material::Mixture(m) => {
                m.first.density(uv, normal, outgoing, incoming) * m.ratio
                    + m.second.density(uv, normal, outgoing, incoming) * (1.0 - m.ratio)
            }
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Material::FailSafe(FailSafe::default())
    }
}

/// Plain Lambertian reflector.
#[derive(Debug, Clone)]
pub struct FailSafe {
    pub albedo: Color,
}

impl Default for FailSafe {
    fn default() -> Self {
        Self {
            albedo: Vec3::splat(0.8),
        }
    }
}

impl FailSafe {
    fn eval(&self, normal: Vec3, outgoing: Vec3, incoming: Vec3) -> Color {
        if normal.dot(outgoing) <= 0.0 || normal.dot(incoming) <= 0.0 {
            return Color::ZERO;
        }
        self.albedo * FRAC_1_PI
    }
}

/// Rough diffuse reflector (qualitative Oren-Nayar model).
///
/// Roughness is the standard deviation of facet slopes in radians; zero
/// reduces to Lambert.
#[derive(Debug, Clone)]
pub struct OrenNayar {
    pub albedo: Color,
    pub albedo_map: Option<Arc<Texture>>,
    a: f32,
    b: f32,
}

impl OrenNayar {
    pub fn new(albedo: Color, roughness: f32) -> Self {
        let sigma2 = roughness * roughness;
        Self {
            albedo,
            albedo_map: None,
            a: 1.0 - 0.5 * sigma2 / (sigma2 + 0.33),
            b: 0.45 * sigma2 / (sigma2 + 0.09),
        }
    }

    pub fn with_albedo_map(mut self, map: Arc<Texture>) -> Self {
        self.albedo_map = Some(map);
        self
    }

    fn eval(&self, uv: Vec2, normal: Vec3, outgoing: Vec3, incoming: Vec3) -> Color {
        let cos_i = normal.dot(incoming);
        let cos_o = normal.dot(outgoing);
        if cos_i <= 0.0 || cos_o <= 0.0 {
            return Color::ZERO;
        }

        // alpha is the larger polar angle, beta the smaller.
        let cos_alpha = cos_i.min(cos_o);
        let cos_beta = cos_i.max(cos_o);
        let sin_alpha = (1.0 - cos_alpha * cos_alpha).max(0.0).sqrt();
        let sin_beta = (1.0 - cos_beta * cos_beta).max(0.0).sqrt();
        let tan_beta = sin_beta / cos_beta;

        let proj_i = (incoming - normal * cos_i).normalize_or_zero();
        let proj_o = (outgoing - normal * cos_o).normalize_or_zero();
        let cos_phi = proj_i.dot(proj_o).max(0.0);

        let albedo = match &self.albedo_map {
            Some(map) => map.sample(uv),
            None => self.albedo,
        };
        albedo * FRAC_1_PI * (self.a + self.b * cos_phi * sin_alpha * tan_beta)
    }
}

/// Microfacet specular reflector with a GGX distribution, Smith shadowing
/// and a conductor-style Fresnel term driven by a complex index of refraction.
#[derive(Debug, Clone)]
pub struct CookTorrance {
    pub albedo: Color,
    pub roughness: f32,
    /// Real part of the index of refraction.
    pub ior: f32,
    /// Extinction coefficient (imaginary part of the index of refraction).
    pub extinction: f32,
    pub albedo_map: Option<Arc<Texture>>,
    /// Roughness read from the red channel.
    pub roughness_map: Option<Arc<Texture>>,
}

impl CookTorrance {
    pub fn new(albedo: Color, roughness: f32, ior: f32, extinction: f32) -> Self {
        Self {
            albedo,
            roughness,
            ior,
            extinction,
            albedo_map: None,
            roughness_map: None,
        }
    }

    pub fn with_albedo_map(mut self, map: Arc<Texture>) -> Self {
        self.albedo_map = Some(map);
        self
    }

    pub fn with_roughness_map(mut self, map: Arc<Texture>) -> Self {
        self.roughness_map = Some(map);
        self
    }

    fn alpha2(&self, uv: Vec2) -> f32 {
        let roughness = match &self.roughness_map {
            Some(map) => map.sample_channel(uv, 0),
            None => self.roughness,
        };
        (2.0 * roughness * roughness).max(1e-6)
    }

    fn fresnel(&self, cos_ih: f32) -> f32 {
        let (n, k) = (self.ior, self.extinction);
        let k2 = k * k;
        let a = (n - 1.0) * (n - 1.0) + 4.0 * n * (1.0 - cos_ih).max(0.0).powi(5) + k2;
        let b = (n + 1.0) * (n + 1.0) + k2;
        a / b
    }

    fn eval(&self, uv: Vec2, normal: Vec3, outgoing: Vec3, incoming: Vec3) -> Color {
        let cos_i = normal.dot(incoming);
        let cos_o = normal.dot(outgoing);
        if cos_i <= 0.0 || cos_o <= 0.0 {
            return Color::ZERO;
        }
        let Some(h) = (incoming + outgoing).try_normalize() else {
            return Color::ZERO;
        };
        let cos_h = normal.dot(h);
        if cos_h <= 0.0 {
            return Color::ZERO;
        }

        let alpha2 = self.alpha2(uv);
        let d = ggx(cos_h, alpha2);
        let g = 1.0 / (1.0 + smith_lambda(cos_i, alpha2) + smith_lambda(cos_o, alpha2));
        let f = self.fresnel(incoming.dot(h));

        let albedo = match &self.albedo_map {
            Some(map) => map.sample(uv),
            None => self.albedo,
        };
        albedo * (f * d * g / (4.0 * cos_i * cos_o))
    }

    fn sample(&self, rng: &mut dyn RngCore, uv: Vec2, normal: Vec3, outgoing: Vec3) -> MaterialSample {
        let alpha2 = self.alpha2(uv);
        let t = gen_f32(rng);
        let azimuth = 2.0 * PI * gen_f32(rng);
        let theta = (alpha2 * t / (1.0 - t)).sqrt().atan();
        let (sin_t, cos_t) = theta.sin_cos();

        let h = to_world(
            Vec3::new(sin_t * azimuth.cos(), sin_t * azimuth.sin(), cos_t),
            normal,
        );
        let h_dot_o = h.dot(outgoing);
        if h_dot_o <= 0.0 {
            return MaterialSample::INVALID;
        }
        let incoming = (h * (2.0 * h_dot_o) - outgoing).normalize();
        if incoming.dot(normal) <= 0.0 {
            return MaterialSample::INVALID;
        }

        MaterialSample {
            direction: incoming,
            density: ggx(cos_t, alpha2) * cos_t / (4.0 * h_dot_o),
        }
    }

    fn density(&self, uv: Vec2, normal: Vec3, outgoing: Vec3, incoming: Vec3) -> f32 {
        if normal.dot(incoming) <= 0.0 {
            return 0.0;
        }
        let Some(h) = (incoming + outgoing).try_normalize() else {
            return 0.0;
        };
        let cos_h = normal.dot(h);
        let h_dot_o = h.dot(outgoing);
        if cos_h <= 0.0 || h_dot_o <= 0.0 {
            return 0.0;
        }
        ggx(cos_h, self.alpha2(uv)) * cos_h / (4.0 * h_dot_o)
    }
}

/// Convex blend of two materials.
#[derive(Debug, Clone)]
pub struct Mixture {
    pub first: Box<Material>,
    pub second: Box<Material>,
    /// Weight of `first`, in `[0, 1]`.
    pub ratio: f32,
}

impl Mixture {
    pub fn new(first: Material, second: Material, ratio: f32) -> Self {
        Self {
            first: Box::new(first),
            second: Box::new(second),
            ratio: ratio.clamp(0.0, 1.0),
        }
    }
}

impl From<FailSafe> for Material {
    fn from(m: FailSafe) -> Self {
        Material::FailSafe(m)
    }
}

impl From<OrenNayar> for Material {
    fn from(m: OrenNayar) -> Self {
        Material::OrenNayar(m)
    }
}

impl From<CookTorrance> for Material {
    fn from(m: CookTorrance) -> Self {
        Material::CookTorrance(m)
    }
}

impl From<Mixture> for Material {
    fn from(m: Mixture) -> Self {
        Material::Mixture(m)
    }
}

// ============================================================================
// Helper functions
// ============================================================================

/// GGX normal distribution for a half-vector at cosine `cos_h`.
fn ggx(cos_h: f32, alpha2: f32) -> f32 {
    let cos2 = cos_h * cos_h;
    let tan2 = (1.0 - cos2) / cos2;
    let denom = 1.0 + tan2 / alpha2;
    1.0 / (PI * alpha2 * cos2 * cos2 * denom * denom)
}

/// Smith Λ for a direction at cosine `cos_w`.
fn smith_lambda(cos_w: f32, alpha2: f32) -> f32 {
    let cos2 = cos_w * cos_w;
    let tan2 = (1.0 - cos2) / cos2;
    (-1.0 + (1.0 + alpha2 * tan2).sqrt()) * 0.5
}
