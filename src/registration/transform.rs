//! Similarity transform estimation from paired anchor points.
//!
//! Least-squares fit of rotation, uniform scale and translation
//! (Umeyama, 1991): with centred point sets, the cross-covariance
//! `Σ = 1/n · Σ (b - b̄)(a - ā)ᵀ = U · D · Vᵀ` gives `R = U · S · Vᵀ`, where `S`
//! flips the weakest axis if `U · Vᵀ` would be a reflection, then
//! `s = tr(D · S) / var(a)` and `t = b̄ - s · R · ā`.

use super::roots::RootPairs;
use crate::config::RegistrationConfig;
use crate::error::RegistrationError;
use crate::geometry::Vec3;
use crate::graph::LineageGraph;
use nalgebra::{Matrix3, Matrix4, Rotation3};
use serde::{Deserialize, Serialize};

/// `x ↦ scale · rotation · x + translation`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityTransform {
    /// Proper rotation (orthonormal, determinant +1)
    pub rotation: Matrix3<f64>,
    pub scale: f64,
    pub translation: Vec3,
}

impl SimilarityTransform {
    pub fn identity() -> Self {
        Self {
            rotation: Matrix3::identity(),
            scale: 1.0,
            translation: Vec3::zeros(),
        }
    }

    pub fn new(rotation: Rotation3<f64>, scale: f64, translation: Vec3) -> Self {
        Self {
            rotation: rotation.into_inner(),
            scale,
            translation,
        }
    }

    /// Maps a position
    pub fn apply(&self, point: &Vec3) -> Vec3 {
        self.rotation * point * self.scale + self.translation
    }

    /// Maps a direction, ignoring the translation
    pub fn apply_direction(&self, direction: &Vec3) -> Vec3 {
        self.rotation * direction * self.scale
    }

    /// Same rotation and scale, zero translation
    pub fn without_translation(&self) -> Self {
        Self {
            translation: Vec3::zeros(),
            ..self.clone()
        }
    }

    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.transpose();
        let scale = 1.0 / self.scale;
        Self {
            translation: -(rotation * self.translation) * scale,
            rotation,
            scale,
        }
    }

    /// The linear part `scale · rotation`
    pub fn linear(&self) -> Matrix3<f64> {
        self.rotation * self.scale
    }

    pub fn to_homogeneous(&self) -> Matrix4<f64> {
        let mut m = Matrix4::identity();
        m.fixed_view_mut::<3, 3>(0, 0).copy_from(&self.linear());
        m.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.translation);
        m
    }
}

/// Fits the similarity transform mapping each `a` onto its `b`.
pub fn estimate_transform(
    pairs: &[(Vec3, Vec3)],
    config: &RegistrationConfig,
) -> Result<SimilarityTransform, RegistrationError> {
    let n = pairs.len();
    if n < config.min_anchors {
        return Err(RegistrationError::InsufficientAnchors {
            found: n,
            required: config.min_anchors,
        });
    }

    let inv_n = 1.0 / n as f64;
    let mean_a = pairs.iter().map(|(a, _)| a).sum::<Vec3>() * inv_n;
    let mean_b = pairs.iter().map(|(_, b)| b).sum::<Vec3>() * inv_n;

    let mut variance_a = 0.0;
    let mut covariance = Matrix3::zeros();
    for (a, b) in pairs {
        let da = a - mean_a;
        let db = b - mean_b;
        variance_a += da.norm_squared();
        covariance += db * da.transpose();
    }
    variance_a *= inv_n;
    covariance *= inv_n;

    if variance_a <= f64::MIN_POSITIVE {
        return Err(RegistrationError::DegenerateFit);
    }

    let svd = covariance.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Err(RegistrationError::DegenerateFit);
    };
    let singular = svd.singular_values;

    let mut sorted = [singular[0], singular[1], singular[2]];
    sorted.sort_by(|x, y| y.total_cmp(x));
    // rank < 2 means collinear or coincident anchors: rotation about the line is free
    if sorted[0] <= f64::MIN_POSITIVE || sorted[1] <= config.degeneracy_tolerance * sorted[0] {
        return Err(RegistrationError::DegenerateFit);
    }

    let weakest = (0..3)
        .min_by(|&i, &j| singular[i].total_cmp(&singular[j]))
        .unwrap_or(2);
    let mut signs = Vec3::new(1.0, 1.0, 1.0);
    if u.determinant() * v_t.determinant() < 0.0 {
        signs[weakest] = -1.0;
    }

    let rotation = u * Matrix3::from_diagonal(&signs) * v_t;
    let scale = singular.component_mul(&signs).sum() / variance_a;
    let translation = mean_b - rotation * mean_a * scale;

    Ok(SimilarityTransform {
        rotation,
        scale,
        translation,
    })
}

/// Fits the transform mapping root positions of A onto their paired roots in B.
pub fn estimate_from_roots(
    graph_a: &LineageGraph,
    graph_b: &LineageGraph,
    roots: &RootPairs,
    config: &RegistrationConfig,
) -> Result<SimilarityTransform, RegistrationError> {
    let pairs: Vec<(Vec3, Vec3)> = roots
        .values()
        .filter_map(|&(a, b)| Some((graph_a.position(a)?, graph_b.position(b)?)))
        .collect();
    estimate_transform(&pairs, config)
}
