//! Perspective-n-Point head pose solver
//!
//! Iterative (Levenberg–Marquardt) minimization of the reprojection error of
//! a rigid 3D model through a pinhole camera without lens distortion. The
//! rotation is parameterized as a rotation vector applied on top of a base
//! orientation, so the solve starts from the frontal pose and the solution
//! directly exposes the head rotation relative to it.

use nalgebra::{Matrix6, Rotation3, Vector3, Vector6};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum depth of a projected point in front of the camera
const MIN_DEPTH: f64 = 1e-9;

/// Damping retries per iteration before giving up on a step
const MAX_DAMPING_STEPS: usize = 10;

/// Pose solver error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PoseError {
    #[error("Need at least {required} correspondences, got {actual}")]
    TooFewPoints { required: usize, actual: usize },

    #[error("Correspondence mismatch: {object} model points, {image} image points")]
    Mismatch { object: usize, image: usize },

    #[error("Image points are degenerate (coincident or colinear)")]
    Degenerate,

    #[error("Normal equations are singular")]
    Singular,

    #[error("Solver produced non-finite values")]
    NonFinite,

    #[error("Solution places the model behind the camera")]
    BehindCamera,
}

/// Approximate pinhole camera intrinsics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraIntrinsics {
    pub focal_length: f64,
    pub cx: f64,
    pub cy: f64,
}

impl CameraIntrinsics {
    /// Focal length equal to the frame width, principal point at the center
    pub fn approximate(width: f64, height: f64) -> Self {
        Self {
            focal_length: width,
            cx: width / 2.0,
            cy: height / 2.0,
        }
    }

    /// Project a camera-space point to pixel coordinates
    pub fn project(&self, p: &Vector3<f64>) -> Option<(f64, f64)> {
        if p.z <= MIN_DEPTH {
            return None;
        }
        Some((
            self.focal_length * p.x / p.z + self.cx,
            self.focal_length * p.y / p.z + self.cy,
        ))
    }
}

/// Iteration limits for the solver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    pub max_iterations: usize,
    /// Relative step size below which the solve is considered converged
    pub tolerance: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-10,
        }
    }
}

/// Result of a successful solve
#[derive(Debug, Clone)]
pub struct PoseSolution {
    /// Model-to-camera rotation
    pub rotation: Rotation3<f64>,
    /// Rotation relative to the base orientation the solve started from
    pub relative_rotation: Rotation3<f64>,
    /// Model origin in camera space
    pub translation: Vector3<f64>,
    /// RMS reprojection error in pixels
    pub rms_error: f64,
    pub iterations: usize,
}

impl PoseSolution {
    /// Rotation about the camera's horizontal axis relative to the base
    /// orientation, in degrees, negative when the model tilts down.
    pub fn pitch_degrees(&self) -> f64 {
        let (about_x, _, _) = self.relative_rotation.euler_angles();
        -about_x.to_degrees()
    }
}

/// Orientation of a y-up, z-toward-viewer face model looking straight into
/// a y-down camera.
pub fn frontal_orientation() -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Vector3::x_axis(), std::f64::consts::PI)
}

struct Problem<'a> {
    object: &'a [Vector3<f64>],
    image: &'a [(f64, f64)],
    camera: CameraIntrinsics,
    base: Rotation3<f64>,
}

impl Problem<'_> {
    fn pose(&self, params: &Vector6<f64>) -> (Rotation3<f64>, Vector3<f64>) {
        let relative = Rotation3::new(Vector3::new(params[0], params[1], params[2]));
        (relative * self.base, Vector3::new(params[3], params[4], params[5]))
    }

    fn residuals(&self, params: &Vector6<f64>) -> Option<Vec<f64>> {
        let (rotation, translation) = self.pose(params);
        let mut out = Vec::with_capacity(self.object.len() * 2);
        for (model, &(u, v)) in self.object.iter().zip(self.image) {
            let (pu, pv) = self.camera.project(&(rotation * model + translation))?;
            out.push(pu - u);
            out.push(pv - v);
        }
        out.iter().all(|r| r.is_finite()).then_some(out)
    }

    /// Central-difference Jacobian, one row per residual
    fn jacobian(&self, params: &Vector6<f64>) -> Result<Vec<[f64; 6]>, PoseError> {
        let mut rows = vec![[0.0; 6]; self.object.len() * 2];
        for k in 0..6 {
            let h = 1e-6 * params[k].abs().max(1.0);
            let mut forward = *params;
            let mut backward = *params;
            forward[k] += h;
            backward[k] -= h;
            let rf = self.residuals(&forward).ok_or(PoseError::BehindCamera)?;
            let rb = self.residuals(&backward).ok_or(PoseError::BehindCamera)?;
            for (row, (f, b)) in rows.iter_mut().zip(rf.iter().zip(&rb)) {
                row[k] = (f - b) / (2.0 * h);
            }
        }
        Ok(rows)
    }

    /// Translation that places the rotated model's centroid under the image
    /// centroid at a depth matching the observed spread.
    fn initial_translation(&self) -> Result<Vector3<f64>, PoseError> {
        let n = self.image.len() as f64;
        let (uc, vc) = self
            .image
            .iter()
            .fold((0.0, 0.0), |(su, sv), &(u, v)| (su + u / n, sv + v / n));

        let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
        for &(u, v) in self.image {
            sxx += (u - uc) * (u - uc) / n;
            syy += (v - vc) * (v - vc) / n;
            sxy += (u - uc) * (v - vc) / n;
        }
        let half_trace = (sxx + syy) / 2.0;
        let radius = (((sxx - syy) / 2.0).powi(2) + sxy * sxy).sqrt();
        let (lambda_max, lambda_min) = (half_trace + radius, half_trace - radius);
        if !lambda_max.is_finite() || lambda_min <= 1e-9 * lambda_max {
            return Err(PoseError::Degenerate);
        }

        let rotated: Vec<Vector3<f64>> = self.object.iter().map(|p| self.base * p).collect();
        let centroid = rotated.iter().fold(Vector3::zeros(), |acc, p| acc + p) / n;
        let model_spread = rotated
            .iter()
            .map(|p| (p.x - centroid.x).hypot(p.y - centroid.y))
            .sum::<f64>()
            / n;
        let image_spread = self
            .image
            .iter()
            .map(|&(u, v)| (u - uc).hypot(v - vc))
            .sum::<f64>()
            / n;
        if model_spread <= f64::EPSILON || image_spread <= f64::EPSILON {
            return Err(PoseError::Degenerate);
        }

        let f = self.camera.focal_length;
        let depth = f * model_spread / image_spread;
        Ok(Vector3::new(
            (uc - self.camera.cx) * depth / f - centroid.x,
            (vc - self.camera.cy) * depth / f - centroid.y,
            depth - centroid.z,
        ))
    }
}

fn squared_norm(residuals: &[f64]) -> f64 {
    residuals.iter().map(|r| r * r).sum()
}

fn normal_equations(jacobian: &[[f64; 6]], residuals: &[f64]) -> (Matrix6<f64>, Vector6<f64>) {
    let mut jtj = Matrix6::zeros();
    let mut jtr = Vector6::zeros();
    for (row, r) in jacobian.iter().zip(residuals) {
        for a in 0..6 {
            jtr[a] += row[a] * r;
            for b in 0..6 {
                jtj[(a, b)] += row[a] * row[b];
            }
        }
    }
    (jtj, jtr)
}

/// Estimate the pose of `object` (model space) from its projections `image`
/// (pixels), starting the search at orientation `base`.
pub fn solve_pnp(
    object: &[Vector3<f64>],
    image: &[(f64, f64)],
    camera: CameraIntrinsics,
    base: Rotation3<f64>,
    settings: &SolverSettings,
) -> Result<PoseSolution, PoseError> {
    if object.len() != image.len() {
        return Err(PoseError::Mismatch {
            object: object.len(),
            image: image.len(),
        });
    }
    if object.len() < 4 {
        return Err(PoseError::TooFewPoints {
            required: 4,
            actual: object.len(),
        });
    }
    if image.iter().any(|(u, v)| !u.is_finite() || !v.is_finite()) {
        return Err(PoseError::NonFinite);
    }

    let problem = Problem {
        object,
        image,
        camera,
        base,
    };

    let t0 = problem.initial_translation()?;
    let mut params = Vector6::new(0.0, 0.0, 0.0, t0.x, t0.y, t0.z);
    let mut residuals = problem.residuals(&params).ok_or(PoseError::BehindCamera)?;
    let mut cost = squared_norm(&residuals);
    let mut lambda = 1e-3;
    let mut iterations = 0;

    while iterations < settings.max_iterations && cost > 0.0 {
        iterations += 1;
        let jacobian = problem.jacobian(&params)?;
        let (jtj, jtr) = normal_equations(&jacobian, &residuals);

        let mut step = None;
        for _ in 0..MAX_DAMPING_STEPS {
            let mut damped = jtj;
            for i in 0..6 {
                damped[(i, i)] += lambda * jtj[(i, i)].max(1e-12);
            }
            let delta = damped.lu().solve(&(-jtr)).ok_or(PoseError::Singular)?;
            let candidate = params + delta;
            if let Some(r) = problem.residuals(&candidate) {
                let candidate_cost = squared_norm(&r);
                if candidate_cost < cost {
                    step = Some((delta, candidate, r, candidate_cost));
                    break;
                }
            }
            lambda *= 10.0;
        }

        let Some((delta, candidate, r, candidate_cost)) = step else {
            break;
        };
        params = candidate;
        residuals = r;
        cost = candidate_cost;
        lambda = (lambda / 10.0).max(1e-12);

        if delta.norm() <= settings.tolerance * (params.norm() + settings.tolerance) {
            break;
        }
    }

    if params.iter().any(|p| !p.is_finite()) {
        return Err(PoseError::NonFinite);
    }

    let (rotation, translation) = problem.pose(&params);
    Ok(PoseSolution {
        rotation,
        relative_rotation: Rotation3::new(Vector3::new(params[0], params[1], params[2])),
        translation,
        rms_error: (cost / object.len() as f64).sqrt(),
        iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> Vec<Vector3<f64>> {
        vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, -63.6, -12.5),
            Vector3::new(-43.3, 32.7, -26.0),
            Vector3::new(43.3, 32.7, -26.0),
            Vector3::new(-28.9, -28.9, -24.1),
            Vector3::new(28.9, -28.9, -24.1),
        ]
    }

    fn project_all(
        rotation: &Rotation3<f64>,
        translation: &Vector3<f64>,
        camera: &CameraIntrinsics,
    ) -> Vec<(f64, f64)> {
        model()
            .iter()
            .map(|p| camera.project(&(rotation * p + translation)).unwrap())
            .collect()
    }

    #[test]
    fn test_recovers_known_pose() {
        let camera = CameraIntrinsics::approximate(640.0, 480.0);
        let relative = Rotation3::from_euler_angles(0.25, -0.15, 0.05);
        let truth = relative * frontal_orientation();
        let translation = Vector3::new(15.0, -30.0, 520.0);
        let image = project_all(&truth, &translation, &camera);

        let solution = solve_pnp(
            &model(),
            &image,
            camera,
            frontal_orientation(),
            &SolverSettings::default(),
        )
        .unwrap();

        assert!(solution.rms_error < 1e-4, "rms {}", solution.rms_error);
        assert!((solution.translation - translation).norm() < 1e-2);
        assert!((solution.pitch_degrees() + 0.25f64.to_degrees()).abs() < 1e-3);
    }

    #[test]
    fn test_frontal_pose_has_zero_pitch() {
        let camera = CameraIntrinsics::approximate(640.0, 480.0);
        let image = project_all(&frontal_orientation(), &Vector3::new(0.0, 0.0, 500.0), &camera);

        let solution = solve_pnp(
            &model(),
            &image,
            camera,
            frontal_orientation(),
            &SolverSettings::default(),
        )
        .unwrap();

        assert!(solution.pitch_degrees().abs() < 1e-3);
    }

    #[test]
    fn test_colinear_points_are_degenerate() {
        let camera = CameraIntrinsics::approximate(640.0, 480.0);
        let image: Vec<(f64, f64)> = (0..6).map(|i| (100.0 + 10.0 * i as f64, 200.0)).collect();
        let result = solve_pnp(&model(), &image, camera, frontal_orientation(), &SolverSettings::default());
        assert_eq!(result.unwrap_err(), PoseError::Degenerate);
    }

    #[test]
    fn test_coincident_points_are_degenerate() {
        let camera = CameraIntrinsics::approximate(640.0, 480.0);
        let image = vec![(320.0, 240.0); 6];
        let result = solve_pnp(&model(), &image, camera, frontal_orientation(), &SolverSettings::default());
        assert_eq!(result.unwrap_err(), PoseError::Degenerate);
    }

    #[test]
    fn test_rejects_mismatched_and_short_input() {
        let camera = CameraIntrinsics::approximate(640.0, 480.0);
        let settings = SolverSettings::default();
        let result = solve_pnp(&model(), &[(0.0, 0.0)], camera, frontal_orientation(), &settings);
        assert!(matches!(result, Err(PoseError::Mismatch { object: 6, image: 1 })));

        let result = solve_pnp(&model()[..3], &[(0.0, 0.0); 3], camera, frontal_orientation(), &settings);
        assert!(matches!(result, Err(PoseError::TooFewPoints { .. })));
    }

    #[test]
    fn test_projection_behind_camera() {
        let camera = CameraIntrinsics::approximate(640.0, 480.0);
        assert!(camera.project(&Vector3::new(0.0, 0.0, -1.0)).is_none());
        assert_eq!(camera.project(&Vector3::new(0.0, 0.0, 10.0)), Some((320.0, 240.0)));
    }
}
