//! Landmark geometry: head pitch, vertical gaze ratio and eye aspect ratio
//!
//! Pure functions over one landmark frame. Tracking anomalies never surface
//! as errors: degenerate geometry yields the neutral values carried in the
//! [`GeometryConfig`].

use crate::config::{EyeTopology, GeometryConfig};
use crate::pose::{self, CameraIntrinsics, PoseError, PoseSolution};
use landmark_capture::LandmarkFrame;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Raw (unsmoothed) measurements of one face
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceMetrics {
    pub pitch_deg: f64,
    pub gaze_ratio: f64,
    pub ear: f64,
}

/// Measure pitch, gaze ratio and EAR of one frame
pub fn measure(frame: &LandmarkFrame, width: u32, height: u32, cfg: &GeometryConfig) -> FaceMetrics {
    FaceMetrics {
        pitch_deg: estimate_head_pitch(frame, width, height, cfg),
        gaze_ratio: compute_gaze_ratio(frame, width, height, cfg),
        ear: compute_ear(frame, width, height, cfg),
    }
}

/// Solve the head pose from the six pose landmarks
pub fn solve_head_pose(
    frame: &LandmarkFrame,
    width: u32,
    height: u32,
    cfg: &GeometryConfig,
) -> Result<PoseSolution, PoseError> {
    let (w, h) = (f64::from(width), f64::from(height));
    let object: Vec<Vector3<f64>> = cfg
        .model_points
        .iter()
        .map(|&[x, y, z]| Vector3::new(x, y, z))
        .collect();
    let image: Vec<(f64, f64)> = cfg
        .pose_landmarks
        .iter()
        .map(|&idx| frame.pixel(idx, w, h))
        .collect();

    pose::solve_pnp(
        &object,
        &image,
        CameraIntrinsics::approximate(w, h),
        pose::frontal_orientation(),
        &cfg.solver,
    )
}

/// Head pitch in degrees, negative when tilted down
///
/// A failed solve reports 0.0 (neutral), so tracking glitches never look
/// like a lowered head.
pub fn estimate_head_pitch(frame: &LandmarkFrame, width: u32, height: u32, cfg: &GeometryConfig) -> f64 {
    match solve_head_pose(frame, width, height, cfg) {
        Ok(solution) => solution.pitch_degrees(),
        Err(e) => {
            trace!("Head pose solve failed, using neutral pitch: {}", e);
            0.0
        }
    }
}

/// Vertical iris position within the eyelids, averaged over both eyes
///
/// 0 is the upper lid, 1 the lower lid. Not clamped.
pub fn compute_gaze_ratio(frame: &LandmarkFrame, _width: u32, height: u32, cfg: &GeometryConfig) -> f64 {
    let h = f64::from(height);
    let left = eye_gaze_ratio(frame, &cfg.left_eye, h, cfg);
    let right = eye_gaze_ratio(frame, &cfg.right_eye, h, cfg);
    (left + right) / 2.0
}

/// Eye aspect ratio averaged over both eyes
pub fn compute_ear(frame: &LandmarkFrame, width: u32, height: u32, cfg: &GeometryConfig) -> f64 {
    let (w, h) = (f64::from(width), f64::from(height));
    let left = eye_aspect_ratio(frame, &cfg.left_eye, w, h, cfg);
    let right = eye_aspect_ratio(frame, &cfg.right_eye, w, h, cfg);
    (left + right) / 2.0
}

fn eye_gaze_ratio(frame: &LandmarkFrame, eye: &EyeTopology, height: f64, cfg: &GeometryConfig) -> f64 {
    let mean_y = |ids: &[usize]| ids.iter().map(|&i| frame.point(i).y * height).sum::<f64>() / ids.len() as f64;

    let top_y = mean_y(&eye.top_lid);
    let bottom_y = mean_y(&eye.bottom_lid);
    let iris_y = frame.point(eye.iris).y * height;

    let span = bottom_y - top_y;
    if span < cfg.degenerate_epsilon {
        return cfg.neutral_gaze_ratio;
    }
    (iris_y - top_y) / span
}

fn eye_aspect_ratio(frame: &LandmarkFrame, eye: &EyeTopology, width: f64, height: f64, cfg: &GeometryConfig) -> f64 {
    let p = eye.boundary.map(|i| frame.pixel(i, width, height));

    let v1 = distance(p[1], p[5]);
    let v2 = distance(p[2], p[4]);
    let h1 = distance(p[0], p[3]);

    if h1 < cfg.degenerate_epsilon {
        return cfg.neutral_ear;
    }
    (v1 + v2) / (2.0 * h1)
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - b.0).hypot(a.1 - b.1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SyntheticFace;
    use landmark_capture::{Landmark, FACE_MESH_LANDMARKS};

    fn blank_frame() -> LandmarkFrame {
        LandmarkFrame::new(vec![Landmark::default(); FACE_MESH_LANDMARKS]).unwrap()
    }

    #[test]
    fn test_frontal_face_measurements() {
        let cfg = GeometryConfig::default();
        let frame = SyntheticFace::new().gaze(0.5).ear(0.3).build();
        let metrics = measure(&frame, 640, 480, &cfg);

        assert!(metrics.pitch_deg.abs() < 0.1, "pitch {}", metrics.pitch_deg);
        assert!((metrics.gaze_ratio - 0.5).abs() < 1e-9);
        assert!((metrics.ear - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_face_mesh_frontal_layout_is_level() {
        // Frontal face 550 units from a 640x480 camera, FaceMesh labels:
        // 33/57 on the image left, 263/287 on the image right
        let mut points = vec![Landmark::new(0.5, 0.5, 0.0); FACE_MESH_LANDMARKS];
        for (idx, x, y) in [
            (1, 0.5, 0.5),
            (152, 0.5, 0.6508),
            (33, 0.4248, 0.4243),
            (263, 0.5752, 0.4243),
            (57, 0.4497, 0.5671),
            (287, 0.5503, 0.5671),
        ] {
            points[idx] = Landmark::new(x, y, 0.0);
        }
        let frame = LandmarkFrame::new(points).unwrap();

        let pitch = estimate_head_pitch(&frame, 640, 480, &GeometryConfig::default());
        assert!(pitch.abs() < 1.0, "pitch {}", pitch);
    }

    #[test]
    fn test_synthetic_face_uses_face_mesh_sides() {
        let cfg = GeometryConfig::default();
        let frame = SyntheticFace::new().build();
        let x = |i: usize| frame.point(i).x;

        assert!(x(33) < x(133) && x(133) < x(362) && x(362) < x(263));
        assert!(x(57) < x(287));
        assert!(x(cfg.left_eye.iris) < x(cfg.right_eye.iris));
    }

    #[test]
    fn test_head_tilt_sign() {
        let cfg = GeometryConfig::default();

        let down = SyntheticFace::new().tilt_down_deg(20.0).build();
        let pitch = estimate_head_pitch(&down, 640, 480, &cfg);
        assert!((pitch + 20.0).abs() < 0.1, "pitch {}", pitch);

        let up = SyntheticFace::new().tilt_down_deg(-12.0).turn_deg(15.0).build();
        let pitch = estimate_head_pitch(&up, 640, 480, &cfg);
        assert!((pitch - 12.0).abs() < 0.1, "pitch {}", pitch);
    }

    #[test]
    fn test_degenerate_pose_is_neutral() {
        let cfg = GeometryConfig::default();
        assert_eq!(estimate_head_pitch(&blank_frame(), 640, 480, &cfg), 0.0);
    }

    #[test]
    fn test_gaze_ratio_looking_down() {
        let cfg = GeometryConfig::default();
        let frame = SyntheticFace::new().gaze(0.75).build();
        assert!((compute_gaze_ratio(&frame, 640, 480, &cfg) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_gaze_ratio_degenerate_span() {
        let cfg = GeometryConfig::default();
        assert_eq!(compute_gaze_ratio(&blank_frame(), 640, 480, &cfg), 0.5);

        // Lower lid above the upper lid also counts as degenerate
        let mut points = vec![Landmark::default(); FACE_MESH_LANDMARKS];
        for eye in [&cfg.left_eye, &cfg.right_eye] {
            for &i in &eye.top_lid {
                points[i].y = 0.45;
            }
            for &i in &eye.bottom_lid {
                points[i].y = 0.40;
            }
            points[eye.iris].y = 0.43;
        }
        let frame = LandmarkFrame::new(points).unwrap();
        assert_eq!(compute_gaze_ratio(&frame, 640, 480, &cfg), 0.5);
    }

    #[test]
    fn test_gaze_ratio_averages_eyes() {
        let cfg = GeometryConfig::default();
        let mut points = vec![Landmark::default(); FACE_MESH_LANDMARKS];
        for (eye, iris_y) in [(&cfg.left_eye, 0.40), (&cfg.right_eye, 0.44)] {
            for &i in &eye.top_lid {
                points[i].y = 0.40;
            }
            for &i in &eye.bottom_lid {
                points[i].y = 0.44;
            }
            points[eye.iris].y = iris_y;
        }
        let frame = LandmarkFrame::new(points).unwrap();
        assert!((compute_gaze_ratio(&frame, 640, 480, &cfg) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_ear_closed_eyes() {
        let cfg = GeometryConfig::default();
        let frame = SyntheticFace::new().ear(0.1).build();
        assert!((compute_ear(&frame, 640, 480, &cfg) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_ear_zero_width_is_neutral() {
        let cfg = GeometryConfig::default();
        let mut points = vec![Landmark::default(); FACE_MESH_LANDMARKS];
        for eye in [&cfg.left_eye, &cfg.right_eye] {
            let [p1, p2, p3, p4, p5, p6] = eye.boundary;
            points[p1] = Landmark::new(0.4, 0.4, 0.0);
            points[p4] = Landmark::new(0.4, 0.4, 0.0);
            points[p2] = Landmark::new(0.39, 0.2, 0.0);
            points[p6] = Landmark::new(0.39, 0.6, 0.0);
            points[p3] = Landmark::new(0.41, 0.1, 0.0);
            points[p5] = Landmark::new(0.41, 0.7, 0.0);
        }
        let frame = LandmarkFrame::new(points).unwrap();
        assert_eq!(compute_ear(&frame, 640, 480, &cfg), 0.3);
    }

    #[test]
    fn test_custom_neutral_values() {
        let cfg = GeometryConfig {
            neutral_gaze_ratio: 0.4,
            neutral_ear: 0.25,
            ..Default::default()
        };
        let frame = blank_frame();
        assert_eq!(compute_gaze_ratio(&frame, 640, 480, &cfg), 0.4);
        assert_eq!(compute_ear(&frame, 640, 480, &cfg), 0.25);
    }
}
