//! Synthetic landmark frames for tests

use crate::config::{EyeTopology, GeometryConfig};
use crate::pose::{frontal_orientation, CameraIntrinsics};
use landmark_capture::{Landmark, LandmarkFrame, FACE_MESH_LANDMARKS};
use nalgebra::{Rotation3, Vector3};

pub(crate) const WIDTH: u32 = 640;
pub(crate) const HEIGHT: u32 = 480;

/// Horizontal eye width (normalized) used by the synthetic layout
const EYE_WIDTH: f64 = 0.06;

/// Builds a 640x480 face with a known pose, gaze ratio and EAR
///
/// Pose landmarks are projections of the canonical model; eyes are laid out
/// from the projected outer corners so the pose and eye metrics stay
/// independent.
pub(crate) struct SyntheticFace {
    tilt_down_rad: f64,
    turn_rad: f64,
    gaze: f64,
    ear: f64,
    translation: Vector3<f64>,
}

impl SyntheticFace {
    pub(crate) fn new() -> Self {
        Self {
            tilt_down_rad: 0.0,
            turn_rad: 0.0,
            gaze: 0.5,
            ear: 0.3,
            translation: Vector3::new(10.0, -15.0, 550.0),
        }
    }

    pub(crate) fn tilt_down_deg(mut self, degrees: f64) -> Self {
        self.tilt_down_rad = degrees.to_radians();
        self
    }

    pub(crate) fn turn_deg(mut self, degrees: f64) -> Self {
        self.turn_rad = degrees.to_radians();
        self
    }

    pub(crate) fn gaze(mut self, ratio: f64) -> Self {
        self.gaze = ratio;
        self
    }

    pub(crate) fn ear(mut self, ear: f64) -> Self {
        self.ear = ear;
        self
    }

    pub(crate) fn build(&self) -> LandmarkFrame {
        let cfg = GeometryConfig::default();
        let (w, h) = (f64::from(WIDTH), f64::from(HEIGHT));
        let camera = CameraIntrinsics::approximate(w, h);
        let rotation = Rotation3::from_euler_angles(self.tilt_down_rad, self.turn_rad, 0.0) * frontal_orientation();

        let mut points = vec![Landmark::new(0.5, 0.5, 0.0); FACE_MESH_LANDMARKS];
        for (&idx, &[x, y, z]) in cfg.pose_landmarks.iter().zip(&cfg.model_points) {
            let (u, v) = camera
                .project(&(rotation * Vector3::new(x, y, z) + self.translation))
                .expect("synthetic face in front of camera");
            points[idx] = Landmark::new(u / w, v / h, 0.0);
        }

        // EAR = (2 * 2d * h) / (2 * EYE_WIDTH * w) for half-opening d
        let half_open = self.ear * EYE_WIDTH * w / (2.0 * h);
        // 33 is the image-left outer corner, 263 the image-right one
        self.place_eye(&mut points, &cfg.left_eye, 0, 3, EYE_WIDTH, half_open);
        self.place_eye(&mut points, &cfg.right_eye, 3, 0, -EYE_WIDTH, half_open);

        LandmarkFrame::new(points).expect("full face mesh")
    }

    fn place_eye(
        &self,
        points: &mut [Landmark],
        eye: &EyeTopology,
        outer: usize,
        inner: usize,
        inward: f64,
        half_open: f64,
    ) {
        let corner = points[eye.boundary[outer]];
        let (cx, cy) = (corner.x + inward / 2.0, corner.y);
        points[eye.boundary[inner]] = Landmark::new(corner.x + inward, cy, 0.0);

        // P1 is the image-left corner of both eyes
        for (slot, dx, dy) in [(1, -0.01, -1.0), (5, -0.01, 1.0), (2, 0.01, -1.0), (4, 0.01, 1.0)] {
            points[eye.boundary[slot]] = Landmark::new(cx + dx, cy + dy * half_open, 0.0);
        }
        for &i in &eye.top_lid {
            points[i].y = cy - half_open;
        }
        for &i in &eye.bottom_lid {
            points[i].y = cy + half_open;
        }
        points[eye.iris] = Landmark::new(cx, cy - half_open + self.gaze * 2.0 * half_open, 0.0);
    }
}
