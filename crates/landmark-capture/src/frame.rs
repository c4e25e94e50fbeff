//! Landmark frame types

use crate::CaptureError;
use serde::{Deserialize, Serialize};

/// Minimum point count of a refined FaceMesh frame (468 mesh + 10 iris)
pub const FACE_MESH_LANDMARKS: usize = 478;

/// Single normalized landmark
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// Horizontal position, fraction of image width
    pub x: f64,
    /// Vertical position, fraction of image height
    pub y: f64,
    /// Relative depth
    #[serde(default)]
    pub z: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Landmarks of one detected face, indexed by the FaceMesh topology
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkFrame {
    points: Vec<Landmark>,
}

impl LandmarkFrame {
    /// Create a frame, rejecting point sets too short for the topology
    pub fn new(points: Vec<Landmark>) -> Result<Self, CaptureError> {
        if points.len() < FACE_MESH_LANDMARKS {
            return Err(CaptureError::Format(format!(
                "expected at least {} landmarks, got {}",
                FACE_MESH_LANDMARKS,
                points.len()
            )));
        }
        Ok(Self { points })
    }

    /// Landmark at topology index `idx`
    ///
    /// Panics if `idx` is outside the frame; every topology index is below
    /// [`FACE_MESH_LANDMARKS`], which `new` guarantees.
    pub fn point(&self, idx: usize) -> &Landmark {
        &self.points[idx]
    }

    /// Landmark at `idx` scaled to pixel coordinates
    pub fn pixel(&self, idx: usize, width: f64, height: f64) -> (f64, f64) {
        let p = self.point(idx);
        (p.x * width, p.y * height)
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// One camera frame worth of detector output
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Frame sequence number
    pub sequence: u32,
    /// Landmarks of the tracked face, `None` when no face was detected
    pub landmarks: Option<LandmarkFrame>,
}

impl CapturedFrame {
    pub fn new(width: u32, height: u32, sequence: u32, landmarks: Option<LandmarkFrame>) -> Self {
        Self {
            width,
            height,
            sequence,
            landmarks,
        }
    }

    /// Frame in which the detector found no face
    pub fn no_face(width: u32, height: u32, sequence: u32) -> Self {
        Self::new(width, height, sequence, None)
    }

    pub fn face_detected(&self) -> bool {
        self.landmarks.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_pixel_scaling() {
        let mut points = vec![Landmark::default(); FACE_MESH_LANDMARKS];
        points[1] = Landmark::new(0.5, 0.25, -0.1);
        let frame = LandmarkFrame::new(points).unwrap();

        assert_eq!(frame.pixel(1, 640.0, 480.0), (320.0, 120.0));
        assert_eq!(frame.point(1).z, -0.1);
    }

    #[test]
    fn test_no_face_frame() {
        let frame = CapturedFrame::no_face(640, 480, 7);
        assert!(!frame.face_detected());
        assert_eq!(frame.sequence, 7);
    }

    proptest! {
        #[test]
        fn test_short_frames_rejected(len in 0usize..FACE_MESH_LANDMARKS) {
            let result = LandmarkFrame::new(vec![Landmark::default(); len]);
            prop_assert!(matches!(result, Err(CaptureError::Format(_))));
        }

        #[test]
        fn test_full_frames_accepted(extra in 0usize..16) {
            let frame = LandmarkFrame::new(vec![Landmark::default(); FACE_MESH_LANDMARKS + extra]).unwrap();
            prop_assert_eq!(frame.len(), FACE_MESH_LANDMARKS + extra);
        }
    }
}
