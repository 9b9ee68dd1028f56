//! Annotation drawing on the display copy of a frame.
//!
//! Everything here draws into a caller-owned `RgbImage`; reported landmark
//! values are never touched. Landmark coordinates are normalized, so every
//! drawing call scales by the frame dimensions and clips out-of-bounds points.

use image::{Rgb, RgbImage};

use crate::types::{FaceLandmarks, FingertipSet, PoseLandmarks};

const SKELETON_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const MESH_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const FINGERTIP_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const FINGERTIP_RADIUS: i32 = 5;

/// Body landmark index pairs forming the skeleton edges.
pub const POSE_CONNECTIONS: [(usize, usize); 35] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 7),
    (0, 4),
    (4, 5),
    (5, 6),
    (6, 8),
    (9, 10),
    (11, 12),
    (11, 13),
    (13, 15),
    (15, 17),
    (15, 19),
    (15, 21),
    (17, 19),
    (12, 14),
    (14, 16),
    (16, 18),
    (16, 20),
    (16, 22),
    (18, 20),
    (11, 23),
    (12, 24),
    (23, 24),
    (23, 25),
    (24, 26),
    (25, 27),
    (26, 28),
    (27, 29),
    (28, 30),
    (29, 31),
    (30, 32),
    (27, 31),
    (28, 32),
];

fn put_pixel_checked(frame: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < frame.width() && (y as u32) < frame.height() {
        frame.put_pixel(x as u32, y as u32, color);
    }
}

fn draw_line(frame: &mut RgbImage, x0: f32, y0: f32, x1: f32, y1: f32, color: Rgb<u8>) {
    let mut t = 0.0;
    while t <= 1.0 {
        let px = x0 + (x1 - x0) * t;
        let py = y0 + (y1 - y0) * t;
        put_pixel_checked(frame, px as i32, py as i32, color);
        t += 0.002;
    }
}

fn draw_disc(frame: &mut RgbImage, cx: i32, cy: i32, radius: i32, color: Rgb<u8>) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put_pixel_checked(frame, cx + dx, cy + dy, color);
            }
        }
    }
}

/// Skeleton lines over the body landmarks.
pub fn draw_pose(frame: &mut RgbImage, pose: &PoseLandmarks) {
    let w = frame.width() as f32;
    let h = frame.height() as f32;
    for &(a, b) in POSE_CONNECTIONS.iter() {
        let (Some(pa), Some(pb)) = (pose.points.get(a), pose.points.get(b)) else {
            continue;
        };
        draw_line(frame, pa.x * w, pa.y * h, pb.x * w, pb.y * h, SKELETON_COLOR);
    }
}

/// Mesh contour dots, 2x2 per landmark.
pub fn draw_face_mesh(frame: &mut RgbImage, face: &FaceLandmarks) {
    let w = frame.width() as f32;
    let h = frame.height() as f32;
    for lm in &face.points {
        let px = (lm.x * w) as i32;
        let py = (lm.y * h) as i32;
        for dy in 0..2 {
            for dx in 0..2 {
                put_pixel_checked(frame, px + dx, py + dy, MESH_COLOR);
            }
        }
    }
}

/// Filled circles on the fingertips.
pub fn draw_fingertips(frame: &mut RgbImage, tips: &FingertipSet) {
    let w = frame.width() as f32;
    let h = frame.height() as f32;
    for lm in &tips.points {
        draw_disc(
            frame,
            (lm.x * w) as i32,
            (lm.y * h) as i32,
            FINGERTIP_RADIUS,
            FINGERTIP_COLOR,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FingertipSet, HandLandmarks, Handedness, Landmark};

    #[test]
    fn fingertip_disc_lands_on_the_scaled_position() {
        let mut frame = RgbImage::new(100, 100);
        let hand = HandLandmarks {
            handedness: Handedness::Left,
            points: (0..21)
                .map(|i| Landmark::new(format!("Left_HandLandmark_{}", i), 0.5, 0.5, 0.0))
                .collect(),
        };
        let tips = FingertipSet::from_hand(&hand);

        draw_fingertips(&mut frame, &tips);
        assert_eq!(*frame.get_pixel(50, 50), FINGERTIP_COLOR);
    }

    #[test]
    fn out_of_bounds_landmarks_are_clipped() {
        let mut frame = RgbImage::new(10, 10);
        let hand = HandLandmarks {
            handedness: Handedness::Right,
            points: (0..21)
                .map(|i| Landmark::new(format!("Right_HandLandmark_{}", i), 2.0, -1.0, 0.0))
                .collect(),
        };
        let tips = FingertipSet::from_hand(&hand);

        // Must not panic.
        draw_fingertips(&mut frame, &tips);

        let mut pose = PoseLandmarks::default();
        pose.points = (0..33)
            .map(|i| Landmark::new(format!("P{}", i), -0.5, 1.5, 0.0))
            .collect();
        draw_pose(&mut frame, &pose);
    }

    #[test]
    fn sparse_pose_skips_missing_connection_endpoints() {
        let mut frame = RgbImage::new(10, 10);
        let pose = PoseLandmarks {
            points: vec![Landmark::new("NOSE", 0.5, 0.5, 0.0)],
        };
        // Only landmark 0 exists; all connections referencing others are skipped.
        draw_pose(&mut frame, &pose);
    }
}
