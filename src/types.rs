use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeTuple, Serializer};

/// Hand landmark indices of the five fingertips (thumb, index, middle, ring, pinky).
pub const FINGERTIP_INDICES: [usize; 5] = [4, 8, 12, 16, 20];

/// Landmarks reported per detected hand.
pub const HAND_LANDMARK_COUNT: usize = 21;

/// The 33 body landmark names, in model output order. The downstream consumer
/// matches on these strings, so the list must stay byte-identical.
pub const POSE_LANDMARK_NAMES: [&str; 33] = [
    "NOSE",
    "LEFT_EYE_INNER",
    "LEFT_EYE",
    "LEFT_EYE_OUTER",
    "RIGHT_EYE_INNER",
    "RIGHT_EYE",
    "RIGHT_EYE_OUTER",
    "LEFT_EAR",
    "RIGHT_EAR",
    "MOUTH_LEFT",
    "MOUTH_RIGHT",
    "LEFT_SHOULDER",
    "RIGHT_SHOULDER",
    "LEFT_ELBOW",
    "RIGHT_ELBOW",
    "LEFT_WRIST",
    "RIGHT_WRIST",
    "LEFT_PINKY",
    "RIGHT_PINKY",
    "LEFT_INDEX",
    "RIGHT_INDEX",
    "LEFT_THUMB",
    "RIGHT_THUMB",
    "LEFT_HIP",
    "RIGHT_HIP",
    "LEFT_KNEE",
    "RIGHT_KNEE",
    "LEFT_ANKLE",
    "RIGHT_ANKLE",
    "LEFT_HEEL",
    "RIGHT_HEEL",
    "LEFT_FOOT_INDEX",
    "RIGHT_FOOT_INDEX",
];

/// A named 3D point. `x` and `y` are normalized to [0, 1] relative to the
/// frame dimensions; `z` is relative depth in the same scale as `x`.
#[derive(Debug, Clone, PartialEq)]
pub struct Landmark {
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(name: impl Into<String>, x: f32, y: f32, z: f32) -> Self {
        Self {
            name: name.into(),
            x,
            y,
            z,
        }
    }
}

// Wire form is the 4-tuple [name, x, y, z], not a map.
impl Serialize for Landmark {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tup = serializer.serialize_tuple(4)?;
        tup.serialize_element(&self.name)?;
        tup.serialize_element(&self.x)?;
        tup.serialize_element(&self.y)?;
        tup.serialize_element(&self.z)?;
        tup.end()
    }
}

impl<'de> Deserialize<'de> for Landmark {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (name, x, y, z) = <(String, f32, f32, f32)>::deserialize(deserializer)?;
        Ok(Self { name, x, y, z })
    }
}

/// Full-body pose landmarks. Empty when no body was detected.
#[derive(Debug, Clone, Default)]
pub struct PoseLandmarks {
    pub points: Vec<Landmark>,
}

/// One detected face's mesh landmarks.
#[derive(Debug, Clone, Default)]
pub struct FaceLandmarks {
    pub points: Vec<Landmark>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn label(&self) -> &'static str {
        match self {
            Handedness::Left => "Left",
            Handedness::Right => "Right",
        }
    }
}

/// One detected hand: handedness tag plus its 21 landmarks.
#[derive(Debug, Clone)]
pub struct HandLandmarks {
    pub handedness: Handedness,
    pub points: Vec<Landmark>,
}

/// The five fingertip landmarks of one hand. Always derived from a
/// `HandLandmarks` of the same tick; coordinates are copied, never recomputed.
#[derive(Debug, Clone)]
pub struct FingertipSet {
    pub handedness: Handedness,
    pub points: Vec<Landmark>,
}

impl FingertipSet {
    pub fn from_hand(hand: &HandLandmarks) -> Self {
        let label = hand.handedness.label();
        let points = FINGERTIP_INDICES
            .iter()
            .filter_map(|&i| hand.points.get(i).map(|lm| (i, lm)))
            .map(|(i, lm)| Landmark::new(format!("{}_Fingertip_{}", label, i), lm.x, lm.y, lm.z))
            .collect();
        Self {
            handedness: hand.handedness,
            points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_hand() -> HandLandmarks {
        let points = (0..HAND_LANDMARK_COUNT)
            .map(|i| {
                Landmark::new(
                    format!("Right_HandLandmark_{}", i),
                    i as f32 * 0.01,
                    0.5 - i as f32 * 0.01,
                    -0.02 * i as f32,
                )
            })
            .collect();
        HandLandmarks {
            handedness: Handedness::Right,
            points,
        }
    }

    #[test]
    fn fingertips_copy_hand_coordinates_exactly() {
        let hand = sample_hand();
        let tips = FingertipSet::from_hand(&hand);

        assert_eq!(tips.points.len(), 5);
        assert_eq!(tips.handedness, Handedness::Right);
        for (slot, &idx) in FINGERTIP_INDICES.iter().enumerate() {
            let tip = &tips.points[slot];
            let src = &hand.points[idx];
            assert_eq!(tip.x, src.x);
            assert_eq!(tip.y, src.y);
            assert_eq!(tip.z, src.z);
            assert_eq!(tip.name, format!("Right_Fingertip_{}", idx));
        }
    }

    #[test]
    fn fingertips_from_short_hand_do_not_panic() {
        // Degenerate hand with fewer than 21 points: missing indices are skipped.
        let hand = HandLandmarks {
            handedness: Handedness::Left,
            points: vec![Landmark::new("Left_HandLandmark_0", 0.1, 0.2, 0.0)],
        };
        let tips = FingertipSet::from_hand(&hand);
        assert!(tips.points.is_empty());
    }

    #[test]
    fn landmark_serializes_as_named_tuple() {
        let lm = Landmark::new("NOSE", 0.25, 0.75, -0.1);
        let json = serde_json::to_string(&lm).unwrap();
        assert_eq!(json, r#"["NOSE",0.25,0.75,-0.1]"#);

        let back: Landmark = serde_json::from_str(&json).unwrap();
        assert_eq!(back, lm);
    }

    #[test]
    fn pose_name_table_is_complete() {
        assert_eq!(POSE_LANDMARK_NAMES.len(), 33);
        assert_eq!(POSE_LANDMARK_NAMES[0], "NOSE");
        assert_eq!(POSE_LANDMARK_NAMES[32], "RIGHT_FOOT_INDEX");
    }
}
