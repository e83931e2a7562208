use serde::Deserialize;

use crate::{
    error::UploadError,
    types::{Skeleton, SkeletonPoint},
};

/// Landmark names of the 33-point body model, by index.
pub const LANDMARK_NAMES: [&str; 33] = [
    "nose",
    "left_eye_inner",
    "left_eye",
    "left_eye_outer",
    "right_eye_inner",
    "right_eye",
    "right_eye_outer",
    "left_ear",
    "right_ear",
    "mouth_left",
    "mouth_right",
    "left_shoulder",
    "right_shoulder",
    "left_elbow",
    "right_elbow",
    "left_wrist",
    "right_wrist",
    "left_pinky",
    "right_pinky",
    "left_index",
    "right_index",
    "left_thumb",
    "right_thumb",
    "left_hip",
    "right_hip",
    "left_knee",
    "right_knee",
    "left_ankle",
    "right_ankle",
    "left_heel",
    "right_heel",
    "left_foot_index",
    "right_foot_index",
];

/// The two backend protocol versions. They disagree on form field names and
/// on where ground contact lives in the response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseSchema {
    /// `{skeleton: [{x, y, z, visibility}], ground_contacts: [name]}`
    ContactList,
    /// `{skeleton: [{x, y, min, label, ground_contact}]}`
    PointFlags,
}

impl ResponseSchema {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "contacts" | "contact_list" | "a" => Some(ResponseSchema::ContactList),
            "points" | "point_flags" | "b" => Some(ResponseSchema::PointFlags),
            _ => None,
        }
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            ResponseSchema::ContactList => "http://10.0.0.22:8000/process-frame/",
            ResponseSchema::PointFlags => "http://10.0.0.22:8000/skeleton/",
        }
    }

    pub fn image_field(&self) -> &'static str {
        match self {
            ResponseSchema::ContactList => "file",
            ResponseSchema::PointFlags => "frame",
        }
    }

    pub fn depth_field(&self) -> &'static str {
        match self {
            ResponseSchema::ContactList => "depthData",
            ResponseSchema::PointFlags => "depth",
        }
    }

    pub fn decode(&self, body: &[u8]) -> Result<Skeleton, UploadError> {
        match self {
            ResponseSchema::ContactList => {
                let response: ContactListResponse = serde_json::from_slice(body)?;
                Ok(response.into_skeleton())
            }
            ResponseSchema::PointFlags => {
                let response: PointFlagsResponse = serde_json::from_slice(body)?;
                Ok(response.into_skeleton())
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ContactListPoint {
    x: f32,
    y: f32,
    z: f32,
    visibility: f32,
}

#[derive(Debug, Deserialize)]
struct ContactListResponse {
    skeleton: Vec<ContactListPoint>,
    ground_contacts: Vec<String>,
}

impl ContactListResponse {
    fn into_skeleton(self) -> Skeleton {
        let contacts = self.ground_contacts;
        let points = self
            .skeleton
            .into_iter()
            .enumerate()
            .map(|(idx, p)| {
                let label = LANDMARK_NAMES.get(idx).map(|name| name.to_string());
                let ground_contact = label
                    .as_deref()
                    .is_some_and(|name| contacts.iter().any(|c| c == name));
                SkeletonPoint {
                    x: p.x,
                    y: p.y,
                    z: Some(p.z),
                    visibility: Some(p.visibility),
                    min: None,
                    label,
                    ground_contact,
                }
            })
            .collect();
        Skeleton::new(points, contacts)
    }
}

#[derive(Debug, Deserialize)]
struct PointFlagsPoint {
    x: f32,
    y: f32,
    min: f32,
    label: String,
    ground_contact: bool,
}

#[derive(Debug, Deserialize)]
struct PointFlagsResponse {
    skeleton: Vec<PointFlagsPoint>,
}

impl PointFlagsResponse {
    fn into_skeleton(self) -> Skeleton {
        let mut contacts = Vec::new();
        let points = self
            .skeleton
            .into_iter()
            .map(|p| {
                if p.ground_contact {
                    contacts.push(p.label.clone());
                }
                SkeletonPoint {
                    x: p.x,
                    y: p.y,
                    z: None,
                    visibility: None,
                    min: Some(p.min),
                    label: Some(p.label),
                    ground_contact: p.ground_contact,
                }
            })
            .collect();
        Skeleton::new(points, contacts)
    }
}
