use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: String,
    pub session_id: Uuid,
    pub filename: String,
    pub point_count: usize,
    /// False when the upload was a triangle mesh.
    pub is_point_cloud: bool,
    pub bounding_box: BoundingBox,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_camel_case() {
        let response = UploadResponse {
            message: "File uploaded successfully".into(),
            session_id: Uuid::nil(),
            filename: "scan.ply".into(),
            point_count: 3,
            is_point_cloud: true,
            bounding_box: BoundingBox {
                min: [0.0, 0.0, 0.0],
                max: [1.0, 2.0, 3.0],
            },
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["pointCount"], 3);
        assert_eq!(value["isPointCloud"], true);
        assert_eq!(value["sessionId"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(value["boundingBox"]["max"][2], 3.0);
    }
}
