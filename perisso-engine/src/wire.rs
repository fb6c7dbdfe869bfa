//! Add-On 命令的 JSON 载荷。字段名与命令接口保持一致。

use perisso_core::color::Color;
use perisso_core::element::Element;
use perisso_core::geometry::BoundingBox3D;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const GET_ALL_ELEMENTS: &str = "GetAllElements";
pub const GET_SELECTED_ELEMENTS: &str = "GetSelectedElements";
pub const GET_PROPERTY_IDS: &str = "GetPropertyIds";
pub const GET_PROPERTY_VALUES_OF_ELEMENTS: &str = "GetPropertyValuesOfElements";
pub const GET_DETAILS_OF_ELEMENTS: &str = "GetDetailsOfElements";
pub const GET_3D_BOUNDING_BOXES: &str = "Get3DBoundingBoxes";
pub const HIGHLIGHT_ELEMENTS: &str = "HighlightElements";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireError {
    pub code: i64,
    pub message: String,
}

impl WireError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// 逐项结果：`{"error": {...}}` 或成功载荷。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Outcome<T> {
    Failed { error: WireError },
    Success(T),
}

impl<T> Outcome<T> {
    pub fn failed(code: i64, message: impl Into<String>) -> Self {
        Outcome::Failed {
            error: WireError::new(code, message),
        }
    }

    pub fn into_result(self) -> Result<T, WireError> {
        match self {
            Outcome::Success(value) => Ok(value),
            Outcome::Failed { error } => Err(error),
        }
    }

    pub fn as_result(&self) -> Result<&T, &WireError> {
        match self {
            Outcome::Success(value) => Ok(value),
            Outcome::Failed { error } => Err(error),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Elements {
    pub elements: Vec<Element>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PropertyQuery {
    BuiltIn {
        #[serde(rename = "nonLocalizedName")]
        non_localized_name: String,
    },
    UserDefined {
        #[serde(rename = "localizedName")]
        localized_name: [String; 2],
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyIdsParams {
    pub properties: Vec<PropertyQuery>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyId {
    pub guid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyIdRef {
    pub property_id: PropertyId,
}

impl PropertyIdRef {
    pub fn new(guid: impl Into<String>) -> Self {
        Self {
            property_id: PropertyId { guid: guid.into() },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyIdsResponse {
    pub properties: Vec<Outcome<PropertyIdRef>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyValuesParams {
    pub elements: Vec<Element>,
    pub properties: Vec<PropertyIdRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyValue {
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyValueSlot {
    pub property_value: PropertyValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementPropertyValues {
    pub property_values: Vec<Outcome<PropertyValueSlot>>,
}

impl ElementPropertyValues {
    /// 第一个请求属性的取值；整项缺失时视为错误。
    pub fn first(&self) -> Result<&Value, String> {
        match self.property_values.first() {
            Some(Outcome::Success(slot)) => Ok(&slot.property_value.value),
            Some(Outcome::Failed { error }) => Err(error.message.clone()),
            None => Err("no property value returned".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyValuesResponse {
    pub property_values_for_elements: Vec<Outcome<ElementPropertyValues>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementDetails {
    #[serde(rename = "type")]
    pub element_type: String,
    #[serde(default)]
    pub details: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailsResponse {
    pub details_of_elements: Vec<Outcome<ElementDetails>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBoxEntry {
    #[serde(rename = "boundingBox3D")]
    pub bounding_box: BoundingBox3D,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBoxesResponse {
    #[serde(rename = "boundingBoxes3D")]
    pub bounding_boxes: Vec<Outcome<BoundingBoxEntry>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightParams {
    pub elements: Vec<Element>,
    pub highlighted_colors: Vec<Color>,
    #[serde(rename = "wireframe3D", default, skip_serializing_if = "Option::is_none")]
    pub wireframe: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_highlighted_color: Option<Color>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WireError>,
}

impl ExecutionResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn outcome_decodes_error_and_success_entries() {
        let response: PropertyValuesResponse = serde_json::from_value(json!({
            "propertyValuesForElements": [
                {"propertyValues": [{"propertyValue": {"value": "W-001"}}]},
                {"propertyValues": [{"error": {"code": 1, "message": "no value"}}]},
                {"error": {"code": 2, "message": "element not found"}}
            ]
        }))
        .expect("decode");

        let entries = response.property_values_for_elements;
        assert_eq!(
            entries[0].as_result().map(|e| e.first().cloned()),
            Ok(Ok(json!("W-001")))
        );
        assert_eq!(
            entries[1].as_result().map(|e| e.first().cloned()),
            Ok(Err("no value".to_string()))
        );
        assert!(matches!(&entries[2], Outcome::Failed { error } if error.code == 2));
    }

    #[test]
    fn property_query_uses_type_tag() {
        let params = PropertyIdsParams {
            properties: vec![
                PropertyQuery::BuiltIn {
                    non_localized_name: "General_ElementID".to_string(),
                },
                PropertyQuery::UserDefined {
                    localized_name: ["Group".to_string(), "Name".to_string()],
                },
            ],
        };
        assert_eq!(
            serde_json::to_value(&params).expect("encode"),
            json!({"properties": [
                {"type": "BuiltIn", "nonLocalizedName": "General_ElementID"},
                {"type": "UserDefined", "localizedName": ["Group", "Name"]}
            ]})
        );
    }

    #[test]
    fn highlight_params_match_command_schema() {
        let params = HighlightParams {
            elements: vec![Element::new("216E9CE2-8007-334A-9D8C-FB0EC7EC083C")],
            highlighted_colors: vec![Color::HIGHLIGHT],
            wireframe: Some(true),
            non_highlighted_color: Some(Color::MUTED),
        };
        let json = serde_json::to_value(&params).expect("encode");
        assert_eq!(json["highlightedColors"], json!([[77, 235, 103, 100]]));
        assert_eq!(json["wireframe3D"], json!(true));
        assert_eq!(json["nonHighlightedColor"], json!([164, 166, 165, 128]));
    }

    #[test]
    fn bounding_boxes_use_3d_suffix() {
        let response: BoundingBoxesResponse = serde_json::from_value(json!({
            "boundingBoxes3D": [{"boundingBox3D": {
                "xMin": 0.0, "yMin": 0.0, "zMin": 1.0,
                "xMax": 1.0, "yMax": 1.0, "zMax": 4.5
            }}]
        }))
        .expect("decode");
        let entry = response.bounding_boxes[0].as_result().expect("success");
        assert_eq!(entry.bounding_box.size().z, Some(3.5));
    }
}
