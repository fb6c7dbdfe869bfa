//! 字段解析：把过滤字段映射为逐元素取值，结果与输入元素按位置对齐。
//!
//! 每次调用都会重新向远端查询，不做任何缓存。

use std::fmt;

use perisso_core::curve::{Arc, ArcSegment, Polyline};
use perisso_core::element::{Element, ElementType, Filter};
use perisso_core::geometry::Coordinate;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::QueryError;
use crate::session::Session;
use crate::wire::ElementDetails;

const NOT_IMPLEMENTED: &str = "not implemented";

/// 字段取值。内建属性总是文本，用户属性保留原始类型。
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl FieldValue {
    /// 空值与无法表示的 JSON 数字视为解析失败。
    pub fn from_json(value: &Value) -> FieldResult {
        match value {
            Value::String(text) => Ok(FieldValue::Text(text.clone())),
            Value::Bool(flag) => Ok(FieldValue::Bool(*flag)),
            Value::Number(number) => number
                .as_i64()
                .map(FieldValue::Integer)
                .or_else(|| number.as_f64().map(FieldValue::Float))
                .ok_or_else(|| format!("unsupported number {number}")),
            Value::Null => Err("no value".to_string()),
            other => Ok(FieldValue::Text(other.to_string())),
        }
    }

    /// 数值比较使用的浮点值；文本按浮点数解析，布尔值不参与数值比较。
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Text(text) => text.trim().parse().ok(),
            FieldValue::Integer(value) => Some(*value as f64),
            FieldValue::Float(value) => Some(*value),
            FieldValue::Bool(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::Integer(value) => write!(f, "{value}"),
            FieldValue::Float(value) => write!(f, "{value:?}"),
            FieldValue::Bool(flag) => write!(f, "{flag}"),
        }
    }
}

/// 单个元素的解析结果，错误以消息形式保留。
pub type FieldResult = Result<FieldValue, String>;

pub struct FieldResolver<'a> {
    session: &'a Session,
}

impl<'a> FieldResolver<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// 解析 `field`。`property` 仅在 [`Filter::Property`] 时使用，为属性 GUID。
    pub fn resolve(
        &self,
        field: Filter,
        property: Option<&str>,
        elements: &[Element],
    ) -> Result<Vec<FieldResult>, QueryError> {
        if elements.is_empty() {
            return Ok(Vec::new());
        }
        match field {
            Filter::Id
            | Filter::ParentId
            | Filter::HotlinkId
            | Filter::HotlinkElementId
            | Filter::Layer
            | Filter::Guid => {
                let name = field.builtin_property().ok_or_else(|| {
                    QueryError::IllegalState(format!("{field} is not a built-in property"))
                })?;
                self.builtin(name, elements)
            }
            Filter::Property => {
                let property = property.ok_or_else(|| {
                    QueryError::IllegalState(
                        "PROPERTY requires a property chosen with property(group, name)"
                            .to_string(),
                    )
                })?;
                self.property(property, elements)
            }
            Filter::ElementType => self.element_type(elements),
            Filter::Height => self.height(elements),
            Filter::Length => self.length(elements),
        }
    }

    fn builtin(&self, name: &str, elements: &[Element]) -> Result<Vec<FieldResult>, QueryError> {
        let guid = self.session.builtin_property_id(name)?;
        let entries = self.session.property_values(elements, &guid)?;
        Ok(entries
            .iter()
            .map(|entry| -> FieldResult {
                let values = entry.as_result().map_err(|err| err.message.clone())?;
                Ok(FieldValue::Text(match values.first()? {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                }))
            })
            .collect())
    }

    fn property(&self, guid: &str, elements: &[Element]) -> Result<Vec<FieldResult>, QueryError> {
        let entries = self.session.property_values(elements, guid)?;
        Ok(entries
            .iter()
            .map(|entry| -> FieldResult {
                let values = entry.as_result().map_err(|err| err.message.clone())?;
                FieldValue::from_json(values.first()?)
            })
            .collect())
    }

    /// 远端对某元素的详情查询报错时（如元素已被删除），该元素记为失败，不猜测类型。
    fn element_type(&self, elements: &[Element]) -> Result<Vec<FieldResult>, QueryError> {
        Ok(self
            .session
            .details(elements)?
            .into_iter()
            .map(|entry| {
                entry
                    .into_result()
                    .map(|details| FieldValue::Text(details.element_type))
                    .map_err(|err| err.message)
            })
            .collect())
    }

    /// 自由形体取包围盒 Z 向尺寸，楼板取厚度，其余类型未实现。
    fn height(&self, elements: &[Element]) -> Result<Vec<FieldResult>, QueryError> {
        let details = self.session.details(elements)?;
        let morphs: Vec<usize> = details
            .iter()
            .enumerate()
            .filter(|(_, entry)| {
                matches!(entry.as_result(), Ok(d) if d.element_type == ElementType::Morph.as_str())
            })
            .map(|(index, _)| index)
            .collect();
        let morph_elements: Vec<Element> =
            morphs.iter().map(|&index| elements[index].clone()).collect();
        let mut boxes = self.session.bounding_boxes(&morph_elements)?.into_iter();

        Ok(details
            .into_iter()
            .map(|entry| -> FieldResult {
                let details = entry.into_result().map_err(|err| err.message)?;
                if details.element_type == ElementType::Morph.as_str() {
                    let bounding_box = boxes
                        .next()
                        .ok_or_else(|| "missing bounding box".to_string())?
                        .into_result()
                        .map_err(|err| err.message)?
                        .bounding_box;
                    Ok(FieldValue::Float(bounding_box.z_max - bounding_box.z_min))
                } else if details.element_type == ElementType::Slab.as_str() {
                    details
                        .details
                        .get("thickness")
                        .and_then(Value::as_f64)
                        .map(FieldValue::Float)
                        .ok_or_else(|| "slab has no thickness".to_string())
                } else {
                    Err(NOT_IMPLEMENTED.to_string())
                }
            })
            .collect())
    }

    fn length(&self, elements: &[Element]) -> Result<Vec<FieldResult>, QueryError> {
        Ok(self
            .session
            .details(elements)?
            .into_iter()
            .map(|entry| -> FieldResult {
                let details = entry.into_result().map_err(|err| err.message)?;
                element_length(&details).map(FieldValue::Float)
            })
            .collect())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LineDetails {
    beg_coordinate: Coordinate,
    end_coordinate: Coordinate,
    #[serde(default)]
    arc_angle: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PolygonDetails {
    polygon_coordinates: Vec<Coordinate>,
    #[serde(default)]
    polygon_arcs: Vec<ArcSegment>,
}

/// 根据细节数据计算长度：多段线、起止点（可带圆弧角）或闭合轮廓周长。
fn element_length(details: &ElementDetails) -> Result<f64, String> {
    let data = &details.details;
    if data.get("coordinates").is_some() {
        let polyline: Polyline =
            serde_json::from_value(data.clone()).map_err(|err| err.to_string())?;
        return Ok(polyline.length());
    }
    if data.get("begCoordinate").is_some() {
        let line: LineDetails = serde_json::from_value(data.clone()).map_err(|err| err.to_string())?;
        return Ok(Arc::new(line.beg_coordinate, line.end_coordinate, line.arc_angle).length());
    }
    if data.get("polygonCoordinates").is_some() {
        let polygon: PolygonDetails =
            serde_json::from_value(data.clone()).map_err(|err| err.to_string())?;
        let outline = Polyline::new(polygon.polygon_coordinates, polygon.polygon_arcs, true)
            .map_err(|err| err.to_string())?;
        return Ok(outline.length());
    }
    Err(NOT_IMPLEMENTED.to_string())
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;
    use std::sync::Arc as SharedArc;

    use serde_json::json;

    use super::*;
    use crate::command::CommandBus;
    use crate::model::Model;

    fn details(element_type: &str, data: Value) -> ElementDetails {
        ElementDetails {
            element_type: element_type.to_string(),
            details: data,
        }
    }

    #[test]
    fn field_values_parse_as_numbers() {
        assert_eq!(FieldValue::Text(" 2.5 ".to_string()).as_f64(), Some(2.5));
        assert_eq!(FieldValue::Text("W-001".to_string()).as_f64(), None);
        assert_eq!(FieldValue::Integer(3).as_f64(), Some(3.0));
        assert_eq!(FieldValue::Bool(true).as_f64(), None);
        assert_eq!(FieldValue::Float(3.0).to_string(), "3.0");
        assert_eq!(FieldValue::from_json(&json!(7)), Ok(FieldValue::Integer(7)));
        assert!(FieldValue::from_json(&Value::Null).is_err());
    }

    #[test]
    fn length_from_line_arc_and_polygon_details() {
        let line = details(
            "Wall",
            json!({"begCoordinate": {"x": 0.0, "y": 0.0}, "endCoordinate": {"x": 3.0, "y": 4.0}}),
        );
        assert_eq!(element_length(&line), Ok(5.0));

        let arc = details(
            "Beam",
            json!({
                "begCoordinate": {"x": 1.0, "y": 0.0},
                "endCoordinate": {"x": -1.0, "y": 0.0},
                "arcAngle": PI
            }),
        );
        let length = element_length(&arc).expect("arc length");
        assert!((length - PI).abs() < 1e-12);

        let slab = details(
            "Slab",
            json!({"polygonCoordinates": [
                {"x": 0.0, "y": 0.0}, {"x": 2.0, "y": 0.0}, {"x": 2.0, "y": 1.0}, {"x": 0.0, "y": 1.0}
            ]}),
        );
        assert_eq!(element_length(&slab), Ok(6.0));

        let polyline = details(
            "PolyLine",
            json!({"coordinates": [{"x": 0.0, "y": 0.0}, {"x": 0.0, "y": 2.0}], "arcs": []}),
        );
        assert_eq!(element_length(&polyline), Ok(2.0));
    }

    #[test]
    fn length_failures_become_messages() {
        let column = details("Column", json!({"origin": {"x": 0.0, "y": 0.0}}));
        assert_eq!(element_length(&column), Err(NOT_IMPLEMENTED.to_string()));

        let broken = details(
            "PolyLine",
            json!({"coordinates": [{"x": 0.0, "y": 0.0}], "arcs": [{"begIndex": 0, "arcAngle": 1.0}]}),
        );
        assert!(element_length(&broken).is_err());
    }

    #[test]
    fn height_covers_morphs_and_slabs_only() {
        let mut model = Model::new();
        let ids = model.populate_demo();
        let session = Session::new(SharedArc::new(CommandBus::with_model(model)));
        let elements = [
            Element::new(ids.morph.clone()),
            Element::new(ids.slab.clone()),
            Element::new(ids.wall.clone()),
        ];

        let heights = FieldResolver::new(&session)
            .resolve(Filter::Height, None, &elements)
            .expect("resolve");
        assert_eq!(heights.len(), 3);
        assert!(matches!(heights[0], Ok(FieldValue::Float(h)) if (h - 3.2).abs() < 1e-12));
        assert_eq!(heights[1], Ok(FieldValue::Float(0.25)));
        assert_eq!(heights[2], Err(NOT_IMPLEMENTED.to_string()));
    }

    #[test]
    fn element_type_fails_only_for_unknown_elements() {
        let mut model = Model::new();
        let ids = model.populate_demo();
        let session = Session::new(SharedArc::new(CommandBus::with_model(model)));
        let elements = [
            Element::new(ids.column.clone()),
            Element::new("216E9CE2-8007-334A-9D8C-FB0EC7EC083C"),
        ];

        let types = FieldResolver::new(&session)
            .resolve(Filter::ElementType, None, &elements)
            .expect("resolve");
        assert_eq!(types[0], Ok(FieldValue::Text("Column".to_string())));
        assert!(types[1].is_err());
    }

    #[test]
    fn property_filter_requires_a_property_id() {
        let session = Session::new(SharedArc::new(CommandBus::new()));
        let elements = [Element::new("216E9CE2-8007-334A-9D8C-FB0EC7EC083C")];
        let err = FieldResolver::new(&session)
            .resolve(Filter::Property, None, &elements)
            .unwrap_err();
        assert!(matches!(err, QueryError::IllegalState(_)));
    }
}
