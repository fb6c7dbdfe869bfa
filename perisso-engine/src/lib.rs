pub mod channel;
pub mod collection;
pub mod command;
pub mod resolver;
pub mod session;
pub mod wire;

pub use channel::{ChannelError, CommandChannel};
pub use collection::{Bound, ElementCollection, Needle};
pub use errors::{EngineError, QueryError};
pub use resolver::{FieldResolver, FieldResult, FieldValue};
pub use session::{AsElementSlice, HighlightColors, HighlightOptions, Session};

pub mod errors {
    use perisso_core::geometry::GeometryError;
    use thiserror::Error;

    use crate::channel::ChannelError;

    /// 本地模型操作错误。
    #[derive(Debug, Error)]
    pub enum EngineError {
        #[error("element with guid {0} not found")]
        ElementNotFound(String),
        #[error("element with guid {0} already exists")]
        DuplicateElement(String),
        #[error("`{0}` is not a valid GUID")]
        InvalidGuid(String),
        #[error("unknown property {0}")]
        UnknownProperty(String),
    }

    /// 集合查询错误。逐元素的字段解析失败不在此列，它们只会把元素排除出结果。
    #[derive(Debug, Error)]
    pub enum QueryError {
        #[error("illegal state: {0}")]
        IllegalState(String),
        #[error("type mismatch: {0}")]
        TypeMismatch(String),
        #[error("index {index} out of range for collection of {len} element(s)")]
        IndexOutOfRange { index: isize, len: usize },
        #[error("property `{group}` / `{name}` not found")]
        PropertyNotFound { group: String, name: String },
        #[error("malformed response to {command}: {message}")]
        MalformedResponse { command: String, message: String },
        #[error("failed to encode parameters for {command}: {source}")]
        Encode {
            command: String,
            #[source]
            source: serde_json::Error,
        },
        #[error(transparent)]
        Channel(#[from] ChannelError),
        #[error(transparent)]
        Geometry(#[from] GeometryError),
    }

    impl QueryError {
        pub(crate) fn malformed(command: &str, message: impl Into<String>) -> Self {
            Self::MalformedResponse {
                command: command.to_string(),
                message: message.into(),
            }
        }
    }
}

pub mod model {
    use std::collections::BTreeMap;

    use perisso_core::element::{ElementType, is_guid, new_guid};
    use perisso_core::geometry::{BoundingBox3D, Coordinate};
    use perisso_core::color::Color;
    use serde::{Deserialize, Serialize};
    use serde_json::{Value, json};
    use tracing::debug;

    use crate::errors::EngineError;

    /// 内建属性（非本地化名称）及其固定 GUID。
    pub const BUILTIN_PROPERTIES: &[(&str, &str)] = &[
        ("General_ElementID", ELEMENT_ID_GUID),
        ("IdAndCategories_ParentId", "3C1A2B7E-5D40-4F2A-9B61-0C8E2D3F4A10"),
        ("IdAndCategories_HotlinkMasterID", "A4F0C2D1-6B3E-4C7A-8E95-1D2F3A4B5C60"),
        ("General_HotlinkAndElementID", "B5E1D3C2-7A4F-4D8B-9FA6-2E3F4B5C6D71"),
        ("ModelView_LayerName", LAYER_NAME_GUID),
        ("General_UniqueID", "D7031F5E-9C61-4FAD-B1C8-40516D7E8F93"),
    ];

    const UNIQUE_ID: &str = "General_UniqueID";
    const ELEMENT_ID_GUID: &str = "7E221F33-829B-4FBC-A670-E74DABCE6289";
    const LAYER_NAME_GUID: &str = "C6F2E4D3-8B50-4E9C-A0B7-3F405C6D7E82";

    pub fn builtin_property_guid(name: &str) -> Option<&'static str> {
        BUILTIN_PROPERTIES
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, guid)| *guid)
    }

    pub fn is_builtin_property(guid: &str) -> bool {
        BUILTIN_PROPERTIES.iter().any(|(_, candidate)| *candidate == guid)
    }

    /// 用户自定义属性，按 `(group, name)` 定位。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct PropertyDefinition {
        pub guid: String,
        pub group: String,
        pub name: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ModelElement {
        pub guid: String,
        #[serde(rename = "type")]
        pub element_type: ElementType,
        #[serde(default)]
        pub details: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub bounding_box: Option<BoundingBox3D>,
        /// 按属性 GUID 存放的取值。
        #[serde(default)]
        pub values: BTreeMap<String, Value>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct HighlightState {
        pub elements: Vec<String>,
        pub colors: Vec<Color>,
        pub muted: Option<Color>,
        pub wireframe: bool,
    }

    /// 离线模型：代替运行中的应用回答 Add-On 命令。
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct Model {
        #[serde(default)]
        elements: Vec<ModelElement>,
        #[serde(default)]
        properties: Vec<PropertyDefinition>,
        #[serde(default)]
        selection: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        highlight: Option<HighlightState>,
    }

    #[derive(Debug, Clone)]
    pub struct DemoElements {
        pub wall: String,
        pub beam_a: String,
        pub column: String,
        pub beam_b: String,
        pub slab: String,
        pub morph: String,
    }

    impl Model {
        pub fn new() -> Self {
            Self::default()
        }

        #[inline]
        pub fn len(&self) -> usize {
            self.elements.len()
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.elements.is_empty()
        }

        pub fn elements(&self) -> impl Iterator<Item = &ModelElement> + '_ {
            self.elements.iter()
        }

        pub fn element(&self, guid: &str) -> Option<&ModelElement> {
            self.elements.iter().find(|element| element.guid == guid)
        }

        fn element_mut(&mut self, guid: &str) -> Result<&mut ModelElement, EngineError> {
            self.elements
                .iter_mut()
                .find(|element| element.guid == guid)
                .ok_or_else(|| EngineError::ElementNotFound(guid.to_string()))
        }

        #[inline]
        pub fn properties(&self) -> &[PropertyDefinition] {
            &self.properties
        }

        /// 新增元素并返回生成的 GUID。
        pub fn add_element(&mut self, element_type: ElementType, details: Value) -> String {
            let guid = new_guid();
            self.elements.push(ModelElement {
                guid: guid.clone(),
                element_type,
                details,
                bounding_box: None,
                values: BTreeMap::new(),
            });
            guid
        }

        pub fn insert_element(&mut self, element: ModelElement) -> Result<(), EngineError> {
            if !is_guid(&element.guid) {
                return Err(EngineError::InvalidGuid(element.guid));
            }
            if self.element(&element.guid).is_some() {
                return Err(EngineError::DuplicateElement(element.guid));
            }
            self.elements.push(element);
            Ok(())
        }

        pub fn set_bounding_box(
            &mut self,
            guid: &str,
            bounding_box: BoundingBox3D,
        ) -> Result<(), EngineError> {
            self.element_mut(guid)?.bounding_box = Some(bounding_box);
            Ok(())
        }

        /// 注册用户自定义属性；已存在时返回原有 GUID。
        pub fn define_user_property(&mut self, group: &str, name: &str) -> String {
            if let Some(guid) = self.user_property_guid(group, name) {
                return guid.to_string();
            }
            let guid = new_guid();
            self.properties.push(PropertyDefinition {
                guid: guid.clone(),
                group: group.to_string(),
                name: name.to_string(),
            });
            guid
        }

        pub fn user_property_guid(&self, group: &str, name: &str) -> Option<&str> {
            self.properties
                .iter()
                .find(|definition| definition.group == group && definition.name == name)
                .map(|definition| definition.guid.as_str())
        }

        pub fn is_known_property(&self, guid: &str) -> bool {
            is_builtin_property(guid) || self.properties.iter().any(|d| d.guid == guid)
        }

        pub fn set_value(
            &mut self,
            guid: &str,
            property_guid: &str,
            value: Value,
        ) -> Result<(), EngineError> {
            if !self.is_known_property(property_guid) {
                return Err(EngineError::UnknownProperty(property_guid.to_string()));
            }
            self.element_mut(guid)?
                .values
                .insert(property_guid.to_string(), value);
            Ok(())
        }

        /// 设置内建属性值；`General_UniqueID` 由元素 GUID 决定，不可写入。
        pub fn set_builtin(
            &mut self,
            guid: &str,
            name: &str,
            value: impl Into<String>,
        ) -> Result<(), EngineError> {
            let property = builtin_property_guid(name)
                .filter(|_| name != UNIQUE_ID)
                .ok_or_else(|| EngineError::UnknownProperty(name.to_string()))?;
            self.set_value(guid, property, Value::String(value.into()))
        }

        /// 设置用户自定义属性值，属性未注册时自动注册。
        pub fn set_user_value(
            &mut self,
            guid: &str,
            group: &str,
            name: &str,
            value: Value,
        ) -> Result<(), EngineError> {
            let property = self.define_user_property(group, name);
            self.set_value(guid, &property, value)
        }

        /// 读取属性值。未知元素返回 `None`，元素没有该值时返回 `Some(None)`。
        pub fn property_value(&self, guid: &str, property_guid: &str) -> Option<Option<Value>> {
            let element = self.element(guid)?;
            if builtin_property_guid(UNIQUE_ID) == Some(property_guid) {
                return Some(Some(Value::String(element.guid.clone())));
            }
            Some(element.values.get(property_guid).cloned())
        }

        pub fn select(&mut self, guid: &str) -> Result<(), EngineError> {
            if self.element(guid).is_none() {
                return Err(EngineError::ElementNotFound(guid.to_string()));
            }
            if !self.selection.iter().any(|selected| selected == guid) {
                self.selection.push(guid.to_string());
            }
            Ok(())
        }

        #[inline]
        pub fn clear_selection(&mut self) {
            self.selection.clear();
        }

        #[inline]
        pub fn selection(&self) -> &[String] {
            &self.selection
        }

        #[inline]
        pub fn highlight(&self) -> Option<&HighlightState> {
            self.highlight.as_ref()
        }

        pub fn set_highlight(&mut self, state: Option<HighlightState>) {
            self.highlight = state;
        }

        /// 为 CLI / 快速验证填充一组示例元素，返回关键元素 GUID。
        pub fn populate_demo(&mut self) -> DemoElements {
            use std::f64::consts::FRAC_PI_2;

            self.clear_selection();

            let fire_rating = self.define_user_property("Pset_Demo", "FireRating");
            let weight = self.define_user_property("Pset_Demo", "Weight");
            let rate = |element: &mut ModelElement, rating: &str, kg: f64| {
                element.values.insert(fire_rating.clone(), json!(rating));
                element.values.insert(weight.clone(), json!(kg));
            };

            let wall = self.push_demo_element(
                ElementType::Wall,
                "W-001",
                "Structural - Bearing",
                json!({
                    "geometryType": "Straight",
                    "begCoordinate": {"x": 0.0, "y": 0.0},
                    "endCoordinate": {"x": 6.0, "y": 0.0},
                    "height": 3.0,
                    "thickness": 0.3
                }),
            );
            rate(wall, "REI 90", 1200.0);
            let wall = wall.guid.clone();

            let beam_a = self
                .push_demo_element(
                    ElementType::Beam,
                    "B-001",
                    "Structural - Framing",
                    json!({
                        "begCoordinate": {"x": 0.0, "y": 0.0},
                        "endCoordinate": {"x": 4.0, "y": 3.0}
                    }),
                )
                .guid
                .clone();

            let column = self.push_demo_element(
                ElementType::Column,
                "C-001",
                "Structural - Bearing",
                json!({"origin": {"x": 6.0, "y": 0.0}, "height": 3.0}),
            );
            rate(column, "REI 120", 450.5);
            let column = column.guid.clone();

            let beam_b = self
                .push_demo_element(
                    ElementType::Beam,
                    "B-002",
                    "Structural - Framing",
                    json!({
                        "begCoordinate": {"x": 0.0, "y": 5.0},
                        "endCoordinate": {"x": 4.0, "y": 5.0},
                        "arcAngle": FRAC_PI_2
                    }),
                )
                .guid
                .clone();

            let slab = self.push_demo_element(
                ElementType::Slab,
                "S-001",
                "Structural - Slab",
                json!({
                    "thickness": 0.25,
                    "level": 3.0,
                    "polygonCoordinates": [
                        {"x": 0.0, "y": 0.0},
                        {"x": 6.0, "y": 0.0},
                        {"x": 6.0, "y": 5.0},
                        {"x": 0.0, "y": 5.0}
                    ],
                    "polygonArcs": []
                }),
            );
            rate(slab, "REI 60", 3800.0);
            let slab = slab.guid.clone();

            let morph = self.push_demo_element(
                ElementType::Morph,
                "M-001",
                "Interior - Furniture",
                json!({}),
            );
            morph.bounding_box = Some(BoundingBox3D::new(
                Coordinate::new_3d(1.0, 1.0, 0.0),
                Coordinate::new_3d(2.0, 2.5, 3.2),
            ));
            let morph = morph.guid.clone();

            let ids = DemoElements {
                wall,
                beam_a,
                column,
                beam_b,
                slab,
                morph,
            };

            debug!(
                wall = %ids.wall,
                column = %ids.column,
                slab = %ids.slab,
                morph = %ids.morph,
                "已创建演示元素"
            );

            ids
        }

        /// 新建带编号与图层的演示元素。
        fn push_demo_element(
            &mut self,
            element_type: ElementType,
            id: &str,
            layer: &str,
            details: Value,
        ) -> &mut ModelElement {
            let values = BTreeMap::from([
                (ELEMENT_ID_GUID.to_string(), json!(id)),
                (LAYER_NAME_GUID.to_string(), json!(layer)),
            ]);
            let index = self.elements.len();
            self.elements.push(ModelElement {
                guid: new_guid(),
                element_type,
                details,
                bounding_box: None,
                values,
            });
            &mut self.elements[index]
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn demo_population_creates_elements() {
            let mut model = Model::new();
            let ids = model.populate_demo();
            assert_eq!(model.len(), 6);
            assert_eq!(
                model.element(&ids.morph).map(|e| e.element_type),
                Some(ElementType::Morph)
            );
            assert!(model.element(&ids.morph).and_then(|e| e.bounding_box).is_some());
            assert!(model.user_property_guid("Pset_Demo", "FireRating").is_some());
        }

        #[test]
        fn demo_elements_carry_ids_layers_and_ratings() {
            let mut model = Model::new();
            let ids = model.populate_demo();
            let element_id = builtin_property_guid("General_ElementID").expect("builtin");
            let layer = builtin_property_guid("ModelView_LayerName").expect("builtin");
            assert_eq!(
                model.property_value(&ids.wall, element_id),
                Some(Some(json!("W-001")))
            );
            assert_eq!(
                model.property_value(&ids.morph, layer),
                Some(Some(json!("Interior - Furniture")))
            );

            let rating = model
                .user_property_guid("Pset_Demo", "FireRating")
                .expect("rating")
                .to_string();
            assert_eq!(
                model.property_value(&ids.slab, &rating),
                Some(Some(json!("REI 60")))
            );
            assert_eq!(model.property_value(&ids.beam_a, &rating), Some(None));
        }

        #[test]
        fn unique_id_reports_element_guid() {
            let mut model = Model::new();
            let guid = model.add_element(ElementType::Wall, Value::Null);
            let unique = builtin_property_guid("General_UniqueID").expect("builtin");
            assert_eq!(
                model.property_value(&guid, unique),
                Some(Some(Value::String(guid.clone())))
            );
            assert!(model.set_builtin(&guid, "General_UniqueID", "x").is_err());
            assert_eq!(model.property_value("missing", unique), None);
        }

        #[test]
        fn selection_requires_known_elements() {
            let mut model = Model::new();
            let guid = model.add_element(ElementType::Slab, Value::Null);
            model.select(&guid).expect("select slab");
            model.select(&guid).expect("select twice");
            assert_eq!(model.selection(), &[guid.clone()]);

            let err = model.select("missing").unwrap_err();
            assert!(matches!(err, EngineError::ElementNotFound(_)));
            model.clear_selection();
            assert!(model.selection().is_empty());
        }

        #[test]
        fn values_require_registered_properties() {
            let mut model = Model::new();
            let guid = model.add_element(ElementType::Door, Value::Null);
            let err = model
                .set_value(&guid, "00000000-0000-0000-0000-000000000000", json!(1))
                .unwrap_err();
            assert!(matches!(err, EngineError::UnknownProperty(_)));

            model
                .set_user_value(&guid, "Group", "Name", json!(true))
                .expect("auto-register");
            let property = model.user_property_guid("Group", "Name").expect("defined");
            assert_eq!(model.property_value(&guid, property), Some(Some(json!(true))));
        }

        #[test]
        fn insert_element_validates_guid() {
            let mut model = Model::new();
            let element = ModelElement {
                guid: "bogus".to_string(),
                element_type: ElementType::Zone,
                details: Value::Null,
                bounding_box: None,
                values: BTreeMap::new(),
            };
            assert!(matches!(
                model.insert_element(element.clone()),
                Err(EngineError::InvalidGuid(_))
            ));

            let valid = ModelElement {
                guid: new_guid(),
                ..element
            };
            model.insert_element(valid.clone()).expect("insert");
            assert!(matches!(
                model.insert_element(valid),
                Err(EngineError::DuplicateElement(_))
            ));
        }
    }
}
