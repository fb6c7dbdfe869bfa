use std::fmt;
use std::sync::Arc;

use perisso_core::color::Color;
use perisso_core::element::Element;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{info, trace, warn};

use crate::channel::{ChannelError, CommandChannel};
use crate::collection::ElementCollection;
use crate::errors::QueryError;
use crate::wire::{
    self, BoundingBoxEntry, BoundingBoxesResponse, DetailsResponse, ElementDetails,
    ElementPropertyValues, Elements, ExecutionResult, HighlightParams, Outcome, PropertyIdRef,
    PropertyIdsParams, PropertyIdsResponse, PropertyQuery, PropertyValuesParams,
    PropertyValuesResponse,
};

/// 高亮颜色：统一颜色或逐元素颜色列表。
#[derive(Debug, Clone, PartialEq)]
pub enum HighlightColors {
    Single(Color),
    PerElement(Vec<Color>),
}

/// 高亮参数，默认值为绿色高亮、灰色淡化与三维线框。
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightOptions {
    pub colors: HighlightColors,
    pub muted: Color,
    pub wireframe: bool,
}

impl Default for HighlightOptions {
    fn default() -> Self {
        Self {
            colors: HighlightColors::Single(Color::HIGHLIGHT),
            muted: Color::MUTED,
            wireframe: true,
        }
    }
}

impl HighlightOptions {
    pub fn single(color: Color) -> Self {
        Self {
            colors: HighlightColors::Single(color),
            ..Self::default()
        }
    }

    pub fn per_element(colors: Vec<Color>) -> Self {
        Self {
            colors: HighlightColors::PerElement(colors),
            ..Self::default()
        }
    }

    pub fn with_muted(mut self, muted: Color) -> Self {
        self.muted = muted;
        self
    }

    pub fn with_wireframe(mut self, wireframe: bool) -> Self {
        self.wireframe = wireframe;
        self
    }

    /// 展开为与元素数量一致的颜色列表：过长截断，过短重复最后一项，空列表使用默认高亮色。
    pub fn colors_for(&self, count: usize) -> Vec<Color> {
        match &self.colors {
            HighlightColors::Single(color) => vec![*color; count],
            HighlightColors::PerElement(colors) => {
                let last = colors.last().copied().unwrap_or(Color::HIGHLIGHT);
                (0..count)
                    .map(|i| colors.get(i).copied().unwrap_or(last))
                    .collect()
            }
        }
    }
}

/// 在公共边界把各种元素容器统一为有序切片。
pub trait AsElementSlice {
    fn as_element_slice(&self) -> &[Element];
}

impl AsElementSlice for [Element] {
    fn as_element_slice(&self) -> &[Element] {
        self
    }
}

impl AsElementSlice for Vec<Element> {
    fn as_element_slice(&self) -> &[Element] {
        self
    }
}

impl<const N: usize> AsElementSlice for [Element; N] {
    fn as_element_slice(&self) -> &[Element] {
        self
    }
}

impl AsElementSlice for ElementCollection {
    fn as_element_slice(&self) -> &[Element] {
        self.get()
    }
}

/// 与远端应用的会话：持有命令通道与默认高亮参数。克隆开销很小。
#[derive(Clone)]
pub struct Session {
    channel: Arc<dyn CommandChannel>,
    highlight: HighlightOptions,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("highlight", &self.highlight)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(channel: Arc<dyn CommandChannel>) -> Self {
        Self {
            channel,
            highlight: HighlightOptions::default(),
        }
    }

    pub fn with_highlight(mut self, highlight: HighlightOptions) -> Self {
        self.highlight = highlight;
        self
    }

    #[inline]
    pub fn highlight_options(&self) -> &HighlightOptions {
        &self.highlight
    }

    #[inline]
    pub fn channel(&self) -> &Arc<dyn CommandChannel> {
        &self.channel
    }

    /// 调用命令并按类型解码应答。
    pub fn call<P, R>(&self, command: &str, params: Option<&P>) -> Result<R, QueryError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let params = params
            .map(serde_json::to_value)
            .transpose()
            .map_err(|source| QueryError::Encode {
                command: command.to_string(),
                source,
            })?;
        trace!(command, "调用远端命令");
        let response = self.channel.invoke(command, params)?;
        serde_json::from_value(response).map_err(|err| QueryError::malformed(command, err.to_string()))
    }

    pub fn all_elements(&self) -> Result<ElementCollection, QueryError> {
        let response: Elements = self.call::<Value, _>(wire::GET_ALL_ELEMENTS, None)?;
        Ok(self.collection(response.elements))
    }

    /// 当前选中元素；选中集为空时退化为全部元素。
    pub fn selected_elements(&self) -> Result<ElementCollection, QueryError> {
        let response: Elements = self.call::<Value, _>(wire::GET_SELECTED_ELEMENTS, None)?;
        if response.elements.is_empty() {
            info!("选中集为空，改用全部元素");
            return self.all_elements();
        }
        Ok(self.collection(response.elements))
    }

    pub fn collection(&self, elements: impl Into<Vec<Element>>) -> ElementCollection {
        ElementCollection::new(self.clone(), elements.into())
    }

    /// 接受 `{"elements": [...]}` 或裸数组形式的元素列表。
    pub fn collection_from_raw(&self, raw: &Value) -> Result<ElementCollection, QueryError> {
        let list = match raw {
            Value::Object(map) => map.get("elements").ok_or_else(|| {
                QueryError::TypeMismatch("expected an object with an `elements` list".to_string())
            })?,
            Value::Array(_) => raw,
            other => {
                return Err(QueryError::TypeMismatch(format!(
                    "expected an element list, got {other}"
                )));
            }
        };
        let elements: Vec<Element> = serde_json::from_value(list.clone())
            .map_err(|err| QueryError::TypeMismatch(err.to_string()))?;
        Ok(self.collection(elements))
    }

    pub fn builtin_property_id(&self, name: &str) -> Result<String, QueryError> {
        self.property_id(PropertyQuery::BuiltIn {
            non_localized_name: name.to_string(),
        })
        .map_err(|err| match err {
            QueryError::PropertyNotFound { .. } => QueryError::PropertyNotFound {
                group: "BuiltIn".to_string(),
                name: name.to_string(),
            },
            other => other,
        })
    }

    pub fn user_property_id(&self, group: &str, name: &str) -> Result<String, QueryError> {
        self.property_id(PropertyQuery::UserDefined {
            localized_name: [group.to_string(), name.to_string()],
        })
    }

    fn property_id(&self, query: PropertyQuery) -> Result<String, QueryError> {
        let (group, name) = match &query {
            PropertyQuery::BuiltIn { non_localized_name } => {
                ("BuiltIn".to_string(), non_localized_name.clone())
            }
            PropertyQuery::UserDefined {
                localized_name: [group, name],
            } => (group.clone(), name.clone()),
        };
        let params = PropertyIdsParams {
            properties: vec![query],
        };
        let response: PropertyIdsResponse = self.call(wire::GET_PROPERTY_IDS, Some(&params))?;
        match response.properties.into_iter().next() {
            Some(Outcome::Success(found)) => Ok(found.property_id.guid),
            Some(Outcome::Failed { .. }) => Err(QueryError::PropertyNotFound { group, name }),
            None => Err(QueryError::malformed(wire::GET_PROPERTY_IDS, "empty property list")),
        }
    }

    /// 批量读取单个属性，结果与输入位置对齐。
    pub fn property_values(
        &self,
        elements: &[Element],
        property_guid: &str,
    ) -> Result<Vec<Outcome<ElementPropertyValues>>, QueryError> {
        if elements.is_empty() {
            return Ok(Vec::new());
        }
        let params = PropertyValuesParams {
            elements: elements.to_vec(),
            properties: vec![PropertyIdRef::new(property_guid)],
        };
        let response: PropertyValuesResponse =
            self.call(wire::GET_PROPERTY_VALUES_OF_ELEMENTS, Some(&params))?;
        aligned(
            wire::GET_PROPERTY_VALUES_OF_ELEMENTS,
            elements.len(),
            response.property_values_for_elements,
        )
    }

    pub fn details(
        &self,
        elements: &[Element],
    ) -> Result<Vec<Outcome<ElementDetails>>, QueryError> {
        if elements.is_empty() {
            return Ok(Vec::new());
        }
        let params = Elements {
            elements: elements.to_vec(),
        };
        let response: DetailsResponse = self.call(wire::GET_DETAILS_OF_ELEMENTS, Some(&params))?;
        aligned(
            wire::GET_DETAILS_OF_ELEMENTS,
            elements.len(),
            response.details_of_elements,
        )
    }

    pub fn bounding_boxes(
        &self,
        elements: &[Element],
    ) -> Result<Vec<Outcome<BoundingBoxEntry>>, QueryError> {
        if elements.is_empty() {
            return Ok(Vec::new());
        }
        let params = Elements {
            elements: elements.to_vec(),
        };
        let response: BoundingBoxesResponse =
            self.call(wire::GET_3D_BOUNDING_BOXES, Some(&params))?;
        aligned(
            wire::GET_3D_BOUNDING_BOXES,
            elements.len(),
            response.bounding_boxes,
        )
    }

    pub fn highlight<E>(&self, elements: &E, options: &HighlightOptions) -> Result<(), QueryError>
    where
        E: AsElementSlice + ?Sized,
    {
        let elements = elements.as_element_slice();
        if elements.is_empty() {
            warn!("没有可高亮的元素");
        }
        let params = HighlightParams {
            elements: elements.to_vec(),
            highlighted_colors: options.colors_for(elements.len()),
            wireframe: Some(options.wireframe),
            non_highlighted_color: Some(options.muted),
        };
        self.execute(wire::HIGHLIGHT_ELEMENTS, &params)?;
        info!(count = elements.len(), "已高亮元素");
        Ok(())
    }

    pub fn clear_highlight(&self) -> Result<(), QueryError> {
        let params = HighlightParams {
            elements: Vec::new(),
            highlighted_colors: Vec::new(),
            wireframe: None,
            non_highlighted_color: None,
        };
        self.execute(wire::HIGHLIGHT_ELEMENTS, &params)?;
        info!("已清除高亮");
        Ok(())
    }

    /// 调用无返回数据的命令；应答中 `success: false` 视为远端错误。
    fn execute<P: Serialize>(&self, command: &str, params: &P) -> Result<(), QueryError> {
        let response: Value = self.call(command, Some(params))?;
        match serde_json::from_value::<ExecutionResult>(response) {
            Ok(result) if !result.success => {
                let (code, message) = result
                    .error
                    .map(|err| (err.code, err.message))
                    .unwrap_or((-1, format!("{command} failed")));
                Err(ChannelError::Remote { code, message }.into())
            }
            _ => Ok(()),
        }
    }
}

fn aligned<T>(command: &str, expected: usize, entries: Vec<T>) -> Result<Vec<T>, QueryError> {
    if entries.len() != expected {
        return Err(QueryError::malformed(
            command,
            format!("expected {expected} entries, got {}", entries.len()),
        ));
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::command::CommandBus;
    use crate::model::Model;

    fn demo_session() -> (Session, Arc<CommandBus>, crate::model::DemoElements) {
        let mut model = Model::new();
        let ids = model.populate_demo();
        let bus = Arc::new(CommandBus::with_model(model));
        (Session::new(bus.clone()), bus, ids)
    }

    #[test]
    fn highlight_colors_follow_element_count() {
        let red = Color::rgb(255, 0, 0);
        let blue = Color::rgb(0, 0, 255);
        let options = HighlightOptions::per_element(vec![red, blue]);
        assert_eq!(options.colors_for(4), vec![red, blue, blue, blue]);
        assert_eq!(options.colors_for(1), vec![red]);
        assert_eq!(
            HighlightOptions::per_element(Vec::new()).colors_for(2),
            vec![Color::HIGHLIGHT; 2]
        );
        assert_eq!(HighlightOptions::default().colors_for(3), vec![Color::HIGHLIGHT; 3]);
    }

    #[test]
    fn selection_falls_back_to_all_elements() {
        let (session, bus, ids) = demo_session();
        assert_eq!(session.selected_elements().expect("fallback").count(), 6);

        bus.model().select(&ids.beam_a).expect("select");
        let selected = session.selected_elements().expect("selected");
        assert_eq!(selected.count(), 1);
        assert!(selected.contains_guid(&ids.beam_a));
    }

    #[test]
    fn raw_element_lists_are_accepted() {
        let (session, _, ids) = demo_session();
        let wrapped = json!({"elements": [{"elementId": {"guid": ids.wall}}]});
        let bare = json!([{"elementId": {"guid": ids.wall}}]);
        assert_eq!(session.collection_from_raw(&wrapped).expect("wrapped").count(), 1);
        assert_eq!(session.collection_from_raw(&bare).expect("bare").count(), 1);
        assert!(matches!(
            session.collection_from_raw(&json!("nope")),
            Err(QueryError::TypeMismatch(_))
        ));
    }

    #[test]
    fn property_lookup_reports_missing_properties() {
        let (session, _, _) = demo_session();
        assert!(session.user_property_id("Pset_Demo", "Weight").is_ok());
        assert!(session.builtin_property_id("General_ElementID").is_ok());
        let err = session.user_property_id("Pset_Demo", "Missing").unwrap_err();
        assert!(matches!(
            err,
            QueryError::PropertyNotFound { ref group, ref name } if group == "Pset_Demo" && name == "Missing"
        ));
    }

    #[test]
    fn highlight_and_clear_round_trip() {
        let (session, bus, ids) = demo_session();
        let elements = vec![Element::new(ids.wall.clone()), Element::new(ids.slab.clone())];
        session
            .highlight(&elements, &HighlightOptions::single(Color::rgb(255, 0, 0)))
            .expect("highlight");
        let state = bus.model().highlight().cloned().expect("state");
        assert_eq!(state.colors, vec![Color::rgb(255, 0, 0); 2]);
        assert_eq!(state.muted, Some(Color::MUTED));

        session.clear_highlight().expect("clear");
        assert!(bus.model().highlight().is_none());
    }

    #[test]
    fn failed_execution_result_is_a_remote_error() {
        struct Refusing;

        impl CommandChannel for Refusing {
            fn invoke(&self, _command: &str, _params: Option<Value>) -> Result<Value, ChannelError> {
                Ok(json!({"success": false, "error": {"code": 7, "message": "busy"}}))
            }
        }

        let session = Session::new(Arc::new(Refusing));
        let err = session.clear_highlight().unwrap_err();
        assert!(matches!(
            err,
            QueryError::Channel(ChannelError::Remote { code: 7, .. })
        ));
    }
}
