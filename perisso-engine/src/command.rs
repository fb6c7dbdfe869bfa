use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use perisso_core::element::Element;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};

use crate::channel::{ChannelError, CommandChannel};
use crate::model::{HighlightState, Model, is_builtin_property};
use crate::wire::{
    self, BoundingBoxEntry, BoundingBoxesResponse, DetailsResponse, ElementDetails,
    ElementPropertyValues, Elements, ExecutionResult, HighlightParams, Outcome, PropertyIdRef,
    PropertyIdsParams, PropertyIdsResponse, PropertyQuery, PropertyValue, PropertyValueSlot,
    PropertyValuesParams, PropertyValuesResponse,
};

pub const ERROR_ELEMENT_NOT_FOUND: i64 = 4001;
pub const ERROR_PROPERTY_NOT_FOUND: i64 = 4002;
pub const ERROR_NO_VALUE: i64 = 4003;
pub const ERROR_NO_BOUNDING_BOX: i64 = 4004;

#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub name: String,
    pub params: Option<Value>,
}

impl CommandRequest {
    pub fn new(name: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    fn decode<T: DeserializeOwned>(&self) -> Result<T, ChannelError> {
        let params = self.params.clone().unwrap_or(Value::Null);
        serde_json::from_value(params).map_err(|err| ChannelError::InvalidParameters {
            command: self.name.clone(),
            message: err.to_string(),
        })
    }
}

pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &'static str;
    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> Result<Value, ChannelError>;
}

pub struct CommandContext<'a> {
    pub model: &'a mut Model,
}

/// 进程内命令总线：按名称分发到处理器，并以互斥锁保护模型。
pub struct CommandBus {
    handlers: HashMap<&'static str, Box<dyn CommandHandler>>,
    model: Mutex<Model>,
}

impl CommandBus {
    pub fn new() -> Self {
        Self::with_model(Model::new())
    }

    pub fn with_model(model: Model) -> Self {
        let mut bus = Self {
            handlers: HashMap::new(),
            model: Mutex::new(model),
        };
        bus.register(GetAllElementsCommand);
        bus.register(GetSelectedElementsCommand);
        bus.register(GetPropertyIdsCommand);
        bus.register(GetPropertyValuesCommand);
        bus.register(GetDetailsCommand);
        bus.register(GetBoundingBoxesCommand);
        bus.register(HighlightElementsCommand);
        bus
    }

    pub fn register<H: CommandHandler + 'static>(&mut self, handler: H) {
        self.handlers.insert(handler.name(), Box::new(handler));
    }

    pub fn dispatch(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> Result<Value, ChannelError> {
        match self.handlers.get(request.name.as_str()) {
            Some(handler) => handler.execute(request, context),
            None => Err(ChannelError::UnknownCommand(request.name.clone())),
        }
    }

    pub fn available_commands(&self) -> impl Iterator<Item = &&'static str> {
        self.handlers.keys()
    }

    /// 锁定模型。处理器 panic 后模型仍保持一致，因此忽略锁中毒。
    pub fn model(&self) -> MutexGuard<'_, Model> {
        self.model.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for CommandBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut commands: Vec<_> = self.handlers.keys().collect();
        commands.sort();
        f.debug_struct("CommandBus")
            .field("commands", &commands)
            .field("elements", &self.model.try_lock().ok().map(|model| model.len()))
            .finish()
    }
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandChannel for CommandBus {
    fn invoke(&self, command: &str, params: Option<Value>) -> Result<Value, ChannelError> {
        trace!(command, "分发命令");
        let request = CommandRequest::new(command, params);
        let mut model = self.model();
        let mut context = CommandContext { model: &mut model };
        self.dispatch(&request, &mut context)
    }
}

fn encode<T: Serialize>(command: &str, value: &T) -> Result<Value, ChannelError> {
    serde_json::to_value(value).map_err(|err| ChannelError::Remote {
        code: -1,
        message: format!("{command}: {err}"),
    })
}

fn element_not_found<T>(guid: &str) -> Outcome<T> {
    Outcome::failed(ERROR_ELEMENT_NOT_FOUND, format!("element {guid} not found"))
}

struct GetAllElementsCommand;

impl CommandHandler for GetAllElementsCommand {
    fn name(&self) -> &'static str {
        wire::GET_ALL_ELEMENTS
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> Result<Value, ChannelError> {
        let elements = context
            .model
            .elements()
            .map(|element| Element::new(element.guid.clone()))
            .collect();
        encode(self.name(), &Elements { elements })
    }
}

struct GetSelectedElementsCommand;

impl CommandHandler for GetSelectedElementsCommand {
    fn name(&self) -> &'static str {
        wire::GET_SELECTED_ELEMENTS
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> Result<Value, ChannelError> {
        let elements = context
            .model
            .selection()
            .iter()
            .map(|guid| Element::new(guid.clone()))
            .collect();
        encode(self.name(), &Elements { elements })
    }
}

struct GetPropertyIdsCommand;

impl CommandHandler for GetPropertyIdsCommand {
    fn name(&self) -> &'static str {
        wire::GET_PROPERTY_IDS
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> Result<Value, ChannelError> {
        let params: PropertyIdsParams = request.decode()?;
        let properties = params
            .properties
            .iter()
            .map(|query| {
                let found = match query {
                    PropertyQuery::BuiltIn { non_localized_name } => {
                        crate::model::builtin_property_guid(non_localized_name)
                    }
                    PropertyQuery::UserDefined {
                        localized_name: [group, name],
                    } => context.model.user_property_guid(group, name),
                };
                match found {
                    Some(guid) => Outcome::Success(PropertyIdRef::new(guid)),
                    None => Outcome::failed(ERROR_PROPERTY_NOT_FOUND, "property not found"),
                }
            })
            .collect();
        encode(self.name(), &PropertyIdsResponse { properties })
    }
}

struct GetPropertyValuesCommand;

impl CommandHandler for GetPropertyValuesCommand {
    fn name(&self) -> &'static str {
        wire::GET_PROPERTY_VALUES_OF_ELEMENTS
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> Result<Value, ChannelError> {
        let params: PropertyValuesParams = request.decode()?;
        let model = &*context.model;
        let property_values_for_elements = params
            .elements
            .iter()
            .map(|element| {
                if model.element(element.guid()).is_none() {
                    return element_not_found(element.guid());
                }
                let property_values = params
                    .properties
                    .iter()
                    .map(|property| property_slot(model, element.guid(), &property.property_id.guid))
                    .collect();
                Outcome::Success(ElementPropertyValues { property_values })
            })
            .collect();

        encode(
            self.name(),
            &PropertyValuesResponse {
                property_values_for_elements,
            },
        )
    }
}

/// 内建属性一律以字符串返回，用户属性保持原始 JSON 类型。
fn property_slot(model: &Model, guid: &str, property: &str) -> Outcome<PropertyValueSlot> {
    if !model.is_known_property(property) {
        return Outcome::failed(ERROR_PROPERTY_NOT_FOUND, format!("property {property} not found"));
    }
    match model.property_value(guid, property).flatten() {
        Some(value) => {
            let value = if is_builtin_property(property) {
                match value {
                    Value::String(text) => Value::String(text),
                    other => Value::String(other.to_string()),
                }
            } else {
                value
            };
            Outcome::Success(PropertyValueSlot {
                property_value: PropertyValue { value },
            })
        }
        None => Outcome::failed(ERROR_NO_VALUE, "the property has no value for this element"),
    }
}

struct GetDetailsCommand;

impl CommandHandler for GetDetailsCommand {
    fn name(&self) -> &'static str {
        wire::GET_DETAILS_OF_ELEMENTS
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> Result<Value, ChannelError> {
        let params: Elements = request.decode()?;
        let details_of_elements = params
            .elements
            .iter()
            .map(|element| match context.model.element(element.guid()) {
                Some(found) => Outcome::Success(ElementDetails {
                    element_type: found.element_type.to_string(),
                    details: found.details.clone(),
                }),
                None => element_not_found(element.guid()),
            })
            .collect();
        encode(self.name(), &DetailsResponse { details_of_elements })
    }
}

struct GetBoundingBoxesCommand;

impl CommandHandler for GetBoundingBoxesCommand {
    fn name(&self) -> &'static str {
        wire::GET_3D_BOUNDING_BOXES
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> Result<Value, ChannelError> {
        let params: Elements = request.decode()?;
        let bounding_boxes = params
            .elements
            .iter()
            .map(|element| match context.model.element(element.guid()) {
                Some(found) => match found.bounding_box {
                    Some(bounding_box) => Outcome::Success(BoundingBoxEntry { bounding_box }),
                    None => Outcome::failed(ERROR_NO_BOUNDING_BOX, "element has no 3D geometry"),
                },
                None => element_not_found(element.guid()),
            })
            .collect();
        encode(self.name(), &BoundingBoxesResponse { bounding_boxes })
    }
}

struct HighlightElementsCommand;

impl CommandHandler for HighlightElementsCommand {
    fn name(&self) -> &'static str {
        wire::HIGHLIGHT_ELEMENTS
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> Result<Value, ChannelError> {
        let params: HighlightParams = request.decode()?;
        if params.elements.is_empty() {
            context.model.set_highlight(None);
            debug!("高亮已清除");
        } else {
            debug!(count = params.elements.len(), "高亮元素");
            context.model.set_highlight(Some(HighlightState {
                elements: params
                    .elements
                    .iter()
                    .map(|element| element.guid().to_string())
                    .collect(),
                colors: params.highlighted_colors,
                muted: params.non_highlighted_color,
                wireframe: params.wireframe.unwrap_or(false),
            }));
        }
        encode(self.name(), &ExecutionResult::ok())
    }
}
