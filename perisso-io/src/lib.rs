//! 离线模型快照：以 JSON 保存与加载命令总线使用的 [`Model`]。

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use perisso_core::element::is_guid;
use perisso_engine::model::Model;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 快照格式标识。
pub const SNAPSHOT_FORMAT: &str = "perisso-model";
/// 当前支持的快照版本。
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write file {path:?}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse snapshot: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

pub trait ModelLoader {
    fn load(&self, path: &Path) -> Result<Model, IoError>;
}

pub trait ModelSaver {
    fn save(&self, model: &Model, path: &Path) -> Result<(), IoError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<M> {
    format: String,
    version: u32,
    model: M,
}

/// JSON 快照读写入口。
#[derive(Debug, Clone, Copy)]
pub struct JsonSnapshot {
    pretty: bool,
}

impl Default for JsonSnapshot {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl JsonSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// 输出紧凑 JSON。
    pub fn compact() -> Self {
        Self { pretty: false }
    }

    pub fn parse(&self, content: &str) -> Result<Model, IoError> {
        let envelope: Envelope<Model> = serde_json::from_str(content)?;
        if envelope.format != SNAPSHOT_FORMAT {
            return Err(IoError::InvalidSnapshot(format!(
                "unexpected format `{}`",
                envelope.format
            )));
        }
        if envelope.version != SNAPSHOT_VERSION {
            return Err(IoError::InvalidSnapshot(format!(
                "unsupported version {}",
                envelope.version
            )));
        }
        validate(&envelope.model)?;
        Ok(envelope.model)
    }

    pub fn render(&self, model: &Model) -> Result<String, IoError> {
        let envelope = Envelope {
            format: SNAPSHOT_FORMAT.to_string(),
            version: SNAPSHOT_VERSION,
            model,
        };
        let content = if self.pretty {
            serde_json::to_string_pretty(&envelope)?
        } else {
            serde_json::to_string(&envelope)?
        };
        Ok(content)
    }
}

impl ModelLoader for JsonSnapshot {
    fn load(&self, path: &Path) -> Result<Model, IoError> {
        let data = fs::read_to_string(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse(&data)
    }
}

impl ModelSaver for JsonSnapshot {
    fn save(&self, model: &Model, path: &Path) -> Result<(), IoError> {
        let content = self.render(model)?;
        fs::write(path, content).map_err(|source| IoError::WriteError {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// 校验 GUID 格式与唯一性，以及属性和选择集引用。
fn validate(model: &Model) -> Result<(), IoError> {
    let mut seen = HashSet::new();
    for element in model.elements() {
        if !is_guid(&element.guid) {
            return Err(IoError::InvalidSnapshot(format!(
                "invalid element guid `{}`",
                element.guid
            )));
        }
        if !seen.insert(element.guid.as_str()) {
            return Err(IoError::InvalidSnapshot(format!(
                "duplicate element guid `{}`",
                element.guid
            )));
        }
        if let Some(property) = element
            .values
            .keys()
            .find(|property| !model.is_known_property(property))
        {
            return Err(IoError::InvalidSnapshot(format!(
                "element `{}` references unknown property `{property}`",
                element.guid
            )));
        }
    }

    let mut definitions = HashSet::new();
    for definition in model.properties() {
        if !is_guid(&definition.guid) {
            return Err(IoError::InvalidSnapshot(format!(
                "invalid property guid `{}`",
                definition.guid
            )));
        }
        if !definitions.insert((definition.group.as_str(), definition.name.as_str())) {
            return Err(IoError::InvalidSnapshot(format!(
                "duplicate property `{}/{}`",
                definition.group, definition.name
            )));
        }
    }

    if let Some(missing) = model
        .selection()
        .iter()
        .find(|guid| !seen.contains(guid.as_str()))
    {
        return Err(IoError::InvalidSnapshot(format!(
            "selection references unknown element `{missing}`"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snapshot_string_round_trip_keeps_demo_model() {
        let mut model = Model::new();
        let demo = model.populate_demo();
        model.select(&demo.wall).expect("select");

        let snapshot = JsonSnapshot::compact();
        let content = snapshot.render(&model).expect("serialize");
        let restored = snapshot.parse(&content).expect("parse");
        assert_eq!(restored.len(), model.len());
        assert_eq!(restored.selection(), [demo.wall.clone()]);
        let types: Vec<_> = restored.elements().map(|e| e.element_type).collect();
        let expected: Vec<_> = model.elements().map(|e| e.element_type).collect();
        assert_eq!(types, expected);
        assert_eq!(
            restored.user_property_guid("Pset_Demo", "FireRating"),
            model.user_property_guid("Pset_Demo", "FireRating")
        );
    }

    #[test]
    fn default_and_new_both_render_pretty() {
        let model = Model::new();
        let from_default = JsonSnapshot::default().render(&model).expect("default");
        let from_new = JsonSnapshot::new().render(&model).expect("new");
        assert_eq!(from_default, from_new);
        assert!(from_new.contains('\n'));
        let compact = JsonSnapshot::compact().render(&model).expect("compact");
        assert!(!compact.contains('\n'));
    }

    #[test]
    fn rejects_foreign_format_and_version() {
        let snapshot = JsonSnapshot::new();
        let foreign = json!({"format": "other", "version": 1, "model": {}}).to_string();
        assert!(matches!(
            snapshot.parse(&foreign),
            Err(IoError::InvalidSnapshot(_))
        ));
        let future = json!({"format": SNAPSHOT_FORMAT, "version": 9, "model": {}}).to_string();
        assert!(matches!(
            snapshot.parse(&future),
            Err(IoError::InvalidSnapshot(_))
        ));
    }

    #[test]
    fn rejects_invalid_and_duplicate_guids() {
        let snapshot = JsonSnapshot::new();
        let invalid = json!({
            "format": SNAPSHOT_FORMAT,
            "version": SNAPSHOT_VERSION,
            "model": {"elements": [{"guid": "not-a-guid", "type": "Wall"}]}
        });
        let err = snapshot.parse(&invalid.to_string()).unwrap_err();
        assert!(err.to_string().contains("invalid element guid"));

        let guid = "216E9CE2-8007-334A-9D8C-FB0EC7EC083C";
        let duplicate = json!({
            "format": SNAPSHOT_FORMAT,
            "version": SNAPSHOT_VERSION,
            "model": {"elements": [
                {"guid": guid, "type": "Wall"},
                {"guid": guid, "type": "Slab"}
            ]}
        });
        let err = snapshot.parse(&duplicate.to_string()).unwrap_err();
        assert!(err.to_string().contains("duplicate element guid"));
    }

    #[test]
    fn rejects_dangling_references() {
        let snapshot = JsonSnapshot::new();
        let guid = "216E9CE2-8007-334A-9D8C-FB0EC7EC083C";
        let unknown_property = json!({
            "format": SNAPSHOT_FORMAT,
            "version": SNAPSHOT_VERSION,
            "model": {"elements": [{
                "guid": guid,
                "type": "Wall",
                "values": {"00000000-0000-0000-0000-000000000000": 1}
            }]}
        });
        let err = snapshot.parse(&unknown_property.to_string()).unwrap_err();
        assert!(err.to_string().contains("unknown property"));

        let dangling_selection = json!({
            "format": SNAPSHOT_FORMAT,
            "version": SNAPSHOT_VERSION,
            "model": {"selection": [guid]}
        });
        let err = snapshot.parse(&dangling_selection.to_string()).unwrap_err();
        assert!(err.to_string().contains("selection"));
    }

    #[test]
    fn unknown_element_type_is_a_parse_error() {
        let snapshot = JsonSnapshot::new();
        let content = json!({
            "format": SNAPSHOT_FORMAT,
            "version": SNAPSHOT_VERSION,
            "model": {"elements": [{"guid": "216E9CE2-8007-334A-9D8C-FB0EC7EC083C", "type": "Spaceship"}]}
        });
        assert!(matches!(
            snapshot.parse(&content.to_string()),
            Err(IoError::Parse(_))
        ));
    }
}
