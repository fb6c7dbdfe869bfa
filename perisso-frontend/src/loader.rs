use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use perisso_config::{AppConfig, HighlightConfig};
use perisso_core::color::Color;
use perisso_engine::command::CommandBus;
use perisso_engine::model::{DemoElements, Model};
use perisso_engine::{HighlightOptions, Session};
use perisso_io::{JsonSnapshot, ModelLoader};
use tracing::{info, warn};

/// 覆盖配置中快照路径的环境变量。
pub const SNAPSHOT_ENV: &str = "PERISSO_SNAPSHOT";

/// 模型来源，便于前端呈现加载信息。
#[derive(Debug, Clone)]
pub enum ModelSource {
    Snapshot(PathBuf),
    Demo,
}

/// 统一封装加载后的命令总线、会话与元信息。
#[derive(Debug)]
pub struct LoadedModel {
    pub bus: Arc<CommandBus>,
    pub session: Session,
    pub source: ModelSource,
    pub demo_elements: Option<DemoElements>,
}

/// 把配置中的高亮默认值转换为会话参数。
pub fn highlight_options(config: &HighlightConfig) -> HighlightOptions {
    HighlightOptions::single(Color::from(config.color))
        .with_muted(Color::from(config.muted_color))
        .with_wireframe(config.wireframe)
}

/// 从环境变量 `PERISSO_SNAPSHOT` 或配置指定的快照加载模型，
/// 若未指定或加载失败则回退到内置示例。
pub fn load_model_from_env_or_demo(config: &AppConfig) -> LoadedModel {
    let snapshot = env::var_os(SNAPSHOT_ENV)
        .map(PathBuf::from)
        .or_else(|| config.model.snapshot.clone());
    load_model(snapshot, config)
}

pub fn load_model(snapshot: Option<PathBuf>, config: &AppConfig) -> LoadedModel {
    if let Some(path) = snapshot {
        match JsonSnapshot::new().load(&path) {
            Ok(model) => {
                info!(path = %path.display(), elements = model.len(), "从快照加载模型成功");
                return assemble(model, ModelSource::Snapshot(path), None, config);
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "加载快照失败，回退到内置示例");
            }
        }
    }

    let mut model = Model::new();
    let demo_elements = model.populate_demo();
    // 预先选中墙与柱，便于演示选中集查询。
    for guid in [&demo_elements.wall, &demo_elements.column] {
        if let Err(err) = model.select(guid) {
            warn!(guid = %guid, error = %err, "预选演示元素失败");
        }
    }
    assemble(model, ModelSource::Demo, Some(demo_elements), config)
}

fn assemble(
    model: Model,
    source: ModelSource,
    demo_elements: Option<DemoElements>,
    config: &AppConfig,
) -> LoadedModel {
    let bus = Arc::new(CommandBus::with_model(model));
    let session = Session::new(bus.clone()).with_highlight(highlight_options(&config.highlight));
    LoadedModel {
        bus,
        session,
        source,
        demo_elements,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perisso_io::ModelSaver;

    #[test]
    fn falls_back_to_demo_without_snapshot() {
        let loaded = load_model(None, &AppConfig::default());
        assert!(matches!(loaded.source, ModelSource::Demo));
        let demo = loaded.demo_elements.expect("demo elements");
        let selected = loaded.session.selected_elements().expect("selection");
        assert_eq!(selected.count(), 2);
        assert!(selected.contains_guid(&demo.wall));
    }

    #[test]
    fn falls_back_to_demo_when_snapshot_is_missing() {
        let dir = tempfile::tempdir().expect("temp dir");
        let loaded = load_model(Some(dir.path().join("absent.json")), &AppConfig::default());
        assert!(matches!(loaded.source, ModelSource::Demo));
    }

    #[test]
    fn loads_snapshot_when_present() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("model.json");
        let mut model = Model::new();
        model.populate_demo();
        JsonSnapshot::new().save(&model, &path).expect("save");

        let loaded = load_model(Some(path.clone()), &AppConfig::default());
        match &loaded.source {
            ModelSource::Snapshot(loaded_path) => assert_eq!(loaded_path, &path),
            ModelSource::Demo => panic!("expected snapshot source"),
        }
        assert!(loaded.demo_elements.is_none());
        assert_eq!(loaded.bus.model().len(), 6);
    }

    #[test]
    fn highlight_defaults_follow_configuration() {
        let mut config = AppConfig::default();
        config.highlight.color = [255, 0, 0, 255];
        config.highlight.wireframe = false;
        let options = highlight_options(&config.highlight);
        assert_eq!(options.colors_for(2), vec![Color::rgba(255, 0, 0, 255); 2]);
        assert_eq!(options.muted, Color::MUTED);
        assert!(!options.wireframe);
    }
}
