use perisso_config::AppConfig;
use perisso_core::curve::polygon_centroid;
use perisso_core::element::{ElementType, Filter};
use perisso_core::geometry::Coordinate;
use perisso_engine::{ElementCollection, FieldResolver, FieldResult, QueryError, Session};
use tracing::{info, warn};

use crate::errors::FrontendError;
use crate::loader::{ModelSource, load_model_from_env_or_demo};

/// 简易 CLI 演示：加载快照或内置示例，逐条执行链式查询并打印结果。
pub fn run_demo(config: &AppConfig) -> Result<(), FrontendError> {
    let loaded = load_model_from_env_or_demo(config);
    let session = &loaded.session;

    let mut commands: Vec<&str> = loaded.bus.available_commands().copied().collect();
    commands.sort_unstable();
    println!("支持的命令: {}", commands.join(", "));

    println!("Rust 版 perisso CLI 演示");
    match &loaded.source {
        ModelSource::Snapshot(path) => {
            println!("已从快照加载模型：{}", path.display());
        }
        ModelSource::Demo => {
            if let Some(ids) = &loaded.demo_elements {
                println!("已构建内置示例元素：");
                println!("  - 墙 GUID = {}", ids.wall);
                println!("  - 梁 GUID = {}, {}", ids.beam_a, ids.beam_b);
                println!("  - 柱 GUID = {}", ids.column);
                println!("  - 楼板 GUID = {}", ids.slab);
                println!("  - 变形体 GUID = {}", ids.morph);
            }
        }
    }

    let all = session.all_elements()?;
    info!(elements = all.count(), "CLI 演示模型统计");
    println!("{all}");
    print_overview(session, &all)?;

    let selected = session.selected_elements()?;
    println!("当前选中：{selected}");

    let mut query = all.clone();
    let beams = query
        .filter_by(Filter::ElementType)
        .equals(ElementType::Beam)?;
    println!("类型为 Beam 的元素：{}", beams.count());

    let long = query.filter_by(Filter::Length).greater_than(5.0)?;
    print_field(session, "长度大于 5 的元素", Filter::Length, &long)?;

    let structural = query
        .filter_by(Filter::Layer)
        .starts_with_ignore_case("structural")?;
    let thin = structural.and_with(|current| {
        let mut heights = current.clone();
        heights.filter_by(Filter::Height).less_than(1.0)
    })?;
    print_field(session, "结构图层中高度小于 1 的元素", Filter::Height, &thin)?;

    match query
        .filter_by(Filter::Property)
        .property("Pset_Demo", "FireRating")
    {
        Ok(rated) => {
            let rei90 = rated.contains_text("90")?;
            println!("带有防火等级的元素：{}，其中含 90 的：{}", rated.count(), rei90.count());
        }
        Err(QueryError::PropertyNotFound { group, name }) => {
            println!("模型中未定义属性 {group}/{name}");
        }
        Err(err) => return Err(err.into()),
    }

    let slabs = query
        .filter_by(Filter::ElementType)
        .equals(ElementType::Slab)?;
    print_centroids(session, &slabs)?;

    let shown = &beams + &long;
    shown.highlight()?;
    println!("已高亮 {} 个元素", shown.count());
    if let Some(state) = loaded.bus.model().highlight() {
        let colors: Vec<String> = state.colors.iter().map(|c| c.to_hex(true)).collect();
        println!("  高亮颜色: {}", colors.join(", "));
    }
    if let Err(err) = session.clear_highlight() {
        warn!(error = %err, "清除高亮失败");
    }
    Ok(())
}

fn print_overview(session: &Session, all: &ElementCollection) -> Result<(), QueryError> {
    let resolver = FieldResolver::new(session);
    let types = resolver.resolve(Filter::ElementType, None, all.get())?;
    let ids = resolver.resolve(Filter::Id, None, all.get())?;
    let layers = resolver.resolve(Filter::Layer, None, all.get())?;

    println!("模型元素：");
    for (((element, ty), id), layer) in all.iter().zip(&types).zip(&ids).zip(&layers) {
        println!(
            "  - {} 类型={}, 编号={}, 图层={}",
            element.guid(),
            describe(ty),
            describe(id),
            describe(layer)
        );
    }
    Ok(())
}

fn print_field(
    session: &Session,
    title: &str,
    field: Filter,
    collection: &ElementCollection,
) -> Result<(), QueryError> {
    let values = FieldResolver::new(session).resolve(field, None, collection.get())?;
    println!("{title}：{}", collection.count());
    for (element, value) in collection.iter().zip(&values) {
        println!("  - {} {}={}", element.guid(), field, describe(value));
    }
    Ok(())
}

fn print_centroids(session: &Session, slabs: &ElementCollection) -> Result<(), QueryError> {
    for (element, entry) in slabs.iter().zip(session.details(slabs.get())?) {
        let polygon = entry
            .into_result()
            .ok()
            .and_then(|details| details.details.get("polygonCoordinates").cloned())
            .and_then(|raw| serde_json::from_value::<Vec<Coordinate>>(raw).ok());
        match polygon.map(|points| polygon_centroid(&points)) {
            Some(Ok(centroid)) => println!("楼板 {} 形心 = {centroid}", element.guid()),
            Some(Err(err)) => println!("楼板 {} 形心无法计算：{err}", element.guid()),
            None => println!("楼板 {} 缺少轮廓坐标", element.guid()),
        }
    }
    Ok(())
}

fn describe(value: &FieldResult) -> String {
    match value {
        Ok(value) => value.to_string(),
        Err(message) => format!("<{message}>"),
    }
}
