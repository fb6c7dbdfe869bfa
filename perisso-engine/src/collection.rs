//! 链式元素查询。
//!
//! `filter_by` 修改自身的过滤游标并返回 `&mut Self`；谓词与集合运算总是返回新的集合，
//! 原集合不变。字段解析失败的元素被静默排除，不会作为错误返回，因此对混合类型的集合做
//! 数值比较时，不兼容的元素只是不出现在结果中。

use std::collections::HashSet;
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

use perisso_core::element::{Element, ElementType, Filter};
use serde_json::Value;
use tracing::debug;

use crate::errors::QueryError;
use crate::resolver::{FieldResolver, FieldResult, FieldValue};
use crate::session::{HighlightOptions, Session};

/// 谓词的比较对象。元素类型按其字符串标签比较。
#[derive(Debug, Clone, PartialEq)]
pub enum Needle {
    Text(String),
    Number(f64),
}

impl Needle {
    fn text(&self) -> String {
        match self {
            Needle::Text(text) => text.clone(),
            Needle::Number(number) => number.to_string(),
        }
    }
}

impl From<&str> for Needle {
    fn from(value: &str) -> Self {
        Needle::Text(value.to_string())
    }
}

impl From<String> for Needle {
    fn from(value: String) -> Self {
        Needle::Text(value)
    }
}

impl From<ElementType> for Needle {
    fn from(value: ElementType) -> Self {
        Needle::Text(value.as_str().to_string())
    }
}

impl From<f64> for Needle {
    fn from(value: f64) -> Self {
        Needle::Number(value)
    }
}

impl From<i64> for Needle {
    fn from(value: i64) -> Self {
        Needle::Number(value as f64)
    }
}

impl From<i32> for Needle {
    fn from(value: i32) -> Self {
        Needle::Number(f64::from(value))
    }
}

/// 单边比较是否包含边界值。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Bound {
    #[default]
    Exclusive,
    Inclusive,
}

impl Bound {
    #[inline]
    fn is_inclusive(self) -> bool {
        matches!(self, Bound::Inclusive)
    }
}

#[derive(Debug, Clone, Copy)]
enum TextOp {
    StartsWith,
    EndsWith,
    Contains,
    Equals,
}

impl TextOp {
    fn name(self) -> &'static str {
        match self {
            TextOp::StartsWith => "starts_with",
            TextOp::EndsWith => "ends_with",
            TextOp::Contains => "contains",
            TextOp::Equals => "equals",
        }
    }

    fn test(self, haystack: &str, needle: &str) -> bool {
        match self {
            TextOp::StartsWith => haystack.starts_with(needle),
            TextOp::EndsWith => haystack.ends_with(needle),
            TextOp::Contains => haystack.contains(needle),
            TextOp::Equals => haystack == needle,
        }
    }
}

/// 有序元素集合，附带过滤游标（当前字段与属性 GUID）。
#[derive(Debug, Clone)]
pub struct ElementCollection {
    session: Session,
    elements: Vec<Element>,
    active_field: Option<Filter>,
    active_property: Option<String>,
}

impl ElementCollection {
    pub fn new(session: Session, elements: Vec<Element>) -> Self {
        Self {
            session,
            elements,
            active_field: None,
            active_property: None,
        }
    }

    /// 派生集合沿用当前游标，便于继续链式过滤。
    fn derive(&self, elements: Vec<Element>) -> Self {
        Self {
            session: self.session.clone(),
            elements,
            active_field: self.active_field,
            active_property: self.active_property.clone(),
        }
    }

    #[inline]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[inline]
    pub fn active_field(&self) -> Option<Filter> {
        self.active_field
    }

    #[inline]
    pub fn active_property(&self) -> Option<&str> {
        self.active_property.as_deref()
    }

    pub fn filter_by(&mut self, field: Filter) -> &mut Self {
        self.active_field = Some(field);
        self
    }

    /// 按标签名设置字段，未知标签返回 [`QueryError::TypeMismatch`]。
    pub fn filter_by_name(&mut self, tag: &str) -> Result<&mut Self, QueryError> {
        let field = tag
            .parse::<Filter>()
            .map_err(|err| QueryError::TypeMismatch(err.to_string()))?;
        Ok(self.filter_by(field))
    }

    /// 选定用户属性，并只保留带有该属性值的元素。
    pub fn property(&self, group: &str, name: &str) -> Result<Self, QueryError> {
        if self.active_field != Some(Filter::Property) {
            return Err(QueryError::IllegalState(
                "filter_by(Filter::Property) must be set before property()".to_string(),
            ));
        }
        let guid = self.session.user_property_id(group, name)?;
        let entries = self.session.property_values(&self.elements, &guid)?;
        let kept: Vec<Element> = self
            .elements
            .iter()
            .zip(&entries)
            .filter(|(_, entry)| {
                entry
                    .as_result()
                    .map(|values| values.first().is_ok())
                    .unwrap_or(false)
            })
            .map(|(element, _)| element.clone())
            .collect();

        debug!(group, name, input = self.elements.len(), output = kept.len(), "属性过滤完成");

        Ok(Self {
            session: self.session.clone(),
            elements: kept,
            active_field: Some(Filter::Property),
            active_property: Some(guid),
        })
    }

    fn resolve(&self) -> Result<(Filter, Vec<FieldResult>), QueryError> {
        let field = self.active_field.ok_or_else(|| {
            QueryError::IllegalState("filter_by() must be called first".to_string())
        })?;
        let values = FieldResolver::new(&self.session).resolve(
            field,
            self.active_property.as_deref(),
            &self.elements,
        )?;
        Ok((field, values))
    }

    fn retain(
        &self,
        operation: &str,
        mut keep: impl FnMut(&FieldValue) -> bool,
    ) -> Result<Self, QueryError> {
        let (field, values) = self.resolve()?;
        let kept: Vec<Element> = self
            .elements
            .iter()
            .zip(&values)
            .filter(|(_, value)| value.as_ref().is_ok_and(&mut keep))
            .map(|(element, _)| element.clone())
            .collect();

        debug!(
            field = %field,
            operation,
            input = self.elements.len(),
            output = kept.len(),
            "过滤完成"
        );

        Ok(self.derive(kept))
    }

    fn text_predicate(
        &self,
        op: TextOp,
        needle: Needle,
        case_sensitive: bool,
    ) -> Result<Self, QueryError> {
        let fold = |text: String| {
            if case_sensitive {
                text
            } else {
                text.to_lowercase()
            }
        };
        let needle = fold(needle.text());
        self.retain(op.name(), |value| op.test(&fold(value.to_string()), &needle))
    }

    pub fn starts_with(&self, needle: impl Into<Needle>) -> Result<Self, QueryError> {
        self.text_predicate(TextOp::StartsWith, needle.into(), true)
    }

    pub fn starts_with_ignore_case(&self, needle: impl Into<Needle>) -> Result<Self, QueryError> {
        self.text_predicate(TextOp::StartsWith, needle.into(), false)
    }

    pub fn ends_with(&self, needle: impl Into<Needle>) -> Result<Self, QueryError> {
        self.text_predicate(TextOp::EndsWith, needle.into(), true)
    }

    pub fn ends_with_ignore_case(&self, needle: impl Into<Needle>) -> Result<Self, QueryError> {
        self.text_predicate(TextOp::EndsWith, needle.into(), false)
    }

    /// 子串匹配。与集合成员判断 [`Self::contains_guid`] 等方法不同。
    pub fn contains_text(&self, needle: impl Into<Needle>) -> Result<Self, QueryError> {
        self.text_predicate(TextOp::Contains, needle.into(), true)
    }

    pub fn contains_text_ignore_case(
        &self,
        needle: impl Into<Needle>,
    ) -> Result<Self, QueryError> {
        self.text_predicate(TextOp::Contains, needle.into(), false)
    }

    /// 文本或元素类型按字符串相等比较；数值按浮点数精确比较，无法解析的取值被跳过。
    pub fn equals(&self, needle: impl Into<Needle>) -> Result<Self, QueryError> {
        match needle.into() {
            Needle::Number(target) => {
                self.retain("equals", |value| value.as_f64() == Some(target))
            }
            text => self.text_predicate(TextOp::Equals, text, true),
        }
    }

    pub fn equals_ignore_case(&self, needle: impl Into<Needle>) -> Result<Self, QueryError> {
        match needle.into() {
            Needle::Number(target) => {
                self.retain("equals", |value| value.as_f64() == Some(target))
            }
            text => self.text_predicate(TextOp::Equals, text, false),
        }
    }

    pub fn less_than(&self, value: f64) -> Result<Self, QueryError> {
        self.less_than_with(value, Bound::Exclusive)
    }

    pub fn less_than_with(&self, limit: f64, bound: Bound) -> Result<Self, QueryError> {
        self.retain("less_than", |value| {
            value.as_f64().is_some_and(|v| {
                if bound.is_inclusive() {
                    v <= limit
                } else {
                    v < limit
                }
            })
        })
    }

    pub fn greater_than(&self, value: f64) -> Result<Self, QueryError> {
        self.greater_than_with(value, Bound::Exclusive)
    }

    pub fn greater_than_with(&self, limit: f64, bound: Bound) -> Result<Self, QueryError> {
        self.retain("greater_than", |value| {
            value.as_f64().is_some_and(|v| {
                if bound.is_inclusive() {
                    v >= limit
                } else {
                    v > limit
                }
            })
        })
    }

    /// 区间比较，默认包含两端。
    pub fn between(&self, min: f64, max: f64) -> Result<Self, QueryError> {
        self.between_with(min, max, Bound::Inclusive)
    }

    pub fn between_with(&self, min: f64, max: f64, bound: Bound) -> Result<Self, QueryError> {
        self.retain("between", |value| {
            value.as_f64().is_some_and(|v| {
                if bound.is_inclusive() {
                    min <= v && v <= max
                } else {
                    min < v && v < max
                }
            })
        })
    }

    /// 按 GUID 求交集，保持自身顺序。
    pub fn and(&self, other: &ElementCollection) -> Self {
        let keep = guid_set(&other.elements);
        self.derive(
            self.elements
                .iter()
                .filter(|element| keep.contains(element.guid()))
                .cloned()
                .collect(),
        )
    }

    /// 先以自身为输入构造另一个集合，再求交集。
    pub fn and_with<F>(&self, build: F) -> Result<Self, QueryError>
    where
        F: FnOnce(&Self) -> Result<Self, QueryError>,
    {
        let other = build(self)?;
        Ok(self.and(&other))
    }

    /// 并集：先保留自身元素（去重），再追加对方中尚未出现的元素。
    pub fn union(&self, other: &ElementCollection) -> Self {
        let mut seen = HashSet::new();
        let elements = self
            .elements
            .iter()
            .chain(&other.elements)
            .filter(|element| seen.insert(element.guid().to_string()))
            .cloned()
            .collect();
        self.derive(elements)
    }

    pub fn difference(&self, other: &ElementCollection) -> Self {
        let remove = guid_set(&other.elements);
        self.derive(
            self.elements
                .iter()
                .filter(|element| !remove.contains(element.guid()))
                .cloned()
                .collect(),
        )
    }

    /// 原地追加对方中尚未出现的元素。
    pub fn union_in_place(&mut self, other: &ElementCollection) {
        let mut seen: HashSet<String> = self
            .elements
            .iter()
            .map(|element| element.guid().to_string())
            .collect();
        for element in &other.elements {
            if seen.insert(element.guid().to_string()) {
                self.elements.push(element.clone());
            }
        }
    }

    pub fn difference_in_place(&mut self, other: &ElementCollection) {
        let remove = guid_set(&other.elements);
        self.elements
            .retain(|element| !remove.contains(element.guid()));
    }

    pub fn contains_guid(&self, guid: &str) -> bool {
        self.elements.iter().any(|element| element.guid() == guid)
    }

    #[inline]
    pub fn contains_element(&self, element: &Element) -> bool {
        self.contains_guid(element.guid())
    }

    /// 对方每个元素都在自身中时为真。
    pub fn contains_all(&self, other: &ElementCollection) -> bool {
        let own = guid_set(&self.elements);
        other
            .elements
            .iter()
            .all(|element| own.contains(element.guid()))
    }

    /// 接受 GUID 字符串或 `{"elementId": {"guid": ..}}` 结构，其他形状一律为假。
    pub fn contains_value(&self, value: &Value) -> bool {
        match value {
            Value::String(guid) => self.contains_guid(guid),
            Value::Object(_) => value
                .pointer("/elementId/guid")
                .and_then(Value::as_str)
                .is_some_and(|guid| self.contains_guid(guid)),
            _ => false,
        }
    }

    #[inline]
    pub fn get(&self) -> &[Element] {
        &self.elements
    }

    #[inline]
    pub fn into_elements(self) -> Vec<Element> {
        self.elements
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    #[inline]
    pub fn first(&self) -> Option<&Element> {
        self.elements.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Element> {
        self.elements.iter()
    }

    /// 支持负索引（`-1` 为最后一个元素）。
    pub fn at(&self, index: isize) -> Result<&Element, QueryError> {
        let len = self.elements.len();
        let resolved = if index < 0 {
            len.checked_sub(index.unsigned_abs())
        } else {
            Some(index.unsigned_abs())
        };
        resolved
            .and_then(|i| self.elements.get(i))
            .ok_or(QueryError::IndexOutOfRange { index, len })
    }

    /// 半开区间切片，越界端点截断到集合范围，负值从末尾计数。
    pub fn slice(&self, start: Option<isize>, stop: Option<isize>) -> Self {
        let len = self.elements.len();
        let clamp = |bound: Option<isize>, default: usize| match bound {
            None => default,
            Some(i) if i < 0 => len.saturating_sub(i.unsigned_abs()),
            Some(i) => i.unsigned_abs().min(len),
        };
        let start = clamp(start, 0);
        let stop = clamp(stop, len);
        let elements = if start < stop {
            self.elements[start..stop].to_vec()
        } else {
            Vec::new()
        };
        self.derive(elements)
    }

    /// 使用会话的默认参数高亮当前元素。
    pub fn highlight(&self) -> Result<&Self, QueryError> {
        let options = self.session.highlight_options().clone();
        self.highlight_with(&options)
    }

    pub fn highlight_with(&self, options: &HighlightOptions) -> Result<&Self, QueryError> {
        self.session.highlight(&self.elements, options)?;
        Ok(self)
    }
}

fn guid_set(elements: &[Element]) -> HashSet<&str> {
    elements.iter().map(Element::guid).collect()
}

impl fmt::Display for ElementCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.count();
        let plural = if count > 1 { "s" } else { "" };
        write!(f, "Collection of {count} element{plural}")
    }
}

impl<'a> IntoIterator for &'a ElementCollection {
    type Item = &'a Element;
    type IntoIter = std::slice::Iter<'a, Element>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Add for &ElementCollection {
    type Output = ElementCollection;

    fn add(self, rhs: &ElementCollection) -> ElementCollection {
        self.union(rhs)
    }
}

impl Sub for &ElementCollection {
    type Output = ElementCollection;

    fn sub(self, rhs: &ElementCollection) -> ElementCollection {
        self.difference(rhs)
    }
}

impl AddAssign<&ElementCollection> for ElementCollection {
    fn add_assign(&mut self, rhs: &ElementCollection) {
        self.union_in_place(rhs);
    }
}

impl SubAssign<&ElementCollection> for ElementCollection {
    fn sub_assign(&mut self, rhs: &ElementCollection) {
        self.difference_in_place(rhs);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::command::CommandBus;

    const GUIDS: [&str; 5] = [
        "00000000-0000-0000-0000-000000000001",
        "00000000-0000-0000-0000-000000000002",
        "00000000-0000-0000-0000-000000000003",
        "00000000-0000-0000-0000-000000000004",
        "00000000-0000-0000-0000-000000000005",
    ];

    fn offline(guids: &[&str]) -> ElementCollection {
        let session = Session::new(Arc::new(CommandBus::new()));
        session.collection(guids.iter().map(|g| Element::new(*g)).collect::<Vec<_>>())
    }

    fn guids(collection: &ElementCollection) -> Vec<&str> {
        collection.iter().map(Element::guid).collect()
    }

    #[test]
    fn predicates_require_a_field() {
        let collection = offline(&GUIDS);
        assert!(matches!(
            collection.equals("x"),
            Err(QueryError::IllegalState(_))
        ));
        assert!(matches!(
            collection.property("Group", "Name"),
            Err(QueryError::IllegalState(_))
        ));
    }

    #[test]
    fn numeric_needles_render_without_trailing_fraction() {
        assert_eq!(Needle::from(10).text(), "10");
        assert_eq!(Needle::from(10_i64).text(), "10");
        assert_eq!(Needle::from(2.5).text(), "2.5");
        assert_eq!(Needle::from(ElementType::Beam).text(), "Beam");
    }

    #[test]
    fn filter_by_name_rejects_unknown_tags() {
        let mut collection = offline(&GUIDS);
        collection.filter_by_name("layer").expect("known tag");
        assert_eq!(collection.active_field(), Some(Filter::Layer));
        assert!(matches!(
            collection.filter_by_name("COLOUR"),
            Err(QueryError::TypeMismatch(_))
        ));
        assert_eq!(collection.active_field(), Some(Filter::Layer));
    }

    #[test]
    fn union_keeps_order_and_deduplicates() {
        let a = offline(&[GUIDS[0], GUIDS[1], GUIDS[0]]);
        let b = offline(&[GUIDS[2], GUIDS[1]]);
        let union = &a + &b;
        assert_eq!(guids(&union), vec![GUIDS[0], GUIDS[1], GUIDS[2]]);

        let mut c = a.clone();
        c += &b;
        assert_eq!(guids(&c), vec![GUIDS[0], GUIDS[1], GUIDS[0], GUIDS[2]]);
    }

    #[test]
    fn difference_and_intersection() {
        let a = offline(&GUIDS);
        let b = offline(&[GUIDS[3], GUIDS[1]]);
        assert_eq!(guids(&(&a - &b)), vec![GUIDS[0], GUIDS[2], GUIDS[4]]);
        assert_eq!(guids(&a.and(&b)), vec![GUIDS[1], GUIDS[3]]);

        let mut c = a.clone();
        c -= &b;
        assert_eq!(c.count(), 3);
        assert_eq!(a.count(), 5);

        let sliced = a.and_with(|me| Ok(me.slice(Some(-2), None))).expect("and_with");
        assert_eq!(guids(&sliced), vec![GUIDS[3], GUIDS[4]]);
    }

    #[test]
    fn containment_checks() {
        let a = offline(&GUIDS);
        let b = offline(&[GUIDS[3], GUIDS[1]]);
        assert!(a.contains_guid(GUIDS[2]));
        assert!(a.contains_element(&Element::new(GUIDS[4])));
        assert!(a.contains_all(&b));
        assert!(!b.contains_all(&a));
        assert!(a.contains_value(&json!(GUIDS[0])));
        assert!(a.contains_value(&json!({"elementId": {"guid": GUIDS[1]}})));
        assert!(!a.contains_value(&json!(42)));
        assert!(!a.contains_value(&json!({"id": GUIDS[1]})));
    }

    #[test]
    fn indexing_and_slicing() {
        let a = offline(&GUIDS);
        assert_eq!(a.slice(Some(1), Some(3)).count(), 2);
        assert_eq!(a.at(-1).expect("last"), a.at(4).expect("index 4"));
        assert!(matches!(
            a.at(5),
            Err(QueryError::IndexOutOfRange { index: 5, len: 5 })
        ));
        assert!(a.at(-6).is_err());
        assert_eq!(a.slice(Some(3), Some(1)).count(), 0);
        assert_eq!(a.slice(None, Some(100)).count(), 5);
        assert_eq!(guids(&a.slice(Some(-2), Some(-1))), vec![GUIDS[3]]);
        assert_eq!(a.first().map(Element::guid), Some(GUIDS[0]));
        assert!(offline(&[]).first().is_none());
    }

    #[test]
    fn display_counts_elements() {
        assert_eq!(offline(&GUIDS).to_string(), "Collection of 5 elements");
        assert_eq!(offline(&GUIDS[..1]).to_string(), "Collection of 1 element");
    }

    #[test]
    fn empty_collection_filters_without_error() {
        let mut empty = offline(&[]);
        let result = empty
            .filter_by(Filter::Layer)
            .equals("anything")
            .expect("empty filter");
        assert!(result.is_empty());
    }
}
