//! 圆弧、多段线与多边形质心计算。

use std::f64::consts::TAU;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::{Coordinate, GeometryError, Vector};

/// 判断两个顶点重合所用的距离容差。
pub const VERTEX_TOLERANCE: f64 = 1e-9;

/// 小于该值的圆弧角视为直线。
pub const STRAIGHT_ANGLE_EPSILON: f64 = 1e-10;

/// 由起点、终点与圆心角（弧度，正值为逆时针）定义的圆弧。
///
/// 半径、弧长与圆心均为派生量，不做存储。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Arc {
    pub start_point: Coordinate,
    pub end_point: Coordinate,
    pub arc_angle: f64,
}

impl Arc {
    #[inline]
    pub fn new(start_point: Coordinate, end_point: Coordinate, arc_angle: f64) -> Self {
        Self {
            start_point,
            end_point,
            arc_angle,
        }
    }

    #[inline]
    pub fn is_straight(&self) -> bool {
        self.arc_angle.abs() < STRAIGHT_ANGLE_EPSILON
    }

    #[inline]
    pub fn chord_length(&self) -> f64 {
        self.start_point.distance_to(self.end_point)
    }

    /// 近似直线时返回 `f64::INFINITY`。
    pub fn radius(&self) -> f64 {
        if self.is_straight() {
            return f64::INFINITY;
        }
        self.chord_length() / (2.0 * (self.arc_angle.abs() / 2.0).sin())
    }

    pub fn length(&self) -> f64 {
        if self.is_straight() {
            return self.chord_length();
        }
        self.radius() * self.arc_angle.abs()
    }

    /// 沿弦中点的法向偏移矢高得到的点。
    ///
    /// 三维圆弧的参考平面固定为 XY 平面。起点与终点重合时返回 [`GeometryError::ZeroLength`]。
    pub fn center(&self) -> Result<Coordinate, GeometryError> {
        let chord_mid = self.start_point.midpoint_to(self.end_point);
        if self.is_straight() {
            return Ok(chord_mid);
        }

        let chord = self.start_point.vector_to(self.end_point);
        let perpendicular = Vector {
            x: -chord.y,
            y: chord.x,
            z: chord.z.map(|_| 0.0),
        };

        let radius = self.radius();
        let half_chord = self.chord_length() / 2.0;
        let mut sagitta = radius - (radius * radius - half_chord * half_chord).max(0.0).sqrt();
        if self.arc_angle < 0.0 {
            sagitta = -sagitta;
        }

        Ok(chord_mid.translate(perpendicular.normalize()? * sagitta))
    }
}

impl fmt::Display for Arc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Arc(start={}, end={}, angle={:.4}rad, length={:.4})",
            self.start_point,
            self.end_point,
            self.arc_angle,
            self.length()
        )
    }
}

/// 多段线中按顶点索引描述的圆弧段。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArcSegment {
    pub beg_index: usize,
    pub end_index: usize,
    pub arc_angle: f64,
}

impl ArcSegment {
    #[inline]
    pub fn new(beg_index: usize, end_index: usize, arc_angle: f64) -> Self {
        Self {
            beg_index,
            end_index,
            arc_angle,
        }
    }

    /// `endIndex` 缺省时为 `begIndex + 1`。
    #[inline]
    pub fn following(beg_index: usize, arc_angle: f64) -> Self {
        Self::new(beg_index, beg_index + 1, arc_angle)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArcSegmentData {
    beg_index: usize,
    #[serde(default)]
    end_index: Option<usize>,
    arc_angle: f64,
}

/// Add-On 传输格式：`{"coordinates": [...], "arcs": [...]}`。
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PolylineData {
    coordinates: Vec<Coordinate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    arcs: Vec<ArcSegmentData>,
}

/// 多段线的单个分段。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    Line(Coordinate, Coordinate),
    Arc(Arc),
}

impl Segment {
    pub fn length(&self) -> f64 {
        match self {
            Segment::Line(start, end) => start.distance_to(*end),
            Segment::Arc(arc) => arc.length(),
        }
    }
}

/// 带可选圆弧段的多段线。
///
/// 闭合多段线在末尾保存首顶点的副本。未在 `arcs` 中声明的分段均为直线。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PolylineData", into = "PolylineData")]
pub struct Polyline {
    coordinates: Vec<Coordinate>,
    arcs: Vec<ArcSegment>,
    is_closed: bool,
}

impl Polyline {
    /// 构造并校验圆弧索引；`closed` 为真时自动补齐闭合顶点。
    pub fn new(
        coordinates: Vec<Coordinate>,
        arcs: Vec<ArcSegment>,
        closed: bool,
    ) -> Result<Self, GeometryError> {
        let mut polyline = Self {
            coordinates,
            arcs,
            is_closed: closed,
        };
        if closed {
            polyline.append_closing_vertex();
        }
        polyline.validate_arcs()?;
        Ok(polyline)
    }

    pub fn open_path(coordinates: Vec<Coordinate>) -> Self {
        Self {
            coordinates,
            arcs: Vec::new(),
            is_closed: false,
        }
    }

    /// 由对角两点构造闭合矩形。
    pub fn rectangle(corner1: Coordinate, corner2: Coordinate) -> Self {
        Self::closed_ring(vec![
            corner1,
            Coordinate::new(corner2.x, corner1.y),
            corner2,
            Coordinate::new(corner1.x, corner2.y),
        ])
    }

    /// 以正多边形近似圆，`segments` 至少为 3。
    pub fn circle_approximation(
        center: Coordinate,
        radius: f64,
        segments: usize,
    ) -> Result<Self, GeometryError> {
        if segments < 3 {
            return Err(GeometryError::TooFewVertices(segments));
        }
        let step = TAU / segments as f64;
        let coordinates = (0..segments)
            .map(|i| {
                let (sin, cos) = (i as f64 * step).sin_cos();
                Coordinate::new(center.x + radius * cos, center.y + radius * sin)
            })
            .collect();
        Ok(Self::closed_ring(coordinates))
    }

    fn closed_ring(coordinates: Vec<Coordinate>) -> Self {
        let mut polyline = Self {
            coordinates,
            arcs: Vec::new(),
            is_closed: true,
        };
        polyline.append_closing_vertex();
        polyline
    }

    fn append_closing_vertex(&mut self) {
        if self.coordinates.len() < 2 {
            return;
        }
        let first = self.coordinates[0];
        let last = self.coordinates[self.coordinates.len() - 1];
        if !first.is_close(last, VERTEX_TOLERANCE) {
            self.coordinates.push(first);
        }
    }

    fn validate_arcs(&self) -> Result<(), GeometryError> {
        let count = self.coordinates.len();
        for (index, arc) in self.arcs.iter().enumerate() {
            let message = if arc.beg_index >= count {
                format!("begIndex {} out of range", arc.beg_index)
            } else if arc.end_index >= count {
                format!("endIndex {} out of range", arc.end_index)
            } else if arc.beg_index >= arc.end_index {
                "begIndex must be less than endIndex".to_string()
            } else {
                continue;
            };
            return Err(GeometryError::InvalidArc { index, message });
        }
        Ok(())
    }

    #[inline]
    pub fn coordinates(&self) -> &[Coordinate] {
        &self.coordinates
    }

    #[inline]
    pub fn arcs(&self) -> &[ArcSegment] {
        &self.arcs
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.is_closed
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.coordinates.len()
    }

    #[inline]
    pub fn segment_count(&self) -> usize {
        self.coordinates.len().saturating_sub(1)
    }

    fn arc_angle_at(&self, index: usize) -> Option<f64> {
        self.arcs
            .iter()
            .find(|arc| arc.beg_index == index && arc.end_index == index + 1)
            .map(|arc| arc.arc_angle)
    }

    pub fn segment(&self, index: usize) -> Result<Segment, GeometryError> {
        let count = self.segment_count();
        if index >= count {
            return Err(GeometryError::SegmentOutOfRange { index, count });
        }
        let start = self.coordinates[index];
        let end = self.coordinates[index + 1];
        Ok(match self.arc_angle_at(index) {
            Some(angle) => Segment::Arc(Arc::new(start, end, angle)),
            None => Segment::Line(start, end),
        })
    }

    pub fn segments(&self) -> impl Iterator<Item = Segment> + '_ {
        self.coordinates
            .windows(2)
            .enumerate()
            .map(|(index, pair)| match self.arc_angle_at(index) {
                Some(angle) => Segment::Arc(Arc::new(pair[0], pair[1], angle)),
                None => Segment::Line(pair[0], pair[1]),
            })
    }

    /// 直线段取两点距离，圆弧段取弧长。
    pub fn length(&self) -> f64 {
        self.segments().map(|segment| segment.length()).sum()
    }

    pub fn arc_segments(&self) -> Vec<Arc> {
        self.arcs
            .iter()
            .map(|arc| {
                Arc::new(
                    self.coordinates[arc.beg_index],
                    self.coordinates[arc.end_index],
                    arc.arc_angle,
                )
            })
            .collect()
    }

    pub fn straight_segments(&self) -> Vec<(Coordinate, Coordinate)> {
        self.segments()
            .filter_map(|segment| match segment {
                Segment::Line(start, end) => Some((start, end)),
                Segment::Arc(_) => None,
            })
            .collect()
    }

    /// 追加顶点；闭合时插入到闭合顶点之前。已有圆弧索引不做调整。
    pub fn push_coordinate(&mut self, coordinate: Coordinate) {
        if self.is_closed && self.coordinates.len() > 1 {
            let at = self.coordinates.len() - 1;
            self.coordinates.insert(at, coordinate);
        } else {
            self.coordinates.push(coordinate);
        }
    }

    pub fn insert_coordinate(
        &mut self,
        index: usize,
        coordinate: Coordinate,
    ) -> Result<(), GeometryError> {
        let count = self.coordinates.len();
        if index > count {
            return Err(GeometryError::VertexOutOfRange { index, count });
        }
        self.coordinates.insert(index, coordinate);
        Ok(())
    }

    pub fn set_coordinate(
        &mut self,
        index: usize,
        coordinate: Coordinate,
    ) -> Result<(), GeometryError> {
        let count = self.coordinates.len();
        let slot = self
            .coordinates
            .get_mut(index)
            .ok_or(GeometryError::VertexOutOfRange { index, count })?;
        *slot = coordinate;
        Ok(())
    }

    /// 声明圆弧段，`end_index` 缺省为 `beg_index + 1`。索引非法时不修改多段线。
    pub fn add_arc(
        &mut self,
        beg_index: usize,
        end_index: Option<usize>,
        arc_angle: f64,
    ) -> Result<(), GeometryError> {
        let end_index = end_index.unwrap_or(beg_index + 1);
        self.arcs
            .push(ArcSegment::new(beg_index, end_index, arc_angle));
        if let Err(err) = self.validate_arcs() {
            self.arcs.pop();
            return Err(err);
        }
        Ok(())
    }

    pub fn close(&mut self) {
        if !self.is_closed && self.coordinates.len() > 1 {
            self.append_closing_vertex();
            self.is_closed = true;
        }
    }

    /// 移除与首顶点重合的末尾顶点，连同终止于该顶点的圆弧段。
    pub fn open(&mut self) {
        if self.is_closed && self.coordinates.len() > 2 {
            let first = self.coordinates[0];
            let last = self.coordinates[self.coordinates.len() - 1];
            if first.is_close(last, VERTEX_TOLERANCE) {
                self.coordinates.pop();
                let count = self.coordinates.len();
                self.arcs.retain(|arc| arc.end_index < count);
            }
            self.is_closed = false;
        }
    }

    /// 反转顶点顺序，圆弧索引按 `(n-1) - old` 重映射且角度取反，并按起始索引排序。
    /// 越界的圆弧段被丢弃。
    pub fn reverse(&mut self) {
        self.coordinates.reverse();
        let max_index = self.coordinates.len().saturating_sub(1);
        self.arcs = self
            .arcs
            .iter()
            .filter_map(|arc| {
                Some(ArcSegment::new(
                    max_index.checked_sub(arc.end_index)?,
                    max_index.checked_sub(arc.beg_index)?,
                    -arc.arc_angle,
                ))
            })
            .collect();
        self.arcs.sort_by_key(|arc| arc.beg_index);
    }

    pub fn contains(&self, coordinate: Coordinate) -> bool {
        self.coordinates
            .iter()
            .any(|candidate| candidate.is_close(coordinate, VERTEX_TOLERANCE))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Coordinate> {
        self.coordinates.iter()
    }
}

impl<'a> IntoIterator for &'a Polyline {
    type Item = &'a Coordinate;
    type IntoIter = std::slice::Iter<'a, Coordinate>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl TryFrom<PolylineData> for Polyline {
    type Error = GeometryError;

    fn try_from(data: PolylineData) -> Result<Self, Self::Error> {
        let arcs = data
            .arcs
            .into_iter()
            .map(|arc| {
                ArcSegment::new(
                    arc.beg_index,
                    arc.end_index.unwrap_or(arc.beg_index + 1),
                    arc.arc_angle,
                )
            })
            .collect();
        Polyline::new(data.coordinates, arcs, false)
    }
}

impl From<Polyline> for PolylineData {
    fn from(polyline: Polyline) -> Self {
        Self {
            coordinates: polyline.coordinates,
            arcs: polyline
                .arcs
                .into_iter()
                .map(|arc| ArcSegmentData {
                    beg_index: arc.beg_index,
                    end_index: Some(arc.end_index),
                    arc_angle: arc.arc_angle,
                })
                .collect(),
        }
    }
}

impl fmt::Display for Polyline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let closed = if self.is_closed { "closed with " } else { "" };
        write!(f, "Polyline ({closed}{} points", self.coordinates.len())?;
        if !self.arcs.is_empty() {
            write!(f, ", {} arcs", self.arcs.len())?;
        }
        f.write_str(")")
    }
}

/// 面积加权质心（鞋带公式），在 XY 投影上计算并自动闭合顶点环。
///
/// 任一顶点带 `z` 时，结果的 `z` 为所有顶点 `z` 的算术平均（缺失按 0 计）。
pub fn polygon_centroid(coordinates: &[Coordinate]) -> Result<Coordinate, GeometryError> {
    if coordinates.len() < 3 {
        return Err(GeometryError::TooFewVertices(coordinates.len()));
    }

    let mut ring: Vec<Coordinate> = coordinates.iter().map(|c| c.to_2d()).collect();
    if !ring[0].is_close(ring[ring.len() - 1], VERTEX_TOLERANCE) {
        ring.push(ring[0]);
    }

    let (mut area, mut cx, mut cy) = (0.0, 0.0, 0.0);
    for pair in ring.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let cross = a.x * b.y - b.x * a.y;
        area += cross;
        cx += (a.x + b.x) * cross;
        cy += (a.y + b.y) * cross;
    }
    area /= 2.0;

    if area.abs() < STRAIGHT_ANGLE_EPSILON {
        return Err(GeometryError::ZeroArea);
    }

    let x = cx / (6.0 * area);
    let y = cy / (6.0 * area);
    Ok(match mean_z(coordinates) {
        Some(z) => Coordinate::new_3d(x, y, z),
        None => Coordinate::new(x, y),
    })
}

/// 顶点的简单平均位置。
pub fn polygon_geometric_center(coordinates: &[Coordinate]) -> Result<Coordinate, GeometryError> {
    if coordinates.is_empty() {
        return Err(GeometryError::Empty);
    }
    let n = coordinates.len() as f64;
    let x = coordinates.iter().map(|c| c.x).sum::<f64>() / n;
    let y = coordinates.iter().map(|c| c.y).sum::<f64>() / n;
    Ok(match mean_z(coordinates) {
        Some(z) => Coordinate::new_3d(x, y, z),
        None => Coordinate::new(x, y),
    })
}

fn mean_z(coordinates: &[Coordinate]) -> Option<f64> {
    if !coordinates.iter().any(|c| c.is_3d()) {
        return None;
    }
    let sum: f64 = coordinates.iter().map(|c| c.z.unwrap_or(0.0)).sum();
    Some(sum / coordinates.len() as f64)
}
