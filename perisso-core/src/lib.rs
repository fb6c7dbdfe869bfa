pub mod color;
pub mod curve;

pub mod geometry {
    use std::fmt;
    use std::ops::{Add, Mul, Neg, Sub};

    use glam::{DVec2, DVec3};
    use serde::{Deserialize, Serialize};
    use thiserror::Error;

    /// 几何值类型的领域错误，均表示调用方的编程错误而非数据差异。
    #[derive(Debug, Clone, PartialEq, Error)]
    pub enum GeometryError {
        #[error("cannot normalize a zero-length vector")]
        ZeroLength,
        #[error("division by zero")]
        DivisionByZero,
        #[error("component index {index} out of range for a {dimension}D value")]
        ComponentOutOfRange { index: usize, dimension: usize },
        #[error("expected 2 or 3 components, got {0}")]
        InvalidDimension(usize),
        #[error("at least one coordinate is required")]
        Empty,
        #[error("polygon must have at least 3 vertices, got {0}")]
        TooFewVertices(usize),
        #[error("polygon has zero area (vertices are collinear)")]
        ZeroArea,
        #[error("{0} is only supported for 2D values")]
        Only2D(&'static str),
        #[error("arc {index}: {message}")]
        InvalidArc { index: usize, message: String },
        #[error("segment index {index} out of range ({count} segments)")]
        SegmentOutOfRange { index: usize, count: usize },
        #[error("vertex index {index} out of range ({count} vertices)")]
        VertexOutOfRange { index: usize, count: usize },
    }

    /// 二维或三维向量。
    ///
    /// `z` 缺省即二维向量。二维与三维混合运算时，二维操作数以 `z = 0` 提升为三维，
    /// 从不把三维操作数降为二维。相等比较要求维度一致。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector {
        pub x: f64,
        pub y: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub z: Option<f64>,
    }

    impl Vector {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self { x, y, z: None }
        }

        #[inline]
        pub fn new_3d(x: f64, y: f64, z: f64) -> Self {
            Self { x, y, z: Some(z) }
        }

        #[inline]
        pub fn from_vec2(vec: DVec2) -> Self {
            Self::new(vec.x, vec.y)
        }

        #[inline]
        pub fn from_vec3(vec: DVec3) -> Self {
            Self::new_3d(vec.x, vec.y, vec.z)
        }

        #[inline]
        pub fn zero_2d() -> Self {
            Self::new(0.0, 0.0)
        }

        #[inline]
        pub fn zero_3d() -> Self {
            Self::new_3d(0.0, 0.0, 0.0)
        }

        pub fn unit_x(is_3d: bool) -> Self {
            Self {
                x: 1.0,
                y: 0.0,
                z: is_3d.then_some(0.0),
            }
        }

        pub fn unit_y(is_3d: bool) -> Self {
            Self {
                x: 0.0,
                y: 1.0,
                z: is_3d.then_some(0.0),
            }
        }

        #[inline]
        pub fn unit_z() -> Self {
            Self::new_3d(0.0, 0.0, 1.0)
        }

        #[inline]
        pub fn is_2d(self) -> bool {
            self.z.is_none()
        }

        #[inline]
        pub fn is_3d(self) -> bool {
            self.z.is_some()
        }

        #[inline]
        pub fn dimension(self) -> usize {
            if self.is_3d() { 3 } else { 2 }
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            DVec2::new(self.x, self.y)
        }

        /// 缺失的 `z` 以 0 代替。
        #[inline]
        pub fn as_vec3(self) -> DVec3 {
            DVec3::new(self.x, self.y, self.z.unwrap_or(0.0))
        }

        #[inline]
        pub fn magnitude(self) -> f64 {
            self.as_vec3().length()
        }

        #[inline]
        pub fn length(self) -> f64 {
            self.magnitude()
        }

        pub fn normalize(self) -> Result<Self, GeometryError> {
            let magnitude = self.magnitude();
            if magnitude == 0.0 {
                return Err(GeometryError::ZeroLength);
            }
            Ok(self.map(|c| c / magnitude))
        }

        #[inline]
        pub fn dot(self, other: Vector) -> f64 {
            self.as_vec3().dot(other.as_vec3())
        }

        /// 叉积结果始终为三维向量。
        #[inline]
        pub fn cross(self, other: Vector) -> Vector {
            Self::from_vec3(self.as_vec3().cross(other.as_vec3()))
        }

        #[inline]
        pub fn distance_to(self, other: Vector) -> f64 {
            (self - other).magnitude()
        }

        /// 两向量夹角（弧度）。任一向量长度为零时返回错误。
        pub fn angle_to(self, other: Vector) -> Result<f64, GeometryError> {
            let magnitudes = self.magnitude() * other.magnitude();
            if magnitudes == 0.0 {
                return Err(GeometryError::ZeroLength);
            }
            Ok((self.dot(other) / magnitudes).clamp(-1.0, 1.0).acos())
        }

        #[inline]
        pub fn scale(self, factor: f64) -> Self {
            self.map(|c| c * factor)
        }

        pub fn divide(self, scalar: f64) -> Result<Self, GeometryError> {
            if scalar == 0.0 {
                return Err(GeometryError::DivisionByZero);
            }
            Ok(self.map(|c| c / scalar))
        }

        #[inline]
        pub fn to_2d(self) -> Self {
            Self::new(self.x, self.y)
        }

        /// 已是三维时保留原有 `z`。
        #[inline]
        pub fn to_3d(self, z: f64) -> Self {
            Self::new_3d(self.x, self.y, self.z.unwrap_or(z))
        }

        pub fn component(self, index: usize) -> Result<f64, GeometryError> {
            match (index, self.z) {
                (0, _) => Ok(self.x),
                (1, _) => Ok(self.y),
                (2, Some(z)) => Ok(z),
                _ => Err(GeometryError::ComponentOutOfRange {
                    index,
                    dimension: self.dimension(),
                }),
            }
        }

        pub fn set_component(&mut self, index: usize, value: f64) -> Result<(), GeometryError> {
            let dimension = self.dimension();
            match (index, self.z.as_mut()) {
                (0, _) => self.x = value,
                (1, _) => self.y = value,
                (2, Some(z)) => *z = value,
                _ => return Err(GeometryError::ComponentOutOfRange { index, dimension }),
            }
            Ok(())
        }

        pub fn components(self) -> impl Iterator<Item = f64> {
            [Some(self.x), Some(self.y), self.z].into_iter().flatten()
        }

        #[inline]
        pub(crate) fn as_coordinate(self) -> Coordinate {
            Coordinate {
                x: self.x,
                y: self.y,
                z: self.z,
            }
        }

        fn map(self, f: impl Fn(f64) -> f64) -> Self {
            Self {
                x: f(self.x),
                y: f(self.y),
                z: self.z.map(&f),
            }
        }

        fn combine(self, other: Vector, f: impl Fn(f64, f64) -> f64) -> Self {
            match (self.z, other.z) {
                (None, None) => Self::new(f(self.x, other.x), f(self.y, other.y)),
                (a, b) => Self::new_3d(
                    f(self.x, other.x),
                    f(self.y, other.y),
                    f(a.unwrap_or(0.0), b.unwrap_or(0.0)),
                ),
            }
        }
    }

    impl Add for Vector {
        type Output = Vector;

        fn add(self, rhs: Vector) -> Vector {
            self.combine(rhs, |a, b| a + b)
        }
    }

    impl Sub for Vector {
        type Output = Vector;

        fn sub(self, rhs: Vector) -> Vector {
            self.combine(rhs, |a, b| a - b)
        }
    }

    /// 标量加法作用于每个分量。
    impl Add<f64> for Vector {
        type Output = Vector;

        fn add(self, rhs: f64) -> Vector {
            self.map(|c| c + rhs)
        }
    }

    impl Sub<f64> for Vector {
        type Output = Vector;

        fn sub(self, rhs: f64) -> Vector {
            self.map(|c| c - rhs)
        }
    }

    impl Mul<f64> for Vector {
        type Output = Vector;

        fn mul(self, rhs: f64) -> Vector {
            self.scale(rhs)
        }
    }

    impl Mul<Vector> for f64 {
        type Output = Vector;

        fn mul(self, rhs: Vector) -> Vector {
            rhs.scale(self)
        }
    }

    impl Neg for Vector {
        type Output = Vector;

        fn neg(self) -> Vector {
            self.map(|c| -c)
        }
    }

    impl From<DVec2> for Vector {
        fn from(value: DVec2) -> Self {
            Self::from_vec2(value)
        }
    }

    impl From<DVec3> for Vector {
        fn from(value: DVec3) -> Self {
            Self::from_vec3(value)
        }
    }

    impl fmt::Display for Vector {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self.z {
                None => write!(f, "Vector2D({:?}, {:?})", self.x, self.y),
                Some(z) => write!(f, "Vector3D({:?}, {:?}, {:?})", self.x, self.y, z),
            }
        }
    }

    /// 空间点，维度规则与 [`Vector`] 一致。两点之差为向量，点加向量仍为点。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Coordinate {
        pub x: f64,
        pub y: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub z: Option<f64>,
    }

    impl Coordinate {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self { x, y, z: None }
        }

        #[inline]
        pub fn new_3d(x: f64, y: f64, z: f64) -> Self {
            Self { x, y, z: Some(z) }
        }

        #[inline]
        pub fn origin_2d() -> Self {
            Self::new(0.0, 0.0)
        }

        #[inline]
        pub fn origin_3d() -> Self {
            Self::new_3d(0.0, 0.0, 0.0)
        }

        #[inline]
        pub fn is_2d(self) -> bool {
            self.z.is_none()
        }

        #[inline]
        pub fn is_3d(self) -> bool {
            self.z.is_some()
        }

        #[inline]
        pub fn dimension(self) -> usize {
            if self.is_3d() { 3 } else { 2 }
        }

        /// 以原点为起点的位置向量。
        #[inline]
        pub fn as_vector(self) -> Vector {
            Vector {
                x: self.x,
                y: self.y,
                z: self.z,
            }
        }

        #[inline]
        pub fn as_vec3(self) -> DVec3 {
            self.as_vector().as_vec3()
        }

        #[inline]
        pub fn vector_to(self, other: Coordinate) -> Vector {
            other.as_vector() - self.as_vector()
        }

        #[inline]
        pub fn distance_to(self, other: Coordinate) -> f64 {
            self.vector_to(other).magnitude()
        }

        pub fn midpoint_to(self, other: Coordinate) -> Coordinate {
            self.as_vector()
                .combine(other.as_vector(), |a, b| (a + b) / 2.0)
                .as_coordinate()
        }

        #[inline]
        pub fn translate(self, offset: Vector) -> Coordinate {
            (self.as_vector() + offset).as_coordinate()
        }

        /// 绕 `center` 旋转 `angle` 弧度，仅支持二维。
        pub fn rotate_around(self, center: Coordinate, angle: f64) -> Result<Coordinate, GeometryError> {
            if self.is_3d() || center.is_3d() {
                return Err(GeometryError::Only2D("rotate_around"));
            }
            let dx = self.x - center.x;
            let dy = self.y - center.y;
            let (sin, cos) = angle.sin_cos();
            Ok(Coordinate::new(
                dx * cos - dy * sin + center.x,
                dx * sin + dy * cos + center.y,
            ))
        }

        #[inline]
        pub fn is_close(self, other: Coordinate, tolerance: f64) -> bool {
            self.distance_to(other) <= tolerance
        }

        #[inline]
        pub fn to_2d(self) -> Self {
            Self::new(self.x, self.y)
        }

        #[inline]
        pub fn to_3d(self, z: f64) -> Self {
            Self::new_3d(self.x, self.y, self.z.unwrap_or(z))
        }

        pub fn scale(self, factor: f64) -> Self {
            self.as_vector().scale(factor).as_coordinate()
        }

        pub fn divide(self, scalar: f64) -> Result<Self, GeometryError> {
            Ok(self.as_vector().divide(scalar)?.as_coordinate())
        }

        pub fn component(self, index: usize) -> Result<f64, GeometryError> {
            self.as_vector().component(index)
        }

        pub fn components(self) -> impl Iterator<Item = f64> {
            self.as_vector().components()
        }
    }

    impl Add<Vector> for Coordinate {
        type Output = Coordinate;

        fn add(self, rhs: Vector) -> Coordinate {
            self.translate(rhs)
        }
    }

    impl Sub<Vector> for Coordinate {
        type Output = Coordinate;

        fn sub(self, rhs: Vector) -> Coordinate {
            self.translate(-rhs)
        }
    }

    impl Add for Coordinate {
        type Output = Coordinate;

        fn add(self, rhs: Coordinate) -> Coordinate {
            self.translate(rhs.as_vector())
        }
    }

    /// `a - b` 得到由 `b` 指向 `a` 的向量。
    impl Sub for Coordinate {
        type Output = Vector;

        fn sub(self, rhs: Coordinate) -> Vector {
            rhs.vector_to(self)
        }
    }

    impl Mul<f64> for Coordinate {
        type Output = Coordinate;

        fn mul(self, rhs: f64) -> Coordinate {
            self.scale(rhs)
        }
    }

    impl Neg for Coordinate {
        type Output = Coordinate;

        fn neg(self) -> Coordinate {
            (-self.as_vector()).as_coordinate()
        }
    }

    impl From<(f64, f64)> for Coordinate {
        fn from((x, y): (f64, f64)) -> Self {
            Self::new(x, y)
        }
    }

    impl From<(f64, f64, f64)> for Coordinate {
        fn from((x, y, z): (f64, f64, f64)) -> Self {
            Self::new_3d(x, y, z)
        }
    }

    impl TryFrom<&[f64]> for Coordinate {
        type Error = GeometryError;

        fn try_from(value: &[f64]) -> Result<Self, Self::Error> {
            match *value {
                [x, y] => Ok(Self::new(x, y)),
                [x, y, z] => Ok(Self::new_3d(x, y, z)),
                _ => Err(GeometryError::InvalidDimension(value.len())),
            }
        }
    }

    impl fmt::Display for Coordinate {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self.z {
                None => write!(f, "Coord2D({:?}, {:?})", self.x, self.y),
                Some(z) => write!(f, "Coord3D({:?}, {:?}, {:?})", self.x, self.y, z),
            }
        }
    }

    /// 轴对齐三维包围盒，字段名与 `Get3DBoundingBoxes` 返回的结构一致。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct BoundingBox3D {
        pub x_min: f64,
        pub y_min: f64,
        pub z_min: f64,
        pub x_max: f64,
        pub y_max: f64,
        pub z_max: f64,
    }

    impl BoundingBox3D {
        pub fn new(min: Coordinate, max: Coordinate) -> Self {
            let mut bounds = Self::empty();
            bounds.include_point(min);
            bounds.include_point(max);
            bounds
        }

        #[inline]
        pub fn empty() -> Self {
            Self {
                x_min: f64::INFINITY,
                y_min: f64::INFINITY,
                z_min: f64::INFINITY,
                x_max: f64::NEG_INFINITY,
                y_max: f64::NEG_INFINITY,
                z_max: f64::NEG_INFINITY,
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.x_min > self.x_max || self.y_min > self.y_max || self.z_min > self.z_max
        }

        #[inline]
        pub fn min(&self) -> Coordinate {
            Coordinate::new_3d(self.x_min, self.y_min, self.z_min)
        }

        #[inline]
        pub fn max(&self) -> Coordinate {
            Coordinate::new_3d(self.x_max, self.y_max, self.z_max)
        }

        /// 二维点按 `z = 0` 计入。
        pub fn include_point(&mut self, point: Coordinate) {
            let point = point.as_vec3();
            let (min, max) = if self.is_empty() {
                (point, point)
            } else {
                (self.min().as_vec3().min(point), self.max().as_vec3().max(point))
            };
            *self = Self::from_corners(min, max);
        }

        pub fn include_bounds(&mut self, other: &BoundingBox3D) {
            if other.is_empty() {
                return;
            }
            self.include_point(other.min());
            self.include_point(other.max());
        }

        #[inline]
        pub fn size(&self) -> Vector {
            Vector::from_vec3(self.max().as_vec3() - self.min().as_vec3())
        }

        #[inline]
        pub fn center(&self) -> Coordinate {
            debug_assert!(!self.is_empty());
            self.min().midpoint_to(self.max())
        }

        fn from_corners(min: DVec3, max: DVec3) -> Self {
            Self {
                x_min: min.x,
                y_min: min.y,
                z_min: min.z,
                x_max: max.x,
                y_max: max.y,
                z_max: max.z,
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn magnitude_and_distance() {
            assert_eq!(Vector::new(3.0, 4.0).magnitude(), 5.0);
            assert_eq!(
                Coordinate::new(0.0, 0.0).distance_to(Coordinate::new(3.0, 4.0)),
                5.0
            );
            assert_eq!(
                Coordinate::new(0.0, 0.0).midpoint_to(Coordinate::new(4.0, 4.0)),
                Coordinate::new(2.0, 2.0)
            );
        }

        #[test]
        fn mixed_dimensions_promote_to_3d() {
            let sum = Vector::new(1.0, 2.0) + Vector::new_3d(1.0, 1.0, 7.5);
            assert_eq!(sum, Vector::new_3d(2.0, 3.0, 7.5));

            let diff = Vector::new_3d(1.0, 1.0, 2.0) - Vector::new(1.0, 1.0);
            assert_eq!(diff.z, Some(2.0));

            let mid = Coordinate::new(0.0, 0.0).midpoint_to(Coordinate::new_3d(2.0, 2.0, 4.0));
            assert_eq!(mid, Coordinate::new_3d(1.0, 1.0, 2.0));

            let distance = Coordinate::new(0.0, 0.0).distance_to(Coordinate::new_3d(0.0, 3.0, 4.0));
            assert!((distance - 5.0).abs() < 1e-12);
        }

        #[test]
        fn equality_requires_same_dimension() {
            assert_ne!(Vector::new(1.0, 2.0), Vector::new_3d(1.0, 2.0, 0.0));
            assert_ne!(Coordinate::new(1.0, 2.0), Coordinate::new_3d(1.0, 2.0, 0.0));
            assert_eq!(Vector::new(1.0, 2.0).to_3d(0.0), Vector::new_3d(1.0, 2.0, 0.0));
        }

        #[test]
        fn domain_errors_surface() {
            assert_eq!(Vector::zero_2d().normalize(), Err(GeometryError::ZeroLength));
            assert_eq!(
                Vector::new(1.0, 1.0).divide(0.0),
                Err(GeometryError::DivisionByZero)
            );
            assert_eq!(
                Coordinate::new(1.0, 1.0).divide(0.0),
                Err(GeometryError::DivisionByZero)
            );
            assert!(matches!(
                Vector::new(1.0, 1.0).component(2),
                Err(GeometryError::ComponentOutOfRange { index: 2, dimension: 2 })
            ));
            assert!(
                Coordinate::new_3d(1.0, 0.0, 0.0)
                    .rotate_around(Coordinate::origin_2d(), 1.0)
                    .is_err()
            );
        }

        #[test]
        fn cross_and_dot() {
            let x = Vector::unit_x(false);
            let y = Vector::unit_y(false);
            assert_eq!(x.cross(y), Vector::unit_z());
            assert_eq!(x.dot(y), 0.0);
            assert_eq!(Vector::new(1.0, 2.0).dot(Vector::new_3d(3.0, 4.0, 100.0)), 11.0);
            let angle = x.angle_to(y).expect("non-zero vectors");
            assert!((angle - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        }

        #[test]
        fn coordinate_arithmetic() {
            let p1 = Coordinate::new(1.0, 2.0);
            let p2 = Coordinate::new_3d(3.0, 4.0, 5.0);
            let v = p2 - p1;
            assert_eq!(v, Vector::new_3d(2.0, 2.0, 5.0));
            assert_eq!(p1 + Vector::new(5.0, 5.0), Coordinate::new(6.0, 7.0));
            assert_eq!(p1.translate(p1.vector_to(p2)), Coordinate::new_3d(3.0, 4.0, 5.0));

            let rotated = Coordinate::new(1.0, 0.0)
                .rotate_around(Coordinate::origin_2d(), std::f64::consts::FRAC_PI_2)
                .expect("2d rotation");
            assert!(rotated.is_close(Coordinate::new(0.0, 1.0), 1e-9));
        }

        #[test]
        fn coordinate_from_slices() {
            let c = Coordinate::try_from(&[1.0, 2.0][..]).expect("2 components");
            assert!(c.is_2d());
            assert_eq!(
                Coordinate::try_from(&[1.0][..]),
                Err(GeometryError::InvalidDimension(1))
            );
        }

        #[test]
        fn bounding_box_tracks_extent() {
            let mut bounds = BoundingBox3D::empty();
            assert!(bounds.is_empty());
            bounds.include_point(Coordinate::new_3d(1.0, 2.0, 3.0));
            bounds.include_point(Coordinate::new(-1.0, 4.0));
            let size = bounds.size();
            assert_eq!(size, Vector::new_3d(2.0, 2.0, 3.0));
            assert_eq!(bounds.center(), Coordinate::new_3d(0.0, 3.0, 1.5));
        }
    }
}

pub mod element {
    use std::fmt;
    use std::str::FromStr;

    use serde::{Deserialize, Serialize};
    use thiserror::Error;
    use uuid::Uuid;

    /// 远端元素的唯一标识。
    #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ElementId {
        pub guid: String,
    }

    /// 远端系统中的元素引用，形如 `{"elementId": {"guid": "..."}}`。
    ///
    /// 核心层只读取 GUID；集合运算与包含判断都以 GUID 为唯一键。
    #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Element {
        pub element_id: ElementId,
    }

    impl Element {
        #[inline]
        pub fn new(guid: impl Into<String>) -> Self {
            Self {
                element_id: ElementId { guid: guid.into() },
            }
        }

        #[inline]
        pub fn guid(&self) -> &str {
            &self.element_id.guid
        }
    }

    /// 判断字符串是否为 8-4-4-4-12 连字符格式的 GUID。
    pub fn is_guid(value: &str) -> bool {
        value.len() == 36 && Uuid::try_parse(value).is_ok()
    }

    /// 生成新的随机 GUID（大写，与 Archicad 输出保持一致）。
    pub fn new_guid() -> String {
        Uuid::new_v4().to_string().to_uppercase()
    }

    #[derive(Debug, Clone, PartialEq, Eq, Error)]
    #[error("unknown element type: {0}")]
    pub struct UnknownElementType(pub String);

    macro_rules! element_types {
        ($($variant:ident),+ $(,)?) => {
            /// Add-On 命令返回的元素类型标签。
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
            pub enum ElementType {
                $($variant),+
            }

            impl ElementType {
                pub const ALL: &'static [ElementType] = &[$(ElementType::$variant),+];

                pub fn as_str(self) -> &'static str {
                    match self {
                        $(ElementType::$variant => stringify!($variant)),+
                    }
                }
            }

            impl FromStr for ElementType {
                type Err = UnknownElementType;

                fn from_str(value: &str) -> Result<Self, Self::Err> {
                    match value {
                        $(stringify!($variant) => Ok(ElementType::$variant),)+
                        other => Err(UnknownElementType(other.to_string())),
                    }
                }
            }
        };
    }

    element_types!(
        Wall,
        Column,
        Beam,
        Window,
        Door,
        Object,
        Lamp,
        Slab,
        Roof,
        Mesh,
        Dimension,
        RadialDimension,
        LevelDimension,
        AngleDimension,
        Text,
        Label,
        Zone,
        Hatch,
        Line,
        PolyLine,
        Arc,
        Circle,
        Spline,
        Hotspot,
        CutPlane,
        Camera,
        CamSet,
        Group,
        SectElem,
        Drawing,
        Picture,
        Detail,
        Elevation,
        InteriorElevation,
        Worksheet,
        Hotlink,
        CurtainWall,
        CurtainWallSegment,
        CurtainWallFrame,
        CurtainWallPanel,
        CurtainWallJunction,
        CurtainWallAccessory,
        Shell,
        Skylight,
        Morph,
        ChangeMarker,
        Stair,
        Riser,
        Tread,
        StairStructure,
        Railing,
        RailingToprail,
        RailingHandrail,
        RailingPost,
        Opening,
        ColumnSegment,
        BeamSegment,
    );

    impl fmt::Display for ElementType {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.as_str())
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq, Error)]
    #[error("field must be a valid filter tag, got `{0}`")]
    pub struct UnknownFilter(pub String);

    /// 过滤字段：决定谓词比较的对象以及字段解析策略。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum Filter {
        Id,
        ParentId,
        HotlinkId,
        HotlinkElementId,
        Layer,
        Guid,
        ElementType,
        Property,
        Height,
        Length,
    }

    impl Filter {
        pub const ALL: [Filter; 10] = [
            Filter::Id,
            Filter::ParentId,
            Filter::HotlinkId,
            Filter::HotlinkElementId,
            Filter::Layer,
            Filter::Guid,
            Filter::ElementType,
            Filter::Property,
            Filter::Height,
            Filter::Length,
        ];

        pub fn tag(self) -> &'static str {
            match self {
                Filter::Id => "ID",
                Filter::ParentId => "PARENT_ID",
                Filter::HotlinkId => "HL_ID",
                Filter::HotlinkElementId => "HLE_ID",
                Filter::Layer => "LAYER",
                Filter::Guid => "GUID",
                Filter::ElementType => "ELEMENT_TYPE",
                Filter::Property => "PROPERTY",
                Filter::Height => "HEIGHT",
                Filter::Length => "LENGTH",
            }
        }

        /// 直接读取的内建属性名（非本地化名称）；派生字段返回 `None`。
        pub fn builtin_property(self) -> Option<&'static str> {
            match self {
                Filter::Id => Some("General_ElementID"),
                Filter::ParentId => Some("IdAndCategories_ParentId"),
                Filter::HotlinkId => Some("IdAndCategories_HotlinkMasterID"),
                Filter::HotlinkElementId => Some("General_HotlinkAndElementID"),
                Filter::Layer => Some("ModelView_LayerName"),
                Filter::Guid => Some("General_UniqueID"),
                Filter::ElementType | Filter::Property | Filter::Height | Filter::Length => None,
            }
        }
    }

    impl FromStr for Filter {
        type Err = UnknownFilter;

        fn from_str(value: &str) -> Result<Self, Self::Err> {
            let normalized = value.trim().to_ascii_uppercase();
            match normalized.as_str() {
                "HOTLINK_ID" => return Ok(Filter::HotlinkId),
                "HOTLINK_ELEMENT_ID" => return Ok(Filter::HotlinkElementId),
                _ => {}
            }
            Filter::ALL
                .into_iter()
                .find(|filter| filter.tag() == normalized)
                .ok_or_else(|| UnknownFilter(value.to_string()))
        }
    }

    impl fmt::Display for Filter {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.tag())
        }
    }

}
