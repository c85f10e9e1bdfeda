//! GeoJSON-shaped geometries with arbitrary-dimension positions.
//!
//! Positions keep every ordinate the source file carried (x, y and an optional
//! elevation), so dimension reduction is an explicit step. Polygon union and
//! repair go through `geo`, which is planar.

use geo::{BooleanOps, Coord, LineString, MultiPolygon, Polygon};
use serde_json::{json, Map, Value};
use smallvec::SmallVec;

use crate::error::{Error, Result};

/// One coordinate tuple: `[x, y]` or `[x, y, z, ...]`.
pub type Position = SmallVec<[f64; 3]>;

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Point(Position),
    MultiPoint(Vec<Position>),
    LineString(Vec<Position>),
    MultiLineString(Vec<Vec<Position>>),
    /// Exterior ring first, then interior rings.
    Polygon(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
    GeometryCollection(Vec<Shape>),
    /// A geometry type outside the set above, kept verbatim.
    Other { kind: String, raw: Value },
}

impl Shape {
    pub fn kind(&self) -> &str {
        match self {
            Shape::Point(_) => "Point",
            Shape::MultiPoint(_) => "MultiPoint",
            Shape::LineString(_) => "LineString",
            Shape::MultiLineString(_) => "MultiLineString",
            Shape::Polygon(_) => "Polygon",
            Shape::MultiPolygon(_) => "MultiPolygon",
            Shape::GeometryCollection(_) => "GeometryCollection",
            Shape::Other { kind, .. } => kind.as_str(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Shape::Point(p) => p.is_empty(),
            Shape::MultiPoint(v) | Shape::LineString(v) => v.is_empty(),
            Shape::MultiLineString(v) => v.is_empty(),
            Shape::Polygon(rings) => rings.first().map_or(true, |r| r.is_empty()),
            Shape::MultiPolygon(v) => v.is_empty(),
            Shape::GeometryCollection(v) => v.is_empty(),
            Shape::Other { .. } => false,
        }
    }

    #[inline]
    pub fn is_polygonal(&self) -> bool {
        matches!(self, Shape::Polygon(_) | Shape::MultiPolygon(_))
    }

    /// Decode a GeoJSON geometry object. Unknown `type` values decode to
    /// [`Shape::Other`]; malformed coordinates are an error.
    pub fn from_json(v: &Value) -> std::result::Result<Shape, String> {
        let obj = v.as_object().ok_or("geometry is not an object")?;
        let kind = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or("geometry has no `type`")?;

        if kind == "GeometryCollection" {
            let members = obj
                .get("geometries")
                .and_then(Value::as_array)
                .ok_or("GeometryCollection without `geometries`")?;
            return members
                .iter()
                .map(Shape::from_json)
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(Shape::GeometryCollection);
        }

        let known = matches!(
            kind,
            "Point" | "MultiPoint" | "LineString" | "MultiLineString" | "Polygon" | "MultiPolygon"
        );
        if !known {
            return Ok(Shape::Other {
                kind: kind.to_owned(),
                raw: v.clone(),
            });
        }

        let coords = obj
            .get("coordinates")
            .ok_or_else(|| format!("{kind} without `coordinates`"))?;

        Ok(match kind {
            "Point" => match coords.as_array() {
                Some(a) if a.is_empty() => Shape::Point(Position::new()),
                _ => Shape::Point(parse_position(coords)?),
            },
            "MultiPoint" => Shape::MultiPoint(parse_path(coords)?),
            "LineString" => Shape::LineString(parse_path(coords)?),
            "MultiLineString" => Shape::MultiLineString(parse_rings(coords)?),
            "Polygon" => Shape::Polygon(parse_rings(coords)?),
            _ => Shape::MultiPolygon(
                array(coords)?
                    .iter()
                    .map(parse_rings)
                    .collect::<std::result::Result<_, _>>()?,
            ),
        })
    }

    pub fn to_json(&self) -> Value {
        match self {
            Shape::Point(p) => json!({ "type": "Point", "coordinates": position_json(p) }),
            Shape::MultiPoint(v) => json!({ "type": "MultiPoint", "coordinates": path_json(v) }),
            Shape::LineString(v) => json!({ "type": "LineString", "coordinates": path_json(v) }),
            Shape::MultiLineString(v) => {
                json!({ "type": "MultiLineString", "coordinates": rings_json(v) })
            }
            Shape::Polygon(v) => json!({ "type": "Polygon", "coordinates": rings_json(v) }),
            Shape::MultiPolygon(v) => json!({
                "type": "MultiPolygon",
                "coordinates": v.iter().map(|p| rings_json(p)).collect::<Vec<_>>(),
            }),
            Shape::GeometryCollection(v) => {
                let mut obj = Map::new();
                obj.insert("type".into(), Value::from("GeometryCollection"));
                obj.insert(
                    "geometries".into(),
                    Value::Array(v.iter().map(Shape::to_json).collect()),
                );
                Value::Object(obj)
            }
            Shape::Other { raw, .. } => raw.clone(),
        }
    }

    /// Planar polygon view. `None` for anything that is not a polygon or multi-polygon.
    pub fn to_multi_polygon(&self) -> Option<MultiPolygon<f64>> {
        match self {
            Shape::Polygon(rings) => Some(MultiPolygon::new(vec![geo_polygon(rings)])),
            Shape::MultiPolygon(polys) => {
                Some(MultiPolygon::new(polys.iter().map(|r| geo_polygon(r)).collect()))
            }
            _ => None,
        }
    }

    /// A single polygon stays a `Polygon`; anything else is a `MultiPolygon`.
    pub fn from_multi_polygon(mp: &MultiPolygon<f64>) -> Shape {
        let mut polys: Vec<Vec<Vec<Position>>> = mp.0.iter().map(shape_rings).collect();
        if polys.len() == 1 {
            Shape::Polygon(polys.remove(0))
        } else {
            Shape::MultiPolygon(polys)
        }
    }
}

/// Strip every position down to `[x, y]`.
///
/// Polygons recurse into each ring, multi-geometries and collections into each
/// member. Empty geometries come back unchanged. A [`Shape::Other`] anywhere in
/// the tree is a hard error rather than a silent drop.
pub fn drop_z(shape: &Shape) -> Result<Shape> {
    if shape.is_empty() {
        return Ok(shape.clone());
    }

    Ok(match shape {
        Shape::Point(p) => Shape::Point(xy(p)),
        Shape::MultiPoint(points) => Shape::MultiPoint(points.iter().map(xy).collect()),
        Shape::LineString(line) => Shape::LineString(flat_path(line)),
        Shape::MultiLineString(lines) => {
            Shape::MultiLineString(lines.iter().map(|l| flat_path(l)).collect())
        }
        Shape::Polygon(rings) => Shape::Polygon(flat_polygon(rings)),
        Shape::MultiPolygon(polys) => {
            Shape::MultiPolygon(polys.iter().map(|p| flat_polygon(p)).collect())
        }
        Shape::GeometryCollection(members) => Shape::GeometryCollection(
            members.iter().map(drop_z).collect::<Result<Vec<_>>>()?,
        ),
        Shape::Other { kind, .. } => {
            return Err(Error::UnsupportedGeometry { kind: kind.clone() })
        }
    })
}

/// Union of all geometries sharing a unit key.
///
/// A lone member is returned as is. Polygonal members are dissolved into one
/// (multi-)polygon; point and line members, if any, ride along in a
/// `GeometryCollection` next to the dissolved area.
pub fn union_all(mut shapes: Vec<Shape>) -> Result<Option<Shape>> {
    if shapes.len() <= 1 {
        return Ok(shapes.pop());
    }

    shapes.retain(|s| !s.is_empty());
    if shapes.len() <= 1 {
        return Ok(shapes.pop());
    }

    if let Some(other) = shapes.iter().find(|s| matches!(s, Shape::Other { .. })) {
        return Err(Error::UnsupportedGeometry {
            kind: other.kind().to_owned(),
        });
    }

    let (areas, rest): (Vec<Shape>, Vec<Shape>) =
        shapes.into_iter().partition(Shape::is_polygonal);

    let dissolved = areas
        .iter()
        .filter_map(Shape::to_multi_polygon)
        .fold(MultiPolygon::new(Vec::new()), |acc, mp| acc.union(&mp));

    if rest.is_empty() {
        return Ok(Some(Shape::from_multi_polygon(&dissolved)));
    }

    let mut members = Vec::with_capacity(rest.len() + 1);
    if !dissolved.0.is_empty() {
        members.push(Shape::from_multi_polygon(&dissolved));
    }
    members.extend(rest);
    Ok(Some(Shape::GeometryCollection(members)))
}

/// Zero-distance-buffer equivalent: re-node polygonal geometry through a union
/// with the empty set, which resolves self-intersections and ring orientation.
/// Non-polygonal and empty geometries are returned unchanged.
pub fn repair(shape: &Shape) -> Shape {
    if shape.is_empty() {
        return shape.clone();
    }

    match shape {
        Shape::GeometryCollection(members) => {
            Shape::GeometryCollection(members.iter().map(repair).collect())
        }
        _ => match shape.to_multi_polygon() {
            Some(mp) => Shape::from_multi_polygon(&mp.union(&MultiPolygon::new(Vec::new()))),
            None => shape.clone(),
        },
    }
}

#[inline]
fn xy(p: &Position) -> Position {
    p.iter().take(2).copied().collect()
}

fn flat_path(path: &[Position]) -> Vec<Position> {
    path.iter().map(xy).collect()
}

fn flat_polygon(rings: &[Vec<Position>]) -> Vec<Vec<Position>> {
    rings.iter().map(|ring| flat_path(ring)).collect()
}

fn geo_ring(ring: &[Position]) -> LineString<f64> {
    LineString::new(ring.iter().map(|p| Coord { x: p[0], y: p[1] }).collect())
}

fn geo_polygon(rings: &[Vec<Position>]) -> Polygon<f64> {
    match rings.split_first() {
        Some((exterior, interiors)) => Polygon::new(
            geo_ring(exterior),
            interiors.iter().map(|r| geo_ring(r)).collect(),
        ),
        None => Polygon::new(LineString::new(Vec::new()), Vec::new()),
    }
}

fn shape_ring(ring: &LineString<f64>) -> Vec<Position> {
    ring.coords()
        .map(|c| SmallVec::from_slice(&[c.x, c.y]))
        .collect()
}

fn shape_rings(poly: &Polygon<f64>) -> Vec<Vec<Position>> {
    std::iter::once(poly.exterior())
        .chain(poly.interiors())
        .map(shape_ring)
        .collect()
}

fn array(v: &Value) -> std::result::Result<&Vec<Value>, String> {
    v.as_array()
        .ok_or_else(|| format!("expected a coordinate array, got {v}"))
}

fn parse_position(v: &Value) -> std::result::Result<Position, String> {
    let items = array(v)?;
    if items.len() < 2 {
        return Err(format!("position needs at least two ordinates, got {v}"));
    }
    items
        .iter()
        .map(|o| o.as_f64().ok_or_else(|| format!("non-numeric ordinate {o}")))
        .collect()
}

fn parse_path(v: &Value) -> std::result::Result<Vec<Position>, String> {
    array(v)?.iter().map(parse_position).collect()
}

fn parse_rings(v: &Value) -> std::result::Result<Vec<Vec<Position>>, String> {
    array(v)?.iter().map(parse_path).collect()
}

fn position_json(p: &Position) -> Value {
    Value::Array(p.iter().map(|&o| Value::from(o)).collect())
}

fn path_json(path: &[Position]) -> Value {
    Value::Array(path.iter().map(position_json).collect())
}

fn rings_json(rings: &[Vec<Position>]) -> Value {
    Value::Array(rings.iter().map(|r| path_json(r)).collect())
}
