// src/geometry/mod.rs
pub mod projector;

use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{Area, BoundingRect, Coord, Line, LineString, Polygon};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{QueryError, Result};

pub use projector::{GeoTransform, GeometryProjector, PixelWindow};

/// CRS of every area of interest handed to the pipeline.
pub const GEOGRAPHIC_CRS: &str = "EPSG:4326";

/// Axis-aligned bounding box `(minx, miny, maxx, maxy)` in some CRS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub minx: f64,
    pub miny: f64,
    pub maxx: f64,
    pub maxy: f64,
}

impl Bounds {
    pub fn new(minx: f64, miny: f64, maxx: f64, maxy: f64) -> Self {
        Self { minx, miny, maxx, maxy }
    }

    pub fn from_array(b: [f64; 4]) -> Self {
        Self::new(b[0], b[1], b[2], b[3])
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.minx, self.miny, self.maxx, self.maxy]
    }

    pub fn width(&self) -> f64 {
        self.maxx - self.minx
    }

    pub fn height(&self) -> f64 {
        self.maxy - self.miny
    }

    /// Non-finite or zero-area boxes cannot produce a pixel window.
    pub fn is_degenerate(&self) -> bool {
        !self.to_array().iter().all(|v| v.is_finite()) || self.width() <= 0.0 || self.height() <= 0.0
    }

    pub fn contains(&self, other: &Bounds) -> bool {
        self.minx <= other.minx
            && self.miny <= other.miny
            && self.maxx >= other.maxx
            && self.maxy >= other.maxy
    }
}

#[derive(Deserialize)]
struct GeoJsonPolygon {
    #[serde(rename = "type")]
    type_: String,
    coordinates: Vec<Vec<Vec<f64>>>,
}

/// A validated polygon in geographic coordinates (lon/lat, EPSG:4326).
#[derive(Debug, Clone, PartialEq)]
pub struct AreaOfInterest {
    polygon: Polygon<f64>,
}

impl AreaOfInterest {
    /// Parse a GeoJSON `Polygon` geometry object.
    pub fn from_geojson(value: &Value) -> Result<Self> {
        let parsed: GeoJsonPolygon = serde_json::from_value(value.clone())
            .map_err(|e| QueryError::Geometry(format!("not a GeoJSON polygon: {e}")))?;

        if parsed.type_ != "Polygon" {
            return Err(QueryError::Geometry(format!(
                "expected geometry type Polygon, got {}",
                parsed.type_
            )));
        }

        let mut rings = Vec::with_capacity(parsed.coordinates.len());
        for (idx, ring) in parsed.coordinates.iter().enumerate() {
            let coords = ring
                .iter()
                .map(|pos| match pos.as_slice() {
                    [x, y, ..] => Ok(Coord { x: *x, y: *y }),
                    _ => Err(QueryError::Geometry(format!(
                        "ring {idx}: position needs at least two coordinates"
                    ))),
                })
                .collect::<Result<Vec<_>>>()?;
            rings.push(LineString::new(coords));
        }

        let mut rings = rings.into_iter();
        let exterior = rings
            .next()
            .ok_or_else(|| QueryError::Geometry("polygon has no rings".into()))?;

        Self::from_polygon(Polygon::new(exterior, rings.collect()))
    }

    /// Wrap an existing polygon after validating it. Repeated consecutive
    /// positions are dropped first.
    pub fn from_polygon(polygon: Polygon<f64>) -> Result<Self> {
        let (exterior, interiors) = polygon.into_inner();
        let polygon = Polygon::new(
            without_repeats(exterior),
            interiors.into_iter().map(without_repeats).collect(),
        );

        validate_ring(polygon.exterior(), "exterior")?;
        for (idx, hole) in polygon.interiors().iter().enumerate() {
            validate_ring(hole, &format!("interior {idx}"))?;
        }

        if polygon.unsigned_area() <= 0.0 {
            return Err(QueryError::Geometry("polygon has zero area".into()));
        }

        Ok(Self { polygon })
    }

    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    /// Bounding box in geographic coordinates.
    pub fn bounds(&self) -> Result<Bounds> {
        let rect = self
            .polygon
            .bounding_rect()
            .ok_or_else(|| QueryError::Geometry("empty geometry".into()))?;
        let bounds = Bounds::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y);
        if bounds.is_degenerate() {
            return Err(QueryError::Geometry(format!(
                "bounding box {:?} has zero area",
                bounds.to_array()
            )));
        }
        Ok(bounds)
    }

    /// GeoJSON rendering used for the catalog `intersects` filter.
    pub fn to_geojson(&self) -> Value {
        let ring = |ls: &LineString<f64>| -> Vec<[f64; 2]> { ls.coords().map(|c| [c.x, c.y]).collect() };
        let mut coordinates = vec![ring(self.polygon.exterior())];
        coordinates.extend(self.polygon.interiors().iter().map(ring));
        json!({ "type": "Polygon", "coordinates": coordinates })
    }
}

fn without_repeats(ring: LineString<f64>) -> LineString<f64> {
    let mut coords = ring.0;
    coords.dedup();
    LineString::new(coords)
}

fn validate_ring(ring: &LineString<f64>, label: &str) -> Result<()> {
    for c in ring.coords() {
        if !c.x.is_finite() || !c.y.is_finite() {
            return Err(QueryError::Geometry(format!("{label} ring has non-finite coordinates")));
        }
        if !(-180.0..=180.0).contains(&c.x) || !(-90.0..=90.0).contains(&c.y) {
            return Err(QueryError::Geometry(format!(
                "{label} ring position ({}, {}) is outside lon/lat range",
                c.x, c.y
            )));
        }
    }

    // Closed rings repeat the first position, so 4 positions = 3 vertices.
    if ring.0.len() < 4 {
        return Err(QueryError::Geometry(format!(
            "{label} ring needs at least 3 distinct positions"
        )));
    }

    // Sweep over segments ordered by their left edge; only segments whose
    // x ranges overlap are tested against each other.
    let segments: Vec<Line<f64>> = ring.lines().collect();
    let n = segments.len();
    let min_x = |l: &Line<f64>| l.start.x.min(l.end.x);
    let max_x = |l: &Line<f64>| l.start.x.max(l.end.x);

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| min_x(&segments[a]).total_cmp(&min_x(&segments[b])));

    for (k, &a) in order.iter().enumerate() {
        let reach = max_x(&segments[a]);
        for &b in &order[k + 1..] {
            if min_x(&segments[b]) > reach {
                break;
            }
            let (i, j) = (a.min(b), a.max(b));
            let adjacent = j == i + 1 || (i == 0 && j == n - 1);
            match line_intersection(segments[i], segments[j]) {
                None => {}
                Some(LineIntersection::SinglePoint { is_proper, .. }) if adjacent && !is_proper => {}
                Some(_) => {
                    return Err(QueryError::Geometry(format!(
                        "{label} ring self-intersects between segments {i} and {j}"
                    )));
                }
            }
        }
    }
    Ok(())
}
