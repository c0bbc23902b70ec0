// src/geometry/projector.rs
use gdal::spatial_ref::{AxisMappingStrategy, CoordTransform, SpatialRef};
use serde::Serialize;

use super::{AreaOfInterest, Bounds, GEOGRAPHIC_CRS};
use crate::error::{QueryError, Result};

/// Values this close to an integer pixel edge are treated as on the edge.
const PIXEL_SNAP_TOLERANCE: f64 = 1e-6;

/// Affine pixel-to-world transform in GDAL coefficient order:
///
/// ```text
/// x = origin_x + col * pixel_width + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub row_rotation: f64,
    pub origin_y: f64,
    pub col_rotation: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// North-up transform without rotation.
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            pixel_width,
            row_rotation: 0.0,
            origin_y,
            col_rotation: 0.0,
            pixel_height,
        }
    }

    pub fn from_gdal(c: [f64; 6]) -> Self {
        Self {
            origin_x: c[0],
            pixel_width: c[1],
            row_rotation: c[2],
            origin_y: c[3],
            col_rotation: c[4],
            pixel_height: c[5],
        }
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.row_rotation,
            self.origin_y,
            self.col_rotation,
            self.pixel_height,
        ]
    }

    fn determinant(&self) -> f64 {
        self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation
    }

    /// World coordinates of a (fractional) pixel position.
    pub fn pixel_to_geo(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width + row * self.row_rotation,
            self.origin_y + col * self.col_rotation + row * self.pixel_height,
        )
    }

    /// Fractional `(col, row)` of a world coordinate, `None` for a singular transform.
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let det = self.determinant();
        if det.abs() < 1e-12 || !det.is_finite() {
            return None;
        }
        let dx = x - self.origin_x;
        let dy = y - self.origin_y;
        let col = (self.pixel_height * dx - self.row_rotation * dy) / det;
        let row = (-self.col_rotation * dx + self.pixel_width * dy) / det;
        Some((col, row))
    }
}

/// Rectangle in pixel space. Offsets may be negative until the window is
/// intersected with a raster extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PixelWindow {
    pub row_off: isize,
    pub col_off: isize,
    pub height: usize,
    pub width: usize,
}

impl PixelWindow {
    pub fn new(row_off: isize, col_off: isize, height: usize, width: usize) -> Self {
        Self { row_off, col_off, height, width }
    }

    /// The whole extent of a `width` x `height` raster.
    pub fn full(width: usize, height: usize) -> Self {
        Self::new(0, 0, height, width)
    }

    /// `(cols, rows)`, the shape convention of GDAL buffers.
    pub fn shape(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn row_end(&self) -> isize {
        self.row_off + self.height as isize
    }

    pub fn col_end(&self) -> isize {
        self.col_off + self.width as isize
    }

    pub fn contains(&self, other: &PixelWindow) -> bool {
        self.row_off <= other.row_off
            && self.col_off <= other.col_off
            && self.row_end() >= other.row_end()
            && self.col_end() >= other.col_end()
    }

    /// Overlap of two windows, `None` when they do not intersect.
    pub fn intersection(&self, other: &PixelWindow) -> Option<PixelWindow> {
        let row_off = self.row_off.max(other.row_off);
        let col_off = self.col_off.max(other.col_off);
        let row_end = self.row_end().min(other.row_end());
        let col_end = self.col_end().min(other.col_end());
        if row_end <= row_off || col_end <= col_off {
            return None;
        }
        Some(PixelWindow::new(
            row_off,
            col_off,
            (row_end - row_off) as usize,
            (col_end - col_off) as usize,
        ))
    }
}

/// Build a spatial reference from any GDAL user input (`EPSG:xxxx`, WKT,
/// PROJ string) with longitude/easting first.
pub fn spatial_ref(definition: &str) -> Result<SpatialRef> {
    let mut srs = SpatialRef::from_definition(definition)
        .map_err(|e| QueryError::Projection(format!("unsupported CRS {definition:?}: {e}")))?;
    srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
    Ok(srs)
}

/// Reprojects area-of-interest bounds into a raster's native CRS.
#[derive(Debug, Clone, Copy)]
pub struct GeometryProjector {
    densify_points: i32,
}

impl Default for GeometryProjector {
    fn default() -> Self {
        Self { densify_points: 21 }
    }
}

impl GeometryProjector {
    pub fn new(densify_points: i32) -> Self {
        Self { densify_points }
    }

    /// Bounding box of `aoi` (computed in EPSG:4326) expressed in `target_crs`.
    ///
    /// Edges are densified before transforming so curved edges in the target
    /// projection are enclosed.
    pub fn project_bounds(&self, aoi: &AreaOfInterest, target_crs: &str) -> Result<Bounds> {
        let bounds = aoi.bounds()?;
        self.transform_bounds(&bounds, GEOGRAPHIC_CRS, target_crs)
    }

    pub fn transform_bounds(&self, bounds: &Bounds, source_crs: &str, target_crs: &str) -> Result<Bounds> {
        if bounds.is_degenerate() {
            return Err(QueryError::Geometry(format!(
                "bounding box {:?} has zero area",
                bounds.to_array()
            )));
        }

        let source = spatial_ref(source_crs)?;
        let target = spatial_ref(target_crs)?;
        let transform = CoordTransform::new(&source, &target).map_err(|e| {
            QueryError::Projection(format!("no transform from {source_crs} to {target_crs}: {e}"))
        })?;

        let projected = transform
            .transform_bounds(&bounds.to_array(), self.densify_points)
            .map_err(|e| QueryError::Projection(format!("transforming bounds to {target_crs}: {e}")))?;

        let projected = Bounds::from_array(projected);
        if projected.is_degenerate() {
            return Err(QueryError::Projection(format!(
                "bounds {:?} collapse in {target_crs}",
                bounds.to_array()
            )));
        }
        Ok(projected)
    }
}

fn snap(v: f64) -> f64 {
    let r = v.round();
    if (v - r).abs() < PIXEL_SNAP_TOLERANCE {
        r
    } else {
        v
    }
}

/// Smallest integer pixel window enclosing `bounds` under `transform`.
///
/// The result is not clipped to any raster extent; see
/// [`PixelWindow::intersection`].
pub fn window_from_bounds(transform: &GeoTransform, bounds: &Bounds) -> Result<PixelWindow> {
    if bounds.is_degenerate() {
        return Err(QueryError::Geometry(format!(
            "bounding box {:?} has zero area",
            bounds.to_array()
        )));
    }

    let corners = [
        (bounds.minx, bounds.miny),
        (bounds.minx, bounds.maxy),
        (bounds.maxx, bounds.miny),
        (bounds.maxx, bounds.maxy),
    ];

    let mut col_min = f64::INFINITY;
    let mut col_max = f64::NEG_INFINITY;
    let mut row_min = f64::INFINITY;
    let mut row_max = f64::NEG_INFINITY;
    for (x, y) in corners {
        let (col, row) = transform.geo_to_pixel(x, y).ok_or_else(|| {
            QueryError::Projection(format!("singular affine transform {:?}", transform.to_gdal()))
        })?;
        col_min = col_min.min(col);
        col_max = col_max.max(col);
        row_min = row_min.min(row);
        row_max = row_max.max(row);
    }

    let col_off = snap(col_min).floor();
    let row_off = snap(row_min).floor();
    let col_end = snap(col_max).ceil();
    let row_end = snap(row_max).ceil();

    if ![col_off, row_off, col_end, row_end].iter().all(|v| v.is_finite()) {
        return Err(QueryError::Projection("pixel window is not finite".into()));
    }

    let width = (col_end - col_off) as usize;
    let height = (row_end - row_off) as usize;
    if width == 0 || height == 0 {
        return Err(QueryError::Geometry("bounds map to an empty pixel window".into()));
    }

    Ok(PixelWindow::new(row_off as isize, col_off as isize, height, width))
}

#[cfg(test)]
mod tests {
    use super::*;

    // 10 m Sentinel-2 style grid, 1000 x 1000 pixels.
    fn utm_grid() -> GeoTransform {
        GeoTransform::north_up(500_000.0, 4_500_000.0, 10.0, -10.0)
    }

    #[test]
    fn aligned_bounds_map_exactly() {
        let bounds = Bounds::new(500_100.0, 4_499_000.0, 500_200.0, 4_499_500.0);
        let window = window_from_bounds(&utm_grid(), &bounds).unwrap();
        assert_eq!(window, PixelWindow::new(50, 10, 50, 10));
    }

    #[test]
    fn fractional_bounds_round_outward() {
        let bounds = Bounds::new(500_105.0, 4_499_004.0, 500_196.0, 4_499_495.0);
        let window = window_from_bounds(&utm_grid(), &bounds).unwrap();
        assert_eq!(window, PixelWindow::new(50, 10, 50, 10));

        let bounds = Bounds::new(500_101.0, 4_499_001.0, 500_201.0, 4_499_501.0);
        let window = window_from_bounds(&utm_grid(), &bounds).unwrap();
        assert_eq!(window, PixelWindow::new(49, 10, 51, 11));
    }

    #[test]
    fn snapping_absorbs_float_noise() {
        let bounds = Bounds::new(500_100.000_000_01, 4_499_000.0, 500_199.999_999_99, 4_499_500.0);
        let window = window_from_bounds(&utm_grid(), &bounds).unwrap();
        assert_eq!(window.width, 10);
        assert_eq!(window.col_off, 10);
    }

    #[test]
    fn enlarging_bounds_never_shrinks_window() {
        let transform = utm_grid();
        let mut bounds = Bounds::new(500_123.4, 4_499_111.1, 500_234.5, 4_499_222.2);
        let mut previous = window_from_bounds(&transform, &bounds).unwrap();
        for step in 1..50 {
            let grow = step as f64 * 3.7;
            bounds = Bounds::new(
                bounds.minx - grow,
                bounds.miny - grow * 0.5,
                bounds.maxx + grow * 0.25,
                bounds.maxy + grow,
            );
            let window = window_from_bounds(&transform, &bounds).unwrap();
            assert!(window.contains(&previous), "{window:?} should contain {previous:?}");
            previous = window;
        }
    }

    #[test]
    fn zero_area_bounds_are_rejected() {
        let bounds = Bounds::new(500_100.0, 4_499_000.0, 500_100.0, 4_499_500.0);
        assert!(matches!(
            window_from_bounds(&utm_grid(), &bounds),
            Err(QueryError::Geometry(_))
        ));
    }

    #[test]
    fn singular_transform_is_rejected() {
        let transform = GeoTransform::north_up(0.0, 0.0, 0.0, -10.0);
        let bounds = Bounds::new(0.0, 0.0, 1.0, 1.0);
        assert!(matches!(
            window_from_bounds(&transform, &bounds),
            Err(QueryError::Projection(_))
        ));
    }

    #[test]
    fn geo_pixel_round_trip() {
        let t = GeoTransform::from_gdal([100.0, 2.0, 0.5, 200.0, 0.25, -2.0]);
        let (x, y) = t.pixel_to_geo(12.5, 7.25);
        let (col, row) = t.geo_to_pixel(x, y).unwrap();
        assert!((col - 12.5).abs() < 1e-9);
        assert!((row - 7.25).abs() < 1e-9);
        assert_eq!(GeoTransform::from_gdal(t.to_gdal()), t);
    }

    #[test]
    fn window_intersection() {
        let raster = PixelWindow::full(100, 80);
        let partial = PixelWindow::new(-5, 90, 10, 20);
        assert_eq!(raster.intersection(&partial), Some(PixelWindow::new(0, 90, 5, 10)));

        let outside = PixelWindow::new(80, 0, 10, 10);
        assert_eq!(raster.intersection(&outside), None);
    }

    #[test]
    fn project_bounds_into_utm() {
        let aoi = AreaOfInterest::from_geojson(&serde_json::json!({
            "type": "Polygon",
            "coordinates": [[[-3.1, 40.0], [-2.9, 40.0], [-2.9, 40.1], [-3.1, 40.1], [-3.1, 40.0]]]
        }))
        .unwrap();

        let projected = GeometryProjector::default()
            .project_bounds(&aoi, "EPSG:32630")
            .unwrap();

        // -3 degrees is the central meridian of UTM zone 30.
        assert!(projected.minx < 500_000.0 && projected.maxx > 500_000.0);
        assert!(((500_000.0 - projected.minx) - (projected.maxx - 500_000.0)).abs() < 1.0);
        assert!(projected.miny > 4_400_000.0 && projected.maxy < 4_450_000.0);
        assert!(projected.width() > 16_000.0 && projected.width() < 18_000.0);
    }

    #[test]
    fn identity_projection_keeps_bounds() {
        let bounds = Bounds::new(10.0, 45.0, 11.0, 46.0);
        let same = GeometryProjector::default()
            .transform_bounds(&bounds, GEOGRAPHIC_CRS, GEOGRAPHIC_CRS)
            .unwrap();
        for (a, b) in same.to_array().iter().zip(bounds.to_array()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn unknown_crs_is_a_projection_error() {
        let bounds = Bounds::new(10.0, 45.0, 11.0, 46.0);
        let err = GeometryProjector::default()
            .transform_bounds(&bounds, GEOGRAPHIC_CRS, "not-a-crs")
            .unwrap_err();
        assert!(matches!(err, QueryError::Projection(_)));
    }
}
