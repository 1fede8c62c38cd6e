//! Bounding boxes of GeoJSON footprints, used to recenter the map after rendering.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Extent {
    fn point(x: f64, y: f64) -> Self {
        Self {
            xmin: x,
            ymin: y,
            xmax: x,
            ymax: y,
        }
    }

    pub fn union(&self, other: &Extent) -> Extent {
        Extent {
            xmin: self.xmin.min(other.xmin),
            ymin: self.ymin.min(other.ymin),
            xmax: self.xmax.max(other.xmax),
            ymax: self.ymax.max(other.ymax),
        }
    }

    /// Grows (or shrinks) the extent around its center.
    pub fn scaled(&self, factor: f64) -> Extent {
        let cx = (self.xmin + self.xmax) / 2.0;
        let cy = (self.ymin + self.ymax) / 2.0;
        let hw = (self.xmax - self.xmin) / 2.0 * factor;
        let hh = (self.ymax - self.ymin) / 2.0 * factor;
        Extent {
            xmin: cx - hw,
            ymin: cy - hh,
            xmax: cx + hw,
            ymax: cy + hh,
        }
    }
}

/// Bounding box of any GeoJSON geometry, `None` if it holds no coordinates.
pub fn extent(geometry: &Value) -> Option<Extent> {
    if let Some(members) = geometry.get("geometries").and_then(Value::as_array) {
        return members.iter().filter_map(extent).reduce(|a, b| a.union(&b));
    }
    geometry.get("coordinates").and_then(coordinates_extent)
}

/// Union extent of several geometries.
pub fn union_extent<'a>(geometries: impl IntoIterator<Item = &'a Value>) -> Option<Extent> {
    geometries
        .into_iter()
        .filter_map(extent)
        .reduce(|a, b| a.union(&b))
}

fn coordinates_extent(coords: &Value) -> Option<Extent> {
    let items = coords.as_array()?;
    // A position is an array of numbers; anything else nests deeper.
    if let (Some(x), Some(y)) = (
        items.first().and_then(Value::as_f64),
        items.get(1).and_then(Value::as_f64),
    ) {
        return Some(Extent::point(x, y));
    }
    items
        .iter()
        .filter_map(coordinates_extent)
        .reduce(|a, b| a.union(&b))
}
