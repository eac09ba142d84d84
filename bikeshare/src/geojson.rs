//! GeoJSON rendering of query results.
//!
//! Enable the `geojson` feature to use this module.
//!
//! # Example
//!
//! ```ignore
//! use bikeshare::geojson::to_feature_collection;
//!
//! let docks = service.find_nearest_dock_spaces(37.7955, -122.3937, 3)?;
//! let collection = to_feature_collection(&docks);
//! println!("{}", geojson::GeoJson::from(collection));
//! ```

use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value as GeoJsonValue};

use crate::service::NearestResult;

/// Render results as a FeatureCollection of Points, nearest first.
///
/// Each feature's id is the station or bike id; every other result field
/// except the coordinates becomes a property.
pub fn to_feature_collection(results: &[NearestResult]) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: results.iter().map(to_feature).collect(),
        foreign_members: None,
    }
}

/// Render one result as a Point feature at `[lon, lat]`.
pub fn to_feature(result: &NearestResult) -> Feature {
    let mut properties = match serde_json::to_value(result) {
        Ok(serde_json::Value::Object(map)) => map,
        _ => JsonObject::new(),
    };
    properties.remove("latitude");
    properties.remove("longitude");

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(GeoJsonValue::Point(vec![
            result.longitude,
            result.latitude,
        ]))),
        id: Some(Id::String(result.id.clone())),
        properties: Some(properties),
        foreign_members: None,
    }
}
