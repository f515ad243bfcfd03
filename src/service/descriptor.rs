//! Service metadata resolution
//!
//! Queries an ImageServer endpoint's capability document and auxiliary key
//! properties to learn the native reference system, the maximum exportable
//! pixel dimensions, the declared coverage extent, and (when published) the
//! native ground sample distance.

use log::{info, warn};
use serde::Deserialize;
use serde_json::Value;

use super::http::HttpClient;
use crate::coordinate::{BoundingBox, SpatialRef};
use crate::errors::{ExportError, ExportResult};

/// Fallback maximum export width/height when the service omits them
const DEFAULT_MAX_DIMENSION: u32 = 10_000;

/// Documented fallback ground sample distance, in native units per pixel
///
/// 4-inch imagery in a foot-based deployment: 1/3 foot per pixel. Used
/// when neither the service nor the caller supplies a pixel size.
pub const DEFAULT_PIXEL_SIZE: f64 = 1.0 / 3.0;

/// Candidate keyProperties spellings for pixel size X, tried in order.
/// Publishers are not consistent about these.
const PIXEL_SIZE_X_KEYS: &[&str] =
    &["Pixel Size X", "PixelSizeX", "pixelSizeX", "pixelSizex", "pixelSize"];

/// Candidate keyProperties spellings for pixel size Y, tried in order
const PIXEL_SIZE_Y_KEYS: &[&str] =
    &["Pixel Size Y", "PixelSizeY", "pixelSizeY", "pixelSizey"];

/// Resolved description of an image service
///
/// Immutable once fetched; resolved exactly once per export operation.
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    /// Service base URL, without a trailing slash
    pub url: String,
    /// Native reference system wkid
    pub wkid: u32,
    /// Maximum exportable width in pixels
    pub max_width: u32,
    /// Maximum exportable height in pixels
    pub max_height: u32,
    /// Native pixel size X in service units, when published
    pub pixel_size_x: Option<f64>,
    /// Native pixel size Y in service units, when published
    pub pixel_size_y: Option<f64>,
    /// Name of the native linear unit
    pub unit_name: String,
    /// Declared coverage extent in native coordinates
    pub extent: Option<BoundingBox>,
}

#[derive(Deserialize)]
struct ServiceInfo {
    #[serde(rename = "spatialReference")]
    spatial_reference: Option<SpatialReferenceInfo>,
    #[serde(rename = "maxImageWidth")]
    max_image_width: Option<u32>,
    #[serde(rename = "maxImageHeight")]
    max_image_height: Option<u32>,
    extent: Option<ExtentInfo>,
}

#[derive(Deserialize)]
struct SpatialReferenceInfo {
    #[serde(rename = "latestWkid")]
    latest_wkid: Option<u32>,
    wkid: Option<u32>,
}

#[derive(Deserialize)]
struct ExtentInfo {
    xmin: f64,
    ymin: f64,
    xmax: f64,
    ymax: f64,
}

impl ServiceDescriptor {
    /// Resolve a service endpoint's metadata
    ///
    /// Fails with a configuration error when no reference system can be
    /// resolved; everything else falls back to documented defaults.
    pub fn resolve(client: &dyn HttpClient, service_url: &str) -> ExportResult<Self> {
        let url = service_url.trim_end_matches('/').to_string();

        let body = client.get(&format!("{}?f=pjson", url))?;
        let info: ServiceInfo = serde_json::from_slice(&body)
            .map_err(|e| ExportError::Configuration(format!(
                "Unparseable service metadata: {}", e)))?;

        let wkid = info.spatial_reference
            .and_then(|sr| sr.latest_wkid.or(sr.wkid))
            .ok_or_else(|| ExportError::Configuration(
                "Service metadata has no resolvable spatial reference".to_string()))?;

        let max_width = info.max_image_width.unwrap_or(DEFAULT_MAX_DIMENSION);
        let max_height = info.max_image_height.unwrap_or(DEFAULT_MAX_DIMENSION);

        let extent = info.extent.map(|e| BoundingBox::new(e.xmin, e.ymin, e.xmax, e.ymax, wkid));

        // The keyProperties document is optional and frequently absent;
        // a failed fetch just means no published pixel size.
        let properties = match client.get(&format!("{}/keyProperties?f=pjson", url)) {
            Ok(body) => serde_json::from_slice::<Value>(&body).unwrap_or(Value::Null),
            Err(e) => {
                warn!("Could not fetch keyProperties: {}", e);
                Value::Null
            }
        };

        let pixel_size_x = lookup_pixel_size(&properties, PIXEL_SIZE_X_KEYS);
        let pixel_size_y = lookup_pixel_size(&properties, PIXEL_SIZE_Y_KEYS);

        let unit_name = SpatialRef::from_wkid(wkid)
            .map(|crs| crs.unit_name().to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        info!("Service wkid {}, units {}, max export {}x{} px",
              wkid, unit_name, max_width, max_height);

        Ok(ServiceDescriptor {
            url,
            wkid,
            max_width,
            max_height,
            pixel_size_x,
            pixel_size_y,
            unit_name,
            extent,
        })
    }
}

/// Capability lookup for a published pixel size
///
/// Probes the candidate key spellings in order and returns the first value
/// that parses as a positive number. Values arrive as JSON numbers or as
/// numeric strings depending on the publisher.
fn lookup_pixel_size(properties: &Value, candidates: &[&str]) -> Option<f64> {
    let map = properties.as_object()?;
    for key in candidates {
        let Some(value) = map.get(*key) else { continue };
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        if let Some(size) = parsed {
            if size > 0.0 {
                return Some(size);
            }
        }
    }
    None
}
