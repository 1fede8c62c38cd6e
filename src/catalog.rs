use serde_json::Value;
use std::fmt;
use tracing::warn;

/// Index of the archive link inside `_links.download`.
pub(crate) const DOWNLOAD_LINK_INDEX: usize = 1;

#[derive(Debug, serde::Deserialize)]
pub(crate) struct FeatureCollection {
    // Kept untyped so one odd feature cannot fail the whole listing.
    pub(crate) features: Vec<Value>,
}

#[derive(Debug, Default, serde::Deserialize)]
pub(crate) struct Feature {
    #[serde(default)]
    pub(crate) properties: Option<Properties>,
    #[serde(default)]
    pub(crate) geometry: Option<Value>,
    #[serde(default, rename = "_links")]
    pub(crate) links: Option<Links>,
}

#[derive(Debug, Default, serde::Deserialize)]
pub(crate) struct Properties {
    #[serde(default)]
    pub(crate) id: Option<String>,
    #[serde(default, rename = "acquisitionDate")]
    pub(crate) acquisition_date: Option<String>,
    #[serde(default, rename = "processingLevel")]
    pub(crate) processing_level: Option<String>,
    #[serde(default, rename = "productType")]
    pub(crate) product_type: Option<String>,
}

#[derive(Debug, Default, serde::Deserialize)]
pub(crate) struct Links {
    #[serde(default)]
    pub(crate) download: Option<Vec<Link>>,
}

#[derive(Debug, Default, serde::Deserialize)]
pub(crate) struct Link {
    #[serde(default)]
    pub(crate) href: Option<String>,
    #[serde(default, rename = "resourceId")]
    pub(crate) resource_id: Option<String>,
}

impl Feature {
    pub(crate) fn download_link(&self) -> Option<&Link> {
        self.links
            .as_ref()
            .and_then(|l| l.download.as_ref())
            .and_then(|d| d.get(DOWNLOAD_LINK_INDEX))
    }
}

/// One line of the product selection list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSummary {
    pub acquisition_date: String,
    pub processing_level: String,
    pub product_type: String,
    pub resource_id: String,
    pub product_id: String,
}

impl fmt::Display for ProductSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}, ID={}",
            self.acquisition_date,
            self.processing_level,
            self.product_type,
            self.resource_id,
            self.product_id
        )
    }
}

/// Where and under which name a product archive is fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDownloadInfo {
    pub href: String,
    /// Vendor filename of the archive, used verbatim on disk.
    pub resource_id: String,
}

/// Validates one raw search feature.
///
/// Returns `None` (and logs why) for features missing any field needed for the summary line.
pub fn summarize(raw: &Value) -> Option<ProductSummary> {
    let feature = match serde_json::from_value::<Feature>(raw.clone()) {
        Ok(f) => f,
        Err(e) => {
            warn!("skipping catalog feature that does not deserialize: {}", e);
            return None;
        }
    };

    let Some(props) = feature.properties.as_ref() else {
        warn!("skipping catalog feature without properties");
        return None;
    };
    let id = props.id.as_deref().unwrap_or("<unknown>");

    let missing = |field: &str| {
        warn!(
            product_id = id,
            "skipping catalog feature missing {}. Has the OneAtlas search response changed?",
            field
        );
    };

    let Some(product_id) = props.id.clone() else {
        missing("properties.id");
        return None;
    };
    let Some(acquisition_date) = props.acquisition_date.clone() else {
        missing("properties.acquisitionDate");
        return None;
    };
    let Some(processing_level) = props.processing_level.clone() else {
        missing("properties.processingLevel");
        return None;
    };
    let Some(product_type) = props.product_type.clone() else {
        missing("properties.productType");
        return None;
    };
    let Some(resource_id) = feature.download_link().and_then(|l| l.resource_id.clone()) else {
        missing("_links.download[1].resourceId");
        return None;
    };

    Some(ProductSummary {
        acquisition_date,
        processing_level,
        product_type,
        resource_id,
        product_id,
    })
}

/// Extracts the product id from a summary line (`..., ID=<id>`); a bare id is returned as is.
pub fn parse_product_id(selection: &str) -> &str {
    match selection.rsplit_once("ID=") {
        Some((_, id)) => id.trim(),
        None => selection.trim(),
    }
}

/// Extracts the acquisition date, the first field of a summary line.
pub fn parse_acquisition_date(selection: &str) -> &str {
    selection.split(',').next().unwrap_or("").trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feature(id: &str, resource: &str) -> Value {
        json!({
            "type": "Feature",
            "properties": {
                "id": id,
                "acquisitionDate": "2021-05-01T10:00:00Z",
                "processingLevel": "SENSOR",
                "productType": "bundle"
            },
            "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]},
            "_links": {"download": [
                {"href": "https://x/quicklook"},
                {"href": format!("https://x/{}", resource), "resourceId": resource}
            ]}
        })
    }

    #[test]
    fn summary_line_format() {
        let s = summarize(&feature("P1", "R1.zip")).unwrap();
        assert_eq!(
            s.to_string(),
            "2021-05-01T10:00:00Z, SENSOR, bundle, R1.zip, ID=P1"
        );
    }

    #[test]
    fn features_missing_required_fields_are_rejected() {
        let mut no_level = feature("P1", "R1");
        no_level["properties"]
            .as_object_mut()
            .unwrap()
            .remove("processingLevel");
        assert!(summarize(&no_level).is_none());

        let mut one_link = feature("P2", "R2");
        one_link["_links"]["download"] = json!([{"href": "https://x/only"}]);
        assert!(summarize(&one_link).is_none());

        let mut no_resource = feature("P3", "R3");
        no_resource["_links"]["download"][1]
            .as_object_mut()
            .unwrap()
            .remove("resourceId");
        assert!(summarize(&no_resource).is_none());

        assert!(summarize(&json!({"type": "Feature"})).is_none());
        assert!(summarize(&json!("not a feature")).is_none());
    }

    #[test]
    fn each_summary_property_is_required() {
        for field in ["id", "acquisitionDate", "processingLevel", "productType"] {
            let mut f = feature("P1", "R1");
            f["properties"].as_object_mut().unwrap().remove(field);
            assert!(summarize(&f).is_none(), "accepted feature without {}", field);
        }
    }

    #[test]
    fn wrongly_typed_field_is_rejected_not_fatal() {
        let mut f = feature("P1", "R1");
        f["properties"]["productType"] = json!(42);
        assert!(summarize(&f).is_none());
    }

    #[test]
    fn product_id_from_selection() {
        assert_eq!(
            parse_product_id("2021-05-01, SENSOR, bundle, R1.zip, ID=abc-123"),
            "abc-123"
        );
        assert_eq!(parse_product_id("abc-123"), "abc-123");
        assert_eq!(
            parse_acquisition_date("2021-05-01, SENSOR, bundle, R1.zip, ID=abc"),
            "2021-05-01"
        );
    }
}
