//! Wire payload templates
//!
//! Every record is sent as a single `create` operation:
//!
//! ```json
//! {"operations":[{"operationType":"create",
//!   "record":{"recordType":"<tag>","fields":{"<name>":{"value":<v>}}}}]}
//! ```
//!
//! Coordinates are nested under a single `location` field.

use serde_json::{Map, Value, json};

use crate::app::models::{CityRecord, GazetteerCity, MinimalCity, SubmissionPayload};
use crate::constants::OPERATION_CREATE;
use crate::{Error, Result};

/// Render a record into its serialized request body
pub fn render(record: &CityRecord) -> Result<SubmissionPayload> {
    let record_type = record.schema().record_type();
    let fields = match record {
        CityRecord::Minimal(city) => minimal_fields(city),
        CityRecord::Gazetteer(city) => gazetteer_fields(city),
    };

    let document = json!({
        "operations": [
            {
                "operationType": OPERATION_CREATE,
                "record": {
                    "recordType": record_type,
                    "fields": fields,
                }
            }
        ]
    });

    let body = serde_json::to_string(&document).map_err(|e| {
        Error::payload_render(
            format!("Failed to serialize {} record '{}'", record_type, record.name()),
            Some(e),
        )
    })?;

    Ok(SubmissionPayload::new(record_type, body))
}

fn minimal_fields(city: &MinimalCity) -> Map<String, Value> {
    let mut fields = Map::new();
    put(&mut fields, "country_code", json!(city.country_code));
    put(&mut fields, "accent_city", json!(city.accent_city));
    put(&mut fields, "name", json!(city.city));
    put(&mut fields, "region", json!(city.region));
    put(&mut fields, "location", location(city.latitude, city.longitude));
    put(&mut fields, "population", json!(city.population));
    fields
}

fn gazetteer_fields(city: &GazetteerCity) -> Map<String, Value> {
    let mut fields = Map::new();
    put(&mut fields, "geonameid", json!(city.geoname_id));
    put(&mut fields, "name", json!(city.name));
    put(&mut fields, "asciiname", json!(city.ascii_name));
    put(&mut fields, "alternatenames", json!(city.alternate_names));
    put(&mut fields, "location", location(city.latitude, city.longitude));
    put(&mut fields, "feature_class", json!(city.feature_class));
    put(&mut fields, "feature_code", json!(city.feature_code));
    put(&mut fields, "country_code", json!(city.country_code));
    put(&mut fields, "cc2", json!(city.cc2));
    put(&mut fields, "admin1_code", json!(city.admin1_code));
    put(&mut fields, "admin2_code", json!(city.admin2_code));
    put(&mut fields, "admin3_code", json!(city.admin3_code));
    put(&mut fields, "admin4_code", json!(city.admin4_code));
    put(&mut fields, "population", json!(city.population));
    put(&mut fields, "elevation", json!(city.elevation));
    put(&mut fields, "dem", json!(city.dem));
    put(&mut fields, "timezone", json!(city.timezone));
    fields
}

fn location(latitude: f64, longitude: f64) -> Value {
    json!({ "latitude": latitude, "longitude": longitude })
}

fn put(fields: &mut Map<String, Value>, name: &str, value: Value) {
    fields.insert(name.to_string(), json!({ "value": value }));
}
