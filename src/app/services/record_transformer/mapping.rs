//! Positional column mapping
//!
//! Column indices for both layouts. Rows shorter than the layout are rejected
//! by the decoder, so every index below is present by the time a row gets here;
//! [`RawRow::field`] still falls back to an empty string.

use super::coercion::{coerce_f64, coerce_i64};
use crate::app::models::{CityRecord, GazetteerCity, MinimalCity, RawRow, SchemaKind};

/// Minimal layout column indices
pub mod minimal {
    pub const COUNTRY_CODE: usize = 0;
    pub const CITY: usize = 1;
    pub const ACCENT_CITY: usize = 2;
    pub const REGION: usize = 3;
    pub const POPULATION: usize = 4;
    pub const LATITUDE: usize = 5;
    pub const LONGITUDE: usize = 6;
}

/// Gazetteer layout column indices
pub mod gazetteer {
    pub const GEONAME_ID: usize = 0;
    pub const NAME: usize = 1;
    pub const ASCII_NAME: usize = 2;
    pub const ALTERNATE_NAMES: usize = 3;
    pub const LATITUDE: usize = 4;
    pub const LONGITUDE: usize = 5;
    pub const FEATURE_CLASS: usize = 6;
    pub const FEATURE_CODE: usize = 7;
    pub const COUNTRY_CODE: usize = 8;
    pub const CC2: usize = 9;
    pub const ADMIN1_CODE: usize = 10;
    pub const ADMIN2_CODE: usize = 11;
    pub const ADMIN3_CODE: usize = 12;
    pub const ADMIN4_CODE: usize = 13;
    pub const POPULATION: usize = 14;
    pub const ELEVATION: usize = 15;
    pub const DEM: usize = 16;
    pub const TIMEZONE: usize = 17;
}

/// Map a decoded row onto the typed record for `schema`
pub fn transform(schema: SchemaKind, row: &RawRow) -> CityRecord {
    match schema {
        SchemaKind::Minimal => CityRecord::Minimal(minimal_city(row)),
        SchemaKind::Gazetteer => CityRecord::Gazetteer(gazetteer_city(row)),
    }
}

fn minimal_city(row: &RawRow) -> MinimalCity {
    MinimalCity {
        country_code: row.field(minimal::COUNTRY_CODE).to_string(),
        city: row.field(minimal::CITY).to_string(),
        accent_city: row.field(minimal::ACCENT_CITY).to_string(),
        region: row.field(minimal::REGION).to_string(),
        population: coerce_i64(row.field(minimal::POPULATION), "population"),
        latitude: coerce_f64(row.field(minimal::LATITUDE), "latitude"),
        longitude: coerce_f64(row.field(minimal::LONGITUDE), "longitude"),
    }
}

fn gazetteer_city(row: &RawRow) -> GazetteerCity {
    let text = |index: usize| row.field(index).to_string();

    GazetteerCity {
        geoname_id: text(gazetteer::GEONAME_ID),
        name: text(gazetteer::NAME),
        ascii_name: text(gazetteer::ASCII_NAME),
        alternate_names: text(gazetteer::ALTERNATE_NAMES),
        latitude: coerce_f64(row.field(gazetteer::LATITUDE), "latitude"),
        longitude: coerce_f64(row.field(gazetteer::LONGITUDE), "longitude"),
        feature_class: text(gazetteer::FEATURE_CLASS),
        feature_code: text(gazetteer::FEATURE_CODE),
        country_code: text(gazetteer::COUNTRY_CODE),
        cc2: text(gazetteer::CC2),
        admin1_code: text(gazetteer::ADMIN1_CODE),
        admin2_code: text(gazetteer::ADMIN2_CODE),
        admin3_code: text(gazetteer::ADMIN3_CODE),
        admin4_code: text(gazetteer::ADMIN4_CODE),
        population: coerce_i64(row.field(gazetteer::POPULATION), "population"),
        elevation: coerce_i64(row.field(gazetteer::ELEVATION), "elevation"),
        dem: text(gazetteer::DEM),
        timezone: text(gazetteer::TIMEZONE),
    }
}
