use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Offset used for the Kelvin to Celsius conversion. Stored files were produced
/// with 273, not 273.15, and new rows must stay comparable with them.
pub const KELVIN_OFFSET: f64 = 273.0;

/// Raw payload of a single `/data/2.5/weather` response.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReading {
    payload: Value,
}

impl WeatherReading {
    pub fn new(payload: Value) -> Self {
        Self { payload }
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }
}

/// One row of the output CSV.
///
/// Column order and header names follow the files already in the bucket,
/// including the `Surise` spelling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformedRecord {
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Temperature (C)")]
    pub temperature_c: f64,
    #[serde(rename = "Feels Like (C)")]
    pub feels_like_c: f64,
    #[serde(rename = "Min Temp")]
    pub min_temp_c: f64,
    #[serde(rename = "Max Temp")]
    pub max_temp_c: f64,
    #[serde(rename = "Pressure")]
    pub pressure: i64,
    #[serde(rename = "Humidity")]
    pub humidity: i64,
    #[serde(rename = "Wind Speed")]
    pub wind_speed: f64,
    #[serde(rename = "Time of Record", with = "csv_datetime")]
    pub time_of_record: NaiveDateTime,
    #[serde(rename = "Surise (Local Time)", with = "csv_datetime")]
    pub sunrise: NaiveDateTime,
    #[serde(rename = "Sunset (Local Time)", with = "csv_datetime")]
    pub sunset: NaiveDateTime,
}

pub fn kelvin_to_celsius(kelvin: f64) -> f64 {
    kelvin - KELVIN_OFFSET
}

/// Shifts a unix timestamp by a UTC offset and returns the wall-clock time
/// at that offset, without attaching a zone.
pub fn local_time(unix_secs: i64, offset_secs: i64) -> Option<NaiveDateTime> {
    let shifted = unix_secs.checked_add(offset_secs)?;
    DateTime::from_timestamp(shifted, 0).map(|dt| dt.naive_utc())
}

pub(crate) mod csv_datetime {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, FORMAT).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kelvin_conversion_uses_273_offset() {
        assert!((kelvin_to_celsius(307.27) - 34.27).abs() < 1e-9);
        assert_eq!(kelvin_to_celsius(273.0), 0.0);
        assert_eq!(kelvin_to_celsius(273.15), 273.15 - 273.0);

        for k in [0.0, 1.5, 250.0, 306.05, 1000.0] {
            assert_eq!(kelvin_to_celsius(k), k - 273.0);
        }
    }

    #[test]
    fn local_time_adds_offset_before_conversion() {
        let t = local_time(1730430534, 25200).expect("valid timestamp");
        assert_eq!(t.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-11-01 10:08:54");

        let direct = DateTime::from_timestamp(1730455734, 0).unwrap().naive_utc();
        assert_eq!(t, direct);
    }

    #[test]
    fn local_time_handles_negative_offsets() {
        let t = local_time(1730430534, -18000).expect("valid timestamp");
        assert_eq!(t.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-10-31 22:08:54");
    }

    #[test]
    fn local_time_rejects_overflow() {
        assert!(local_time(i64::MAX, 1).is_none());
        assert!(local_time(i64::MAX / 2, 0).is_none());
    }
}
