use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use crate::{
    error::{PipelineError, Result},
    model::{TransformedRecord, WeatherReading, kelvin_to_celsius, local_time},
};

/// Flatten an OpenWeather payload into a [`TransformedRecord`].
///
/// Every field is required. The first missing key aborts the transform.
pub fn transform(reading: &WeatherReading) -> Result<TransformedRecord> {
    let payload = reading.payload();
    let timezone = int_field(payload, "timezone")?;

    Ok(TransformedRecord {
        city: str_field(payload, "name")?,
        description: str_field(payload, "weather.0.description")?,
        temperature_c: kelvin_to_celsius(float_field(payload, "main.temp")?),
        feels_like_c: kelvin_to_celsius(float_field(payload, "main.feels_like")?),
        min_temp_c: kelvin_to_celsius(float_field(payload, "main.temp_min")?),
        max_temp_c: kelvin_to_celsius(float_field(payload, "main.temp_max")?),
        pressure: int_field(payload, "main.pressure")?,
        humidity: int_field(payload, "main.humidity")?,
        wind_speed: float_field(payload, "wind.speed")?,
        time_of_record: time_field(payload, "dt", timezone)?,
        sunrise: time_field(payload, "sys.sunrise", timezone)?,
        sunset: time_field(payload, "sys.sunset", timezone)?,
    })
}

/// File name (without extension) for a run captured at `captured_at`.
pub fn output_file_stem(city: &str, captured_at: DateTime<Utc>) -> String {
    let slug = city
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");

    format!("current_weather_data_{}_{}", slug, captured_at.format("%d%m%Y%H%M%S"))
}

/// Encode a single record as CSV with a header row.
pub fn to_csv(record: &TransformedRecord) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.serialize(record)?;
    writer.into_inner().map_err(|e| PipelineError::Csv(e.to_string()))
}

fn lookup<'a>(payload: &'a Value, field: &str) -> Result<&'a Value> {
    let pointer = format!("/{}", field.replace('.', "/"));
    payload
        .pointer(&pointer)
        .filter(|v| !v.is_null())
        .ok_or_else(|| PipelineError::MissingField { field: field.to_string() })
}

fn invalid(field: &str, expected: &'static str) -> PipelineError {
    PipelineError::InvalidField { field: field.to_string(), expected }
}

fn str_field(payload: &Value, field: &str) -> Result<String> {
    lookup(payload, field)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| invalid(field, "a string"))
}

fn float_field(payload: &Value, field: &str) -> Result<f64> {
    lookup(payload, field)?.as_f64().ok_or_else(|| invalid(field, "a number"))
}

fn int_field(payload: &Value, field: &str) -> Result<i64> {
    lookup(payload, field)?.as_i64().ok_or_else(|| invalid(field, "an integer"))
}

fn time_field(payload: &Value, field: &str, offset: i64) -> Result<NaiveDateTime> {
    let ts = int_field(payload, field)?;
    local_time(ts, offset).ok_or_else(|| invalid(field, "a unix timestamp in range"))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    pub(crate) fn jakarta_payload() -> Value {
        json!({
            "coord": { "lon": 106.8451, "lat": -6.2146 },
            "weather": [
                { "id": 721, "main": "Haze", "description": "haze", "icon": "50d" }
            ],
            "base": "stations",
            "main": {
                "temp": 307.27,
                "feels_like": 312.16,
                "temp_min": 306.05,
                "temp_max": 308.44,
                "pressure": 1011,
                "humidity": 51,
                "sea_level": 1011,
                "grnd_level": 1009
            },
            "visibility": 5000,
            "wind": { "speed": 1.54, "deg": 120 },
            "clouds": { "all": 20 },
            "dt": 1730430534,
            "sys": {
                "type": 2,
                "id": 2073276,
                "country": "ID",
                "sunrise": 1730413575,
                "sunset": 1730457962
            },
            "timezone": 25200,
            "id": 1642911,
            "name": "Jakarta",
            "cod": 200
        })
    }

    fn remove(payload: &mut Value, parent: &str, key: &str) {
        let target = if parent.is_empty() { payload } else { payload.pointer_mut(parent).unwrap() };
        target.as_object_mut().unwrap().remove(key);
    }

    fn fmt(t: NaiveDateTime) -> String {
        t.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    #[test]
    fn transforms_documented_example() {
        let record = transform(&WeatherReading::new(jakarta_payload())).unwrap();

        assert_eq!(record.city, "Jakarta");
        assert_eq!(record.description, "haze");
        assert!((record.temperature_c - 34.27).abs() < 1e-9);
        assert_eq!(record.temperature_c, 307.27 - 273.0);
        assert_eq!(record.feels_like_c, 312.16 - 273.0);
        assert_eq!(record.min_temp_c, 306.05 - 273.0);
        assert_eq!(record.max_temp_c, 308.44 - 273.0);
        assert_eq!(record.pressure, 1011);
        assert_eq!(record.humidity, 51);
        assert_eq!(record.wind_speed, 1.54);
        assert_eq!(fmt(record.time_of_record), "2024-11-01 10:08:54");
        assert_eq!(fmt(record.sunrise), "2024-11-01 05:26:15");
        assert_eq!(fmt(record.sunset), "2024-11-01 17:46:02");
    }

    #[test]
    fn missing_wind_speed_is_reported_by_path() {
        let mut payload = jakarta_payload();
        remove(&mut payload, "/wind", "speed");

        let err = transform(&WeatherReading::new(payload)).unwrap_err();
        match err {
            PipelineError::MissingField { field } => assert_eq!(field, "wind.speed"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_nested_and_top_level_fields_fail() {
        for (parent, key, field) in [
            ("", "timezone", "timezone"),
            ("", "name", "name"),
            ("/sys", "sunset", "sys.sunset"),
            ("/main", "humidity", "main.humidity"),
        ] {
            let mut payload = jakarta_payload();
            remove(&mut payload, parent, key);

            let err = transform(&WeatherReading::new(payload)).unwrap_err();
            assert!(
                matches!(&err, PipelineError::MissingField { field: f } if f == field),
                "expected missing {field}, got {err:?}"
            );
        }
    }

    #[test]
    fn empty_weather_list_is_missing_description() {
        let mut payload = jakarta_payload();
        payload["weather"] = json!([]);

        let err = transform(&WeatherReading::new(payload)).unwrap_err();
        assert!(matches!(err, PipelineError::MissingField { field } if field == "weather.0.description"));
    }

    #[test]
    fn wrong_type_is_an_invalid_field() {
        let mut payload = jakarta_payload();
        payload["main"]["temp"] = json!("hot");

        let err = transform(&WeatherReading::new(payload)).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidField { field, .. } if field == "main.temp"));
    }

    #[test]
    fn null_counts_as_missing() {
        let mut payload = jakarta_payload();
        payload["wind"]["speed"] = Value::Null;

        let err = transform(&WeatherReading::new(payload)).unwrap_err();
        assert!(matches!(err, PipelineError::MissingField { .. }));
    }

    #[test]
    fn file_stem_uses_utc_capture_time() {
        let captured = Utc.with_ymd_and_hms(2024, 11, 1, 3, 4, 5).unwrap();
        assert_eq!(
            output_file_stem("Jakarta", captured),
            "current_weather_data_jakarta_01112024030405"
        );
        assert_eq!(
            output_file_stem("  New   York ", captured),
            "current_weather_data_new_york_01112024030405"
        );
    }

    #[test]
    fn csv_has_header_and_single_row() {
        let record = transform(&WeatherReading::new(jakarta_payload())).unwrap();
        let bytes = to_csv(&record).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "City,Description,Temperature (C),Feels Like (C),Min Temp,Max Temp,\
             Pressure,Humidity,Wind Speed,Time of Record,Surise (Local Time),Sunset (Local Time)"
        );
        assert!(lines[1].starts_with("Jakarta,haze,"));
        assert!(lines[1].contains(",1011,51,1.54,2024-11-01 10:08:54,"));
        assert!(lines[1].ends_with("2024-11-01 05:26:15,2024-11-01 17:46:02"));
    }

    #[test]
    fn csv_roundtrip_preserves_all_fields() {
        let record = transform(&WeatherReading::new(jakarta_payload())).unwrap();
        let bytes = to_csv(&record).unwrap();

        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        assert_eq!(reader.headers().unwrap().len(), 12);

        let rows: Vec<TransformedRecord> =
            reader.deserialize().collect::<std::result::Result<_, _>>().unwrap();
        assert_eq!(rows, vec![record]);
    }
}
