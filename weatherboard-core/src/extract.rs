//! Maps a raw One Call response onto a [`WeatherRecord`].

use serde_json::Value;
use thiserror::Error;

use crate::model::{RawWeatherResponse, WeatherRecord};

#[derive(Debug, Error, PartialEq)]
pub enum ExtractionError {
    #[error("required field `{field}` is missing from the weather response")]
    Missing { field: String },

    #[error("field `{field}` has the wrong type (expected {expected})")]
    WrongType {
        field: String,
        expected: &'static str,
    },

    #[error("field `{field}` is out of range: {value}")]
    OutOfRange { field: String, value: f64 },
}

/// Builds a [`WeatherRecord`] from the raw response, or names the first field
/// that could not be read.
pub fn extract(raw: &RawWeatherResponse) -> Result<WeatherRecord, ExtractionError> {
    let temperature_current = number(raw, "/current/temp")?;
    let feels_like = number(raw, "/current/feels_like")?;
    let humidity_percent = within(raw, "/current/humidity", 0.0, 100.0)?;
    let wind_speed = within(raw, "/current/wind_speed", 0.0, f64::INFINITY)?;
    let description = text(raw, "/current/weather/0/description")?;
    let condition_icon_code = text(raw, "/current/weather/0/icon")?.to_owned();

    let temperature_max = number(raw, "/daily/0/temp/max")?;
    let temperature_min = number(raw, "/daily/0/temp/min")?;
    let pop = within(raw, "/daily/0/pop", 0.0, 1.0)?;

    let events = alert_events(raw)?;

    Ok(WeatherRecord {
        temperature_current,
        feels_like,
        temperature_max,
        temperature_min,
        humidity_percent,
        wind_speed,
        condition_description: title_case(description),
        condition_icon_code,
        precipitation_probability_percent: pop * 100.0,
        alert_count: events.len(),
        alert_summary: events.join(", "),
    })
}

fn alert_events(raw: &RawWeatherResponse) -> Result<Vec<&str>, ExtractionError> {
    let alerts = match raw.get("alerts") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(alerts)) => alerts,
        Some(_) => {
            return Err(ExtractionError::WrongType {
                field: "alerts".into(),
                expected: "array",
            });
        }
    };

    alerts
        .iter()
        .enumerate()
        .map(|(i, alert)| {
            let field = format!("alerts[{i}].event");
            match alert.get("event") {
                None | Some(Value::Null) => Err(ExtractionError::Missing { field }),
                Some(Value::String(event)) => Ok(event.as_str()),
                Some(_) => Err(ExtractionError::WrongType {
                    field,
                    expected: "string",
                }),
            }
        })
        .collect()
}

fn lookup<'a>(raw: &'a Value, pointer: &str) -> Result<&'a Value, ExtractionError> {
    match raw.pointer(pointer) {
        None | Some(Value::Null) => Err(ExtractionError::Missing {
            field: field_name(pointer),
        }),
        Some(value) => Ok(value),
    }
}

fn number(raw: &Value, pointer: &str) -> Result<f64, ExtractionError> {
    lookup(raw, pointer)?
        .as_f64()
        .ok_or_else(|| ExtractionError::WrongType {
            field: field_name(pointer),
            expected: "number",
        })
}

fn within(raw: &Value, pointer: &str, min: f64, max: f64) -> Result<f64, ExtractionError> {
    let value = number(raw, pointer)?;
    if value < min || value > max {
        return Err(ExtractionError::OutOfRange {
            field: field_name(pointer),
            value,
        });
    }
    Ok(value)
}

fn text<'a>(raw: &'a Value, pointer: &str) -> Result<&'a str, ExtractionError> {
    lookup(raw, pointer)?
        .as_str()
        .ok_or_else(|| ExtractionError::WrongType {
            field: field_name(pointer),
            expected: "string",
        })
}

/// `/current/weather/0/icon` -> `current.weather[0].icon`
fn field_name(pointer: &str) -> String {
    let mut name = String::new();
    for segment in pointer.split('/').filter(|s| !s.is_empty()) {
        if segment.chars().all(|c| c.is_ascii_digit()) {
            name.push('[');
            name.push_str(segment);
            name.push(']');
        } else {
            if !name.is_empty() {
                name.push('.');
            }
            name.push_str(segment);
        }
    }
    name
}

/// Upper-cases the first letter of every word and lower-cases the rest,
/// where a word is any run of alphabetic characters.
pub fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut at_word_start = true;
    for c in input.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}
