use crate::domain::weather::{ObservationSource, WeatherObservation};
use anyhow::Result;
use serde_json::Value;

pub const DEFAULT_TEMP: f64 = -10.0;
pub const DEFAULT_FEELS_LIKE: f64 = -15.0;
pub const DEFAULT_TEMP_MAX: f64 = -5.0;
pub const DEFAULT_TEMP_MIN: f64 = -15.0;
pub const DEFAULT_HUMIDITY: f64 = 30.0;
pub const DEFAULT_WIND_SPEED: f64 = 15.0;
pub const DEFAULT_WIND_DIR: f64 = 0.0;
pub const DEFAULT_SNOW: f64 = 0.0;
// Applied only when the field is absent; a reported depth of 0 is kept as 0.
pub const DEFAULT_SNOW_DEPTH: f64 = 25.0;
pub const DEFAULT_VISIBILITY: f64 = 20.0;
pub const DEFAULT_UV_INDEX: f64 = 3.0;
pub const DEFAULT_CONDITIONS: &str = "Clear";
pub const DEFAULT_ICON: &str = "clear-day";
pub const DEFAULT_SUNRISE: &str = "07:30";
pub const DEFAULT_SUNSET: &str = "17:15";

/// Provider reading with every field optional. Nothing reaches the classifier
/// until [`UpstreamReading::into_observation`] has filled the gaps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpstreamReading {
    pub location: Option<String>,
    pub resolved_address: Option<String>,
    pub temp: Option<f64>,
    pub feels_like: Option<f64>,
    pub temp_max: Option<f64>,
    pub temp_min: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_dir: Option<f64>,
    pub snow: Option<f64>,
    pub snow_depth: Option<f64>,
    pub visibility: Option<f64>,
    pub uv_index: Option<f64>,
    pub conditions: Option<String>,
    pub icon: Option<String>,
    pub sunrise: Option<String>,
    pub sunset: Option<String>,
}

impl UpstreamReading {
    /// `location` wins over whatever name the provider echoed back; `fallback_address`
    /// is used when the provider did not resolve one.
    pub fn into_observation(self, location: &str, fallback_address: &str) -> WeatherObservation {
        WeatherObservation {
            location: location.to_string(),
            resolved_address: self
                .resolved_address
                .unwrap_or_else(|| fallback_address.to_string()),
            temp: self.temp.unwrap_or(DEFAULT_TEMP),
            feels_like: self.feels_like.unwrap_or(DEFAULT_FEELS_LIKE),
            temp_max: self.temp_max.unwrap_or(DEFAULT_TEMP_MAX),
            temp_min: self.temp_min.unwrap_or(DEFAULT_TEMP_MIN),
            humidity: self.humidity.unwrap_or(DEFAULT_HUMIDITY),
            wind_speed: self.wind_speed.unwrap_or(DEFAULT_WIND_SPEED),
            wind_dir: self.wind_dir.unwrap_or(DEFAULT_WIND_DIR),
            snow: self.snow.unwrap_or(DEFAULT_SNOW),
            snow_depth: self.snow_depth.unwrap_or(DEFAULT_SNOW_DEPTH),
            visibility: self.visibility.unwrap_or(DEFAULT_VISIBILITY),
            uv_index: self.uv_index.unwrap_or(DEFAULT_UV_INDEX),
            conditions: self
                .conditions
                .unwrap_or_else(|| DEFAULT_CONDITIONS.to_string()),
            icon: self.icon.unwrap_or_else(|| DEFAULT_ICON.to_string()),
            sunrise: self.sunrise.unwrap_or_else(|| DEFAULT_SUNRISE.to_string()),
            sunset: self.sunset.unwrap_or_else(|| DEFAULT_SUNSET.to_string()),
            source: ObservationSource::Live,
        }
    }
}

/// Reduces a timeline payload to the reading for `hour` of the first day, taking
/// day-level values for anything the hour lacks.
pub fn reading_from_timeline(payload: &Value, hour: u32) -> Result<UpstreamReading> {
    let today = payload
        .get("days")
        .and_then(|d| d.get(0))
        .filter(|d| d.is_object());
    let Some(today) = today else {
        anyhow::bail!("weather payload has no days[0]");
    };

    let current = today
        .get("hours")
        .and_then(Value::as_array)
        .and_then(|hours| {
            hours
                .iter()
                .find(|h| {
                    h.get("datetime")
                        .and_then(Value::as_str)
                        .and_then(leading_hour)
                        == Some(hour)
                })
        })
        .unwrap_or(today);

    let num_field = |key: &str| finite(current.get(key)).or_else(|| finite(today.get(key)));
    let str_field = |key: &str| text(current.get(key)).or_else(|| text(today.get(key)));

    Ok(UpstreamReading {
        location: text_of(payload, "address"),
        resolved_address: text_of(payload, "resolvedAddress"),
        temp: num_field("temp"),
        feels_like: num_field("feelslike"),
        temp_max: finite(today.get("tempmax")),
        temp_min: finite(today.get("tempmin")),
        humidity: num_field("humidity"),
        wind_speed: num_field("windspeed"),
        wind_dir: num_field("winddir"),
        snow: num_field("snow"),
        snow_depth: num_field("snowdepth"),
        visibility: num_field("visibility"),
        uv_index: num_field("uvindex"),
        conditions: str_field("conditions"),
        icon: str_field("icon"),
        sunrise: text_of(today, "sunrise"),
        sunset: text_of(today, "sunset"),
    })
}

fn finite(v: Option<&Value>) -> Option<f64> {
    v.and_then(Value::as_f64).filter(|n| n.is_finite())
}

fn text(v: Option<&Value>) -> Option<String> {
    v.and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn text_of(v: &Value, key: &str) -> Option<String> {
    text(v.get(key))
}

/// "08:00:00" -> 8.
fn leading_hour(datetime: &str) -> Option<u32> {
    let digits: String = datetime.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}
