use serde::{Deserialize, Serialize};

/// Where an observation came from. Synthetic readings are substituted when the
/// provider is unreachable and are otherwise treated like live ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationSource {
    Live,
    Synthetic,
}

/// One normalized weather reading for a resort. Units are metric: °C, km/h,
/// degrees, mm of snowfall, cm of snow depth and km of visibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub location: String,
    pub resolved_address: String,
    pub temp: f64,
    pub feels_like: f64,
    pub temp_max: f64,
    pub temp_min: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub wind_dir: f64,
    pub snow: f64,
    pub snow_depth: f64,
    pub visibility: f64,
    pub uv_index: f64,
    pub conditions: String,
    pub icon: String,
    pub sunrise: String,
    pub sunset: String,
    pub source: ObservationSource,
}

impl WeatherObservation {
    pub fn is_synthetic(&self) -> bool {
        self.source == ObservationSource::Synthetic
    }

    pub fn wind_direction_label(&self) -> &'static str {
        wind_direction_label(self.wind_dir)
    }

    pub fn icon_emoji(&self) -> &'static str {
        icon_emoji(&self.icon)
    }
}

const COMPASS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];

/// Maps a bearing in degrees onto one of eight compass points.
pub fn wind_direction_label(degrees: f64) -> &'static str {
    if !degrees.is_finite() {
        return COMPASS[0];
    }
    let index = (degrees / 45.0).round().rem_euclid(8.0) as usize;
    COMPASS[index % COMPASS.len()]
}

pub fn icon_emoji(icon: &str) -> &'static str {
    match icon {
        "clear-day" => "☀️",
        "clear-night" => "🌙",
        "partly-cloudy-day" => "⛅",
        "partly-cloudy-night" | "cloudy" => "☁️",
        "rain" => "🌧️",
        "snow" | "sleet" => "🌨️",
        "wind" => "💨",
        "fog" => "🌫️",
        _ => "🌤️",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compass_labels_wrap_around() {
        assert_eq!(wind_direction_label(0.0), "N");
        assert_eq!(wind_direction_label(44.0), "NE");
        assert_eq!(wind_direction_label(180.0), "S");
        assert_eq!(wind_direction_label(337.6), "N");
        assert_eq!(wind_direction_label(360.0), "N");
        assert_eq!(wind_direction_label(-90.0), "W");
        assert_eq!(wind_direction_label(f64::NAN), "N");
    }

    #[test]
    fn unknown_icons_get_a_neutral_emoji() {
        assert_eq!(icon_emoji("snow"), "🌨️");
        assert_eq!(icon_emoji("hail-storm"), "🌤️");
    }
}
