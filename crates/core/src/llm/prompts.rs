use crate::domain::weather::WeatherObservation;
use crate::llm::AnalysisInput;

/// Heading of the score section in a coaching report.
pub const SCORE_HEADING: &str = "### 📊 Score";

pub fn coach_system_prompt() -> String {
    [
        "You are \"SkiPro AI\", a top professional ski and snowboard coach.",
        "Keep replies extremely short and direct, suitable for quick reading on a phone.",
        "",
        "Format rules:",
        "1. Use standard Markdown headings (### Heading).",
        "2. No section longer than 3 lines.",
        "3. Use emoji to aid readability.",
        "",
        "Structure:",
        "### 🧭 Overview",
        "[one sentence on overall form]",
        "",
        "### 🔍 Key movements",
        "- [point 1]: [short note on body position]",
        "- [point 2]: [short note on body position]",
        "",
        "### 💡 Improvements",
        "1. [suggestion 1]",
        "2. [suggestion 2]",
        "",
        "### ⛷️ Drill",
        "[one specific drill and its purpose]",
        "",
        SCORE_HEADING,
        "[score out of 10]",
    ]
    .join("\n")
}

pub fn analysis_prompt(input: &AnalysisInput) -> String {
    let context = input.user_context.trim();
    let context = if context.is_empty() {
        "(none)"
    } else {
        context
    };
    format!(
        "Training goal: {}\nRider's notes: {}\n\nAnalyse the attached clip against this goal.",
        input.goal_label, context
    )
}

pub fn advisory_prompt(weather: &WeatherObservation, beginner_mode: bool) -> String {
    let audience = if beginner_mode {
        "a beginner"
    } else {
        "a keen skier"
    };
    let tips = if beginner_mode {
        "[\"beginner tip 1\", \"beginner tip 2\"]"
    } else {
        "null"
    };
    format!(
        "You are a professional ski coach. Based on the weather below, write concise ski advice for {audience}.\n\n\
Weather:\n\
- Location: {location}\n\
- Temperature: {temp}°C (feels like {feels_like}°C)\n\
- Wind speed: {wind} km/h\n\
- Humidity: {humidity}%\n\
- Snowfall: {snow} mm\n\
- Snow depth: {snow_depth} cm\n\
- Visibility: {visibility} km\n\
- UV index: {uv}\n\
- Conditions: {conditions}\n\n\
Return JSON only (no markdown fences):\n\
{{\n\
  \"level\": \"excellent/good/caution/warning\",\n\
  \"title\": \"one-line summary of today's conditions\",\n\
  \"suggestions\": [\"suggestion 1\", \"suggestion 2\", \"suggestion 3\"],\n\
  \"beginnerTips\": {tips}\n\
}}\n\n\
Levels:\n\
- excellent: -15 to -5°C, wind < 15 km/h, visibility > 10 km\n\
- good: -20 to 0°C, wind < 25 km/h, visibility > 5 km\n\
- caution: below -20°C or above 0°C, wind 25-40 km/h, extra care needed\n\
- warning: extreme weather, skiing not recommended",
        location = weather.location,
        temp = weather.temp,
        feels_like = weather.feels_like,
        wind = weather.wind_speed,
        humidity = weather.humidity,
        snow = weather.snow,
        snow_depth = weather.snow_depth,
        visibility = weather.visibility,
        uv = weather.uv_index,
        conditions = weather.conditions,
    )
}

pub fn speech_prompt(text: &str) -> String {
    format!("Read this in a calm, encouraging coach's voice: {text}")
}
