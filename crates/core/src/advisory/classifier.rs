//! Rule-based advisory used whenever the AI path is unavailable.
//!
//! Rules run in a fixed order (temperature, wind, visibility, UV) and each may append
//! suggestions. Severity only ever moves up, except for the high-wind hard stop which
//! forces `warning` outright.

use crate::domain::advisory::{Advisory, AdvisoryLevel};
use crate::domain::weather::WeatherObservation;

pub const EXTREME_COLD_BELOW_C: f64 = -20.0;
pub const SOFT_SNOW_ABOVE_C: f64 = 0.0;
pub const IDEAL_TEMP_RANGE_C: (f64, f64) = (-15.0, -5.0);
pub const HARD_STOP_WIND_ABOVE_KMH: f64 = 40.0;
pub const STRONG_WIND_ABOVE_KMH: f64 = 25.0;
pub const LIGHT_WIND_BELOW_KMH: f64 = 15.0;
pub const LOW_VISIBILITY_BELOW_KM: f64 = 5.0;
pub const STRONG_UV_FROM: f64 = 4.0;
pub const BEGINNER_WIND_TIP_ABOVE_KMH: f64 = 15.0;
pub const BEGINNER_WARMUP_TIP_BELOW_C: f64 = -10.0;

pub const SUGGESTION_EXTREME_COLD: &str =
    "Extremely cold: wear proper thermal gear and watch for frostbite.";
pub const SUGGESTION_SOFT_SNOW: &str =
    "Above freezing: the snow may be soft, adjust your pace accordingly.";
pub const SUGGESTION_IDEAL_TEMP: &str =
    "Ideal temperature and good snow, enjoy your day on the slopes.";
pub const SUGGESTION_HARD_STOP_WIND: &str =
    "Wind is too strong: suspend outdoor skiing for now.";
pub const SUGGESTION_STRONG_WIND: &str =
    "Strong wind: keep your centre of mass stable and avoid high speeds.";
pub const SUGGESTION_LIGHT_WIND: &str =
    "Light wind, great conditions for technique practice.";
pub const SUGGESTION_LOW_VISIBILITY: &str =
    "Low visibility: stick to runs you know and keep a safe distance.";
pub const SUGGESTION_STRONG_UV: &str =
    "Strong UV: protect your face with sunscreen and wear goggles.";

pub const TIP_BEGINNER_TERRAIN: &str = "Practise on beginner runs and stay away from steep slopes.";
pub const TIP_WIND_STANCE: &str = "In the wind, lower your stance and keep your knees bent.";
pub const TIP_COLD_WARMUP: &str = "Cold muscles stiffen quickly, warm up well before your first run.";
pub const TIP_REST: &str = "Rest when you get tired; steady progress is what makes you better.";

pub const TITLE_EXCELLENT: &str = "Perfect ski day! Conditions are excellent";
pub const TITLE_GOOD: &str = "Good for skiing, take the usual precautions";
pub const TITLE_CAUTION: &str = "Skiable, but take extra care";
pub const TITLE_WARNING: &str = "Severe weather, reschedule or go to an indoor slope";

pub fn title_for(level: AdvisoryLevel) -> &'static str {
    match level {
        AdvisoryLevel::Excellent => TITLE_EXCELLENT,
        AdvisoryLevel::Good => TITLE_GOOD,
        AdvisoryLevel::Caution => TITLE_CAUTION,
        AdvisoryLevel::Warning => TITLE_WARNING,
    }
}

/// Running severity while rules are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Severity(AdvisoryLevel);

impl Severity {
    /// Takes `candidate` only if it is strictly more severe.
    fn raise(&mut self, candidate: AdvisoryLevel) {
        if candidate.rank() > self.0.rank() {
            self.0 = candidate;
        }
    }

    /// Unconditional. Reserved for the high-wind hard stop.
    fn force_override(&mut self, level: AdvisoryLevel) {
        self.0 = level;
    }

    /// Marks the day as favourable unless something already demanded caution.
    fn settle_favourable(&mut self) {
        if self.0.rank() < AdvisoryLevel::Caution.rank() {
            self.0 = AdvisoryLevel::Excellent;
        }
    }
}

/// Classifies a reading. Total and deterministic: non-finite values simply fail
/// every comparison and trigger no rule.
pub fn classify(observation: &WeatherObservation, beginner_mode: bool) -> Advisory {
    let temp = observation.temp;
    let wind = observation.wind_speed;

    let mut severity = Severity(AdvisoryLevel::Good);
    let mut suggestions = Vec::new();

    if temp < EXTREME_COLD_BELOW_C {
        severity.raise(AdvisoryLevel::Caution);
        suggestions.push(SUGGESTION_EXTREME_COLD.to_string());
    } else if temp > SOFT_SNOW_ABOVE_C {
        severity.raise(AdvisoryLevel::Caution);
        suggestions.push(SUGGESTION_SOFT_SNOW.to_string());
    } else if (IDEAL_TEMP_RANGE_C.0..=IDEAL_TEMP_RANGE_C.1).contains(&temp) {
        severity.settle_favourable();
        suggestions.push(SUGGESTION_IDEAL_TEMP.to_string());
    }

    if wind > HARD_STOP_WIND_ABOVE_KMH {
        severity.force_override(AdvisoryLevel::Warning);
        suggestions.push(SUGGESTION_HARD_STOP_WIND.to_string());
    } else if wind > STRONG_WIND_ABOVE_KMH {
        severity.raise(AdvisoryLevel::Caution);
        suggestions.push(SUGGESTION_STRONG_WIND.to_string());
    } else if wind < LIGHT_WIND_BELOW_KMH {
        suggestions.push(SUGGESTION_LIGHT_WIND.to_string());
    }

    if observation.visibility < LOW_VISIBILITY_BELOW_KM {
        severity.raise(AdvisoryLevel::Caution);
        suggestions.push(SUGGESTION_LOW_VISIBILITY.to_string());
    }

    if observation.uv_index >= STRONG_UV_FROM {
        suggestions.push(SUGGESTION_STRONG_UV.to_string());
    }

    let beginner_tips = beginner_mode.then(|| {
        let mut tips = vec![TIP_BEGINNER_TERRAIN.to_string()];
        if wind > BEGINNER_WIND_TIP_ABOVE_KMH {
            tips.push(TIP_WIND_STANCE.to_string());
        }
        if temp < BEGINNER_WARMUP_TIP_BELOW_C {
            tips.push(TIP_COLD_WARMUP.to_string());
        }
        tips.push(TIP_REST.to_string());
        tips
    });

    let level = severity.0;
    Advisory {
        level,
        title: title_for(level).to_string(),
        suggestions,
        beginner_tips,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::weather::ObservationSource;

    fn obs(temp: f64, wind: f64, visibility: f64, uv: f64) -> WeatherObservation {
        WeatherObservation {
            location: "Test Resort".to_string(),
            resolved_address: "Test".to_string(),
            temp,
            feels_like: temp - 5.0,
            temp_max: temp + 3.0,
            temp_min: temp - 3.0,
            humidity: 30.0,
            wind_speed: wind,
            wind_dir: 0.0,
            snow: 0.0,
            snow_depth: 25.0,
            visibility,
            uv_index: uv,
            conditions: "Clear".to_string(),
            icon: "clear-day".to_string(),
            sunrise: "07:30".to_string(),
            sunset: "17:15".to_string(),
            source: ObservationSource::Live,
        }
    }

    // Neutral wind/visibility/uv so only the rule under test fires.
    fn level_for_temp(temp: f64) -> AdvisoryLevel {
        classify(&obs(temp, 20.0, 20.0, 1.0), false).level
    }

    fn level_for_wind(wind: f64) -> AdvisoryLevel {
        classify(&obs(-2.0, wind, 20.0, 1.0), false).level
    }

    #[test]
    fn scenario_ideal_day() {
        let mut o = obs(-10.0, 10.0, 20.0, 2.0);
        o.feels_like = -15.0;
        let advisory = classify(&o, false);
        assert_eq!(advisory.level, AdvisoryLevel::Excellent);
        assert_eq!(advisory.title, TITLE_EXCELLENT);
        assert_eq!(
            advisory.suggestions,
            vec![SUGGESTION_IDEAL_TEMP.to_string(), SUGGESTION_LIGHT_WIND.to_string()]
        );
        assert_eq!(advisory.beginner_tips, None);
    }

    #[test]
    fn scenario_extreme_cold_beginner() {
        let advisory = classify(&obs(-25.0, 10.0, 20.0, 1.0), true);
        assert_eq!(advisory.level, AdvisoryLevel::Caution);
        assert_eq!(advisory.suggestions[0], SUGGESTION_EXTREME_COLD);
        assert_eq!(
            advisory.beginner_tips,
            Some(vec![
                TIP_BEGINNER_TERRAIN.to_string(),
                TIP_COLD_WARMUP.to_string(),
                TIP_REST.to_string(),
            ])
        );
    }

    #[test]
    fn scenario_hard_stop_wind_beats_ideal_temperature() {
        let advisory = classify(&obs(-10.0, 45.0, 20.0, 1.0), false);
        assert_eq!(advisory.level, AdvisoryLevel::Warning);
        assert_eq!(advisory.title, TITLE_WARNING);
        assert_eq!(
            advisory.suggestions,
            vec![SUGGESTION_IDEAL_TEMP.to_string(), SUGGESTION_HARD_STOP_WIND.to_string()]
        );
    }

    #[test]
    fn scenario_low_visibility_alone_means_caution() {
        let advisory = classify(&obs(-10.0, 5.0, 3.0, 1.0), false);
        assert_eq!(advisory.level, AdvisoryLevel::Caution);
        assert_eq!(advisory.suggestions.last().unwrap(), SUGGESTION_LOW_VISIBILITY);
    }

    #[test]
    fn temperature_boundaries() {
        assert_eq!(level_for_temp(-20.5), AdvisoryLevel::Caution);
        assert_eq!(level_for_temp(-20.0), AdvisoryLevel::Good);
        assert_eq!(level_for_temp(-15.5), AdvisoryLevel::Good);
        assert_eq!(level_for_temp(-15.0), AdvisoryLevel::Excellent);
        assert_eq!(level_for_temp(-5.0), AdvisoryLevel::Excellent);
        assert_eq!(level_for_temp(-4.5), AdvisoryLevel::Good);
        assert_eq!(level_for_temp(0.0), AdvisoryLevel::Good);
        assert_eq!(level_for_temp(0.5), AdvisoryLevel::Caution);
    }

    #[test]
    fn temperature_outside_rules_adds_no_suggestion() {
        let advisory = classify(&obs(-20.0, 20.0, 20.0, 1.0), false);
        assert!(advisory.suggestions.is_empty());
    }

    #[test]
    fn wind_boundaries() {
        assert_eq!(level_for_wind(40.5), AdvisoryLevel::Warning);
        assert_eq!(level_for_wind(40.0), AdvisoryLevel::Caution);
        assert_eq!(level_for_wind(25.5), AdvisoryLevel::Caution);
        assert_eq!(level_for_wind(25.0), AdvisoryLevel::Good);

        let at_15 = classify(&obs(-2.0, 15.0, 20.0, 1.0), false);
        assert!(at_15.suggestions.is_empty());
        let below_15 = classify(&obs(-2.0, 14.9, 20.0, 1.0), false);
        assert_eq!(below_15.suggestions, vec![SUGGESTION_LIGHT_WIND.to_string()]);
        assert_eq!(below_15.level, AdvisoryLevel::Good);
    }

    #[test]
    fn visibility_boundary() {
        let at_5 = classify(&obs(-2.0, 20.0, 5.0, 1.0), false);
        assert_eq!(at_5.level, AdvisoryLevel::Good);
        assert!(at_5.suggestions.is_empty());
        let below_5 = classify(&obs(-2.0, 20.0, 4.9, 1.0), false);
        assert_eq!(below_5.level, AdvisoryLevel::Caution);
    }

    #[test]
    fn uv_boundary_never_changes_level() {
        let at_4 = classify(&obs(-2.0, 20.0, 20.0, 4.0), false);
        assert_eq!(at_4.suggestions, vec![SUGGESTION_STRONG_UV.to_string()]);
        assert_eq!(at_4.level, AdvisoryLevel::Good);
        let below_4 = classify(&obs(-2.0, 20.0, 20.0, 3.9), false);
        assert!(below_4.suggestions.is_empty());
    }

    #[test]
    fn beginner_tip_boundaries() {
        let tips = |temp, wind| classify(&obs(temp, wind, 20.0, 1.0), true).beginner_tips.unwrap();
        assert!(!tips(-2.0, 15.0).contains(&TIP_WIND_STANCE.to_string()));
        assert!(tips(-2.0, 15.5).contains(&TIP_WIND_STANCE.to_string()));
        assert!(!tips(-10.0, 5.0).contains(&TIP_COLD_WARMUP.to_string()));
        assert!(tips(-10.5, 5.0).contains(&TIP_COLD_WARMUP.to_string()));
    }

    #[test]
    fn beginner_tips_do_not_depend_on_level() {
        let calm = classify(&obs(-12.0, 20.0, 20.0, 1.0), true);
        let stormy = classify(&obs(-12.0, 20.0, 1.0, 1.0), true);
        assert_ne!(calm.level, stormy.level);
        assert_eq!(calm.beginner_tips, stormy.beginner_tips);
    }

    #[test]
    fn tips_present_iff_beginner_mode() {
        let o = obs(-8.0, 30.0, 3.0, 5.0);
        assert!(classify(&o, true).beginner_tips.is_some());
        assert!(classify(&o, false).beginner_tips.is_none());
    }

    #[test]
    fn everything_at_once_keeps_rule_order() {
        let advisory = classify(&obs(3.0, 30.0, 2.0, 6.0), false);
        assert_eq!(advisory.level, AdvisoryLevel::Caution);
        assert_eq!(
            advisory.suggestions,
            vec![
                SUGGESTION_SOFT_SNOW.to_string(),
                SUGGESTION_STRONG_WIND.to_string(),
                SUGGESTION_LOW_VISIBILITY.to_string(),
                SUGGESTION_STRONG_UV.to_string(),
            ]
        );
    }

    #[test]
    fn hard_stop_survives_later_rules() {
        let advisory = classify(&obs(-30.0, 50.0, 1.0, 8.0), false);
        assert_eq!(advisory.level, AdvisoryLevel::Warning);
        assert_eq!(advisory.suggestions.len(), 4);
    }

    #[test]
    fn final_level_is_at_least_every_single_rule() {
        let temps = [-30.0, -20.0, -15.0, -10.0, -5.0, 0.0, 2.0];
        let winds = [0.0, 15.0, 20.0, 25.0, 30.0, 40.0, 45.0];
        let visibilities = [1.0, 5.0, 20.0];
        for &t in &temps {
            for &w in &winds {
                for &v in &visibilities {
                    let full = classify(&obs(t, w, v, 5.0), false).level;
                    let temp_only = classify(&obs(t, 20.0, 20.0, 1.0), false).level;
                    let wind_only = classify(&obs(-2.0, w, 20.0, 1.0), false).level;
                    let vis_only = classify(&obs(-2.0, 20.0, v, 1.0), false).level;
                    if w > HARD_STOP_WIND_ABOVE_KMH {
                        assert_eq!(full, AdvisoryLevel::Warning);
                    }
                    // Only rules that escalate imply a level on their own.
                    for single in [temp_only, wind_only, vis_only] {
                        if single >= AdvisoryLevel::Caution {
                            assert!(full >= single, "t={t} w={w} v={v}: {full} < {single}");
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn deterministic_for_same_input() {
        let o = obs(-7.0, 22.0, 4.0, 4.0);
        assert_eq!(classify(&o, true), classify(&o, true));
    }

    #[test]
    fn non_finite_values_are_handled() {
        let advisory = classify(&obs(f64::NAN, f64::INFINITY, f64::NAN, f64::NAN), true);
        assert_eq!(advisory.level, AdvisoryLevel::Warning);
        let calm = classify(&obs(f64::NAN, f64::NAN, f64::NAN, f64::NAN), false);
        assert_eq!(calm.level, AdvisoryLevel::Good);
        assert!(calm.suggestions.is_empty());
    }
}
