use crate::domain::resort::SkiResort;
use crate::domain::weather::{ObservationSource, WeatherObservation};
use crate::weather::normalize::{DEFAULT_SUNRISE, DEFAULT_SUNSET};
use rand::seq::SliceRandom;
use rand::Rng;

const CONDITIONS: [&str; 5] = ["Clear", "Partly cloudy", "Overcast", "Light snow", "Moderate snow"];
const ICONS: [&str; 4] = ["clear-day", "partly-cloudy-day", "cloudy", "snow"];
const SNOWFALL_CHANCE: f64 = 0.3;

/// Plausible cold-climate reading for when the provider cannot be reached.
/// Always tagged [`ObservationSource::Synthetic`].
pub fn synthetic_observation<R: Rng + ?Sized>(resort: &SkiResort, rng: &mut R) -> WeatherObservation {
    let snow: i32 = if rng.gen_bool(SNOWFALL_CHANCE) {
        rng.gen_range(0..=5)
    } else {
        0
    };

    WeatherObservation {
        location: resort.name.clone(),
        resolved_address: resort.display_address(),
        temp: band(rng, -11, -5),
        feels_like: band(rng, -19, -11),
        temp_max: band(rng, -5, -1),
        temp_min: band(rng, -15, -11),
        humidity: band(rng, 25, 45),
        wind_speed: band(rng, 10, 30),
        wind_dir: band(rng, 0, 360),
        snow: f64::from(snow),
        snow_depth: band(rng, 20, 50),
        visibility: band(rng, 15, 25),
        uv_index: band(rng, 2, 5),
        conditions: pick(&CONDITIONS, rng).to_string(),
        icon: pick(&ICONS, rng).to_string(),
        sunrise: DEFAULT_SUNRISE.to_string(),
        sunset: DEFAULT_SUNSET.to_string(),
        source: ObservationSource::Synthetic,
    }
}

fn band<R: Rng + ?Sized>(rng: &mut R, low: i32, high: i32) -> f64 {
    f64::from(rng.gen_range(low..=high))
}

fn pick<'a, R: Rng + ?Sized>(options: &[&'a str], rng: &mut R) -> &'a str {
    options.choose(rng).copied().unwrap_or(options[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisory::classify;
    use crate::domain::advisory::AdvisoryLevel;
    use crate::domain::resort::default_resorts;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn stays_inside_bands() {
        let resort = &default_resorts()[0];
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let o = synthetic_observation(resort, &mut rng);
            assert!(o.is_synthetic());
            assert!((-11.0..=-5.0).contains(&o.temp));
            assert!((-19.0..=-11.0).contains(&o.feels_like));
            assert!((25.0..=45.0).contains(&o.humidity));
            assert!((10.0..=30.0).contains(&o.wind_speed));
            assert!((0.0..=360.0).contains(&o.wind_dir));
            assert!((0.0..=5.0).contains(&o.snow));
            assert!((20.0..=50.0).contains(&o.snow_depth));
            assert!((15.0..=25.0).contains(&o.visibility));
            assert!((2.0..=5.0).contains(&o.uv_index));
            assert!(CONDITIONS.contains(&o.conditions.as_str()));
            assert!(ICONS.contains(&o.icon.as_str()));
            assert_eq!(o.location, resort.name);
        }
    }

    #[test]
    fn same_seed_same_reading() {
        let resort = &default_resorts()[1];
        let a = synthetic_observation(resort, &mut StdRng::seed_from_u64(42));
        let b = synthetic_observation(resort, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn readings_reach_several_advisory_levels() {
        let resort = &default_resorts()[0];
        let mut rng = StdRng::seed_from_u64(1);
        let levels: HashSet<AdvisoryLevel> = (0..500)
            .map(|_| classify(&synthetic_observation(resort, &mut rng), false).level)
            .collect();
        assert!(levels.contains(&AdvisoryLevel::Excellent));
        assert!(levels.contains(&AdvisoryLevel::Caution));
    }
}
