// TODO: Redo the calculation based on the excel files:
// https://gml.noaa.gov/grad/solcalc/calcdetails.html

use chrono::{Datelike, NaiveDateTime, Timelike};
use std::f64::consts::PI;

/// Solar zenith angle in degrees at `datetime` (UTC), for a position in decimal degrees.
pub fn sun_zenith_angle(datetime: NaiveDateTime, longitude: f64, latitude: f64) -> f64 {
    let days_in_year = 365.25;
    let declination_angle_max = 23.44;

    let day_of_year = datetime.ordinal() as f64;

    // Local solar time, 4 minutes per degree of longitude
    let time_of_day = datetime.num_seconds_from_midnight() as f64 / 3600.0;
    let solar_time = time_of_day + (4.0 * longitude) / 60.0;
    let hour_angle = 15.0 * (solar_time - 12.0);

    let declination_angle =
        declination_angle_max * (2.0 * PI * (day_of_year - 81.0) / days_in_year).sin();

    let latitude_rad = latitude.to_radians();
    let declination_angle_rad = declination_angle.to_radians();

    let cos_zenith = latitude_rad.sin() * declination_angle_rad.sin()
        + latitude_rad.cos() * declination_angle_rad.cos() * hour_angle.to_radians().cos();

    cos_zenith.clamp(-1.0, 1.0).acos().to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn datetime(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_night_time() {
        let result = sun_zenith_angle(datetime("2024-08-23 14:00:00"), 105.0, 40.0);
        assert!((114.3..=114.4).contains(&result), "{result}");
    }

    #[test]
    fn test_equinox_noon_at_equator() {
        let result = sun_zenith_angle(datetime("2023-03-21 12:00:00"), 0.0, 0.0);
        assert!(result.abs() < 1.0, "Expected around 0.0, got {}", result);
    }

    #[test]
    fn test_solstice_noon() {
        // Sun over the tropic of Cancer
        let result = sun_zenith_angle(datetime("2023-06-21 12:00:00"), 0.0, 45.0);
        assert!((result - 21.56).abs() < 0.5, "{result}");

        // Same local noon further east
        let result = sun_zenith_angle(datetime("2023-06-21 06:00:00"), 90.0, 45.0);
        assert!((result - 21.56).abs() < 0.5, "{result}");
    }
}
