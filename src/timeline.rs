use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Duration, Timelike, Utc, Weekday};
use rand::Rng;

use crate::fleet::HostProfile;

/// Fraction of peak activity for each hour of a working day. Overnight is
/// nearly silent, ramp-up starts around 7am, there is a lunch dip at noon,
/// and the evening tails off.
pub const WORKDAY_HOURS: [f64; 24] = [
    0.10, 0.05, 0.05, 0.05, 0.10, 0.20, 0.30, 0.60, 0.90, 1.00, 1.00, 1.00, 0.80, 0.90, 1.00,
    1.00, 1.00, 0.80, 0.50, 0.30, 0.20, 0.20, 0.15, 0.10,
];

/// Weekends run at 30% of the workday curve.
pub const WEEKEND_FACTOR: f64 = 0.3;

pub fn is_weekend(timestamp: DateTime<Utc>) -> bool {
    matches!(timestamp.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Activity multiplier for the hour containing `timestamp`.
pub fn activity_multiplier(timestamp: DateTime<Utc>) -> f64 {
    let hourly = WORKDAY_HOURS[timestamp.hour() as usize];
    if is_weekend(timestamp) {
        hourly * WEEKEND_FACTOR
    } else {
        hourly
    }
}

/// Expected query count for one host in one hour, jittered per host-hour.
/// Servers keep a 50% activity floor since batch jobs run around the clock.
pub fn queries_for_hour<R: Rng + ?Sized>(
    rng: &mut R,
    host: &HostProfile,
    multiplier: f64,
) -> u32 {
    let count = if host.is_server() {
        let server_multiplier = multiplier * 0.5 + 0.5;
        f64::from(host.query_rate) * server_multiplier * rng.gen_range(0.8..1.2)
    } else {
        f64::from(host.query_rate) * multiplier * rng.gen_range(0.7..1.3)
    };

    (count as u32).max(1)
}

/// Random second-granularity timestamp inside the hour starting at `hour_start`.
pub fn random_time_in_hour<R: Rng + ?Sized>(
    rng: &mut R,
    hour_start: DateTime<Utc>,
) -> DateTime<Utc> {
    hour_start
        + Duration::minutes(rng.gen_range(0..60))
        + Duration::seconds(rng.gen_range(0..60))
}

/// Pick an anomaly start time: a weekday business hour (9am-6pm) somewhere
/// in the interior of the generation period, away from both edges.
pub fn business_hour_start<R: Rng + ?Sized>(
    rng: &mut R,
    period_start: DateTime<Utc>,
    period_days: i64,
) -> Result<DateTime<Utc>> {
    let latest_day = (period_days - 3).max(1);
    let mut anomaly_time = period_start + Duration::days(rng.gen_range(1..=latest_day));

    while is_weekend(anomaly_time) {
        anomaly_time += Duration::days(1);
    }

    anomaly_time
        .with_hour(rng.gen_range(9..=18))
        .and_then(|t| t.with_minute(rng.gen_range(0..60)))
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .context("Failed to construct anomaly start time")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn workstation() -> HostProfile {
        HostProfile {
            ip: "10.1.1.5".parse().unwrap(),
            hostname: "john-win10".to_string(),
            os: crate::fleet::OsType::Windows,
            department: "IT".to_string(),
            query_rate: 30,
            user_name: "john".to_string(),
        }
    }

    fn server() -> HostProfile {
        HostProfile {
            ip: "10.2.0.5".parse().unwrap(),
            hostname: "db-412.internal".to_string(),
            os: crate::fleet::OsType::Linux,
            department: "Servers".to_string(),
            query_rate: 60,
            user_name: "david".to_string(),
        }
    }

    #[test]
    fn test_weekend_detection() {
        // 2024-03-16 was a Saturday
        let saturday = Utc.with_ymd_and_hms(2024, 3, 16, 12, 0, 0).unwrap();
        let friday = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        assert!(is_weekend(saturday));
        assert!(!is_weekend(friday));
    }

    #[test]
    fn test_weekend_multiplier_scaled_down() {
        let saturday = Utc.with_ymd_and_hms(2024, 3, 16, 10, 0, 0).unwrap();
        let friday = Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap();
        let weekend = activity_multiplier(saturday);
        let weekday = activity_multiplier(friday);
        assert!((weekend - weekday * WEEKEND_FACTOR).abs() < f64::EPSILON);
    }

    #[test]
    fn test_overnight_quieter_than_peak() {
        let peak = Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap();
        let night = Utc.with_ymd_and_hms(2024, 3, 15, 2, 0, 0).unwrap();
        assert!(activity_multiplier(peak) > activity_multiplier(night));
    }

    #[test]
    fn test_queries_for_hour_has_floor_of_one() {
        let mut rng = StdRng::seed_from_u64(1);
        let host = workstation();
        for _ in 0..100 {
            assert!(queries_for_hour(&mut rng, &host, 0.0) >= 1);
        }
    }

    #[test]
    fn test_servers_stay_busy_overnight() {
        let mut rng = StdRng::seed_from_u64(2);
        let srv = server();
        // At 5% ambient activity a server still runs at >= ~52% of its rate
        let mut total = 0u32;
        for _ in 0..200 {
            total += queries_for_hour(&mut rng, &srv, 0.05);
        }
        let average = f64::from(total) / 200.0;
        assert!(average > f64::from(srv.query_rate) * 0.4, "avg {}", average);
    }

    #[test]
    fn test_random_time_stays_in_hour() {
        let mut rng = StdRng::seed_from_u64(3);
        let hour_start = Utc.with_ymd_and_hms(2024, 3, 15, 14, 0, 0).unwrap();
        for _ in 0..100 {
            let t = random_time_in_hour(&mut rng, hour_start);
            assert!(t >= hour_start);
            assert!(t < hour_start + Duration::hours(1));
        }
    }

    #[test]
    fn test_business_hour_start_is_weekday_business_hours() {
        let mut rng = StdRng::seed_from_u64(4);
        let period_start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        for _ in 0..50 {
            let t = business_hour_start(&mut rng, period_start, 30).unwrap();
            assert!(!is_weekend(t));
            assert!((9..=18).contains(&t.hour()));
            assert!(t > period_start);
        }
    }

    #[test]
    fn test_business_hour_start_short_period() {
        let mut rng = StdRng::seed_from_u64(6);
        let period_start = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap();
        // Periods shorter than the edge margin still schedule
        let t = business_hour_start(&mut rng, period_start, 2).unwrap();
        assert!(t > period_start);
    }
}
