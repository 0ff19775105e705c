use chrono::Days;
use chrono::NaiveDate;
use rand::Rng;
use rand::seq::IndexedRandom as _;
use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct WeatherReport {
    pub city: String,
    pub date: NaiveDate,
    pub temperature: f64,
    pub condition: String,
}

/// Synthesizes one weather report per tracked city. City and condition lists
/// are fixed at construction, the random source is injected per call so tests
/// can seed it.
pub struct WeatherGenerator {
    cities: Vec<String>,
    conditions: Vec<String>,
}

impl Default for WeatherGenerator {
    fn default() -> Self {
        Self::new(
            vec!["Magadan", "Chukotka", "Saint Petersburg", "Tyumen"],
            vec!["sunny", "cloudy", "rain"],
        )
    }
}

impl WeatherGenerator {
    pub fn new(cities: Vec<&str>, conditions: Vec<&str>) -> Self {
        Self {
            cities: cities.into_iter().map(str::to_owned).collect(),
            conditions: conditions.into_iter().map(str::to_owned).collect(),
        }
    }

    pub fn generate(&self, today: NaiveDate, rng: &mut impl Rng) -> Vec<WeatherReport> {
        self.cities
            .iter()
            .map(|city| WeatherReport {
                city: city.clone(),
                date: today - Days::new(rng.random_range(0..7)),
                temperature: rng.random_range(0.0..36.0),
                condition: self.conditions.choose(rng).cloned().unwrap_or_default(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::NaiveDate;
    use framework::json::from_json;
    use framework::json::to_json;
    use rand::SeedableRng as _;
    use rand::rngs::StdRng;

    use super::WeatherGenerator;
    use super::WeatherReport;

    #[test]
    fn generate() {
        let generator = WeatherGenerator::default();
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..100 {
            let reports = generator.generate(today, &mut rng);
            assert_eq!(reports.len(), 4);

            let cities: HashSet<&str> = reports.iter().map(|report| report.city.as_str()).collect();
            assert_eq!(
                cities,
                HashSet::from(["Magadan", "Chukotka", "Saint Petersburg", "Tyumen"])
            );

            for report in &reports {
                assert!((0.0..36.0).contains(&report.temperature), "temperature={}", report.temperature);
                assert!(report.date <= today, "date={}", report.date);
                assert!(today - report.date <= chrono::Duration::days(7), "date={}", report.date);
                assert!(
                    ["sunny", "cloudy", "rain"].contains(&report.condition.as_str()),
                    "condition={}",
                    report.condition
                );
            }
        }
    }

    #[test]
    fn generate_with_fixed_today() {
        let generator = WeatherGenerator::new(vec!["A", "B"], vec!["sunny", "cloudy", "rain"]);
        let today = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let earliest = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let reports = generator.generate(today, &mut rng);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].city, "A");
        assert_eq!(reports[1].city, "B");
        for report in &reports {
            assert!(report.date >= earliest && report.date <= today, "date={}", report.date);
            assert!((0.0..36.0).contains(&report.temperature), "temperature={}", report.temperature);
            assert!(["sunny", "cloudy", "rain"].contains(&report.condition.as_str()));
        }
    }

    #[test]
    fn json_round_trip() {
        let report = WeatherReport {
            city: "Magadan".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            temperature: 17.5,
            condition: "cloudy".to_string(),
        };
        let json = to_json(&report).unwrap();
        assert!(json.contains(r#""date":"2024-01-15""#), "json={json}");
        let decoded: WeatherReport = from_json(&json).unwrap();
        assert_eq!(decoded, report);
    }
}
