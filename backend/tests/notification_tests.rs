//! Notification rule integration tests
//!
//! Tests for notification rules including:
//! - Threshold validation on create and edit
//! - Clause matching against provider payloads
//! - Inactive rules never match
//! - Storage record round trip

use proptest::prelude::*;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use shared::{
    ConditionClause, ConditionData, Location, NotificationData, NotificationRule, ValidationError,
};
use std::str::FromStr;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn london() -> Location {
    Location::new("London", "GB", dec("51.5074"), dec("-0.1278")).unwrap()
}

fn payload(main: &str, temp: f64) -> Value {
    json!({
        "weather": [{ "main": main, "description": main.to_lowercase(), "icon": "01d" }],
        "main": { "temp": temp, "humidity": 60 },
        "name": "London"
    })
}

fn above(value: i64) -> ConditionClause {
    ConditionClause::TemperatureAbove {
        value: Decimal::from(value),
    }
}

fn below(value: i64) -> ConditionClause {
    ConditionClause::TemperatureBelow {
        value: Decimal::from(value),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Test a rule needs a location and at least one clause
    #[test]
    fn test_create_requires_location_and_conditions() {
        let rain = vec![ConditionData::new("rain", None)];
        assert_eq!(
            NotificationRule::create(None, rain).unwrap_err(),
            ValidationError::MissingLocation
        );
        assert_eq!(
            NotificationRule::create(Some(london()), Vec::new()).unwrap_err(),
            ValidationError::NoConditions
        );
    }

    /// Test unknown condition types are rejected
    #[test]
    fn test_unknown_condition_rejected() {
        let err = NotificationRule::create(Some(london()), vec![ConditionData::new("hail", None)])
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnknownCondition(kind) if kind == "hail"));
    }

    /// Test temperature clauses need a value
    #[test]
    fn test_threshold_required() {
        let err = NotificationRule::create(
            Some(london()),
            vec![ConditionData::new("temperature_below", None)],
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::MissingThreshold("temperature_below"));
    }

    /// Test the threshold bounds are inclusive
    #[test]
    fn test_threshold_bounds_inclusive() {
        assert!(NotificationRule::new(london(), vec![above(60)]).is_ok());
        assert!(NotificationRule::new(london(), vec![below(-50)]).is_ok());
        assert!(NotificationRule::new(london(), vec![above(61)]).is_err());
        assert!(NotificationRule::new(london(), vec![below(-51)]).is_err());
    }

    /// Test a rule matches when any clause matches
    #[test]
    fn test_any_clause_matches() {
        let rule = NotificationRule::new(london(), vec![above(30), ConditionClause::Rain]).unwrap();
        assert_eq!(rule.evaluate(&payload("Rain", 12.0)).unwrap(), Some(1));
        assert_eq!(rule.evaluate(&payload("Clear", 31.0)).unwrap(), Some(0));
        assert_eq!(rule.evaluate(&payload("Clear", 12.0)).unwrap(), None);
    }

    /// Test rain is detected from the precipitation block too
    #[test]
    fn test_rain_volume_counts_as_rain() {
        let rule = NotificationRule::new(london(), vec![ConditionClause::Rain]).unwrap();
        let mut drizzle = payload("Clouds", 10.0);
        drizzle["rain"] = json!({ "1h": 0.3 });
        assert!(rule.matches(&drizzle));
    }

    /// Test condition names are matched case-insensitively
    #[test]
    fn test_condition_case_insensitive() {
        let rule = NotificationRule::new(london(), vec![ConditionClause::Thunderstorm]).unwrap();
        assert!(rule.matches(&payload("THUNDERSTORM", 20.0)));
    }

    /// Test malformed payloads never match
    #[test]
    fn test_malformed_payload_never_matches() {
        let rule = NotificationRule::new(london(), vec![ConditionClause::Clear]).unwrap();
        assert!(rule.evaluate(&json!("clear")).is_err());
        assert!(rule.evaluate(&json!({ "weather": [] })).is_err());
        assert!(!rule.matches(&json!({ "main": { "temp": "warm" }, "weather": [] })));
    }

    /// Test message for the first matching clause
    #[test]
    fn test_notification_message() {
        let rule = NotificationRule::new(london(), vec![below(0), above(25)]).unwrap();
        assert_eq!(
            rule.notification_message(&payload("Clear", 27.25)),
            "Temperature in London, GB is 27.3°C, above 25°C"
        );
        assert_eq!(
            rule.notification_message(&payload("Clear", 10.0)),
            "Weather update for London, GB"
        );
    }

    /// Test rule description joins clauses
    #[test]
    fn test_describe() {
        let rule = NotificationRule::new(london(), vec![above(30), ConditionClause::Snow]).unwrap();
        assert_eq!(rule.describe(), "Temperature above 30°C OR Snow");
    }

    /// Test edit keeps identity and active state
    #[test]
    fn test_edit_keeps_identity() {
        let mut rule = NotificationRule::new(london(), vec![ConditionClause::Rain]).unwrap();
        rule.deactivate();
        let edited = rule.edit(vec![ConditionClause::Clear]).unwrap();

        assert_eq!(edited.id(), rule.id());
        assert_eq!(edited.created_at(), rule.created_at());
        assert!(!edited.is_active());
        assert_eq!(edited.conditions(), &[ConditionClause::Clear]);
        assert!(rule.edit(Vec::new()).is_err());
    }

    /// Test stored records without an active flag load as active
    #[test]
    fn test_record_active_defaults_true() {
        let rule = NotificationRule::new(london(), vec![ConditionClause::Rain]).unwrap();
        let mut value = serde_json::to_value(rule.to_record()).unwrap();
        value.as_object_mut().unwrap().remove("active");

        let record: NotificationData = serde_json::from_value(value).unwrap();
        assert!(record.active);
    }

    /// Test clauses serialize in their storage form
    #[test]
    fn test_clause_wire_format() {
        let json = serde_json::to_value(above(30)).unwrap();
        assert_eq!(json, json!({ "type": "temperature_above", "value": 30.0 }));

        let rain: ConditionClause = serde_json::from_value(json!({ "type": "rain" })).unwrap();
        assert_eq!(rain, ConditionClause::Rain);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for thresholds inside the accepted range
    fn threshold_strategy() -> impl Strategy<Value = i64> {
        -50i64..=60i64
    }

    /// Strategy for thresholds outside the accepted range
    fn out_of_range_strategy() -> impl Strategy<Value = i64> {
        prop_oneof![-500i64..-50i64, 61i64..500i64]
    }

    /// Strategy for observed temperatures; half degrees are exact in f64
    fn temperature_strategy() -> impl Strategy<Value = f64> {
        (-140i64..=140i64).prop_map(|n| n as f64 + 0.5)
    }

    fn condition_strategy() -> impl Strategy<Value = &'static str> {
        prop_oneof![
            Just("Clear"),
            Just("Clouds"),
            Just("Rain"),
            Just("Snow"),
            Just("Thunderstorm"),
            Just("Mist"),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Thresholds outside [-50, 60] are rejected for both directions
        #[test]
        fn prop_out_of_range_threshold_rejected(value in out_of_range_strategy()) {
            for kind in ["temperature_above", "temperature_below"] {
                let result = NotificationRule::create(
                    Some(london()),
                    vec![ConditionData::new(kind, Some(Decimal::from(value)))],
                );
                prop_assert_eq!(
                    result.unwrap_err(),
                    ValidationError::ThresholdOutOfRange(Decimal::from(value))
                );
            }
        }

        /// Above/below compare strictly against the observed temperature
        #[test]
        fn prop_threshold_comparison(
            threshold in threshold_strategy(),
            temp in temperature_strategy()
        ) {
            let hot = NotificationRule::new(london(), vec![above(threshold)]).unwrap();
            let cold = NotificationRule::new(london(), vec![below(threshold)]).unwrap();
            let weather = payload("Clouds", temp);

            prop_assert_eq!(hot.matches(&weather), temp > threshold as f64);
            prop_assert_eq!(cold.matches(&weather), temp < threshold as f64);
        }

        /// A deactivated rule never matches, and re-activating restores matching
        #[test]
        fn prop_inactive_never_matches(
            condition in condition_strategy(),
            temp in temperature_strategy()
        ) {
            let mut rule = NotificationRule::new(
                london(),
                vec![ConditionClause::Rain, ConditionClause::Clear, above(-50)],
            )
            .unwrap();
            let weather = payload(condition, temp);
            let active_result = rule.matches(&weather);

            rule.deactivate();
            prop_assert!(!rule.matches(&weather));
            prop_assert_eq!(rule.evaluate(&weather), Ok(None));

            rule.activate();
            prop_assert_eq!(rule.matches(&weather), active_result);
        }

        /// Storage records rebuild an equivalent rule
        #[test]
        fn prop_record_round_trip(
            threshold in threshold_strategy(),
            active in any::<bool>()
        ) {
            let mut rule = NotificationRule::new(
                london(),
                vec![below(threshold), ConditionClause::Snow],
            )
            .unwrap();
            if !active {
                rule.deactivate();
            }

            let json = serde_json::to_string(&rule.to_record()).unwrap();
            let record: NotificationData = serde_json::from_str(&json).unwrap();
            let restored = NotificationRule::from_record(&record).unwrap();

            prop_assert_eq!(restored.id(), rule.id());
            prop_assert_eq!(restored.location(), rule.location());
            prop_assert_eq!(restored.conditions(), rule.conditions());
            prop_assert_eq!(restored.is_active(), active);
        }
    }
}
