//! Notification rules and weather condition matching

use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::models::location::{Location, LocationData};
use crate::types::{round_dp, TEMPERATURE_PRECISION};
use crate::validation::{validate_temperature_threshold, ValidationError};

/// One condition test inside a rule; a rule matches if any clause matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "ConditionData", try_from = "ConditionData")]
pub enum ConditionClause {
    TemperatureAbove { value: Decimal },
    TemperatureBelow { value: Decimal },
    Rain,
    Snow,
    Thunderstorm,
    Clear,
}

/// Storage form of a clause: `{ "type": "temperature_above", "value": 30 }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionData {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Decimal>,
}

impl ConditionData {
    pub fn new(kind: &str, value: Option<Decimal>) -> Self {
        Self {
            kind: kind.to_string(),
            value,
        }
    }
}

impl ConditionClause {
    /// Wire name of the clause kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TemperatureAbove { .. } => "temperature_above",
            Self::TemperatureBelow { .. } => "temperature_below",
            Self::Rain => "rain",
            Self::Snow => "snow",
            Self::Thunderstorm => "thunderstorm",
            Self::Clear => "clear",
        }
    }

    pub fn threshold(&self) -> Option<Decimal> {
        match self {
            Self::TemperatureAbove { value } | Self::TemperatureBelow { value } => Some(*value),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.threshold() {
            Some(value) => validate_temperature_threshold(value),
            None => Ok(()),
        }
    }

    /// Human-readable label, e.g. "Temperature above 30°C"
    pub fn describe(&self) -> String {
        match self {
            Self::TemperatureAbove { value } => format!("Temperature above {value}°C"),
            Self::TemperatureBelow { value } => format!("Temperature below {value}°C"),
            Self::Rain => "Rain".to_string(),
            Self::Snow => "Snow".to_string(),
            Self::Thunderstorm => "Thunderstorm".to_string(),
            Self::Clear => "Clear sky".to_string(),
        }
    }

    fn matches(&self, facts: &WeatherFacts) -> bool {
        match self {
            Self::TemperatureAbove { value } => facts.temperature > *value,
            Self::TemperatureBelow { value } => facts.temperature < *value,
            Self::Rain => facts.has_condition("rain") || facts.has_rain,
            Self::Snow => facts.has_condition("snow") || facts.has_snow,
            Self::Thunderstorm => facts.has_condition("thunderstorm"),
            Self::Clear => facts.has_condition("clear"),
        }
    }

    fn message(&self, place: &str, facts: &WeatherFacts) -> String {
        match self {
            Self::TemperatureAbove { value } => format!(
                "Temperature in {place} is {}°C, above {value}°C",
                facts.display_temperature()
            ),
            Self::TemperatureBelow { value } => format!(
                "Temperature in {place} is {}°C, below {value}°C",
                facts.display_temperature()
            ),
            Self::Rain => format!("It's currently raining in {place}"),
            Self::Snow => format!("It's currently snowing in {place}"),
            Self::Thunderstorm => format!("Thunderstorm activity in {place}"),
            Self::Clear => format!("Clear skies in {place}"),
        }
    }
}

impl TryFrom<ConditionData> for ConditionClause {
    type Error = ValidationError;

    fn try_from(data: ConditionData) -> Result<Self, Self::Error> {
        let threshold = |kind: &'static str| -> Result<Decimal, ValidationError> {
            let value = data.value.ok_or(ValidationError::MissingThreshold(kind))?;
            validate_temperature_threshold(value)?;
            Ok(value)
        };

        match data.kind.trim().to_ascii_lowercase().as_str() {
            "temperature_above" => Ok(Self::TemperatureAbove {
                value: threshold("temperature_above")?,
            }),
            "temperature_below" => Ok(Self::TemperatureBelow {
                value: threshold("temperature_below")?,
            }),
            "rain" => Ok(Self::Rain),
            "snow" => Ok(Self::Snow),
            "thunderstorm" => Ok(Self::Thunderstorm),
            "clear" => Ok(Self::Clear),
            other => Err(ValidationError::UnknownCondition(other.to_string())),
        }
    }
}

impl From<ConditionClause> for ConditionData {
    fn from(clause: ConditionClause) -> Self {
        Self {
            kind: clause.kind().to_string(),
            value: clause.threshold(),
        }
    }
}

/// Why a payload could not be evaluated
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("weather payload is not an object")]
    NotAnObject,

    #[error("weather payload has no numeric main.temp")]
    MissingTemperature,

    #[error("weather payload has no valid weather list")]
    InvalidConditions,
}

/// The parts of a provider payload that clauses look at
#[derive(Debug)]
struct WeatherFacts {
    temperature: Decimal,
    conditions: Vec<String>,
    has_rain: bool,
    has_snow: bool,
}

impl WeatherFacts {
    fn from_payload(payload: &Value) -> Result<Self, MatchError> {
        let object = payload.as_object().ok_or(MatchError::NotAnObject)?;

        let temperature = object
            .get("main")
            .and_then(|main| main.get("temp"))
            .and_then(Value::as_f64)
            .filter(|t| t.is_finite())
            .ok_or(MatchError::MissingTemperature)?;

        let conditions = object
            .get("weather")
            .and_then(Value::as_array)
            .ok_or(MatchError::InvalidConditions)?
            .iter()
            .map(|entry| {
                entry
                    .get("main")
                    .and_then(Value::as_str)
                    .map(str::to_lowercase)
                    .ok_or(MatchError::InvalidConditions)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let present = |field: &str| object.get(field).is_some_and(|v| !v.is_null());

        Ok(Self {
            temperature: Decimal::from_f64(temperature).ok_or(MatchError::MissingTemperature)?,
            conditions,
            has_rain: present("rain"),
            has_snow: present("snow"),
        })
    }

    fn display_temperature(&self) -> Decimal {
        round_dp(self.temperature, TEMPERATURE_PRECISION)
    }

    fn has_condition(&self, keyword: &str) -> bool {
        self.conditions.iter().any(|c| c.contains(keyword))
    }
}

/// A user-defined alert bound to one location
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRule {
    id: Uuid,
    location: Location,
    conditions: Vec<ConditionClause>,
    active: bool,
    created_at: DateTime<Utc>,
}

/// Storage projection of a [`NotificationRule`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    pub id: Uuid,
    pub location: LocationData,
    pub conditions: Vec<ConditionData>,
    #[serde(default = "default_active")]
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

fn validate_clauses(conditions: &[ConditionClause]) -> Result<(), ValidationError> {
    if conditions.is_empty() {
        return Err(ValidationError::NoConditions);
    }
    conditions.iter().try_for_each(ConditionClause::validate)
}

impl NotificationRule {
    /// Create an active rule from already-typed clauses
    pub fn new(location: Location, conditions: Vec<ConditionClause>) -> Result<Self, ValidationError> {
        validate_clauses(&conditions)?;
        Ok(Self {
            id: Uuid::new_v4(),
            location,
            conditions,
            active: true,
            created_at: Utc::now(),
        })
    }

    /// Create a rule from user input
    pub fn create(
        location: Option<Location>,
        conditions: Vec<ConditionData>,
    ) -> Result<Self, ValidationError> {
        let location = location.ok_or(ValidationError::MissingLocation)?;
        if conditions.is_empty() {
            return Err(ValidationError::NoConditions);
        }
        let clauses = conditions
            .into_iter()
            .map(ConditionClause::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(location, clauses)
    }

    /// Rebuild a stored rule; location and clauses are re-validated
    pub fn from_record(record: &NotificationData) -> Result<Self, ValidationError> {
        let location = Location::from_record(&record.location)?;
        let conditions = record
            .conditions
            .iter()
            .cloned()
            .map(ConditionClause::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        validate_clauses(&conditions)?;

        Ok(Self {
            id: record.id,
            location,
            conditions,
            active: record.active,
            created_at: record.created_at,
        })
    }

    pub fn to_record(&self) -> NotificationData {
        NotificationData {
            id: self.id,
            location: self.location.to_record(),
            conditions: self.conditions.iter().cloned().map(ConditionData::from).collect(),
            active: self.active,
            created_at: self.created_at,
        }
    }

    /// Replace the clause list, keeping id, location, active flag and creation time
    pub fn edit(&self, conditions: Vec<ConditionClause>) -> Result<Self, ValidationError> {
        validate_clauses(&conditions)?;
        Ok(Self {
            conditions,
            ..self.clone()
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn conditions(&self) -> &[ConditionClause] {
        &self.conditions
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Flip the active flag and return the new state
    pub fn toggle(&mut self) -> bool {
        self.active = !self.active;
        self.active
    }

    /// Index of the first clause matching `payload`; `Ok(None)` for inactive rules
    pub fn evaluate(&self, payload: &Value) -> Result<Option<usize>, MatchError> {
        if !self.active {
            return Ok(None);
        }
        let facts = WeatherFacts::from_payload(payload)?;
        Ok(self.conditions.iter().position(|c| c.matches(&facts)))
    }

    /// Whether any clause matches; malformed payloads never match
    pub fn matches(&self, payload: &Value) -> bool {
        match self.evaluate(payload) {
            Ok(found) => found.is_some(),
            Err(e) => {
                tracing::debug!(rule_id = %self.id, error = %e, "Rule could not be evaluated");
                false
            }
        }
    }

    /// Clauses joined with " OR "
    pub fn describe(&self) -> String {
        self.conditions
            .iter()
            .map(ConditionClause::describe)
            .collect::<Vec<_>>()
            .join(" OR ")
    }

    /// Sentence for the first matching clause, or a generic update
    pub fn notification_message(&self, payload: &Value) -> String {
        let place = self.location.full_name();
        let facts = match WeatherFacts::from_payload(payload) {
            Ok(facts) => facts,
            Err(_) => return format!("Weather update for {place}"),
        };

        self.conditions
            .iter()
            .find(|c| c.matches(&facts))
            .map(|c| c.message(&place, &facts))
            .unwrap_or_else(|| format!("Weather update for {place}"))
    }
}

impl PartialEq for NotificationRule {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for NotificationRule {}
