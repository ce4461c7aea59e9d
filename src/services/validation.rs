//! Checks and coerces raw booking payloads before they reach the store.
//!
//! Validation happens in two passes. The schema pass rejects payloads with
//! missing or wrongly shaped fields and reports every problem at once. The
//! coercion pass then turns form-style text into numbers and dates, quietly
//! dropping any value that still does not make sense.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::models::timestamp;
use crate::models::{BookingChanges, CarDetails, DEFAULT_STATUS};

pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid payload")]
pub struct ValidationError {
    pub fields: FieldErrors,
}

impl ValidationError {
    pub fn single(field: &str, message: &str) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.to_string(), vec![message.to_string()]);
        Self { fields }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Full schema: `customerName` is required.
    Create,
    /// Partial schema: every field is optional.
    Update,
}

pub fn normalize_create(payload: &Value) -> Result<BookingChanges, ValidationError> {
    normalize(payload, Mode::Create)
}

pub fn normalize_update(payload: &Value) -> Result<BookingChanges, ValidationError> {
    normalize(payload, Mode::Update)
}

pub fn normalize(payload: &Value, mode: Mode) -> Result<BookingChanges, ValidationError> {
    let checked = check_schema(payload, mode)?;
    Ok(coerce(checked, mode))
}

enum CarInput {
    Details(CarDetails),
    Text(String),
}

enum NumberInput {
    Number(f64),
    Text(String),
}

#[derive(Default)]
struct CheckedPayload {
    customer_name: Option<String>,
    car_details: Option<CarInput>,
    car_type: Option<String>,
    service_type: Option<String>,
    date: Option<String>,
    time_slot: Option<String>,
    duration: Option<NumberInput>,
    price: Option<NumberInput>,
    status: Option<String>,
    rating: Option<Option<i64>>,
    add_ons: Option<Vec<String>>,
}

fn push(errors: &mut FieldErrors, field: &str, message: &str) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.to_string());
}

fn check_schema(payload: &Value, mode: Mode) -> Result<CheckedPayload, ValidationError> {
    let Some(obj) = payload.as_object() else {
        return Err(ValidationError::single("body", "expected a JSON object"));
    };

    let mut errors = FieldErrors::new();
    let mut checked = CheckedPayload::default();

    for (key, value) in obj {
        let field = key.as_str();
        match field {
            "customerName" => match value.as_str() {
                Some("") => push(&mut errors, field, "must not be empty"),
                Some(name) => checked.customer_name = Some(name.to_string()),
                None => push(&mut errors, field, "expected text"),
            },
            "carDetails" => match value {
                Value::String(text) => checked.car_details = Some(CarInput::Text(text.clone())),
                Value::Object(map) => {
                    if let Some(details) = check_car_details(map, &mut errors) {
                        checked.car_details = Some(CarInput::Details(details));
                    }
                }
                _ => push(&mut errors, field, "expected an object or text"),
            },
            "carType" => checked.car_type = text(value, field, &mut errors),
            "serviceType" => checked.service_type = text(value, field, &mut errors),
            "date" => checked.date = text(value, field, &mut errors),
            "timeSlot" => checked.time_slot = text(value, field, &mut errors),
            "status" => checked.status = text(value, field, &mut errors),
            "duration" => checked.duration = number_or_text(value, field, &mut errors),
            "price" => checked.price = number_or_text(value, field, &mut errors),
            "rating" => match value {
                Value::Null => checked.rating = Some(None),
                _ => match as_integer(value) {
                    Some(r) if (1..=5).contains(&r) => checked.rating = Some(Some(r)),
                    Some(_) => push(&mut errors, field, "must be between 1 and 5"),
                    None => push(&mut errors, field, "expected a whole number or null"),
                },
            },
            "addOns" => match value.as_array() {
                Some(items) => {
                    let labels: Option<Vec<String>> = items
                        .iter()
                        .map(|item| item.as_str().map(str::to_string))
                        .collect();
                    match labels {
                        Some(labels) => checked.add_ons = Some(labels),
                        None => push(&mut errors, field, "expected a list of text"),
                    }
                }
                None => push(&mut errors, field, "expected a list of text"),
            },
            _ => push(&mut errors, field, "unrecognized field"),
        }
    }

    if mode == Mode::Create && !obj.contains_key("customerName") {
        push(&mut errors, "customerName", "is required");
    }

    if errors.is_empty() {
        Ok(checked)
    } else {
        Err(ValidationError { fields: errors })
    }
}

fn check_car_details(map: &Map<String, Value>, errors: &mut FieldErrors) -> Option<CarDetails> {
    let before = errors.len();
    let mut details = CarDetails::default();

    for (key, value) in map {
        match key.as_str() {
            "make" => details.make = text(value, "carDetails.make", errors),
            "model" => details.model = text(value, "carDetails.model", errors),
            "type" => details.kind = text(value, "carDetails.type", errors),
            "year" => match as_integer(value) {
                Some(year) => details.year = Some(year),
                None => push(errors, "carDetails.year", "expected a whole number"),
            },
            _ => {
                details.extra.insert(key.clone(), value.clone());
            }
        }
    }

    (errors.len() == before).then_some(details)
}

fn text(value: &Value, field: &str, errors: &mut FieldErrors) -> Option<String> {
    match value.as_str() {
        Some(s) => Some(s.to_string()),
        None => {
            push(errors, field, "expected text");
            None
        }
    }
}

fn number_or_text(value: &Value, field: &str, errors: &mut FieldErrors) -> Option<NumberInput> {
    match value {
        Value::Number(n) => n.as_f64().map(NumberInput::Number),
        Value::String(s) => Some(NumberInput::Text(s.clone())),
        _ => {
            push(errors, field, "expected a number or text");
            None
        }
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    (f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

fn coerce(checked: CheckedPayload, mode: Mode) -> BookingChanges {
    let car_details = checked.car_details.map(|car| match car {
        CarInput::Details(details) => details,
        CarInput::Text(make) => CarDetails {
            make: Some(make),
            kind: checked.car_type.clone(),
            ..Default::default()
        },
    });

    let status = match (checked.status, mode) {
        (Some(s), _) if !s.is_empty() => Some(s),
        (Some(_), _) | (None, Mode::Create) => Some(DEFAULT_STATUS.to_string()),
        (None, Mode::Update) => None,
    };

    BookingChanges {
        customer_name: checked.customer_name,
        car_details,
        service_type: checked.service_type,
        date: checked.date.as_deref().and_then(coerce_date),
        time_slot: checked.time_slot,
        duration: checked.duration.and_then(coerce_amount),
        price: checked.price.and_then(coerce_amount),
        status,
        rating: checked.rating,
        add_ons: checked.add_ons,
    }
}

/// A usable amount is finite and not negative; anything else is dropped.
fn coerce_amount(input: NumberInput) -> Option<f64> {
    let value = match input {
        NumberInput::Number(n) => n,
        NumberInput::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok()?
        }
    };
    (value.is_finite() && value >= 0.0).then_some(value)
}

fn coerce_date(input: &str) -> Option<DateTime<Utc>> {
    timestamp::parse_lenient(input)
}
