use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::timestamp;

pub const DEFAULT_STATUS: &str = "Pending";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub customer_name: String,
    #[serde(default)]
    pub car_details: CarDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "timestamp::option"
    )]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_slot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<i64>,
    #[serde(default)]
    pub add_ons: Vec<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// Vehicle attributes. Only `make`, `model`, `year` and `type` are
/// recognized; anything else the client sent is kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CarDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i64>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CarDetails {
    /// "Toyota Corolla (2020)", whichever parts are known.
    pub fn describe(&self) -> Option<String> {
        let mut parts: Vec<String> = [&self.make, &self.model]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .cloned()
            .collect();
        if let Some(year) = self.year {
            parts.push(format!("({year})"));
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

/// A normalized write. `None` means "not supplied"; for `rating` the inner
/// `None` means "clear it".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingChanges {
    pub customer_name: Option<String>,
    pub car_details: Option<CarDetails>,
    pub service_type: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub time_slot: Option<String>,
    pub duration: Option<f64>,
    pub price: Option<f64>,
    pub status: Option<String>,
    pub rating: Option<Option<i64>>,
    pub add_ons: Option<Vec<String>>,
}

impl BookingChanges {
    /// Builds a new record. Returns `None` without a customer name, which
    /// the create-mode validation already guarantees.
    pub fn into_booking(self, id: String, now: DateTime<Utc>) -> Option<Booking> {
        let customer_name = self.customer_name?;
        Some(Booking {
            id,
            customer_name,
            car_details: self.car_details.unwrap_or_default(),
            service_type: self.service_type,
            date: self.date,
            time_slot: self.time_slot,
            duration: self.duration,
            price: self.price,
            status: self
                .status
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            rating: self.rating.flatten(),
            add_ons: self.add_ons.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Overwrites the supplied fields; everything else keeps its value.
    pub fn apply(self, booking: &mut Booking, now: DateTime<Utc>) {
        if let Some(name) = self.customer_name {
            booking.customer_name = name;
        }
        if let Some(car) = self.car_details {
            booking.car_details = car;
        }
        if let Some(service) = self.service_type {
            booking.service_type = Some(service);
        }
        if let Some(date) = self.date {
            booking.date = Some(date);
        }
        if let Some(slot) = self.time_slot {
            booking.time_slot = Some(slot);
        }
        if let Some(duration) = self.duration {
            booking.duration = Some(duration);
        }
        if let Some(price) = self.price {
            booking.price = Some(price);
        }
        if let Some(status) = self.status {
            booking.status = status;
        }
        if let Some(rating) = self.rating {
            booking.rating = rating;
        }
        if let Some(add_ons) = self.add_ons {
            booking.add_ons = add_ons;
        }
        booking.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        timestamp::parse_lenient("2024-05-01T12:00:00Z").unwrap()
    }

    #[test]
    fn test_into_booking_defaults() {
        let changes = BookingChanges {
            customer_name: Some("Dana".to_string()),
            ..Default::default()
        };
        let booking = changes.into_booking("b-1".to_string(), now()).unwrap();
        assert_eq!(booking.status, "Pending");
        assert_eq!(booking.car_details, CarDetails::default());
        assert!(booking.add_ons.is_empty());
        assert_eq!(booking.created_at, booking.updated_at);
    }

    #[test]
    fn test_into_booking_requires_name() {
        assert!(BookingChanges::default()
            .into_booking("b-1".to_string(), now())
            .is_none());
    }

    #[test]
    fn test_apply_only_touches_supplied_fields() {
        let mut booking = BookingChanges {
            customer_name: Some("Dana".to_string()),
            price: Some(40.0),
            rating: Some(Some(4)),
            add_ons: Some(vec!["Wax".to_string()]),
            ..Default::default()
        }
        .into_booking("b-1".to_string(), now())
        .unwrap();

        let later = timestamp::parse_lenient("2024-05-02").unwrap();
        BookingChanges {
            status: Some("Confirmed".to_string()),
            rating: Some(None),
            ..Default::default()
        }
        .apply(&mut booking, later);

        assert_eq!(booking.customer_name, "Dana");
        assert_eq!(booking.price, Some(40.0));
        assert_eq!(booking.add_ons, vec!["Wax".to_string()]);
        assert_eq!(booking.status, "Confirmed");
        assert_eq!(booking.rating, None);
        assert_eq!(booking.updated_at, later);
        assert_eq!(booking.created_at, now());
    }

    #[test]
    fn test_wire_shape() {
        let mut car = CarDetails {
            make: Some("Honda".to_string()),
            kind: Some("suv".to_string()),
            ..Default::default()
        };
        car.extra.insert("color".to_string(), json!("red"));

        let booking = BookingChanges {
            customer_name: Some("Dana".to_string()),
            car_details: Some(car),
            time_slot: Some("Morning".to_string()),
            ..Default::default()
        }
        .into_booking("b-1".to_string(), now())
        .unwrap();

        let value = serde_json::to_value(&booking).unwrap();
        assert_eq!(value["customerName"], "Dana");
        assert_eq!(value["carDetails"]["type"], "suv");
        assert_eq!(value["carDetails"]["color"], "red");
        assert_eq!(value["timeSlot"], "Morning");
        assert_eq!(value["createdAt"], "2024-05-01T12:00:00.000Z");
        assert!(value.get("price").is_none());
        assert!(value.get("date").is_none());

        let back: Booking = serde_json::from_value(value).unwrap();
        assert_eq!(back, booking);
    }

    #[test]
    fn test_describe_car() {
        let car = CarDetails {
            make: Some("Toyota".to_string()),
            model: Some("Corolla".to_string()),
            year: Some(2020),
            ..Default::default()
        };
        assert_eq!(car.describe().as_deref(), Some("Toyota Corolla (2020)"));
        assert_eq!(CarDetails::default().describe(), None);
    }
}
