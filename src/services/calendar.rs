use chrono::TimeDelta;

use crate::models::Booking;

const DEFAULT_DURATION_MINUTES: i64 = 60;

/// Escapes TEXT values per RFC 5545.
fn escape_text(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace('\n', "\\n")
}

/// Builds a single-event calendar for the booking, or `None` if it has no date.
pub fn generate_ics(booking: &Booking, business_name: &str) -> Option<String> {
    let start = booking.date?;
    // A length the calendar cannot represent falls back to the default.
    let end = booking
        .duration
        .map(f64::round)
        .filter(|d| *d > 0.0 && *d < i64::MAX as f64)
        .and_then(|d| TimeDelta::try_minutes(d as i64))
        .and_then(|length| start.checked_add_signed(length))
        .or_else(|| start.checked_add_signed(TimeDelta::minutes(DEFAULT_DURATION_MINUTES)))?;

    let dtstart = start.format("%Y%m%dT%H%M%SZ").to_string();
    let dtend = end.format("%Y%m%dT%H%M%SZ").to_string();
    let dtstamp = booking.updated_at.format("%Y%m%dT%H%M%SZ").to_string();
    let uid = format!("{}@sparkle-drive", booking.id);

    let service = booking.service_type.as_deref().unwrap_or("Car wash");
    let summary = escape_text(&format!(
        "{service} for {} at {business_name}",
        booking.customer_name
    ));

    let mut details = Vec::new();
    if let Some(car) = booking.car_details.describe() {
        details.push(format!("Vehicle: {car}"));
    }
    if let Some(slot) = &booking.time_slot {
        details.push(format!("Time slot: {slot}"));
    }
    if !booking.add_ons.is_empty() {
        details.push(format!("Add-ons: {}", booking.add_ons.join(", ")));
    }
    details.push(format!("Status: {}", booking.status));
    let description = escape_text(&details.join("\n"));

    Some(format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//Sparkle Drive//Bookings//EN\r\n\
         BEGIN:VEVENT\r\n\
         UID:{uid}\r\n\
         DTSTAMP:{dtstamp}\r\n\
         DTSTART:{dtstart}\r\n\
         DTEND:{dtend}\r\n\
         SUMMARY:{summary}\r\n\
         DESCRIPTION:{description}\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n"
    ))
}
