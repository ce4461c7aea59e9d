use crate::models::Booking;

pub struct Invoice {
    pub filename: String,
    pub body: String,
}

/// `Ana María Ruiz` -> `Ana_María_Ruiz`. Quotes, backslashes and control
/// characters are dropped so the name fits a quoted header parameter.
fn filename_part(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| !matches!(c, '"' | '\\') && !c.is_control())
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

fn money(amount: f64) -> String {
    format!("${amount:.2}")
}

pub fn render_invoice(booking: &Booking, business_name: &str) -> Invoice {
    let customer = match filename_part(&booking.customer_name) {
        name if name.is_empty() => "Customer".to_string(),
        name => name,
    };
    let date_part = booking
        .date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "unknown_date".to_string());
    let filename = format!(
        "{}_Invoice_{customer}_{date_part}.txt",
        filename_part(business_name)
    );

    let mut lines = vec![
        business_name.to_string(),
        "Booking Invoice".to_string(),
        String::new(),
        format!("Reference:  {}", booking.id),
        format!("Issued:     {}", booking.updated_at.format("%Y-%m-%d")),
        String::new(),
        format!("Customer:   {}", booking.customer_name),
    ];
    if let Some(car) = booking.car_details.describe() {
        lines.push(format!("Vehicle:    {car}"));
    }
    if let Some(kind) = &booking.car_details.kind {
        lines.push(format!("Car type:   {kind}"));
    }
    if let Some(service) = &booking.service_type {
        lines.push(format!("Service:    {service}"));
    }
    match (&booking.date, &booking.time_slot) {
        (Some(date), Some(slot)) => lines.push(format!("Date:       {} ({slot})", date.format("%Y-%m-%d"))),
        (Some(date), None) => lines.push(format!("Date:       {}", date.format("%Y-%m-%d"))),
        (None, Some(slot)) => lines.push(format!("Time slot:  {slot}")),
        (None, None) => {}
    }
    if let Some(duration) = booking.duration {
        lines.push(format!("Duration:   {duration} minutes"));
    }
    lines.push(format!("Status:     {}", booking.status));

    if !booking.add_ons.is_empty() {
        lines.push(String::new());
        lines.push("Add-ons:".to_string());
        lines.extend(booking.add_ons.iter().map(|a| format!("  - {a}")));
    }

    lines.push(String::new());
    lines.push(format!(
        "Total:      {}",
        booking.price.map(money).unwrap_or_else(|| "-".to_string())
    ));
    lines.push(String::new());

    Invoice {
        filename,
        body: lines.join("\n"),
    }
}
