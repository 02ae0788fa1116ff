//! Info panel rendering
//!
//! Panels are small HTML fragments of labeled rows; the surface drops them
//! into its detail and weather containers as-is.

use std::fmt::Write;

use crate::feed::{TrackRecord, WeatherReport};
use crate::vessel::VesselRecord;

/// Detail panel for a selected flight
pub fn flight_info_html(flight: &TrackRecord) -> String {
    render_rows(&[
        ("Callsign", flight.callsign.clone()),
        ("Country", flight.origin_country.clone()),
        ("Altitude", format!("{:.0} m", flight.altitude_m)),
        ("Speed", format!("{:.0} km/h", flight.velocity_kmh())),
        ("Heading", format!("{:.0}°", flight.heading_deg)),
        ("Position", format_position(flight.position.lat, flight.position.lon)),
    ])
}

/// Detail panel for the fixed vessel
pub fn vessel_info_html(vessel: &VesselRecord) -> String {
    render_rows(&[
        ("Name", vessel.name.clone()),
        ("Type", vessel.vessel_type.clone()),
        ("Callsign", vessel.callsign.clone()),
        ("Heading", format!("{:.0}°", vessel.heading_deg)),
        ("Speed", format!("{:.1} kn", vessel.speed_knots)),
        ("Position", format_position(vessel.lat, vessel.lon)),
    ])
}

/// Weather panel for the selected position
pub fn weather_html(weather: &WeatherReport) -> String {
    render_rows(&[
        ("Temperature", weather.temperature.clone()),
        ("Feels Like", weather.feels_like.clone()),
        ("Condition", weather.condition.clone()),
        ("Wind Speed", weather.wind_speed.clone()),
        ("Humidity", weather.humidity.clone()),
        ("Pressure", weather.pressure.clone()),
    ])
}

fn format_position(lat: f64, lon: f64) -> String {
    format!("{:.4}, {:.4}", lat, lon)
}

fn render_rows(rows: &[(&str, String)]) -> String {
    let mut html = String::with_capacity(rows.len() * 80);
    for (label, value) in rows {
        let _ = write!(
            html,
            "<div class=\"flight-detail\"><span>{}:</span> <span>{}</span></div>",
            label,
            escape_html(value)
        );
    }
    html
}

/// Escape text for use inside element content
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
