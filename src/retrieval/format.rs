//! Per-domain rendering of retrieval records.
//!
//! Each raw payload is rendered into a human-readable block with a fixed
//! section layout per domain. Fields absent from the payload are omitted
//! rather than rendered as empty placeholders; the reasoning layer reads
//! these blocks, and blank boilerplate only wastes its context.

use std::fmt::Write;

use regex::Regex;
use serde::Deserialize;

use super::store::RetrievalRecord;
use crate::domain::Domain;

/// Sentinel price the upstream catalog uses for "not really priced".
const PLACEHOLDER_PRICE: f64 = 99_999.0;

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Payload {
    service_details: ServiceDetails,
    descriptions: Descriptions,
    location: LocationInfo,
    availability: Availability,
    pricing_periods: Vec<PricingPeriod>,
    includes: Includes,
    facilities: Facilities,
    age_restrictions: AgeRestrictions,
    logistics: Logistics,
    financial_info: FinancialInfo,
    supplier_info: SupplierInfo,
    metadata: Metadata,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ServiceDetails {
    supplier_name: Option<String>,
    service_code: Option<String>,
    full_service_description: Option<String>,
    service_description: Option<String>,
    service_notes: Option<String>,
    service_type: Option<String>,
    service_type_code: Option<String>,
    service_class: Option<String>,
    duration: Option<String>,
    location_name: Option<String>,
    destination_name: Option<String>,
    destination_code: Option<String>,
    meal_plan: Option<String>,
    star_rating: Option<f64>,
    category: Option<String>,
    room_type: Option<String>,
    max_adult_capacity: Option<f64>,
    available_languages: Vec<Option<String>>,
    includes_transport: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Descriptions {
    english: LangDescription,
    english_description: Option<String>,
    spanish_description: Option<String>,
    english_title: Option<String>,
    spanish_title: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LangDescription {
    description: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LocationInfo {
    address: Option<String>,
    google_maps_url: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Availability {
    monday: Option<bool>,
    tuesday: Option<bool>,
    wednesday: Option<bool>,
    thursday: Option<bool>,
    friday: Option<bool>,
    saturday: Option<bool>,
    sunday: Option<bool>,
    response_time: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PricingPeriod {
    valid_from: Option<String>,
    valid_to: Option<String>,
    rate_status: Option<String>,
    pricing_variations: Vec<PricingVariation>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PricingVariation {
    pricing: Vec<PriceItem>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PriceItem {
    service_item: Option<String>,
    total_price: Option<f64>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Includes {
    english: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Facilities {
    amenities: Option<String>,
    num_rooms: Option<f64>,
    available_food: Option<String>,
    check_in_time: Option<String>,
    check_out_time: Option<String>,
    breakfast_hours: Option<String>,
    wifi: Option<bool>,
    pool: Option<bool>,
    parking: Option<bool>,
    gym: Option<bool>,
    spa: Option<bool>,
    restaurant: Option<bool>,
    bar: Option<bool>,
    room_service: Option<bool>,
    air_conditioning: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AgeRestrictions {
    adult: AgeRange,
    child: AgeRange,
    infant: AgeRange,
    children_allowed: Option<bool>,
    max_persons: Option<f64>,
    age_policy: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AgeRange {
    from: Option<f64>,
    to: Option<f64>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Logistics {
    pickup_point: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct FinancialInfo {
    currency_info: CurrencyInfo,
    billing: Billing,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CurrencyInfo {
    sell_currency: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Billing {
    rate_type: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SupplierInfo {
    group: Option<String>,
    potential_supplier: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Metadata {
    impact_group: Option<String>,
}

fn non_blank(field: Option<&String>) -> Option<&str> {
    field.map(String::as_str).map(str::trim).filter(|s| !s.is_empty())
}

/// Pushes a `*Label:* value` line when the value is present.
fn push_field(out: &mut String, label: &str, value: Option<&str>) {
    if let Some(value) = value {
        let _ = writeln!(out, "*{label}:* {value}");
    }
}

/// Renders available days as "Monday through Sunday" or a comma list.
fn format_days(availability: &Availability) -> Option<String> {
    let days = [
        ("Monday", availability.monday),
        ("Tuesday", availability.tuesday),
        ("Wednesday", availability.wednesday),
        ("Thursday", availability.thursday),
        ("Friday", availability.friday),
        ("Saturday", availability.saturday),
        ("Sunday", availability.sunday),
    ];
    let active: Vec<&str> = days
        .iter()
        .filter(|(_, on)| *on == Some(true))
        .map(|(name, _)| *name)
        .collect();
    match active.len() {
        0 => None,
        7 => Some("Monday through Sunday".to_string()),
        _ => Some(active.join(", ")),
    }
}

/// Formats a price as `$1,234.00`, flagging the catalog placeholder.
fn format_price(price: f64) -> String {
    let whole = price.trunc().abs() as u64;
    let cents = ((price.abs() - price.trunc().abs()) * 100.0).round() as u64;
    let mut grouped = String::new();
    let digits = whole.to_string();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let mut rendered = format!("${grouped}.{cents:02}");
    if (price - PLACEHOLDER_PRICE).abs() < f64::EPSILON {
        rendered.push_str(" (possible placeholder)");
    }
    rendered
}

/// Renders the pricing rows of the first pricing period as bullets.
fn push_pricing(out: &mut String, payload: &Payload) {
    let Some(period) = payload.pricing_periods.first() else {
        return;
    };
    let Some(variation) = period.pricing_variations.first() else {
        return;
    };
    if variation.pricing.is_empty() {
        return;
    }

    let currency = non_blank(payload.financial_info.currency_info.sell_currency.as_ref());
    match currency {
        Some(currency) => {
            let _ = writeln!(out, "*Pricing ({currency}):*");
        }
        None => out.push_str("*Pricing:*\n"),
    }

    let range_re = Regex::new(r"\((\d+)-(\d+)\)").ok();
    let mut rows: Vec<&PriceItem> = variation.pricing.iter().collect();
    rows.sort_by_key(|item| {
        item.service_item
            .as_deref()
            .and_then(|s| {
                Regex::new(r"(\d+)")
                    .ok()
                    .and_then(|re| re.captures(s))
                    .and_then(|c| c.get(1))
                    .and_then(|m| m.as_str().parse::<u32>().ok())
            })
            .unwrap_or(999)
    });

    for item in rows {
        let Some(price) = item.total_price else {
            continue;
        };
        let label = item.service_item.as_deref().unwrap_or("Rate");
        let rendered_label = range_re
            .as_ref()
            .and_then(|re| re.captures(label))
            .map_or_else(
                || label.to_string(),
                |caps| {
                    let min = caps.get(1).map_or("", |m| m.as_str());
                    let max = caps.get(2).map_or("", |m| m.as_str());
                    if min == max {
                        format!("{min} pax")
                    } else {
                        format!("{min}-{max} pax")
                    }
                },
            );
        let _ = writeln!(out, "• {rendered_label}: {}", format_price(price));
    }
}

fn push_age_capacity(out: &mut String, ages: &AgeRestrictions) {
    if let Some(from) = ages.adult.from.filter(|v| *v > 0.0) {
        let _ = writeln!(out, "*Min Age:* {from}+");
    }
    if let (Some(from), Some(to)) = (ages.child.from.filter(|v| *v > 0.0), ages.child.to) {
        let _ = writeln!(out, "*Child Age Range:* {from}-{to}");
    }
    if let (Some(from), Some(to)) = (ages.infant.from.filter(|v| *v > 0.0), ages.infant.to) {
        let _ = writeln!(out, "*Infant Age Range:* {from}-{to}");
    }
    if ages.children_allowed == Some(false) {
        out.push_str("*Children Allowed:* No\n");
    }
    if let Some(max) = ages.max_persons.filter(|v| *v > 0.0) {
        let _ = writeln!(out, "*Max Persons:* {}", max as u64);
    }
    push_field(out, "Age Policy", non_blank(ages.age_policy.as_ref()));
}

fn push_availability(out: &mut String, availability: &Availability, period: Option<&PricingPeriod>) {
    push_field(out, "Days Available", format_days(availability).as_deref());
    push_field(out, "Response Time", non_blank(availability.response_time.as_ref()));
    if let Some(period) = period
        && let (Some(from), Some(to)) = (
            non_blank(period.valid_from.as_ref()),
            non_blank(period.valid_to.as_ref()),
        )
    {
        let from = from.split('T').next().unwrap_or(from);
        let to = to.split('T').next().unwrap_or(to);
        let _ = writeln!(out, "*Valid Dates:* {from} - {to}");
        push_field(out, "Rate Status", non_blank(period.rate_status.as_ref()));
    }
}

fn push_classification(out: &mut String, payload: &Payload) {
    push_field(
        out,
        "Provider Type",
        non_blank(payload.metadata.impact_group.as_ref()),
    );
    push_field(
        out,
        "Supplier Group",
        non_blank(payload.supplier_info.group.as_ref()),
    );
    push_field(
        out,
        "Provider Status",
        non_blank(payload.supplier_info.potential_supplier.as_ref()),
    );
    push_field(
        out,
        "Service Type",
        non_blank(payload.service_details.service_type.as_ref()),
    );
}

/// Renders an experience record into its formatted block.
#[must_use]
pub fn format_experience(record: &RetrievalRecord) -> String {
    let payload: Payload = serde_json::from_value(record.payload.clone()).unwrap_or_default();
    let details = &payload.service_details;

    let mut out = String::from("-------------START OF EXPERIENCE-------------------\n");
    let _ = writeln!(out, "*ID:* {}", record.id);
    push_field(&mut out, "Operator", non_blank(details.supplier_name.as_ref()));
    push_field(&mut out, "Code", non_blank(details.service_code.as_ref()));
    push_field(
        &mut out,
        "Service",
        non_blank(details.full_service_description.as_ref()),
    );

    if let Some(description) = non_blank(payload.descriptions.english.description.as_ref()) {
        let _ = writeln!(out, "\n*Description:* {description}");
    }

    out.push('\n');
    match (
        non_blank(details.location_name.as_ref()),
        non_blank(details.destination_name.as_ref()),
    ) {
        (Some(location), Some(destination)) => {
            let _ = writeln!(out, "*Location:* {location}, {destination}");
        }
        (Some(place), None) | (None, Some(place)) => {
            let _ = writeln!(out, "*Location:* {place}");
        }
        (None, None) => {}
    }
    push_field(&mut out, "Pickup Point", non_blank(payload.logistics.pickup_point.as_ref()));
    if details.includes_transport == Some(true) {
        out.push_str("*Includes Transport:* Yes\n");
    }
    push_field(&mut out, "Duration", non_blank(details.duration.as_ref()));

    push_availability(&mut out, &payload.availability, payload.pricing_periods.first());
    push_age_capacity(&mut out, &payload.age_restrictions);
    if let Some(max) = details.max_adult_capacity.filter(|v| *v > 0.0 && *v < 9_999.0) {
        let _ = writeln!(out, "*Max Adults per Group:* {}", max as u64);
    }

    let languages: Vec<&str> = details
        .available_languages
        .iter()
        .filter_map(|l| non_blank(l.as_ref()))
        .collect();
    if !languages.is_empty() {
        let _ = writeln!(out, "*Languages:* {}", languages.join(", "));
    }

    if let Some(includes) = non_blank(payload.includes.english.as_ref()) {
        let _ = writeln!(out, "*Includes:* {includes}");
    }

    push_pricing(&mut out, &payload);
    push_classification(&mut out, &payload);

    out.push_str("---------END OF EXPERIENCE-------------------");
    out
}

/// Renders a lodging record into its formatted block.
#[must_use]
pub fn format_lodging(record: &RetrievalRecord) -> String {
    let payload: Payload = serde_json::from_value(record.payload.clone()).unwrap_or_default();
    let details = &payload.service_details;
    let facilities = &payload.facilities;

    let mut out = String::from("-------------START OF LODGING-------------------\n");
    let _ = writeln!(out, "*ID:* {}", record.id);
    push_field(&mut out, "Hotel/Property", non_blank(details.supplier_name.as_ref()));
    push_field(
        &mut out,
        "Room Type",
        non_blank(details.room_type.as_ref())
            .or_else(|| non_blank(details.full_service_description.as_ref())),
    );
    push_field(&mut out, "Code", non_blank(details.service_code.as_ref()));

    let description = non_blank(payload.descriptions.english_description.as_ref())
        .or_else(|| non_blank(payload.descriptions.spanish_description.as_ref()))
        .or_else(|| non_blank(payload.descriptions.english_title.as_ref()))
        .or_else(|| non_blank(payload.descriptions.spanish_title.as_ref()));
    if let Some(description) = description {
        let _ = writeln!(out, "\n*Description:* {description}");
    }

    out.push('\n');
    match (
        non_blank(details.destination_name.as_ref()),
        non_blank(details.destination_code.as_ref()),
    ) {
        (Some(name), Some(code)) => {
            let _ = writeln!(out, "*Destination:* {name} ({code})");
        }
        (Some(name), None) => {
            let _ = writeln!(out, "*Destination:* {name}");
        }
        _ => {}
    }
    push_field(&mut out, "City/Location", non_blank(details.location_name.as_ref()));
    push_field(&mut out, "Address", non_blank(payload.location.address.as_ref()));
    push_field(&mut out, "Google Maps", non_blank(payload.location.google_maps_url.as_ref()));

    push_field(&mut out, "Category", non_blank(details.category.as_ref()));
    if let Some(class) = non_blank(details.service_class.as_ref()) {
        let display = match class {
            "SUP" => "Superior",
            "STD" => "Standard",
            "DEL" => "Deluxe",
            "LUX" => "Luxury",
            other => other,
        };
        let _ = writeln!(out, "*Service Class:* {display}");
    }
    if let Some(stars) = details.star_rating.filter(|v| *v > 0.0) {
        let _ = writeln!(out, "*Star Rating:* {stars}");
    }
    if let Some(rooms) = facilities.num_rooms.filter(|v| *v > 0.0) {
        let _ = writeln!(out, "*Total Rooms in Property:* {}", rooms as u64);
    }
    push_field(&mut out, "Meal Plan", non_blank(details.meal_plan.as_ref()));
    push_field(&mut out, "Food Options", non_blank(facilities.available_food.as_ref()));
    push_field(&mut out, "Breakfast Hours", non_blank(facilities.breakfast_hours.as_ref()));

    if let Some(amenities) = non_blank(facilities.amenities.as_ref()) {
        out.push_str("*Amenities:*\n");
        for amenity in amenities.split(',').map(str::trim).filter(|a| !a.is_empty()) {
            let _ = writeln!(out, "• {amenity}");
        }
    }
    let flags = [
        ("Parking available", facilities.parking),
        ("WiFi available", facilities.wifi),
        ("Swimming pool", facilities.pool),
        ("Gym/Fitness center", facilities.gym),
        ("Spa services", facilities.spa),
        ("Restaurant", facilities.restaurant),
        ("Bar", facilities.bar),
        ("Room service", facilities.room_service),
        ("Air conditioning", facilities.air_conditioning),
    ];
    let active: Vec<&str> = flags
        .iter()
        .filter(|(_, on)| *on == Some(true))
        .map(|(name, _)| *name)
        .collect();
    if !active.is_empty() {
        out.push_str("*Facilities:*\n");
        for item in active {
            let _ = writeln!(out, "• {item}");
        }
    }
    push_field(&mut out, "Check-in Time", non_blank(facilities.check_in_time.as_ref()));
    push_field(&mut out, "Check-out Time", non_blank(facilities.check_out_time.as_ref()));

    push_availability(&mut out, &payload.availability, payload.pricing_periods.first());
    push_age_capacity(&mut out, &payload.age_restrictions);

    push_field(
        &mut out,
        "Currency",
        non_blank(payload.financial_info.currency_info.sell_currency.as_ref()),
    );
    push_field(
        &mut out,
        "Rate Type",
        non_blank(payload.financial_info.billing.rate_type.as_ref()),
    );
    push_classification(&mut out, &payload);

    out.push_str("---------END OF LODGING-------------------");
    out
}

/// Renders a transport record into its formatted block.
#[must_use]
pub fn format_transport(record: &RetrievalRecord) -> String {
    let payload: Payload = serde_json::from_value(record.payload.clone()).unwrap_or_default();
    let details = &payload.service_details;
    let is_rental_car = details.service_type_code.as_deref() == Some("RC");

    let mut out = String::from("-------------START OF TRANSPORT-------------------\n");
    let _ = writeln!(out, "*ID:* {}", record.id);
    push_field(&mut out, "Operator", non_blank(details.supplier_name.as_ref()));
    push_field(&mut out, "Code", non_blank(details.service_code.as_ref()));
    push_field(
        &mut out,
        "Service",
        non_blank(details.full_service_description.as_ref()),
    );

    let description = non_blank(payload.descriptions.english.description.as_ref())
        .or_else(|| non_blank(payload.descriptions.english.title.as_ref()));
    if let Some(description) = description {
        let _ = writeln!(out, "\n*Description:* {description}");
    }

    out.push('\n');

    // Route from "Origin - Destination" patterns in the descriptions.
    let route_re = Regex::new(r"(\w+)\s*-\s*(\w+)").ok();
    let route = route_re.as_ref().and_then(|re| {
        non_blank(details.service_description.as_ref())
            .and_then(|s| re.captures(s))
            .or_else(|| {
                non_blank(details.full_service_description.as_ref()).and_then(|s| re.captures(s))
            })
    });
    if !is_rental_car
        && let Some(caps) = route
    {
        let origin = caps.get(1).map_or("", |m| m.as_str());
        let destination = caps.get(2).map_or("", |m| m.as_str());
        let _ = writeln!(out, "*Route:* {origin} to {destination}");
    }

    let full_desc = details.full_service_description.as_deref().unwrap_or("");
    if !is_rental_car
        && (full_desc.contains("APT")
            || full_desc.contains("Airport")
            || full_desc.to_lowercase().contains("aeropuerto"))
    {
        out.push_str("*Service Type:* Airport transfer\n");
    }

    if let Some(class) = non_blank(details.service_class.as_ref()) {
        let display = match class {
            "PRI" => Some("Private transport"),
            "SHA" => Some("Shared transport"),
            "COM" => Some("Comfort transport"),
            "DEL" => Some("Deluxe transport"),
            _ => None,
        };
        if let Some(display) = display
            && !is_rental_car
        {
            let _ = writeln!(out, "*Type:* {display}");
        }
    }

    // Vehicle and capacity hints from notes/description text.
    let notes = details.service_notes.as_deref().unwrap_or("");
    let all_text = format!("{notes} {full_desc}");
    if let Some(vehicle) = Regex::new(r"(?i)(Van|Suburban|Bus|SUV|Minivan|Sedan)")
        .ok()
        .and_then(|re| re.captures(&all_text))
        .and_then(|caps| caps.get(1))
    {
        let label = if is_rental_car { "Vehicle Make/Model" } else { "Vehicle Type" };
        let _ = writeln!(out, "*{label}:* {}", vehicle.as_str());
    }
    if let Some(caps) = Regex::new(r"(?i)(\d+)\s*to\s*(\d+)\s*pax")
        .ok()
        .and_then(|re| re.captures(&all_text))
    {
        let min = caps.get(1).map_or("", |m| m.as_str());
        let max = caps.get(2).map_or("", |m| m.as_str());
        let _ = writeln!(out, "*Passenger Range:* {min} to {max} passengers");
    } else if let Some(caps) = Regex::new(r"(?i)(\d+)\s*pax")
        .ok()
        .and_then(|re| re.captures(&all_text))
    {
        let _ = writeln!(
            out,
            "*Passenger Capacity:* {}",
            caps.get(1).map_or("", |m| m.as_str())
        );
    }

    push_field(&mut out, "Pickup Point", non_blank(payload.logistics.pickup_point.as_ref()));
    push_field(&mut out, "Duration", non_blank(details.duration.as_ref()));
    if let Some(notes) = non_blank(details.service_notes.as_ref()) {
        let _ = writeln!(out, "*Logistics Note:* {notes}");
    }

    push_availability(&mut out, &payload.availability, payload.pricing_periods.first());
    push_age_capacity(&mut out, &payload.age_restrictions);
    push_pricing(&mut out, &payload);
    push_classification(&mut out, &payload);

    out.push_str("---------END OF TRANSPORT-------------------");
    out
}

/// Renders a record for its domain.
#[must_use]
pub fn format_record(domain: Domain, record: &RetrievalRecord) -> String {
    match domain {
        Domain::Lodging => format_lodging(record),
        Domain::Transportation => format_transport(record),
        Domain::Experiences | Domain::Database => format_experience(record),
    }
}
