//! Numeric floorplan fields: rent, area, bed and bath counts.
//!
//! Each function returns the numeric text to store in the record, or `None`
//! when nothing usable is found. Coercion to a number happens at export.

use aptsheet_shared::PriceSelector;

use crate::normalize::simplify;

/// Resolve rent text such as `$1,200 - 1,400` to one price.
///
/// When only one side of a range is a number (`$1,200 - Call`), that side
/// is the price.
pub fn select_price(text: &str, selector: PriceSelector) -> Option<String> {
    let text = simplify(&text.replace(['–', '—'], "-"));
    let after_dollar = match text.find('$') {
        Some(i) => &text[i + 1..],
        None => text.as_str(),
    };
    let cleaned = after_dollar.replace(',', "");

    let values: Vec<f64> = cleaned
        .split('-')
        .filter_map(|part| leading_number(part.trim().trim_start_matches('$')))
        .collect();

    let price = match values.as_slice() {
        [] => return None,
        [single] => *single,
        [low, high, ..] => match selector {
            PriceSelector::Lowest => low.min(*high),
            PriceSelector::Highest => low.max(*high),
            PriceSelector::Average => (low + high) / 2.0,
        },
    };

    Some(format_number(price))
}

/// Area text such as `1,050 Sq Ft` → `1050`.
pub fn normalize_area(text: &str) -> Option<String> {
    let cleaned = simplify(text).replace(',', "");
    let digits: String = cleaned
        .trim()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    if digits.is_empty() { None } else { Some(digits) }
}

/// Bed or bath text such as `1½ Baths` → `1.5`; `Studio` → `0`.
pub fn normalize_count(text: &str) -> Option<String> {
    let text = simplify(&text.replace('½', ".5"));
    let token = text.split_whitespace().next()?;
    if token.eq_ignore_ascii_case("studio") {
        return Some("0".to_string());
    }
    Some(token.to_string())
}

fn leading_number(text: &str) -> Option<f64> {
    let end = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    text[..end].parse().ok()
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}
