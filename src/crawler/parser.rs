//! Map-search response parser
//!
//! The payload is an untyped nested JSON array with no schema; businesses are
//! found by position. Decoding is total: a malformed field is left empty, an
//! entry without a name is skipped, and an unreadable payload yields no
//! records and no further pages.
//!
//! Layout of one business (`root[0][1][i][14]`, `i >= 1`):
//!
//! | Field        | Path        |
//! |--------------|-------------|
//! | name         | 11          |
//! | rating       | 4.7         |
//! | reviews      | 4.8         |
//! | category     | 13.0        |
//! | categories   | 13.*        |
//! | address      | 18          |
//! | price range  | 4.2         |
//! | lat / lng    | 9.2 / 9.3   |
//! | cid          | 10          |
//! | website      | 7.0         |
//! | phone        | 178.0.0     |
//! | place id     | 78          |
//! | description  | 32.1.1      |
//! | open hours   | 203.0, 34.1 |
//! | thumbnail    | 157         |
//! | city         | 183.1.3     |
//! | postal code  | 183.1.4     |
//! | country code | 183.1.6     |

use crate::crawler::pb::PAGE_SIZE;
use crate::model::Business;
use serde_json::Value;

const MAP_URL_PREFIX: &str = "https://www.google.com/maps/place/?q=place_id:";

/// Parses one page of map results
///
/// # Returns
///
/// The businesses found and whether another page may exist.
pub fn parse_map_response(body: &[u8], query: &str) -> (Vec<Business>, bool) {
    let body = strip_prefix_line(body);

    let root: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!("Unreadable map payload: {}", e);
            return (Vec::new(), false);
        }
    };

    let Some(entries) = value_at(&root, &[0, 1]).and_then(Value::as_array) else {
        return (Vec::new(), false);
    };

    let businesses: Vec<Business> = entries
        .iter()
        .skip(1)
        .filter_map(|entry| value_at(entry, &[14]))
        .filter_map(|biz| parse_business(biz, query))
        .collect();

    let has_more = businesses.len() >= PAGE_SIZE as usize;
    (businesses, has_more)
}

/// Drops a short guard line such as `)]}'` that precedes the JSON
fn strip_prefix_line(body: &[u8]) -> &[u8] {
    match body.iter().position(|&b| b == b'\n') {
        Some(idx) if idx < 10 => &body[idx + 1..],
        _ => body,
    }
}

fn parse_business(biz: &Value, query: &str) -> Option<Business> {
    if !biz.is_array() {
        return None;
    }

    let text = |path: &[usize]| value_at(biz, path).map(as_string).unwrap_or_default();
    let number = |path: &[usize]| value_at(biz, path).map(as_f64).unwrap_or_default();

    let name = text(&[11]);
    if name.is_empty() {
        return None;
    }

    let categories = value_at(biz, &[13])
        .and_then(Value::as_array)
        .map(|cats| {
            cats.iter()
                .map(as_string)
                .filter(|c| !c.is_empty())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();

    let open_hours = value_at(biz, &[203, 0])
        .filter(|v| !v.is_null())
        .or_else(|| value_at(biz, &[34, 1]).filter(|v| !v.is_null()))
        .map(Value::to_string)
        .unwrap_or_default();

    let place_id = text(&[78]);

    Some(Business {
        name,
        rating: number(&[4, 7]),
        review_count: number(&[4, 8]) as i64,
        category: text(&[13, 0]),
        categories,
        address: text(&[18]),
        price_range: text(&[4, 2]),
        lat: number(&[9, 2]),
        lng: number(&[9, 3]),
        cid: text(&[10]),
        phone: text(&[178, 0, 0]),
        website: text(&[7, 0]),
        map_url: map_url(&place_id),
        description: text(&[32, 1, 1]),
        place_id,
        open_hours,
        thumbnail: text(&[157]),
        city: text(&[183, 1, 3]),
        postal_code: text(&[183, 1, 4]),
        country_code: text(&[183, 1, 6]),
        query: query.to_string(),
    })
}

/// Canonical map URL for a place, empty when the id is missing
pub fn map_url(place_id: &str) -> String {
    if place_id.is_empty() {
        return String::new();
    }
    format!("{}{}", MAP_URL_PREFIX, place_id)
}

/// Follows an index path through nested arrays
///
/// Returns `None` as soon as a step is not an array or is out of range.
pub fn value_at<'a>(value: &'a Value, path: &[usize]) -> Option<&'a Value> {
    path.iter()
        .try_fold(value, |current, &idx| current.as_array()?.get(idx))
}

/// Coerces a leaf to text; numbers are rendered, anything else is empty
pub fn as_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// Coerces a leaf to a float; numeric strings are parsed, anything else is zero
pub fn as_f64(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or_default(),
        Value::String(s) => s.trim().parse().unwrap_or_default(),
        _ => 0.0,
    }
}
