//! Field extraction from upstream event payloads
//!
//! The marketplace API does not publish a stable schema: the fields we care
//! about may sit on the event itself or under `eventData`, and the same
//! concept shows up under several key names. Extraction is therefore
//! driven by a small table of [`FieldRule`]s, each listing where to look and
//! which keys to try, consumed by one generic lookup. When no candidate key
//! yields a token address, a structural scan for address-shaped strings is
//! used as a last resort.
//!
//! Nothing in this module fails: missing or mistyped substructures simply
//! leave the corresponding field absent.

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

/// Smallest-unit divisor for ETH amounts (wei).
pub const WEI_PER_ETH: f64 = 1e18;

/// Structured fields pulled out of one upstream event.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractedFields {
    /// Domain name, e.g. `alpha.eth`
    pub name: Option<String>,
    /// Listing price in ETH
    pub price: Option<f64>,
    /// Seller wallet address
    pub seller_address: Option<String>,
    /// Token or contract address
    pub token_address: Option<String>,
}

impl ExtractedFields {
    /// Returns true when no field could be extracted.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.price.is_none()
            && self.seller_address.is_none()
            && self.token_address.is_none()
    }
}

/// Where inside an event a [`FieldRule`] looks for its keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLocation {
    /// The event object itself
    EventRoot,
    /// The nested `eventData` object
    EventData,
    /// The nested `eventData.payment` object
    Payment,
}

impl FieldLocation {
    fn resolve<'a>(&self, event: &'a JsonValue) -> Option<&'a Map<String, JsonValue>> {
        match self {
            FieldLocation::EventRoot => event.as_object(),
            FieldLocation::EventData => event.get("eventData")?.as_object(),
            FieldLocation::Payment => event.get("eventData")?.get("payment")?.as_object(),
        }
    }
}

/// Candidate keys for one field, tried location by location.
///
/// Locations are tried in order; within a location, keys are tried in
/// order. The first value accepted by the caller's conversion wins.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    /// Locations in priority order
    pub locations: &'static [FieldLocation],
    /// Keys in priority order
    pub keys: &'static [&'static str],
}

impl FieldRule {
    /// Returns the first candidate value that `accept` converts.
    pub fn find<'a, T>(
        &self,
        event: &'a JsonValue,
        mut accept: impl FnMut(&'a JsonValue) -> Option<T>,
    ) -> Option<T> {
        for location in self.locations {
            let Some(object) = location.resolve(event) else {
                continue;
            };
            for key in self.keys {
                if let Some(found) = object.get(*key).and_then(&mut accept) {
                    return Some(found);
                }
            }
        }
        None
    }
}

/// Domain name: only on the event itself.
pub const NAME_RULE: FieldRule = FieldRule {
    locations: &[FieldLocation::EventRoot],
    keys: &["name"],
};

/// Token/contract address candidates.
pub const TOKEN_ADDRESS_RULE: FieldRule = FieldRule {
    locations: &[FieldLocation::EventRoot, FieldLocation::EventData],
    keys: &[
        "tokenAddress",
        "token_address",
        "address",
        "contractAddress",
        "contract_address",
        "token",
        "tokenId",
        "token_id",
    ],
};

/// Seller address candidates.
pub const SELLER_RULE: FieldRule = FieldRule {
    locations: &[FieldLocation::EventRoot, FieldLocation::EventData],
    keys: &["seller", "sellerAddress"],
};

/// Price: the payment block first, then a bare `price` on the event.
pub const PRICE_RULE: FieldRule = FieldRule {
    locations: &[FieldLocation::Payment, FieldLocation::EventRoot],
    keys: &["price"],
};

/// Structural shapes recognised by the diagnostic scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// `0x` followed by 40 hex characters (42 total)
    Address,
    /// `0x` followed by 64 hex characters (66 total)
    Hash,
}

impl Shape {
    fn length(self) -> usize {
        match self {
            Shape::Address => 42,
            Shape::Hash => 66,
        }
    }

    /// Returns true if `candidate` has this shape.
    pub fn matches(self, candidate: &str) -> bool {
        candidate.starts_with("0x") && candidate.chars().count() == self.length()
    }
}

/// One shape-matching string found during a diagnostic scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShapeMatch {
    /// Dotted path to the value, e.g. `events[0].eventData.seller`
    pub path: String,
    /// The matching string
    pub value: String,
    /// Key the value was stored under
    pub field_name: String,
}

/// A `name` or `type` string together with its sibling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedEntry {
    /// The `name` value, or `Unknown`
    pub name: String,
    /// The `type` value, or `Unknown`
    #[serde(rename = "type")]
    pub entry_type: String,
    /// Path of the key that produced the entry, e.g. `events[0].name`
    pub path: String,
}

/// Picks the event to extract from.
///
/// The first element of a non-empty `events` array when present,
/// otherwise the payload itself.
pub fn select_event(payload: &JsonValue) -> &JsonValue {
    payload
        .get("events")
        .and_then(JsonValue::as_array)
        .and_then(|events| events.first())
        .unwrap_or(payload)
}

/// Extracts name, price, seller and token address from a payload.
///
/// # Examples
///
/// ```
/// use doma_relay::engine::extractor::extract;
/// use serde_json::json;
///
/// let payload = json!({
///     "events": [{
///         "name": "alpha.eth",
///         "eventData": { "payment": { "price": "2000000000000000000" } }
///     }]
/// });
///
/// let fields = extract(&payload);
/// assert_eq!(fields.name.as_deref(), Some("alpha.eth"));
/// assert_eq!(fields.price, Some(2.0));
/// assert!(fields.token_address.is_none());
/// ```
pub fn extract(payload: &JsonValue) -> ExtractedFields {
    let event = select_event(payload);

    let name = NAME_RULE.find(event, |v| v.as_str().map(str::to_string));
    let price = PRICE_RULE.find(event, wei_to_eth);
    let seller_address = SELLER_RULE.find(event, |v| v.as_str().map(str::to_string));

    let token_address = TOKEN_ADDRESS_RULE
        .find(event, |v| {
            v.as_str()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .or_else(|| {
            let found = find_first_shaped(event, Shape::Address).map(str::to_string);
            if let Some(address) = &found {
                tracing::debug!(token_address = %address, "Token address found by structural scan");
            }
            found
        });

    ExtractedFields {
        name,
        price,
        seller_address,
        token_address,
    }
}

/// Converts a wei amount (number or numeric string) to ETH.
pub fn wei_to_eth(value: &JsonValue) -> Option<f64> {
    let wei = match value {
        JsonValue::Number(n) => n.as_f64()?,
        JsonValue::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    Some(wei / WEI_PER_ETH)
}

/// Depth-first search for the first object member whose string value has
/// the given shape. Keys are visited in insertion order.
pub fn find_first_shaped(value: &JsonValue, shape: Shape) -> Option<&str> {
    match value {
        JsonValue::Object(map) => map.values().find_map(|child| match child {
            JsonValue::String(s) if shape.matches(s) => Some(s.as_str()),
            other => find_first_shaped(other, shape),
        }),
        JsonValue::Array(items) => items.iter().find_map(|item| find_first_shaped(item, shape)),
        _ => None,
    }
}

/// Every address-shaped string in the payload.
pub fn find_all_addresses(value: &JsonValue) -> Vec<ShapeMatch> {
    find_all_shaped(value, Shape::Address)
}

/// Every hash-shaped string in the payload.
pub fn find_all_hashes(value: &JsonValue) -> Vec<ShapeMatch> {
    find_all_shaped(value, Shape::Hash)
}

/// Every string of the given shape, in depth-first order.
pub fn find_all_shaped(value: &JsonValue, shape: Shape) -> Vec<ShapeMatch> {
    let mut matches = Vec::new();
    collect_shaped(value, shape, "", &mut matches);
    matches
}

fn collect_shaped(value: &JsonValue, shape: Shape, path: &str, out: &mut Vec<ShapeMatch>) {
    match value {
        JsonValue::Object(map) => {
            for (key, child) in map {
                let child_path = join_key(path, key);
                if let JsonValue::String(s) = child {
                    if shape.matches(s) {
                        out.push(ShapeMatch {
                            path: child_path.clone(),
                            value: s.clone(),
                            field_name: key.clone(),
                        });
                    }
                }
                collect_shaped(child, shape, &child_path, out);
            }
        }
        JsonValue::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                collect_shaped(item, shape, &format!("{}[{}]", path, index), out);
            }
        }
        _ => {}
    }
}

/// Lists one entry per `name` or `type` key holding a string.
///
/// An object carrying both keys yields two entries. Keys match
/// case-insensitively; the sibling is read from the exact `name` or
/// `type` key and defaults to `Unknown`.
pub fn find_name_type_pairs(value: &JsonValue) -> Vec<NamedEntry> {
    let mut entries = Vec::new();
    collect_named(value, "", &mut entries);
    entries
}

fn collect_named(value: &JsonValue, path: &str, out: &mut Vec<NamedEntry>) {
    match value {
        JsonValue::Object(map) => {
            let sibling = |key: &str| map.get(key).map(display_value).unwrap_or_else(unknown);
            for (key, child) in map {
                let child_path = join_key(path, key);
                if let JsonValue::String(s) = child {
                    if key.eq_ignore_ascii_case("name") {
                        out.push(NamedEntry {
                            name: s.clone(),
                            entry_type: sibling("type"),
                            path: child_path.clone(),
                        });
                    } else if key.eq_ignore_ascii_case("type") {
                        out.push(NamedEntry {
                            name: sibling("name"),
                            entry_type: s.clone(),
                            path: child_path.clone(),
                        });
                    }
                }
                collect_named(child, &child_path, out);
            }
        }
        JsonValue::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                collect_named(item, &format!("{}[{}]", path, index), out);
            }
        }
        _ => {}
    }
}

/// Renders a JSON scalar for human display: strings unquoted, everything
/// else as JSON text.
pub fn display_value(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn unknown() -> String {
    "Unknown".to_string()
}

fn join_key(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}
