use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 1-based index into `Dataset::attributes`; 0 means "none".
pub type AttributeIndex = usize;
/// 1-based index into `Dataset::facilities`; 0 means "none".
pub type FacilityIndex = usize;
pub type FacilityTypeIndex = usize;

/// Attribute names the views know about.
pub mod attr {
    pub const TITLE: &str = "title";
    pub const LOCATION: &str = "location";
    pub const SERVICES: &str = "services";
    pub const TOTAL_BEDS: &str = "total_beds";
    pub const AVAILABLE_BEDS: &str = "available_beds";
    pub const OPERATIONAL_STATUS: &str = "operational_status";
    pub const ALERT_STATUS: &str = "alert_status";
    pub const ADDRESS: &str = "address";
    pub const CONTACT_NAME: &str = "contact_name";
    pub const PHONE: &str = "phone";
    pub const HEALTHC_ID: &str = "healthc_id";
    pub const PCODE: &str = "pcode";
}

pub const CLOSED_OR_CLOSING: &str = "CLOSED_OR_CLOSING";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    Str,
    Int,
    Float,
    Bool,
    Date,
    Text,
    Choice,
    Multi,
    Contact,
    Geopt,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AttributeType,
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        LatLon { lat, lon }
    }
}

/// A single attribute value as it arrives in the page payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<String>),
    Location(LatLon),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_location(&self) -> Option<LatLon> {
        match self {
            Value::Location(p) => Some(*p),
            _ => None,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0 && !f.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::List(_) | Value::Location(_) => true,
        }
    }

    /// Exact scalar equality against a filter token.
    pub fn matches(&self, selected: &str) -> bool {
        match self {
            Value::Str(s) => s == selected,
            Value::Int(i) => selected.parse::<i64>().map_or(false, |v| v == *i),
            Value::Float(f) => selected.parse::<f64>().map_or(false, |v| v == *f),
            Value::Bool(b) => selected.parse::<bool>().map_or(false, |v| v == *b),
            Value::List(_) | Value::Location(_) => false,
        }
    }

    /// Set membership for multi-valued attributes; a scalar is a one-token set.
    pub fn contains_token(&self, token: &str) -> bool {
        match self {
            Value::List(items) => items.iter().any(|t| t == token),
            other => other.matches(token),
        }
    }

    /// The value as a list of tokens (scalars become a single token).
    pub fn tokens(&self) -> Vec<String> {
        match self {
            Value::List(items) => items.clone(),
            Value::Str(s) => vec![s.clone()],
            Value::Int(i) => vec![i.to_string()],
            Value::Float(f) => vec![f.to_string()],
            Value::Bool(b) => vec![b.to_string()],
            Value::Location(p) => vec![format!("{},{}", p.lat, p.lon)],
        }
    }
}

/// Attribute values of one facility, indexed by `AttributeIndex`. Slot 0 is
/// reserved and always empty.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FacilityValues(pub Vec<Option<Value>>);

impl FacilityValues {
    pub fn with_len(len: usize) -> Self {
        FacilityValues(vec![None; len])
    }

    pub fn get(&self, i: AttributeIndex) -> Option<&Value> {
        if i == 0 {
            return None;
        }
        self.0.get(i).and_then(|v| v.as_ref())
    }

    pub fn set(&mut self, i: AttributeIndex, value: Option<Value>) {
        if i == 0 {
            return;
        }
        if self.0.len() <= i {
            self.0.resize(i + 1, None);
        }
        self.0[i] = value;
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|v| v.is_none())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub name: String,
    #[serde(rename = "type", default)]
    pub facility_type: FacilityTypeIndex,
    #[serde(default)]
    pub values: Option<FacilityValues>,
    #[serde(default)]
    pub distance_meters: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FacilityType {
    pub name: String,
    #[serde(default)]
    pub attribute_names: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Division {
    pub title: String,
    #[serde(alias = "subject_is")]
    pub facility_is: Vec<FacilityIndex>,
}

/// Server-supplied page payload. Arrays are 1-based: index 0 is `null`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Payload {
    pub attributes: Vec<Option<Attribute>>,
    #[serde(default, alias = "subject_types")]
    pub facility_types: Vec<Option<FacilityType>>,
    #[serde(alias = "subjects")]
    pub facilities: Vec<Option<Facility>>,
    #[serde(default)]
    pub divisions: Vec<Division>,
    #[serde(default)]
    pub messages: HashMap<String, HashMap<String, String>>,
    #[serde(default)]
    pub timestamp: Option<f64>,
    #[serde(default, alias = "total_subject_count")]
    pub total_facility_count: usize,
}

impl Payload {
    pub fn from_json(s: &str) -> serde_json::Result<Payload> {
        serde_json::from_str(s)
    }
}

/// The loaded page data plus the lookups every view needs.
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    pub(crate) attributes: Vec<Option<Attribute>>,
    pub(crate) attributes_by_name: HashMap<String, AttributeIndex>,
    pub(crate) facility_types: Vec<Option<FacilityType>>,
    pub(crate) facilities: Vec<Option<Facility>>,
    pub(crate) divisions: Vec<Division>,
    pub(crate) messages: HashMap<String, HashMap<String, String>>,
    pub(crate) timestamp: Option<f64>,
    pub(crate) total_facility_count: usize,
}

impl Dataset {
    pub fn from_payload(payload: Payload) -> Dataset {
        let Payload {
            mut attributes,
            mut facility_types,
            mut facilities,
            divisions,
            messages,
            timestamp,
            total_facility_count,
        } = payload;
        // Keep the reserved slot even if the server sent an empty array.
        if attributes.is_empty() {
            attributes.push(None);
        }
        if facility_types.is_empty() {
            facility_types.push(None);
        }
        if facilities.is_empty() {
            facilities.push(None);
        }
        let mut attributes_by_name = HashMap::new();
        for (i, a) in attributes.iter().enumerate().skip(1) {
            if let Some(a) = a {
                attributes_by_name.insert(a.name.clone(), i);
            }
        }
        let divisions = if divisions.is_empty() {
            vec![Division {
                title: String::new(),
                facility_is: (1..facilities.len()).collect(),
            }]
        } else {
            divisions
                .into_iter()
                .map(|d| Division {
                    title: d.title,
                    facility_is: d
                        .facility_is
                        .into_iter()
                        .filter(|&i| i > 0 && i < facilities.len())
                        .collect(),
                })
                .collect()
        };
        Dataset {
            attributes,
            attributes_by_name,
            facility_types,
            facilities,
            divisions,
            messages,
            timestamp,
            total_facility_count,
        }
    }

    pub fn attribute(&self, i: AttributeIndex) -> Option<&Attribute> {
        if i == 0 {
            return None;
        }
        self.attributes.get(i).and_then(|a| a.as_ref())
    }

    pub fn attribute_index(&self, name: &str) -> Option<AttributeIndex> {
        self.attributes_by_name.get(name).copied()
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    pub fn facility_type(&self, i: FacilityTypeIndex) -> Option<&FacilityType> {
        if i == 0 {
            return None;
        }
        self.facility_types.get(i).and_then(|t| t.as_ref())
    }

    /// Type used for "add new facility" when the user has not picked one.
    pub fn default_facility_type(&self) -> Option<&FacilityType> {
        self.facility_type(1)
    }

    pub fn facility(&self, i: FacilityIndex) -> Option<&Facility> {
        if i == 0 {
            return None;
        }
        self.facilities.get(i).and_then(|f| f.as_ref())
    }

    pub(crate) fn facility_mut(&mut self, i: FacilityIndex) -> Option<&mut Facility> {
        if i == 0 {
            return None;
        }
        self.facilities.get_mut(i).and_then(|f| f.as_mut())
    }

    /// Number of facility slots, including the reserved slot 0.
    pub fn facility_slots(&self) -> usize {
        self.facilities.len()
    }

    pub fn facility_indices(&self) -> impl Iterator<Item = FacilityIndex> {
        1..self.facilities.len()
    }

    pub fn find_facility(&self, name: &str) -> Option<FacilityIndex> {
        self.facility_indices()
            .find(|&i| self.facility(i).map_or(false, |f| f.name == name))
    }

    pub fn divisions(&self) -> &[Division] {
        &self.divisions
    }

    pub fn timestamp(&self) -> Option<f64> {
        self.timestamp
    }

    pub fn total_facility_count(&self) -> usize {
        self.total_facility_count
    }

    pub fn values(&self, i: FacilityIndex) -> Option<&FacilityValues> {
        self.facility(i).and_then(|f| f.values.as_ref())
    }

    /// Value of a named attribute for a facility.
    pub fn value(&self, i: FacilityIndex, name: &str) -> Option<&Value> {
        let a = self.attribute_index(name)?;
        self.values(i)?.get(a)
    }

    pub fn location(&self, i: FacilityIndex) -> Option<LatLon> {
        self.value(i, attr::LOCATION).and_then(Value::as_location)
    }

    pub fn title(&self, i: FacilityIndex) -> String {
        match self.value(i, attr::TITLE) {
            Some(Value::Str(s)) if !s.is_empty() => s.clone(),
            _ => self.facility(i).map(|f| f.name.clone()).unwrap_or_default(),
        }
    }

    pub fn is_closed(&self, i: FacilityIndex) -> bool {
        matches!(
            self.value(i, attr::OPERATIONAL_STATUS),
            Some(Value::Str(s)) if s == CLOSED_OR_CLOSING
        )
    }

    pub fn is_on_alert(&self, i: FacilityIndex) -> bool {
        self.value(i, attr::ALERT_STATUS).map_or(false, Value::is_truthy)
    }

    pub fn translate_value<'a>(&'a self, value: &'a str) -> &'a str {
        self.messages
            .get("attribute_value")
            .and_then(|m| m.get(value))
            .map(|s| s.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(value)
    }

    /// Replace the values of a facility, e.g. after a detail fetch.
    pub(crate) fn patch_values(&mut self, i: FacilityIndex, values: FacilityValues) -> bool {
        match self.facility_mut(i) {
            Some(f) => {
                f.values = Some(values);
                true
            }
            None => false,
        }
    }

    /// Set one attribute, allocating an all-null value row if needed.
    pub(crate) fn set_value(&mut self, i: FacilityIndex, a: AttributeIndex, value: Option<Value>) -> bool {
        let len = self.attributes.len();
        match self.facility_mut(i) {
            Some(f) => {
                f.values
                    .get_or_insert_with(|| FacilityValues::with_len(len))
                    .set(a, value);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{
        "attributes": [null,
            {"name": "title", "type": "str"},
            {"name": "location", "type": "geopt"},
            {"name": "services", "type": "multi", "values": ["X", "Y"]},
            {"name": "operational_status", "type": "choice", "values": ["OPERATIONAL", "CLOSED_OR_CLOSING"]}
        ],
        "subject_types": [null, {"name": "hospital"}],
        "subjects": [null,
            {"name": "h1", "type": 1, "values": [null, "Alpha", {"lat": 18.5, "lon": -72.3}, ["X"], "CLOSED_OR_CLOSING"]},
            {"name": "h2", "type": 1, "values": null},
            {"name": "h3", "type": 1, "values": [null, "", null, [], null], "distance_meters": 1609.344}
        ],
        "messages": {"attribute_value": {"X": "Service X"}},
        "total_subject_count": 10
    }"#;

    #[test]
    fn parses_legacy_names_and_builds_lookups() {
        let ds = Dataset::from_payload(Payload::from_json(PAYLOAD).unwrap());
        assert_eq!(ds.facility_slots(), 4);
        assert_eq!(ds.attribute_index("services"), Some(3));
        assert_eq!(ds.total_facility_count(), 10);
        assert_eq!(ds.location(1), Some(LatLon::new(18.5, -72.3)));
        assert_eq!(ds.location(2), None);
        assert_eq!(ds.title(1), "Alpha");
        assert_eq!(ds.title(3), "h3");
        assert!(ds.is_closed(1));
        assert!(!ds.is_on_alert(1));
        assert_eq!(ds.translate_value("X"), "Service X");
        assert_eq!(ds.translate_value("Z"), "Z");
        assert_eq!(ds.find_facility("h3"), Some(3));
        assert_eq!(ds.default_facility_type().map(|t| t.name.as_str()), Some("hospital"));
    }

    #[test]
    fn implicit_division_covers_everything() {
        let ds = Dataset::from_payload(Payload::from_json(PAYLOAD).unwrap());
        assert_eq!(ds.divisions().len(), 1);
        assert_eq!(ds.divisions()[0].facility_is, vec![1, 2, 3]);
    }

    #[test]
    fn set_value_allocates_null_row() {
        let mut ds = Dataset::from_payload(Payload::from_json(PAYLOAD).unwrap());
        assert!(ds.set_value(2, 1, Some(Value::Str("Beta".into()))));
        assert_eq!(ds.title(2), "Beta");
        assert_eq!(ds.values(2).unwrap().len(), 5);
        assert!(!ds.set_value(9, 1, None));
    }

    #[test]
    fn value_matching() {
        assert!(Value::Int(3).matches("3"));
        assert!(!Value::Int(3).matches("x"));
        assert!(Value::Str("a".into()).contains_token("a"));
        assert!(Value::List(vec!["x".into(), "y".into()]).contains_token("y"));
        assert!(!Value::List(vec!["x".into()]).matches("x"));
        assert!(Value::Bool(true).matches("true"));
    }
}
