use crate::model::{AttributeIndex, AttributeType, Dataset, FacilityIndex};
use crate::viewport::Bounds;
use serde::{Deserialize, Serialize};

/// Derived visibility of a facility. A facility gets the largest code that
/// applies, so one excluded by both the viewport and a filter is
/// `ExcludedByFilter`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Status {
    Visible = 1,
    /// Viewport filter is on and the marker falls outside the (extended) bounds.
    ExcludedByViewport = 2,
    ExcludedByFilter = 3,
    /// No data; never shown on the map.
    Unknown = 4,
}

pub const MAX_STATUS: usize = 4;

const ZINDEXES: [i32; MAX_STATUS + 1] = [0, 4, 3, 2, 1];
const ICON_COLORS: [&str; MAX_STATUS + 1] = ["", "080", "a00", "444", "444"];
const TEXT_COLORS: [&str; MAX_STATUS + 1] = ["", "040", "a00", "444", "444"];

impl Status {
    pub const ALL: [Status; MAX_STATUS] = [
        Status::Visible,
        Status::ExcludedByViewport,
        Status::ExcludedByFilter,
        Status::Unknown,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Status> {
        match code {
            1 => Some(Status::Visible),
            2 => Some(Status::ExcludedByViewport),
            3 => Some(Status::ExcludedByFilter),
            4 => Some(Status::Unknown),
            _ => None,
        }
    }

    /// Visible markers draw above excluded ones.
    pub fn z_index(self) -> i32 {
        ZINDEXES[self as usize]
    }

    pub fn icon_color(self) -> &'static str {
        ICON_COLORS[self as usize]
    }

    pub fn text_color(self) -> &'static str {
        TEXT_COLORS[self as usize]
    }

    /// Markers kept in the clustering layer: visible ones, plus those only
    /// outside the viewport so panning scrolls them smoothly into view.
    pub fn keeps_marker(self) -> bool {
        matches!(self, Status::Visible | Status::ExcludedByViewport)
    }
}

/// The user's filter selection. `attribute == 0` means no filter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub attribute: AttributeIndex,
    pub value: Option<String>,
}

impl Filter {
    pub fn none() -> Self {
        Filter::default()
    }

    pub fn new(attribute: AttributeIndex, value: impl Into<String>) -> Self {
        Filter { attribute, value: Some(value.into()) }
    }

    pub fn is_active(&self) -> bool {
        self.attribute > 0
    }

    /// Parse the `"<attribute_i> <value>"` option value used by the filter
    /// select box; `"0 "` selects everything.
    pub fn parse_option(s: &str) -> Option<Filter> {
        let (a, v) = match s.split_once(' ') {
            Some((a, v)) => (a, v),
            None => (s, ""),
        };
        let attribute = a.trim().parse().ok()?;
        let value = if v.is_empty() { None } else { Some(v.to_string()) };
        Some(Filter { attribute, value })
    }
}

/// Classify one facility against the filter and (optional) viewport bounds.
pub fn classify(
    ds: &Dataset,
    facility: FacilityIndex,
    filter: &Filter,
    viewport: Option<&Bounds>,
) -> Status {
    let values = match ds.values(facility) {
        Some(v) => v,
        None => return Status::Unknown,
    };
    let mut st = if !filter.is_active() {
        Status::Visible
    } else {
        let hit = match (ds.attribute(filter.attribute), filter.value.as_deref()) {
            (Some(a), Some(selected)) => match values.get(filter.attribute) {
                Some(v) if a.kind == AttributeType::Multi => v.contains_token(selected),
                Some(v) => v.matches(selected),
                None => false,
            },
            _ => false,
        };
        if hit {
            Status::Visible
        } else {
            Status::ExcludedByFilter
        }
    };
    if st == Status::Visible {
        if let (Some(bounds), Some(p)) = (viewport, ds.location(facility)) {
            if !bounds.contains(p) {
                st = Status::ExcludedByViewport;
            }
        }
    }
    st
}

/// Status of every facility slot; slot 0 and missing records hold `None`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct StatusTable(Vec<Option<Status>>);

impl StatusTable {
    pub fn get(&self, i: FacilityIndex) -> Option<Status> {
        self.0.get(i).copied().flatten()
    }

    pub fn is(&self, i: FacilityIndex, st: Status) -> bool {
        self.get(i) == Some(st)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.len() <= 1
    }

    pub fn visible_count(&self) -> usize {
        self.count(Status::Visible)
    }

    pub fn count(&self, st: Status) -> usize {
        self.0.iter().filter(|s| **s == Some(st)).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FacilityIndex, Status)> + '_ {
        self.0.iter().enumerate().filter_map(|(i, s)| s.map(|s| (i, s)))
    }

    pub fn codes(&self) -> Vec<u8> {
        self.0.iter().map(|s| s.map_or(0, Status::code)).collect()
    }
}

/// Classify every facility. With `limit`, at most that many facilities stay
/// visible (first come by index); the rest become `ExcludedByFilter`.
pub fn classify_all(
    ds: &Dataset,
    filter: &Filter,
    viewport: Option<&Bounds>,
    limit: Option<usize>,
) -> StatusTable {
    let mut out = vec![None; ds.facility_slots()];
    let mut visible = 0usize;
    for i in ds.facility_indices() {
        if ds.facility(i).is_none() {
            continue;
        }
        let mut st = classify(ds, i, filter, viewport);
        if st == Status::Visible {
            if limit.map_or(false, |l| visible >= l) {
                st = Status::ExcludedByFilter;
            } else {
                visible += 1;
            }
        }
        out[i] = Some(st);
    }
    log::debug!(
        "classified {} facilities, {} visible (filter attribute {})",
        out.len().saturating_sub(1),
        visible,
        filter.attribute
    );
    StatusTable(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Payload;

    fn dataset() -> Dataset {
        let json = r#"{
            "attributes": [null,
                {"name": "title", "type": "str"},
                {"name": "location", "type": "geopt"},
                {"name": "services", "type": "multi"},
                {"name": "total_beds", "type": "int"}
            ],
            "facilities": [null,
                {"name": "a", "type": 1, "values": [null, "A", {"lat": 1.0, "lon": 1.0}, ["x", "y"], 10]},
                {"name": "b", "type": 1, "values": [null, "B", {"lat": 50.0, "lon": 50.0}, ["z"], 20]},
                {"name": "c", "type": 1, "values": null},
                null
            ]
        }"#;
        Dataset::from_payload(Payload::from_json(json).unwrap())
    }

    #[test]
    fn no_filter_is_visible_unless_no_data() {
        let ds = dataset();
        let f = Filter::none();
        assert_eq!(classify(&ds, 1, &f, None), Status::Visible);
        assert_eq!(classify(&ds, 3, &f, None), Status::Unknown);
        assert_eq!(classify(&ds, 4, &f, None), Status::Unknown);
    }

    #[test]
    fn multi_and_scalar_filters() {
        let ds = dataset();
        assert_eq!(classify(&ds, 1, &Filter::new(3, "y"), None), Status::Visible);
        assert_eq!(classify(&ds, 1, &Filter::new(3, "z"), None), Status::ExcludedByFilter);
        assert_eq!(classify(&ds, 2, &Filter::new(4, "20"), None), Status::Visible);
        assert_eq!(classify(&ds, 1, &Filter::new(4, "20"), None), Status::ExcludedByFilter);
        // Null values stay unknown even under a filter.
        assert_eq!(classify(&ds, 3, &Filter::new(3, "x"), None), Status::Unknown);
        // A filter without a value matches nothing.
        let f = Filter { attribute: 3, value: None };
        assert_eq!(classify(&ds, 1, &f, None), Status::ExcludedByFilter);
    }

    #[test]
    fn viewport_downgrades_only_visible() {
        let ds = dataset();
        let b = Bounds::new(0.0, 0.0, 2.0, 2.0);
        assert_eq!(classify(&ds, 1, &Filter::none(), Some(&b)), Status::Visible);
        assert_eq!(classify(&ds, 2, &Filter::none(), Some(&b)), Status::ExcludedByViewport);
        assert_eq!(classify(&ds, 2, &Filter::new(3, "x"), Some(&b)), Status::ExcludedByFilter);
        assert_eq!(classify(&ds, 2, &Filter::none(), Some(&Bounds::world())), Status::Visible);
    }

    #[test]
    fn limit_cuts_off_in_index_order() {
        let ds = dataset();
        let t = classify_all(&ds, &Filter::none(), None, Some(1));
        assert_eq!(t.get(1), Some(Status::Visible));
        assert_eq!(t.get(2), Some(Status::ExcludedByFilter));
        assert_eq!(t.get(3), Some(Status::Unknown));
        assert_eq!(t.get(4), None);
        assert_eq!(t.visible_count(), 1);
        assert_eq!(t.codes(), vec![0, 1, 3, 4, 0]);
    }

    #[test]
    fn parses_filter_options() {
        assert_eq!(Filter::parse_option("0 "), Some(Filter::none()));
        assert_eq!(Filter::parse_option("3 ICU"), Some(Filter::new(3, "ICU")));
        assert_eq!(Filter::parse_option("x y"), None);
    }

    #[test]
    fn z_order_ranks_visible_highest() {
        assert!(Status::Visible.z_index() > Status::ExcludedByViewport.z_index());
        assert!(Status::ExcludedByFilter.z_index() > Status::Unknown.z_index());
        assert_eq!(Status::from_code(2), Some(Status::ExcludedByViewport));
        assert_eq!(Status::from_code(0), None);
    }
}
