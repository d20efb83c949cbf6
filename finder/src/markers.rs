use crate::model::{Dataset, FacilityIndex, LatLon};
use crate::status::{Status, StatusTable};
use crate::viewport::Bounds;
use serde::Serialize;

const CHART_URL: &str = "http://chart.apis.google.com/chart?chst=d_simple_text_icon_above&";
const DEFAULT_ICON: &str = "greek_cross_6w14";
const DEFAULT_ICON_SIZE: u16 = 16;
const OUTLINE: &str = "fff";
const CLOSED_FILL: &str = "444";
const ALERT_FILL: &str = "a00";

/// Facility flags that override the status colour of a marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Overlay {
    None,
    Closed,
    OnAlert,
}

impl Overlay {
    /// Closed wins over on-alert.
    pub fn for_facility(ds: &Dataset, i: FacilityIndex) -> Overlay {
        if ds.is_closed(i) {
            Overlay::Closed
        } else if ds.is_on_alert(i) {
            Overlay::OnAlert
        } else {
            Overlay::None
        }
    }

    fn fill(self) -> Option<&'static str> {
        match self {
            Overlay::None => None,
            Overlay::Closed => Some(CLOSED_FILL),
            Overlay::OnAlert => Some(ALERT_FILL),
        }
    }
}

/// Parameters of a marker bitmap.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IconSpec {
    pub text: String,
    pub text_size: u8,
    pub text_fill: String,
    pub icon: String,
    pub icon_size: u16,
    pub icon_fill: String,
    pub outline: String,
}

impl IconSpec {
    /// `detail` turns on the label; it is set when zoomed past the detail
    /// threshold.
    pub fn new(title: &str, status: Status, detail: bool, overlay: Overlay) -> IconSpec {
        IconSpec {
            text: if detail { title.to_string() } else { String::new() },
            text_size: if detail { 10 } else { 0 },
            text_fill: status.text_color().to_string(),
            icon: DEFAULT_ICON.to_string(),
            icon_size: DEFAULT_ICON_SIZE,
            icon_fill: overlay.fill().unwrap_or(status.icon_color()).to_string(),
            outline: OUTLINE.to_string(),
        }
    }

    pub fn chart_params(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}|{}",
            self.text, self.text_size, self.text_fill, self.icon, self.icon_size, self.icon_fill, self.outline
        )
    }

    /// Chart API URL; print view asks for gifs, which print on older browsers.
    pub fn chart_url(&self, print: bool) -> String {
        let params: String = url::form_urlencoded::byte_serialize(self.chart_params().as_bytes()).collect();
        format!("{}{}chld={}", CHART_URL, if print { "chof=gif&" } else { "" }, params)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Marker {
    pub facility: FacilityIndex,
    pub position: LatLon,
    pub title: String,
    pub icon: IconSpec,
    pub z_index: i32,
}

/// Membership of the clustering layer after a sync: clear it, then add
/// exactly these markers. Toggling single markers leaves the clusterer
/// inconsistent, so changes always go through a full replace.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ClusterUpdate {
    pub markers: Vec<FacilityIndex>,
}

/// One optional marker per facility slot.
#[derive(Clone, Debug, Default)]
pub struct MarkerSet {
    markers: Vec<Option<Marker>>,
    clustered: Vec<FacilityIndex>,
}

impl MarkerSet {
    /// Markers for every located facility, all clustered, all drawn as unknown
    /// until the first sync.
    pub fn build(ds: &Dataset, limit: Option<usize>) -> MarkerSet {
        let mut set = MarkerSet { markers: vec![None; ds.facility_slots()], clustered: Vec::new() };
        for i in ds.facility_indices() {
            if set.add_marker(ds, i).is_some() {
                set.clustered.push(i);
            }
        }
        if let Some(l) = limit {
            set.clustered.truncate(l);
        }
        set
    }

    /// (Re)create the marker for a facility. Returns `None` when it has no
    /// location; that is not an error.
    pub fn add_marker(&mut self, ds: &Dataset, i: FacilityIndex) -> Option<&Marker> {
        if i == 0 {
            return None;
        }
        if self.markers.len() <= i {
            self.markers.resize(i + 1, None);
        }
        let marker = ds.location(i).map(|position| {
            let title = ds.title(i);
            Marker {
                facility: i,
                position,
                icon: IconSpec::new(&title, Status::Unknown, false, Overlay::None),
                z_index: Status::Unknown.z_index(),
                title,
            }
        });
        self.markers[i] = marker;
        self.markers[i].as_ref()
    }

    pub fn remove_marker(&mut self, i: FacilityIndex) -> bool {
        self.clustered.retain(|&m| m != i);
        match self.markers.get_mut(i) {
            Some(slot) => slot.take().is_some(),
            None => false,
        }
    }

    pub fn set_position(&mut self, i: FacilityIndex, p: LatLon) -> bool {
        match self.markers.get_mut(i).and_then(|m| m.as_mut()) {
            Some(m) => {
                m.position = p;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, i: FacilityIndex) -> Option<&Marker> {
        self.markers.get(i).and_then(|m| m.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.markers.iter().filter_map(|m| m.as_ref())
    }

    pub fn clustered(&self) -> &[FacilityIndex] {
        &self.clustered
    }

    pub fn is_clustered(&self, i: FacilityIndex) -> bool {
        self.clustered.contains(&i)
    }

    /// Clustered markers whose facility is visible.
    pub fn visible(&self, statuses: &StatusTable) -> Vec<FacilityIndex> {
        self.clustered.iter().copied().filter(|&i| statuses.is(i, Status::Visible)).collect()
    }

    /// Refresh the icon and z-order of one marker. No marker, no-op.
    pub fn update_icon(&mut self, ds: &Dataset, statuses: &StatusTable, i: FacilityIndex, detail: bool) -> bool {
        let st = statuses.get(i).unwrap_or(Status::Unknown);
        let overlay = Overlay::for_facility(ds, i);
        match self.markers.get_mut(i).and_then(|m| m.as_mut()) {
            Some(m) => {
                m.title = ds.title(i);
                m.icon = IconSpec::new(&m.title, st, detail, overlay);
                m.z_index = st.z_index();
                true
            }
            None => false,
        }
    }

    /// Recompute icons for markers that stay on the map and rebuild the
    /// cluster membership in one go.
    pub fn sync_icons(
        &mut self,
        ds: &Dataset,
        statuses: &StatusTable,
        detail: bool,
        limit: Option<usize>,
    ) -> ClusterUpdate {
        let mut keep = Vec::new();
        for i in ds.facility_indices() {
            let kept = statuses.get(i).map_or(false, Status::keeps_marker);
            if kept && self.update_icon(ds, statuses, i, detail) {
                keep.push(i);
            }
        }
        if let Some(l) = limit {
            keep.truncate(l);
        }
        self.clustered = keep.clone();
        ClusterUpdate { markers: keep }
    }

    /// Icon refresh for visible markers only; cluster membership untouched.
    pub fn update_visible_icons(&mut self, ds: &Dataset, statuses: &StatusTable, detail: bool) -> Vec<FacilityIndex> {
        let mut updated = Vec::new();
        for i in ds.facility_indices() {
            if statuses.is(i, Status::Visible) && self.update_icon(ds, statuses, i, detail) {
                updated.push(i);
            }
        }
        updated
    }

    /// Bounds that fit every visible marker.
    pub fn fit_bounds(&self, statuses: &StatusTable) -> Option<Bounds> {
        Bounds::from_points(
            self.iter()
                .filter(|m| statuses.is(m.facility, Status::Visible))
                .map(|m| m.position),
        )
    }
}
