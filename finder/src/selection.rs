use crate::model::{FacilityIndex, FacilityValues};
use crate::status::{Filter, StatusTable};
use crate::list::ListFilter;
use crate::viewport::{Debouncer, Viewport};
use serde::{Deserialize, Serialize};

/// The single user focus. Changed only through explicit selection calls.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Selection {
    pub filter: Filter,
    pub facility: Option<FacilityIndex>,
    /// Index into `Dataset::divisions`; `None` lists every facility.
    pub division: Option<usize>,
    pub list_filter: ListFilter,
}

/// Identifies one detail fetch. Only the ticket of the most recent
/// selection is honoured when responses arrive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ticket {
    pub generation: u64,
    pub facility: FacilityIndex,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LoadState {
    Idle,
    Loading { ticket: Ticket },
    Loaded { facility: FacilityIndex },
    Failed { facility: FacilityIndex, reason: String },
}

/// Detail-bubble loader: Idle -> Loading -> {Loaded, Failed} -> Idle, with
/// last-selection-wins ordering. Superseded requests are not aborted; their
/// responses are dropped when they arrive.
#[derive(Clone, Debug)]
pub struct DetailLoader {
    generation: u64,
    state: LoadState,
}

impl Default for DetailLoader {
    fn default() -> Self {
        DetailLoader { generation: 0, state: LoadState::Idle }
    }
}

impl DetailLoader {
    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, LoadState::Loading { .. })
    }

    pub fn loading_facility(&self) -> Option<FacilityIndex> {
        match &self.state {
            LoadState::Loading { ticket } => Some(ticket.facility),
            _ => None,
        }
    }

    /// Start a fetch for `facility`. Returns `None` if that same facility is
    /// already loading (double clicks).
    pub fn begin(&mut self, facility: FacilityIndex) -> Option<Ticket> {
        if let LoadState::Loading { ticket } = &self.state {
            if ticket.facility == facility {
                return None;
            }
        }
        self.generation = self.generation.wrapping_add(1);
        let ticket = Ticket { generation: self.generation, facility };
        self.state = LoadState::Loading { ticket };
        Some(ticket)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        matches!(&self.state, LoadState::Loading { ticket: t } if *t == ticket)
    }

    /// Accept a successful response. False means the ticket was superseded.
    pub fn finish(&mut self, ticket: Ticket) -> bool {
        if !self.is_current(ticket) {
            log::debug!("dropping stale detail response for facility {}", ticket.facility);
            return false;
        }
        self.state = LoadState::Loaded { facility: ticket.facility };
        true
    }

    pub fn fail(&mut self, ticket: Ticket, reason: impl Into<String>) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.state = LoadState::Failed { facility: ticket.facility, reason: reason.into() };
        true
    }

    /// Back to idle; any in-flight ticket becomes stale.
    pub fn reset(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.state = LoadState::Idle;
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailJson {
    pub values: FacilityValues,
}

/// Body of the bubble endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetailResponse {
    pub json: DetailJson,
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub login_url: Option<String>,
}

impl DetailResponse {
    pub fn from_json(s: &str) -> serde_json::Result<DetailResponse> {
        serde_json::from_str(s)
    }
}

/// The open detail popup, anchored to a facility's marker.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Popup {
    pub facility: FacilityIndex,
    pub html: String,
}

/// All mutable view state of a page, in one place.
#[derive(Clone, Debug)]
pub struct ViewState {
    pub selection: Selection,
    pub statuses: StatusTable,
    pub viewport: Viewport,
    pub loader: DetailLoader,
    pub debouncer: Debouncer,
    pub popup: Option<Popup>,
}

impl ViewState {
    pub fn new(debounce_ms: u32) -> Self {
        ViewState {
            selection: Selection::default(),
            statuses: StatusTable::default(),
            viewport: Viewport::default(),
            loader: DetailLoader::default(),
            debouncer: Debouncer::new(debounce_ms),
            popup: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_ticket_wins() {
        let mut l = DetailLoader::default();
        let a = l.begin(1).unwrap();
        let b = l.begin(2).unwrap();
        assert!(!l.finish(a));
        assert!(l.is_loading());
        assert!(l.finish(b));
        assert_eq!(l.state(), &LoadState::Loaded { facility: 2 });
        // A late failure for the old ticket changes nothing.
        assert!(!l.fail(a, "timeout"));
        assert_eq!(l.state(), &LoadState::Loaded { facility: 2 });
    }

    #[test]
    fn double_click_is_ignored() {
        let mut l = DetailLoader::default();
        let a = l.begin(3).unwrap();
        assert!(l.begin(3).is_none());
        assert!(l.fail(a, "boom"));
        assert!(l.begin(3).is_some());
    }

    #[test]
    fn reset_invalidates_in_flight() {
        let mut l = DetailLoader::default();
        let a = l.begin(1).unwrap();
        l.reset();
        assert!(!l.finish(a));
        assert_eq!(l.state(), &LoadState::Idle);
    }

    #[test]
    fn parses_detail_body() {
        let r = DetailResponse::from_json(
            r#"{"json": {"values": [null, "A", {"lat": 1, "lon": 2}]}, "html": "<b>A</b>", "login_url": null}"#,
        )
        .unwrap();
        assert_eq!(r.json.values.len(), 3);
        assert_eq!(r.html, "<b>A</b>");
        assert!(r.login_url.is_none());
    }
}
