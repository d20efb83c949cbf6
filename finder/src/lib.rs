pub mod columns;
pub mod config;
pub mod divisions;
pub mod edit;
pub mod error;
pub mod format;
pub mod list;
pub mod locale;
pub mod markers;
pub mod model;
pub mod selection;
pub mod settings;
pub mod status;
pub mod viewport;

pub use config::FinderConfig;
pub use error::{FinderError, Result};

use columns::ColumnSet;
use divisions::{count_divisions, DivisionCounts};
use edit::{AddNewFlow, CancelEffects, EditSession, FormField, HiddenFields};
use list::{render_list, render_print_list, render_row, ListContext, ListFilter, ListView, PrintRow, PrintSummary, Row};
use locale::Locale;
use markers::{ClusterUpdate, MarkerSet};
use model::{Dataset, FacilityIndex, LatLon, Payload, Value};
use selection::{DetailResponse, Popup, Ticket, ViewState};
use serde::{Deserialize, Serialize};
use status::{classify_all, Filter, Status};
use viewport::{Bounds, BoundsPadding, GridPadding, Trigger};

/// Projection of all three views after a state change.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Refresh {
    /// New clustering-layer membership, when it changed.
    pub cluster: Option<ClusterUpdate>,
    /// Markers whose icon was recomputed.
    pub icons: Vec<FacilityIndex>,
    pub list: ListView,
    pub divisions: Vec<DivisionCounts>,
    /// Map bounds that fit the visible markers (on load).
    pub fit_bounds: Option<Bounds>,
    /// Facility to select once the map has settled (on load).
    pub pending_selection: Option<FacilityIndex>,
}

/// A detail fetch the page has to perform and hand back with its ticket.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetailRequest {
    pub ticket: Ticket,
    pub url: String,
    pub timeout_ms: u32,
    /// No location and logged in: the edit form opens right away.
    pub force_edit: bool,
    /// No location and signed out: the user is pointed at the login link.
    pub force_login: bool,
    pub edit_url: Option<String>,
}

/// Result of a facility selection.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Selected {
    /// `None` when nothing needs fetching (cleared selection, double click).
    pub request: Option<DetailRequest>,
    /// List with the new highlight.
    pub list: ListView,
    /// "Loading..." while a request is outstanding.
    pub status_message: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DetailOutcome {
    /// A newer selection superseded this response; nothing changed.
    Stale,
    Loaded {
        popup: Option<Popup>,
        status_message: Option<String>,
        row: Row,
        refresh: Refresh,
    },
    Failed {
        message: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AddNewStart {
    LoginRequired,
    AwaitingClick { message: String },
}

/// The facility finder view engine. Owns the loaded data, the view state
/// and the marker set; every mutation re-derives statuses and returns fresh
/// projections.
pub struct Finder {
    config: FinderConfig,
    dataset: Dataset,
    view: ViewState,
    markers: MarkerSet,
    columns: ColumnSet,
    locale: Locale,
    padding: Box<dyn BoundsPadding>,
    edit: EditSession,
    add_new: AddNewFlow,
}

fn join_query(base: &str, pairs: &[(&str, &str)]) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter())
        .finish();
    let sep = if base.contains('?') { '&' } else { '?' };
    format!("{}{}{}", base, sep, query)
}

impl Finder {
    pub fn new(config: FinderConfig) -> Finder {
        let padding = Box::new(GridPadding::new(config.cluster_grid_size));
        Finder {
            view: ViewState::new(config.viewport_debounce_ms),
            config,
            dataset: Dataset::default(),
            markers: MarkerSet::default(),
            columns: ColumnSet::default(),
            locale: Locale::default(),
            padding,
            edit: EditSession::default(),
            add_new: AddNewFlow::default(),
        }
    }

    pub fn with_padding<P: BoundsPadding + 'static>(mut self, padding: P) -> Self {
        self.padding = Box::new(padding);
        self
    }

    pub fn with_columns(mut self, columns: ColumnSet) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    /// Swap the message catalogue; the next projection uses it.
    pub fn set_locale(&mut self, locale: Locale) {
        self.locale = locale;
    }

    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn view_state(&self) -> &ViewState {
        &self.view
    }

    pub fn markers(&self) -> &MarkerSet {
        &self.markers
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    pub fn edit_session(&self) -> &EditSession {
        &self.edit
    }

    pub fn add_new(&self) -> &AddNewFlow {
        &self.add_new
    }

    pub fn status(&self, i: FacilityIndex) -> Option<Status> {
        self.view.statuses.get(i)
    }

    fn detail(&self) -> bool {
        self.view.viewport.zoom > self.config.detail_zoom_threshold
    }

    fn reclassify(&mut self) {
        let bounds = self.view.viewport.filter_bounds(self.padding.as_ref());
        self.view.statuses = classify_all(
            &self.dataset,
            &self.view.selection.filter,
            bounds.as_ref(),
            self.config.visible_limit(),
        );
    }

    fn list_members(&self) -> Vec<FacilityIndex> {
        match self.view.selection.division.and_then(|d| self.dataset.divisions().get(d)) {
            Some(d) => d.facility_is.clone(),
            None => self.dataset.facility_indices().collect(),
        }
    }

    fn list_context(&self) -> ListContext<'_> {
        ListContext {
            ds: &self.dataset,
            statuses: &self.view.statuses,
            columns: &self.columns,
            locale: &self.locale,
            selected: self.view.selection.facility,
            filter: self.view.selection.list_filter,
        }
    }

    pub fn list_view(&self) -> ListView {
        render_list(&self.list_context(), &self.list_members())
    }

    pub fn row(&self, i: FacilityIndex) -> Row {
        render_row(&self.list_context(), i)
    }

    pub fn division_counts(&self) -> Vec<DivisionCounts> {
        count_divisions(&self.dataset, &self.view.statuses)
    }

    pub fn print_rows(&self) -> Vec<PrintRow> {
        render_print_list(&self.dataset, &self.view.statuses, &self.locale, &self.list_members())
    }

    pub fn print_summary(&self) -> PrintSummary {
        list::print_summary(&self.dataset)
    }

    pub fn freshness(&self, now_s: f64) -> format::Freshness {
        format::freshness(now_s, self.dataset.timestamp(), &self.locale)
    }

    /// Reclassify, recompute icons, and rebuild cluster membership.
    fn full_refresh(&mut self) -> Refresh {
        self.reclassify();
        let detail = self.detail();
        let cluster = self.markers.sync_icons(
            &self.dataset,
            &self.view.statuses,
            detail,
            self.config.visible_limit(),
        );
        Refresh {
            icons: cluster.markers.clone(),
            cluster: Some(cluster),
            list: self.list_view(),
            divisions: self.division_counts(),
            fit_bounds: None,
            pending_selection: None,
        }
    }

    /// Viewport-only update: icons of visible markers, no cluster changes.
    fn viewport_refresh(&mut self) -> Refresh {
        self.reclassify();
        let detail = self.detail();
        let icons = self.markers.update_visible_icons(&self.dataset, &self.view.statuses, detail);
        Refresh {
            cluster: None,
            icons,
            list: self.list_view(),
            divisions: self.division_counts(),
            fit_bounds: None,
            pending_selection: None,
        }
    }

    /// Replace all data. `selected_name` is selected once the page is ready.
    pub fn load_data(&mut self, payload: Payload, selected_name: Option<&str>) -> Refresh {
        self.dataset = Dataset::from_payload(payload);
        self.markers = MarkerSet::build(&self.dataset, self.config.visible_limit());
        let viewport = self.view.viewport;
        // Tickets issued before the reload must stay stale afterwards.
        let mut loader = std::mem::take(&mut self.view.loader);
        loader.reset();
        self.view = ViewState::new(self.config.viewport_debounce_ms);
        self.view.viewport = viewport;
        self.view.loader = loader;
        self.edit.cancel();
        self.add_new.cancel();
        let pending = selected_name.and_then(|n| self.dataset.find_facility(n));
        self.view.selection.facility = pending;
        let mut refresh = self.full_refresh();
        refresh.fit_bounds = self.markers.fit_bounds(&self.view.statuses);
        refresh.pending_selection = pending;
        log::info!(
            "loaded {} facilities, {} divisions",
            self.dataset.facility_slots().saturating_sub(1),
            self.dataset.divisions().len()
        );
        refresh
    }

    pub fn load_data_json(&mut self, json: &str, selected_name: Option<&str>) -> Result<Refresh> {
        let payload = Payload::from_json(json)?;
        Ok(self.load_data(payload, selected_name))
    }

    pub fn select_filter(&mut self, attribute: usize, value: Option<String>) -> Result<Refresh> {
        if attribute > 0 && self.dataset.attribute(attribute).is_none() {
            return Err(FinderError::UnknownAttribute(attribute.to_string()));
        }
        log::debug!("filter {} = {:?}", attribute, value);
        self.view.selection.filter = Filter { attribute, value };
        Ok(self.full_refresh())
    }

    /// Filter by attribute name; `None` clears the filter.
    pub fn select_filter_by_name(&mut self, name: Option<&str>, value: Option<String>) -> Result<Refresh> {
        let attribute = match name {
            Some(n) => self
                .dataset
                .attribute_index(n)
                .ok_or_else(|| FinderError::UnknownAttribute(n.to_string()))?,
            None => 0,
        };
        self.select_filter(attribute, value)
    }

    /// Filter from a select-box option value (`"<attribute_i> <value>"`).
    pub fn select_filter_option(&mut self, option: &str) -> Result<Refresh> {
        let f = Filter::parse_option(option).ok_or_else(|| FinderError::UnknownAttribute(option.to_string()))?;
        self.select_filter(f.attribute, f.value)
    }

    pub fn select_division(&mut self, division: Option<usize>) -> Result<ListView> {
        if let Some(d) = division {
            if d >= self.dataset.divisions().len() {
                return Err(FinderError::InvalidState(format!("no division {}", d)));
            }
        }
        self.view.selection.division = division;
        Ok(self.list_view())
    }

    pub fn set_list_filter(&mut self, filter: ListFilter) -> ListView {
        self.view.selection.list_filter = filter;
        self.list_view()
    }

    /// Record the map's current bounds and zoom. Call `viewport_changed`
    /// afterwards to schedule the update.
    pub fn set_viewport(&mut self, bounds: Bounds, zoom: u8) {
        self.view.viewport.bounds = Some(bounds);
        self.view.viewport.zoom = zoom;
    }

    /// Pan/zoom happened. Returns a refresh right away the first time, later
    /// calls are coalesced and delivered by `poll`.
    pub fn viewport_changed(&mut self, now_ms: f64) -> Option<Refresh> {
        match self.view.debouncer.trigger(now_ms) {
            Trigger::Now => Some(self.viewport_refresh()),
            Trigger::Deferred(_) => None,
        }
    }

    pub fn poll(&mut self, now_ms: f64) -> Option<Refresh> {
        if self.view.debouncer.poll(now_ms) {
            Some(self.viewport_refresh())
        } else {
            None
        }
    }

    pub fn set_viewport_filter(&mut self, on: bool) -> Refresh {
        self.view.viewport.filter_on = on;
        self.view.debouncer.cancel();
        self.viewport_refresh()
    }

    pub fn edit_url(&self, facility_name: &str) -> String {
        join_query(&self.config.edit_url, &[("facility_name", facility_name)])
    }

    pub fn add_new_url(&self, facility_type: Option<&str>) -> String {
        let ty = facility_type
            .map(str::to_string)
            .or_else(|| self.dataset.default_facility_type().map(|t| t.name.clone()))
            .unwrap_or_default();
        join_query(&self.config.edit_url, &[("add_new", "yes"), ("facility_type", ty.as_str())])
    }

    /// Select a facility (0 clears). Closes the popup, moves the highlight
    /// and, unless the same facility is already loading, starts a detail
    /// fetch.
    pub fn select_facility(&mut self, i: FacilityIndex) -> Result<Selected> {
        if i != 0 && self.view.loader.loading_facility() == Some(i) {
            return Ok(Selected { request: None, list: self.list_view(), status_message: None });
        }
        self.view.popup = None;
        if self.edit.is_open() {
            self.edit.cancel();
        }
        self.add_new.cancel();
        if i == 0 {
            self.view.selection.facility = None;
            self.view.loader.reset();
            return Ok(Selected { request: None, list: self.list_view(), status_message: None });
        }
        let name = match self.dataset.facility(i) {
            Some(f) => f.name.clone(),
            None => return Err(FinderError::UnknownFacility(i.to_string())),
        };
        self.view.selection.facility = Some(i);
        let list = self.list_view();
        let ticket = match self.view.loader.begin(i) {
            Some(t) => t,
            None => return Ok(Selected { request: None, list, status_message: None }),
        };
        let located = self.dataset.location(i).is_some();
        let force_edit = !located && self.config.logged_in;
        let force_login = !located && !self.config.logged_in;
        let edit_url = if force_edit {
            let url = self.edit_url(&name);
            self.edit.begin(url.clone());
            Some(url)
        } else {
            None
        };
        log::debug!("loading detail for {} (generation {})", name, ticket.generation);
        let request = DetailRequest {
            ticket,
            url: join_query(&self.config.bubble_url, &[("facility_name", name.as_str())]),
            timeout_ms: self.config.detail_timeout_ms,
            force_edit,
            force_login,
            edit_url,
        };
        Ok(Selected { request: Some(request), list, status_message: Some(self.locale.get("LOADING")) })
    }

    /// Hand back the result of a detail fetch.
    pub fn finish_detail(&mut self, ticket: Ticket, result: Result<DetailResponse>) -> DetailOutcome {
        let response = match result {
            Ok(r) => r,
            Err(e) => {
                log::warn!("detail fetch for facility {} failed: {}", ticket.facility, e);
                if self.view.loader.fail(ticket, e.to_string()) {
                    return DetailOutcome::Failed { message: self.locale.get("ERROR_LOADING_FACILITY_INFORMATION") };
                }
                return DetailOutcome::Stale;
            }
        };
        let i = ticket.facility;
        if self.dataset.facility(i).is_none() {
            if self.view.loader.fail(ticket, format!("facility {} is gone", i)) {
                return DetailOutcome::Failed { message: self.locale.get("ERROR_LOADING_FACILITY_INFORMATION") };
            }
            return DetailOutcome::Stale;
        }
        if !self.view.loader.finish(ticket) {
            return DetailOutcome::Stale;
        }
        let old_location = self.dataset.location(i);
        self.dataset.patch_values(i, response.json.values);
        self.move_marker(i, old_location);
        let refresh = self.full_refresh();
        let row = self.row(i);
        if self.markers.get(i).is_some() {
            let popup = Popup { facility: i, html: response.html };
            self.view.popup = Some(popup.clone());
            DetailOutcome::Loaded { popup: Some(popup), status_message: None, row, refresh }
        } else {
            let hint = if self.config.logged_in {
                self.locale.get("EDIT_LATITUDE_LONGITUDE")
            } else {
                let link = format!("<a id=\"status-sign-in\" href=\"{}\">", response.login_url.unwrap_or_default());
                self.locale.message("SIGN_IN_TO_EDIT_LOCATION", &[("START_LINK", link.as_str()), ("END_LINK", "</a>")])
            };
            let message = format!("{} {}", self.locale.get("NO_LOCATION_ENTERED"), hint);
            DetailOutcome::Loaded { popup: None, status_message: Some(message), row, refresh }
        }
    }

    /// Server push of a single attribute value.
    pub fn set_facility_attribute(&mut self, facility_name: &str, attribute_name: &str, value: Option<Value>) -> Result<Refresh> {
        let i = self
            .dataset
            .find_facility(facility_name)
            .ok_or_else(|| FinderError::UnknownFacility(facility_name.to_string()))?;
        let a = self
            .dataset
            .attribute_index(attribute_name)
            .ok_or_else(|| FinderError::UnknownAttribute(attribute_name.to_string()))?;
        let old_location = self.dataset.location(i);
        self.dataset.set_value(i, a, value);
        self.move_marker(i, old_location);
        Ok(self.full_refresh())
    }

    /// Bring facility `i`'s marker in line with its current location.
    fn move_marker(&mut self, i: FacilityIndex, old_location: Option<LatLon>) {
        match (old_location, self.dataset.location(i)) {
            (None, Some(_)) => {
                self.markers.add_marker(&self.dataset, i);
            }
            (Some(_), None) => {
                self.markers.remove_marker(i);
            }
            (Some(_), Some(p)) => {
                self.markers.set_position(i, p);
            }
            (None, None) => {}
        }
    }

    /// Open the in-place edit form for the selected facility, or for a new
    /// one. False when a form is already open.
    pub fn start_edit(&mut self, url: &str) -> bool {
        self.edit.begin(url)
    }

    pub fn edit_loaded(&mut self) -> bool {
        self.edit.loaded()
    }

    pub fn edit_load_failed(&mut self) -> String {
        self.add_new.cancel();
        self.edit.load_failed(&self.locale)
    }

    /// Validate and return the URL to post the form to.
    pub fn save_edit(&mut self, fields: &[FormField]) -> Result<String> {
        self.edit.begin_save(fields, &self.locale)
    }

    /// Save went through: close the form and reload the selected facility.
    pub fn edit_saved(&mut self) -> Result<(String, Selected)> {
        self.edit.save_succeeded();
        self.add_new.cancel();
        let i = self.view.selection.facility.unwrap_or(0);
        let selected = self.select_facility(i)?;
        Ok((self.locale.get("SAVED"), selected))
    }

    pub fn edit_save_failed(&mut self) -> String {
        self.add_new.cancel();
        self.edit.save_failed(&self.locale)
    }

    pub fn cancel_edit(&mut self) -> CancelEffects {
        self.edit.cancel();
        self.add_new.cancel()
    }

    pub fn start_add_new(&mut self) -> AddNewStart {
        if !self.config.logged_in {
            return AddNewStart::LoginRequired;
        }
        self.add_new.start();
        AddNewStart::AwaitingClick { message: self.locale.get("CLICK_TO_ADD_FACILITY") }
    }

    /// Map click while adding: drop the marker and open the new-facility form.
    pub fn place_new_facility(&mut self, position: LatLon) -> Option<(HiddenFields, String)> {
        let fields = self.add_new.place(position)?;
        let url = self.add_new_url(None);
        if !self.edit.begin(url.clone()) {
            log::warn!("edit form already open while placing a new facility");
        }
        Some((fields, url))
    }

    pub fn drag_new_facility(&mut self, position: LatLon) -> Option<HiddenFields> {
        self.add_new.drag(position)
    }

    pub fn cancel_add_new(&mut self) -> CancelEffects {
        self.add_new.cancel()
    }
}
