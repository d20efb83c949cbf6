use crate::error::{FinderError, Result};
use crate::locale::Locale;
use crate::markers::{IconSpec, Overlay};
use crate::model::{attr, Attribute, AttributeType, LatLon};
use crate::status::Status;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fill colour of the draggable "new facility" marker.
const NEW_FACILITY_FILL: &str = "f60";

/// One input of the edit form, as the page read it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FormField {
    /// Must be non-empty after trimming (nickname, affiliation).
    Required { name: String, value: String },
    /// int/float attribute; empty is allowed.
    Number { name: String, value: String },
    /// geopt attribute, posted as `<name>.lat` / `<name>.lon`.
    GeoPt { name: String, lat: String, lon: String },
    /// Anything else; not validated client-side.
    Other { name: String, value: String },
}

impl FormField {
    /// Field for an attribute input. Geopt values are given as "lat,lon".
    pub fn for_attribute(attribute: &Attribute, raw: &str) -> FormField {
        let name = attribute.name.clone();
        match attribute.kind {
            AttributeType::Int | AttributeType::Float => FormField::Number { name, value: raw.to_string() },
            AttributeType::Geopt => {
                let (lat, lon) = raw.split_once(',').unwrap_or((raw, ""));
                FormField::GeoPt { name, lat: lat.to_string(), lon: lon.to_string() }
            }
            _ => FormField::Other { name, value: raw.to_string() },
        }
    }

    pub fn name(&self) -> &str {
        match self {
            FormField::Required { name, .. }
            | FormField::Number { name, .. }
            | FormField::GeoPt { name, .. }
            | FormField::Other { name, .. } => name,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Per-field messages; any entry blocks the save.
#[derive(Error, Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[error("{} invalid field(s)", .errors.len())]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn for_field(&self, name: &str) -> Option<&str> {
        self.errors.iter().find(|e| e.field == name).map(|e| e.message.as_str())
    }
}

fn is_valid_number(value: &str) -> bool {
    let v = value.trim();
    !v.is_empty() && v.chars().all(|c| c.is_ascii_digit() || c == '-' || c == '.')
}

fn check_coord(raw: &str, min: f64, max: f64, not_number: &str, out_of_range: &str, locale: &Locale) -> Option<String> {
    if !is_valid_number(raw) {
        return Some(locale.get(not_number));
    }
    match raw.trim().parse::<f64>() {
        Ok(v) if v >= min && v <= max => None,
        Ok(_) => Some(locale.get(out_of_range)),
        Err(_) => Some(locale.get(not_number)),
    }
}

/// Client-side checks run before a save is posted.
pub fn validate_form(fields: &[FormField], locale: &Locale) -> std::result::Result<(), ValidationErrors> {
    let mut errors = Vec::new();
    for f in fields {
        let message = match f {
            FormField::Required { value, .. } if value.trim().is_empty() => Some(locale.get("ERROR_FIELD_IS_REQUIRED")),
            FormField::Number { value, .. } if !value.is_empty() && !is_valid_number(value) => {
                Some(locale.get("ERROR_VALUE_MUST_BE_NUMBER"))
            }
            FormField::GeoPt { lat, lon, .. } => {
                let msgs: Vec<String> = [
                    check_coord(lat, -90.0, 90.0, "ERROR_LATITUDE_MUST_BE_NUMBER", "ERROR_LATITUDE_INVALID", locale),
                    check_coord(lon, -180.0, 180.0, "ERROR_LONGITUDE_MUST_BE_NUMBER", "ERROR_LONGITUDE_INVALID", locale),
                ]
                .into_iter()
                .flatten()
                .collect();
                if msgs.is_empty() {
                    None
                } else {
                    Some(msgs.join("\n"))
                }
            }
            _ => None,
        };
        if let Some(message) = message {
            errors.push(FieldError { field: f.name().to_string(), message });
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors { errors })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EditState {
    Closed,
    Loading { url: String },
    Open { url: String },
    Saving { url: String },
}

/// In-place edit form lifecycle.
#[derive(Clone, Debug)]
pub struct EditSession {
    state: EditState,
}

impl Default for EditSession {
    fn default() -> Self {
        EditSession { state: EditState::Closed }
    }
}

impl EditSession {
    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, EditState::Closed)
    }

    /// Start loading the form. False when a form is already up.
    pub fn begin(&mut self, url: impl Into<String>) -> bool {
        if self.is_open() {
            return false;
        }
        self.state = EditState::Loading { url: url.into() };
        true
    }

    pub fn loaded(&mut self) -> bool {
        match &self.state {
            EditState::Loading { url } => {
                self.state = EditState::Open { url: url.clone() };
                true
            }
            _ => false,
        }
    }

    /// Form fetch failed: close and return the message to show.
    pub fn load_failed(&mut self, locale: &Locale) -> String {
        self.state = EditState::Closed;
        locale.get("ERROR_LOADING_EDIT_FORM")
    }

    /// Validate and move to saving; returns the URL to post to.
    pub fn begin_save(&mut self, fields: &[FormField], locale: &Locale) -> Result<String> {
        let url = match &self.state {
            EditState::Open { url } => url.clone(),
            other => return Err(FinderError::InvalidState(format!("cannot save from {:?}", other))),
        };
        validate_form(fields, locale)?;
        self.state = EditState::Saving { url: url.clone() };
        Ok(url)
    }

    pub fn save_succeeded(&mut self) -> bool {
        let was_saving = matches!(self.state, EditState::Saving { .. });
        if was_saving {
            self.state = EditState::Closed;
        }
        was_saving
    }

    /// Save failed: the form stays open for another try.
    pub fn save_failed(&mut self, locale: &Locale) -> String {
        if let EditState::Saving { url } = &self.state {
            self.state = EditState::Open { url: url.clone() };
        }
        locale.get("ERROR_SAVING_FACILITY_INFORMATION")
    }

    pub fn cancel(&mut self) {
        self.state = EditState::Closed;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AddNewState {
    Inactive,
    /// Listening for the next map click.
    AwaitingClick,
    Placed { position: LatLon },
}

/// What the page must undo when the add-new flow is cancelled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CancelEffects {
    pub remove_marker: bool,
    pub detach_click_listener: bool,
}

/// Hidden inputs mirroring the temporary marker's position.
pub type HiddenFields = [(String, String); 2];

/// "Add new facility": a draggable marker dropped on the next map click.
#[derive(Clone, Debug)]
pub struct AddNewFlow {
    state: AddNewState,
}

impl Default for AddNewFlow {
    fn default() -> Self {
        AddNewFlow { state: AddNewState::Inactive }
    }
}

impl AddNewFlow {
    pub fn state(&self) -> AddNewState {
        self.state
    }

    pub fn start(&mut self) {
        self.state = AddNewState::AwaitingClick;
    }

    /// Handle the map click. Only the first click after `start` counts.
    pub fn place(&mut self, position: LatLon) -> Option<HiddenFields> {
        if self.state != AddNewState::AwaitingClick {
            return None;
        }
        self.state = AddNewState::Placed { position };
        Some(Self::fields(position))
    }

    /// Marker dragged to a new spot.
    pub fn drag(&mut self, position: LatLon) -> Option<HiddenFields> {
        match self.state {
            AddNewState::Placed { .. } => {
                self.state = AddNewState::Placed { position };
                Some(Self::fields(position))
            }
            _ => None,
        }
    }

    pub fn position(&self) -> Option<LatLon> {
        match self.state {
            AddNewState::Placed { position } => Some(position),
            _ => None,
        }
    }

    pub fn hidden_fields(&self) -> Option<HiddenFields> {
        self.position().map(Self::fields)
    }

    pub fn cancel(&mut self) -> CancelEffects {
        let effects = match self.state {
            AddNewState::Inactive => CancelEffects::default(),
            AddNewState::AwaitingClick => CancelEffects { remove_marker: false, detach_click_listener: true },
            AddNewState::Placed { .. } => CancelEffects { remove_marker: true, detach_click_listener: true },
        };
        self.state = AddNewState::Inactive;
        effects
    }

    pub fn marker_icon() -> IconSpec {
        let mut icon = IconSpec::new("", Status::Visible, false, Overlay::None);
        icon.icon_fill = NEW_FACILITY_FILL.to_string();
        icon
    }

    fn fields(p: LatLon) -> HiddenFields {
        [
            (format!("{}.lat", attr::LOCATION), p.lat.to_string()),
            (format!("{}.lon", attr::LOCATION), p.lon.to_string()),
        ]
    }
}
