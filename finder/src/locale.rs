use std::collections::HashMap;

/// English messages; pages override them with translated catalogues.
const DEFAULT_MESSAGES: &[(&str, &str)] = &[
    ("ALL", "All"),
    ("CANCEL", "Cancel"),
    ("CALL_FOR_AVAILABILITY", "Please call for availability information"),
    ("DATE_AT_TIME", "${DATE} at ${TIME}"),
    ("DISPLAYING_CLOSEST_N_FACILITIES", "Displaying ${NUM_FACILITIES} closest facilities"),
    ("DISPLAYING_FACILITIES_IN_RANGE", "Displaying facilities within ${RADIUS_MILES} miles"),
    ("DISTANCE", "${MILES} miles (${KM} km)"),
    ("EDIT_LATITUDE_LONGITUDE", "Edit the latitude and longitude to place it on the map."),
    ("ERROR", "An error occurred. Please try again."),
    ("ERROR_FIELD_IS_REQUIRED", "This field is required."),
    ("ERROR_LATITUDE_INVALID", "Latitude must be between -90 and 90."),
    ("ERROR_LATITUDE_MUST_BE_NUMBER", "Latitude must be a number."),
    ("ERROR_LOADING_EDIT_FORM", "There was an error loading the edit form."),
    ("ERROR_LOADING_FACILITY_INFORMATION", "There was an error loading the facility information."),
    ("ERROR_LONGITUDE_INVALID", "Longitude must be between -180 and 180."),
    ("ERROR_LONGITUDE_MUST_BE_NUMBER", "Longitude must be a number."),
    ("ERROR_SAVING_FACILITY_INFORMATION", "There was an error saving the facility information."),
    ("ERROR_VALUE_MUST_BE_NUMBER", "Value must be a number."),
    ("FACILITIES_IN_RANGE", "${NUM_FACILITIES} Facilities within ${RADIUS_MILES} miles"),
    ("FACILITY", "Facility"),
    ("HEALTHC_ID", "HealthC ID"),
    ("HOURS_AGO", "${HOURS} hours ago"),
    ("IN_MAP_VIEW", "in map view"),
    ("LAST_UPDATED", "Last updated ${AGE}"),
    ("LOADING", "Loading..."),
    ("MINUTES_AGO", "${MINUTES} minutes ago"),
    ("NEW_FACILITY", "New facility"),
    ("NO", "No"),
    ("NO_LOCATION_ENTERED", "No location has been entered for this facility."),
    ("NO_MATCHING_FACILITIES", "No matching facilities"),
    ("NO_REPORTS_RECEIVED", "No reports received"),
    ("OPEN_TOTAL_BEDS", "Open/Total Beds"),
    ("CLICK_TO_ADD_FACILITY", "Click on the map to add a new facility."),
    ("CONFIRM_PURGE", "Permanently delete ${FACILITY_NAME}? This cannot be undone."),
    ("PCODE", "PCode"),
    ("PHONE_ABBREVIATION", "Tel. ${PHONE}"),
    ("SAVED", "Saved"),
    ("SAVING", "Saving..."),
    ("SECOND_AGO", "1 second ago"),
    ("SECONDS_AGO", "${SECONDS} seconds ago"),
    ("SECONDS_IN_FUTURE", "${SECONDS} seconds in the future"),
    ("SERVICES", "Services"),
    ("SHOW", "Show"),
    ("SIGN_IN_TO_EDIT_LOCATION", "${START_LINK}Sign in${END_LINK} to edit the location."),
    ("YES", "Yes"),
];

/// Expand `${NAME}` placeholders. Unknown placeholders are left as-is.
pub fn render_template(template: &str, params: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match params.iter().find(|(k, _)| *k == name) {
                    Some((_, v)) => out.push_str(v),
                    None => {
                        out.push_str("${");
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Message catalogue for user-visible strings.
#[derive(Clone, Debug)]
pub struct Locale {
    messages: HashMap<String, String>,
}

impl Default for Locale {
    fn default() -> Self {
        Locale {
            messages: DEFAULT_MESSAGES
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl Locale {
    /// Default catalogue with page-supplied translations layered on top.
    pub fn with_overrides<I, K, V>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut l = Locale::default();
        for (k, v) in overrides {
            l.messages.insert(k.into(), v.into());
        }
        l
    }

    /// Message without parameters. A missing key renders as the key itself.
    pub fn get(&self, key: &str) -> String {
        self.message(key, &[])
    }

    pub fn message(&self, key: &str, params: &[(&str, &str)]) -> String {
        match self.messages.get(key) {
            Some(t) => render_template(t, params),
            None => {
                log::warn!("missing message {}", key);
                key.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_placeholders() {
        assert_eq!(
            render_template("${MILES} miles (${KM} km)", &[("MILES", "3.1"), ("KM", "5.00")]),
            "3.1 miles (5.00 km)"
        );
        assert_eq!(render_template("${X} and ${Y", &[("X", "a")]), "a and ${Y");
        assert_eq!(render_template("${Q}", &[]), "${Q}");
    }

    #[test]
    fn overrides_replace_defaults() {
        let l = Locale::with_overrides([("LOADING", "Chargement...")]);
        assert_eq!(l.get("LOADING"), "Chargement...");
        assert_eq!(l.get("SAVED"), "Saved");
        assert_eq!(l.get("NOPE"), "NOPE");
    }
}
