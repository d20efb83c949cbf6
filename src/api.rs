use crate::error;
use crate::fetch::FetchClient;
use crate::interop::{from_js, new_obj, now_ms, set_kv, to_js};
use crate::FinderView;
use finder::edit::{AddNewFlow, FormField};
use finder::list::ListFilter;
use finder::locale::Locale;
use finder::model::{LatLon, Payload, Value};
use finder::selection::{DetailResponse, Ticket};
use finder::settings::{PurgeRequest, SubscribeAction};
use finder::viewport::Bounds;
use finder::{DetailRequest, Finder, FinderConfig, FinderError};
use js_sys::Promise;
use std::collections::HashMap;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
type JsValue = wasm_bindgen::JsValue;

#[wasm_bindgen]
pub fn set_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Route `log` output to the browser console. Repeated calls are ignored.
#[wasm_bindgen]
pub fn init_logging(level: Option<String>) {
    let level = match level.as_deref() {
        Some("error") => log::Level::Error,
        Some("warn") => log::Level::Warn,
        Some("debug") => log::Level::Debug,
        Some("trace") => log::Level::Trace,
        _ => log::Level::Info,
    };
    let _ = console_log::init_with_level(level);
}

fn finite(param: &str, v: f64) -> Result<f64, JsValue> {
    if v.is_finite() { Ok(v) } else { Err(error::non_finite(param)) }
}

fn in_range(param: &str, v: f64, min: f64, max: f64) -> Result<f64, JsValue> {
    let v = finite(param, v)?;
    if (min..=max).contains(&v) { Ok(v) } else { Err(error::out_of_range(param, min, max, v)) }
}

fn bounds(south: f64, west: f64, north: f64, east: f64) -> Result<Bounds, JsValue> {
    Ok(Bounds::new(
        in_range("south", south, -90.0, 90.0)?,
        in_range("west", west, -180.0, 180.0)?,
        in_range("north", north, -90.0, 90.0)?,
        in_range("east", east, -180.0, 180.0)?,
    ))
}

fn lat_lon(lat: f64, lon: f64) -> Result<LatLon, JsValue> {
    Ok(LatLon::new(finite("lat", lat)?, finite("lon", lon)?))
}

impl FinderView {
    fn with<F: FnOnce(&Finder) -> JsValue>(&self, f: F) -> JsValue {
        match self.inner.try_borrow() {
            Ok(g) => f(&g),
            Err(_) => error::busy(),
        }
    }

    fn with_mut<F: FnOnce(&mut Finder) -> JsValue>(&self, f: F) -> JsValue {
        match self.inner.try_borrow_mut() {
            Ok(mut g) => f(&mut g),
            Err(_) => error::busy(),
        }
    }
}

#[wasm_bindgen]
impl FinderView {
    /// `config` is a partial `FinderConfig` object; `undefined` takes the defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<FinderView, JsValue> {
        let config: FinderConfig = if config.is_undefined() || config.is_null() {
            FinderConfig::default()
        } else {
            from_js(config).map_err(|e| error::finder_error(&FinderError::Config(e.to_string())))?
        };
        config.validate().map_err(|e| error::finder_error(&e))?;
        Ok(FinderView::rs_new(config))
    }

    pub fn config(&self) -> JsValue {
        error::ok_value(&self.rs_config())
    }

    /// Page-supplied translations layered over the default catalogue.
    pub fn set_messages(&self, messages: JsValue) -> JsValue {
        let messages: HashMap<String, String> = match from_js(messages) {
            Ok(m) => m,
            Err(e) => return error::bad_argument("messages", e.to_string()),
        };
        self.with_mut(|f| {
            f.set_locale(Locale::with_overrides(messages));
            error::ok(JsValue::UNDEFINED)
        })
    }

    // Data

    pub fn load_data(&self, payload: JsValue, selected_name: Option<String>) -> JsValue {
        let payload: Payload = match from_js(payload) {
            Ok(p) => p,
            Err(e) => return error::err("payload", e.to_string(), None),
        };
        self.with_mut(|f| error::ok_value(&f.load_data(payload, selected_name.as_deref())))
    }

    pub fn load_data_json(&self, json: &str, selected_name: Option<String>) -> JsValue {
        self.with_mut(|f| error::from_result(f.load_data_json(json, selected_name.as_deref())))
    }

    /// Monitor push of one attribute value (`null` clears it).
    pub fn set_facility_attribute(&self, facility_name: &str, attribute_name: &str, value: JsValue) -> JsValue {
        let value: Option<Value> = match from_js(value) {
            Ok(v) => v,
            Err(e) => return error::bad_argument("value", e.to_string()),
        };
        self.with_mut(|f| error::from_result(f.set_facility_attribute(facility_name, attribute_name, value)))
    }

    // Filters and list

    /// Filter select box option value, `"<attribute_index> <value>"`.
    pub fn select_filter(&self, option: &str) -> JsValue {
        self.with_mut(|f| error::from_result(f.select_filter_option(option)))
    }

    pub fn select_filter_by_name(&self, attribute_name: Option<String>, value: Option<String>) -> JsValue {
        self.with_mut(|f| error::from_result(f.select_filter_by_name(attribute_name.as_deref(), value)))
    }

    pub fn select_division(&self, division: Option<u32>) -> JsValue {
        self.with_mut(|f| error::from_result(f.select_division(division.map(|d| d as usize))))
    }

    /// 0 lists every facility, otherwise only those with this status code.
    pub fn set_list_filter(&self, code: u8) -> JsValue {
        let filter = match ListFilter::from_code(code) {
            Some(l) => l,
            None => return error::bad_argument("code", format!("no status with code {}", code)),
        };
        self.with_mut(|f| error::ok_value(&f.set_list_filter(filter)))
    }

    pub fn list_view(&self) -> JsValue {
        self.with(|f| error::ok_value(&f.list_view()))
    }

    pub fn division_counts(&self) -> JsValue {
        self.with(|f| error::ok_value(&f.division_counts()))
    }

    pub fn status(&self, facility: u32) -> JsValue {
        self.with(|f| match f.status(facility as usize) {
            Some(st) => error::ok(JsValue::from_f64(st.code() as f64)),
            None => error::ok(JsValue::NULL),
        })
    }

    /// Marker and icon for one facility, `null` when it has no marker.
    pub fn marker(&self, facility: u32) -> JsValue {
        self.with(|f| match f.markers().get(facility as usize) {
            Some(m) => {
                let o = new_obj();
                match to_js(m) {
                    Ok(v) => set_kv(&o, "marker", &v),
                    Err(e) => return error::err("serialize", e.to_string(), None),
                }
                let url = m.icon.chart_url(f.config().print);
                set_kv(&o, "icon_url", &JsValue::from_str(&url));
                set_kv(&o, "clustered", &JsValue::from_bool(f.markers().is_clustered(m.facility)));
                error::ok(o.into())
            }
            None => error::ok(JsValue::NULL),
        })
    }

    pub fn print_rows(&self) -> JsValue {
        self.with(|f| error::ok_value(&f.print_rows()))
    }

    pub fn print_summary(&self) -> JsValue {
        self.with(|f| error::ok_value(&f.print_summary()))
    }

    pub fn freshness(&self) -> JsValue {
        self.with(|f| error::ok_value(&f.freshness(now_ms() / 1000.0)))
    }

    // Map viewport

    pub fn set_viewport(&self, south: f64, west: f64, north: f64, east: f64, zoom: u8) -> JsValue {
        let bounds = match bounds(south, west, north, east) {
            Ok(b) => b,
            Err(e) => return e,
        };
        self.with_mut(|f| {
            f.set_viewport(bounds, zoom);
            error::ok(JsValue::UNDEFINED)
        })
    }

    /// Call on every pan/zoom. `value.refresh` is null when the update was
    /// deferred; call `poll` at `value.poll_at` (ms since epoch) to get it.
    pub fn viewport_changed(&self) -> JsValue {
        self.with_mut(|f| {
            let refresh = f.viewport_changed(now_ms());
            let o = new_obj();
            match to_js(&refresh) {
                Ok(v) => set_kv(&o, "refresh", &v),
                Err(e) => return error::err("serialize", e.to_string(), None),
            }
            let poll_at = f.view_state().debouncer.pending().map_or(JsValue::NULL, JsValue::from_f64);
            set_kv(&o, "poll_at", &poll_at);
            error::ok(o.into())
        })
    }

    pub fn poll(&self) -> JsValue {
        self.with_mut(|f| error::ok_value(&f.poll(now_ms())))
    }

    pub fn set_viewport_filter(&self, on: bool) -> JsValue {
        self.with_mut(|f| error::ok_value(&f.set_viewport_filter(on)))
    }

    // Selection and detail

    /// Move the selection. `value.request`, when present, goes to `load_detail`.
    pub fn select_facility(&self, facility: u32) -> JsValue {
        self.with_mut(|f| error::from_result(f.select_facility(facility as usize)))
    }

    /// Fetch the detail bubble for a request from `select_facility` and apply
    /// it. Resolves to the outcome envelope; never rejects.
    pub fn load_detail(&self, request: JsValue) -> Promise {
        let inner = self.inner.clone();
        future_to_promise(async move {
            let req: DetailRequest = match from_js(request) {
                Ok(r) => r,
                Err(e) => return Ok(error::bad_argument("request", e.to_string())),
            };
            let client = FetchClient::with_timeout(req.timeout_ms);
            let result = match client.get_text(&req.url).await {
                Ok(body) => DetailResponse::from_json(&body).map_err(FinderError::from),
                Err(e) => Err(e),
            };
            let outcome = match inner.try_borrow_mut() {
                Ok(mut f) => f.finish_detail(req.ticket, result),
                Err(_) => return Ok(error::busy()),
            };
            Ok(error::ok_value(&outcome))
        })
    }

    /// Apply a detail body the page fetched itself.
    pub fn finish_detail(&self, ticket: JsValue, body: &str) -> JsValue {
        let ticket: Ticket = match from_js(ticket) {
            Ok(t) => t,
            Err(e) => return error::bad_argument("ticket", e.to_string()),
        };
        let result = DetailResponse::from_json(body).map_err(FinderError::from);
        self.with_mut(|f| error::ok_value(&f.finish_detail(ticket, result)))
    }

    /// Report a failed detail fetch the page performed itself.
    pub fn fail_detail(&self, ticket: JsValue, message: String) -> JsValue {
        let ticket: Ticket = match from_js(ticket) {
            Ok(t) => t,
            Err(e) => return error::bad_argument("ticket", e.to_string()),
        };
        self.with_mut(|f| error::ok_value(&f.finish_detail(ticket, Err(FinderError::Network(message)))))
    }

    // Editing

    pub fn edit_url(&self, facility_name: &str) -> String {
        self.inner.try_borrow().map(|f| f.edit_url(facility_name)).unwrap_or_default()
    }

    pub fn start_edit(&self, url: &str) -> JsValue {
        self.with_mut(|f| error::ok(JsValue::from_bool(f.start_edit(url))))
    }

    pub fn edit_loaded(&self) -> JsValue {
        self.with_mut(|f| error::ok(JsValue::from_bool(f.edit_loaded())))
    }

    pub fn edit_load_failed(&self) -> JsValue {
        self.with_mut(|f| error::ok(JsValue::from_str(&f.edit_load_failed())))
    }

    /// Validate the form without sending it. Resolves to the post URL.
    pub fn save_edit(&self, fields: JsValue) -> JsValue {
        let fields: Vec<FormField> = match from_js(fields) {
            Ok(v) => v,
            Err(e) => return error::bad_argument("fields", e.to_string()),
        };
        self.with_mut(|f| error::from_result(f.save_edit(&fields)))
    }

    /// Validate, post the serialized form and reload the facility on success.
    pub fn submit_edit(&self, fields: JsValue, body: String) -> Promise {
        let inner = self.inner.clone();
        future_to_promise(async move {
            let fields: Vec<FormField> = match from_js(fields) {
                Ok(v) => v,
                Err(e) => return Ok(error::bad_argument("fields", e.to_string())),
            };
            let (url, timeout) = match inner.try_borrow_mut() {
                Ok(mut f) => match f.save_edit(&fields) {
                    Ok(url) => (url, f.config().detail_timeout_ms),
                    Err(e) => return Ok(error::finder_error(&e)),
                },
                Err(_) => return Ok(error::busy()),
            };
            let sent = FetchClient::with_timeout(timeout).post_form(&url, &body).await;
            let mut f = match inner.try_borrow_mut() {
                Ok(f) => f,
                Err(_) => return Ok(error::busy()),
            };
            match sent {
                Ok(_) => Ok(error::from_result(f.edit_saved())),
                Err(e) => {
                    log::warn!("saving {} failed: {}", url, e);
                    let message = f.edit_save_failed();
                    Ok(error::err(e.code(), message, None))
                }
            }
        })
    }

    pub fn cancel_edit(&self) -> JsValue {
        self.with_mut(|f| error::ok_value(&f.cancel_edit()))
    }

    // Adding a facility

    pub fn start_add_new(&self) -> JsValue {
        self.with_mut(|f| error::ok_value(&f.start_add_new()))
    }

    /// Map click while adding. `null` if the flow was not waiting for one.
    pub fn place_new_facility(&self, lat: f64, lon: f64) -> JsValue {
        let p = match lat_lon(lat, lon) {
            Ok(p) => p,
            Err(e) => return e,
        };
        self.with_mut(|f| match f.place_new_facility(p) {
            Some((fields, url)) => {
                let o = new_obj();
                match to_js(&fields) {
                    Ok(v) => set_kv(&o, "hidden_fields", &v),
                    Err(e) => return error::err("serialize", e.to_string(), None),
                }
                set_kv(&o, "edit_url", &JsValue::from_str(&url));
                error::ok(o.into())
            }
            None => error::ok(JsValue::NULL),
        })
    }

    pub fn drag_new_facility(&self, lat: f64, lon: f64) -> JsValue {
        let p = match lat_lon(lat, lon) {
            Ok(p) => p,
            Err(e) => return e,
        };
        self.with_mut(|f| error::ok_value(&f.drag_new_facility(p)))
    }

    pub fn cancel_add_new(&self) -> JsValue {
        self.with_mut(|f| error::ok_value(&f.cancel_add_new()))
    }

    pub fn new_facility_icon_url(&self) -> String {
        let print = self.inner.try_borrow().map(|f| f.config().print).unwrap_or(false);
        AddNewFlow::marker_icon().chart_url(print)
    }

    // Settings

    /// Post a subscription change, e.g. `{action: "subscribe", subject_name, frequency}`.
    pub fn subscribe(&self, subdomain: String, action: JsValue) -> Promise {
        let inner = self.inner.clone();
        future_to_promise(async move {
            let action: SubscribeAction = match from_js(action) {
                Ok(a) => a,
                Err(e) => return Ok(error::bad_argument("action", e.to_string())),
            };
            let body = match action.form_body(&subdomain) {
                Ok(b) => b,
                Err(e) => return Ok(error::finder_error(&FinderError::from(e))),
            };
            let (url, timeout) = match inner.try_borrow() {
                Ok(f) => (f.config().subscribe_url.clone(), f.config().detail_timeout_ms),
                Err(_) => return Ok(error::busy()),
            };
            log::debug!("{} for {}", action.name(), subdomain);
            let sent = FetchClient::with_timeout(timeout).post_form(&url, &body).await;
            Ok(match sent {
                Ok(text) => error::ok(JsValue::from_str(&text)),
                Err(e) => error::finder_error(&e),
            })
        })
    }

    /// Ask for confirmation, then delete the facility. Resolves to `false`
    /// when the user declined.
    pub fn purge(&self, subdomain: String, subject_name: String) -> Promise {
        let inner = self.inner.clone();
        future_to_promise(async move {
            let (url, timeout, prompt) = match inner.try_borrow() {
                Ok(f) => (
                    f.config().purge_url.clone(),
                    f.config().detail_timeout_ms,
                    f.locale().message("CONFIRM_PURGE", &[("FACILITY_NAME", subject_name.as_str())]),
                ),
                Err(_) => return Ok(error::busy()),
            };
            let request = PurgeRequest { subdomain, subject_name };
            let body = request.confirmed(&prompt, |text| {
                web_sys::window()
                    .and_then(|w| w.confirm_with_message(text).ok())
                    .unwrap_or(false)
            });
            let body = match body {
                Some(b) => b,
                None => return Ok(error::ok(JsValue::FALSE)),
            };
            Ok(match FetchClient::with_timeout(timeout).post_form(&url, &body).await {
                Ok(_) => error::ok(JsValue::TRUE),
                Err(e) => error::finder_error(&e),
            })
        })
    }
}
