#![cfg(target_arch = "wasm32")]

use finder_wasm::FinderView;
use js_sys::Reflect;
use serde::Deserialize;
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

const PAYLOAD: &str = r#"{
    "attributes": [null,
        {"name": "title", "type": "str"},
        {"name": "location", "type": "geopt"},
        {"name": "services", "type": "multi", "values": ["X", "Y"]}
    ],
    "facility_types": [null, {"name": "hospital"}],
    "facilities": [null,
        {"name": "a", "type": 1, "values": [null, "Alpha", {"lat": 18.5, "lon": -72.3}, ["X"]]},
        {"name": "b", "type": 1, "values": [null, "Beta", {"lat": 19.0, "lon": -72.0}, ["Y"]]},
        {"name": "c", "type": 1, "values": [null, "Gamma", null, ["Y"]]}
    ]
}"#;

fn get(v: &JsValue, key: &str) -> JsValue {
    Reflect::get(v, &JsValue::from_str(key)).unwrap()
}

fn is_ok(v: &JsValue) -> bool {
    get(v, "ok").as_bool() == Some(true)
}

fn err_code(v: &JsValue) -> Option<String> {
    if is_ok(v) {
        return None;
    }
    get(&get(v, "error"), "code").as_string()
}

fn value<T: for<'de> Deserialize<'de>>(v: &JsValue) -> T {
    assert!(is_ok(v), "expected ok envelope");
    serde_wasm_bindgen::from_value(get(v, "value")).unwrap()
}

fn loaded() -> FinderView {
    let view = FinderView::new(JsValue::UNDEFINED).unwrap();
    assert!(is_ok(&view.load_data_json(PAYLOAD, None)));
    view
}

#[derive(Deserialize)]
struct ListView {
    visible_count: usize,
}

#[derive(Deserialize)]
struct Refresh {
    list: ListView,
}

#[wasm_bindgen_test]
fn filter_round_trip() {
    let view = loaded();
    let r: Refresh = value(&view.select_filter_by_name(Some("services".into()), Some("X".into())));
    assert_eq!(r.list.visible_count, 1);
    let r: Refresh = value(&view.select_filter("0 "));
    assert_eq!(r.list.visible_count, 3);
    let status: u8 = value(&view.status(1));
    assert_eq!(status, 1);
}

#[wasm_bindgen_test]
fn typed_errors() {
    let view = loaded();
    assert_eq!(err_code(&view.select_filter_by_name(Some("nope".into()), None)).as_deref(), Some("unknown_attribute"));
    assert_eq!(err_code(&view.select_facility(42)).as_deref(), Some("unknown_facility"));
    assert_eq!(err_code(&view.set_list_filter(9)).as_deref(), Some("bad_argument"));
    assert_eq!(err_code(&view.set_viewport(f64::NAN, 0.0, 1.0, 1.0, 5)).as_deref(), Some("bad_argument"));
    assert_eq!(err_code(&view.load_data_json("{", None)).as_deref(), Some("payload"));
    let far = view.set_viewport(0.0, 1.0e20, 1.0, 0.0, 5);
    assert_eq!(err_code(&far).as_deref(), Some("out_of_range"));
    assert_eq!(get(&get(&get(&far, "error"), "data"), "param").as_string().as_deref(), Some("west"));
    assert_eq!(err_code(&view.set_viewport(-91.0, 0.0, 1.0, 1.0, 5)).as_deref(), Some("out_of_range"));
}

#[wasm_bindgen_test]
fn bad_config_is_rejected() {
    let cfg = serde_wasm_bindgen::to_value(&serde_json::json!({"print": true, "max_markers_to_print": 0})).unwrap();
    let e = FinderView::new(cfg).err().expect("config error");
    assert_eq!(err_code(&e).as_deref(), Some("config"));
}

#[wasm_bindgen_test]
fn detail_outcomes() {
    let view = loaded();
    let first = get(&get(&view.select_facility(1), "value"), "request");
    let second = get(&get(&view.select_facility(2), "value"), "request");
    assert!(!first.is_null() && !second.is_null());

    let body = r#"{"json": {"values": [null, "Alpha", {"lat": 18.5, "lon": -72.3}, ["X"]]}, "html": "<p>a</p>"}"#;
    let stale = view.finish_detail(get(&first, "ticket"), body);
    assert_eq!(get(&get(&stale, "value"), "outcome").as_string().as_deref(), Some("stale"));

    let body = r#"{"json": {"values": [null, "Beta", {"lat": 19.0, "lon": -72.0}, ["Y"]]}, "html": "<p>b</p>"}"#;
    let loaded = view.finish_detail(get(&second, "ticket"), body);
    let outcome = get(&loaded, "value");
    assert_eq!(get(&outcome, "outcome").as_string().as_deref(), Some("loaded"));
    assert_eq!(get(&get(&outcome, "popup"), "html").as_string().as_deref(), Some("<p>b</p>"));
}

#[wasm_bindgen_test]
fn marker_icons() {
    let view = loaded();
    let m = get(&view.marker(1), "value");
    let url = get(&m, "icon_url").as_string().unwrap();
    assert!(url.starts_with("http://chart.apis.google.com/chart?"));
    assert!(get(&view.marker(3), "value").is_null());
    assert!(view.new_facility_icon_url().contains("f60"));
}
