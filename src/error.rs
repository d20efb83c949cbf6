use crate::interop::{new_obj, set_kv, to_js};
use finder::FinderError;
use serde::Serialize;
use wasm_bindgen::prelude::*;

pub fn ok(v: JsValue) -> JsValue {
    let o = new_obj();
    set_kv(&o, "ok", &JsValue::from_bool(true));
    set_kv(&o, "value", &v);
    o.into()
}

pub fn err(code: &'static str, message: impl Into<String>, data: Option<JsValue>) -> JsValue {
    let root = new_obj();
    set_kv(&root, "ok", &JsValue::from_bool(false));
    let e = new_obj();
    set_kv(&e, "code", &JsValue::from_str(code));
    set_kv(&e, "message", &JsValue::from_str(&message.into()));
    if let Some(d) = data { set_kv(&e, "data", &d); }
    set_kv(&root, "error", &e.into());
    root.into()
}

/// `ok` with a serialized value; serialization failures become an error envelope.
pub fn ok_value<T: Serialize + ?Sized>(v: &T) -> JsValue {
    match to_js(v) {
        Ok(js) => ok(js),
        Err(e) => err("serialize", e.to_string(), None),
    }
}

pub fn from_result<T: Serialize>(r: finder::Result<T>) -> JsValue {
    match r {
        Ok(v) => ok_value(&v),
        Err(e) => finder_error(&e),
    }
}

pub fn finder_error(e: &FinderError) -> JsValue {
    let data = match e {
        FinderError::Validation(v) => to_js(v).ok(),
        FinderError::NetworkTimeout(ms) => {
            let d = new_obj();
            set_kv(&d, "timeout_ms", &JsValue::from_f64(*ms as f64));
            Some(d.into())
        }
        FinderError::UnknownFacility(id) | FinderError::UnknownAttribute(id) => {
            let d = new_obj();
            set_kv(&d, "id", &JsValue::from_str(id));
            Some(d.into())
        }
        _ => None,
    };
    err(e.code(), e.to_string(), data)
}

#[inline]
pub fn bad_argument(param: &str, message: impl Into<String>) -> JsValue {
    let d = new_obj(); set_kv(&d, "param", &JsValue::from_str(param));
    err("bad_argument", message, Some(d.into()))
}

#[inline]
pub fn non_finite(param: &str) -> JsValue {
    bad_argument(param, format!("parameter '{}' must be finite", param))
}

#[inline]
pub fn out_of_range(param: &str, min: f64, max: f64, got: f64) -> JsValue {
    let d = new_obj();
    set_kv(&d, "param", &JsValue::from_str(param));
    set_kv(&d, "min", &JsValue::from_f64(min));
    set_kv(&d, "max", &JsValue::from_f64(max));
    set_kv(&d, "got", &JsValue::from_f64(got));
    err("out_of_range", format!("parameter '{}' must be within [{}, {}]", param, min, max), Some(d.into()))
}

#[inline]
pub fn busy() -> JsValue {
    err("busy", "engine is in use by another call", None)
}
