use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;

mod api;
mod error;
mod fetch;
mod interop;

/// Page handle on the engine. Shared so async calls can come back to it
/// after their fetch resolves.
#[wasm_bindgen]
pub struct FinderView {
    pub(crate) inner: Rc<RefCell<finder::Finder>>,
}

impl FinderView {
    pub fn rs_new(config: finder::FinderConfig) -> FinderView {
        FinderView { inner: Rc::new(RefCell::new(finder::Finder::new(config))) }
    }

    pub fn rs_config(&self) -> finder::FinderConfig {
        self.inner.borrow().config().clone()
    }
}
