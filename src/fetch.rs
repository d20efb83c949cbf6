use finder::{FinderError, Result};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortController, Headers, Request, RequestInit, Response};

/// Browser `fetch` with an abort-based timeout.
pub struct FetchClient {
    timeout_ms: u32,
}

fn network(e: JsValue) -> FinderError {
    FinderError::Network(e.as_string().unwrap_or_else(|| format!("{:?}", e)))
}

impl FetchClient {
    pub fn with_timeout(timeout_ms: u32) -> Self {
        FetchClient { timeout_ms }
    }

    pub async fn get_text(&self, url: &str) -> Result<String> {
        self.send("GET", url, None).await
    }

    /// POST an `application/x-www-form-urlencoded` body.
    pub async fn post_form(&self, url: &str, body: &str) -> Result<String> {
        self.send("POST", url, Some(body)).await
    }

    async fn send(&self, method: &str, url: &str, body: Option<&str>) -> Result<String> {
        let window = web_sys::window().ok_or_else(|| FinderError::Network("no window object".to_string()))?;

        let opts = RequestInit::new();
        opts.set_method(method);
        let controller = AbortController::new().map_err(network)?;
        let signal = controller.signal();
        opts.set_signal(Some(&signal));
        if let Some(b) = body {
            let headers = Headers::new().map_err(network)?;
            headers
                .set("Content-Type", "application/x-www-form-urlencoded")
                .map_err(network)?;
            opts.set_headers(&headers);
            opts.set_body(&JsValue::from_str(b));
        }
        let request = Request::new_with_str_and_init(url, &opts).map_err(network)?;

        let abort = Closure::once(move || controller.abort());
        let timer = window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                abort.as_ref().unchecked_ref(),
                self.timeout_ms as i32,
            )
            .map_err(network)?;

        let result = JsFuture::from(window.fetch_with_request(&request)).await;
        window.clear_timeout_with_handle(timer);
        let resp_value = match result {
            Ok(v) => v,
            Err(_) if signal.aborted() => {
                log::warn!("{} {} timed out after {} ms", method, url, self.timeout_ms);
                return Err(FinderError::NetworkTimeout(self.timeout_ms));
            }
            Err(e) => return Err(network(e)),
        };

        let resp: Response = resp_value.dyn_into().map_err(network)?;
        if !resp.ok() {
            return Err(FinderError::Network(format!("HTTP {} from {}", resp.status(), url)));
        }
        let text = JsFuture::from(resp.text().map_err(network)?).await.map_err(network)?;
        text.as_string()
            .ok_or_else(|| FinderError::Network("response body is not text".to_string()))
    }
}
