use crate::scrapers::traits::{BrowserSession, InterceptedRequest, InterceptedResponse};
use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use headless_chrome::protocol::cdp::types::Event;
use headless_chrome::protocol::cdp::Network::events::ResponseReceivedEventParams;
use headless_chrome::protocol::cdp::Network::GetResponseBodyReturnObject;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

const RESPONSE_HANDLER_NAME: &str = "side-channel-capture";

/// Headless Chrome session with a single tab reused for the whole crawl
///
/// Responses whose URL contains the capture marker are recorded together
/// with the body of the request that produced them. Dropping the session
/// closes the tab and shuts Chrome down.
pub struct ChromeSession {
    _browser: Browser,
    tab: Arc<Tab>,
    captured: Arc<Mutex<Vec<InterceptedRequest>>>,
    pending: Arc<PendingBodies>,
}

/// Request bodies of in-flight matching requests, keyed by request id
#[derive(Debug)]
struct PendingBodies {
    marker: String,
    bodies: Mutex<HashMap<String, Vec<u8>>>,
}

impl PendingBodies {
    fn new(marker: &str) -> Self {
        Self {
            marker: marker.to_string(),
            bodies: Mutex::default(),
        }
    }

    /// Keep `body` until its response arrives; other URLs are ignored
    fn record(&self, url: &str, request_id: &str, body: &str) {
        if !url.contains(&self.marker) {
            return;
        }
        if let Ok(mut bodies) = self.bodies.lock() {
            bodies.insert(request_id.to_string(), body.as_bytes().to_vec());
        }
    }

    fn take(&self, request_id: &str) -> Vec<u8> {
        self.bodies
            .lock()
            .ok()
            .and_then(|mut bodies| bodies.remove(request_id))
            .unwrap_or_default()
    }

    fn clear(&self) {
        if let Ok(mut bodies) = self.bodies.lock() {
            bodies.clear();
        }
    }
}

impl ChromeSession {
    /// Launch Chrome and start capturing responses matching `capture_marker`
    pub fn launch(capture_marker: &str) -> Result<Self> {
        info!("Launching headless Chrome...");

        let options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .build()
            .context("Failed to build launch options")?;

        let browser = Browser::new(options).context("Failed to launch Chrome browser")?;
        let tab = browser.new_tab().context("Failed to open browser tab")?;

        let captured = Arc::new(Mutex::new(Vec::new()));
        let pending = Arc::new(PendingBodies::new(capture_marker));
        install_capture(&tab, Arc::clone(&pending), Arc::clone(&captured))?;

        Ok(Self {
            _browser: browser,
            tab,
            captured,
            pending,
        })
    }
}

fn install_capture(
    tab: &Arc<Tab>,
    pending: Arc<PendingBodies>,
    captured: Arc<Mutex<Vec<InterceptedRequest>>>,
) -> Result<()> {
    let pending_responses = Arc::clone(&pending);
    tab.register_response_handling(
        RESPONSE_HANDLER_NAME,
        Box::new(
            move |params: ResponseReceivedEventParams,
                  fetch_body: &dyn Fn() -> Result<GetResponseBodyReturnObject>| {
                if !params.response.url.contains(&pending_responses.marker) {
                    return;
                }

                let request_body = pending_responses.take(&params.request_id);

                let body = match fetch_body() {
                    Ok(body) => decode_body(body),
                    Err(e) => {
                        debug!("No body for {}: {:#}", params.response.url, e);
                        Vec::new()
                    }
                };

                let entry = InterceptedRequest {
                    url: params.response.url.clone(),
                    request_body,
                    response: Some(InterceptedResponse {
                        headers: header_map(&params.response.headers),
                        body,
                    }),
                };

                if let Ok(mut captured) = captured.lock() {
                    captured.push(entry);
                }
            },
        ),
    )
    .context("Failed to register response capture")?;

    tab.add_event_listener(Arc::new(move |event: &Event| {
        if let Event::NetworkRequestWillBeSent(sent) = event {
            if let Some(post_data) = &sent.params.request.post_data {
                pending.record(&sent.params.request.url, &sent.params.request_id, post_data);
            }
        }
    }))
    .context("Failed to listen for outgoing requests")?;

    Ok(())
}

fn decode_body(body: GetResponseBodyReturnObject) -> Vec<u8> {
    if !body.base_64_encoded {
        return body.body.into_bytes();
    }
    match STANDARD.decode(body.body.as_bytes()) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Failed to decode base64 response body: {}", e);
            Vec::new()
        }
    }
}

fn header_map<T: serde::Serialize>(headers: &T) -> HashMap<String, String> {
    let Ok(Value::Object(map)) = serde_json::to_value(headers) else {
        return HashMap::new();
    };
    map.into_iter()
        .filter_map(|(name, value)| {
            value
                .as_str()
                .map(|value| (name.to_ascii_lowercase(), value.to_string()))
        })
        .collect()
}

impl BrowserSession for ChromeSession {
    fn navigate(&mut self, url: &str) -> Result<()> {
        debug!("Navigating to {}", url);
        self.tab
            .navigate_to(url)
            .with_context(|| format!("Failed to navigate to {}", url))?;
        self.tab
            .wait_until_navigated()
            .with_context(|| format!("Navigation to {} did not complete", url))?;
        Ok(())
    }

    fn wait_until_present(&mut self, selector: &str, timeout: Duration) -> Result<bool> {
        match self
            .tab
            .wait_for_element_with_custom_timeout(selector, timeout)
        {
            Ok(_) => Ok(true),
            Err(e) => {
                debug!("'{}' not present after {:?}: {:#}", selector, timeout, e);
                Ok(false)
            }
        }
    }

    fn page_html(&mut self) -> Result<String> {
        let html_result = self
            .tab
            .evaluate("document.documentElement.outerHTML", false)?;
        html_result
            .value
            .and_then(|value| value.as_str().map(str::to_string))
            .context("Could not get HTML from page")
    }

    fn intercepted_requests(&self) -> Vec<InterceptedRequest> {
        self.captured
            .lock()
            .map(|captured| captured.clone())
            .unwrap_or_default()
    }

    fn clear_intercepted(&mut self) {
        if let Ok(mut captured) = self.captured.lock() {
            captured.clear();
        }
        self.pending.clear();
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        info!("Closing headless Chrome");
        if let Err(e) = self.tab.close(true) {
            debug!("Tab did not close cleanly: {:#}", e);
        }
    }
}
