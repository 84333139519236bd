//! Page-view beacon: one best-effort request per page load.
//!
//! The host calls [`PageViewBeacon::on_dom_ready`] once the page structure is
//! queryable. The first call assembles a [`TrackingEvent`] and hands it to the
//! transport on a background task; the caller never waits on the network.
//! Later calls are ignored. Failures are logged and counted, never returned.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use metrics::counter;
use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::{
    application::{
        page::PageContext,
        response::{IgnoreResponse, ResponseHandler, decode_json, decode_jsonp},
    },
    domain::{
        bot::BotHeuristic,
        event::{SiteId, TrackingEvent},
    },
    infra::{
        telemetry::{METRIC_DELIVERED, METRIC_DISPATCHED, METRIC_FAILED},
        transport::BeaconTransport,
    },
};

pub const DEFAULT_CALLBACK_PARAM: &str = "callback";
const CALLBACK_PREFIX: &str = "pageview_";

/// How the request is dressed for the cross-origin collector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransportStyle {
    /// Plain GET; the collector grants cross-origin access itself.
    #[default]
    Cors,
    /// Callback-wrapped GET for collectors that only speak JSONP.
    Jsonp,
}

impl TransportStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cors => "cors",
            Self::Jsonp => "jsonp",
        }
    }
}

impl fmt::Display for TransportStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransportStyle {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cors" => Ok(Self::Cors),
            "jsonp" => Ok(Self::Jsonp),
            other => Err(format!("unknown transport `{other}` (expected cors|jsonp)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BeaconConfig {
    pub endpoint: Url,
    pub site: SiteId,
    pub bots: BotHeuristic,
    pub style: TransportStyle,
    pub callback_param: String,
}

impl BeaconConfig {
    pub fn new(endpoint: Url, site: SiteId) -> Self {
        Self {
            endpoint,
            site,
            bots: BotHeuristic::default(),
            style: TransportStyle::default(),
            callback_param: DEFAULT_CALLBACK_PARAM.to_string(),
        }
    }

    pub fn event_for(&self, page: PageContext) -> TrackingEvent {
        let bot = self.bots.is_bot(&page.agent);
        TrackingEvent {
            referrer: page.referrer,
            title: page.title,
            agent: page.agent,
            bot,
            language: page.language,
            site: self.site.clone(),
        }
    }

    /// The request `page` produces. JSONP requests get a fresh callback name.
    pub fn request_for(&self, page: PageContext) -> BeaconRequest {
        let event = self.event_for(page);
        let mut url = event.to_url(&self.endpoint);
        let callback = match self.style {
            TransportStyle::Cors => None,
            TransportStyle::Jsonp => {
                let name = format!("{CALLBACK_PREFIX}{}", Uuid::new_v4().simple());
                url.query_pairs_mut()
                    .append_pair(&self.callback_param, &name);
                Some(name)
            }
        };
        BeaconRequest { url, callback }
    }
}

/// Result of signalling DOM-ready.
#[derive(Debug)]
pub enum Dispatch {
    /// The request is in flight; awaiting the handle is optional.
    Sent(JoinHandle<Delivery>),
    /// This page load already produced its request.
    AlreadyFired,
    /// No async runtime was available, so nothing could be sent.
    NoRuntime,
}

impl Dispatch {
    pub fn into_handle(self) -> Option<JoinHandle<Delivery>> {
        match self {
            Self::Sent(handle) => Some(handle),
            Self::AlreadyFired | Self::NoRuntime => None,
        }
    }
}

/// What became of the request. Informational only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Delivered { status: u16 },
    Failed { reason: String },
}

/// An outgoing request and, for JSONP, the callback it names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeaconRequest {
    pub url: Url,
    pub callback: Option<String>,
}

pub struct PageViewBeacon {
    config: Arc<BeaconConfig>,
    transport: Arc<dyn BeaconTransport>,
    handler: Arc<dyn ResponseHandler>,
    fired: AtomicBool,
}

impl fmt::Debug for PageViewBeacon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageViewBeacon")
            .field("config", &self.config)
            .field("fired", &self.fired.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl PageViewBeacon {
    pub fn new(config: BeaconConfig, transport: Arc<dyn BeaconTransport>) -> Self {
        Self {
            config: Arc::new(config),
            transport,
            handler: Arc::new(IgnoreResponse),
            fired: AtomicBool::new(false),
        }
    }

    pub fn with_handler(mut self, handler: Arc<dyn ResponseHandler>) -> Self {
        self.handler = handler;
        self
    }

    pub fn config(&self) -> &BeaconConfig {
        &self.config
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Assemble the event for `page`. Only `bot` is computed; the rest is read.
    pub fn event_for(&self, page: PageContext) -> TrackingEvent {
        self.config.event_for(page)
    }

    /// Build the request `page` would produce, without sending it.
    pub fn request_for(&self, page: PageContext) -> BeaconRequest {
        self.config.request_for(page)
    }

    /// Single-fire lifecycle hook for the DOM-ready point.
    pub fn on_dom_ready(&self, page: PageContext) -> Dispatch {
        if self
            .fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("page-view beacon already fired for this page load");
            return Dispatch::AlreadyFired;
        }

        let Ok(runtime) = Handle::try_current() else {
            warn!("no async runtime available; page-view beacon dropped");
            return Dispatch::NoRuntime;
        };

        let request = self.request_for(page);
        let transport = Arc::clone(&self.transport);
        let handler = Arc::clone(&self.handler);
        let style = self.config.style;

        counter!(METRIC_DISPATCHED).increment(1);
        debug!(url = %request.url, transport = %style, "dispatching page-view beacon");

        Dispatch::Sent(runtime.spawn(deliver(transport, handler, request)))
    }
}

async fn deliver(
    transport: Arc<dyn BeaconTransport>,
    handler: Arc<dyn ResponseHandler>,
    request: BeaconRequest,
) -> Delivery {
    let BeaconRequest { url, callback } = request;

    match transport.get(url).await {
        Ok(response) => {
            counter!(METRIC_DELIVERED).increment(1);
            if response.is_success() {
                let payload = match callback.as_deref() {
                    Some(name) => decode_jsonp(&response.body, name),
                    None => decode_json(&response.body),
                };
                match payload {
                    Some(payload) => handler.on_response(&payload),
                    None => debug!(status = response.status, "collector reply ignored"),
                }
            }
            Delivery::Delivered {
                status: response.status,
            }
        }
        Err(err) => {
            counter!(METRIC_FAILED).increment(1);
            debug!(error = %err, "page-view beacon failed");
            Delivery::Failed {
                reason: err.to_string(),
            }
        }
    }
}
