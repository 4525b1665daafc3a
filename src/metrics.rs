use once_cell::sync::{Lazy, OnceCell};
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::error;

static GLOBAL_REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);
static REGISTER_ONCE: OnceCell<()> = OnceCell::new();
static REQUESTS: OnceCell<IntCounterVec> = OnceCell::new();

pub fn register_metrics() {
    REGISTER_ONCE.get_or_init(|| {
        let registry = global_registry();
        match IntCounterVec::new(
            Opts::new(
                "recettes_requests_total",
                "Recipe API requests by operation and outcome",
            ),
            &["operation", "result"],
        ) {
            Ok(requests) => {
                if let Err(err) = registry.register(Box::new(requests.clone())) {
                    error!(?err, "failed to register request counter");
                }
                let _ = REQUESTS.set(requests);
            }
            Err(err) => error!(?err, "failed to create request counter"),
        }
    });
}

pub fn global_registry() -> &'static Registry {
    &GLOBAL_REGISTRY
}

pub fn record_request(operation: &str, result: &str) {
    register_metrics();
    if let Some(counter) = REQUESTS.get() {
        counter.with_label_values(&[operation, result]).inc();
    }
}

/// Text exposition of every registered metric, with its content type.
pub fn render() -> Result<(String, String), prometheus::Error> {
    register_metrics();
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&global_registry().gather(), &mut buffer)?;
    let body = String::from_utf8(buffer)
        .map_err(|err| prometheus::Error::Msg(format!("metrics are not utf8: {err}")))?;
    Ok((encoder.format_type().to_string(), body))
}
