use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("modelchat.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter =
    Counter::new("modelchat.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("modelchat.client.request_duration_seconds");

pub(crate) static STREAM_EVENTS: Counter = Counter::new("modelchat.stream.events");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("modelchat.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("modelchat.stream.bytes");
pub(crate) static STREAM_TTFB: Moments = Moments::new("modelchat.stream.ttfb_seconds");
pub(crate) static STREAM_DURATION: Moments = Moments::new("modelchat.stream.duration_seconds");

pub(crate) static SESSION_TURNS: Counter = Counter::new("modelchat.session.turns");
pub(crate) static SESSION_COMMANDS: Counter = Counter::new("modelchat.session.commands");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_moments(&STREAM_TTFB);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&SESSION_TURNS);
    collector.register_counter(&SESSION_COMMANDS);
}
