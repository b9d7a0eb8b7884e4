use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("chatboard.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("chatboard.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("chatboard.client.request_duration_seconds");

pub(crate) static STREAM_FRAMES: Counter = Counter::new("chatboard.stream.frames");
pub(crate) static STREAM_FRAMES_SKIPPED: Counter = Counter::new("chatboard.stream.frames_skipped");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("chatboard.stream.errors");
pub(crate) static STREAM_CHUNKS: Counter = Counter::new("chatboard.stream.chunks");

pub(crate) static STORE_MUTATIONS: Counter = Counter::new("chatboard.store.mutations");
pub(crate) static SNAPSHOT_SAVES: Counter = Counter::new("chatboard.store.snapshot_saves");
pub(crate) static SNAPSHOT_LOAD_FAILURES: Counter =
    Counter::new("chatboard.store.snapshot_load_failures");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_FRAMES);
    collector.register_counter(&STREAM_FRAMES_SKIPPED);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_CHUNKS);

    collector.register_counter(&STORE_MUTATIONS);
    collector.register_counter(&SNAPSHOT_SAVES);
    collector.register_counter(&SNAPSHOT_LOAD_FAILURES);
}
