use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};


lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("hourglyph_requests_total", "Total number of API requests").unwrap();
    pub static ref CACHE_HITS: Counter =
        register_counter!("hourglyph_cache_hits_total", "Total cache hits").unwrap();
    pub static ref CACHE_MISSES: Counter =
        register_counter!("hourglyph_cache_misses_total", "Total cache misses").unwrap();
    pub static ref COMPLETION_FAILURES: Counter = register_counter!(
        "hourglyph_completion_failures_total",
        "Completion calls that ended in an error"
    )
    .unwrap();
    pub static ref COMPLETION_LATENCY: Histogram = register_histogram!(
        "hourglyph_completion_latency_seconds",
        "Upstream completion latency in seconds"
    )
    .unwrap();
    pub static ref CACHE_SIZE: Gauge =
        register_gauge!("hourglyph_cache_size", "Current number of records in cache").unwrap();
}
