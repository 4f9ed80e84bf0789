mod current;
mod generate;
mod health;
mod metrics;

pub use current::current_handler;
pub use generate::generate_handler;
pub use health::health_handler;
pub use metrics::metrics_handler;
