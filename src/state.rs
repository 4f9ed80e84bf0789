use std::sync::Arc;
use crate::cache::ReplyCache;
use crate::clock::Clock;
use crate::completion::Completer;
use crate::rate_limit::RateLimiter;
// app's shared state

pub struct AppState {
    pub cache: ReplyCache,
    pub completer: Arc<dyn Completer>,
    pub clock: Arc<dyn Clock>,
    pub epoch: i64,                // unix time where index 1 begins
    pub rate_limiter: RateLimiter, // guards the uncached /generate path
}
