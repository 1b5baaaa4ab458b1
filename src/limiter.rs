use std::sync::Mutex;
use std::time::Instant;

/// Token-bucket request limiter for the HTTP layer.
///
/// The bucket holds `capacity` tokens and refills continuously over the
/// configured window. A request either takes a token or is rejected; it
/// never waits.
#[derive(Debug)]
pub struct RequestLimiter {
    capacity: f64,
    window_seconds: f64,
    // current tokens and the time of last refill
    bucket: Mutex<(f64, Instant)>,
}

impl RequestLimiter {
    pub fn new(max_requests: u64, window_seconds: u64) -> Self {
        Self {
            capacity: max_requests as f64,
            window_seconds: (window_seconds.max(1)) as f64,
            bucket: Mutex::new((max_requests as f64, Instant::now())),
        }
    }

    /// Take one token if available. Refill happens lazily on each call.
    pub fn try_acquire(&self) -> bool {
        let mut guard = self.bucket.lock().unwrap();
        let (ref mut tokens, ref mut last) = *guard;

        let now = Instant::now();
        let elapsed = now.duration_since(*last).as_secs_f64();
        let refill_rate = self.capacity / self.window_seconds; // tokens per second
        *tokens = (*tokens + elapsed * refill_rate).min(self.capacity);
        *last = now;

        if *tokens >= 1.0 {
            *tokens -= 1.0;
            true
        } else {
            false
        }
    }
}
