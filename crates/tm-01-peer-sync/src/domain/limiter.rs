//! # Request Limiters
//!
//! Admission control for the sync read endpoints.
//!
//! - [`NoLimit`]: always answers (used by local tooling and tests).
//! - [`TokenBucketLimiter`]: tokens are added at a fixed rate, each answered
//!   request consumes one, and requests are declined when the bucket is empty.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::ports::RequestLimiter;

/// Limiter that admits every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLimit;

impl RequestLimiter for NoLimit {
    fn can_answer_now(&self) -> bool {
        true
    }

    fn process_request(&self) {}
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket limiter.
#[derive(Debug)]
pub struct TokenBucketLimiter {
    /// Maximum burst size.
    capacity: f64,
    /// Tokens added per second.
    refill_rate: f64,
    bucket: Mutex<Bucket>,
}

impl TokenBucketLimiter {
    /// Bucket holding at most `capacity` tokens, refilled at `refill_rate`
    /// tokens per second. Starts full.
    #[must_use]
    pub fn new(capacity: u32, refill_rate: u32) -> Self {
        Self {
            capacity: f64::from(capacity),
            refill_rate: f64::from(refill_rate),
            bucket: Mutex::new(Bucket {
                tokens: f64::from(capacity),
                last_refill: Instant::now(),
            }),
        }
    }

    /// Requests per minute, with a burst of one minute's worth.
    #[must_use]
    pub fn per_minute(requests: u32) -> Self {
        let mut limiter = Self::new(requests, 0);
        limiter.refill_rate = f64::from(requests) / 60.0;
        limiter
    }

    fn refill(&self, bucket: &mut Bucket) {
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_rate).min(self.capacity);
        bucket.last_refill = now;
    }

    /// Whole tokens currently available.
    #[must_use]
    pub fn available(&self) -> u32 {
        let mut bucket = self.bucket.lock();
        self.refill(&mut bucket);
        bucket.tokens.floor() as u32
    }
}

impl RequestLimiter for TokenBucketLimiter {
    fn can_answer_now(&self) -> bool {
        let mut bucket = self.bucket.lock();
        self.refill(&mut bucket);
        bucket.tokens >= 1.0
    }

    fn process_request(&self) {
        let mut bucket = self.bucket.lock();
        self.refill(&mut bucket);
        bucket.tokens = (bucket.tokens - 1.0).max(0.0);
    }

    fn retry_after(&self) -> Option<Duration> {
        if self.refill_rate <= 0.0 {
            return None;
        }
        let mut bucket = self.bucket.lock();
        self.refill(&mut bucket);
        let missing = (1.0 - bucket.tokens).max(0.0);
        Some(Duration::from_secs_f64(missing / self.refill_rate))
    }
}
