//! Constants shared by the HTTP clients (timeouts, pacing, browser headers).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default page-render timeout (60 seconds).
pub const RENDER_TIMEOUT_SECS: u64 = 60;

/// Default media read timeout (5 minutes for large files).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Default throughput ceiling for media transfers, in KiB/s.
pub const DEFAULT_RATE_LIMIT_KIB: u64 = 400;

/// Size of each throttled write.
pub const CHUNK_SIZE: usize = 1024;

/// Default capacity of the download queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Default lower bound of the pause between page fetches, in seconds.
pub const DEFAULT_PAGE_DELAY_MIN_SECS: f64 = 1.0;

/// Default upper bound of the pause between page fetches, in seconds.
pub const DEFAULT_PAGE_DELAY_MAX_SECS: f64 = 5.0;

/// Accept header sent with page requests.
pub const PAGE_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

/// Accept header sent with media requests.
pub const MEDIA_ACCEPT: &str = "image/avif,image/webp,image/apng,image/*,*/*;q=0.8";

/// Accept-Language header sent with every request.
pub const ACCEPT_LANGUAGE: &str = "zh-TW,zh;q=0.9,en-US;q=0.8,en;q=0.7";
