use actionpin_domain::RemoteError;
use reqwest::header::HeaderMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Rate-limit headers GitHub sends with every response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RateHeaders {
    pub remaining: Option<u64>,
    /// Epoch seconds at which the window resets.
    pub reset: Option<u64>,
    pub retry_after: Option<u64>,
}

impl RateHeaders {
    pub(crate) fn from_headers(headers: &HeaderMap) -> Self {
        let num = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
        };
        Self {
            remaining: num("x-ratelimit-remaining"),
            reset: num("x-ratelimit-reset"),
            retry_after: num("retry-after"),
        }
    }

    fn wait_hint(&self, now_epoch: u64) -> Option<Duration> {
        if let Some(secs) = self.retry_after {
            return Some(Duration::from_secs(secs));
        }
        self.reset
            .map(|reset| Duration::from_secs(reset.saturating_sub(now_epoch)))
    }
}

pub(crate) fn now_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Map a non-success HTTP status onto the error taxonomy.
///
/// 403 is ambiguous on GitHub: it means "rate limited" when the quota is
/// exhausted and "forbidden" otherwise.
pub(crate) fn classify_failure(
    status: u16,
    rate: &RateHeaders,
    body: &str,
    what: &str,
    now_epoch: u64,
) -> RemoteError {
    let rate_limited = |detail: &str| RemoteError::RateLimited {
        message: format!("{what}: {detail}"),
        retry_after: rate.wait_hint(now_epoch),
    };

    match status {
        401 => RemoteError::Authentication(format!("{what}: HTTP 401 (bad or expired token)")),
        403 if rate.remaining == Some(0)
            || rate.retry_after.is_some()
            || body.to_ascii_lowercase().contains("rate limit") =>
        {
            rate_limited("HTTP 403 (API rate limit exceeded)")
        }
        403 => RemoteError::Authentication(format!("{what}: HTTP 403 (access forbidden)")),
        429 => rate_limited("HTTP 429 (too many requests)"),
        404 | 410 | 422 => RemoteError::NotFound(format!("{what}: HTTP {status}")),
        500..=599 => RemoteError::Transport(format!("{what}: HTTP {status} from server")),
        400..=499 => RemoteError::NotFound(format!("{what}: HTTP {status}")),
        _ => RemoteError::Transport(format!("{what}: unexpected HTTP {status}")),
    }
}

pub(crate) fn transport_error(err: &reqwest::Error, what: &str) -> RemoteError {
    if err.is_timeout() {
        RemoteError::Timeout(format!("{what}: {err}"))
    } else {
        RemoteError::Transport(format!("{what}: {err}"))
    }
}
