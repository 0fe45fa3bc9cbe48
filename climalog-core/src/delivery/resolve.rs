//! Failure classification for unreachable endpoints.

use crate::error::Error;

/// Decide whether a failed connection to `host:port` was a name-resolution
/// problem or a plain connection failure by resolving the host again.
pub(crate) async fn classify_unreachable(host: &str, port: u16, message: String) -> Error {
    match tokio::net::lookup_host((host, port)).await {
        Ok(mut addrs) => {
            if addrs.next().is_some() {
                Error::Connection(message)
            } else {
                Error::Dns {
                    host: host.to_string(),
                    message: "no addresses returned".to_string(),
                }
            }
        }
        Err(e) => Error::Dns {
            host: host.to_string(),
            message: e.to_string(),
        },
    }
}
