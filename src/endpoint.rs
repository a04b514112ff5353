//! Derivation of the RPC endpoint from a server address.

use url::Url;

use crate::error::TransportError;

/// Path of the RPC endpoint on a node server.
pub const RPC_PATH: &str = "/rpc/";

/// Turn a server address into the WebSocket URL of its RPC endpoint.
///
/// `http` maps to `ws` and `https` to `wss`, mirroring the security of the
/// origin. An origin without a path gets [`RPC_PATH`]. `ws` and `wss` URLs
/// are returned unchanged.
///
/// # Errors
///
/// Returns [`TransportError::Url`] if `server` does not parse and
/// [`TransportError::Endpoint`] for other schemes or a missing host.
///
/// # Examples
///
/// ```
/// use iobus_rpc::endpoint::rpc_url;
///
/// let url = rpc_url("https://node.local:8443").expect("valid origin");
/// assert_eq!(url.as_str(), "wss://node.local:8443/rpc/");
/// ```
pub fn rpc_url(server: &str) -> Result<Url, TransportError> {
    let mut url = Url::parse(server)?;
    let rejected = |reason| TransportError::Endpoint {
        url: server.to_owned(),
        reason,
    };
    if url.host_str().is_none() {
        return Err(rejected("missing host"));
    }
    let scheme = match url.scheme() {
        "ws" | "wss" => return Ok(url),
        "http" => "ws",
        "https" => "wss",
        _ => return Err(rejected("scheme must be http, https, ws or wss")),
    };
    url.set_scheme(scheme)
        .map_err(|()| rejected("scheme cannot be converted"))?;
    if url.path() == "/" {
        url.set_path(RPC_PATH);
    }
    Ok(url)
}
