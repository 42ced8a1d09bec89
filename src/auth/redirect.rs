use anyhow::{Result, anyhow};
use log::{debug, warn};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};
use tiny_http::{Header, Response, Server};
use url::{Url, form_urlencoded};

pub const CALLBACK_TIMEOUT: Duration = Duration::from_secs(120);

/// Page served on the callback path. The identity provider puts the exchange
/// identifier in the fragment, which browsers never send to a server, so the
/// page hands it back to us as a query string.
const FORWARD_FRAGMENT_PAGE: &str = r#"<!doctype html>
<html><body><p>Completing sign-in…</p>
<script>
var h = window.location.hash.substring(1);
if (h) { window.location.replace(window.location.pathname + '?' + h); }
else { document.body.innerText = 'No session found in redirect. You can close this tab.'; }
</script></body></html>"#;

/// External identity URL carrying our callback as the `redirect` parameter.
pub fn authorize_url(identity_url: &Url, callback_url: &Url) -> Url {
    let mut u = identity_url.clone();
    u.query_pairs_mut()
        .append_pair("redirect", callback_url.as_str());
    u
}

/// Pulls `session_id=<value>` out of a URL fragment, percent-decoded the same
/// way the loopback callback decodes its query.
pub fn session_id_from_fragment(url: &str) -> Option<String> {
    let (_, fragment) = url.split_once('#')?;
    session_id_from_pairs(fragment)
}

/// Accepts what a user pastes for `login --session-id`: either the bare
/// identifier or the whole redirect URL it arrived on.
pub fn exchange_id_from_input(input: &str) -> Option<String> {
    let input = input.trim();
    if input.contains('#') {
        return session_id_from_fragment(input);
    }
    if let Some((_, query)) = input.split_once('?') {
        return session_id_from_pairs(query);
    }
    Some(input.to_string()).filter(|s| !s.is_empty())
}

fn session_id_from_pairs(encoded: &str) -> Option<String> {
    form_urlencoded::parse(encoded.as_bytes())
        .find(|(k, _)| k == "session_id")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

/// Opens the identity page in the browser and waits for the callback.
pub fn browser_sign_in(identity_url: &Url, callback_url: &Url) -> Result<String> {
    let auth_url = authorize_url(identity_url, callback_url);

    // listen before the browser can possibly come back
    let server = bind(callback_url)?;

    println!("Open this URL in your browser:\n{auth_url}");
    if let Err(e) = open::that(auth_url.as_str()) {
        eprintln!("Warning: could not open browser automatically: {e}");
    }

    wait_on(&server, callback_url, CALLBACK_TIMEOUT)
}

/// Waits for the browser to reach `callback_url` and returns the exchange id.
pub fn wait_for_callback(callback_url: &Url, timeout: Duration) -> Result<String> {
    let server = bind(callback_url)?;
    wait_on(&server, callback_url, timeout)
}

fn bind(callback_url: &Url) -> Result<Server> {
    let host = callback_url
        .host_str()
        .ok_or_else(|| anyhow!("callback_url missing host: {callback_url}"))?;
    let port = callback_url
        .port_or_known_default()
        .ok_or_else(|| anyhow!("callback_url missing/unknown port: {callback_url}"))?;

    let bind_ip: IpAddr = match host {
        "localhost" | "127.0.0.1" => IpAddr::V4(Ipv4Addr::LOCALHOST),
        other => other.parse::<IpAddr>().map_err(|_| {
            anyhow!("callback_url host must be localhost/127.0.0.1 or an IP: {other}")
        })?,
    };

    let bind_addr = SocketAddr::new(bind_ip, port);
    Server::http(bind_addr)
        .map_err(|e| anyhow!("Failed to bind sign-in callback server on {bind_addr}: {e:?}"))
}

fn wait_on(server: &Server, callback_url: &Url, timeout: Duration) -> Result<String> {
    let wait_until = Instant::now() + timeout;
    let html = Header::from_bytes(&b"Content-Type"[..], &b"text/html; charset=utf-8"[..])
        .map_err(|_| anyhow!("invalid content-type header"))?;

    while Instant::now() < wait_until {
        let Ok(maybe_request) = server.recv_timeout(Duration::from_millis(500)) else {
            continue;
        };
        let Some(request) = maybe_request else {
            continue;
        };

        // request.url() is a path+query like "/auth?session_id=..."
        let Ok(full) = callback_url.join(request.url()) else {
            let _ = request.respond(Response::from_string("Bad redirect").with_status_code(400));
            continue;
        };
        debug!("sign-in callback hit: {}", full.path());

        if full.path() != callback_url.path() {
            let _ = request.respond(Response::from_string("Not found").with_status_code(404));
            continue;
        }

        let session_id = full
            .query_pairs()
            .find(|(k, _)| k == "session_id")
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.is_empty());

        match session_id {
            Some(id) => {
                let _ = request.respond(Response::from_string(
                    "Signed in. You can close this tab.",
                ));
                return Ok(id);
            }
            None => {
                if let Err(e) =
                    request.respond(Response::from_string(FORWARD_FRAGMENT_PAGE).with_header(html.clone()))
                {
                    warn!("could not answer sign-in callback: {e}");
                }
            }
        }
    }

    Err(anyhow!("No session received within timeout"))
}
