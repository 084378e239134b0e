//! HTTP transport on `reqwest`'s blocking client.
//!
//! The request runs on a worker thread so the caller can keep reporting
//! progress and honour cancellation while it waits.

use std::{
    net::{TcpStream, ToSocketAddrs},
    sync::mpsc,
    thread,
    time::Duration,
};

use reqwest::{blocking::Client, header::CONTENT_TYPE};

use crate::model::ParsedUrl;

use super::{Exchange, Request, Transport};

/// How often the waiting caller is given a chance to cancel.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Default)]
pub struct HttpTransport;

impl HttpTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for HttpTransport {
    fn exchange(&self, request: &Request, progress: &mut dyn FnMut(&str) -> bool) -> Exchange {
        let client = match Client::builder().timeout(request.timeout).build() {
            Ok(client) => client,
            Err(e) => {
                log::error!("failed to build HTTP client: {e}");
                return Exchange::unreachable();
            }
        };

        let url = request.url.to_string();
        let content_type = request.content_type.clone();
        let body = request.body.clone();
        log::info!("POST {url} ({} bytes)", body.len());

        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            let result = client
                .post(&url)
                .header(CONTENT_TYPE, content_type)
                .body(body)
                .send()
                .and_then(|response| {
                    let status = response.status().as_u16();
                    response.text().map(|text| (status, text))
                });
            // The receiver is gone if the user cancelled.
            let _ = sender.send(result);
        });

        loop {
            if !progress(&request.activity) {
                log::info!("request to {} cancelled", request.url);
                return Exchange::cancelled();
            }
            match receiver.recv_timeout(POLL_INTERVAL) {
                Ok(Ok((status, text))) => {
                    log::info!("{} replied with status {status}", request.url);
                    log::debug!("reply body:\n{text}");
                    return Exchange::response(status, text);
                }
                Ok(Err(e)) => return failed(&request.url, &e),
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    log::error!("HTTP worker for {} exited without a result", request.url);
                    return Exchange::unreachable();
                }
            }
        }
    }

    fn probe(&self, url: &ParsedUrl, timeout: Duration) -> bool {
        let addrs = match (url.host.as_str(), url.port).to_socket_addrs() {
            Ok(addrs) => addrs,
            Err(e) => {
                log::info!("probe of {} failed to resolve: {e}", url.host);
                return false;
            }
        };
        for addr in addrs {
            if TcpStream::connect_timeout(&addr, timeout).is_ok() {
                log::debug!("probe of {} reached {addr}", url.host);
                return true;
            }
        }
        log::info!("probe of {}:{} failed", url.host, url.port);
        false
    }
}

fn failed(url: &ParsedUrl, e: &reqwest::Error) -> Exchange {
    if e.is_timeout() {
        log::warn!("request to {url} timed out");
    } else {
        log::warn!("request to {url} failed: {e}");
    }
    let mut exchange = Exchange::unreachable();
    exchange.connected = !e.is_connect();
    exchange.status_code = e.status().map_or(0, |s| s.as_u16());
    exchange
}
