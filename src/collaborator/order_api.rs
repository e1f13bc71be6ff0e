// The MIT License (MIT)
//
// Copyright (c) 2026 the project contributors
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
// THE SOFTWARE.

use std::thread;
use std::time::Duration;

use log::{debug, error, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::OrderApiError;

const CALL_TIMEOUT: Duration = Duration::from_secs(5);
const UPDATE_STATUS_ATTEMPTS: u32 = 3;
const UPDATE_STATUS_DELAY: Duration = Duration::from_secs(2);
const SET_ERROR_ATTEMPTS: u32 = 10;
const SET_ERROR_DELAY: Duration = Duration::from_secs(60);

/// A unit of processing work returned by the Order API (spec §3).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkUnit {
    pub orderid: String,
    pub scene: String,
}

/// Thin typed client over the Order API (spec §4.1). Carries the
/// configured `task_image`, attached as `processing_loc` on every
/// status-mutating call, the way
/// `original_source/scheduler/espa.py::APIServer` carries `self.image`.
pub struct OrderApiClient {
    base_url: String,
    task_image: String,
    http: reqwest::blocking::Client,
}

impl OrderApiClient {
    pub fn new(base_url: String, task_image: String) -> OrderApiClient {
        let http = reqwest::blocking::Client::builder()
            .timeout(CALL_TIMEOUT)
            .build()
            .expect("failed to build Order API http client");

        OrderApiClient { base_url, task_image, http }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET the base URL; must return 200. Called once at startup —
    /// a failure here is fatal to the process (spec §4.1, §6).
    pub fn test_connection(&self) -> Result<(), OrderApiError> {
        let url = self.base_url.clone();
        let resp = self
            .http
            .get(&url)
            .send()
            .map_err(|source| OrderApiError::Transport { url: url.clone(), source })?;

        if resp.status().as_u16() != 200 {
            return Err(OrderApiError::UnexpectedStatus { url, status: resp.status().as_u16() });
        }
        Ok(())
    }

    /// GET `/configuration/{key}`. Absent keys in the response object
    /// come back as `Ok(None)`; transport/decode errors propagate.
    pub fn get_configuration(&self, key: &str) -> Result<Option<String>, OrderApiError> {
        let url = self.url(&format!("/configuration/{}", key));
        let resp = self
            .http
            .get(&url)
            .send()
            .map_err(|source| OrderApiError::Transport { url: url.clone(), source })?;

        if resp.status().as_u16() != 200 {
            return Err(OrderApiError::UnexpectedStatus { url, status: resp.status().as_u16() });
        }

        let body: Value = resp
            .json()
            .map_err(|source| OrderApiError::Decode { url: url.clone(), source })?;

        Ok(body.get(key).and_then(|v| v.as_str()).map(|s| s.to_string()))
    }

    /// Fail-safe derivation of the admin switch: any error, or any
    /// value other than the literal string `"True"`, disables tasking
    /// (spec §4.1).
    pub fn mesos_tasks_disabled(&self) -> bool {
        match self.get_configuration("run_mesos_tasks") {
            Ok(Some(ref v)) if v == "True" => false,
            Ok(_) => true,
            Err(e) => {
                warn!("failed to read run_mesos_tasks, disabling tasks: {}", e);
                true
            }
        }
    }

    /// GET `/products`. Empty list on any transport/decode/status
    /// error (logged), never propagated — callers treat an empty
    /// refill batch and a failed refill call identically (spec §4.1).
    pub fn get_products_to_process(
        &self,
        product_type: Option<&str>,
        limit: u32,
        user: Option<&str>,
        priority: Option<&str>,
    ) -> Vec<WorkUnit> {
        let mut query = vec![format!("record_limit={}", limit)];
        if let Some(pt) = product_type {
            query.push(format!("product_types={}", pt));
        }
        if let Some(u) = user {
            query.push(format!("for_user={}", u));
        }
        if let Some(p) = priority {
            query.push(format!("priority={}", p));
        }
        let url = self.url(&format!("/products?{}", query.join("&")));

        let result = self
            .http
            .get(&url)
            .send()
            .map_err(|source| OrderApiError::Transport { url: url.clone(), source })
            .and_then(|resp| {
                if resp.status().as_u16() != 200 {
                    return Err(OrderApiError::UnexpectedStatus {
                        url: url.clone(),
                        status: resp.status().as_u16(),
                    });
                }
                resp.json::<Vec<WorkUnit>>()
                    .map_err(|source| OrderApiError::Decode { url: url.clone(), source })
            });

        match result {
            Ok(units) => units,
            Err(e) => {
                error!("get_products_to_process failed: {}", e);
                Vec::new()
            }
        }
    }

    /// POST `/update_status`, retried with a fixed 2s backoff for up
    /// to 3 attempts (spec §4.1, §7).
    pub fn update_status(&self, prod: &str, order: &str, status_value: &str) -> Result<(), OrderApiError> {
        let body = serde_json::json!({
            "name": prod,
            "orderid": order,
            "processing_loc": self.task_image,
            "status": status_value,
        });
        self.post_with_retry("/update_status", &body, UPDATE_STATUS_ATTEMPTS, UPDATE_STATUS_DELAY)
    }

    pub fn set_to_scheduled(&self, unit: &WorkUnit) -> Result<(), OrderApiError> {
        self.update_status(&unit.scene, &unit.orderid, "scheduled")
    }

    /// POST `/set_product_error`, retried with a fixed 60s backoff for
    /// up to 10 attempts (spec §4.1, §7). `error_blob` is JSON-encoded
    /// into the `error` field, matching
    /// `original_source/scheduler/espa.py::set_scene_error`.
    pub fn set_scene_error(&self, prod: &str, order: &str, error_blob: &Value) -> Result<(), OrderApiError> {
        let body = serde_json::json!({
            "name": prod,
            "orderid": order,
            "processing_loc": self.task_image,
            "error": error_blob.to_string(),
        });
        self.post_with_retry("/set_product_error", &body, SET_ERROR_ATTEMPTS, SET_ERROR_DELAY)
    }

    /// GET `/handle-orders`. Fire-and-log, never fatal (spec §4.1).
    pub fn handle_orders(&self) {
        let url = self.url("/handle-orders");
        match self.http.get(&url).send() {
            Ok(resp) if resp.status().as_u16() == 200 => debug!("handle_orders ok"),
            Ok(resp) => warn!("handle_orders unexpected status {}", resp.status()),
            Err(e) => warn!("handle_orders transport error: {}", e),
        }
    }

    fn post_with_retry(
        &self,
        path: &str,
        body: &Value,
        attempts: u32,
        delay: Duration,
    ) -> Result<(), OrderApiError> {
        let url = self.url(path);
        let mut last_err = None;

        for attempt in 1..=attempts {
            let result = self
                .http
                .post(&url)
                .json(body)
                .send()
                .map_err(|source| OrderApiError::Transport { url: url.clone(), source })
                .and_then(|resp| {
                    if resp.status().as_u16() != 200 {
                        return Err(OrderApiError::UnexpectedStatus {
                            url: url.clone(),
                            status: resp.status().as_u16(),
                        });
                    }
                    Ok(())
                });

            match result {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!("{} attempt {}/{} failed: {}", path, attempt, attempts, e);
                    last_err = Some(e);
                    if attempt < attempts {
                        thread::sleep(delay);
                    }
                }
            }
        }

        let err = last_err.expect("retry loop always records an error before exhausting attempts");
        error!("{} exhausted {} attempts: {}", path, attempts, err);
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Minimal HTTP/1.1 stub server: replies with a fixed status and
    /// body to every request, counting how many it received. Keeps
    /// the dependency list aligned with the teacher crate instead of
    /// pulling in a mock-HTTP crate for five fixed endpoints.
    fn spawn_stub(status_line: &'static str, body: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();

        thread::spawn(move || {
            for stream in listener.incoming() {
                let mut stream = match stream {
                    Ok(s) => s,
                    Err(_) => continue,
                };
                hits_clone.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf);
                let response = format!(
                    "{}\r\nContent-Length: {}\r\nContent-Type: application/json\r\n\r\n{}",
                    status_line,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });

        (format!("http://{}", addr), hits)
    }

    #[test]
    fn get_configuration_returns_value_when_present() {
        let (base, _hits) = spawn_stub("HTTP/1.1 200 OK", r#"{"run_mesos_tasks": "True"}"#);
        let client = OrderApiClient::new(base, "image".to_string());
        let value = client.get_configuration("run_mesos_tasks").unwrap();
        assert_eq!(value, Some("True".to_string()));
    }

    #[test]
    fn mesos_tasks_disabled_is_fail_safe_on_transport_error() {
        let client = OrderApiClient::new("http://127.0.0.1:1".to_string(), "image".to_string());
        assert!(client.mesos_tasks_disabled());
    }

    #[test]
    fn mesos_tasks_disabled_false_only_for_literal_true() {
        let (base, _hits) = spawn_stub("HTTP/1.1 200 OK", r#"{"run_mesos_tasks": "True"}"#);
        let client = OrderApiClient::new(base, "image".to_string());
        assert!(!client.mesos_tasks_disabled());

        let (base, _hits) = spawn_stub("HTTP/1.1 200 OK", r#"{"run_mesos_tasks": "false"}"#);
        let client = OrderApiClient::new(base, "image".to_string());
        assert!(client.mesos_tasks_disabled());
    }

    #[test]
    fn get_products_to_process_returns_empty_on_error() {
        let client = OrderApiClient::new("http://127.0.0.1:1".to_string(), "image".to_string());
        let units = client.get_products_to_process(Some("landsat"), 50, None, None);
        assert!(units.is_empty());
    }

    #[test]
    fn update_status_retries_until_success() {
        let (base, hits) = spawn_stub("HTTP/1.1 200 OK", "{}");
        let client = OrderApiClient::new(base, "image".to_string());
        client.update_status("L8A", "o1", "tasked").unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
