//! HTTP backend implementation.
//!
//! Talks to the REST API that `lume serve` exposes on localhost.
//!
//! | Operation | Route |
//! |-----------|-------|
//! | list      | `GET /lume/vms` |
//! | get       | `GET /lume/vms/{name}` |
//! | create    | `POST /lume/vms` |
//! | run       | `POST /lume/vms/{name}/run` |
//! | stop      | `POST /lume/vms/{name}/stop` |
//! | delete    | `DELETE /lume/vms/{name}` |
//!
//! The API has no way to attach an ISO, so a run that asks for a mount is
//! handed to `lume run --mount` instead.

use std::time::Duration;

use serde::de::DeserializeOwned;
use ureq::Body;
use ureq::http::Response;

use crate::error::{Error, Result};
use crate::types::{CreateRequest, RunRequest, Vm};

use super::Backend;
use super::cli::CliBackend;

/// Timeout for ordinary API calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Create is accepted asynchronously but the server may still take a while
/// to answer.
const CREATE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Backend implementation using the `lume serve` HTTP API.
pub struct HttpBackend {
    agent: ureq::Agent,
    create_agent: ureq::Agent,
    base_url: String,
    lume_bin: String,
}

impl HttpBackend {
    /// Create a backend for the API at `base_url`.
    ///
    /// An empty URL falls back to [`super::DEFAULT_API_URL`].
    pub fn new(base_url: &str) -> Self {
        let base_url = if base_url.trim().is_empty() {
            super::DEFAULT_API_URL
        } else {
            base_url.trim()
        };

        Self {
            agent: build_agent(REQUEST_TIMEOUT),
            create_agent: build_agent(CREATE_TIMEOUT),
            base_url: base_url.trim_end_matches('/').to_string(),
            lume_bin: super::DEFAULT_LUME_BIN.to_string(),
        }
    }

    /// Use `binary` for runs the API cannot express.
    pub fn with_lume_bin(mut self, binary: &str) -> Self {
        self.lume_bin = binary.to_string();
        self
    }

    /// Get the API base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn vms_url(&self) -> String {
        format!("{}/lume/vms", self.base_url)
    }

    fn vm_url(&self, name: &str, action: Option<&str>) -> String {
        let name = urlencoding::encode(name);
        match action {
            Some(action) => format!("{}/lume/vms/{}/{}", self.base_url, name, action),
            None => format!("{}/lume/vms/{}", self.base_url, name),
        }
    }
}

/// Build an agent that hands non-2xx responses back to us so the body can
/// be included in the error.
fn build_agent(timeout: Duration) -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build();
    ureq::Agent::new_with_config(config)
}

/// Fail unless the response status is one of `accepted`.
fn expect_status(response: &mut Response<Body>, operation: &str, accepted: &[u16]) -> Result<()> {
    let status = response.status().as_u16();
    if accepted.contains(&status) {
        return Ok(());
    }

    let body = response
        .body_mut()
        .read_to_string()
        .unwrap_or_default()
        .trim()
        .to_string();

    Err(Error::Status {
        operation: operation.to_string(),
        status,
        body,
    })
}

fn read_json<T: DeserializeOwned>(response: &mut Response<Body>, operation: &str) -> Result<T> {
    response
        .body_mut()
        .read_json::<T>()
        .map_err(|e| Error::Decode {
            context: operation.to_string(),
            message: e.to_string(),
        })
}

impl Backend for HttpBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    fn list_vms(&self) -> Result<Vec<Vm>> {
        let operation = "list VMs";
        log::debug!("GET {}", self.vms_url());

        let mut response = self
            .agent
            .get(&self.vms_url())
            .call()
            .map_err(|e| Error::from(e).during(operation))?;
        expect_status(&mut response, operation, &[200])?;
        read_json(&mut response, operation)
    }

    fn get_vm(&self, name: &str) -> Result<Vm> {
        let operation = format!("get VM {name:?}");
        let url = self.vm_url(name, None);
        log::debug!("GET {url}");

        let mut response = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| Error::from(e).during(&operation))?;
        expect_status(&mut response, &operation, &[200])?;
        read_json(&mut response, &operation)
    }

    fn create_vm(&self, request: &CreateRequest) -> Result<()> {
        let operation = format!("create VM {:?}", request.name);
        log::debug!("POST {} ({})", self.vms_url(), request.name);

        let mut response = self
            .create_agent
            .post(&self.vms_url())
            .send_json(request)
            .map_err(|e| Error::from(e).during(&operation))?;
        expect_status(&mut response, &operation, &[200, 202])
    }

    fn run_vm(&self, name: &str, request: &RunRequest) -> Result<()> {
        if request.mount.is_some() {
            log::debug!("Running {name} via {} to mount its image", self.lume_bin);
            return CliBackend::with_binary(&self.lume_bin).run_vm(name, request);
        }

        let operation = format!("run VM {name:?}");
        let url = self.vm_url(name, Some("run"));
        log::debug!("POST {url}");

        let mut response = self
            .agent
            .post(&url)
            .send_json(request)
            .map_err(|e| Error::from(e).during(&operation))?;
        expect_status(&mut response, &operation, &[200, 202])
    }

    fn stop_vm(&self, name: &str) -> Result<()> {
        let operation = format!("stop VM {name:?}");
        let url = self.vm_url(name, Some("stop"));
        log::debug!("POST {url}");

        let mut response = self
            .agent
            .post(&url)
            .send_empty()
            .map_err(|e| Error::from(e).during(&operation))?;
        expect_status(&mut response, &operation, &[200, 202])
    }

    fn delete_vm(&self, name: &str) -> Result<()> {
        let operation = format!("delete VM {name:?}");
        let url = self.vm_url(name, None);
        log::debug!("DELETE {url}");

        let mut response = self
            .agent
            .delete(&url)
            .call()
            .map_err(|e| Error::from(e).during(&operation))?;
        expect_status(&mut response, &operation, &[200, 202, 204])
    }
}
