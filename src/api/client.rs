use crate::config::Config;
use crate::types::{
    FoundryFileReply, FoundryListing, GenerateReply, GenerateResponse, ModelInfo, PollSnapshot,
    UploadReply,
};
use anyhow::{anyhow, Result};
use serde_json::json;
use std::path::Path;
#[cfg(test)]
use std::sync::Arc;

/// Control commands map onto bare POST endpoints with an empty body; nothing
/// beyond success/failure is consumed from the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEndpoint {
    Restart,
    Interrupt,
    ClearHistory,
}

impl ControlEndpoint {
    fn path(self) -> &'static str {
        match self {
            ControlEndpoint::Restart => "/restart",
            ControlEndpoint::Interrupt => "/interrupt",
            ControlEndpoint::ClearHistory => "/clear_history",
        }
    }
}

/// Outcome of one status poll. Transport-level failures are data here, not
/// errors: an unreachable backend is the expected state while the kernel is
/// still starting up.
#[derive(Debug, Clone)]
pub enum PollOutcome {
    Snapshot(PollSnapshot),
    /// The poll was answered with a redirect, which only happens when the
    /// hosting layer demands a fresh login.
    AuthRedirect,
    Unreachable,
}

#[derive(Debug, Clone)]
pub enum FoundryDownload {
    Files(Vec<FoundryFileReply>),
    Failed { status: u16, message: String },
}

#[cfg(test)]
pub trait MockBackend: Send + Sync {
    fn generate(&self, prompt: &str, model: &str) -> Result<GenerateReply>;
    fn poll(&self) -> Result<PollOutcome>;
    fn submit_code(&self, code: &str, options: &[String]) -> Result<()>;
    fn control(&self, endpoint: ControlEndpoint) -> Result<()>;
    fn models(&self) -> Result<Vec<ModelInfo>> {
        Ok(Vec::new())
    }
    fn upload(&self, _filename: &str) -> Result<UploadReply> {
        Err(anyhow!("mock upload not configured"))
    }
    fn foundry_listing(&self, _folder: Option<&str>) -> Result<FoundryListing> {
        Ok(FoundryListing::default())
    }
    fn foundry_download(&self, _dataset_rid: &str) -> Result<FoundryDownload> {
        Err(anyhow!("mock foundry download not configured"))
    }
}

#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    /// Separate client with redirects disabled, so an auth-expiry redirect on
    /// the status poll is observable instead of silently followed.
    poll_http: reqwest::Client,
    web_url: String,
    api_url: String,
    #[cfg(test)]
    mock: Option<Arc<dyn MockBackend>>,
}

impl BackendClient {
    pub fn new(config: &Config) -> Result<Self> {
        let poll_http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            http: reqwest::Client::new(),
            poll_http,
            web_url: config.web_url.clone(),
            api_url: config.api_url.clone(),
            #[cfg(test)]
            mock: None,
        })
    }

    #[cfg(test)]
    pub fn new_mock(mock: Arc<dyn MockBackend>) -> Self {
        Self {
            http: reqwest::Client::new(),
            poll_http: reqwest::Client::new(),
            web_url: "http://localhost:8080".to_string(),
            api_url: "http://localhost:8080".to_string(),
            mock: Some(mock),
        }
    }

    /// POST `/generate {prompt, model}`. A non-success HTTP status is not an
    /// error: the reply body still carries explanation text, and the caller
    /// decides what a soft failure means for session state.
    pub async fn generate(&self, prompt: &str, model: &str) -> Result<GenerateReply> {
        #[cfg(test)]
        if let Some(mock) = &self.mock {
            return mock.generate(prompt, model);
        }

        let url = format!("{}/generate", self.web_url);
        let response = self
            .http
            .post(&url)
            .json(&json!({ "prompt": prompt, "model": model }))
            .send()
            .await
            .map_err(|error| map_request_error(error, &url))?;

        let ok = response.status().is_success();
        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|error| map_request_error(error, &url))?;

        Ok(GenerateReply {
            ok,
            text: body.text,
            code: body.code,
        })
    }

    /// GET the kernel status endpoint without following redirects.
    pub async fn poll(&self) -> Result<PollOutcome> {
        #[cfg(test)]
        if let Some(mock) = &self.mock {
            return mock.poll();
        }

        let url = format!("{}/api", self.api_url);
        let response = match self.poll_http.get(&url).send().await {
            Ok(response) => response,
            Err(error) if is_unreachable(&error) => return Ok(PollOutcome::Unreachable),
            Err(error) => return Err(map_request_error(error, &url)),
        };

        if response.status().is_redirection() {
            return Ok(PollOutcome::AuthRedirect);
        }

        let snapshot = response
            .json()
            .await
            .map_err(|error| map_request_error(error, &url))?;
        Ok(PollOutcome::Snapshot(snapshot))
    }

    /// Submit generated code for execution. The response body is never
    /// consumed; callers treat this as fire-and-forget.
    pub async fn submit_code(&self, code: &str, options: &[String]) -> Result<()> {
        #[cfg(test)]
        if let Some(mock) = &self.mock {
            return mock.submit_code(code, options);
        }

        let url = format!("{}/api", self.api_url);
        self.http
            .post(&url)
            .json(&json!({ "command": code, "options": options }))
            .send()
            .await
            .map_err(|error| map_request_error(error, &url))?
            .error_for_status()
            .map_err(|error| map_request_error(error, &url))?;
        Ok(())
    }

    pub async fn control(&self, endpoint: ControlEndpoint) -> Result<()> {
        #[cfg(test)]
        if let Some(mock) = &self.mock {
            return mock.control(endpoint);
        }

        let base = match endpoint {
            ControlEndpoint::Restart | ControlEndpoint::Interrupt => &self.api_url,
            ControlEndpoint::ClearHistory => &self.web_url,
        };
        let url = format!("{base}{}", endpoint.path());
        self.http
            .post(&url)
            .json(&json!({}))
            .send()
            .await
            .map_err(|error| map_request_error(error, &url))?
            .error_for_status()
            .map_err(|error| map_request_error(error, &url))?;
        Ok(())
    }

    pub async fn models(&self) -> Result<Vec<ModelInfo>> {
        #[cfg(test)]
        if let Some(mock) = &self.mock {
            return mock.models();
        }

        let url = format!("{}/models", self.web_url);
        let models = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|error| map_request_error(error, &url))?
            .error_for_status()
            .map_err(|error| map_request_error(error, &url))?
            .json()
            .await
            .map_err(|error| map_request_error(error, &url))?;
        Ok(models)
    }

    pub async fn upload(&self, path: &Path) -> Result<UploadReply> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| anyhow!("upload path '{}' has no usable file name", path.display()))?
            .to_string();

        #[cfg(test)]
        if let Some(mock) = &self.mock {
            return mock.upload(&file_name);
        }

        let contents = tokio::fs::read(path).await?;
        let form = reqwest::multipart::Form::new()
            .part("file", reqwest::multipart::Part::bytes(contents).file_name(file_name));

        let url = format!("{}/upload", self.web_url);
        let reply = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|error| map_request_error(error, &url))?
            .error_for_status()
            .map_err(|error| map_request_error(error, &url))?
            .json()
            .await
            .map_err(|error| map_request_error(error, &url))?;
        Ok(reply)
    }

    /// List datasets available in a folder; without a folder the backend
    /// answers with its configured default folder plus its datasets.
    pub async fn foundry_listing(&self, folder: Option<&str>) -> Result<FoundryListing> {
        #[cfg(test)]
        if let Some(mock) = &self.mock {
            return mock.foundry_listing(folder);
        }

        let url = format!("{}/foundry_files", self.web_url);
        let mut request = self.http.get(&url);
        if let Some(folder) = folder {
            request = request.query(&[("folder", folder)]);
        }

        let listing = request
            .send()
            .await
            .map_err(|error| map_request_error(error, &url))?
            .error_for_status()
            .map_err(|error| map_request_error(error, &url))?
            .json()
            .await
            .map_err(|error| map_request_error(error, &url))?;
        Ok(listing)
    }

    /// Ask the backend to pull a dataset into the kernel workspace. An HTTP
    /// failure carries a human-readable body worth showing to the user, so it
    /// is returned as data rather than an error.
    pub async fn foundry_download(&self, dataset_rid: &str) -> Result<FoundryDownload> {
        #[cfg(test)]
        if let Some(mock) = &self.mock {
            return mock.foundry_download(dataset_rid);
        }

        let url = format!("{}/foundry_files", self.web_url);
        let response = self
            .http
            .post(&url)
            .json(&json!({ "dataset_rid": dataset_rid }))
            .send()
            .await
            .map_err(|error| map_request_error(error, &url))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Ok(FoundryDownload::Failed { status, message });
        }

        let files = response
            .json()
            .await
            .map_err(|error| map_request_error(error, &url))?;
        Ok(FoundryDownload::Files(files))
    }
}

fn is_unreachable(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout() || error.is_request()
}

fn map_request_error(error: reqwest::Error, request_url: &str) -> anyhow::Error {
    if error.is_connect() {
        return anyhow!("cannot reach backend at '{}': {}", request_url, error);
    }
    if error.is_timeout() {
        return anyhow!("request to '{}' timed out: {}", request_url, error);
    }
    if let Some(status) = error.status() {
        return anyhow!("'{}' returned HTTP {}: {}", request_url, status, error);
    }
    anyhow!("request to '{}' failed: {}", request_url, error)
}
