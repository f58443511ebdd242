use crate::api::client::{ControlEndpoint, FoundryDownload, MockBackend, PollOutcome};
use crate::types::{FoundryListing, GenerateReply, ModelInfo, UploadReply};
use anyhow::{anyhow, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One scripted answer for a generation request.
#[derive(Debug, Clone)]
pub enum GenerateScript {
    Reply(GenerateReply),
    TransportError,
}

/// Scripted backend for unit tests: generation replies are consumed in
/// order, and every call is recorded for later assertions.
#[derive(Default)]
pub struct ScriptedBackend {
    generate_scripts: Mutex<VecDeque<GenerateScript>>,
    generate_calls: Mutex<Vec<(String, String)>>,
    submissions: Mutex<Vec<(String, Vec<String>)>>,
    controls: Mutex<Vec<ControlEndpoint>>,
    models: Mutex<Vec<ModelInfo>>,
    upload_reply: Mutex<Option<UploadReply>>,
    foundry_listing: Mutex<Option<FoundryListing>>,
    foundry_download: Mutex<Option<FoundryDownload>>,
    fail_controls: std::sync::atomic::AtomicBool,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script_generate(&self, script: GenerateScript) {
        self.generate_scripts.lock().unwrap().push_back(script);
    }

    pub fn script_reply(&self, ok: bool, text: &str, code: Option<&str>) {
        self.script_generate(GenerateScript::Reply(GenerateReply {
            ok,
            text: text.to_string(),
            code: code.map(ToOwned::to_owned),
        }));
    }

    pub fn set_models(&self, models: Vec<ModelInfo>) {
        *self.models.lock().unwrap() = models;
    }

    pub fn set_upload_reply(&self, message: &str) {
        *self.upload_reply.lock().unwrap() = Some(UploadReply {
            message: message.to_string(),
        });
    }

    pub fn set_foundry_listing(&self, listing: FoundryListing) {
        *self.foundry_listing.lock().unwrap() = Some(listing);
    }

    pub fn set_foundry_download(&self, download: FoundryDownload) {
        *self.foundry_download.lock().unwrap() = Some(download);
    }

    pub fn generate_calls(&self) -> Vec<(String, String)> {
        self.generate_calls.lock().unwrap().clone()
    }

    pub fn submissions(&self) -> Vec<(String, Vec<String>)> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn controls(&self) -> Vec<ControlEndpoint> {
        self.controls.lock().unwrap().clone()
    }

    pub fn fail_controls(&self) {
        self.fail_controls
            .store(true, std::sync::atomic::Ordering::Relaxed);
    }
}

impl MockBackend for ScriptedBackend {
    fn generate(&self, prompt: &str, model: &str) -> Result<GenerateReply> {
        self.generate_calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), model.to_string()));

        match self.generate_scripts.lock().unwrap().pop_front() {
            Some(GenerateScript::Reply(reply)) => Ok(reply),
            Some(GenerateScript::TransportError) => Err(anyhow!("connection refused")),
            None => Err(anyhow!("ScriptedBackend: no more generate scripts")),
        }
    }

    fn poll(&self) -> Result<PollOutcome> {
        Ok(PollOutcome::Unreachable)
    }

    fn submit_code(&self, code: &str, options: &[String]) -> Result<()> {
        self.submissions
            .lock()
            .unwrap()
            .push((code.to_string(), options.to_vec()));
        Ok(())
    }

    fn control(&self, endpoint: ControlEndpoint) -> Result<()> {
        self.controls.lock().unwrap().push(endpoint);
        if self.fail_controls.load(std::sync::atomic::Ordering::Relaxed) {
            return Err(anyhow!("control endpoint returned HTTP 502"));
        }
        Ok(())
    }

    fn models(&self) -> Result<Vec<ModelInfo>> {
        Ok(self.models.lock().unwrap().clone())
    }

    fn upload(&self, filename: &str) -> Result<UploadReply> {
        self.upload_reply
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow!("ScriptedBackend: upload of '{filename}' not scripted"))
    }

    fn foundry_listing(&self, _folder: Option<&str>) -> Result<FoundryListing> {
        Ok(self
            .foundry_listing
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_default())
    }

    fn foundry_download(&self, dataset_rid: &str) -> Result<FoundryDownload> {
        self.foundry_download
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow!("ScriptedBackend: download of '{dataset_rid}' not scripted"))
    }
}
