mod arbiter;
mod poller;

#[cfg(test)]
mod tests;

pub use arbiter::{BroadcastTabChannel, SessionArbiter, TabAnnouncement, TabChannel};
pub use poller::{PollGates, Poller, POLL_INTERVAL};

use crate::api::{BackendClient, ControlEndpoint, FoundryDownload, PollOutcome};
use crate::logging;
use crate::prefs::Preferences;
use crate::state::{AutoFix, MessageLog, StatusTracker, SystemStatus};
use crate::types::{ContentKind, FoundryListing, Message, ModelInfo, Role};
use anyhow::Result;
use std::path::Path;

/// Corrective prompt re-submitted by the auto-fix loop.
pub const FIX_PROMPT: &str = "Please fix the error.";

/// Word commands recognized in chat input, mapped to a control endpoint, an
/// informational transcript entry and an optimistic status.
struct CommandSpec {
    info: &'static str,
    status: SystemStatus,
    endpoint: ControlEndpoint,
    clears_log: bool,
}

fn lookup_command(input: &str) -> Option<CommandSpec> {
    match input.trim().to_lowercase().as_str() {
        "reset" => Some(CommandSpec {
            info: "Restarting the kernel.",
            status: SystemStatus::WaitingForKernel,
            endpoint: ControlEndpoint::Restart,
            clears_log: false,
        }),
        "clear" => Some(CommandSpec {
            info: "Clearing chat history.",
            status: SystemStatus::Idle,
            endpoint: ControlEndpoint::ClearHistory,
            clears_log: true,
        }),
        "stop" => Some(CommandSpec {
            info: "Interrupting code execution.",
            status: SystemStatus::WaitingForKernel,
            endpoint: ControlEndpoint::Interrupt,
            clears_log: false,
        }),
        _ => None,
    }
}

/// Owner of the conversation state. The transcript and status tracker are
/// mutated exclusively through the operations below, all of which run on the
/// app task; the poller only ever hands `PollOutcome`s over a channel.
pub struct SessionController {
    client: BackendClient,
    log: MessageLog,
    status: StatusTracker,
    auto_fix: AutoFix,
    prefs: Preferences,
}

impl SessionController {
    pub fn new(client: BackendClient, prefs: Preferences) -> Self {
        let auto_fix = AutoFix::new(prefs.auto_fix, prefs.auto_fix_attempts);
        Self {
            client,
            log: MessageLog::new(),
            status: StatusTracker::default(),
            auto_fix,
            prefs,
        }
    }

    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    pub fn messages(&self) -> &[Message] {
        self.log.entries()
    }

    pub fn status(&self) -> SystemStatus {
        self.status.get()
    }

    pub fn prefs(&self) -> &Preferences {
        &self.prefs
    }

    pub fn auto_fix(&self) -> &AutoFix {
        &self.auto_fix
    }

    pub fn set_model(&mut self, model: &str) {
        self.prefs.model = model.to_string();
    }

    pub fn set_show_code(&mut self, show_code: bool) {
        self.prefs.show_code = show_code;
    }

    pub fn configure_auto_fix(&mut self, enabled: bool, max_attempts: u32) {
        self.prefs.auto_fix = enabled;
        self.prefs.auto_fix_attempts = max_attempts;
        self.auto_fix.configure(enabled, max_attempts);
    }

    pub fn toggle_option(&mut self, option: &str) -> bool {
        let option = option.to_string();
        let enabled = if let Some(index) = self.prefs.options.iter().position(|o| *o == option) {
            self.prefs.options.remove(index);
            false
        } else {
            self.prefs.options.push(option);
            true
        };
        enabled
    }

    /// Append an informational system entry produced by the frontend itself
    /// (settings feedback, dataset listings).
    pub fn append_notice(&mut self, text: impl Into<String>) {
        self.log
            .append(Message::new(Role::System, ContentKind::Message, text));
    }

    /// Entry point for raw chat input: a control command, a generation
    /// request, or nothing.
    pub async fn handle_input(&mut self, input: &str) {
        if let Some(spec) = lookup_command(input) {
            self.run_control(spec).await;
            return;
        }

        let prompt = input.trim();
        if prompt.is_empty() {
            return;
        }

        self.log
            .append(Message::new(Role::User, ContentKind::Message, prompt));
        self.status.set(SystemStatus::GeneratingCode);
        self.auto_fix.rearm();
        self.request_generation(prompt).await;
    }

    async fn run_control(&mut self, spec: CommandSpec) {
        self.log
            .append(Message::new(Role::System, ContentKind::Message, spec.info));
        self.status.set(spec.status);

        match self.client.control(spec.endpoint).await {
            Ok(()) => {
                if spec.clears_log {
                    self.log.reset();
                }
            }
            Err(error) => logging::log_error("control", &error),
        }
    }

    /// The generation request/response path shared by user prompts and fix
    /// attempts. A transport failure is logged and leaves status untouched;
    /// retries are the auto-fix loop's business, and only for execution
    /// errors.
    async fn request_generation(&mut self, prompt: &str) {
        let reply = match self.client.generate(prompt, &self.prefs.model).await {
            Ok(reply) => reply,
            Err(error) => {
                logging::log_error("generate", &error);
                return;
            }
        };

        self.log
            .append(Message::new(Role::Generator, ContentKind::Message, reply.text));

        if !reply.ok {
            self.status.set(SystemStatus::Idle);
            return;
        }

        match reply.code {
            Some(code) if !code.trim().is_empty() => {
                if self.prefs.show_code {
                    self.log
                        .append(Message::new(Role::Generator, ContentKind::Code, &*code));
                }
                self.spawn_submission(code);
                self.status.set(SystemStatus::RunningCode);
            }
            _ => self.status.set(SystemStatus::Idle),
        }
    }

    /// Fire-and-forget code submission: a hung kernel POST must not stall the
    /// dispatcher, so the request runs on its own task and failures go to the
    /// diagnostic log.
    fn spawn_submission(&self, code: String) {
        let client = self.client.clone();
        let options = self.prefs.options.clone();
        tokio::spawn(async move {
            if let Err(error) = client.submit_code(&code, &options).await {
                logging::log_error("submit", &error);
            }
        });
    }

    /// Fold one poll outcome into session state.
    pub async fn apply_poll(&mut self, outcome: PollOutcome) {
        match outcome {
            PollOutcome::AuthRedirect => self.status.set(SystemStatus::SessionTimeout),
            PollOutcome::Unreachable => {
                if self.status.get() != SystemStatus::WaitingForKernel {
                    self.status.set(SystemStatus::WaitingForKernel);
                }
            }
            PollOutcome::Snapshot(snapshot) => {
                self.status.set(SystemStatus::from_backend(&snapshot.status));

                let mut last_kind = None;
                for result in snapshot.results {
                    if result.value.trim().is_empty() {
                        continue;
                    }
                    last_kind = Some(result.kind);
                    self.log
                        .append(Message::new(Role::System, result.kind, result.value));
                }

                if last_kind.is_some_and(ContentKind::is_error) && self.auto_fix.enabled() {
                    self.run_auto_fix().await;
                }
            }
        }
    }

    /// Bounded retry on an execution error: mark everything the kernel said
    /// since the last user/generator turn as superseded, then either spend an
    /// attempt on a corrective prompt or report exhaustion once.
    async fn run_auto_fix(&mut self) {
        self.log.relabel_trailing_system(Role::SystemHide);

        if self.auto_fix.try_consume() {
            self.status.set(SystemStatus::FixingCode);
            self.log
                .append(Message::new(Role::Generator, ContentKind::Message, FIX_PROMPT));
            self.request_generation(FIX_PROMPT).await;
        } else if self.auto_fix.note_exhausted() {
            self.log.append(Message::new(
                Role::System,
                ContentKind::Message,
                format!(
                    "Automatic fixing did not succeed within {} attempts. Giving up.",
                    self.auto_fix.max_attempts()
                ),
            ));
        }
    }

    pub async fn fetch_models(&self) -> Result<Vec<ModelInfo>> {
        self.client.models().await
    }

    pub async fn upload_file(&mut self, path: &Path) {
        self.status.set(SystemStatus::UploadingFile);
        match self.client.upload(path).await {
            Ok(reply) => {
                self.log
                    .append(Message::new(Role::Upload, ContentKind::Message, reply.message));
            }
            Err(error) => logging::log_error("upload", &error),
        }
        self.status.set(SystemStatus::Idle);
    }

    /// Fetch the dataset listing for the preferred folder; without a
    /// preference the backend's default folder is adopted and persisted.
    pub async fn refresh_datasets(&mut self) -> Option<FoundryListing> {
        match self
            .client
            .foundry_listing(self.prefs.foundry_folder.as_deref())
            .await
        {
            Ok(listing) => {
                if self.prefs.foundry_folder.is_none() && listing.folder.is_some() {
                    self.prefs.foundry_folder = listing.folder.clone();
                }
                Some(listing)
            }
            Err(error) => {
                logging::log_error("foundry", &error);
                None
            }
        }
    }

    pub fn set_foundry_folder(&mut self, folder: Option<String>) {
        self.prefs.foundry_folder = folder;
    }

    /// Pull a dataset into the kernel workspace. Every delivered file yields
    /// an upload entry; a rejected request yields one explanatory entry
    /// instead.
    pub async fn load_dataset(&mut self, dataset_rid: &str) {
        if dataset_rid.trim().is_empty() {
            return;
        }

        self.status.set(SystemStatus::UploadingFile);
        match self.client.foundry_download(dataset_rid).await {
            Ok(FoundryDownload::Files(files)) => {
                for file in files {
                    self.log
                        .append(Message::new(Role::Upload, ContentKind::Message, file.message));
                }
            }
            Ok(FoundryDownload::Failed { status, message }) => {
                self.log.append(Message::new(
                    Role::Upload,
                    ContentKind::Message,
                    format!(
                        "Downloading dataset {dataset_rid} failed with status code {status}: {message}"
                    ),
                ));
            }
            Err(error) => logging::log_error("foundry", &error),
        }
        self.status.set(SystemStatus::Idle);
    }
}
