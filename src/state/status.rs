/// What the backend is currently doing, as far as this client knows. Exactly
/// one value holds at a time; it drives UI affordances only and never gates
/// transcript correctness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SystemStatus {
    #[default]
    Idle,
    WaitingForKernel,
    GeneratingCode,
    RunningCode,
    UploadingFile,
    FixingCode,
    SessionTimeout,
}

impl SystemStatus {
    /// Map a backend phase string to a status. Unrecognized strings mean the
    /// kernel is in some transitional state we do not know about, so they
    /// conservatively map to `WaitingForKernel`.
    pub fn from_backend(status: &str) -> Self {
        match status {
            "starting" => SystemStatus::WaitingForKernel,
            "ready" | "idle" => SystemStatus::Idle,
            "generating" => SystemStatus::GeneratingCode,
            "busy" => SystemStatus::RunningCode,
            _ => SystemStatus::WaitingForKernel,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SystemStatus::Idle => "ready",
            SystemStatus::WaitingForKernel => "waiting for kernel",
            SystemStatus::GeneratingCode => "generating code",
            SystemStatus::RunningCode => "running code",
            SystemStatus::UploadingFile => "uploading file",
            SystemStatus::FixingCode => "fixing code",
            SystemStatus::SessionTimeout => "session timed out - please restart",
        }
    }
}

/// Holder for the single current status value. Writers replace the whole
/// value; readers only ever observe the latest one.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusTracker {
    current: SystemStatus,
}

impl StatusTracker {
    pub fn set(&mut self, status: SystemStatus) {
        self.current = status;
    }

    pub fn get(&self) -> SystemStatus {
        self.current
    }
}
