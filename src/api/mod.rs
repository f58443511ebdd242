pub mod client;
#[cfg(test)]
pub mod mock_client;

pub use client::{BackendClient, ControlEndpoint, FoundryDownload, PollOutcome};
