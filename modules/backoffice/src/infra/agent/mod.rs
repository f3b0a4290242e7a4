//! Outbound adapters for the analytics agent: workflow orchestrator,
//! query sandbox and speech-to-text.

pub mod analytics;
pub mod orchestrator;
pub mod transcription;

pub use analytics::SqliteSandbox;
pub use orchestrator::HttpOrchestrator;
pub use transcription::SpeechToText;
