pub mod export;
pub mod llm;
pub mod outline;
pub mod references;
pub mod section;
pub mod setup;
pub mod workflow;
