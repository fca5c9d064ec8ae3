pub mod attachment;
pub mod autosave;
pub mod config;
pub mod dashboard;
pub mod project_sync;
pub mod session;
pub mod store;
