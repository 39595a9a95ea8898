//! EduPlan: digital-competency lesson planning for Vietnamese lower-secondary
//! curricula (grades 6 to 9), driven over a JSON-lines sidecar protocol.

pub mod ai;
pub mod backup;
pub mod context;
pub mod db;
pub mod edit;
pub mod export;
pub mod ipc;
pub mod matrix;
pub mod model;
pub mod notify;
pub mod registry;
pub mod session;
pub mod setup;
pub mod store;
pub mod usage;
