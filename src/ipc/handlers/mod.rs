pub mod ai;
pub mod analysis;
pub mod backup;
pub mod core;
pub mod curriculum;
pub mod export;
pub mod notifications;
pub mod session;
pub mod setup;
