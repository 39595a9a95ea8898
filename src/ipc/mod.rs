mod error;
mod handlers;
mod helpers;
mod router;
mod types;

pub use error::bad_json;
pub use router::handle_request;
pub use types::{AppState, Request, Workspace};
