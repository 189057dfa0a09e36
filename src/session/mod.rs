pub mod controller;
pub mod state;

pub use controller::{
    Completion, CompletionError, CompletionListener, SessionController, SessionSnapshot,
    SessionUploader,
};
pub use state::{ControllerState, SessionState};
