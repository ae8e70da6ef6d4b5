pub mod event_router;
pub mod main_process;

pub use event_router::{EventRouter, MessageTemplates};
pub use main_process::run_main_process;
