//! Watch runtime: one notify watcher and one dispatcher loop per directory group.

pub mod dispatcher;
mod error;
mod runtime;

pub use dispatcher::{is_upload_trigger, FileChangeDispatcher, UploadTask};
pub use error::DaemonError;
pub use runtime::{init_tracing, plan, run, run_until, start_blocking, WatchOptions, WatchSet};
