mod activity_handle;
mod control_handle;
mod sse_handle;
mod status_handle;

pub use activity_handle::*;
pub use control_handle::*;
pub use sse_handle::*;
pub use status_handle::*;
