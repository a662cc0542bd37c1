mod backend;
mod backends;
mod registry;
mod result;

pub use backend::DetectorBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use backends::{MotionBackend, ReplayBackend};
pub use registry::{select_backend, DetectorSettings, Device};
pub use result::Detection;
