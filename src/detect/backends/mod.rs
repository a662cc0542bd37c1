pub mod motion;
pub mod replay;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use motion::MotionBackend;
pub use replay::ReplayBackend;

#[cfg(feature = "backend-tract")]
pub use tract::TractBackend;
