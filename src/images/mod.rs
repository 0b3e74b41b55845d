//! Image detection, registry and background analysis

pub mod analysis;
pub mod detector;
pub mod registry;

pub use analysis::AnalysisClient;
pub use detector::{DetectedImage, ImageDetector};
pub use registry::{ImageRegistry, ImageTarget, RegisteredImage};
