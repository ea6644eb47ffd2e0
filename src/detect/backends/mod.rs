pub mod background;
pub mod frame_diff;

pub use background::BackgroundSubtractionBackend;
pub use frame_diff::FrameDifferenceBackend;
