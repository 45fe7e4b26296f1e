pub mod phases;
pub mod tracker;
pub mod stages;

pub use phases::{PhaseDescriptor, PhaseId, PhaseModel};
pub use tracker::PipelineStatusTracker;
pub use stages::status_from_stages;
