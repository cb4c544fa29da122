pub mod capture;
pub mod method;

pub use capture::{CaptureError, CaptureForest, CaptureNode, NodeData, NodeId, NodeSpec, TreeId};
pub use method::MethodModel;
