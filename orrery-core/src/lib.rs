/// Orrery Core Library - math, mesh loading and orbital simulation
///
/// This library holds everything that does not need a window or a GPU:
/// vector/matrix algebra, the OBJ loader, the orbit simulation and the
/// frame driver that sequences them.

pub mod driver;
pub mod geometry;
pub mod math;
pub mod obj;
pub mod orbit;
pub mod projection;

// Re-export commonly used types
pub use driver::{FrameDriver, Key, LoopState, Platform, PlatformEvent, Renderer};
pub use geometry::{Vertex, VertexStream};
pub use math::{Mat4, Vec3};
pub use obj::{load_obj, parse_obj, ObjError};
pub use orbit::{Body, Scene, SceneConfig};
pub use projection::{Camera, Projection};
