pub mod window;

pub use window::{DisplayInfo, QueryKind, SpaceInfo, WindowEntity};
