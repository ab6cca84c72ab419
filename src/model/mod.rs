pub mod config;
pub mod forest;
pub mod task;
pub mod timer;

pub use config::*;
pub use forest::*;
pub use task::*;
pub use timer::*;
