pub mod progress;
pub mod relocate;
pub mod task_ops;
pub mod timer_ops;
pub mod tree;
