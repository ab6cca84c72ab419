pub mod duration;
pub mod unicode;
