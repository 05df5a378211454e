pub mod landmarks;
pub mod replay;
