pub mod chain;
pub mod logs;
