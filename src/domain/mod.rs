// Domain layer - pure types and windowing math, no I/O
pub mod dashboard;
pub mod error;
pub mod projection;
pub mod sample;
pub mod widget;
pub mod window;
pub mod window_ops;
