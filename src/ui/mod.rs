//! UI surfaces of the extension.

pub mod dashboard;
pub mod popup;
