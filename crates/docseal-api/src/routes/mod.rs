//! Route modules, one per resource.

pub mod documents;
pub mod upload;
pub mod verify;
