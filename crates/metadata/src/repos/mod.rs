//! Repository traits for metadata operations.

pub mod files;
pub mod staging;

pub use files::FileRepo;
pub use staging::StagingRepo;
