//! Service layer: one storage operation per request
//!
//! Services own the backend handles and turn a decoded, validated value
//! into the backend calls that persist it. They return `StorageError`
//! unchanged; attaching an entity name is the handler's job.

pub mod blob_service;
pub mod file_service;
pub mod queue_service;
pub mod table_service;

pub use blob_service::BlobService;
pub use file_service::FileService;
pub use queue_service::QueueService;
pub use table_service::TableService;
