/// Question sources: in-memory cache and remote question service.
pub mod content_source;
/// Wire models of questions exchanged with the question service.
pub mod models;
/// Storage error types shared by content sources.
pub mod storage;
