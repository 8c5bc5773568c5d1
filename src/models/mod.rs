//! Data models for Guerite

pub mod snapshot;
pub mod visit;
pub mod visitor;

// Re-export commonly used types
pub use snapshot::{Snapshot, VisitorWithHistory};
pub use visit::{NewVisit, Visit, VisitId};
pub use visitor::{Photo, Photos, Visitor, VisitorDraft, VisitorFields, VisitorId};
