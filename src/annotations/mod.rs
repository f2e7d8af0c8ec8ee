pub mod counts;
pub mod store;
pub mod types;

pub use counts::DomainCounts;
pub use store::AnnotationStore;
pub use types::{
    Annotation, AnnotationBody, AnnotationKind, AnnotationSet, ExportBundle, PageIdentity, Position,
    SelectionContext, SurroundingText,
};
