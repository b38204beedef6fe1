pub mod container;
pub mod diagram;
pub mod error;
pub mod journal;
pub mod model;
pub mod naming;
pub mod selection;
pub mod uid;

pub use container::{ContainerEntry, DiagramContainer, ModelContainer, ProjectContainer};
pub use diagram::{
    AdmissionCheck, AdmitAll, DiagramElement, DiagramGraph, DiagramObject, DiagramRelation,
    Geometry, Point,
};
pub use error::{ContainerError, ModelError, Result};
pub use journal::{Change, Journal};
pub use model::*;
pub use selection::{Selection, SelectionIndex};
pub use uid::Uid;

// Used by `invariant!` so callers don't need their own `log` dependency.
#[doc(hidden)]
pub use log as __log;
