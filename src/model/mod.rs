//! Explicit model registry: descriptors, apps, field reflection, and query sets.

pub mod descriptor;
pub mod queryset;
pub mod reflection;
pub mod registry;

pub use descriptor::*;
pub use queryset::*;
pub use reflection::*;
pub use registry::*;
