//! # Schemas and type descriptors
//!
//! Callers describe the data an expression may read with a [`SchemaMap`]:
//! field names mapped to type-descriptor strings or nested maps.
//!
//! ```text
//! { "age": "number.integer >= 0", "user": { "email": "string.email" } }
//! ```
//!
//! - **[descriptor]** - the descriptor language (kinds, subtypes, bounds,
//!   literal units, arrays, unions), value checks and subsumption
//! - **[map]** - schema maps and dotted-path resolution
//! - **[validate]** - checks runtime data against a schema
pub mod descriptor;
pub mod map;
pub mod validate;

pub use descriptor::{Bound, Bounds, DescriptorError, Kind, Primitive, Subtype, TypeDescriptor};
pub use map::{SchemaEntry, SchemaError, SchemaMap};
pub use validate::{Violation, validate};
