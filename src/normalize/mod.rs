//! Projection of parsed fields into output schemas.
//!
//! A [`FieldMapping`] names, for each source field, an optional type
//! conversion and the destinations it feeds. Destinations shared by several
//! sources are resolved by their [`MergePolicy`] inside a
//! [`MergeAccumulator`].

pub mod convert;
pub mod mapping;
pub mod merge;
pub mod url;

pub use convert::{to_date, to_double, to_ip, to_long, to_mac, Converter, MAX_SAFE_INTEGER};
pub use mapping::{Destination, FieldMapping, MappingEntry};
pub use merge::{MergeAccumulator, MergePolicy};
pub use url::{to_url, Url, UrlComponent};
