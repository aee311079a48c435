//! Helpers for rendering messages in proto3 JSON form
//!
//! Fields holding their default value are omitted and enum fields are
//! rendered by name, so expressions see the same shape the registry tools
//! produce for these artifacts.

use serde::{Serialize, Serializer};

pub(crate) fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

/// Serializes an enumeration field by variant name, falling back to the
/// raw number for values this build does not know
pub(crate) fn enum_name<E, S>(value: &i32, serializer: S) -> Result<S::Ok, S::Error>
where
    E: TryFrom<i32> + Serialize,
    S: Serializer,
{
    match E::try_from(*value) {
        Ok(known) => known.serialize(serializer),
        Err(_) => serializer.serialize_i32(*value),
    }
}
