//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. An allowlist entry
/// is one: two entries holding the same normalized address are the same entry,
/// regardless of how the raw input was cased or padded.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
