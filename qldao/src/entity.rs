//! Reflective entity model.
//!
//! Every persisted type exposes a self-describing surface through a per-type
//! **capability table**: a static list of attribute names paired with getter
//! and setter function pointers. All derived behavior (equality, hashing,
//! deep clone, diff, positional rehydration) is expressed purely in terms of
//! that table, so a new entity type needs nothing beyond declaring its
//! fields with [`attributes!`].
//!
//! # Example
//!
//! ```ignore
//! #[derive(Default)]
//! struct UserEntity {
//!     id: Option<i64>,
//!     username: String,
//!     state: EntityState,
//! }
//!
//! impl Entity for UserEntity {
//!     type Id = i64;
//!     fn table_name() -> &'static str { "users" }
//!     fn id_column() -> &'static str { "id" }
//!     attributes! { UserEntity { id, username } }
//!     fn primary_key(&self) -> Option<i64> { self.id }
//!     fn state(&self) -> &EntityState { &self.state }
//!     fn state_mut(&mut self) -> &mut EntityState { &mut self.state }
//! }
//! ```

use crate::error::DataError;
use crate::value::Value;
use std::hash::{Hash, Hasher};

/// One entry of a type's capability table.
pub struct Attribute<T> {
    pub name: &'static str,
    pub get: fn(&T) -> Value,
    pub set: fn(&mut T, Value) -> Result<(), DataError>,
}

/// Transient per-instance state shared by every entity through composition
/// (the replacement for a common mutable base class).
///
/// Neither flag is an attribute, so neither ever reaches the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityState {
    /// UI-style batch selection marker.
    pub selected: bool,
    /// Set on references produced by `Session::get_reference`; cleared once
    /// the non-key attributes have been materialized.
    pub deferred: bool,
}

/// A database entity with a table name, primary-key column and a static
/// capability table.
///
/// `Default` supplies the zero values that partial-field queries leave in
/// place for unretrieved attributes.
pub trait Entity: Default + Send + Sync + 'static {
    type Id: Clone + PartialEq + Into<Value> + Send + Sync + 'static;

    fn table_name() -> &'static str;
    fn id_column() -> &'static str;
    fn attributes() -> &'static [Attribute<Self>];
    /// Absent exactly when the entity has never been persisted.
    fn primary_key(&self) -> Option<Self::Id>;
    fn state(&self) -> &EntityState;
    fn state_mut(&mut self) -> &mut EntityState;
}

/// Generate the `attributes()` capability table from a field list.
///
/// Each listed field must be `Clone`, convertible into [`Value`] and
/// recoverable through [`FromValue`](crate::value::FromValue).
#[macro_export]
macro_rules! attributes {
    ($ty:ty { $($field:ident),+ $(,)? }) => {
        fn attributes() -> &'static [$crate::entity::Attribute<$ty>] {
            const TABLE: &[$crate::entity::Attribute<$ty>] = &[
                $(
                    $crate::entity::Attribute {
                        name: stringify!($field),
                        get: |e: &$ty| $crate::value::Value::from(e.$field.clone()),
                        set: |e: &mut $ty, value: $crate::value::Value| {
                            let actual = value.kind();
                            match $crate::value::FromValue::from_value(value) {
                                Some(parsed) => {
                                    e.$field = parsed;
                                    Ok(())
                                }
                                None => Err($crate::error::DataError::TypeMismatch {
                                    attribute: stringify!($field),
                                    expected: ::std::any::type_name_of_val(&e.$field),
                                    actual,
                                }),
                            }
                        },
                    },
                )+
            ];
            TABLE
        }
    };
}

fn lookup<T: Entity>(name: &str) -> Result<&'static Attribute<T>, DataError> {
    T::attributes()
        .iter()
        .find(|a| a.name == name)
        .ok_or_else(|| DataError::UnknownAttribute {
            entity: T::table_name(),
            attribute: name.to_string(),
        })
}

/// Derived entity behavior, implemented for every [`Entity`] purely in terms
/// of its capability table.
pub trait EntityExt: Entity {
    /// Declared attribute names, in declaration order.
    fn attribute_names() -> Vec<&'static str> {
        Self::attributes().iter().map(|a| a.name).collect()
    }

    fn get_attribute(&self, name: &str) -> Result<Value, DataError> {
        lookup::<Self>(name).map(|a| (a.get)(self))
    }

    fn set_attribute(&mut self, name: &str, value: Value) -> Result<(), DataError> {
        lookup::<Self>(name).and_then(|a| (a.set)(self, value))
    }

    /// Structural equality over the full attribute set.
    fn attributes_eq(&self, other: &Self) -> bool {
        Self::attributes()
            .iter()
            .all(|a| (a.get)(self) == (a.get)(other))
    }

    /// Hash over the full attribute set, consistent with [`attributes_eq`].
    ///
    /// [`attributes_eq`]: EntityExt::attributes_eq
    fn attribute_hash(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        for attr in Self::attributes() {
            (attr.get)(self).hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Deep copy built by replaying every attribute value onto a fresh zero
    /// value; mutable containers end up independently owned.
    fn clone_entity(&self) -> Result<Self, DataError> {
        let mut out = Self::default();
        for attr in Self::attributes() {
            (attr.set)(&mut out, (attr.get)(self))?;
        }
        *out.state_mut() = self.state().clone();
        Ok(out)
    }

    /// Names of the attributes whose values differ, in declaration order.
    ///
    /// Comparing entities of different concrete types is rejected by the
    /// type system, so no runtime type check is needed here.
    fn diff(&self, other: &Self) -> Vec<&'static str> {
        Self::attributes()
            .iter()
            .filter(|a| (a.get)(self) != (a.get)(other))
            .map(|a| a.name)
            .collect()
    }

    /// Overwrite the listed attributes with `from`'s values. An empty list
    /// is a no-op.
    fn copy_attributes_from(&mut self, from: &Self, names: &[&str]) -> Result<(), DataError> {
        for name in names {
            let value = from.get_attribute(name)?;
            self.set_attribute(name, value)?;
        }
        Ok(())
    }

    /// Rebuild an entity from a positional tuple, in the given field order.
    ///
    /// A `Null` leaves the field at its zero value, so partial projections
    /// over non-optional columns hydrate cleanly.
    fn from_row(fields: &[&str], values: Vec<Value>) -> Result<Self, DataError> {
        if fields.len() != values.len() {
            return Err(DataError::ParameterCountMismatch {
                expected: fields.len(),
                actual: values.len(),
            });
        }
        let mut out = Self::default();
        for (name, value) in fields.iter().zip(values) {
            if value.is_null() {
                continue;
            }
            out.set_attribute(name, value)?;
        }
        Ok(out)
    }

    /// Human-readable attribute dump, e.g. `users { id: Int(1), .. }`.
    fn describe(&self) -> String {
        let body: Vec<String> = Self::attributes()
            .iter()
            .map(|a| format!("{}: {:?}", a.name, (a.get)(self)))
            .collect();
        format!("{} {{ {} }}", Self::table_name(), body.join(", "))
    }

    fn is_selected(&self) -> bool {
        self.state().selected
    }

    fn set_selected(&mut self, selected: bool) {
        self.state_mut().selected = selected;
    }

    /// True iff both entities carry a primary key and the keys are equal.
    fn same_primary_key(&self, other: &Self) -> bool {
        match (self.primary_key(), other.primary_key()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl<T: Entity> EntityExt for T {}
