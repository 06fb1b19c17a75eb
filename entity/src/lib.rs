//! Entity definitions shared by the storage adapter and the HTTP handlers.

pub mod employee;

pub use employee::{Entity as Employee, MutableField, UnknownField};
