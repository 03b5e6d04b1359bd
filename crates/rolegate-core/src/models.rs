//! Domain models for rolegate.
//!
//! Permissions and roles are scoped by a guard name; subjects are
//! referenced polymorphically through [`subject::SubjectRef`].

pub mod permission;
pub mod record;
pub mod role;
pub mod subject;
