//! # Relation Model
//!
//! Clean DTOs describing what the orchestration framework hands us:
//! relations, columns, constraints, and the bind values that travel with
//! a statement. These types cross every boundary: framework ↔ adapter ↔ driver.
//!
//! Design rule: NO driver types here.
//! This module is pure data: no I/O, no state, no async.

pub mod relation;
pub mod column;
pub mod constraint;
pub mod value;
pub mod type_codes;

pub use relation::{Relation, RelationType};
pub use column::Column;
pub use constraint::{
    ColumnConstraint, ModelConstraint, ConstraintKind, ConstraintSupport, RawColumn,
};
pub use value::Value;
pub use type_codes::type_code_name;
