// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Index schema derived from record-type metadata.
//!
//! ```text
//! RecordType fields ──(FieldTypeMap)──→ IndexDefinition column spec
//!                                              │
//!                                          Registry (frozen after startup)
//! ```
//!
//! - **Table name**: the record type name, lower-cased
//! - **Default fields**: every field except `id` and reverse relations
//! - **Table params**: filtered through [`ALLOWED_TABLE_PARAMS`]

mod definition;
mod field_types;
mod registry;

pub use definition::{ColumnSpec, IndexDefinition, ALLOWED_TABLE_PARAMS};
pub use field_types::{FieldTypeMap, DEFAULT_COLUMN_TYPE, FIELD_TYPES};
pub use registry::Registry;
