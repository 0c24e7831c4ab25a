//! Field classification → index column type.
//!
//! Classifications are the record store's field class names. Anything not in
//! the table maps to [`DEFAULT_COLUMN_TYPE`].

/// Column type used for classifications missing from the table.
pub const DEFAULT_COLUMN_TYPE: &str = "string";

/// Static classification table, in the engine's column type vocabulary.
pub const FIELD_TYPES: &[(&str, &str)] = &[
    ("CharField", "text"),
    ("TextField", "text"),
    ("SlugField", "text"),
    ("EmailField", "text"),
    ("URLField", "text"),
    ("UUIDField", "string"),
    ("AutoField", "bigint"),
    ("BigAutoField", "bigint"),
    ("SmallAutoField", "int"),
    ("IntegerField", "int"),
    ("SmallIntegerField", "int"),
    ("PositiveIntegerField", "int"),
    ("PositiveSmallIntegerField", "int"),
    ("BigIntegerField", "bigint"),
    ("PositiveBigIntegerField", "bigint"),
    ("ForeignKey", "bigint"),
    ("OneToOneField", "bigint"),
    ("FloatField", "float"),
    ("DecimalField", "float"),
    ("BooleanField", "bool"),
    ("DateField", "timestamp"),
    ("DateTimeField", "timestamp"),
    ("JSONField", "json"),
];

/// Lookup over [`FIELD_TYPES`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldTypeMap;

impl FieldTypeMap {
    /// Column type for a field classification.
    #[must_use]
    pub fn column_type(classification: &str) -> &'static str {
        FIELD_TYPES
            .iter()
            .find(|(class, _)| *class == classification)
            .map_or(DEFAULT_COLUMN_TYPE, |(_, ty)| ty)
    }

    /// Whether a classification has an explicit mapping.
    #[must_use]
    pub fn is_mapped(classification: &str) -> bool {
        FIELD_TYPES.iter().any(|(class, _)| *class == classification)
    }
}
