//! Classifies column types to decide which statistics apply.

/// Statistic family a column type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeClass {
    /// Gets min/max
    Numeric,
    /// Gets average length
    Text,
    /// Null, distinct and sample values only
    Other,
}

const NUMERIC_TYPES: &[&str] = &[
    "int", "integer", "bigint", "smallint", "tinyint", "decimal", "dec", "double", "float",
    "real", "long", "short", "byte", "numeric",
];

const TEXT_TYPES: &[&str] = &["string", "varchar", "char", "character", "text"];

impl TypeClass {
    /// Classifies a type name such as `BIGINT`, `decimal(10,2)` or `varchar(64)`.
    ///
    /// Only the base type name counts, the part before any `(`, `<` or
    /// space. Nested types such as `array<int>` are never numeric.
    pub fn of(data_type: &str) -> Self {
        let lower = data_type.trim().to_ascii_lowercase();
        let base = base_type(&lower);
        if TEXT_TYPES.contains(&base) {
            Self::Text
        } else if NUMERIC_TYPES.contains(&base) {
            Self::Numeric
        } else {
            Self::Other
        }
    }

    pub fn is_numeric(self) -> bool {
        self == Self::Numeric
    }

    pub fn is_text(self) -> bool {
        self == Self::Text
    }
}

fn base_type(type_name: &str) -> &str {
    type_name
        .split(|c: char| c == '(' || c == '<' || c.is_whitespace())
        .next()
        .unwrap_or_default()
}
