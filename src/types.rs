//! Mapping from Athena's column type system onto the host's generic types.

use serde::Serialize;

/// The host framework's generic column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EvidenceType {
    Boolean,
    Number,
    Date,
    String,
}

/// Whether a reported column type is authoritative or inferred from
/// sampled values. Athena reports exact types, so this connector always
/// emits `Precise`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeFidelity {
    Precise,
    Inferred,
}

/// Typed column descriptor handed to the host framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnType {
    pub name: String,
    pub evidence_type: EvidenceType,
    pub type_fidelity: TypeFidelity,
}

/// Translate an Athena native type tag into a host type.
///
/// Matching is case-sensitive and exact; Athena reports tags in lowercase.
/// Complex and high-precision types (array, map, struct, decimal, binary)
/// carry no lossless host representation and come through as strings, as
/// does any tag this table does not know about.
pub fn map_athena_type_to_evidence_type(native: &str) -> EvidenceType {
    match native {
        "boolean" => EvidenceType::Boolean,
        "tinyint" | "smallint" | "int" | "integer" | "bigint" | "double" | "float" | "real" => {
            EvidenceType::Number
        }
        "date" | "timestamp" => EvidenceType::Date,
        "string" | "char" | "varchar" => EvidenceType::String,
        "array" | "map" | "struct" | "decimal" | "binary" => EvidenceType::String,
        _ => EvidenceType::String,
    }
}
