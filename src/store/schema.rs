//! Collection schema, index parameters and row types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a primary key
pub const ID_MAX_LEN: usize = 64;
/// Maximum stored text length (characters)
pub const TEXT_MAX_LEN: usize = 8192;
/// Maximum serialized metadata length (bytes)
pub const META_MAX_LEN: usize = 4096;
/// Largest HNSW connection count hnsw_rs accepts
pub const HNSW_MAX_M: usize = 256;

pub const FIELD_ID: &str = "id";
pub const FIELD_TEXT: &str = "text";
pub const FIELD_VECTOR: &str = "vector";
pub const FIELD_META: &str = "meta";

/// Similarity metric of a vector index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Metric {
    L2,
    #[serde(rename = "IP")]
    Ip,
    #[default]
    Cosine,
}

impl Metric {
    /// Whether larger native scores mean closer vectors (false for L2 distance)
    pub fn higher_is_better(self) -> bool {
        !matches!(self, Metric::L2)
    }

    /// Native score between two vectors of equal length.
    ///
    /// Accumulates in f64, so finite inputs never produce NaN. A result past
    /// the f32 range saturates to infinity.
    pub fn score(self, a: &[f32], b: &[f32]) -> f32 {
        let score = match self {
            Metric::L2 => a
                .iter()
                .zip(b)
                .map(|(x, y)| {
                    let d = *x as f64 - *y as f64;
                    d * d
                })
                .sum(),
            Metric::Ip => dot(a, b),
            Metric::Cosine => {
                let norm = dot(a, a).sqrt() * dot(b, b).sqrt();
                if norm == 0.0 {
                    0.0
                } else {
                    (dot(a, b) / norm).clamp(-1.0, 1.0)
                }
            }
        };
        score as f32
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::L2 => write!(f, "L2"),
            Metric::Ip => write!(f, "IP"),
            Metric::Cosine => write!(f, "COSINE"),
        }
    }
}

impl std::str::FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "L2" => Ok(Metric::L2),
            "IP" => Ok(Metric::Ip),
            "COSINE" => Ok(Metric::Cosine),
            other => Err(format!("unknown metric '{}', expected L2, IP or COSINE", other)),
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum()
}

/// Whether the f32 squared norm stays finite, as HNSW distance kernels require
pub fn has_finite_norm(v: &[f32]) -> bool {
    v.iter().map(|x| x * x).sum::<f32>().is_finite()
}

/// Storage type of a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    VarChar { max_length: usize },
    FloatVector { dim: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub primary: bool,
}

impl FieldSchema {
    pub fn varchar(name: &str, max_length: usize) -> Self {
        Self {
            name: name.to_string(),
            field_type: FieldType::VarChar { max_length },
            primary: false,
        }
    }

    pub fn vector(name: &str, dim: usize) -> Self {
        Self {
            name: name.to_string(),
            field_type: FieldType::FloatVector { dim },
            primary: false,
        }
    }

    fn primary(mut self) -> Self {
        self.primary = true;
        self
    }
}

/// Field list of a collection as reported by `describe_collection`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub fields: Vec<FieldSchema>,
}

impl CollectionSchema {
    /// The `id`/`text`/`vector`/`meta` layout every collection uses
    pub fn standard(dim: usize) -> Self {
        Self {
            fields: vec![
                FieldSchema::varchar(FIELD_ID, ID_MAX_LEN).primary(),
                FieldSchema::varchar(FIELD_TEXT, TEXT_MAX_LEN),
                FieldSchema::vector(FIELD_VECTOR, dim),
                FieldSchema::varchar(FIELD_META, META_MAX_LEN),
            ],
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn vector_dim(&self) -> Option<usize> {
        self.fields.iter().find_map(|f| match f.field_type {
            FieldType::FloatVector { dim } => Some(dim),
            FieldType::VarChar { .. } => None,
        })
    }

    /// Why this schema cannot hold `dim`-dimensional points, if it cannot
    pub fn incompatibility(&self, dim: usize) -> Option<String> {
        for name in [FIELD_ID, FIELD_TEXT, FIELD_META] {
            match self.field(name).map(|f| &f.field_type) {
                Some(FieldType::VarChar { .. }) => {}
                Some(_) => return Some(format!("field '{}' is not VarChar", name)),
                None => return Some(format!("missing field '{}'", name)),
            }
        }

        match self.field(FIELD_VECTOR).map(|f| &f.field_type) {
            Some(FieldType::FloatVector { dim: actual }) if *actual == dim => None,
            Some(FieldType::FloatVector { dim: actual }) => Some(format!(
                "vector dimension is {}, expected {}",
                actual, dim
            )),
            Some(_) => Some("field 'vector' is not FloatVector".to_string()),
            None => Some("missing field 'vector'".to_string()),
        }
    }
}

/// ANN index family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexType {
    Hnsw,
}

/// Construction parameters of a vector index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexParams {
    pub index_type: IndexType,
    pub metric: Metric,
    /// Connections per layer
    pub m: usize,
    pub ef_construction: usize,
}

impl IndexParams {
    pub fn hnsw(metric: Metric, m: usize, ef_construction: usize) -> Self {
        Self {
            index_type: IndexType::Hnsw,
            metric,
            m,
            ef_construction,
        }
    }

    /// Reason the graph cannot be built with these parameters, if any
    pub fn problem(&self) -> Option<String> {
        if self.m == 0 || self.m > HNSW_MAX_M {
            return Some(format!("m must be between 1 and {}, got {}", HNSW_MAX_M, self.m));
        }
        if self.ef_construction == 0 {
            return Some("ef_construction must be greater than 0".to_string());
        }
        None
    }
}

/// A stored row, `meta` already serialized
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: String,
    pub text: String,
    pub vector: Vec<f32>,
    pub meta: String,
}

/// A row as returned by scans (no vector)
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub text: String,
    pub meta: String,
}

/// A nearest-neighbour match with the store's native score
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub id: String,
    pub score: f32,
    pub text: String,
    pub meta: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_schema_is_compatible() {
        let schema = CollectionSchema::standard(384);
        assert_eq!(schema.vector_dim(), Some(384));
        assert!(schema.incompatibility(384).is_none());
        assert!(schema.field(FIELD_ID).unwrap().primary);
    }

    #[test]
    fn test_dimension_mismatch_detected() {
        let schema = CollectionSchema::standard(384);
        let reason = schema.incompatibility(768).unwrap();
        assert!(reason.contains("384"));
    }

    #[test]
    fn test_missing_field_detected() {
        let mut schema = CollectionSchema::standard(8);
        schema.fields.retain(|f| f.name != FIELD_META);
        assert_eq!(schema.incompatibility(8).unwrap(), "missing field 'meta'");
    }

    #[test]
    fn test_metric_scores() {
        let a = [1.0, 0.0];
        let b = [0.0, 1.0];
        assert!((Metric::Cosine.score(&a, &a) - 1.0).abs() < 1e-6);
        assert_eq!(Metric::Cosine.score(&a, &b), 0.0);
        assert_eq!(Metric::Ip.score(&[2.0, 3.0], &[4.0, 5.0]), 23.0);
        assert_eq!(Metric::L2.score(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
        assert_eq!(Metric::Cosine.score(&[0.0, 0.0], &a), 0.0);
    }

    #[test]
    fn test_index_param_bounds() {
        assert!(IndexParams::hnsw(Metric::Cosine, 16, 200).problem().is_none());
        assert!(IndexParams::hnsw(Metric::Cosine, HNSW_MAX_M, 200).problem().is_none());
        assert!(IndexParams::hnsw(Metric::Cosine, 300, 200).problem().is_some());
        assert!(IndexParams::hnsw(Metric::Cosine, 0, 200).problem().is_some());
        assert!(IndexParams::hnsw(Metric::L2, 16, 0).problem().is_some());
    }

    #[test]
    fn test_large_components_never_score_nan() {
        let a = [1e20, 1.0];
        let b = [2e20, 1.0];
        for metric in [Metric::Cosine, Metric::Ip, Metric::L2] {
            assert!(!metric.score(&a, &b).is_nan(), "{} produced NaN", metric);
        }
        assert!((Metric::Cosine.score(&a, &b) - 1.0).abs() < 1e-6);
        assert!(!has_finite_norm(&a));
        assert!(has_finite_norm(&[1e10, 1.0]));
    }

    #[test]
    fn test_metric_serde_names() {
        assert_eq!(serde_json::to_string(&Metric::Cosine).unwrap(), "\"COSINE\"");
        assert_eq!(serde_json::to_string(&Metric::Ip).unwrap(), "\"IP\"");
        assert_eq!("l2".parse::<Metric>().unwrap(), Metric::L2);
    }
}
