//! Evaluating score expressions against artifact contents

use crate::artifact::{decoded_contents, message_type_for_mime_type};
use crate::expr::{env_from_json, CelEngine, ExprError, ExpressionEngine, Value};
use crate::schema::{SchemaError, SchemaRegistry};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvalError {
    #[error("failed extracting message type from {0:?}")]
    InvalidMimeType(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("failed decompressing contents: {0}")]
    Decompress(#[from] std::io::Error),

    #[error("error in evaluating expression {expression:?}: {source}")]
    Expression {
        expression: String,
        #[source]
        source: ExprError,
    },

    #[error("evaluating expression {expression:?} generated an unexpected output type {found}: should be one of [int, double, bool]")]
    UnexpectedType {
        expression: String,
        found: &'static str,
    },
}

/// The scalar a score expression reduces to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreValue {
    Int(i64),
    Double(f64),
    Bool(bool),
}

impl ScoreValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ScoreValue::Int(_) => "int",
            ScoreValue::Double(_) => "double",
            ScoreValue::Bool(_) => "bool",
        }
    }
}

impl fmt::Display for ScoreValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreValue::Int(i) => write!(f, "{i}"),
            ScoreValue::Double(d) => write!(f, "{d}"),
            ScoreValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<ScoreValue> for Value {
    fn from(value: ScoreValue) -> Self {
        match value {
            ScoreValue::Int(i) => Value::Int(i),
            ScoreValue::Double(d) => Value::Double(d),
            ScoreValue::Bool(b) => Value::Bool(b),
        }
    }
}

/// Decodes artifacts and runs expressions over them
#[derive(Clone)]
pub struct Evaluator {
    engine: Arc<dyn ExpressionEngine>,
    schemas: Arc<SchemaRegistry>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(Arc::new(CelEngine), Arc::new(SchemaRegistry::new()))
    }
}

impl fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluator").field("schemas", &self.schemas).finish_non_exhaustive()
    }
}

impl Evaluator {
    pub fn new(engine: Arc<dyn ExpressionEngine>, schemas: Arc<SchemaRegistry>) -> Self {
        Self { engine, schemas }
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    /// Evaluates `expression` against an artifact payload of type `mime_type`
    pub fn evaluate(&self, expression: &str, mime_type: &str, contents: &[u8]) -> Result<ScoreValue, EvalError> {
        let message_type = message_type_for_mime_type(mime_type)
            .ok_or_else(|| EvalError::InvalidMimeType(mime_type.to_string()))?;
        let payload = decoded_contents(mime_type, contents)?;
        let json = self.schemas.decode(message_type, &payload)?;
        self.evaluate_with_env(expression, &env_from_json(json))
    }

    /// Evaluates `expression` against named values
    pub fn evaluate_with_env(
        &self,
        expression: &str,
        env: &BTreeMap<String, Value>,
    ) -> Result<ScoreValue, EvalError> {
        let value = self
            .engine
            .evaluate(expression, env)
            .map_err(|source| EvalError::Expression {
                expression: expression.to_string(),
                source,
            })?;
        match value {
            Value::Int(i) => Ok(ScoreValue::Int(i)),
            Value::Double(d) => Ok(ScoreValue::Double(d)),
            Value::Bool(b) => Ok(ScoreValue::Bool(b)),
            other => Err(EvalError::UnexpectedType {
                expression: expression.to_string(),
                found: other.type_name(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::mime_type_for_message_type;
    use crate::schema::{metrics, references, style, COMPLEXITY_TYPE, LINT_TYPE, REFERENCES_TYPE};
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use prost::Message;
    use std::io::Write;

    fn lint_contents() -> Vec<u8> {
        style::Lint {
            name: "lint".into(),
            files: vec![style::LintFile {
                file_path: "openapi.yaml".into(),
                problems: vec![style::LintProblem {
                    message: "no description".into(),
                    ..Default::default()
                }],
            }],
        }
        .encode_to_vec()
    }

    #[test]
    fn test_evaluate_lint() {
        let evaluator = Evaluator::default();
        let value = evaluator
            .evaluate("size(files[0].problems)", &mime_type_for_message_type(LINT_TYPE), &lint_contents())
            .unwrap();
        assert_eq!(value, ScoreValue::Int(1));
    }

    #[test]
    fn test_evaluate_gzipped_complexity() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        let message = metrics::Complexity {
            get_count: 3,
            ..Default::default()
        };
        encoder.write_all(&message.encode_to_vec()).unwrap();
        let compressed = encoder.finish().unwrap();

        let mime = format!("{}+gzip", mime_type_for_message_type(COMPLEXITY_TYPE));
        let value = Evaluator::default().evaluate("getCount > 2.0", &mime, &compressed).unwrap();
        assert_eq!(value, ScoreValue::Bool(true));
    }

    #[test]
    fn test_evaluate_references() {
        let evaluator = Evaluator::default();
        let mime = mime_type_for_message_type(REFERENCES_TYPE);
        assert_eq!(evaluator.evaluate("1", &mime, &[]).unwrap(), ScoreValue::Int(1));

        let contents = references::References {
            external_references: vec!["common.yaml".into(), "errors.yaml".into()],
            available_references: vec![],
        }
        .encode_to_vec();
        let value = evaluator
            .evaluate("size(externalReferences)", &mime, &contents)
            .unwrap();
        assert_eq!(value, ScoreValue::Int(2));
    }

    #[test]
    fn test_unexpected_result_type() {
        let err = Evaluator::default()
            .evaluate("files[0].filePath", &mime_type_for_message_type(LINT_TYPE), &lint_contents())
            .unwrap_err();
        assert!(matches!(err, EvalError::UnexpectedType { found: "string", .. }));
    }

    #[test]
    fn test_unsupported_message_type() {
        let err = Evaluator::default()
            .evaluate("1", &mime_type_for_message_type("google.protobuf.Empty"), &[])
            .unwrap_err();
        assert!(matches!(err, EvalError::Schema(SchemaError::Unsupported(_))));
        assert_eq!(err.to_string(), "unsupported artifact type: google.protobuf.Empty");
    }

    #[test]
    fn test_invalid_mime_type() {
        let err = Evaluator::default().evaluate("1", "text/plain", &[]).unwrap_err();
        assert!(matches!(err, EvalError::InvalidMimeType(_)));
    }

    #[test]
    fn test_expression_failure_is_wrapped() {
        let err = Evaluator::default()
            .evaluate("files[3]", &mime_type_for_message_type(LINT_TYPE), &lint_contents())
            .unwrap_err();
        assert!(matches!(err, EvalError::Expression { .. }));
    }

    #[test]
    fn test_evaluate_with_env() {
        let env = BTreeMap::from([
            ("numErrors".to_string(), Value::Int(2)),
            ("numOperations".to_string(), Value::Int(4)),
        ]);
        let value = Evaluator::default()
            .evaluate_with_env("double(numErrors)/double(numOperations)", &env)
            .unwrap();
        assert_eq!(value, ScoreValue::Double(0.5));
    }
}
