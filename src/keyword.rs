// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Custom keywords.
//!
//! A custom keyword is registered by name on [`ValidationOptions`](crate::ValidationOptions)
//! together with a factory. The compiler calls the factory once per occurrence with the
//! keyword's value; the resulting [`Keyword`] is then evaluated against instances. A custom
//! keyword takes precedence over a built-in keyword of the same name.

use crate::utils::pointer::JsonPointer;
use core::fmt;
use serde_json::Value;
use std::sync::Arc;

/// Result of evaluating a custom keyword.
#[derive(Debug, Clone, PartialEq)]
pub enum KeywordOutcome {
    Valid { annotation: Option<Value> },
    Invalid { message: String },
}

impl KeywordOutcome {
    pub fn valid() -> Self {
        KeywordOutcome::Valid { annotation: None }
    }

    pub fn annotated(annotation: Value) -> Self {
        KeywordOutcome::Valid {
            annotation: Some(annotation),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        KeywordOutcome::Invalid {
            message: message.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, KeywordOutcome::Valid { .. })
    }
}

/// A compiled custom keyword.
pub trait Keyword: Send + Sync + fmt::Debug {
    fn evaluate(&self, instance: &Value, instance_location: &JsonPointer) -> KeywordOutcome;
}

/// Builds a [`Keyword`] from the keyword's value in a schema.
///
/// `location` is the JSON pointer of the value inside its document. Returning `Err` fails
/// compilation with [`CompileError::CustomKeyword`](crate::CompileError::CustomKeyword).
pub trait KeywordFactory: Send + Sync {
    fn compile(&self, value: &Value, location: &str) -> Result<Arc<dyn Keyword>, String>;
}

impl<F> KeywordFactory for F
where
    F: Fn(&Value, &str) -> Result<Arc<dyn Keyword>, String> + Send + Sync,
{
    fn compile(&self, value: &Value, location: &str) -> Result<Arc<dyn Keyword>, String> {
        self(value, location)
    }
}
