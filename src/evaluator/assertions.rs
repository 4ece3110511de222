// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Keywords that check the instance itself without applying subschemas.

use super::context::EvaluationContext;
use crate::formats;
use crate::graph::KeywordState;
use crate::keyword::KeywordOutcome;
use crate::value::{self, compare_numbers, render};
use core::cmp::Ordering;
use serde_json::Value;

impl<'g, 'v> EvaluationContext<'g, 'v> {
    /// Evaluate an assertion or annotation keyword. Returns `None` for applicators.
    #[inline(never)]
    pub(super) fn assertion(
        &mut self,
        name: &'g str,
        state: &'g KeywordState,
        legacy_integers: bool,
        instance: &'v Value,
    ) -> Option<bool> {
        let valid = match state {
            KeywordState::Type(types) => {
                if types.matches(instance, legacy_integers) {
                    true
                } else {
                    self.fail(name, || {
                        let names: Vec<String> =
                            types.iter().map(|t| format!("\"{}\"", t.name())).collect();
                        if names.len() == 1 {
                            format!("{} is not of type {}", render(instance), names[0])
                        } else {
                            format!("{} is not of types {}", render(instance), names.join(", "))
                        }
                    })
                }
            }
            KeywordState::Enum(options) => {
                if options.iter().any(|option| value::equal(option, instance)) {
                    true
                } else {
                    self.fail(name, || {
                        let options: Vec<String> = options.iter().map(render).collect();
                        format!("{} is not one of [{}]", render(instance), options.join(", "))
                    })
                }
            }
            KeywordState::Const(expected) => {
                value::equal(expected, instance)
                    || self.fail(name, || format!("{} was expected", render(expected)))
            }
            KeywordState::MultipleOf(divisor) => match instance {
                Value::Number(n) if !value::is_multiple_of(n, divisor) => {
                    self.fail(name, || format!("{n} is not a multiple of {divisor}"))
                }
                _ => true,
            },
            KeywordState::Minimum { limit, exclusive } => match instance {
                Value::Number(n) => match (compare_numbers(n, limit), exclusive) {
                    (Ordering::Less, false) => self.fail(name, || {
                        format!("{n} is less than the minimum of {limit}")
                    }),
                    (Ordering::Less | Ordering::Equal, true) => self.fail(name, || {
                        format!("{n} is less than or equal to the minimum of {limit}")
                    }),
                    _ => true,
                },
                _ => true,
            },
            KeywordState::Maximum { limit, exclusive } => match instance {
                Value::Number(n) => match (compare_numbers(n, limit), exclusive) {
                    (Ordering::Greater, false) => self.fail(name, || {
                        format!("{n} is greater than the maximum of {limit}")
                    }),
                    (Ordering::Greater | Ordering::Equal, true) => self.fail(name, || {
                        format!("{n} is greater than or equal to the maximum of {limit}")
                    }),
                    _ => true,
                },
                _ => true,
            },
            KeywordState::MinLength(limit) => match instance {
                Value::String(s) if (s.chars().count() as u64) < *limit => self.fail(name, || {
                    format!(
                        "{} is shorter than {limit} character{}",
                        render(instance),
                        plural(*limit)
                    )
                }),
                _ => true,
            },
            KeywordState::MaxLength(limit) => match instance {
                Value::String(s) if (s.chars().count() as u64) > *limit => self.fail(name, || {
                    format!(
                        "{} is longer than {limit} character{}",
                        render(instance),
                        plural(*limit)
                    )
                }),
                _ => true,
            },
            KeywordState::Pattern { source, regex } => match instance {
                Value::String(s) if !regex.is_match(s) => self.fail(name, || {
                    format!("{} does not match \"{source}\"", render(instance))
                }),
                _ => true,
            },
            KeywordState::MinItems(limit) => match instance {
                Value::Array(items) if (items.len() as u64) < *limit => self.fail(name, || {
                    format!(
                        "{} has less than {limit} item{}",
                        render(instance),
                        plural(*limit)
                    )
                }),
                _ => true,
            },
            KeywordState::MaxItems(limit) => match instance {
                Value::Array(items) if (items.len() as u64) > *limit => self.fail(name, || {
                    format!(
                        "{} has more than {limit} item{}",
                        render(instance),
                        plural(*limit)
                    )
                }),
                _ => true,
            },
            KeywordState::UniqueItems => match instance {
                Value::Array(items) if value::first_duplicate(items).is_some() => {
                    self.fail(name, || format!("{} has non-unique elements", render(instance)))
                }
                _ => true,
            },
            KeywordState::MinProperties(limit) => match instance {
                Value::Object(object) if (object.len() as u64) < *limit => self.fail(name, || {
                    format!(
                        "{} has less than {limit} propert{}",
                        render(instance),
                        if *limit == 1 { "y" } else { "ies" }
                    )
                }),
                _ => true,
            },
            KeywordState::MaxProperties(limit) => match instance {
                Value::Object(object) if (object.len() as u64) > *limit => self.fail(name, || {
                    format!(
                        "{} has more than {limit} propert{}",
                        render(instance),
                        if *limit == 1 { "y" } else { "ies" }
                    )
                }),
                _ => true,
            },
            KeywordState::Required(required) => match instance {
                Value::Object(object) => {
                    let mut valid = true;
                    for property in required {
                        if !object.contains_key(property) {
                            valid = self.fail(name, || {
                                format!("{} is a required property", quote(property))
                            });
                            if !self.exhaustive {
                                break;
                            }
                        }
                    }
                    valid
                }
                _ => true,
            },
            KeywordState::DependentRequired(dependencies) => match instance {
                Value::Object(object) => {
                    let mut valid = true;
                    for (property, required) in dependencies {
                        if !object.contains_key(property) {
                            continue;
                        }
                        for dependency in required {
                            if !object.contains_key(dependency) {
                                valid = self.fail(name, || {
                                    format!(
                                        "{} is a dependency of {}",
                                        quote(dependency),
                                        quote(property)
                                    )
                                });
                                if !self.exhaustive {
                                    return Some(false);
                                }
                            }
                        }
                    }
                    valid
                }
                _ => true,
            },
            KeywordState::Format {
                name: format,
                checker,
                assert,
            } => {
                let mut valid = true;
                if let (Value::String(s), Some(checker), true) = (instance, checker, *assert) {
                    if !checker.check(s) {
                        valid = self.fail(name, || {
                            format!("{} is not a \"{format}\"", render(instance))
                        });
                    }
                }
                if valid {
                    self.annotate(name, || Value::String(format.to_string()));
                }
                valid
            }
            KeywordState::ContentEncoding(encoding) => match instance {
                Value::String(s) if !formats::check_encoding(encoding, s) => self.fail(name, || {
                    format!(
                        "{} is not compliant with \"{encoding}\" content encoding",
                        render(instance)
                    )
                }),
                _ => true,
            },
            KeywordState::ContentMediaType {
                media_type,
                encoding,
            } => match instance {
                Value::String(s)
                    if !formats::check_media_type(media_type, encoding.as_deref(), s) =>
                {
                    self.fail(name, || {
                        format!(
                            "{} is not compliant with \"{media_type}\" media type",
                            render(instance)
                        )
                    })
                }
                _ => true,
            },
            KeywordState::Custom(keyword) => {
                match keyword.evaluate(instance, &self.instance_path.to_pointer()) {
                    KeywordOutcome::Valid { annotation } => {
                        if let Some(annotation) = annotation {
                            self.annotate(name, || annotation);
                        }
                        true
                    }
                    KeywordOutcome::Invalid { message } => self.fail(name, || message),
                }
            }
            KeywordState::Annotation(value) => {
                self.annotate(name, || value.clone());
                true
            }
            _ => return None,
        };
        Some(valid)
    }
}

fn plural(n: u64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// A property name as it appears in messages.
pub(super) fn quote(name: &str) -> String {
    render(&Value::String(name.to_string()))
}
