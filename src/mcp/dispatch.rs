//! Tool call dispatch.
//!
//! A `tools/call` request arrives as a tool name plus an untyped argument map.
//! Dispatch happens in two steps:
//!
//! 1. [`ToolCall::from_arguments`] checks the map against the tool's declared
//!    schema and converts it into a typed call. No store access happens here.
//! 2. [`Dispatcher::execute`] runs the typed call against the record store.
//!
//! Failures are reported as [`DispatchError`], which knows its JSON-RPC code.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::mcp::protocol::{ErrorCode, JsonRpcErrorData};
use crate::mcp::tools::ToolName;
use crate::store::{NewStudent, RecordStore, StoreError, Student};

/// Why a grade value was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GradeError {
    /// The value is neither a number nor a string.
    #[error("expected a number or numeric string, got {0}")]
    WrongType(&'static str),

    /// The string does not parse as a decimal number.
    #[error("'{0}' is not a number")]
    NotNumeric(String),

    /// The value is NaN or infinite.
    #[error("grade must be a finite number")]
    NotFinite,
}

/// A grade as supplied by a caller: a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq)]
pub enum GradeValue {
    /// A JSON number.
    Number(f64),
    /// A string expected to hold a decimal number.
    NumericString(String),
}

impl GradeValue {
    /// Classifies a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`GradeError::WrongType`] for anything but numbers and strings.
    pub fn from_json(value: &Value) -> Result<Self, GradeError> {
        match value {
            Value::Number(n) => n
                .as_f64()
                .map(Self::Number)
                .ok_or(GradeError::NotFinite),
            Value::String(s) => Ok(Self::NumericString(s.clone())),
            other => Err(GradeError::WrongType(json_type(other))),
        }
    }

    /// Converts to the canonical numeric grade.
    ///
    /// # Errors
    ///
    /// Returns an error if a string does not parse or the result is not finite.
    pub fn to_grade(&self) -> Result<f64, GradeError> {
        let grade = match self {
            Self::Number(n) => *n,
            Self::NumericString(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| GradeError::NotNumeric(s.clone()))?,
        };

        if grade.is_finite() {
            Ok(grade)
        } else {
            Err(GradeError::NotFinite)
        }
    }
}

const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Errors produced while dispatching a tool call.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No tool with this name exists.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// A required argument is absent or has the wrong JSON type.
    #[error("required parameter '{name}' is missing or not a {expected}")]
    MissingParameter {
        /// Argument name.
        name: &'static str,
        /// Declared JSON type.
        expected: &'static str,
    },

    /// A student name was empty.
    #[error("parameter 'name' must not be empty")]
    EmptyName,

    /// A subject grade could not be converted.
    #[error("invalid grade for subject '{subject}': {source}")]
    InvalidGrade {
        /// The offending subject.
        subject: String,
        /// What was wrong with the value.
        #[source]
        source: GradeError,
    },

    /// No student matched the requested name.
    #[error("student '{0}' not found")]
    StudentNotFound(String),

    /// The record store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DispatchError {
    /// The JSON-RPC error code for this failure.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownTool(_)
            | Self::MissingParameter { .. }
            | Self::EmptyName
            | Self::InvalidGrade { .. } => ErrorCode::InvalidParams,
            Self::StudentNotFound(_) | Self::Store(_) => ErrorCode::InternalError,
        }
    }

    /// Machine-readable failure category, reported in the error `data`.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UnknownTool(_) => "unknown_tool",
            Self::MissingParameter { .. } | Self::EmptyName | Self::InvalidGrade { .. } => {
                "validation"
            }
            Self::StudentNotFound(_) => "not_found",
            Self::Store(_) => "store",
        }
    }
}

impl From<&DispatchError> for JsonRpcErrorData {
    fn from(err: &DispatchError) -> Self {
        Self::with_message(err.code(), err.to_string())
            .with_data(json!({ "kind": err.kind() }))
    }
}

/// A validated tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    /// `list_students`
    ListStudents,
    /// `get_student_by_name`
    GetStudentByName {
        /// Student name.
        name: String,
    },
    /// `get_student_grades`
    GetStudentGrades {
        /// Student name.
        name: String,
    },
    /// `get_subject_grades`
    GetSubjectGrades {
        /// Subject key, matched verbatim.
        subject: String,
    },
    /// `calculate_student_average`
    CalculateStudentAverage {
        /// Student name.
        name: String,
    },
    /// `add_student`, with every grade already converted.
    AddStudent(NewStudent),
}

impl ToolCall {
    /// Validates `arguments` against the schema of `tool` and builds the call.
    ///
    /// # Errors
    ///
    /// Returns a validation error for missing or mistyped arguments, an empty
    /// student name, or the first subject whose grade cannot be converted.
    pub fn from_arguments(
        tool: ToolName,
        arguments: &Map<String, Value>,
    ) -> Result<Self, DispatchError> {
        let schema = &tool.definition().input_schema;
        for (name, kind) in schema.required_properties() {
            if !arguments.get(name).is_some_and(|v| kind.matches(v)) {
                return Err(DispatchError::MissingParameter {
                    name,
                    expected: kind.as_str(),
                });
            }
        }

        let string = |key: &str| {
            arguments
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_default()
        };

        let call = match tool {
            ToolName::ListStudents => Self::ListStudents,
            ToolName::GetStudentByName => Self::GetStudentByName {
                name: string("name"),
            },
            ToolName::GetStudentGrades => Self::GetStudentGrades {
                name: string("name"),
            },
            ToolName::GetSubjectGrades => Self::GetSubjectGrades {
                subject: string("subject"),
            },
            ToolName::CalculateStudentAverage => Self::CalculateStudentAverage {
                name: string("name"),
            },
            ToolName::AddStudent => {
                let name = string("name");
                if name.trim().is_empty() {
                    return Err(DispatchError::EmptyName);
                }
                let subjects = arguments
                    .get("subjects")
                    .and_then(Value::as_object)
                    .map(convert_subjects)
                    .transpose()?
                    .unwrap_or_default();
                Self::AddStudent(NewStudent::new(name, subjects))
            }
        };

        Ok(call)
    }
}

/// Converts every grade, in caller order, stopping at the first bad one.
fn convert_subjects(raw: &Map<String, Value>) -> Result<IndexMap<String, f64>, DispatchError> {
    raw.iter()
        .map(|(subject, value)| {
            GradeValue::from_json(value)
                .and_then(|grade| grade.to_grade())
                .map(|grade| (subject.clone(), grade))
                .map_err(|source| DispatchError::InvalidGrade {
                    subject: subject.clone(),
                    source,
                })
        })
        .collect()
}

/// Runs tool calls against a shared record store.
///
/// Cloning is cheap; every clone shares the same store.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<dyn RecordStore>,
}

impl Dispatcher {
    /// Creates a dispatcher over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Resolves, validates and runs one tool call.
    ///
    /// # Errors
    ///
    /// See [`DispatchError`]. Validation always completes before the store is
    /// touched.
    pub fn dispatch(
        &self,
        tool: &str,
        arguments: &Map<String, Value>,
    ) -> Result<Value, DispatchError> {
        let tool = ToolName::from_name(tool)
            .ok_or_else(|| DispatchError::UnknownTool(tool.to_string()))?;
        let call = ToolCall::from_arguments(tool, arguments)?;
        self.execute(call)
    }

    /// Runs a validated call.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::StudentNotFound`] for name lookups without a
    /// match, and [`DispatchError::Store`] for any store failure.
    pub fn execute(&self, call: ToolCall) -> Result<Value, DispatchError> {
        match call {
            ToolCall::ListStudents => Ok(json!(self.store.find_all()?)),

            ToolCall::GetStudentByName { name } => {
                let student = self.require_student(&name)?;
                Ok(json!(student))
            }

            ToolCall::GetStudentGrades { name } => {
                let student = self.require_student(&name)?;
                Ok(json!({
                    "student": name,
                    "grades": student.subjects,
                }))
            }

            ToolCall::GetSubjectGrades { subject } => {
                let grades: Vec<Value> = self
                    .store
                    .find_all()?
                    .into_iter()
                    .filter_map(|student| {
                        student.subjects.get(&subject).map(|grade| {
                            json!({
                                "student": student.name,
                                "grade": grade,
                            })
                        })
                    })
                    .collect();

                Ok(json!({
                    "subject": subject,
                    "grades": grades,
                }))
            }

            ToolCall::CalculateStudentAverage { name } => {
                let student = self.require_student(&name)?;
                Ok(student.average().map_or_else(
                    || {
                        json!({
                            "student": name,
                            "average": 0,
                            "message": "No grades recorded",
                        })
                    },
                    |average| {
                        json!({
                            "student": name,
                            "average": average,
                            "total_grades": student.subjects.len(),
                        })
                    },
                ))
            }

            ToolCall::AddStudent(student) => {
                let name = student.name.clone();
                let subjects = student.subjects.clone();
                let id = self.store.insert(student)?;
                tracing::info!(student = %name, id = %id, "Student added");

                Ok(json!({
                    "message": "Student added successfully",
                    "student_id": id,
                    "name": name,
                    "subjects": subjects,
                }))
            }
        }
    }

    fn require_student(&self, name: &str) -> Result<Student, DispatchError> {
        self.store
            .find_by_name(name)?
            .ok_or_else(|| DispatchError::StudentNotFound(name.to_string()))
    }
}
