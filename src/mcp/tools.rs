//! Tool registry.
//!
//! The catalogue of tools exposed through `tools/list`. Each tool declares a
//! JSON Schema for its arguments; the same schema drives argument validation
//! in the dispatcher, so what a client is told is exactly what is enforced.

use std::sync::OnceLock;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// The tools known to this server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    /// List every student.
    ListStudents,
    /// Look up one student by name.
    GetStudentByName,
    /// Grades of one student.
    GetStudentGrades,
    /// Grades of every student for one subject.
    GetSubjectGrades,
    /// Mean grade of one student.
    CalculateStudentAverage,
    /// Insert a new student.
    AddStudent,
}

impl ToolName {
    /// All tools, in registry order.
    pub const ALL: [Self; 6] = [
        Self::ListStudents,
        Self::GetStudentByName,
        Self::GetStudentGrades,
        Self::GetSubjectGrades,
        Self::CalculateStudentAverage,
        Self::AddStudent,
    ];

    /// The wire name of the tool.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ListStudents => "list_students",
            Self::GetStudentByName => "get_student_by_name",
            Self::GetStudentGrades => "get_student_grades",
            Self::GetSubjectGrades => "get_subject_grades",
            Self::CalculateStudentAverage => "calculate_student_average",
            Self::AddStudent => "add_student",
        }
    }

    /// Resolves a wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.as_str() == name)
    }

    /// The registry entry for this tool.
    #[must_use]
    pub fn definition(self) -> &'static ToolDefinition {
        // Registry order matches `ALL`.
        &registry()[self as usize]
    }
}

/// JSON types a tool property may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    /// A JSON string.
    String,
    /// A JSON object.
    Object,
}

impl PropertyType {
    /// Returns `true` if `value` has this JSON type.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Object => value.is_object(),
        }
    }

    /// Lowercase type name as used in JSON Schema.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Object => "object",
        }
    }
}

/// Schema of one tool property.
#[derive(Debug, Clone, Serialize)]
pub struct PropertySchema {
    /// Declared JSON type.
    #[serde(rename = "type")]
    pub kind: PropertyType,
    /// Human-readable description for the calling agent.
    pub description: &'static str,
}

/// JSON Schema of a tool's `arguments` object.
#[derive(Debug, Clone, Serialize)]
pub struct InputSchema {
    #[serde(rename = "type")]
    kind: &'static str,
    /// Declared properties, in display order.
    pub properties: IndexMap<&'static str, PropertySchema>,
    /// Names of the properties a call must supply.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<&'static str>,
}

impl InputSchema {
    fn object() -> Self {
        Self {
            kind: "object",
            properties: IndexMap::new(),
            required: Vec::new(),
        }
    }

    fn with_required(
        mut self,
        name: &'static str,
        kind: PropertyType,
        description: &'static str,
    ) -> Self {
        self.properties.insert(name, PropertySchema { kind, description });
        self.required.push(name);
        self
    }

    /// Iterates over required properties with their declared types.
    pub fn required_properties(
        &self,
    ) -> impl Iterator<Item = (&'static str, PropertyType)> + '_ {
        self.required
            .iter()
            .filter_map(|name| self.properties.get(name).map(|p| (*name, p.kind)))
    }
}

/// A tool definition for tools/list response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: &'static str,
    /// Human-readable description.
    pub description: &'static str,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: InputSchema,
}

/// Returns the tool catalogue. Built once, identical for the whole process.
#[must_use]
pub fn registry() -> &'static [ToolDefinition] {
    static REGISTRY: OnceLock<Vec<ToolDefinition>> = OnceLock::new();
    REGISTRY.get_or_init(|| ToolName::ALL.into_iter().map(build_definition).collect())
}

fn build_definition(tool: ToolName) -> ToolDefinition {
    let (description, input_schema) = match tool {
        ToolName::ListStudents => (
            "List every student in the database with their grades.",
            InputSchema::object(),
        ),
        ToolName::GetStudentByName => (
            "Find a student by name.",
            InputSchema::object().with_required(
                "name",
                PropertyType::String,
                "Name of the student to look up",
            ),
        ),
        ToolName::GetStudentGrades => (
            "Get all grades of a specific student.",
            InputSchema::object().with_required(
                "name",
                PropertyType::String,
                "Name of the student",
            ),
        ),
        ToolName::GetSubjectGrades => (
            "Get every student's grade for a specific subject. \
             Students without that subject are omitted.",
            InputSchema::object().with_required(
                "subject",
                PropertyType::String,
                "Name of the subject",
            ),
        ),
        ToolName::CalculateStudentAverage => (
            "Calculate the average grade of a student.",
            InputSchema::object().with_required(
                "name",
                PropertyType::String,
                "Name of the student",
            ),
        ),
        ToolName::AddStudent => (
            "Add a new student to the database.",
            InputSchema::object()
                .with_required("name", PropertyType::String, "Name of the student")
                .with_required(
                    "subjects",
                    PropertyType::Object,
                    "Subjects and grades of the student \
                     (format: {\"math\": 8.5, \"history\": \"9.0\"}). \
                     Grades may be numbers or numeric strings.",
                ),
        ),
    };

    ToolDefinition {
        name: tool.as_str(),
        description,
        input_schema,
    }
}
