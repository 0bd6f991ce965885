use std::fmt;

use serde::{Deserialize, Serialize};

/// Answer type of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DataType {
    #[default]
    Text,
    Number,
    DecimalNumber,
    Date,
    DateTime,
    Boolean,
    SingleChoice,
    MultipleChoice,
}

impl DataType {
    pub const ALL: [DataType; 8] = [
        DataType::Text,
        DataType::Number,
        DataType::DecimalNumber,
        DataType::Date,
        DataType::DateTime,
        DataType::Boolean,
        DataType::SingleChoice,
        DataType::MultipleChoice,
    ];

    /// Label shown to hosts.
    pub fn label(self) -> &'static str {
        match self {
            DataType::Text => "Text",
            DataType::Number => "Number",
            DataType::DecimalNumber => "Decimal number",
            DataType::Date => "Date",
            DataType::DateTime => "Date and time",
            DataType::Boolean => "True/false",
            DataType::SingleChoice => "Single choice",
            DataType::MultipleChoice => "Multiple choice",
        }
    }

    /// Code stored in the `type` column.
    pub fn code(self) -> &'static str {
        match self {
            DataType::Text => "text",
            DataType::Number => "number",
            DataType::DecimalNumber => "float",
            DataType::Date => "date",
            DataType::DateTime => "datetime",
            DataType::Boolean => "boolean",
            DataType::SingleChoice => "single_choice",
            DataType::MultipleChoice => "multiple_choice",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.label() == label)
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    /// Choice types are the only ones whose options get persisted.
    pub fn is_choice(self) -> bool {
        matches!(self, DataType::SingleChoice | DataType::MultipleChoice)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Session-local question handle. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuestionId(pub(crate) u32);

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "question_{}", self.0)
    }
}

/// One field of a registration form.
///
/// `id` and `rank` are owned by the enclosing [`FormSchema`](super::FormSchema);
/// everything else is freely editable.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    id: QuestionId,
    pub(crate) rank: usize,
    pub label: String,
    pub data_type: DataType,
    pub required: bool,
    pub options: Vec<String>,
}

impl Question {
    pub(crate) fn new(id: QuestionId, rank: usize) -> Self {
        Question {
            id,
            rank,
            label: String::new(),
            data_type: DataType::Text,
            required: false,
            options: Vec::new(),
        }
    }

    pub fn id(&self) -> QuestionId {
        self.id
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Options as they would be saved: only choice questions carry any.
    pub fn persisted_options(&self) -> Option<&[String]> {
        self.data_type.is_choice().then_some(self.options.as_slice())
    }
}
