//! Registration-form schemas: questions, their stored encoding, and
//! synchronization with the remote form table.

pub mod codec;
mod question;
mod schema;
mod sync;

pub use question::{DataType, Question, QuestionId};
pub use schema::FormSchema;
pub use sync::{QuestionFailure, SaveReport, SchemaSynchronizer};
