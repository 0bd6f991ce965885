use crate::error::{EventDeskError, EventDeskResult};
use crate::form::{DataType, Question, QuestionId};

/// Ordered list of questions making up one event's registration form.
///
/// The i-th question always has rank `i`: every structural edit ends by
/// renumbering from position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormSchema {
    questions: Vec<Question>,
    next_id: u32,
}

impl FormSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn get(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id() == id)
    }

    /// Label, type, required flag and options are editable through this.
    pub fn question_mut(&mut self, id: QuestionId) -> Option<&mut Question> {
        self.questions.iter_mut().find(|q| q.id() == id)
    }

    /// Append a blank `Text` question.
    pub fn add_question(&mut self) -> QuestionId {
        let id = QuestionId(self.next_id);
        self.next_id += 1;
        self.questions.push(Question::new(id, self.questions.len()));
        id
    }

    /// Append a fully described question.
    pub fn push(
        &mut self,
        label: impl Into<String>,
        data_type: DataType,
        required: bool,
        options: Vec<String>,
    ) -> QuestionId {
        let id = self.add_question();
        if let Some(question) = self.question_mut(id) {
            question.label = label.into();
            question.data_type = data_type;
            question.required = required;
            question.options = options;
        }
        id
    }

    /// Remove a question; unknown IDs are ignored.
    pub fn remove_question(&mut self, id: QuestionId) {
        self.questions.retain(|q| q.id() != id);
        self.renumber();
    }

    pub fn move_up(&mut self, index: usize) {
        if index > 0 && index < self.questions.len() {
            self.questions.swap(index, index - 1);
            self.renumber();
        }
    }

    pub fn move_down(&mut self, index: usize) {
        if index + 1 < self.questions.len() {
            self.questions.swap(index, index + 1);
            self.renumber();
        }
    }

    /// Append an empty option; unknown IDs are ignored.
    pub fn add_option(&mut self, question_id: QuestionId) {
        if let Some(question) = self.question_mut(question_id) {
            question.options.push(String::new());
        }
    }

    pub fn set_option(
        &mut self,
        question_id: QuestionId,
        option_index: usize,
        text: impl Into<String>,
    ) -> EventDeskResult<()> {
        let Some(question) = self.question_mut(question_id) else {
            return Ok(());
        };
        let len = question.options.len();
        let slot = question
            .options
            .get_mut(option_index)
            .ok_or(EventDeskError::IndexOutOfRange {
                index: option_index,
                len,
            })?;
        *slot = text.into();
        Ok(())
    }

    /// Remove an option by index. An out-of-range index is an error and
    /// leaves the options untouched; unknown question IDs are ignored.
    pub fn remove_option(
        &mut self,
        question_id: QuestionId,
        option_index: usize,
    ) -> EventDeskResult<()> {
        let Some(question) = self.question_mut(question_id) else {
            return Ok(());
        };
        if option_index >= question.options.len() {
            return Err(EventDeskError::IndexOutOfRange {
                index: option_index,
                len: question.options.len(),
            });
        }
        question.options.remove(option_index);
        Ok(())
    }

    fn renumber(&mut self) {
        for (rank, question) in self.questions.iter_mut().enumerate() {
            question.rank = rank;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranks(schema: &FormSchema) -> Vec<usize> {
        schema.iter().map(Question::rank).collect()
    }

    fn labels(schema: &FormSchema) -> Vec<&str> {
        schema.iter().map(|q| q.label.as_str()).collect()
    }

    fn abc() -> (FormSchema, Vec<QuestionId>) {
        let mut schema = FormSchema::new();
        let ids = ["a", "b", "c"]
            .into_iter()
            .map(|label| schema.push(label, DataType::Text, false, vec![]))
            .collect();
        (schema, ids)
    }

    #[test]
    fn test_add_question_defaults() {
        let mut schema = FormSchema::new();
        let id = schema.add_question();
        let question = schema.get(id).unwrap();

        assert_eq!(question.label, "");
        assert_eq!(question.data_type, DataType::Text);
        assert!(!question.required);
        assert!(question.options.is_empty());
        assert_eq!(question.rank(), 0);
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut schema = FormSchema::new();
        let first = schema.add_question();
        schema.remove_question(first);
        let second = schema.add_question();
        assert_ne!(first, second);
    }

    #[test]
    fn test_remove_renumbers() {
        let (mut schema, ids) = abc();
        schema.remove_question(ids[0]);

        assert_eq!(labels(&schema), ["b", "c"]);
        assert_eq!(ranks(&schema), [0, 1]);
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let (mut schema, ids) = abc();
        schema.remove_question(ids[1]);
        let before = schema.clone();

        schema.remove_question(ids[1]);
        assert_eq!(schema, before);
    }

    #[test]
    fn test_move_boundaries_are_noops() {
        let (mut schema, _) = abc();
        let before = schema.clone();

        schema.move_up(0);
        schema.move_down(2);
        schema.move_up(17);
        schema.move_down(17);

        assert_eq!(schema, before);
    }

    #[test]
    fn test_moves_swap_neighbours() {
        let (mut schema, _) = abc();

        schema.move_down(0);
        assert_eq!(labels(&schema), ["b", "a", "c"]);

        schema.move_up(2);
        assert_eq!(labels(&schema), ["b", "c", "a"]);
        assert_eq!(ranks(&schema), [0, 1, 2]);
    }

    #[test]
    fn test_ranks_stay_contiguous_under_mixed_edits() {
        let mut schema = FormSchema::new();
        let mut ids = Vec::new();

        for step in 0..40usize {
            match step % 5 {
                0 | 1 => ids.push(schema.add_question()),
                2 => schema.move_up(step % (schema.len() + 1)),
                3 => schema.move_down(step % (schema.len() + 1)),
                _ => {
                    let id = ids.remove(step % ids.len());
                    schema.remove_question(id);
                }
            }
            let expected: Vec<usize> = (0..schema.len()).collect();
            assert_eq!(ranks(&schema), expected, "after step {step}");
        }
    }

    #[test]
    fn test_option_editing() {
        let mut schema = FormSchema::new();
        let id = schema.push("Shirt size", DataType::SingleChoice, true, vec![]);

        schema.add_option(id);
        schema.add_option(id);
        schema.set_option(id, 0, "S").unwrap();
        schema.set_option(id, 1, "M").unwrap();
        assert_eq!(schema.get(id).unwrap().options, ["S", "M"]);

        schema.remove_option(id, 0).unwrap();
        assert_eq!(schema.get(id).unwrap().options, ["M"]);
    }

    #[test]
    fn test_remove_option_out_of_range() {
        let mut schema = FormSchema::new();
        let id = schema.push(
            "Diet",
            DataType::MultipleChoice,
            false,
            vec!["Vegan".into(), "None".into()],
        );

        let result = schema.remove_option(id, 5);

        assert!(matches!(
            result,
            Err(EventDeskError::IndexOutOfRange { index: 5, len: 2 })
        ));
        assert_eq!(schema.get(id).unwrap().options, ["Vegan", "None"]);
    }

    #[test]
    fn test_option_edits_on_unknown_question_are_noops() {
        let (mut schema, ids) = abc();
        schema.remove_question(ids[0]);
        let before = schema.clone();

        schema.add_option(ids[0]);
        schema.remove_option(ids[0], 3).unwrap();
        schema.set_option(ids[0], 0, "x").unwrap();

        assert_eq!(schema, before);
    }
}
