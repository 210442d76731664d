use ratatui::text::Line;

use crate::db::{Comparison, SortOrder};
use crate::models::Student;

use super::helpers::field_line;

/// Internal representation of the main student form. Values stay raw text
/// until an action parses them.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub(crate) struct StudentForm {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) age: String,
    pub(crate) active: StudentField,
}

/// Fields available within the student form.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum StudentField {
    Id,
    #[default]
    Name,
    Age,
}

impl StudentField {
    pub(crate) const ALL: [StudentField; 3] =
        [StudentField::Id, StudentField::Name, StudentField::Age];

    pub(crate) fn label(self) -> &'static str {
        match self {
            StudentField::Id => "ID",
            StudentField::Name => "Name",
            StudentField::Age => "Age",
        }
    }
}

impl StudentForm {
    /// Copy a stored student into the form, keeping the focused field.
    pub(crate) fn fill_from(&mut self, student: &Student) {
        self.id = student.id.to_string();
        self.name = student.name.clone();
        self.age = student.age.to_string();
    }

    pub(crate) fn clear(&mut self) {
        self.id.clear();
        self.name.clear();
        self.age.clear();
    }

    /// Cycle focus across the three fields.
    pub(crate) fn next_field(&mut self) {
        self.active = match self.active {
            StudentField::Id => StudentField::Name,
            StudentField::Name => StudentField::Age,
            StudentField::Age => StudentField::Id,
        };
    }

    pub(crate) fn previous_field(&mut self) {
        self.active = match self.active {
            StudentField::Id => StudentField::Age,
            StudentField::Name => StudentField::Id,
            StudentField::Age => StudentField::Name,
        };
    }

    /// Insert a character into the active field.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        self.value_mut(self.active).push(ch);
        true
    }

    /// Remove the last character from the active field.
    pub(crate) fn backspace(&mut self) {
        self.value_mut(self.active).pop();
    }

    pub(crate) fn value(&self, field: StudentField) -> &str {
        match field {
            StudentField::Id => &self.id,
            StudentField::Name => &self.name,
            StudentField::Age => &self.age,
        }
    }

    fn value_mut(&mut self, field: StudentField) -> &mut String {
        match field {
            StudentField::Id => &mut self.id,
            StudentField::Name => &mut self.name,
            StudentField::Age => &mut self.age,
        }
    }

    /// Render a single line for the form widget.
    pub(crate) fn build_line(&self, field: StudentField) -> Line<'static> {
        let placeholder = match field {
            StudentField::Id => "<assigned on create>",
            StudentField::Name => "<required>",
            StudentField::Age => "<number>",
        };
        field_line(
            field.label(),
            self.value(field),
            self.active == field,
            placeholder,
        )
    }
}

/// Bounds typed into the age range dialog.
#[derive(Default, Clone, Debug)]
pub(crate) struct RangePrompt {
    pub(crate) min: String,
    pub(crate) max: String,
    pub(crate) editing_max: bool,
}

impl RangePrompt {
    pub(crate) fn toggle_field(&mut self) {
        self.editing_max = !self.editing_max;
    }

    fn active_mut(&mut self) -> &mut String {
        if self.editing_max {
            &mut self.max
        } else {
            &mut self.min
        }
    }

    pub(crate) fn push_char(&mut self, ch: char) {
        if !ch.is_control() {
            self.active_mut().push(ch);
        }
    }

    pub(crate) fn backspace(&mut self) {
        self.active_mut().pop();
    }

    pub(crate) fn lines(&self) -> Vec<Line<'static>> {
        vec![
            field_line("Minimum age", &self.min, !self.editing_max, "<number>"),
            field_line("Maximum age", &self.max, self.editing_max, "<number>"),
        ]
    }
}

/// Comparator plus age for the filter dialog.
#[derive(Clone, Debug)]
pub(crate) struct FilterPrompt {
    pub(crate) comparison: Comparison,
    pub(crate) age: String,
}

impl Default for FilterPrompt {
    fn default() -> Self {
        Self {
            comparison: Comparison::Greater,
            age: String::new(),
        }
    }
}

impl FilterPrompt {
    /// Step through the comparators; `forward` decides the direction.
    pub(crate) fn cycle_comparison(&mut self, forward: bool) {
        let all = Comparison::ALL;
        let idx = all
            .iter()
            .position(|c| *c == self.comparison)
            .unwrap_or_default();
        let next = if forward {
            (idx + 1) % all.len()
        } else {
            (idx + all.len() - 1) % all.len()
        };
        self.comparison = all[next];
    }

    pub(crate) fn push_char(&mut self, ch: char) {
        if !ch.is_control() {
            self.age.push(ch);
        }
    }

    pub(crate) fn backspace(&mut self) {
        self.age.pop();
    }

    pub(crate) fn lines(&self) -> Vec<Line<'static>> {
        let comparison = format!("< {} ({}) >", self.comparison.label(), self.comparison);
        vec![
            field_line("Comparison", &comparison, false, ""),
            field_line("Age", &self.age, true, "<number>"),
        ]
    }
}

/// Signed amount for the bulk age increment.
#[derive(Default, Clone, Debug)]
pub(crate) struct AmountPrompt {
    pub(crate) amount: String,
}

impl AmountPrompt {
    pub(crate) fn push_char(&mut self, ch: char) {
        if !ch.is_control() {
            self.amount.push(ch);
        }
    }

    pub(crate) fn backspace(&mut self) {
        self.amount.pop();
    }
}

/// Highlighted entry in the sort dialog.
#[derive(Default, Clone, Debug)]
pub(crate) struct SortPrompt {
    pub(crate) selected: usize,
}

impl SortPrompt {
    pub(crate) fn move_selection(&mut self, offset: isize) {
        let len = SortOrder::CHOICES.len() as isize;
        let next = (self.selected as isize + offset).clamp(0, len - 1);
        self.selected = next as usize;
    }

    pub(crate) fn choice(&self) -> SortOrder {
        SortOrder::CHOICES[self.selected.min(SortOrder::CHOICES.len() - 1)]
    }
}

/// What a yes/no dialog is guarding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ConfirmAction {
    Delete { id: i64 },
    DeleteAll,
}

impl ConfirmAction {
    pub(crate) fn question(&self) -> String {
        match self {
            ConfirmAction::Delete { id } => format!("Delete the student with ID {id}?"),
            ConfirmAction::DeleteAll => {
                "Delete ALL students? This cannot be undone.".to_string()
            }
        }
    }

    /// Footer text shown when the user answers no.
    pub(crate) fn cancelled(&self) -> String {
        match self {
            ConfirmAction::Delete { id } => format!("Deletion of student {id} cancelled."),
            ConfirmAction::DeleteAll => "Delete all cancelled; no students removed.".to_string(),
        }
    }
}
