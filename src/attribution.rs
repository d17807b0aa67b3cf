//! Resolution of a visit to the one employee responsible for it.
//!
//! `field_staff_id` wins unconditionally; `lab_assistant_id` is only
//! consulted when no field staff id is present. The two are never combined.

/// Outcome of resolving a visit's two candidate employee references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribution {
    FieldStaff(String),
    LabAssistant(String),
    Unattributed,
}

impl Attribution {
    /// Applies the priority rule. Blank ids count as absent.
    pub fn resolve(field_staff_id: Option<&str>, lab_assistant_id: Option<&str>) -> Self {
        match (present(field_staff_id), present(lab_assistant_id)) {
            (Some(id), _) => Attribution::FieldStaff(id.to_string()),
            (None, Some(id)) => Attribution::LabAssistant(id.to_string()),
            (None, None) => Attribution::Unattributed,
        }
    }

    pub fn employee_id(&self) -> Option<&str> {
        match self {
            Attribution::FieldStaff(id) | Attribution::LabAssistant(id) => Some(id),
            Attribution::Unattributed => None,
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            Attribution::FieldStaff(_) => "field_staff",
            Attribution::LabAssistant(_) => "lab_assistant",
            Attribution::Unattributed => "unattributed",
        }
    }

    pub fn is_attributed(&self) -> bool {
        !matches!(self, Attribution::Unattributed)
    }
}

fn present(id: Option<&str>) -> Option<&str> {
    id.map(str::trim).filter(|s| !s.is_empty())
}
