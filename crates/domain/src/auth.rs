//! Request authentication state.
//!
//! Derived once per request by the session collaborator before
//! orchestration begins, and never mutated afterwards. The pipeline
//! itself never reads cookies or session storage.

/// The authenticated customer, as far as the pipeline needs to know.
#[derive(Debug, Clone, PartialEq)]
pub struct Subject {
    pub id: i64,
    pub first_name: String,
}

/// Authentication state for one orchestration run.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    pub subject: Option<Subject>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self { subject: None }
    }

    pub fn authenticated(id: i64, first_name: impl Into<String>) -> Self {
        Self {
            subject: Some(Subject {
                id,
                first_name: first_name.into(),
            }),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.subject.is_some()
    }
}
