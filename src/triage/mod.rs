//! Two-pass issue triage orchestration.
//!
//! The pipeline runs five ordered stages over one issue:
//!
//! 1. **Config fetch** - shallow-clone the repository and read its optional
//!    triage configuration (the only fail-hard stage)
//! 2. **Duplicate check** - LLM-scored similarity against recent open issues
//! 3. **Librarian pass** - identify the files relevant to the issue
//! 4. **Surgeon pass** - deep classification over the librarian's files
//! 5. **Label application** - derive and attach labels from stage outcomes
//!
//! Stages 2-5 fail soft: a failure is recorded in the result and the pipeline
//! continues with that stage's contribution empty. Whatever happened, one
//! consolidated comment is posted at the end.

pub mod comment;
pub mod injection;
pub mod labels;
pub mod orchestrator;
pub mod repo_config;
pub mod result;

pub use orchestrator::{IssueTriager, TriageError};
pub use result::{
    AppliedLabels, DuplicateCandidate, DuplicateReport, IssueType, LibrarianReport, Severity,
    StageOutcome, SurgeonReport, TriageResult,
};
