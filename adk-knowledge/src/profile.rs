//! Academic profile of the person asking, rendered for the system prompt.

use std::fmt::Write as _;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A degree-audit preview for one student.
///
/// Every field is optional; missing fields are left out of the summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcademicProfile {
    /// Declared major.
    pub major: Option<String>,
    /// Class standing, e.g. `Sophomore`.
    pub classification: Option<String>,
    /// Assigned academic advisor.
    pub advisor: Option<String>,
    /// Standing such as good standing or probation.
    pub academic_standing: Option<String>,
    /// Progress toward graduation as reported by the audit.
    pub graduation_status: Option<String>,
    /// Cumulative GPA.
    pub gpa: Option<f64>,
    /// Credit hours transferred in.
    pub transfer_hours: Option<u32>,
    /// Total credits completed.
    pub total_completed_credits: Option<f64>,
    /// Name of the term in progress, e.g. `Fall 2025`.
    pub current_term: Option<String>,
    /// Credits attempted in the current term.
    pub current_term_credits: Option<f64>,
    /// Course codes registered for the current term.
    pub current_term_courses: Vec<String>,
    /// Past terms, rendered in the order given.
    pub semesters: Vec<SemesterRecord>,
}

/// One completed or in-progress term.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemesterRecord {
    /// Term name.
    pub term: Option<String>,
    /// Credits attempted in the term.
    pub total_credits: Option<f64>,
    /// Courses taken in the term.
    pub courses: Vec<CourseRecord>,
}

/// A course taken in a term. A grade of `IP` means in progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CourseRecord {
    /// Course code, e.g. `COSC 220`.
    #[serde(rename = "course")]
    pub code: Option<String>,
    /// Course title.
    pub title: Option<String>,
    /// Letter grade, or `IP` while in progress.
    pub grade: Option<String>,
}

fn credits(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.1}")).unwrap_or_else(|| "unknown".to_string())
}

impl AcademicProfile {
    /// Render the profile as plain text, trimmed.
    pub fn summary(&self) -> String {
        let mut out = String::new();

        if let Some(major) = &self.major {
            let _ = write!(out, "You are a {major} major");
            if let Some(classification) = &self.classification {
                let _ = write!(out, " ({classification})");
            }
            out.push_str(". ");
        }
        if let Some(advisor) = &self.advisor {
            let _ = write!(out, "Your academic advisor is {advisor}. ");
        }
        if let Some(standing) = &self.academic_standing {
            let _ = write!(out, "Your academic standing is {standing}. ");
        }
        if let Some(status) = &self.graduation_status {
            let _ = write!(out, "Graduation status: {status}. ");
        }
        if let Some(gpa) = self.gpa {
            let _ = write!(out, "Your GPA is {gpa:.3}. ");
        }
        if let Some(hours) = self.transfer_hours {
            let _ = write!(out, "You transferred {hours} credits from previous institutions. ");
        }
        if let Some(completed) = self.total_completed_credits.filter(|c| *c > 0.0) {
            let _ = write!(out, "You have completed {completed:.1} credits here. ");
        }

        if let Some(term) = self.current_term.as_deref().filter(|t| !t.trim().is_empty()) {
            if !self.current_term_courses.is_empty() {
                let _ = write!(out, "\n\nCURRENT SEMESTER ({term}):\n");
                let _ = writeln!(
                    out,
                    "You are currently taking {} credits:",
                    credits(self.current_term_credits)
                );
                for course in &self.current_term_courses {
                    let _ = writeln!(out, "- {course}");
                }
            }
        }

        if !self.semesters.is_empty() {
            out.push_str("\n\nCOMPLETED COURSE HISTORY:\n");
            for semester in &self.semesters {
                let Some(term) = &semester.term else { continue };
                if semester.courses.is_empty() {
                    continue;
                }
                let _ = write!(out, "\n{term} ({} credits):\n", credits(semester.total_credits));
                for course in &semester.courses {
                    let _ = write!(out, "  - {}", course.code.as_deref().unwrap_or("unknown"));
                    if let Some(title) = &course.title {
                        let _ = write!(out, " {title}");
                    }
                    match course.grade.as_deref() {
                        Some(grade) if grade != "IP" => {
                            let _ = write!(out, " (Grade: {grade})");
                        }
                        _ => {}
                    }
                    out.push('\n');
                }
            }
        }

        out.trim().to_string()
    }
}

/// Supplies the profile summary for the person asking, if there is one.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// The rendered summary, or `None` when no profile exists.
    async fn profile_summary(&self) -> Result<Option<String>>;
}

/// A fixed profile summary.
#[derive(Debug, Clone, Default)]
pub struct StaticProfile {
    summary: Option<String>,
}

impl StaticProfile {
    /// Use `profile`'s rendered summary.
    pub fn new(profile: &AcademicProfile) -> Self {
        Self::from_text(profile.summary())
    }

    /// Use pre-rendered text. Blank text counts as no profile.
    pub fn from_text(summary: impl Into<String>) -> Self {
        let summary = summary.into();
        Self { summary: (!summary.trim().is_empty()).then_some(summary) }
    }
}

#[async_trait]
impl ProfileSource for StaticProfile {
    async fn profile_summary(&self) -> Result<Option<String>> {
        Ok(self.summary.clone())
    }
}
