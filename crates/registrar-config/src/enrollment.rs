//! Enrollment policy settings.
//!
//! # Environment Variables
//!
//! - `ENROLLMENT_FAILING_GRADES`: comma separated grades that do not satisfy a
//!   prerequisite (default: `F`)
//! - `ENROLLMENT_CHARGE_FEE`: create a pending payment with each enrollment (default: true)
//! - `ENROLLMENT_FEE_CENTS`: amount of that payment in cents (default: 50000)

use std::env;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnrollmentPolicy {
    /// Grades that count as "not passed". Any other non-null grade passes.
    pub failing_grades: Vec<String>,
    pub charge_fee: bool,
    pub fee_cents: i64,
}

impl Default for EnrollmentPolicy {
    fn default() -> Self {
        Self {
            failing_grades: vec!["F".to_string()],
            charge_fee: true,
            fee_cents: 50_000,
        }
    }
}

impl EnrollmentPolicy {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let failing_grades = env::var("ENROLLMENT_FAILING_GRADES")
            .ok()
            .map(|v| parse_grade_list(&v))
            .filter(|grades| !grades.is_empty())
            .unwrap_or(defaults.failing_grades);

        Self {
            failing_grades,
            charge_fee: env::var("ENROLLMENT_CHARGE_FEE")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(defaults.charge_fee),
            fee_cents: env::var("ENROLLMENT_FEE_CENTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|cents: &i64| *cents >= 0)
                .unwrap_or(defaults.fee_cents),
        }
    }

    /// Returns true when `grade` satisfies a prerequisite under this policy.
    pub fn is_passing(&self, grade: &str) -> bool {
        let grade = grade.trim();
        !grade.is_empty()
            && !self
                .failing_grades
                .iter()
                .any(|failing| failing.eq_ignore_ascii_case(grade))
    }
}

fn parse_grade_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}
