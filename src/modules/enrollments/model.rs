use registrar_models::{CourseCode, DropResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::service::{DropReceipt, EligibilityReport};

impl From<DropReceipt> for DropResponse {
    fn from(receipt: DropReceipt) -> Self {
        Self {
            message: "Enrollment dropped".to_string(),
            section_id: receipt.section_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EligibilityResponse {
    pub course_code: CourseCode,
    pub eligible: bool,
    /// Prerequisites without a passing grade
    pub missing: Vec<CourseCode>,
}

impl From<EligibilityReport> for EligibilityResponse {
    fn from(report: EligibilityReport) -> Self {
        Self {
            eligible: report.is_eligible(),
            course_code: report.course_code,
            missing: report.missing,
        }
    }
}
