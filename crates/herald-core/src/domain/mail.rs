//! Mail model: outgoing messages and the request shapes of the salary-slip flows.

use serde::{Deserialize, Serialize};

use super::records::string_or_number;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// One email as handed to the mail relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub attachments: Vec<MailAttachment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailAttachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

/// Attachment as sent by clients: base64 content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedAttachment {
    pub filename: String,
    pub base64: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

/// `send_salary_slip` request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalarySlipRequest {
    #[serde(default)]
    pub employee_email: String,
    #[serde(default)]
    pub employee_name: String,
    #[serde(default)]
    pub pdf_base64: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub month: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub year: Option<String>,
}

/// One entry of a bulk salary-slip request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeSlip {
    #[serde(default)]
    pub employee_email: String,
    #[serde(default)]
    pub employee_name: String,
    #[serde(default)]
    pub pdf_base64: String,
}

/// `send_bulk_salary_slips` request. `employees` must be present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSlipRequest {
    #[serde(default)]
    pub employees: Option<Vec<EmployeeSlip>>,
}

/// `send_custom_email` request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomEmailRequest {
    /// Absent is invalid; an empty list sends nothing.
    #[serde(default)]
    pub recipients: Option<Vec<String>>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub html_body: String,
    #[serde(default)]
    pub attachments: Vec<EncodedAttachment>,
}

/// `settings/salarySlipFormat` overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlipFormat {
    #[serde(default)]
    pub email_subject: Option<String>,
    #[serde(default)]
    pub email_body: Option<String>,
}

impl SlipFormat {
    pub const SETTINGS_KEY: &'static str = "salarySlipFormat";

    pub fn subject(&self, month: &str, year: &str) -> String {
        match self.email_subject.as_deref().filter(|s| !s.is_empty()) {
            Some(subject) => subject.to_string(),
            None => format!("Salary Slip - {month}/{year}"),
        }
    }

    /// The single-send body mentions HR; the bulk body does not.
    pub fn body(&self, employee_name: &str, with_contact_line: bool) -> String {
        if let Some(body) = self.email_body.as_deref().filter(|s| !s.is_empty()) {
            return body.to_string();
        }
        let contact = if with_contact_line {
            "<p>If you have any questions, please contact HR.</p>"
        } else {
            ""
        };
        format!(
            "<p>Dear {employee_name},</p><p>Please find your monthly salary slip attached.</p>{contact}<p>Best regards,<br>HR Department</p>"
        )
    }
}

pub fn slip_filename(month: &str, year: &str) -> String {
    format!("Salary_Slip_{month}_{year}.pdf")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_subject_and_filename_use_period() {
        let format = SlipFormat::default();
        assert_eq!(format.subject("3", "2025"), "Salary Slip - 3/2025");
        assert_eq!(slip_filename("3", "2025"), "Salary_Slip_3_2025.pdf");
    }

    #[test]
    fn configured_subject_and_body_override_defaults() {
        let format = SlipFormat {
            email_subject: Some("Your payslip".into()),
            email_body: Some("<p>Attached.</p>".into()),
        };
        assert_eq!(format.subject("3", "2025"), "Your payslip");
        assert_eq!(format.body("Asha", true), "<p>Attached.</p>");
    }

    #[test]
    fn default_body_greets_employee() {
        let body = SlipFormat::default().body("Asha", true);
        assert!(body.starts_with("<p>Dear Asha,</p>"));
        assert!(body.contains("contact HR"));
        assert!(!SlipFormat::default().body("Asha", false).contains("contact HR"));
    }

    #[test]
    fn slip_request_reads_numeric_month() {
        let req: SalarySlipRequest = serde_json::from_value(serde_json::json!({
            "employeeEmail": "a@example.com",
            "employeeName": "A",
            "pdfBase64": "JVBERi0=",
            "month": 4,
            "year": 2025,
        }))
        .unwrap();
        assert_eq!(req.month.as_deref(), Some("4"));
        assert_eq!(req.year.as_deref(), Some("2025"));
    }

    #[test]
    fn custom_email_distinguishes_absent_and_empty_recipients() {
        let absent: CustomEmailRequest =
            serde_json::from_value(serde_json::json!({"subject": "s", "htmlBody": "b"})).unwrap();
        assert_eq!(absent.recipients, None);

        let empty: CustomEmailRequest =
            serde_json::from_value(serde_json::json!({"recipients": [], "subject": "s"})).unwrap();
        assert_eq!(empty.recipients, Some(Vec::new()));
    }
}
