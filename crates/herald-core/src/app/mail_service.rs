//! SalarySlipService - 給与明細メールと任意メールの送信、送信ログの参照
//!
//! # 操作
//! - `send_salary_slip`: 1 名に送信、結果を `salarySlipLogs` に 1 件追記
//! - `send_bulk_salary_slips`: 5 件ずつのグループで送信、サマリを `salarySlipBulkLogs` に追記
//! - `send_custom_email`: 全宛先へ並行に送信（宛先ごとのエラーは結果に含めるだけ）
//! - `salary_slip_logs` / `recent_failures`: ログの参照（新しい順）
//!
//! すべて認証済みの呼び出し元が必要です。

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::Datelike;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::domain::mail::{PDF_CONTENT_TYPE, slip_filename};
use crate::domain::{
    BatchResult, BulkSlipRequest, CallError, CustomEmailRequest, DispatchOutcome, EmployeeSlip,
    EncodedAttachment, HeraldError, LogId, LogStatus, MailAttachment, OutgoingMail,
    SalarySlipRequest, SlipFormat, SlipLogRecord,
};
use crate::ports::{Clock, DocumentStore, MailError, MailTransport, StoreError};

use super::auth::CallerContext;
use super::batch::send_batch;
use super::recorder::{DeliveryRecorder, EmailAttempt};
use super::transport::LazyHandle;

pub const LOG_PAGE_SIZE: usize = 100;
pub const RECENT_FAILURES_LIMIT: usize = 10;

const AUTH_REQUIRED: &str = "Authentication required";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlipSentResponse {
    pub success: bool,
    pub message: String,
    pub message_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkSlipResponse {
    pub success: bool,
    pub data: BatchResult,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomEmailResponse {
    pub success: bool,
    pub message: String,
    pub results: Vec<DispatchOutcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlipLogEntry {
    pub id: LogId,
    #[serde(flatten)]
    pub record: SlipLogRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlipLogsResponse {
    pub success: bool,
    pub logs: Vec<SlipLogEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentFailuresResponse {
    pub success: bool,
    pub failed_count: usize,
    pub failed: Vec<SlipLogEntry>,
    pub message: String,
}

pub struct SalarySlipService {
    transport: Arc<LazyHandle<dyn MailTransport>>,
    store: Arc<dyn DocumentStore>,
    recorder: Arc<DeliveryRecorder>,
    clock: Arc<dyn Clock>,
    from: Option<String>,
    batch_width: usize,
}

impl SalarySlipService {
    pub fn new(
        transport: Arc<LazyHandle<dyn MailTransport>>,
        store: Arc<dyn DocumentStore>,
        recorder: Arc<DeliveryRecorder>,
        clock: Arc<dyn Clock>,
        from: Option<String>,
        batch_width: usize,
    ) -> Self {
        Self {
            transport,
            store,
            recorder,
            clock,
            from,
            batch_width,
        }
    }

    pub async fn send_salary_slip(
        &self,
        ctx: &CallerContext,
        req: SalarySlipRequest,
    ) -> Result<SlipSentResponse, CallError> {
        ctx.require_auth("User must be authenticated to send salary slips.")?;
        if [&req.employee_email, &req.employee_name, &req.pdf_base64]
            .iter()
            .any(|field| field.trim().is_empty())
        {
            return Err(CallError::invalid_argument(
                "Missing required fields: employeeEmail, employeeName, pdfBase64",
            ));
        }

        let (current_month, current_year) = self.current_period();
        let month = req.month.clone().unwrap_or(current_month);
        let year = req.year.clone().unwrap_or(current_year);

        let sent = self.try_send_slip(&req, &month, &year).await;
        let outcome = match &sent {
            Ok(message_id) => DispatchOutcome::sent(req.employee_email.as_str(), message_id.as_str()),
            Err(e) => DispatchOutcome::failed(req.employee_email.as_str(), e.failure_kind(), e.to_string()),
        }
        .with_name(req.employee_name.as_str());

        self.recorder
            .record_email(&EmailAttempt {
                employee_email: req.employee_email.clone(),
                employee_name: req.employee_name.clone(),
                month: Some(month.clone()),
                year: Some(year.clone()),
                outcome,
            })
            .await;

        match sent {
            Ok(message_id) => {
                info!(to = %req.employee_email, %month, %year, %message_id, "salary slip sent");
                Ok(SlipSentResponse {
                    success: true,
                    message: format!("Salary slip sent to {}", req.employee_email),
                    message_id,
                })
            }
            Err(e) => {
                error!(to = %req.employee_email, error = %e, kind = ?e.kind(), "salary slip failed");
                Err(CallError::internal(format!("Failed to send email: {e}")))
            }
        }
    }

    async fn try_send_slip(
        &self,
        req: &SalarySlipRequest,
        month: &str,
        year: &str,
    ) -> Result<String, HeraldError> {
        let transport = self.ready_transport()?;
        let from = self.from_address()?;
        let format = self.load_format().await?;
        let pdf = decode_base64(&req.pdf_base64, "pdfBase64")?;

        let mail = OutgoingMail {
            from,
            to: req.employee_email.clone(),
            subject: format.subject(month, year),
            html_body: format.body(&req.employee_name, true),
            attachments: vec![MailAttachment {
                filename: slip_filename(month, year),
                content_type: PDF_CONTENT_TYPE.to_string(),
                content: pdf,
            }],
        };
        Ok(transport.send(&mail).await?)
    }

    pub async fn send_bulk_salary_slips(
        &self,
        ctx: &CallerContext,
        req: BulkSlipRequest,
    ) -> Result<BulkSlipResponse, CallError> {
        ctx.require_auth("User must be authenticated.")?;
        let Some(employees) = req.employees else {
            return Err(CallError::invalid_argument("Invalid employees data"));
        };

        let bulk_failed = |e: HeraldError| {
            error!(error = %e, kind = ?e.kind(), "bulk send aborted");
            CallError::internal(format!("Bulk send failed: {e}"))
        };
        let transport = self.ready_transport().map_err(bulk_failed)?;
        let from = self.from_address().map_err(bulk_failed)?;
        let format = self.load_format().await.map_err(bulk_failed)?;

        let (month, year) = self.current_period();
        let subject = format.subject(&month, &year);
        let filename = slip_filename(&month, &year);
        let total = employees.len();

        let result = send_batch(employees, self.batch_width, |employee: EmployeeSlip| {
            let mail = decode_base64(&employee.pdf_base64, "pdfBase64").map(|pdf| OutgoingMail {
                from: from.clone(),
                to: employee.employee_email.clone(),
                subject: subject.clone(),
                html_body: format.body(&employee.employee_name, false),
                attachments: vec![MailAttachment {
                    filename: filename.clone(),
                    content_type: PDF_CONTENT_TYPE.to_string(),
                    content: pdf,
                }],
            });
            let transport = Arc::clone(transport);
            async move {
                let sent = match mail {
                    Ok(mail) => transport.send(&mail).await.map_err(HeraldError::from),
                    Err(e) => Err(e),
                };
                mail_outcome(&employee.employee_email, &employee.employee_name, sent)
            }
        })
        .await;

        self.recorder.record_bulk(total, &result).await;
        info!(total, sent = result.sent.len(), failed = result.failed.len(), "bulk salary slips done");

        Ok(BulkSlipResponse {
            success: true,
            message: result.summary(),
            data: result,
        })
    }

    pub async fn send_custom_email(
        &self,
        ctx: &CallerContext,
        req: CustomEmailRequest,
    ) -> Result<CustomEmailResponse, CallError> {
        ctx.require_auth(AUTH_REQUIRED)?;
        let Some(recipients) = req.recipients.as_deref() else {
            return Err(CallError::invalid_argument("Missing required fields"));
        };
        if req.subject.trim().is_empty() || req.html_body.trim().is_empty() {
            return Err(CallError::invalid_argument("Missing required fields"));
        }

        let attachments = req
            .attachments
            .iter()
            .map(decode_attachment)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CallError::invalid_argument(e.to_string()))?;

        let failed = |e: HeraldError| CallError::internal(format!("Failed to send emails: {e}"));
        let transport = self.ready_transport().map_err(failed)?;
        let from = self.from_address().map_err(failed)?;

        let sends = recipients.iter().map(|to| {
            let mail = OutgoingMail {
                from: from.clone(),
                to: to.clone(),
                subject: req.subject.clone(),
                html_body: req.html_body.clone(),
                attachments: attachments.clone(),
            };
            async move {
                let sent = transport.send(&mail).await.map_err(HeraldError::from);
                if let Err(e) = &sent {
                    warn!(to = %mail.to, error = %e, "custom email failed");
                }
                mail_outcome(&mail.to, "", sent)
            }
        });
        let results = join_all(sends).await;

        Ok(CustomEmailResponse {
            success: true,
            message: format!("Emails sent to {} recipients", recipients.len()),
            results,
        })
    }

    pub async fn salary_slip_logs(&self, ctx: &CallerContext) -> Result<SlipLogsResponse, CallError> {
        ctx.require_auth(AUTH_REQUIRED)?;
        let logs = self
            .store
            .recent_slip_logs(None, LOG_PAGE_SIZE)
            .await
            .map_err(|e| CallError::internal(format!("Failed to fetch logs: {e}")))?;
        Ok(SlipLogsResponse {
            success: true,
            logs: logs.into_iter().map(|(id, record)| SlipLogEntry { id, record }).collect(),
        })
    }

    /// Lists the most recent failed sends. Nothing is re-sent.
    pub async fn recent_failures(
        &self,
        ctx: &CallerContext,
    ) -> Result<RecentFailuresResponse, CallError> {
        ctx.require_auth(AUTH_REQUIRED)?;
        let failed: Vec<SlipLogEntry> = self
            .store
            .recent_slip_logs(Some(LogStatus::Failed), RECENT_FAILURES_LIMIT)
            .await
            .map_err(|e| CallError::internal(format!("Failed to process resend: {e}")))?
            .into_iter()
            .map(|(id, record)| SlipLogEntry { id, record })
            .collect();
        info!(count = failed.len(), "found failed salary slips");

        Ok(RecentFailuresResponse {
            success: true,
            failed_count: failed.len(),
            failed,
            message: "Retry process initiated".to_string(),
        })
    }

    fn ready_transport(&self) -> Result<&Arc<dyn MailTransport>, HeraldError> {
        self.transport
            .get()
            .map_err(|e| HeraldError::Mail(MailError::Configuration(e.to_string())))
    }

    fn from_address(&self) -> Result<String, HeraldError> {
        self.from.clone().ok_or_else(|| {
            HeraldError::Mail(MailError::Configuration("no sender address configured".to_string()))
        })
    }

    async fn load_format(&self) -> Result<SlipFormat, HeraldError> {
        let Some(value) = self.store.get_setting(SlipFormat::SETTINGS_KEY).await? else {
            return Ok(SlipFormat::default());
        };
        serde_json::from_value(value).map_err(|e| {
            HeraldError::Store(StoreError::Malformed(format!(
                "settings/{}: {e}",
                SlipFormat::SETTINGS_KEY
            )))
        })
    }

    fn current_period(&self) -> (String, String) {
        let now = self.clock.now();
        (now.month().to_string(), now.year().to_string())
    }
}

fn mail_outcome(to: &str, name: &str, sent: Result<String, HeraldError>) -> DispatchOutcome {
    let outcome = match sent {
        Ok(message_id) => DispatchOutcome::sent(to, message_id),
        Err(e) => DispatchOutcome::failed(to, e.failure_kind(), e.to_string()),
    };
    if name.is_empty() {
        outcome
    } else {
        outcome.with_name(name)
    }
}

fn decode_base64(content: &str, field: &str) -> Result<Vec<u8>, HeraldError> {
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|e| HeraldError::Mail(MailError::Build(format!("{field} is not valid base64: {e}"))))
}

fn decode_attachment(attachment: &EncodedAttachment) -> Result<MailAttachment, HeraldError> {
    Ok(MailAttachment {
        filename: attachment.filename.clone(),
        content_type: attachment
            .content_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string()),
        content: decode_base64(&attachment.base64, &attachment.filename)?,
    })
}
