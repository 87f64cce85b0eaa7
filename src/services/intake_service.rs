use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;

use super::audit_service::{AuditEntry, AuditWriter};
use crate::error::ApiError;
use crate::validation::FieldErrors;

#[derive(Debug, Deserialize)]
pub struct ContactForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationForm {
    pub program_id: Option<i64>,
    pub cohort_id: Option<i64>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub motivation: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Submitted {
    pub id: i64,
}

/// Public contact and application intake. Submissions are audited with no actor.
pub struct IntakeService {
    pool: PgPool,
}

impl IntakeService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn submit_contact(&self, form: ContactForm) -> Result<Submitted, ApiError> {
        let mut errors = FieldErrors::new();
        let name = errors.required("name", form.name.as_deref(), 120);
        let email = errors.email("email", form.email.as_deref());
        let subject = errors.optional("subject", form.subject.as_deref(), 200);
        let message = errors.required("message", form.message.as_deref(), 5_000);
        errors.into_result()?;

        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO contact_submissions (name, email, subject, message)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(&name)
        .bind(&email)
        .bind(subject.as_deref())
        .bind(&message)
        .fetch_one(&mut *tx)
        .await?;

        let entry = AuditEntry::new(None, "contact.submitted", format!("New contact message from {}", name))
            .entity("contact_submission", id)
            .metadata(json!({ "email": email, "subject": subject }))
            .notify_as("New contact message", subject.unwrap_or_else(|| format!("From {}", name)));
        AuditWriter::record(&mut tx, &entry).await?;

        tx.commit().await?;
        Ok(Submitted { id })
    }

    pub async fn submit_application(&self, form: ApplicationForm) -> Result<Submitted, ApiError> {
        let mut errors = FieldErrors::new();
        let full_name = errors.required("fullName", form.full_name.as_deref(), 120);
        let email = errors.email("email", form.email.as_deref());
        let phone = errors.optional("phone", form.phone.as_deref(), 32);
        let motivation = errors.optional("motivation", form.motivation.as_deref(), 5_000);
        let program_id = match form.program_id {
            Some(id) if id > 0 => id,
            _ => {
                errors.add("programId", "A program must be selected");
                0
            }
        };
        errors.into_result()?;

        let mut tx = self.pool.begin().await?;

        // Unknown program/cohort ids surface as field errors via the FK classifier
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO applications (program_id, cohort_id, full_name, email, phone, motivation)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id",
        )
        .bind(program_id)
        .bind(form.cohort_id)
        .bind(&full_name)
        .bind(&email)
        .bind(phone.as_deref())
        .bind(motivation.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        let entry = AuditEntry::new(
            None,
            "application.submitted",
            format!("{} applied to program #{}", full_name, program_id),
        )
        .entity("application", id)
        .metadata(json!({ "programId": program_id, "cohortId": form.cohort_id, "email": email }))
        .notify_as("New application", format!("{} applied to program #{}", full_name, program_id));
        AuditWriter::record(&mut tx, &entry).await?;

        tx.commit().await?;
        Ok(Submitted { id })
    }
}
