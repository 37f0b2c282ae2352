use abroadly_config::EmailConfig;
use abroadly_core::AppError;
use chrono::{DateTime, Utc};
use lettre::message::{MultiPart, SinglePart, header};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{instrument, warn};

/// Details rendered into a booking confirmation.
#[derive(Debug, Clone)]
pub struct BookingEmail {
    pub student_name: String,
    pub student_email: String,
    pub consultant_name: String,
    pub starts_at: DateTime<Utc>,
    pub mode: String,
    pub awaiting_payment: bool,
}

pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Sends the booking confirmation in the background. Failures are logged
    /// and never surface to the caller. Does nothing when SMTP is disabled.
    pub fn spawn_booking_confirmation(config: EmailConfig, booking: BookingEmail) {
        if !config.enabled {
            return;
        }

        tokio::spawn(async move {
            let service = EmailService::new(config);
            if let Err(e) = service.send_booking_confirmation(&booking).await {
                warn!(error = %e.error, to = %booking.student_email, "Failed to send booking confirmation");
            }
        });
    }

    #[instrument(skip(self, booking), fields(to = %booking.student_email))]
    pub async fn send_booking_confirmation(&self, booking: &BookingEmail) -> Result<(), AppError> {
        let when = booking.starts_at.format("%A %d %B %Y, %H:%M UTC").to_string();
        let next_step = if booking.awaiting_payment {
            "Your slot is held. Complete the payment to confirm it."
        } else {
            "Your appointment is confirmed."
        };
        let link = format!("{}/appointments", self.config.frontend_url);

        let text_body = format!(
            "Hi {},\n\n\
             You booked a {} session with {} on {}.\n\n\
             {}\n\n\
             Manage your appointments: {}\n\n\
             Abroadly Team",
            booking.student_name, booking.mode, booking.consultant_name, when, next_step, link
        );
        let html_body = booking_template(booking, &when, next_step, &link);

        self.send_email(
            &booking.student_email,
            "Your consultation booking",
            &text_body,
            &html_body,
        )
        .await
    }

    #[instrument(skip(self, html_body, text_body))]
    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), AppError> {
        let email = Message::builder()
            .from(
                self.config
                    .from_mailbox()
                    .parse()
                    .map_err(|e| AppError::internal_error(format!("Invalid from email: {}", e)))?,
            )
            .to(to_email
                .parse()
                .map_err(|e| AppError::internal_error(format!("Invalid to email: {}", e)))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )
            .map_err(|e| AppError::internal_error(format!("Failed to build email: {}", e)))?;

        let mailer = if self.config.smtp_username.is_empty() {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
                .port(self.config.smtp_port)
                .build()
        } else {
            let creds = Credentials::new(
                self.config.smtp_username.clone(),
                self.config.smtp_password.clone(),
            );

            SmtpTransport::relay(&self.config.smtp_host)
                .map_err(|e| {
                    AppError::internal_error(format!("Failed to create SMTP relay: {}", e))
                })?
                .port(self.config.smtp_port)
                .credentials(creds)
                .build()
        };

        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::internal_error(format!("Task join error: {}", e)))?
            .map_err(|e| AppError::internal_error(format!("Failed to send email: {}", e)))?;

        Ok(())
    }
}

fn booking_template(booking: &BookingEmail, when: &str, next_step: &str, link: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Your consultation booking</title>
</head>
<body style="margin: 0; padding: 20px; font-family: Arial, sans-serif; background-color: #f4f4f4;">
    <table width="600" align="center" cellpadding="0" cellspacing="0" style="background-color: #ffffff; border-radius: 8px;">
        <tr>
            <td style="background-color: #0F766E; padding: 24px; text-align: center;">
                <h1 style="margin: 0; color: #ffffff; font-size: 26px;">Abroadly</h1>
            </td>
        </tr>
        <tr>
            <td style="padding: 32px; color: #444444; font-size: 16px; line-height: 1.5;">
                <p>Hi <strong>{student}</strong>,</p>
                <p>You booked a <strong>{mode}</strong> session with <strong>{consultant}</strong> on <strong>{when}</strong>.</p>
                <p>{next_step}</p>
                <p style="text-align: center; margin: 28px 0;">
                    <a href="{link}" style="padding: 12px 32px; background-color: #0F766E; color: #ffffff; text-decoration: none; border-radius: 6px;">View appointments</a>
                </p>
            </td>
        </tr>
        <tr>
            <td style="padding: 16px; text-align: center; color: #999999; font-size: 12px; border-top: 1px solid #eeeeee;">
                This is an automated email from Abroadly. Please do not reply.
            </td>
        </tr>
    </table>
</body>
</html>"#,
        student = booking.student_name,
        mode = booking.mode,
        consultant = booking.consultant_name,
        when = when,
        next_step = next_step,
        link = link,
    )
}
