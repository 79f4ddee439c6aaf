use mail_builder::MessageBuilder;
use mail_send::SmtpClientBuilder;

use crate::errors::AppError;

const SENDER_NAME: &str = "TaskFlow";
const SMTP_PORT: u16 = 587;

/// Outbound transactional mail over SMTP (STARTTLS).
pub struct Mailer {
    host: String,
    sender: String,
    password: String,
}

impl Mailer {
    pub fn new(host: &str, sender: &str, password: &str) -> Self {
        Self {
            host: host.to_string(),
            sender: sender.to_string(),
            password: password.to_string(),
        }
    }

    pub async fn send_welcome(&self, to: &str, username: &str) -> Result<(), AppError> {
        let html = format!(
            "<p>Hi {username},</p>\
             <p>We're excited to have you on board. With TaskFlow, you'll be able to organize \
             your tasks and boost your productivity seamlessly.</p>\
             <p>If you need any help getting started, feel free to reach out to our support \
             team.</p>\
             <p>&mdash; The TaskFlow Team</p>"
        );
        let text = format!(
            "Hi {username},\n\nWelcome to TaskFlow! We're glad you're here.\n\n\
             Get started organizing your tasks today.\n\n- The TaskFlow Team"
        );
        self.send(to, "Welcome to TaskFlow!", html, text).await
    }

    pub async fn send_reset(&self, to: &str, reset_link: &str) -> Result<(), AppError> {
        let html = format!(
            "<p>Hi,</p>\
             <p>You recently requested to reset your password. Click the link below to \
             proceed:</p>\
             <p><a href='{reset_link}'>Reset Password</a></p>\
             <p>If the link above does not work, copy and paste it into your browser:</p>\
             <p>{reset_link}</p>\
             <p>If you did not request this, you can safely ignore this email.</p>\
             <p>&mdash; The TaskFlow Team</p>"
        );
        let text = format!(
            "Hi,\n\nYou recently requested to reset your password. Open this link to \
             proceed:\n\n{reset_link}\n\nIf you did not request this, you can safely ignore \
             this email.\n\n- The TaskFlow Team"
        );
        self.send(to, "TaskFlow account password reset request", html, text)
            .await
    }

    pub async fn send_password_changed(&self, to: &str) -> Result<(), AppError> {
        let html = "<p>Hi,</p>\
             <p>This is a confirmation that your password has been successfully changed.</p>\
             <p>If you did not perform this action, please contact our support team \
             immediately.</p>\
             <p>&mdash; The TaskFlow Team</p>"
            .to_string();
        let text = "Hi,\n\nYour password has been successfully changed.\n\nIf you didn't do \
             this, please contact support.\n\n- The TaskFlow Team"
            .to_string();
        self.send(
            to,
            "Your TaskFlow account password has been changed",
            html,
            text,
        )
        .await
    }

    async fn send(
        &self,
        to: &str,
        subject: &str,
        html: String,
        text: String,
    ) -> Result<(), AppError> {
        let message = MessageBuilder::new()
            .from((SENDER_NAME, self.sender.as_str()))
            .to(to)
            .subject(subject)
            .html_body(html)
            .text_body(text);

        SmtpClientBuilder::new(self.host.as_str(), SMTP_PORT)
            .implicit_tls(false)
            .credentials((self.sender.as_str(), self.password.as_str()))
            .connect()
            .await
            .map_err(|e| AppError::Internal(format!("smtp connect: {e}")))?
            .send(message)
            .await
            .map_err(|e| AppError::Internal(format!("smtp send: {e}")))?;

        Ok(())
    }
}
