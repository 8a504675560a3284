//! Plain-text and HTML bodies for every outbox event.

use chrono::{DateTime, FixedOffset, Utc};
use thiserror::Error;

use campus_shared::constants::{APP_NAME, OTP_TTL_SECS};
use campus_store::{Database, OutboxEvent, ProposalNotice, StoreError};

use super::{EmailCategory, OutgoingEmail};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no email address for user {0}")]
    NoRecipient(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What rendering needs beyond the event itself.
pub struct RenderContext<'a> {
    pub db: &'a Database,
    pub base_url: &'a str,
    pub campus_offset: FixedOffset,
}

impl RenderContext<'_> {
    fn email_of(&self, uid: &str) -> Result<String, RenderError> {
        self.db
            .user_email(uid)?
            .ok_or_else(|| RenderError::NoRecipient(uid.to_string()))
    }

    fn item_title(&self, item_id: uuid::Uuid) -> String {
        match self.db.get_item(item_id) {
            Ok(item) => item.title,
            Err(_) => "your rented item".to_string(),
        }
    }

    fn local(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.campus_offset)
            .format("%a %-d %b %Y, %H:%M")
            .to_string()
    }

    pub fn chat_link(&self, chat_id: &str) -> String {
        format!("{}/chat/{}", self.base_url.trim_end_matches('/'), chat_id)
    }
}

pub fn render(event: &OutboxEvent, ctx: &RenderContext<'_>) -> Result<OutgoingEmail, RenderError> {
    match event {
        OutboxEvent::OtpCode { email, code, .. } => Ok(otp_code(email, code)),
        OutboxEvent::RentalProposal(notice) => {
            let to = match (&notice.recipient_email, &notice.recipient_id) {
                (Some(email), _) if !email.trim().is_empty() => email.clone(),
                (_, Some(uid)) => ctx.email_of(uid)?,
                _ => return Err(RenderError::NoRecipient("<unspecified>".to_string())),
            };
            Ok(proposal(&to, notice, &ctx.chat_link(&notice.chat_id)))
        }
        OutboxEvent::ReturnReminder {
            borrower_id,
            item_id,
            return_deadline,
            ..
        } => {
            let to = ctx.email_of(borrower_id)?;
            let title = ctx.item_title(*item_id);
            let due = ctx.local(*return_deadline);
            Ok(OutgoingEmail {
                category: EmailCategory::Reminder,
                subject: format!("Reminder: return \"{title}\" by {due}"),
                text: format!(
                    "Hi,\n\n\"{title}\" is due back by {due}.\n\
                     Returning on time earns you trust points; late returns cost them.\n\n\
                     {APP_NAME}"
                ),
                html: layout(&format!(
                    "<p><strong>{}</strong> is due back by <strong>{}</strong>.</p>\
                     <p>Returning on time earns you trust points; late returns cost them.</p>",
                    escape(&title),
                    escape(&due)
                )),
                to,
            })
        }
        OutboxEvent::ReturnConfirmed {
            borrower_id,
            item_id,
            on_time,
            trust_delta,
            ..
        } => {
            let to = ctx.email_of(borrower_id)?;
            let title = ctx.item_title(*item_id);
            let outcome = if *on_time {
                format!("It came back on time, so your trust score went up by {trust_delta}.")
            } else {
                "It came back after the deadline, so your trust score is unchanged.".to_string()
            };
            Ok(OutgoingEmail {
                category: EmailCategory::Confirmation,
                subject: format!("Return of \"{title}\" confirmed"),
                text: format!("Hi,\n\nThe lender confirmed the return of \"{title}\".\n{outcome}\n\n{APP_NAME}"),
                html: layout(&format!(
                    "<p>The lender confirmed the return of <strong>{}</strong>.</p><p>{}</p>",
                    escape(&title),
                    escape(&outcome)
                )),
                to,
            })
        }
    }
}

fn otp_code(email: &str, code: &str) -> OutgoingEmail {
    let minutes = OTP_TTL_SECS / 60;
    OutgoingEmail {
        category: EmailCategory::Otp,
        to: email.to_string(),
        subject: format!("Your {APP_NAME} verification code"),
        text: format!(
            "Your verification code is: {code}\n\n\
             It expires in {minutes} minutes.\n\n\
             If you didn't request this, you can safely ignore this email."
        ),
        html: layout(&format!(
            "<p>Your verification code is:</p>\
             <p style=\"font-size:28px;letter-spacing:6px\"><strong>{}</strong></p>\
             <p>It expires in {minutes} minutes.</p>\
             <p>If you didn't request this, you can safely ignore this email.</p>",
            escape(code)
        )),
    }
}

fn proposal(to: &str, notice: &ProposalNotice, link: &str) -> OutgoingEmail {
    let image = notice
        .item_image
        .as_deref()
        .filter(|url| !url.is_empty())
        .map(|url| format!("<p><img src=\"{}\" alt=\"\" width=\"240\"></p>", escape(url)))
        .unwrap_or_default();

    OutgoingEmail {
        category: EmailCategory::Proposal,
        to: to.to_string(),
        subject: format!("{} wants to borrow \"{}\"", notice.sender_name, notice.item_title),
        text: format!(
            "{sender} sent you a rental proposal for \"{title}\".\n\
             Dates: {start} to {end}\n\n\
             \"{text}\"\n\n\
             Reply in the app: {link}",
            sender = notice.sender_name,
            title = notice.item_title,
            start = notice.start_date,
            end = notice.end_date,
            text = notice.text,
        ),
        html: layout(&format!(
            "<p><strong>{}</strong> sent you a rental proposal for <strong>{}</strong>.</p>\
             {image}\
             <p>Dates: {} to {}</p>\
             <blockquote>{}</blockquote>\
             <p><a href=\"{}\">Open the conversation</a></p>",
            escape(&notice.sender_name),
            escape(&notice.item_title),
            escape(&notice.start_date),
            escape(&notice.end_date),
            escape(&notice.text),
            escape(link),
        )),
    }
}

fn layout(body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><body style=\"font-family:sans-serif\">\
         {body}<hr><p style=\"color:#888\">{APP_NAME}</p></body></html>"
    )
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_store::ProfileUpsert;
    use chrono::TimeZone;

    fn ctx(db: &Database) -> RenderContext<'_> {
        RenderContext {
            db,
            base_url: "https://rent.campus.edu/",
            campus_offset: FixedOffset::east_opt(330 * 60).unwrap(),
        }
    }

    fn notice() -> ProposalNotice {
        ProposalNotice {
            recipient_id: Some("lena".into()),
            recipient_email: None,
            sender_id: "amir".into(),
            sender_name: "Amir".into(),
            item_title: "Tent <2p>".into(),
            start_date: "2024-01-01".into(),
            end_date: "2024-01-03".into(),
            text: "Can I borrow it?".into(),
            item_image: Some("https://img.example/tent.png".into()),
            chat_id: "amir_lena".into(),
        }
    }

    #[test]
    fn otp_mail_contains_code() {
        let db = Database::open_in_memory().unwrap();
        let event = OutboxEvent::OtpCode {
            email: "amir@campus.edu".into(),
            code: "042917".into(),
            expires_at: Utc::now(),
        };
        let email = render(&event, &ctx(&db)).unwrap();
        assert_eq!(email.category, EmailCategory::Otp);
        assert_eq!(email.to, "amir@campus.edu");
        assert!(email.text.contains("042917"));
        assert!(email.html.contains("042917"));
    }

    #[test]
    fn proposal_resolves_recipient_and_links_chat() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_profile(
            &ProfileUpsert {
                uid: "lena".into(),
                email: Some("lena@campus.edu".into()),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();

        let email = render(&OutboxEvent::RentalProposal(notice()), &ctx(&db)).unwrap();
        assert_eq!(email.to, "lena@campus.edu");
        assert!(email.text.contains("https://rent.campus.edu/chat/amir_lena"));
        assert!(email.html.contains("Tent &lt;2p&gt;"));
        assert!(email.html.contains("tent.png"));
    }

    #[test]
    fn proposal_without_address_fails() {
        let db = Database::open_in_memory().unwrap();
        let err = render(&OutboxEvent::RentalProposal(notice()), &ctx(&db)).unwrap_err();
        assert!(matches!(err, RenderError::NoRecipient(ref uid) if uid == "lena"));
    }

    #[test]
    fn reminder_shows_deadline_in_campus_time() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_profile(
            &ProfileUpsert {
                uid: "amir".into(),
                email: Some("amir@campus.edu".into()),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();

        let event = OutboxEvent::ReturnReminder {
            rental_id: uuid::Uuid::new_v4(),
            borrower_id: "amir".into(),
            item_id: uuid::Uuid::new_v4(),
            return_deadline: Utc.with_ymd_and_hms(2024, 1, 8, 18, 29, 59).unwrap(),
        };
        let email = render(&event, &ctx(&db)).unwrap();
        assert_eq!(email.category, EmailCategory::Reminder);
        assert!(email.text.contains("your rented item"));
        assert!(email.text.contains("23:59"), "{}", email.text);
    }
}
