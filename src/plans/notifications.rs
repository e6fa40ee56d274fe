//! Plan expiration email templates.

use crate::db::models::plan_notification::NotificationType;
use crate::email::EmailMessage;

#[derive(Debug, Clone)]
pub struct NotificationTemplates {
    public_url: String,
}

impl NotificationTemplates {
    pub fn new(public_url: impl Into<String>) -> Self {
        Self {
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn render(&self, kind: NotificationType, to: &str, user_name: &str) -> EmailMessage {
        let buy_url = format!("{}/buy", self.public_url);
        let user_name = escape_html(user_name);

        let (subject, content) = match kind {
            NotificationType::ExpiringIn1Day => (
                "Your Plan Expires Tomorrow",
                format!(
                    "<h1>Hello {user_name},</h1>\
                     <p>Your subscription plan will expire in 1 day.</p>\
                     <p>If you don't renew your plan within 4 days, all your media will be deleted.</p>\
                     <p>Please <strong><a href='{buy_url}'>renew your plan</a></strong> to continue using our service.</p>"
                ),
            ),
            NotificationType::ExpiringIn3Days => (
                "Plan Expiration: Final Notice - Your Data Will Be Deleted Soon",
                format!(
                    "<h1>Hello {user_name},</h1>\
                     <p><strong>FINAL NOTICE:</strong> Your subscription plan has expired.</p>\
                     <p>If you do not renew your plan, all your media will be permanently erased.</p>\
                     <p>Please <strong><a href='{buy_url}'>renew your plan now</a></strong> to prevent data loss.</p>"
                ),
            ),
            NotificationType::Expired => (
                "Your Data Has Been Deleted - Plan Expired",
                format!(
                    "<h1>Hello {user_name},</h1>\
                     <p>Your subscription plan has expired and all your media files have been permanently deleted.</p>\
                     <p>If you believe this is an error, please contact support.</p>\
                     <p><a href='{buy_url}'>View our plans</a></p>"
                ),
            ),
        };

        EmailMessage {
            to: to.to_string(),
            subject: subject.to_string(),
            html: layout(&content),
        }
    }
}

fn layout(content: &str) -> String {
    format!(
        "<!DOCTYPE html>\
         <html><head><meta charset='utf-8'>\
         <meta name='viewport' content='width=device-width, initial-scale=1.0'></head>\
         <body style='font-family: sans-serif; color: #333; margin: 0; padding: 0;'>\
         <div style='max-width: 600px; margin: 0 auto; padding: 20px;'>\
         <div style='background: #6a5af9; padding: 30px; text-align: center; color: white;'><h2>ReelBox</h2></div>\
         <div style='padding: 30px; border: 1px solid #e5e7eb;'>{content}</div>\
         <div style='padding: 20px; text-align: center; font-size: 12px; color: #6b7280;'>\
         <p>You receive this email because you own a ReelBox storage plan.</p></div>\
         </div></body></html>"
    )
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\'', "&#39;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_kind_has_its_own_subject() {
        let templates = NotificationTemplates::new("https://reelbox.io/");

        let warning = templates.render(NotificationType::ExpiringIn1Day, "a@b.c", "ann");
        let notice = templates.render(NotificationType::ExpiringIn3Days, "a@b.c", "ann");
        let deleted = templates.render(NotificationType::Expired, "a@b.c", "ann");

        assert_eq!(warning.subject, "Your Plan Expires Tomorrow");
        assert!(notice.subject.starts_with("Plan Expiration: Final Notice"));
        assert!(deleted.html.contains("permanently deleted"));
        assert!(warning.html.contains("https://reelbox.io/buy"));
        assert_eq!(deleted.to, "a@b.c");
    }

    #[test]
    fn user_name_is_escaped() {
        let templates = NotificationTemplates::new("https://reelbox.io");
        let msg = templates.render(NotificationType::Expired, "a@b.c", "<script>");

        assert!(msg.html.contains("&lt;script&gt;"));
        assert!(!msg.html.contains("<script>"));
    }
}
