//! HTML notification emails.

use chrono::{DateTime, Utc};

/// A rendered email, ready for a [`NotificationDispatcher`](crate::providers::NotificationDispatcher).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html: String,
}

/// Account confirmation, sent to a newly registered address.
#[must_use]
pub fn account_confirmation(project_name: &str, name: &str, link: &str) -> RenderedEmail {
    RenderedEmail {
        subject: format!("{project_name} Account confirmation"),
        html: action_email(
            "Confirm your account",
            name,
            "Please click the button below to confirm your account:",
            "Confirm Account",
            link,
            project_name,
        ),
    }
}

/// Password reset link.
#[must_use]
pub fn password_reset(project_name: &str, name: &str, link: &str) -> RenderedEmail {
    RenderedEmail {
        subject: format!("{project_name} Password Reset"),
        html: action_email(
            "Reset your password",
            name,
            "We received a request to reset your password. Click the button below to reset your password:",
            "Reset Password",
            link,
            project_name,
        ),
    }
}

/// Email-change confirmation, sent to the *new* address.
#[must_use]
pub fn email_change_confirmation(project_name: &str, name: &str, link: &str) -> RenderedEmail {
    RenderedEmail {
        subject: format!("{project_name} Email change request"),
        html: action_email(
            "Confirm your email address",
            name,
            &format!(
                "We received a request to add this email to a {} account. Click the button below to confirm your email address:",
                escape(project_name)
            ),
            "Confirm Email",
            link,
            project_name,
        ),
    }
}

/// Security notice after a successful password login.
#[must_use]
pub fn new_login(username: &str, login_time: DateTime<Utc>, device: &str) -> RenderedEmail {
    let when = login_time.format("%Y-%m-%d %H:%M:%S UTC");
    RenderedEmail {
        subject: "New login detected".to_string(),
        html: notice_email(
            "New login detected",
            username,
            &format!(
                "Your account was signed in on {when} from <strong>{}</strong>.",
                escape(device)
            ),
        ),
    }
}

/// Security notice after a password change.
#[must_use]
pub fn password_changed(username: &str) -> RenderedEmail {
    RenderedEmail {
        subject: "Password changed".to_string(),
        html: notice_email(
            "Password changed",
            username,
            "The password for your account was just changed.",
        ),
    }
}

/// Security notice sent to the *old* address after an email change.
#[must_use]
pub fn email_changed(name: &str) -> RenderedEmail {
    RenderedEmail {
        subject: "Email changed".to_string(),
        html: notice_email(
            "Email changed",
            name,
            "The email address for your account was just changed. Messages will now go to the new address.",
        ),
    }
}

fn action_email(
    title: &str,
    name: &str,
    intro: &str,
    button: &str,
    link: &str,
    project_name: &str,
) -> String {
    let name = escape(name);
    let link = escape(link);
    let project_name = escape(project_name);
    format!(
        r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
        <h2 style="color: #2563eb;">Hello {name},</h2>
        <p>{intro}</p>
        <p style="margin: 30px 0;">
            <a href="{link}"
               style="display: inline-block; background-color: #2563eb; color: white; padding: 12px 24px; text-decoration: none; border-radius: 4px;">
                {button}
            </a>
        </p>
        <p style="color: #666; font-size: 14px;">
            If you didn't request this, you can safely ignore this email.
        </p>
        <p>Regards,<br>{project_name}</p>
        <p style="color: #666; font-size: 12px; margin-top: 40px;">
            Or copy and paste this link into your browser:<br>
            {link}
        </p>
    </div>
</body>
</html>
"#
    )
}

fn notice_email(title: &str, name: &str, message: &str) -> String {
    let name = escape(name);
    format!(
        r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
        <h2 style="color: #dc2626;">Hello {name},</h2>
        <div style="background-color: #fef2f2; border-left: 4px solid #dc2626; padding: 15px; margin: 20px 0;">
            <p style="margin: 0;">{message}</p>
        </div>
        <p style="color: #666; font-size: 14px;">
            If you didn't perform this action, please secure your account immediately.
        </p>
    </div>
</body>
</html>
"#
    )
}

/// Minimal HTML escaping for values interpolated into templates.
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
