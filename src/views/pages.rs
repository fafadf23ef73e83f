//! Minimal HTML for the browser-facing routes
//!
//! Markup only; every dynamic value passes through [`escape_html`].

use super::auth_view::AuthView;
use std::fmt::Write as _;

pub const VERIFY_FALLBACK_ERROR: &str = "Could not verify your email";

#[must_use]
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn document(title: &str, head_extra: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{}</title>{head_extra}
</head>
<body>
{body}
</body>
</html>"#,
        escape_html(title)
    )
}

fn error_banner(error: Option<&str>) -> String {
    error
        .filter(|message| !message.is_empty())
        .map(|message| format!(r#"<p role="alert">{}</p>"#, escape_html(message)))
        .unwrap_or_default()
}

/// Field names posted by each panel, in display order
#[must_use]
pub const fn view_fields(view: AuthView) -> &'static [&'static str] {
    match view {
        AuthView::SignIn => &["email", "password"],
        AuthView::SignUp => &["name", "email", "password", "terms"],
        AuthView::ForgotPassword => &["email"],
        AuthView::ResetSuccess => &[],
    }
}

const fn view_action(view: AuthView) -> Option<&'static str> {
    match view {
        AuthView::SignIn => Some("/auth/sign_in"),
        AuthView::SignUp => Some("/auth/sign_up"),
        AuthView::ForgotPassword => Some("/auth/forgot_password"),
        AuthView::ResetSuccess => None,
    }
}

fn field_input(name: &str) -> String {
    match name {
        "password" => r#"<label>Password <input name="password" type="password" minlength="8" required></label>"#.to_string(),
        "email" => r#"<label>Email <input name="email" type="email" required></label>"#.to_string(),
        "terms" => r#"<label><input name="terms" type="checkbox"> I agree to the terms</label>"#.to_string(),
        other => format!(r#"<label>{other} <input name="{other}" type="text" required></label>"#),
    }
}

/// The auth panel page for `view`, optionally showing `error`
#[must_use]
pub fn auth_page(auth_path: &str, view: AuthView, error: Option<&str>) -> String {
    let mut body = format!("<h1>{}</h1>\n{}", view.title(), error_banner(error));

    match view_action(view) {
        Some(action) => {
            let _ = writeln!(body, r#"<form method="post" action="{action}" data-view="{view}">"#);
            for field in view_fields(view) {
                let _ = writeln!(body, "    {}", field_input(field));
            }
            body.push_str("    <button type=\"submit\">Continue</button>\n</form>\n");
        }
        None => body.push_str("<p>Check your email for a password reset link.</p>\n"),
    }

    if view == AuthView::SignIn {
        body.push_str(
            r#"<form method="post" action="/auth/oauth"><button name="provider" value="google">Continue with Google</button><button name="provider" value="github">Continue with GitHub</button></form>"#,
        );
        body.push('\n');
    }

    body.push_str("<nav>\n");
    for (event, target) in view.available() {
        let _ = writeln!(
            body,
            r#"    <a href="{}?view={target}" data-event="{}">{}</a>"#,
            escape_html(auth_path),
            serde_json::to_value(event)
                .ok()
                .and_then(|value| value.as_str().map(ToString::to_string))
                .unwrap_or_default(),
            target.title()
        );
    }
    body.push_str("</nav>");

    document(view.title(), "", &body)
}

/// Verified: refresh to `next` after `delay_seconds`
#[must_use]
pub fn verify_success_page(next: &str, delay_seconds: u64) -> String {
    let next = escape_html(next);
    let head = format!(r#"
    <meta http-equiv="refresh" content="{delay_seconds};url={next}">"#);
    let body = format!(
        r#"<h1>Email verified</h1>
<p>Redirecting you now. <a href="{next}">Continue</a></p>"#
    );
    document("Email verified", &head, &body)
}

#[must_use]
pub fn verify_error_page(message: &str, sign_in_path: &str) -> String {
    let message = if message.is_empty() {
        VERIFY_FALLBACK_ERROR
    } else {
        message
    };
    let body = format!(
        r#"<h1>Verification failed</h1>
{}
<a href="{}">Go to sign in</a>"#,
        error_banner(Some(message)),
        escape_html(sign_in_path)
    );
    document("Verification failed", "", &body)
}

/// New password form shown to a recovered session
#[must_use]
pub fn reset_password_page(error: Option<&str>) -> String {
    let body = format!(
        r#"<h1>Reset password</h1>
<p>Enter your new password below</p>
{}
<form method="post" action="/auth/reset_password">
    <label>New Password <input name="password" type="password" minlength="8" required></label>
    <label>Confirm Password <input name="confirmPassword" type="password" minlength="8" required></label>
    <button type="submit">Reset password</button>
</form>"#,
        error_banner(error)
    );
    document("Reset password", "", &body)
}
