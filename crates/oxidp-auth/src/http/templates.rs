//! Server-rendered HTML for the interaction pages.
//!
//! Login, consent, and error pages are built with plain string
//! assembly; no template engine is involved. Everything user-supplied
//! is HTML-escaped.

use crate::oauth::interaction::ConsentPrompt;

/// Shared CSS for all interaction pages.
const SHARED_STYLES: &str = r#"
* {
    margin: 0;
    padding: 0;
    box-sizing: border-box;
}

body {
    font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
    background: #f4f5f7;
    min-height: 100vh;
    display: flex;
    justify-content: center;
    align-items: center;
    color: #1f2430;
    line-height: 1.5;
}

.container {
    width: 100%;
    max-width: 400px;
    padding: 1rem;
}

.card {
    background: #ffffff;
    border: 1px solid #e0e3e8;
    border-radius: 10px;
    padding: 1.5rem;
    box-shadow: 0 1px 4px rgba(31, 36, 48, 0.08);
}

.card-title {
    font-size: 1.2rem;
    font-weight: 600;
    margin-bottom: 1rem;
}

.alert-error {
    background: #fdecea;
    border: 1px solid #f5c6c2;
    color: #9b2c23;
    border-radius: 6px;
    padding: 0.6rem 0.8rem;
    font-size: 0.875rem;
    margin-bottom: 1rem;
}

.form-group {
    margin-bottom: 1rem;
}

.form-label {
    display: block;
    font-size: 0.875rem;
    font-weight: 500;
    margin-bottom: 0.3rem;
}

.form-input {
    width: 100%;
    padding: 0.55rem 0.7rem;
    border: 1px solid #c6ccd6;
    border-radius: 6px;
    font-size: 0.95rem;
}

.btn {
    width: 100%;
    padding: 0.6rem;
    border: none;
    border-radius: 6px;
    font-size: 0.95rem;
    font-weight: 600;
    cursor: pointer;
}

.btn-primary {
    background: #2b5cd9;
    color: #ffffff;
}

.btn-secondary {
    background: #eceef2;
    color: #1f2430;
    margin-top: 0.5rem;
}

.scope-list {
    list-style: none;
    margin-bottom: 1rem;
}

.scope-list li {
    padding: 0.4rem 0;
    border-bottom: 1px solid #eef0f3;
    font-size: 0.9rem;
}

.section-label {
    font-size: 0.8rem;
    text-transform: uppercase;
    color: #6b7384;
    margin-top: 0.75rem;
    margin-bottom: 0.25rem;
}

.error-code {
    font-family: monospace;
    font-size: 0.85rem;
    color: #6b7384;
    margin-top: 0.75rem;
}
"#;

fn html_page(title: &str, content: &str) -> String {
    let mut html = String::with_capacity(content.len() + SHARED_STYLES.len() + 512);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"UTF-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
    html.push_str("<title>");
    html.push_str(&html_escape(title));
    html.push_str("</title>\n<style>");
    html.push_str(SHARED_STYLES);
    html.push_str("</style>\n</head>\n<body>\n<div class=\"container\">\n");
    html.push_str(content);
    html.push_str("\n</div>\n</body>\n</html>");
    html
}

/// Renders the login form for an interaction.
#[must_use]
pub fn render_login_form(
    client_id: &str,
    uid: &str,
    email_hint: Option<&str>,
    error: Option<&str>,
) -> String {
    let mut content = String::with_capacity(2048);

    content.push_str("<div class=\"card\">\n");
    content.push_str("<div class=\"card-title\">Sign in to continue to ");
    content.push_str(&html_escape(client_id));
    content.push_str("</div>\n");

    if let Some(e) = error {
        content.push_str("<div class=\"alert-error\">");
        content.push_str(&html_escape(e));
        content.push_str("</div>\n");
    }

    content.push_str("<form method=\"POST\" action=\"/interaction/");
    content.push_str(&html_escape(uid));
    content.push_str("/login\">\n");

    content.push_str("<div class=\"form-group\">\n");
    content.push_str("<label class=\"form-label\" for=\"email\">Email</label>\n");
    content.push_str("<input type=\"email\" id=\"email\" name=\"email\" class=\"form-input\" required autocomplete=\"username\" value=\"");
    if let Some(email) = email_hint {
        content.push_str(&html_escape(email));
    }
    content.push_str("\">\n</div>\n");

    content.push_str("<div class=\"form-group\">\n");
    content.push_str("<label class=\"form-label\" for=\"password\">Password</label>\n");
    content.push_str("<input type=\"password\" id=\"password\" name=\"password\" class=\"form-input\" required autocomplete=\"current-password\">\n");
    content.push_str("</div>\n");

    content.push_str("<button type=\"submit\" class=\"btn btn-primary\">Sign in</button>\n");
    content.push_str("</form>\n</div>");

    html_page("Sign in", &content)
}

/// Renders the consent form listing what the client is asking for.
#[must_use]
pub fn render_consent_form(client_id: &str, uid: &str, prompt: &ConsentPrompt) -> String {
    let mut content = String::with_capacity(2048);

    content.push_str("<div class=\"card\">\n");
    content.push_str("<div class=\"card-title\">");
    content.push_str(&html_escape(client_id));
    content.push_str(" is requesting access</div>\n");

    if !prompt.missing_oidc_scopes.is_empty() {
        content.push_str("<div class=\"section-label\">Scopes</div>\n<ul class=\"scope-list\">\n");
        for scope in &prompt.missing_oidc_scopes {
            content.push_str("<li>");
            content.push_str(&html_escape(scope));
            content.push_str("</li>\n");
        }
        content.push_str("</ul>\n");
    }

    if !prompt.missing_oidc_claims.is_empty() {
        content.push_str("<div class=\"section-label\">Profile data</div>\n<ul class=\"scope-list\">\n");
        for claim in &prompt.missing_oidc_claims {
            content.push_str("<li>");
            content.push_str(&html_escape(claim));
            content.push_str("</li>\n");
        }
        content.push_str("</ul>\n");
    }

    for (resource, scopes) in &prompt.missing_resource_scopes {
        content.push_str("<div class=\"section-label\">");
        content.push_str(&html_escape(resource));
        content.push_str("</div>\n<ul class=\"scope-list\">\n");
        for scope in scopes {
            content.push_str("<li>");
            content.push_str(&html_escape(scope));
            content.push_str("</li>\n");
        }
        content.push_str("</ul>\n");
    }

    content.push_str("<form method=\"POST\" action=\"/interaction/");
    content.push_str(&html_escape(uid));
    content.push_str("/confirm\">\n");
    content.push_str("<button type=\"submit\" class=\"btn btn-primary\">Allow</button>\n");
    content.push_str("</form>\n");

    content.push_str("<form method=\"POST\" action=\"/interaction/");
    content.push_str(&html_escape(uid));
    content.push_str("/cancel\">\n");
    content.push_str("<button type=\"submit\" class=\"btn btn-secondary\">Deny</button>\n");
    content.push_str("</form>\n</div>");

    html_page("Authorize access", &content)
}

/// Renders the generic error page shown when a failure cannot be
/// redirected to the client.
#[must_use]
pub fn render_error_page(error_code: &str, description: &str) -> String {
    let mut content = String::with_capacity(512);

    content.push_str("<div class=\"card\">\n");
    content.push_str("<div class=\"card-title\">Something went wrong</div>\n");
    content.push_str("<p>");
    content.push_str(&html_escape(description));
    content.push_str("</p>\n<div class=\"error-code\">");
    content.push_str(&html_escape(error_code));
    content.push_str("</div>\n</div>");

    html_page("Error", &content)
}

/// HTML escaping for user-supplied values.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
