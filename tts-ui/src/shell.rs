//! Presentation shell
//!
//! Renders the pages as HTML strings. No decisions are made here; every
//! input comes from the session snapshot, the form controller, or the route
//! guard. All dynamic text goes through `html_escape`.

use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use tts_common::Voice;

use crate::form::ConversionForm;
use crate::guard::Route;
use crate::session::Profile;

const APP_TITLE: &str = "Text to Speech";
const DOWNLOAD_FILE_NAME: &str = "converted-audio.mp3";

/// Seconds between automatic reloads of transient pages
const REFRESH_SECS: u32 = 2;

fn page(title: &str, refresh: bool, body: &str) -> String {
    let refresh_tag = if refresh {
        format!("<meta http-equiv=\"refresh\" content=\"{}\">", REFRESH_SECS)
    } else {
        String::new()
    };

    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         {refresh_tag}\n\
         <title>{title}</title>\n\
         <link rel=\"stylesheet\" href=\"/static/styles.css\">\n\
         </head>\n\
         <body>\n{body}\n</body>\n\
         </html>\n",
        refresh_tag = refresh_tag,
        title = text(title),
        body = body,
    )
}

fn header(profile: &Profile) -> String {
    format!(
        r#"<header class="dashboard-header">
  <h2>{title}</h2>
  <div class="user-profile">
    <img class="avatar" src="{avatar}" alt="" width="40" height="40">
    <span class="user-name">{name}</span>
    <ul>
      <li><a href="/recents">Recents</a></li>
    </ul>
    <form method="post" action="/logout">
      <button type="submit" class="logout-button">Logout</button>
    </form>
  </div>
</header>"#,
        title = APP_TITLE,
        avatar = attr(&profile.avatar_url),
        name = text(&profile.display_name),
    )
}

fn footer() -> String {
    format!(
        r#"<footer class="card-footer">{} v{}</footer>"#,
        APP_TITLE,
        env!("CARGO_PKG_VERSION")
    )
}

fn voice_options(selected: &str) -> String {
    Voice::ALL
        .iter()
        .map(|voice| {
            let selected_attr = if voice.name() == selected { " selected" } else { "" };
            format!(
                r#"<option value="{}"{}>{}</option>"#,
                voice.name(),
                selected_attr,
                text(voice.label())
            )
        })
        .collect::<Vec<_>>()
        .join("\n          ")
}

fn outcome(form: &ConversionForm) -> String {
    let mut html = String::new();

    if let Some(message) = form.error_message() {
        html.push_str(&format!(
            r#"<p class="error-message">{}</p>"#,
            text(message)
        ));
    }

    if let Some(location) = form.audio_location() {
        html.push_str(&format!(
            r#"<audio controls class="audio-player">
          <source src="{src}" type="audio/mpeg">
          Your browser does not support the audio element.
        </audio>
        <a href="{src}" download="{file}" class="download-button">Download Audio</a>"#,
            src = attr(location),
            file = DOWNLOAD_FILE_NAME,
        ));
    }

    html
}

/// Main view: header, conversion card, footer
pub fn render_dashboard(profile: &Profile, form: &ConversionForm, route: Route) -> String {
    let disabled = if form.is_submit_disabled() { " disabled" } else { "" };

    let body = format!(
        r#"<div class="dashboard-container">
{header}
<main class="dashboard-main">
  <div class="card">
    <div class="card-details">
      <h3 class="card-title">Text to Speech Converter</h3>
      <form method="post" action="/convert">
        <input type="hidden" name="return_to" value="{return_to}">
        <textarea class="text-area" name="text" rows="4" placeholder="Enter your text here...">{text}</textarea>
        <select class="dropdown" name="voice">
          {options}
        </select>
        <button type="submit" class="convert-button"{disabled}>{label}</button>
      </form>
      {outcome}
    </div>
    {footer}
  </div>
</main>
</div>"#,
        header = header(profile),
        return_to = route.path(),
        text = text(form.text()),
        options = voice_options(form.voice()),
        disabled = disabled,
        label = form.button_label(),
        outcome = outcome(form),
        footer = footer(),
    );

    // Keep polling while a conversion is outstanding so the result shows up
    page(APP_TITLE, form.is_in_flight(), &body)
}

/// Neutral waiting page while the identity provider bootstraps
pub fn render_spinner() -> String {
    page(
        APP_TITLE,
        true,
        r#"<div class="spinner-container"><div class="spinner" role="status" aria-label="Loading"></div></div>"#,
    )
}

/// Shown once the sign-in redirect has already been issued
pub fn render_redirecting() -> String {
    page(
        APP_TITLE,
        false,
        r#"<div class="redirecting">Redirecting to login... <a href="/login">Sign in</a></div>"#,
    )
}

/// Terminal authentication error display
pub fn render_auth_error(message: &str) -> String {
    page(
        APP_TITLE,
        false,
        &format!(
            r#"<div class="auth-error">Authentication error: {} <a href="/login">Try again</a></div>"#,
            text(message)
        ),
    )
}
