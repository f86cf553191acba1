//! Server-side HTML for the dashboard.

use std::fmt::Write;

use chrono::{DateTime, Local};

use crate::app::{BannerLevel, Digest, SessionSnapshot, SummaryStatus};
use crate::config::Config;
use crate::constants::{BUSY_RELOAD_SECS, DEFAULT_IMAP_PORT};
use crate::extract::Section;
use crate::facts::Deadline;
use crate::mail::{Attachment, AttachmentOrigin};

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0 auto; max-width: 960px; padding: 1rem; color: #222; background: #fafafa; }
header { display: flex; justify-content: space-between; align-items: center; }
.phase { font-size: 0.9rem; color: #666; }
.banner { padding: 0.6rem 1rem; border-radius: 4px; margin: 1rem 0; }
.banner.info { background: #e8f0fe; }
.banner.notice { background: #fff4e5; }
.banner.error { background: #fdecea; }
form.connect label { display: block; margin: 0.4rem 0; }
.toolbar form { display: inline; }
.card { background: #fff; border: 1px solid #ddd; border-radius: 6px; padding: 1rem; margin: 1rem 0; }
.card h2 { font-size: 1.1rem; margin: 0 0 0.2rem; }
.meta { color: #666; font-size: 0.85rem; }
.unavailable { color: #a15c00; font-style: italic; }
.section-body { white-space: pre-wrap; }
.fuzzy { color: #666; font-size: 0.85rem; }
.purpose { color: #555; font-size: 0.85rem; }
"#;

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

pub fn dashboard_page(snapshot: &SessionSnapshot, config: &Config) -> String {
    let mut html = String::with_capacity(8 * 1024);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Inbox Digest</title>\n");
    if snapshot.phase.is_busy() {
        let _ = writeln!(html, "<meta http-equiv=\"refresh\" content=\"{}\">", BUSY_RELOAD_SECS);
    }
    let _ = writeln!(html, "<style>{}</style>\n</head>\n<body>", STYLE);

    let _ = writeln!(
        html,
        "<header><h1>Inbox Digest</h1><span class=\"phase\">{}</span></header>",
        escape(snapshot.phase.label())
    );

    if let Some(banner) = &snapshot.banner {
        let class = match banner.level {
            BannerLevel::Info => "info",
            BannerLevel::Notice => "notice",
            BannerLevel::Error => "error",
        };
        let _ = writeln!(
            html,
            "<div class=\"banner {}\"><strong>{}</strong> {}</div>",
            class,
            escape(&banner.title),
            escape(&banner.message)
        );
    }

    if snapshot.connected {
        render_toolbar(&mut html, snapshot);
    } else {
        render_connect_form(&mut html, snapshot, config);
    }

    for digest in &snapshot.digests {
        render_digest(&mut html, digest);
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn render_toolbar(html: &mut String, snapshot: &SessionSnapshot) {
    let user = snapshot.username.as_deref().unwrap_or_default();
    let _ = write!(
        html,
        "<div class=\"toolbar\"><span>{} &middot; {}</span> ",
        escape(user),
        escape(&snapshot.mailbox)
    );
    if let Some(at) = snapshot.last_refresh {
        let _ = write!(
            html,
            "<span class=\"meta\">updated {}</span> ",
            at.with_timezone(&Local).format("%H:%M")
        );
    }
    let disabled = if snapshot.phase.is_busy() { " disabled" } else { "" };
    let _ = writeln!(
        html,
        "<form method=\"post\" action=\"/refresh\"><button{0}>Refresh</button></form> \
         <form method=\"post\" action=\"/disconnect\"><button{0}>Disconnect</button></form></div>",
        disabled
    );
}

fn render_connect_form(html: &mut String, snapshot: &SessionSnapshot, config: &Config) {
    let account = config.account.as_ref();
    let server = account.map(|a| a.imap.server.as_str()).unwrap_or_default();
    let port = account.map_or(DEFAULT_IMAP_PORT, |a| a.imap.port);
    let username = account.map(|a| a.login()).unwrap_or_default();

    let _ = writeln!(
        html,
        "<form class=\"connect\" method=\"post\" action=\"/connect\">\n\
         <label>IMAP server <input name=\"server\" value=\"{}\" required></label>\n\
         <label>Port <input name=\"port\" value=\"{}\" inputmode=\"numeric\"></label>\n\
         <label>Username <input name=\"username\" value=\"{}\" autocomplete=\"username\" required></label>\n\
         <label>Password <input name=\"password\" type=\"password\" autocomplete=\"current-password\" \
         placeholder=\"blank to use the stored password\"></label>\n\
         <label>Mailbox <input name=\"mailbox\" value=\"{}\"></label>\n\
         <button>Connect</button>\n</form>",
        escape(server),
        port,
        escape(username),
        escape(&snapshot.mailbox)
    );
}

fn render_digest(html: &mut String, digest: &Digest) {
    let received = DateTime::from_timestamp(digest.date, 0)
        .map(|d| d.with_timezone(&Local).format("%a %b %-d, %H:%M").to_string())
        .unwrap_or_default();

    let _ = writeln!(
        html,
        "<article class=\"card\" id=\"msg-{}\">\n<h2>{}</h2>\n<div class=\"meta\">{} &lt;{}&gt; &middot; {}</div>",
        digest.uid,
        escape(&digest.subject),
        escape(digest.sender.display()),
        escape(&digest.sender.address),
        received
    );

    match &digest.summary.status {
        SummaryStatus::Summarized => {
            if let Some(text) = &digest.summary.text {
                let _ = writeln!(html, "<p class=\"summary\">{}</p>", escape(text));
            }
        }
        SummaryStatus::Unavailable { reason } => {
            let _ = writeln!(
                html,
                "<p class=\"unavailable\">Summary unavailable: {}</p>",
                escape(reason)
            );
        }
        SummaryStatus::Sections => {
            if let Some(sections) = &digest.sections {
                render_sections(html, sections);
            }
        }
    }

    render_deadlines(html, &digest.summary.deadlines);
    render_list(html, "Actions", &digest.summary.actions);
    render_list(html, "Questions", &digest.summary.questions);

    if !digest.links.is_empty() {
        html.push_str("<h3>Links</h3>\n<ul class=\"links\">\n");
        for link in &digest.links {
            let url = escape(&link.url);
            let _ = write!(
                html,
                "<li><a href=\"{0}\" rel=\"noopener noreferrer\" target=\"_blank\">{0}</a> \
                 <span class=\"purpose\">{1}</span>",
                url,
                escape(&link.purpose)
            );
            if let Some(context) = &link.context {
                let _ = write!(html, "<br><span class=\"meta\">{}</span>", escape(context));
            }
            html.push_str("</li>\n");
        }
        html.push_str("</ul>\n");
    }

    if !digest.attachments.is_empty() {
        html.push_str("<h3>Attachments</h3>\n<ul class=\"attachments\">\n");
        for attachment in &digest.attachments {
            render_attachment(html, digest.uid, attachment);
        }
        html.push_str("</ul>\n");
    }

    html.push_str("</article>\n");
}

fn render_sections(html: &mut String, sections: &[Section]) {
    for section in sections {
        html.push_str("<section>\n");
        if let Some(heading) = &section.heading {
            let _ = writeln!(html, "<h3>{}</h3>", escape(heading));
        }
        if !section.body.is_empty() {
            let _ = writeln!(html, "<div class=\"section-body\">{}</div>", escape(&section.body));
        }
        html.push_str("</section>\n");
    }
}

fn render_deadlines(html: &mut String, deadlines: &[Deadline]) {
    if deadlines.is_empty() {
        return;
    }
    html.push_str("<h3>Deadlines</h3>\n<ul class=\"deadlines\">\n");
    for deadline in deadlines {
        let mut when = String::new();
        if let Some(date) = deadline.date {
            when.push_str(&date.format("%a %b %-d, %Y").to_string());
        }
        if let Some(time) = deadline.time {
            if !when.is_empty() {
                when.push(' ');
            }
            when.push_str(&time.format("%H:%M").to_string());
        }
        let _ = write!(
            html,
            "<li><strong>{}</strong> &ldquo;{}&rdquo;",
            escape(&when),
            escape(&deadline.phrase)
        );
        if deadline.fuzzy {
            html.push_str(" <span class=\"fuzzy\">(approx.)</span>");
        }
        let _ = writeln!(html, "<br><span class=\"meta\">{}</span></li>", escape(&deadline.snippet));
    }
    html.push_str("</ul>\n");
}

fn render_list(html: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(html, "<h3>{}</h3>\n<ul>", title);
    for item in items {
        let _ = writeln!(html, "<li>{}</li>", escape(item));
    }
    html.push_str("</ul>\n");
}

fn render_attachment(html: &mut String, uid: u32, attachment: &Attachment) {
    let name = escape(&attachment.filename);
    match (attachment.origin, attachment.index) {
        (AttachmentOrigin::Attached, Some(index)) => {
            let _ = write!(html, "<li><a href=\"/attachments/{}/{}\">{}</a>", uid, index, name);
        }
        (AttachmentOrigin::Attached, None) => {
            let _ = write!(html, "<li>{}", name);
        }
        (AttachmentOrigin::Mentioned, _) => {
            let _ = write!(html, "<li>{} <span class=\"meta\">(mentioned)</span>", name);
        }
    }
    if let Some(size) = attachment.human_size() {
        let _ = write!(html, " <span class=\"meta\">{}</span>", size);
    }
    if let Some(purpose) = &attachment.purpose {
        let _ = write!(html, " <span class=\"purpose\">{}</span>", escape(purpose));
    }
    if let Some(context) = &attachment.context {
        let _ = write!(html, "<br><span class=\"meta\">{}</span>", escape(context));
    }
    html.push_str("</li>\n");
}
