use anyhow::{Result, anyhow};
use base64::{Engine as _, engine::general_purpose};
use mailparse::{MailHeaderMap, ParsedMail};

const HTML_WRAP_WIDTH: usize = 100;

/// Decode Gmail's base64url payloads. Gmail sometimes pads, sometimes not.
pub fn decode_base64url(data: &str) -> Result<Vec<u8>> {
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    general_purpose::URL_SAFE_NO_PAD
        .decode(compact.trim_end_matches('=').as_bytes())
        .map_err(|e| anyhow!("invalid base64url payload: {e}"))
}

/// Subject and readable body of a raw RFC 822 message.
pub fn subject_and_body(raw_rfc822: &[u8]) -> (String, String) {
    match mailparse::parse_mail(raw_rfc822) {
        Ok(parsed) => {
            let subject = parsed
                .headers
                .get_first_value("Subject") // decodes RFC 2047
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "(no subject)".to_string());

            let body = extract_text_part(&parsed).unwrap_or_else(|| {
                parsed
                    .get_body()
                    .unwrap_or_else(|_| String::from_utf8_lossy(raw_rfc822).into_owned())
            });

            (subject, body)
        }
        Err(_) => (
            "(no subject)".to_string(),
            String::from_utf8_lossy(raw_rfc822).into_owned(),
        ),
    }
}

/// First text/plain part, else the first text/html part rendered as text.
fn extract_text_part(p: &ParsedMail) -> Option<String> {
    find_part(p, "text/plain")
        .or_else(|| find_part(p, "text/html").map(|html| html_to_text(&html)))
}

fn find_part(p: &ParsedMail, mimetype: &str) -> Option<String> {
    if p.ctype.mimetype.eq_ignore_ascii_case(mimetype) {
        return p.get_body().ok();
    }
    p.subparts.iter().find_map(|sp| find_part(sp, mimetype))
}

pub fn html_to_text(html: &str) -> String {
    html2text::from_read(html.as_bytes(), HTML_WRAP_WIDTH).unwrap_or_else(|_| html.to_string())
}
