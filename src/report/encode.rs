//! `multipart/form-data` encoding of a report.
//!
//! Each content item becomes one part:
//!
//! ```text
//! --<boundary>\r\n
//! Content-Disposition: form-data; name="<name>"[; filename="<path>"]\r\n
//! [Content-Type: <type>\r\n]
//! [Content-Transfer-Encoding: <encoding>\r\n]
//! \r\n
//! <value or file bytes>\r\n
//! --<boundary>--\r\n
//! ```

use rand::Rng;

use crate::model::ContentItem;

use super::ContentStore;

/// An encoded request body and its boundary.
#[derive(Debug, Clone)]
pub struct Multipart {
    pub boundary: String,
    pub body: Vec<u8>,
}

impl Multipart {
    /// The `Content-Type` header value for this body.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary=\"{}\"", self.boundary)
    }
}

/// A boundary with a random 12-digit id.
pub fn random_boundary() -> String {
    let mut rng = rand::thread_rng();
    let digits: String = (0..12)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect();
    format!("tattle-boundary-{digits}")
}

impl ContentStore {
    /// Encode the report as `multipart/form-data`.
    ///
    /// With `is_query` only pre-query string items are included; files
    /// and user fields never leave before the user consents.
    pub fn encode(&self, boundary: &str, is_query: bool) -> Multipart {
        let mut body = Vec::new();
        let parts: Vec<&ContentItem> = if is_query {
            self.query_items().collect()
        } else {
            self.items.iter().collect()
        };

        for (i, item) in parts.into_iter().enumerate() {
            if i > 0 {
                body.extend_from_slice(b"\r\n");
            }
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            write_part(&mut body, item);
        }

        if !body.is_empty() {
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

        Multipart {
            boundary: boundary.to_string(),
            body,
        }
    }
}

fn write_part(body: &mut Vec<u8>, item: &ContentItem) {
    let mut headers = format!(
        "Content-Disposition: form-data; name=\"{}\"",
        quote(&item.name)
    );
    if let Some(attachment) = item.attachment() {
        headers.push_str(&format!(
            "; filename=\"{}\"",
            quote(&attachment.path.to_string_lossy())
        ));
    }
    headers.push_str("\r\n");

    if let Some(attachment) = item.attachment() {
        if let Some(content_type) = &attachment.content_type {
            headers.push_str(&format!("Content-Type: {content_type}\r\n"));
        }
        if let Some(encoding) = &attachment.transfer_encoding {
            headers.push_str(&format!("Content-Transfer-Encoding: {encoding}\r\n"));
        }
    }
    headers.push_str("\r\n");

    body.extend_from_slice(headers.as_bytes());
    body.extend_from_slice(item.payload());
}

/// Escape a header parameter value the way browsers do for form data.
fn quote(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
