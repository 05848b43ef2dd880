//! Content negotiation (spec §4.2): `Accept-Encoding` parsing, intersected
//! with the server's ordered preference list and gated by MIME
//! compressibility.

use crate::mime::MimeType;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Encoding {
    Identity,
    Gzip,
    Deflate,
    Br,
}

impl Encoding {
    pub fn name(self) -> &'static str {
        match self {
            Encoding::Identity => "identity",
            Encoding::Gzip => "gzip",
            Encoding::Deflate => "deflate",
            Encoding::Br => "br",
        }
    }

    fn from_token(token: &str) -> Option<Encoding> {
        match token {
            "gzip" => Some(Encoding::Gzip),
            "deflate" => Some(Encoding::Deflate),
            "br" => Some(Encoding::Br),
            "identity" => Some(Encoding::Identity),
            _ => None,
        }
    }
}

struct Candidate {
    encoding: Encoding,
    q: f32,
    server_index: usize,
}

/// Splits `header` on `,`, parses each entry's `q` value (default `1.0`),
/// discards `q == 0` entries and anything outside `server_preference`, and
/// sorts by descending `q` then ascending server-preference index.
pub fn parse_accept_encoding(header: &str, server_preference: &[Encoding]) -> Vec<Encoding> {
    let mut candidates: Vec<Candidate> = Vec::new();

    for entry in header.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let mut parts = entry.splitn(2, ";q=");
        let token = parts.next().unwrap_or("").trim();
        let q: f32 = parts
            .next()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(1.0);

        if q == 0.0 {
            continue;
        }
        let Some(encoding) = Encoding::from_token(token) else {
            continue;
        };
        let Some(server_index) = server_preference.iter().position(|e| *e == encoding) else {
            continue;
        };
        candidates.push(Candidate {
            encoding,
            q,
            server_index,
        });
    }

    candidates.sort_by(|a, b| {
        b.q.partial_cmp(&a.q)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.server_index.cmp(&b.server_index))
    });

    candidates.into_iter().map(|c| c.encoding).collect()
}

/// Returns the encoding to use for this response body, or `None` (wire
/// behavior: no `Content-Encoding` header) when the header is absent, the
/// server has no compression preferences, or the media type is not
/// compressible.
pub fn get_encoding(
    header: &str,
    server_preference: &[Encoding],
    media_type: MimeType,
) -> Option<Encoding> {
    if header.is_empty() || server_preference.is_empty() || !media_type.is_compressible() {
        return None;
    }
    parse_accept_encoding(header, server_preference)
        .into_iter()
        .find(|e| *e != Encoding::Identity)
}
