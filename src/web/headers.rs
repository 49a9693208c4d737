use axum::http;
use headers::{Header, HeaderName, HeaderValue};
use mime::Mime;

/// Parsed `Accept` header, in the order the client listed the media ranges.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Accept(pub Vec<Mime>);

impl Accept {
    /// True when the client lists `application/json` ahead of any HTML type.
    /// Browsers submitting the upload form list `text/html` first; scripts
    /// asking for JSON get the request id back instead of a redirect.
    pub fn prefers_json(&self) -> bool {
        for range in &self.0 {
            if range.type_() == mime::APPLICATION && range.subtype() == mime::JSON {
                return true;
            }
            if range.type_() == mime::TEXT && range.subtype() == mime::HTML {
                return false;
            }
        }
        false
    }
}

impl Header for Accept {
    fn name() -> &'static HeaderName {
        &http::header::ACCEPT
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        let mut mime_types = Vec::new();
        for value in values {
            let mimes_str = value.to_str().map_err(|_| headers::Error::invalid())?;
            for mime_str in mimes_str.split(',') {
                let mime_str = mime_str.trim();
                if mime_str.is_empty() {
                    continue;
                }
                // Skip ranges we cannot parse rather than rejecting the whole header.
                if let Ok(mime) = mime_str.parse::<Mime>() {
                    mime_types.push(mime);
                }
            }
        }

        if mime_types.is_empty() {
            return Err(headers::Error::invalid());
        }

        Ok(Accept(mime_types))
    }

    fn encode<E>(&self, values: &mut E)
    where
        E: Extend<HeaderValue>,
    {
        let str = self
            .0
            .iter()
            .map(|mime| mime.to_string())
            .collect::<Vec<_>>()
            .join(", ");

        if let Ok(value) = HeaderValue::from_str(&str) {
            values.extend(std::iter::once(value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use headers::{Header, HeaderValue};

    fn decode(raw: &'static str) -> Result<Accept, headers::Error> {
        let header_value = HeaderValue::from_static(raw);
        let mut values = std::iter::once(&header_value);
        Accept::decode(&mut values)
    }

    #[test]
    fn test_accept_header_browser_navigation() {
        let accept = decode(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        )
        .unwrap();
        assert_eq!(accept.0.len(), 6);
        assert_eq!(accept.0[0].subtype(), "html");
        assert!(!accept.prefers_json());
    }

    #[test]
    fn test_accept_header_json_client() {
        let accept = decode("application/json, text/plain, */*").unwrap();
        assert!(accept.prefers_json());

        let accept = decode("text/html, application/json").unwrap();
        assert!(!accept.prefers_json());
    }

    #[test]
    fn test_accept_header_wildcard_only() {
        let accept = decode("*/*").unwrap();
        assert_eq!(accept.0.len(), 1);
        assert!(!accept.prefers_json());
    }

    #[test]
    fn test_accept_header_with_whitespace_and_empty_segments() {
        let accept = decode("  image/png  ,, image/jpeg  ,").unwrap();
        assert_eq!(accept.0.len(), 2);
        assert_eq!(accept.0[0].subtype(), "png");
        assert_eq!(accept.0[1].subtype(), "jpeg");
    }

    #[test]
    fn test_accept_header_skips_invalid_ranges() {
        let accept = decode("invalid-mime-type, application/json").unwrap();
        assert_eq!(accept.0.len(), 1);
        assert!(accept.prefers_json());

        assert!(decode("invalid-mime-type").is_err());
        assert!(decode("").is_err());
    }

    #[test]
    fn test_accept_header_encode() {
        let accept = Accept(vec![
            "application/json".parse().unwrap(),
            "text/html".parse().unwrap(),
        ]);
        let mut values = Vec::new();
        accept.encode(&mut values);

        assert_eq!(values.len(), 1);
        assert_eq!(values[0].to_str().unwrap(), "application/json, text/html");
        assert_eq!(Accept::name(), &http::header::ACCEPT);
    }
}
