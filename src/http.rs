use std::fmt::{self, Display};

/// HTTP request methods this crate's router dispatches on.
///
/// https://developer.mozilla.org/en-US/docs/Web/HTTP/Methods
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        })
    }
}

impl TryFrom<&str> for Method {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        // http method is case sensitive
        match value {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            _ => anyhow::bail!("invalid http method: {}", value),
        }
    }
}

/// Reason phrase for a status code, following the conventional IANA
/// phrases used by the codes this core writes or reacts to. Unknown codes
/// fall back to `"Unknown"` rather than failing.
pub fn reason_phrase(code: u16) -> &'static str {
    match code {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        415 => "Unsupported Media Type",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_round_trips_through_display_and_try_from() {
        for m in [
            Method::Get,
            Method::Post,
            Method::Put,
            Method::Patch,
            Method::Delete,
        ] {
            let s = m.to_string();
            assert_eq!(Method::try_from(s.as_str()).unwrap(), m);
        }
    }

    #[test]
    fn unknown_method_is_rejected() {
        assert!(Method::try_from("TRACE").is_err());
    }

    #[test]
    fn unmapped_status_is_unknown() {
        assert_eq!(reason_phrase(799), "Unknown");
        assert_eq!(reason_phrase(404), "Not Found");
    }
}
