//! # HTTP Status Codes
//!
//! A closed enumeration of known HTTP status codes with range-based
//! classification. Anything unmapped (including the absence of a response)
//! collapses to [`HttpStatusCode::Unknown`] rather than an error; status
//! classification never fails, it just degrades.

use std::fmt;

/// A known HTTP status code, or `Unknown` (0) for anything unmapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HttpStatusCode {
    /// Sentinel for unmapped codes and missing responses.
    #[default]
    Unknown = 0,
    Continue = 100,
    SwitchingProtocols = 101,
    Processing = 102,
    Checkpoint = 103,
    Ok = 200,
    Created = 201,
    Accepted = 202,
    NonAuthoritativeInformation = 203,
    NoContent = 204,
    ResetContent = 205,
    PartialContent = 206,
    MultiStatus = 207,
    AlreadyReported = 208,
    ImUsed = 226,
    MultipleChoices = 300,
    MovedPermanently = 301,
    Found = 302,
    SeeOther = 303,
    NotModified = 304,
    UseProxy = 305,
    TemporaryRedirect = 307,
    PermanentRedirect = 308,
    BadRequest = 400,
    Unauthorized = 401,
    PaymentRequired = 402,
    Forbidden = 403,
    NotFound = 404,
    MethodNotAllowed = 405,
    NotAcceptable = 406,
    ProxyAuthenticationRequired = 407,
    RequestTimeout = 408,
    Conflict = 409,
    Gone = 410,
    LengthRequired = 411,
    PreconditionFailed = 412,
    PayloadTooLarge = 413,
    UriTooLong = 414,
    UnsupportedMediaType = 415,
    RangeNotSatisfiable = 416,
    ExpectationFailed = 417,
    ImATeapot = 418,
    MisdirectedRequest = 421,
    UnprocessableEntity = 422,
    Locked = 423,
    FailedDependency = 424,
    UpgradeRequired = 426,
    PreconditionRequired = 428,
    TooManyRequests = 429,
    RequestHeaderFieldsTooLarge = 431,
    IisLoginTimeout = 440,
    NginxNoResponse = 444,
    IisRetryWith = 449,
    BlockedByWindowsParentalControls = 450,
    UnavailableForLegalReasons = 451,
    NginxSslCertificateError = 495,
    NginxSslCertificateRequired = 496,
    NginxHttpToHttps = 497,
    TokenExpired = 498,
    NginxClientClosedRequest = 499,
    InternalServerError = 500,
    NotImplemented = 501,
    BadGateway = 502,
    ServiceUnavailable = 503,
    GatewayTimeout = 504,
    HttpVersionNotSupported = 505,
    VariantAlsoNegotiates = 506,
    InsufficientStorage = 507,
    LoopDetected = 508,
    BandwidthLimitExceeded = 509,
    NotExtended = 510,
    NetworkAuthenticationRequired = 511,
    SiteIsFrozen = 530,
}

impl HttpStatusCode {
    /// Map a numeric code onto the enumeration. Unmapped values become
    /// `Unknown`.
    pub fn from_code(code: u16) -> Self {
        match code {
            100 => Self::Continue,
            101 => Self::SwitchingProtocols,
            102 => Self::Processing,
            103 => Self::Checkpoint,
            200 => Self::Ok,
            201 => Self::Created,
            202 => Self::Accepted,
            203 => Self::NonAuthoritativeInformation,
            204 => Self::NoContent,
            205 => Self::ResetContent,
            206 => Self::PartialContent,
            207 => Self::MultiStatus,
            208 => Self::AlreadyReported,
            226 => Self::ImUsed,
            300 => Self::MultipleChoices,
            301 => Self::MovedPermanently,
            302 => Self::Found,
            303 => Self::SeeOther,
            304 => Self::NotModified,
            305 => Self::UseProxy,
            307 => Self::TemporaryRedirect,
            308 => Self::PermanentRedirect,
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            402 => Self::PaymentRequired,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            405 => Self::MethodNotAllowed,
            406 => Self::NotAcceptable,
            407 => Self::ProxyAuthenticationRequired,
            408 => Self::RequestTimeout,
            409 => Self::Conflict,
            410 => Self::Gone,
            411 => Self::LengthRequired,
            412 => Self::PreconditionFailed,
            413 => Self::PayloadTooLarge,
            414 => Self::UriTooLong,
            415 => Self::UnsupportedMediaType,
            416 => Self::RangeNotSatisfiable,
            417 => Self::ExpectationFailed,
            418 => Self::ImATeapot,
            421 => Self::MisdirectedRequest,
            422 => Self::UnprocessableEntity,
            423 => Self::Locked,
            424 => Self::FailedDependency,
            426 => Self::UpgradeRequired,
            428 => Self::PreconditionRequired,
            429 => Self::TooManyRequests,
            431 => Self::RequestHeaderFieldsTooLarge,
            440 => Self::IisLoginTimeout,
            444 => Self::NginxNoResponse,
            449 => Self::IisRetryWith,
            450 => Self::BlockedByWindowsParentalControls,
            451 => Self::UnavailableForLegalReasons,
            495 => Self::NginxSslCertificateError,
            496 => Self::NginxSslCertificateRequired,
            497 => Self::NginxHttpToHttps,
            498 => Self::TokenExpired,
            499 => Self::NginxClientClosedRequest,
            500 => Self::InternalServerError,
            501 => Self::NotImplemented,
            502 => Self::BadGateway,
            503 => Self::ServiceUnavailable,
            504 => Self::GatewayTimeout,
            505 => Self::HttpVersionNotSupported,
            506 => Self::VariantAlsoNegotiates,
            507 => Self::InsufficientStorage,
            508 => Self::LoopDetected,
            509 => Self::BandwidthLimitExceeded,
            510 => Self::NotExtended,
            511 => Self::NetworkAuthenticationRequired,
            530 => Self::SiteIsFrozen,
            _ => Self::Unknown,
        }
    }

    /// Classify a raw value that may be absent, negative, or out of range
    /// (e.g. a connection that produced no response at all).
    pub fn from_raw(raw: Option<i64>) -> Self {
        match raw {
            Some(code) if (0..=u16::MAX as i64).contains(&code) => Self::from_code(code as u16),
            _ => Self::Unknown,
        }
    }

    /// Classify the status of an HTTP response, `None` standing for
    /// "no response received".
    pub fn from_response(response: Option<&reqwest::Response>) -> Self {
        match response {
            Some(response) => Self::from_code(response.status().as_u16()),
            None => Self::Unknown,
        }
    }

    /// The numeric code.
    pub const fn code(self) -> u16 {
        self as u16
    }

    /// 1xx: request received, processing continues.
    pub const fn is_informational(self) -> bool {
        self.is_in(100, 199)
    }

    /// 2xx: request succeeded.
    pub const fn is_success(self) -> bool {
        self.is_in(200, 299)
    }

    /// 3xx: further action needed to complete the request.
    pub const fn is_redirection(self) -> bool {
        self.is_in(300, 399)
    }

    /// 4xx: the request is at fault.
    pub const fn is_client_error(self) -> bool {
        self.is_in(400, 499)
    }

    /// 5xx: the server is at fault.
    pub const fn is_server_error(self) -> bool {
        self.is_in(500, 599)
    }

    const fn is_in(self, low: u16, high: u16) -> bool {
        let code = self.code();
        code >= low && code <= high
    }

    /// Human-readable reason phrase for the code.
    pub const fn reason_phrase(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Continue => "Continue",
            Self::SwitchingProtocols => "Switching Protocols",
            Self::Processing => "Processing",
            Self::Checkpoint => "Checkpoint",
            Self::Ok => "OK",
            Self::Created => "Created",
            Self::Accepted => "Accepted",
            Self::NonAuthoritativeInformation => "Non-Authoritative Information",
            Self::NoContent => "No Content",
            Self::ResetContent => "Reset Content",
            Self::PartialContent => "Partial Content",
            Self::MultiStatus => "Multi-Status",
            Self::AlreadyReported => "Already Reported",
            Self::ImUsed => "IM Used",
            Self::MultipleChoices => "Multiple Choices",
            Self::MovedPermanently => "Moved Permanently",
            Self::Found => "Found",
            Self::SeeOther => "See Other",
            Self::NotModified => "Not Modified",
            Self::UseProxy => "Use Proxy",
            Self::TemporaryRedirect => "Temporary Redirect",
            Self::PermanentRedirect => "Permanent Redirect",
            Self::BadRequest => "Bad Request",
            Self::Unauthorized => "Unauthorized",
            Self::PaymentRequired => "Payment Required",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "Not Found",
            Self::MethodNotAllowed => "Method Not Allowed",
            Self::NotAcceptable => "Not Acceptable",
            Self::ProxyAuthenticationRequired => "Proxy Authentication Required",
            Self::RequestTimeout => "Request Timeout",
            Self::Conflict => "Conflict",
            Self::Gone => "Gone",
            Self::LengthRequired => "Length Required",
            Self::PreconditionFailed => "Precondition Failed",
            Self::PayloadTooLarge => "Payload Too Large",
            Self::UriTooLong => "URI Too Long",
            Self::UnsupportedMediaType => "Unsupported Media Type",
            Self::RangeNotSatisfiable => "Range Not Satisfiable",
            Self::ExpectationFailed => "Expectation Failed",
            Self::ImATeapot => "I'm a Teapot",
            Self::MisdirectedRequest => "Misdirected Request",
            Self::UnprocessableEntity => "Unprocessable Entity",
            Self::Locked => "Locked",
            Self::FailedDependency => "Failed Dependency",
            Self::UpgradeRequired => "Upgrade Required",
            Self::PreconditionRequired => "Precondition Required",
            Self::TooManyRequests => "Too Many Requests",
            Self::RequestHeaderFieldsTooLarge => "Request Header Fields Too Large",
            Self::IisLoginTimeout => "Login Time-out",
            Self::NginxNoResponse => "No Response",
            Self::IisRetryWith => "Retry With",
            Self::BlockedByWindowsParentalControls => "Blocked by Windows Parental Controls",
            Self::UnavailableForLegalReasons => "Unavailable For Legal Reasons",
            Self::NginxSslCertificateError => "SSL Certificate Error",
            Self::NginxSslCertificateRequired => "SSL Certificate Required",
            Self::NginxHttpToHttps => "HTTP Request Sent to HTTPS Port",
            Self::TokenExpired => "Token Expired",
            Self::NginxClientClosedRequest => "Client Closed Request",
            Self::InternalServerError => "Internal Server Error",
            Self::NotImplemented => "Not Implemented",
            Self::BadGateway => "Bad Gateway",
            Self::ServiceUnavailable => "Service Unavailable",
            Self::GatewayTimeout => "Gateway Timeout",
            Self::HttpVersionNotSupported => "HTTP Version Not Supported",
            Self::VariantAlsoNegotiates => "Variant Also Negotiates",
            Self::InsufficientStorage => "Insufficient Storage",
            Self::LoopDetected => "Loop Detected",
            Self::BandwidthLimitExceeded => "Bandwidth Limit Exceeded",
            Self::NotExtended => "Not Extended",
            Self::NetworkAuthenticationRequired => "Network Authentication Required",
            Self::SiteIsFrozen => "Site Is Frozen",
        }
    }
}

impl From<u16> for HttpStatusCode {
    fn from(code: u16) -> Self {
        Self::from_code(code)
    }
}

/// Success codes render bare (`200`); everything else carries its phrase
/// (`404 - Not Found`) since those are the ones people end up reading.
impl fmt::Display for HttpStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_success() {
            write!(f, "{}", self.code())
        } else {
            write!(f, "{} - {}", self.code(), self.reason_phrase())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every code the enum declares, for exhaustive sweeps.
    const DECLARED: &[u16] = &[
        100, 101, 102, 103, 200, 201, 202, 203, 204, 205, 206, 207, 208, 226, 300, 301, 302, 303,
        304, 305, 307, 308, 400, 401, 402, 403, 404, 405, 406, 407, 408, 409, 410, 411, 412, 413,
        414, 415, 416, 417, 418, 421, 422, 423, 424, 426, 428, 429, 431, 440, 444, 449, 450, 451,
        495, 496, 497, 498, 499, 500, 501, 502, 503, 504, 505, 506, 507, 508, 509, 510, 511, 530,
    ];

    #[test]
    fn test_declared_codes_round_trip() {
        for &code in DECLARED {
            let status = HttpStatusCode::from_code(code);
            assert_ne!(status, HttpStatusCode::Unknown, "code {code} should be known");
            assert_eq!(status.code(), code);
        }
    }

    #[test]
    fn test_unmapped_codes_are_unknown() {
        for code in [0u16, 1, 99, 104, 227, 306, 419, 600, 999, u16::MAX] {
            assert_eq!(HttpStatusCode::from_code(code), HttpStatusCode::Unknown);
        }
    }

    #[test]
    fn test_from_raw_absent_and_negative() {
        assert_eq!(HttpStatusCode::from_raw(None), HttpStatusCode::Unknown);
        assert_eq!(HttpStatusCode::from_raw(Some(-1)), HttpStatusCode::Unknown);
        assert_eq!(HttpStatusCode::from_raw(Some(-404)), HttpStatusCode::Unknown);
        assert_eq!(HttpStatusCode::from_raw(Some(i64::MAX)), HttpStatusCode::Unknown);
        assert_eq!(HttpStatusCode::from_raw(Some(404)), HttpStatusCode::NotFound);
    }

    #[test]
    fn test_exactly_one_class_per_code() {
        for &code in DECLARED {
            let status = HttpStatusCode::from_code(code);
            let classes = [
                status.is_informational(),
                status.is_success(),
                status.is_redirection(),
                status.is_client_error(),
                status.is_server_error(),
            ];
            assert_eq!(
                classes.iter().filter(|&&c| c).count(),
                1,
                "code {code} must fall in exactly one class"
            );
            // The true predicate matches the hundreds digit.
            let expected = (code / 100) as usize - 1;
            assert!(classes[expected], "code {code} should classify by its hundreds digit");
        }
    }

    #[test]
    fn test_unknown_has_no_class() {
        let status = HttpStatusCode::Unknown;
        assert!(!status.is_informational());
        assert!(!status.is_success());
        assert!(!status.is_redirection());
        assert!(!status.is_client_error());
        assert!(!status.is_server_error());
    }

    #[test]
    fn test_display_success_is_bare_number() {
        assert_eq!(HttpStatusCode::Ok.to_string(), "200");
        assert_eq!(HttpStatusCode::NoContent.to_string(), "204");
    }

    #[test]
    fn test_display_non_success_carries_phrase() {
        assert_eq!(HttpStatusCode::NotFound.to_string(), "404 - Not Found");
        assert_eq!(
            HttpStatusCode::InternalServerError.to_string(),
            "500 - Internal Server Error"
        );
        assert_eq!(HttpStatusCode::Unknown.to_string(), "0 - unknown");
        assert_eq!(HttpStatusCode::Found.to_string(), "302 - Found");
    }

    #[test]
    fn test_from_u16_conversion() {
        assert_eq!(HttpStatusCode::from(418), HttpStatusCode::ImATeapot);
        assert_eq!(HttpStatusCode::from(200), HttpStatusCode::Ok);
    }
}
