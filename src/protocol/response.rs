//! Response definitions
//!
//! Represents responses to clients. Status codes mirror the HTTP statuses of
//! a `/v1/{key}` REST interface.

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    /// 200
    Ok = 0x00,
    /// 404
    NotFound = 0x01,
    /// 500
    Error = 0x02,
    /// 201, returned for a successful PUT
    Created = 0x03,
    /// 413
    TooLarge = 0x04,
}

impl Status {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Status::Ok),
            0x01 => Some(Status::NotFound),
            0x02 => Some(Status::Error),
            0x03 => Some(Status::Created),
            0x04 => Some(Status::TooLarge),
            _ => None,
        }
    }

    /// Equivalent HTTP status code
    pub fn http_code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::Created => 201,
            Status::NotFound => 404,
            Status::TooLarge => 413,
            Status::Error => 500,
        }
    }
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Optional payload (value for GET, message for errors)
    pub payload: Option<Vec<u8>>,
}

impl Response {
    /// Create an OK response with optional payload
    pub fn ok(payload: Option<Vec<u8>>) -> Self {
        Self {
            status: Status::Ok,
            payload,
        }
    }

    /// Create a CREATED response
    pub fn created() -> Self {
        Self {
            status: Status::Created,
            payload: None,
        }
    }

    /// Create a NOT_FOUND response
    pub fn not_found() -> Self {
        Self {
            status: Status::NotFound,
            payload: None,
        }
    }

    /// Create a TOO_LARGE response
    pub fn too_large(message: &str) -> Self {
        Self {
            status: Status::TooLarge,
            payload: Some(message.as_bytes().to_vec()),
        }
    }

    /// Create an ERROR response
    pub fn error(message: &str) -> Self {
        Self {
            status: Status::Error,
            payload: Some(message.as_bytes().to_vec()),
        }
    }

    /// Payload as text (lossy)
    pub fn payload_str(&self) -> Option<String> {
        self.payload
            .as_ref()
            .map(|p| String::from_utf8_lossy(p).into_owned())
    }
}
