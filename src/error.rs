//! The status/error taxonomy returned by every fallible operation in this crate.
use core::fmt::{self, Display};

/// Status returned by value from every codec, state-tracker, and engine operation.
///
/// `Success` is part of the enum rather than modeled as `Result<(), MqttStatus>`
/// because several call sites need to distinguish more than two outcomes without
/// collapsing them into a nested `Result`. Call sites that only ever have a single
/// success shape use [`MqttStatus::into_result`] to get `?`-friendly error handling.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MqttStatus {
    /// Operation completed normally.
    Success,
    /// Null input, zero packet id, invalid QoS, malformed user input.
    BadParameter,
    /// Provided buffer too small for the packet being built.
    NoMemory,
    /// Transport::send returned an error or made zero progress.
    SendFailed,
    /// Transport::recv returned a fatal negative value.
    RecvFailed,
    /// Wire bytes failed validation (reserved bits, length overflow, unexpected type).
    BadResponse,
    /// CONNACK carried a non-zero return code.
    ServerRefused,
    /// Non-fatal: recv returned 0 bytes. Used internally by the process loop.
    NoDataAvailable,
    /// PINGRESP was not received within the ping response timeout.
    KeepAliveTimeout,
    /// The state tracker returned `StateNull` where a valid next state was required.
    IllegalState,
}

impl MqttStatus {
    /// Whether this status represents a successful operation.
    pub fn is_success(self) -> bool {
        matches!(self, MqttStatus::Success)
    }

    /// Convert into a `Result`, for use with `?` at internal call sites.
    pub fn into_result(self) -> Result<(), MqttStatus> {
        match self {
            MqttStatus::Success => Ok(()),
            other => Err(other),
        }
    }
}

impl Display for MqttStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::Success => "operation completed successfully",
            Self::BadParameter => "a parameter was null, zero, or otherwise invalid",
            Self::NoMemory => "the provided buffer is too small for this packet",
            Self::SendFailed => "the transport failed to send bytes",
            Self::RecvFailed => "the transport failed to receive bytes",
            Self::BadResponse => "the peer sent a malformed or unexpected packet",
            Self::ServerRefused => "the server refused the connection",
            Self::NoDataAvailable => "no data is currently available to receive",
            Self::KeepAliveTimeout => "no PINGRESP was received within the timeout",
            Self::IllegalState => "the publish state tracker reached an illegal state",
        };
        write!(f, "{msg}")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for MqttStatus {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn success_converts_to_ok() {
        assert_eq!(MqttStatus::Success.into_result(), Ok(()));
    }

    #[test]
    fn failure_converts_to_err() {
        assert_eq!(
            MqttStatus::NoMemory.into_result(),
            Err(MqttStatus::NoMemory)
        );
    }

    #[test]
    fn display_has_no_trailing_punctuation() {
        for status in [
            MqttStatus::Success,
            MqttStatus::BadParameter,
            MqttStatus::NoMemory,
            MqttStatus::SendFailed,
            MqttStatus::RecvFailed,
            MqttStatus::BadResponse,
            MqttStatus::ServerRefused,
            MqttStatus::NoDataAvailable,
            MqttStatus::KeepAliveTimeout,
            MqttStatus::IllegalState,
        ] {
            let rendered = status.to_string();
            assert!(!rendered.ends_with('.'));
        }
    }
}
