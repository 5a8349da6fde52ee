use crate::registry::DeviceId;

/// All error types surfaced by the registry and the platform.
///
/// Nothing here is fatal to the host process: callers of the characteristic
/// bindings degrade to cached or default values.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The device is offline; expected for sleeping or power-cycled bulbs.
    #[error("device {0} is unreachable")]
    DeviceUnreachable(DeviceId),

    /// A live transport call failed although the device is reachable.
    #[error("transient i/o failure on device {id} during {action}: {reason}")]
    TransientIo {
        id: DeviceId,
        action: String,
        reason: String,
    },

    /// Hardware info has not been resolved yet; callers should assume a
    /// white-only bulb.
    #[error("capabilities of device {0} are not resolved")]
    CapabilityUnresolved(DeviceId),

    /// No record exists for the device.
    #[error("device {0} not found")]
    DeviceNotFound(DeviceId),

    /// A characteristic value was out of range or of the wrong kind.
    #[error("invalid value for {target}: {reason}")]
    InvalidValue { target: String, reason: String },

    /// Attempted to send a [`crate::Mutation`] with no attributes set.
    #[error("invalid mutation; no attributes set")]
    NoAttribute,

    /// Failed to serialize data to JSON.
    #[error("failed to dump json: {0:?}")]
    JsonDump(serde_json::Error),

    /// Failed to deserialize JSON data.
    #[error("failed to load json: {0:?}")]
    JsonLoad(serde_json::Error),

    /// Reading or writing the device cache failed.
    #[error("cache {action} error: {err:?}")]
    Io { action: String, err: std::io::Error },
}

impl Error {
    /// Create a new transient i/o error
    pub fn transient(id: &DeviceId, action: &str, reason: impl ToString) -> Self {
        Error::TransientIo {
            id: id.clone(),
            action: action.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a new invalid value error
    pub fn invalid_value(target: &str, reason: &str) -> Self {
        Error::InvalidValue {
            target: target.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a new cache i/o error
    pub fn io(action: &str, err: std::io::Error) -> Self {
        Error::Io {
            action: action.to_string(),
            err,
        }
    }

    /// Whether the failure is the expected offline condition rather than a fault.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Error::DeviceUnreachable(_))
    }
}

/// Hacky implementation of PartialEq for testing
#[cfg(test)]
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}
