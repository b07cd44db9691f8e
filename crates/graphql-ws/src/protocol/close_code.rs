/// Close codes in the private 4000-4999 range, signalling a protocol failure
/// distinctly from an ordinary websocket closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::FromRepr, strum::EnumIter)]
#[repr(u16)]
pub enum CloseCode {
    InternalServerError = 4500,
    InternalClientError = 4005,
    BadRequest = 4400,
    BadResponse = 4004,
    /// Tried subscribing before connect ack
    Unauthorized = 4401,
    Forbidden = 4403,
    SubprotocolNotAcceptable = 4406,
    ConnectionInitialisationTimeout = 4408,
    ConnectionAcknowledgementTimeout = 4504,
    /// Subscriber distinction is very important
    SubscriberAlreadyExists = 4409,
    TooManyInitialisationRequests = 4429,
}

/// The standard websocket code for a normal closure.
pub const NORMAL_CLOSURE: u16 = 1000;

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> u16 {
        code as u16
    }
}

impl TryFrom<u16> for CloseCode {
    type Error = u16;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        CloseCode::from_repr(code).ok_or(code)
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::CloseCode;

    #[test]
    fn santity_check_discriminant() {
        for value in CloseCode::iter() {
            assert_eq!(Ok(value), CloseCode::try_from(u16::from(value)));
            assert!((4000..5000).contains(&u16::from(value)));
        }
    }

    #[test]
    fn well_known_values() {
        assert_eq!(u16::from(CloseCode::BadRequest), 4400);
        assert_eq!(u16::from(CloseCode::BadResponse), 4004);
        assert_eq!(u16::from(CloseCode::SubprotocolNotAcceptable), 4406);
        assert_eq!(CloseCode::try_from(1000), Err(1000));
    }
}
