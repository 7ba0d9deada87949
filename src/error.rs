use std::error::Error as StdError;

#[derive(Debug)]
pub enum Error {
    /// The embedding caller touched an address this controller does not map.
    Addressing {
        address: usize,
        source: Option<String>,
    },
    /// A documented API precondition was violated by the embedding caller.
    PreconditionViolation { what: String },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> core::result::Result<(), std::fmt::Error> {
        match self {
            Error::Addressing { address, source } => {
                if let Some(source) = source {
                    write!(f, "AddressingError at {:x} from {}", address, source)
                } else {
                    write!(f, "AddressingError at {:x}", address)
                }
            }
            Error::PreconditionViolation { what } => {
                write!(f, "PreconditionViolation: {}", what)
            }
        }
    }
}

impl StdError for Error {}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn from_address_with_source(address: usize, source: String) -> Self {
        Error::Addressing {
            address,
            source: Some(source),
        }
    }

    pub fn precondition(what: impl Into<String>) -> Self {
        Error::PreconditionViolation { what: what.into() }
    }
}
