/// Per-item operation outcomes and their wire codes
///
/// A `Status` is the structured result carried by every batch result slot.
/// Codes are stable on the wire; unknown codes decode to `None`.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum Status {
    Ok = 0,
    TableDoesntExist = 2,
    ObjectDoesntExist = 3,
    ObjectExists = 4,
    WrongVersion = 5,
    InvalidArgument = 9,
    SystemicFailure = 21,
}

impl Status {
    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Status> {
        match code {
            0 => Some(Status::Ok),
            2 => Some(Status::TableDoesntExist),
            3 => Some(Status::ObjectDoesntExist),
            4 => Some(Status::ObjectExists),
            5 => Some(Status::WrongVersion),
            9 => Some(Status::InvalidArgument),
            21 => Some(Status::SystemicFailure),
            _ => None,
        }
    }

    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }

    /// Converts the status into a `Result`, for callers that prefer `?`.
    pub fn into_result(self) -> Result<()> {
        match self {
            Status::Ok => Ok(()),
            Status::TableDoesntExist => Err(Error::TableDoesntExist("unknown table id".into())),
            Status::ObjectDoesntExist => Err(Error::ObjectDoesntExist),
            Status::ObjectExists => Err(Error::ObjectExists),
            Status::WrongVersion => Err(Error::WrongVersion),
            Status::InvalidArgument => Err(Error::InvalidArgument("rejected by cluster".into())),
            Status::SystemicFailure => Err(Error::SystemicFailure("cluster failure".into())),
        }
    }
}

impl From<&Error> for Status {
    fn from(err: &Error) -> Self {
        err.status()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Ok => "STATUS_OK",
            Status::TableDoesntExist => "STATUS_TABLE_DOESNT_EXIST",
            Status::ObjectDoesntExist => "STATUS_OBJECT_DOESNT_EXIST",
            Status::ObjectExists => "STATUS_OBJECT_EXISTS",
            Status::WrongVersion => "STATUS_WRONG_VERSION",
            Status::InvalidArgument => "STATUS_INVALID_ARGUMENT",
            Status::SystemicFailure => "STATUS_SYSTEMIC_FAILURE",
        };
        write!(f, "{}({})", name, self.code())
    }
}
