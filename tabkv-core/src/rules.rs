/// Conditional rules for optimistic concurrency control
///
/// A `RejectRules` value is a precondition the cluster evaluates atomically
/// with a read or mutation. Set flags are checked conjunctively: existence
/// checks first, then version checks, and the first failure is reported.

use crate::status::Status;
use crate::types::{Version, VERSION_NONEXISTENT};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Fail with `ObjectDoesntExist` when the object is absent.
pub const REQUIRE_EXISTS: u32 = 1;
/// Fail with `ObjectExists` when the object is present.
pub const REQUIRE_ABSENT: u32 = 1 << 1;
/// Fail with `WrongVersion` when the current version is greater than the given one.
pub const VERSION_AT_MOST: u32 = 1 << 2;
/// Fail with `WrongVersion` when the current version equals the given one.
pub const VERSION_NOT_EQUAL: u32 = 1 << 3;

const ALL_FLAGS: u32 = REQUIRE_EXISTS | REQUIRE_ABSENT | VERSION_AT_MOST | VERSION_NOT_EQUAL;
const VERSION_FLAGS: u32 = VERSION_AT_MOST | VERSION_NOT_EQUAL;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RejectRules {
    flags: u32,
    given_version: Version,
}

impl RejectRules {
    /// Empty rule set; every state passes
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode rules from their wire form.
    pub fn from_wire(flags: u32, given_version: Version) -> Result<Self> {
        if flags & !ALL_FLAGS != 0 {
            return Err(Error::InvalidArgument(format!(
                "unknown reject rule flags: {:#x}",
                flags & !ALL_FLAGS
            )));
        }
        let given_version = if flags & VERSION_FLAGS != 0 {
            given_version
        } else {
            VERSION_NONEXISTENT
        };
        Ok(Self {
            flags,
            given_version,
        })
    }

    /// The wire form: (flag field, given version).
    pub fn to_wire(&self) -> (u32, Version) {
        (self.flags, self.given_version)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn reject_if_doesnt_exist(mut self) -> Self {
        self.flags |= REQUIRE_EXISTS;
        self
    }

    pub fn reject_if_exists(mut self) -> Self {
        self.flags |= REQUIRE_ABSENT;
        self
    }

    /// Require the current version to be at most `version`.
    pub fn reject_if_version_greater(mut self, version: Version) -> Self {
        self.given_version = version;
        self.flags |= VERSION_AT_MOST;
        self
    }

    /// Require the current version to differ from `version`.
    pub fn reject_if_version_eq(mut self, version: Version) -> Self {
        self.given_version = version;
        self.flags |= VERSION_NOT_EQUAL;
        self
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    pub fn given_version(&self) -> Version {
        self.given_version
    }

    pub fn is_empty(&self) -> bool {
        self.flags == 0
    }

    /// Evaluate the rules against the current state of an object.
    ///
    /// `current` is the live object's version, or `None` if it is absent.
    /// Absent objects are compared as `VERSION_NONEXISTENT`.
    pub fn check(&self, current: Option<Version>) -> Status {
        if self.flags & REQUIRE_EXISTS != 0 && current.is_none() {
            return Status::ObjectDoesntExist;
        }
        if self.flags & REQUIRE_ABSENT != 0 && current.is_some() {
            return Status::ObjectExists;
        }

        let version = current.unwrap_or(VERSION_NONEXISTENT);
        if self.flags & VERSION_AT_MOST != 0 && version > self.given_version {
            return Status::WrongVersion;
        }
        if self.flags & VERSION_NOT_EQUAL != 0 && version == self.given_version {
            return Status::WrongVersion;
        }
        Status::Ok
    }
}

/// Evaluate optional rules; no rules always pass.
pub fn check_rules(rules: Option<&RejectRules>, current: Option<Version>) -> Status {
    rules.map_or(Status::Ok, |r| r.check(current))
}
