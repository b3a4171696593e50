use std::{fmt, ops::Deref};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Partition key that isolates one tenant's chunks inside a shared store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Namespace(String);
impl Namespace {
	pub fn new(raw: impl AsRef<str>) -> Result<Self> {
		let trimmed = raw.as_ref().trim();

		if trimmed.is_empty() {
			return Err(Error::InvalidNamespace);
		}

		Ok(Self(trimmed.to_string()))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Deref for Namespace {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl fmt::Display for Namespace {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}
impl TryFrom<String> for Namespace {
	type Error = Error;

	fn try_from(value: String) -> Result<Self> {
		Self::new(value)
	}
}
impl From<Namespace> for String {
	fn from(value: Namespace) -> Self {
		value.0
	}
}
