//! Ordered, capacity-bounded header list.
//!
//! Names keep the casing they were given; lookups are case-insensitive and
//! return the first match. Duplicates are kept in arrival order.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::error::{HttpError, Result};
use crate::types::{HTTP_MAX_HEADERS, HTTP_MAX_HEADER_NAME, HTTP_MAX_HEADER_VALUE};
use crate::utils::eq_ignore_case;

/// A single `Name: Value` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<Header>,
}

impl Headers {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append a header.
    ///
    /// BufferOverflow when the list already holds `HTTP_MAX_HEADERS` entries
    /// or the name/value does not fit its fixed limit.
    pub fn push(&mut self, name: &str, value: &str) -> Result<()> {
        if self.entries.len() >= HTTP_MAX_HEADERS
            || name.len() >= HTTP_MAX_HEADER_NAME
            || value.len() >= HTTP_MAX_HEADER_VALUE
        {
            return Err(HttpError::BufferOverflow);
        }
        self.entries.push(Header {
            name: name.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    /// First value whose name matches, ignoring case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|h| eq_ignore_case(&h.name, name))
            .map(|h| h.value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Header> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
