//! Credential wrapper for the store's config structs.
//!
//! The server config carries the API secret, the gateway webhook secret and two third-party API keys,
//! and the whole config gets logged at startup. Wrapping each credential in [`Secret`] makes any
//! `Debug`/`Display` rendering print a placeholder; reading the value is explicit via [`Secret::reveal`].

use std::fmt;

const PLACEHOLDER: &str = "<hidden>";

#[derive(Clone)]
pub struct Secret<T>(T)
where T: Clone;

impl<T: Clone> Secret<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// The wrapped credential. Call sites name the access so a grep for `reveal` finds every place a
    /// secret leaves the wrapper.
    pub fn reveal(&self) -> &T {
        &self.0
    }
}

impl<T: Clone + Default> Default for Secret<T> {
    fn default() -> Self {
        Self(T::default())
    }
}

impl<T: Clone> From<T> for Secret<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

impl<T: Clone> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(PLACEHOLDER)
    }
}

impl<T: Clone> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(PLACEHOLDER)
    }
}
