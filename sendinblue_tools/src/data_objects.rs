use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub email: String,
    #[serde(default, rename = "listIds")]
    pub list_ids: Vec<i64>,
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
}

/// The delta `update_or_add_contact` computes before touching the remote contact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactUpdate {
    pub create: bool,
    pub link_lists: Vec<i64>,
    pub unlink_lists: Vec<i64>,
    pub set_attributes: bool,
}

impl ContactUpdate {
    pub fn is_noop(&self) -> bool {
        !self.create && !self.set_attributes && self.link_lists.is_empty() && self.unlink_lists.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionalEmail {
    pub to: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub html_content: String,
}

impl TransactionalEmail {
    pub fn new<S1: Into<String>, S2: Into<String>, S3: Into<String>>(to: S1, subject: S2, html_content: S3) -> Self {
        Self { to: to.into(), to_name: None, subject: subject.into(), html_content: html_content.into() }
    }

    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.to_name = Some(name.into());
        self
    }
}
