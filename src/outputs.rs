// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deferred Stack Outputs
//!
//! An [`OutputRef`] names an attribute of a declared resource. It is valid at
//! build time (it points at a graph node) but its value only exists once a
//! provisioning engine has realized that resource. [`Output`] is the consumer
//! side: `None` until the stack publishes it, awaitable with [`Output::wait`].

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::watch;

use crate::domain::LogicalName;
use crate::errors::{EngineError, EngineResult};

/// Build-time placeholder for an attribute of a declared resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputRef {
    pub resource: LogicalName,
    pub attribute: String,
}

impl OutputRef {
    pub fn new(resource: LogicalName, attribute: impl Into<String>) -> Self {
        Self {
            resource,
            attribute: attribute.into(),
        }
    }
}

impl fmt::Display for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource, self.attribute)
    }
}

/// A named stack output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Export {
    pub name: String,
    pub source: OutputRef,
}

/// Consumer handle on a stack output
#[derive(Debug, Clone)]
pub struct Output {
    name: String,
    source: OutputRef,
    receiver: watch::Receiver<Option<String>>,
}

impl Output {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &OutputRef {
        &self.source
    }

    /// Current value; `None` until the source resource is realized
    pub fn get(&self) -> Option<String> {
        self.receiver.borrow().clone()
    }

    pub fn is_available(&self) -> bool {
        self.receiver.borrow().is_some()
    }

    /// Wait until the value is published
    pub async fn wait(&mut self) -> EngineResult<String> {
        let value = self
            .receiver
            .wait_for(Option::is_some)
            .await
            .map_err(|_| EngineError::OutputUnavailable(self.name.clone()))?;

        value
            .clone()
            .ok_or_else(|| EngineError::OutputUnavailable(self.name.clone()))
    }
}

/// Producer side of one output, owned by the stack
#[derive(Debug)]
pub(crate) struct OutputSlot {
    export: Export,
    sender: watch::Sender<Option<String>>,
}

impl OutputSlot {
    pub(crate) fn new(export: Export) -> Self {
        let (sender, _) = watch::channel(None);
        Self { export, sender }
    }

    pub(crate) fn export(&self) -> &Export {
        &self.export
    }

    pub(crate) fn subscribe(&self) -> Output {
        Output {
            name: self.export.name.clone(),
            source: self.export.source.clone(),
            receiver: self.sender.subscribe(),
        }
    }

    pub(crate) fn current(&self) -> Option<String> {
        self.sender.borrow().clone()
    }

    pub(crate) fn publish(&self, value: String) {
        self.sender.send_replace(Some(value));
    }

    pub(crate) fn clear(&self) {
        self.sender.send_replace(None);
    }
}
