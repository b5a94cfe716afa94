/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Severity-tagged, coded diagnostics emitted by chain stages.
//!
//! Stages report through a section-scoped [`Diag`] handle; the sink behind
//! it is a capability injected by the embedding daemon. The default
//! [`TracingSink`] renders diagnostics as structured `tracing` events.

use crate::observability::{events, fields};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tracing::error;

/// Numeric diagnostic codes carried alongside the severity.
pub mod codes {
    /// A connect has no driver attached.
    pub const NO_DRIVER: u16 = 55;
    /// Filter resolution, linking, or stage setup failed; also the fatal
    /// code for a tail stage that is not the registered driver.
    pub const FILTER_SETUP: u16 = 32;
    /// Chain traversal ended before reaching the driver.
    pub const CHAIN_EXHAUSTED: u16 = 33;
    /// The router's client-address pool is exhausted.
    pub const ADDR_POOL: u16 = 56;
    /// Transport open/close failed.
    pub const TRANSPORT_OPEN: u16 = 61;
    /// Transport transmit failed.
    pub const TRANSPORT_SEND: u16 = 62;
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Severity {
    /// Recoverable: the link stays unusable, the process continues.
    Error,
    /// Invariant violation in chain construction, not user misconfiguration.
    Fatal,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Fatal => write!(f, "fatal"),
        }
    }
}

/// One emitted diagnostic.
#[derive(Clone, Debug)]
pub struct DiagnosticEvent {
    pub severity: Severity,
    pub code: u16,
    pub section: String,
    pub message: String,
}

/// Sink accepting severity-tagged, formatted diagnostics.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, event: DiagnosticEvent);
}

/// Default sink rendering diagnostics through `tracing`.
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, event: DiagnosticEvent) {
        error!(
            event = events::DIAGNOSTIC,
            severity = %event.severity,
            code = event.code,
            section = event.section.as_str(),
            "{}",
            event.message
        );
    }
}

/// Section-scoped diagnostic handle held by every stage.
#[derive(Clone)]
pub struct Diag {
    section: String,
    sink: Arc<dyn DiagnosticSink>,
}

impl Diag {
    /// Creates a root handle with no section context.
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            section: String::new(),
            sink,
        }
    }

    /// Derives a handle scoped to a configuration section.
    pub fn with_section(&self, section: &str) -> Self {
        Self {
            section: section.to_string(),
            sink: self.sink.clone(),
        }
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    pub fn error(&self, code: u16, message: impl Into<String>) {
        self.emit(Severity::Error, code, message.into());
    }

    pub fn fatal(&self, code: u16, message: impl Into<String>) {
        self.emit(Severity::Fatal, code, message.into());
    }

    fn emit(&self, severity: Severity, code: u16, message: String) {
        self.sink.emit(DiagnosticEvent {
            severity,
            code,
            section: self.section.clone(),
            message,
        });
    }
}

impl fmt::Debug for Diag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diag")
            .field(fields::SECTION, &self.section)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{Diag, DiagnosticEvent, DiagnosticSink, Severity};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct CollectingSink {
        events: Mutex<Vec<DiagnosticEvent>>,
    }

    impl DiagnosticSink for CollectingSink {
        fn emit(&self, event: DiagnosticEvent) {
            self.events.lock().expect("lock events").push(event);
        }
    }

    #[test]
    fn with_section_scopes_emitted_events() {
        let sink = Arc::new(CollectingSink::default());
        let root = Diag::new(sink.clone());
        let scoped = root.with_section("tpuart");

        scoped.error(55, "no driver");
        scoped.fatal(33, "no driver at tail");

        let events = sink.events.lock().expect("lock events");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].severity, Severity::Error);
        assert_eq!(events[0].code, 55);
        assert_eq!(events[0].section, "tpuart");
        assert_eq!(events[1].severity, Severity::Fatal);
    }

    #[test]
    fn severity_display_is_stable() {
        assert_eq!(Severity::Error.to_string(), "error");
        assert_eq!(Severity::Fatal.to_string(), "fatal");
    }
}
