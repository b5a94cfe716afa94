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

//! Collecting diagnostic sink.

use busd_link::{DiagnosticEvent, DiagnosticSink, Severity};
use std::sync::Mutex;

/// Sink that stores every diagnostic for later assertions.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.lock().expect("lock events").clone()
    }

    pub fn has_code(&self, severity: Severity, code: u16) -> bool {
        self.events
            .lock()
            .expect("lock events")
            .iter()
            .any(|event| event.severity == severity && event.code == code)
    }
}

impl DiagnosticSink for RecordingSink {
    fn emit(&self, event: DiagnosticEvent) {
        self.events.lock().expect("lock events").push(event);
    }
}
