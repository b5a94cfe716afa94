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

//! Shared test doubles for `busd-link` integration tests: recording
//! transports and router, a collecting diagnostic sink, and filter-logic
//! doubles for the chain-mutation failure paths.

mod logic;
mod router;
mod sink;
mod transports;

pub use logic::{
    FailingSetupLogic, PassLogic, RecordingLogic, RefuseDriversBelow, RefuseFiltersBelow,
    TrafficLog,
};
pub use router::{RecordingRouter, RouterEvent, StaticServer};
pub use sink::RecordingSink;
pub use transports::{FailingTransport, InstantTransport, ManualTransport};
