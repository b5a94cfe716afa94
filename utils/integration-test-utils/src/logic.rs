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

//! Filter-logic doubles exercising the chain-mutation failure paths.

use async_trait::async_trait;
use busd_link::{FilterLogic, FilterStage, Stage, Telegram};
use std::sync::{Arc, Mutex};

/// Pure pass-through logic; every hook keeps its default.
pub struct PassLogic;

impl FilterLogic for PassLogic {}

/// Accepts only a driver below: vetoes inserting another filter under it.
pub struct RefuseFiltersBelow;

impl FilterLogic for RefuseFiltersBelow {
    fn accept_link(&self, next: &Stage) -> bool {
        matches!(next, Stage::Driver(_))
    }
}

/// Accepts only a filter below: refuses to sit directly above the driver.
pub struct RefuseDriversBelow;

impl FilterLogic for RefuseDriversBelow {
    fn accept_link(&self, next: &Stage) -> bool {
        matches!(next, Stage::Filter(_))
    }
}

/// Logic whose setup always fails.
pub struct FailingSetupLogic;

#[async_trait]
impl FilterLogic for FailingSetupLogic {
    async fn setup(&self, _stage: &FilterStage) -> bool {
        false
    }
}

/// Shared view over the traffic a [`RecordingLogic`] has seen.
#[derive(Clone, Default)]
pub struct TrafficLog {
    recv: Arc<Mutex<Vec<Telegram>>>,
    send: Arc<Mutex<Vec<Telegram>>>,
}

impl TrafficLog {
    pub fn recv_seen(&self) -> Vec<Telegram> {
        self.recv.lock().expect("lock recv").clone()
    }

    pub fn send_seen(&self) -> Vec<Telegram> {
        self.send.lock().expect("lock send").clone()
    }
}

/// Pass-through logic recording every telegram in both directions.
pub struct RecordingLogic {
    log: TrafficLog,
}

impl RecordingLogic {
    pub fn new(log: TrafficLog) -> Self {
        Self { log }
    }
}

#[async_trait]
impl FilterLogic for RecordingLogic {
    async fn recv_telegram(&self, stage: &FilterStage, telegram: Telegram) {
        self.log
            .recv
            .lock()
            .expect("lock recv")
            .push(telegram.clone());
        stage.forward_telegram(telegram).await;
    }

    async fn send_telegram(&self, stage: &FilterStage, telegram: Telegram) {
        self.log
            .send
            .lock()
            .expect("lock send")
            .push(telegram.clone());
        stage.forward_send(telegram).await;
    }
}
