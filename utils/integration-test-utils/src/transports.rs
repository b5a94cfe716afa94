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

//! Mock bus transports.

use async_trait::async_trait;
use busd_link::{Activation, BusTransport, BusmonitorFrame, DriverEvents, Telegram, TransportError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Transport that completes every transition synchronously and records
/// what it was asked to transmit. Inbound traffic is injected through the
/// captured [`DriverEvents`] handle.
#[derive(Default)]
pub struct InstantTransport {
    events: Mutex<Option<DriverEvents>>,
    transmitted: Mutex<Vec<Telegram>>,
    open_count: AtomicUsize,
    close_count: AtomicUsize,
}

impl InstantTransport {
    pub fn transmitted(&self) -> Vec<Telegram> {
        self.transmitted.lock().expect("lock transmitted").clone()
    }

    pub fn open_count(&self) -> usize {
        self.open_count.load(Ordering::Relaxed)
    }

    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::Relaxed)
    }

    fn captured_events(&self) -> Option<DriverEvents> {
        self.events.lock().expect("lock events").clone()
    }

    /// Injects a telegram as if it arrived from the bus. No-op before the
    /// transport was opened.
    pub async fn inject_telegram(&self, telegram: Telegram) {
        if let Some(events) = self.captured_events() {
            events.telegram(telegram).await;
        }
    }

    /// Injects a busmonitor frame as if observed on the bus.
    pub async fn inject_busmonitor(&self, frame: BusmonitorFrame) {
        if let Some(events) = self.captured_events() {
            events.busmonitor_frame(frame).await;
        }
    }
}

#[async_trait]
impl BusTransport for InstantTransport {
    async fn open(&self, events: DriverEvents) -> Result<Activation, TransportError> {
        *self.events.lock().expect("lock events") = Some(events);
        self.open_count.fetch_add(1, Ordering::Relaxed);
        Ok(Activation::Complete)
    }

    async fn close(&self) -> Result<Activation, TransportError> {
        self.close_count.fetch_add(1, Ordering::Relaxed);
        Ok(Activation::Complete)
    }

    async fn transmit(&self, telegram: Telegram) -> Result<(), TransportError> {
        self.transmitted.lock().expect("lock transmitted").push(telegram);
        Ok(())
    }
}

/// Transport whose transitions stay pending until the test confirms them,
/// making the `Switching` state observable.
#[derive(Default)]
pub struct ManualTransport {
    events: Mutex<Option<DriverEvents>>,
    open_count: AtomicUsize,
    close_count: AtomicUsize,
}

impl ManualTransport {
    pub fn open_count(&self) -> usize {
        self.open_count.load(Ordering::Relaxed)
    }

    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::Relaxed)
    }

    fn captured_events(&self) -> Option<DriverEvents> {
        self.events.lock().expect("lock events").clone()
    }

    /// Confirms the pending open.
    pub async fn confirm_started(&self) {
        if let Some(events) = self.captured_events() {
            events.started().await;
        }
    }

    /// Confirms the pending close.
    pub async fn confirm_stopped(&self) {
        if let Some(events) = self.captured_events() {
            events.stopped().await;
        }
    }
}

#[async_trait]
impl BusTransport for ManualTransport {
    async fn open(&self, events: DriverEvents) -> Result<Activation, TransportError> {
        *self.events.lock().expect("lock events") = Some(events);
        self.open_count.fetch_add(1, Ordering::Relaxed);
        Ok(Activation::Pending)
    }

    async fn close(&self) -> Result<Activation, TransportError> {
        self.close_count.fetch_add(1, Ordering::Relaxed);
        Ok(Activation::Pending)
    }

    async fn transmit(&self, _telegram: Telegram) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Transport that refuses everything.
pub struct FailingTransport;

#[async_trait]
impl BusTransport for FailingTransport {
    async fn open(&self, _events: DriverEvents) -> Result<Activation, TransportError> {
        Err(TransportError::Io("device unavailable".to_string()))
    }

    async fn close(&self) -> Result<Activation, TransportError> {
        Err(TransportError::NotConnected)
    }

    async fn transmit(&self, _telegram: Telegram) -> Result<(), TransportError> {
        Err(TransportError::NotConnected)
    }
}
