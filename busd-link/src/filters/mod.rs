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

//! Named filter constructors.
//!
//! The router resolves `filters` configuration entries through a
//! [`FilterRegistry`]: logical name → [`FilterLogic`] constructor. The
//! registry ships with the built-in filters; embedders register their own
//! next to them.

mod log;

pub use self::log::LogFilter;

use crate::chain::connect::LinkConnect;
use crate::chain::filter::{FilterLogic, FilterStage};
use crate::config::ConfigSection;
use crate::diag::Diag;
use std::collections::HashMap;
use std::sync::Arc;

/// Builds a filter behavior from its section and diagnostic context.
pub type LogicConstructor = Arc<dyn Fn(&ConfigSection, &Diag) -> Box<dyn FilterLogic> + Send + Sync>;

/// Registry of filter constructors keyed by logical name.
#[derive(Clone, Default)]
pub struct FilterRegistry {
    constructors: HashMap<String, LogicConstructor>,
}

impl FilterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the built-in filters.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(
            "log",
            Arc::new(|_cfg, _diag| -> Box<dyn FilterLogic> { Box::new(LogFilter) }),
        );
        registry
    }

    pub fn register(&mut self, name: &str, constructor: LogicConstructor) {
        self.constructors.insert(name.to_string(), constructor);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Builds a filter stage of the given logical name, bound to the
    /// owning connect; `None` when the name is unknown.
    pub fn create(
        &self,
        owner: &Arc<LinkConnect>,
        section: ConfigSection,
        parent: &Diag,
        name: &str,
    ) -> Option<Arc<FilterStage>> {
        let constructor = self.constructors.get(name)?;
        let logic = constructor(&section, parent);
        Some(FilterStage::new(section, parent, owner, logic))
    }
}
