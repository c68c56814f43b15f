// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Post-validation normalization.
//!
//! The only pass that is allowed to mutate a configuration. It MUST be run
//! after [`crate::validate`]; it assumes device names are already ASCII.

use crate::schema::{Config, DEVICE_NAME_MAX_CHARS};

/// Applies in-place normalization to a validated configuration.
///
/// Currently this truncates device names to [`DEVICE_NAME_MAX_CHARS`]
/// characters. Slot math, packing and runtime writes belong to later stages.
pub fn normalize(cfg: &mut Config) {
    for unit in &mut cfg.replicator.units {
        if !unit.status_enabled() {
            continue;
        }

        if unit.source.device_name.len() > DEVICE_NAME_MAX_CHARS {
            unit.source.device_name.truncate(DEVICE_NAME_MAX_CHARS);
        }
    }
}
