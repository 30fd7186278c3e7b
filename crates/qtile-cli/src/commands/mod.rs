// SPDX-License-Identifier: Apache-2.0
//! CLI command implementations.

pub mod common;
pub mod info;
pub mod run;
