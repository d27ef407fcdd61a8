//! Unit tests for the sync module.

use super::*;

mod diff;
mod types;
