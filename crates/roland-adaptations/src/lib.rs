//! # Roland adaptations
//!
//! Device tables for Roland synthesizers built on
//! [`sysex_core`]. Each module exposes the raw [`sysex_core::DeviceSpec`]
//! and a validated codec; [`registry`] collects every supported device as a
//! [`sysex_core::Adaptation`] for a host librarian.

pub mod jv1080;
pub mod mt32;
pub mod xv3080;

use sysex_core::{Adaptation, DefinitionError};

/// Every supported device, in the order a host should probe them.
///
/// # Errors
///
/// Returns the first [`DefinitionError`] raised by a device table.
pub fn registry() -> Result<Vec<Box<dyn Adaptation>>, DefinitionError> {
    Ok(vec![
        Box::new(xv3080::chain()?),
        Box::new(jv1080::codec()?),
        Box::new(mt32::codec()?),
    ])
}

/// Looks up an adaptation by its display name.
///
/// # Errors
///
/// Returns a [`DefinitionError`] if a device table fails validation.
pub fn find(name: &str) -> Result<Option<Box<dyn Adaptation>>, DefinitionError> {
    Ok(registry()?
        .into_iter()
        .find(|adaptation| adaptation.name() == name))
}

#[cfg(test)]
use rstest as _;
