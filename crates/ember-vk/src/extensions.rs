// SPDX-License-Identifier: CEPL-1.0
use std::collections::BTreeSet;
use std::ffi::{CStr, CString};

use ash::vk;
use tracing::debug;

use crate::driver::Driver;
use crate::error::{ContextError, Result};

/// Required names the adapter does not offer. Order and duplicates in
/// `required` do not matter.
pub fn missing_extensions<'a>(available: &[CString], required: &'a [CString]) -> BTreeSet<&'a CStr> {
    let mut missing: BTreeSet<&CStr> = required.iter().map(CString::as_c_str).collect();
    for name in available {
        missing.remove(name.as_c_str());
    }
    missing
}

/// True when `adapter` offers every extension in `required`.
pub fn supports_extensions<D: Driver + ?Sized>(
    driver: &D,
    adapter: vk::PhysicalDevice,
    required: &[CString],
) -> Result<bool> {
    let available = driver
        .device_extensions(adapter)
        .map_err(ContextError::query("enumerate_device_extension_properties"))?;
    let missing = missing_extensions(&available, required);
    if !missing.is_empty() {
        debug!(?missing, "adapter lacks required device extensions");
    }
    Ok(missing.is_empty())
}
