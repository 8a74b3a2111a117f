// SPDX-License-Identifier: CEPL-1.0
use std::ffi::{CString, NulError};

use ash::khr::swapchain;

/// Inputs to context creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextConfig {
    pub app_name: String,
    /// Device extensions an adapter must offer to be considered at all.
    pub required_extensions: Vec<CString>,
    /// Request the Khronos validation layer (skipped with a warning when the
    /// loader does not offer it).
    pub validation: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            app_name: "ember".to_owned(),
            required_extensions: vec![swapchain::NAME.to_owned()],
            validation: cfg!(debug_assertions),
        }
    }
}

impl ContextConfig {
    /// Replaces the required extension list with the given names.
    pub fn with_required_extensions<I, S>(mut self, names: I) -> Result<Self, NulError>
    where
        I: IntoIterator<Item = S>,
        S: Into<Vec<u8>>,
    {
        self.required_extensions = names
            .into_iter()
            .map(CString::new)
            .collect::<Result<_, _>>()?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_requires_only_swapchain() {
        let cfg = ContextConfig::default();
        assert_eq!(cfg.required_extensions, vec![swapchain::NAME.to_owned()]);
    }

    #[test]
    fn extension_names_are_replaced() {
        let cfg = ContextConfig::default()
            .with_required_extensions(["VK_KHR_swapchain", "VK_KHR_maintenance1"])
            .unwrap();
        assert_eq!(cfg.required_extensions.len(), 2);
        assert_eq!(cfg.required_extensions[1].to_str().unwrap(), "VK_KHR_maintenance1");
    }

    #[test]
    fn interior_nul_is_rejected() {
        assert!(ContextConfig::default()
            .with_required_extensions(["bad\0name"])
            .is_err());
    }
}
