use anyhow::{bail, Result};

use super::cli::StubArgs;

/// The full tool's permissions-based filter reads `manifest.json`'s
/// `permissions` array; this driver doesn't carry a manifest loader.
pub fn run_permissions(_args: StubArgs) -> Result<()> {
    bail!(
        "the permissions filter is not implemented by this driver; \
         it requires a manifest.json loader this build doesn't carry"
    )
}

/// Mirrors `run_permissions` for other manifest-derived fields (name,
/// version, host permissions beyond the `permissions` array).
pub fn run_manifest(_args: StubArgs) -> Result<()> {
    bail!(
        "the manifest filter is not implemented by this driver; \
         it requires a manifest.json loader this build doesn't carry"
    )
}

/// The user-count filter needs AMO's metadata dump (`AMO_METADATA_JSON`);
/// loading and indexing that is out of scope here.
pub fn run_user_count(_args: StubArgs) -> Result<()> {
    bail!(
        "the user-count filter is not implemented by this driver; \
         set AMO_METADATA_JSON to a metadata dump and use the full tool, \
         or unset IGNORE_MISSING_ADDON if you intended to skip this filter"
    )
}
