//! Hook files: attaching work to an agent so it survives restart.
//!
//! `hook-<agent>.json` files record the bead assigned to an agent. They are
//! created by `gt sling`, read on session start, and burned after pickup.
//! They live in the local-only hook directory (`.beads/` by default) and are
//! never part of the exported issue log.

mod hook;
mod types;

pub use hook::{ConflictPolicy, HookError, HookStore, PendingHook};
pub use types::{
    HOOK_PREFIX, HOOK_SUFFIX, Hook, HookHeader, HookType, SlungWork, agent_from_filename,
    hook_filename,
};
