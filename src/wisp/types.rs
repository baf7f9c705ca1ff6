//! Hook file payloads.
//!
//! Every hook file is a flat JSON object whose `type` field selects the payload
//! kind. The header fields (`type`, `created_at`, `created_by`) are shared by all
//! kinds; the remaining fields belong to the variant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Filename prefix for hook files.
pub const HOOK_PREFIX: &str = "hook-";

/// Filename suffix for hook files.
pub const HOOK_SUFFIX: &str = ".json";

/// Closed set of hook kinds, dispatched on the header's `type` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HookType {
    /// A bead attached to an agent by sling, hook, or handoff. Burned after pickup.
    #[serde(rename = "slung-work")]
    SlungWork,
}

impl HookType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SlungWork => "slung-work",
        }
    }

    /// Parse a type tag as found on disk. Unknown tags return `None`.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "slung-work" => Some(Self::SlungWork),
            _ => None,
        }
    }
}

impl std::fmt::Display for HookType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common envelope of every hook file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookHeader {
    #[serde(rename = "type")]
    pub kind: HookType,
    pub created_at: DateTime<Utc>,
    /// Who created the hook, e.g. "crew/joe" or "deacon".
    pub created_by: String,
}

impl HookHeader {
    pub fn new(kind: HookType, created_by: &str) -> Self {
        Self {
            kind,
            created_at: Utc::now(),
            created_by: created_by.to_string(),
        }
    }
}

/// Work attached to an agent's hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlungWork {
    #[serde(flatten)]
    pub header: HookHeader,
    /// The bead to work on (e.g. "gt-abc").
    pub bead_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Subject line, used for handoff mail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl SlungWork {
    pub fn new(bead_id: &str, created_by: &str) -> Self {
        Self {
            header: HookHeader::new(HookType::SlungWork, created_by),
            bead_id: bead_id.to_string(),
            context: None,
            subject: None,
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }
}

/// A typed hook payload. Adding a hook kind means adding a variant here and a
/// matching [`HookType`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hook {
    SlungWork(SlungWork),
}

impl Hook {
    pub const fn header(&self) -> &HookHeader {
        match self {
            Self::SlungWork(work) => &work.header,
        }
    }

    pub const fn kind(&self) -> HookType {
        self.header().kind
    }

    /// The bead this hook refers to.
    pub fn bead_id(&self) -> &str {
        match self {
            Self::SlungWork(work) => &work.bead_id,
        }
    }

    pub const fn as_slung_work(&self) -> Option<&SlungWork> {
        match self {
            Self::SlungWork(work) => Some(work),
        }
    }

    /// Check the invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::SlungWork(work) => {
                if work.header.kind != HookType::SlungWork {
                    return Err(format!(
                        "slung-work payload carries header type {}",
                        work.header.kind
                    ));
                }
                if work.bead_id.trim().is_empty() {
                    return Err("bead_id is empty".to_string());
                }
                Ok(())
            }
        }
    }

    pub(crate) fn to_json(&self) -> serde_json::Result<String> {
        match self {
            Self::SlungWork(work) => serde_json::to_string_pretty(work),
        }
    }
}

impl From<SlungWork> for Hook {
    fn from(work: SlungWork) -> Self {
        Self::SlungWork(work)
    }
}

/// Filename for an agent's hook slot.
///
/// Agent identities may contain `/` (e.g. "crew/joe"), so everything outside
/// `[A-Za-z0-9._-]` is percent-encoded, `%` included. The mapping is injective
/// and always yields a single path component.
pub fn hook_filename(agent: &str) -> String {
    let mut name = String::with_capacity(HOOK_PREFIX.len() + agent.len() + HOOK_SUFFIX.len());
    name.push_str(HOOK_PREFIX);
    for byte in agent.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_' | b'-') {
            name.push(char::from(byte));
        } else {
            name.push_str(&format!("%{byte:02X}"));
        }
    }
    name.push_str(HOOK_SUFFIX);
    name
}

/// Recover the agent identity from a hook filename. Returns `None` for names that
/// are not hook files, including any encoding `hook_filename` would not produce
/// (lowercase hex, signs, escaped safe bytes).
pub fn agent_from_filename(name: &str) -> Option<String> {
    let encoded = name.strip_prefix(HOOK_PREFIX)?.strip_suffix(HOOK_SUFFIX)?;
    if encoded.is_empty() {
        return None;
    }
    let bytes = encoded.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = encoded.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    let agent = String::from_utf8(out).ok()?;
    (hook_filename(&agent) == name).then_some(agent)
}
