//! Work handoff between agents.
//!
//! Dispatcher side: [`sling`] puts a bead on a target agent's hook and can
//! notify it with ephemeral mail. Agent side: [`pickup`] restores the hook,
//! accepts the bead into the issue store, and only then burns the hook. A crash
//! anywhere before the burn leaves the hook pending, and accepting the same
//! bead again is a no-op.

use crate::beads::{Issue, IssueStore, Status, StoreError};
use crate::mail::{self, Mail};
use crate::wisp::{Hook, HookError, HookStore, SlungWork};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Hook(#[from] HookError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{bead} is already in progress for {owner}")]
    AssignedElsewhere { bead: String, owner: String },
}

#[derive(Debug, Clone)]
pub struct SlingRequest {
    pub bead_id: String,
    pub target: String,
    pub from: String,
    pub context: Option<String>,
    pub subject: Option<String>,
    /// Also send the target an ephemeral "SLUNG" mail.
    pub notify: bool,
}

impl SlingRequest {
    pub fn new(bead_id: &str, target: &str, from: &str) -> Self {
        Self {
            bead_id: bead_id.to_string(),
            target: target.to_string(),
            from: from.to_string(),
            context: None,
            subject: None,
            notify: false,
        }
    }

    /// An agent handing its own work to its next session.
    pub fn handoff(bead_id: &str, agent: &str, subject: &str) -> Self {
        let mut req = Self::new(bead_id, agent, agent);
        req.subject = Some(subject.to_string());
        req
    }

    fn to_hook(&self) -> Hook {
        let mut work = SlungWork::new(&self.bead_id, &self.from);
        work.context.clone_from(&self.context);
        work.subject.clone_from(&self.subject);
        Hook::SlungWork(work)
    }
}

#[derive(Debug)]
pub struct Slung {
    pub hook: Hook,
    /// The notification mail, if one was requested. The hook is already placed
    /// when this is an error, so the sling itself still succeeded.
    pub notification: Option<Result<Issue, StoreError>>,
}

/// Put a bead on the target's hook. The notification, if requested, is sent
/// only after the hook is on disk; failing to send it does not undo the hook.
pub fn sling(
    hooks: &HookStore,
    issues: &mut IssueStore,
    req: &SlingRequest,
) -> Result<Slung, DispatchError> {
    if !issues.contains(&req.bead_id) {
        tracing::warn!(bead = %req.bead_id, "slinging a bead unknown to the local store");
    }

    let hook = req.to_hook();
    hooks.create(&req.target, &hook)?;
    tracing::info!(bead = %req.bead_id, target = %req.target, from = %req.from, "slung work");

    let notification = req.notify.then(|| {
        let body = req.context.clone().unwrap_or_default();
        let subject = format!("SLUNG: {}", req.bead_id);
        let sent = mail::send_mail(
            issues,
            Mail::new(&req.from, &req.target, &subject).body(body),
            true,
        );
        if let Err(e) = &sent {
            tracing::warn!(
                bead = %req.bead_id,
                target = %req.target,
                error = %e,
                "hook placed but notification failed"
            );
        }
        sent
    });

    Ok(Slung { hook, notification })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    Accepted,
    /// The bead was already in progress for this agent.
    AlreadyAccepted,
    /// The bead is closed; a leftover hook for it has nothing to deliver.
    AlreadyClosed,
}

/// Record that `agent` is working on `bead_id`: in progress, assigned to it.
/// The check and the change happen under the store lock.
pub fn accept(
    issues: &mut IssueStore,
    agent: &str,
    bead_id: &str,
) -> Result<Acceptance, DispatchError> {
    issues.try_update(bead_id, |issue| {
        match (issue.status, issue.assignee.clone()) {
            (Status::Closed, _) => Ok(Acceptance::AlreadyClosed),
            (Status::InProgress, Some(owner)) if owner == agent => Ok(Acceptance::AlreadyAccepted),
            (Status::InProgress, Some(owner)) => Err(DispatchError::AssignedElsewhere {
                bead: bead_id.to_string(),
                owner,
            }),
            _ => {
                issue.status = Status::InProgress;
                issue.assignee = Some(agent.to_string());
                Ok(Acceptance::Accepted)
            }
        }
    })
}

#[derive(Debug)]
pub struct Pickup {
    pub hook: Hook,
    pub acceptance: Acceptance,
}

/// Session-start pickup: restore, accept, burn. Any error leaves the hook in
/// place for the next start or for an operator.
pub fn pickup(
    hooks: &HookStore,
    issues: &mut IssueStore,
    agent: &str,
) -> Result<Option<Pickup>, DispatchError> {
    let Some(hook) = hooks.restore_on_start(agent)? else {
        return Ok(None);
    };

    let acceptance = match &hook {
        Hook::SlungWork(work) => accept(issues, agent, &work.bead_id)?,
    };
    hooks.burn(agent)?;
    tracing::info!(agent, bead = hook.bead_id(), ?acceptance, "picked up hooked work");

    Ok(Some(Pickup { hook, acceptance }))
}
