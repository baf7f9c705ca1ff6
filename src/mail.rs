//! Agent mail as issues.
//!
//! A message is a `message`-type issue assigned to the recipient. Lifecycle
//! and patrol mail is sent ephemeral, so the export drops it with no mail
//! logic of its own.

use crate::beads::{Issue, IssueStore, MESSAGE_TYPE, NewIssue, Status, StoreError};

const FROM_LABEL: &str = "from";

#[derive(Debug, Clone)]
pub struct Mail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Mail {
    pub fn new(from: &str, to: &str, subject: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            subject: subject.to_string(),
            body: String::new(),
        }
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }
}

/// Deliver `mail` as a new issue. With `ephemeral` set the issue is a wisp
/// from the moment it exists.
pub fn send_mail(store: &mut IssueStore, mail: Mail, ephemeral: bool) -> Result<Issue, StoreError> {
    let issue = store.create(
        NewIssue::task(mail.subject)
            .description(mail.body)
            .issue_type(MESSAGE_TYPE)
            .assignee(mail.to.clone())
            .label(format!("{FROM_LABEL}:{}", mail.from))
            .ephemeral(ephemeral),
    )?;
    tracing::debug!(id = %issue.id, to = %mail.to, ephemeral, "mail sent");
    Ok(issue)
}

/// Open messages addressed to `agent`, oldest first. Wisps included.
pub fn inbox<'a>(store: &'a IssueStore, agent: &str) -> Vec<&'a Issue> {
    store
        .list()
        .iter()
        .filter(|i| {
            i.issue_type == MESSAGE_TYPE
                && i.status != Status::Closed
                && i.assignee.as_deref() == Some(agent)
        })
        .collect()
}

/// Sender of a message, if recorded.
pub fn sender(message: &Issue) -> Option<&str> {
    message.label_value(FROM_LABEL)
}

/// Close a message once it has been read.
pub fn mark_read(store: &mut IssueStore, id: &str) -> Result<(), StoreError> {
    store.update_status(id, Status::Closed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beads::export;

    #[test]
    fn ephemeral_mail_is_flagged_and_not_exported() {
        let mut store = IssueStore::in_memory("gt");
        let mail = Mail::new("deacon", "nux", "LIFECYCLE: spawn").body("fresh session");
        let issue = send_mail(&mut store, mail, true).unwrap();

        assert!(store.is_ephemeral(&issue.id).unwrap());
        assert_eq!(issue.issue_type, MESSAGE_TYPE);
        assert_eq!(issue.description, "fresh session");
        assert_eq!(sender(&issue), Some("deacon"));
        assert!(export(store.list()).is_empty());
    }

    #[test]
    fn durable_mail_is_exported() {
        let mut store = IssueStore::in_memory("gt");
        let issue = send_mail(&mut store, Mail::new("mayor", "crew/joe", "review"), false).unwrap();
        let exported = export(store.list());
        assert_eq!(exported.len(), 1);
        assert_eq!(exported[0].id, issue.id);
    }

    #[test]
    fn inbox_filters_by_recipient_and_status() {
        let mut store = IssueStore::in_memory("gt");
        let a = send_mail(&mut store, Mail::new("deacon", "nux", "one"), true).unwrap();
        send_mail(&mut store, Mail::new("deacon", "slit", "other"), true).unwrap();
        let b = send_mail(&mut store, Mail::new("mayor", "nux", "two"), false).unwrap();
        store.create(NewIssue::task("not mail").assignee("nux")).unwrap();

        let ids: Vec<&str> = inbox(&store, "nux").iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec![a.id.as_str(), b.id.as_str()]);

        mark_read(&mut store, &a.id).unwrap();
        let ids: Vec<&str> = inbox(&store, "nux").iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec![b.id.as_str()]);
    }
}
