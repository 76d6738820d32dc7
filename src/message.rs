use std::sync::mpsc;

pub const HEAD_INVALID_CHARS: &str = "illegal characters replaced";
pub const HEAD_RENAME_FAILED: &str = "failed to rename";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Alert,
    Error,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Alert => "alert",
            Severity::Error => "error",
        }
    }
}

/// One diagnostic occurrence: a short head label plus the affected detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub severity: Severity,
    pub head: String,
    pub body: String,
}

impl Message {
    pub fn new(severity: Severity, head: &str, body: impl Into<String>) -> Self {
        Self {
            severity,
            head: head.to_string(),
            body: body.into(),
        }
    }
}

/// Aggregation output: a contiguous run of equal-head messages collapsed into
/// one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageGroup {
    pub severity: Severity,
    pub head: String,
    pub body: String,
}

/// Cloneable producer side of the diagnostic channel. Items push, the host
/// drains the receiver and aggregates for display.
#[derive(Debug, Clone)]
pub struct MessageSink {
    tx: mpsc::Sender<Message>,
}

impl MessageSink {
    pub fn channel() -> (Self, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }

    /// Delivery failures mean the consumer is gone; the diagnostic is then
    /// dropped rather than failing the producer.
    pub fn push(&self, severity: Severity, head: &str, body: impl Into<String>) {
        let _ = self.tx.send(Message::new(severity, head, body));
    }
}

pub fn drain(rx: &mpsc::Receiver<Message>) -> Vec<Message> {
    rx.try_iter().collect()
}

/// Run-length grouping over `head` in arrival order. Two runs with the same
/// head separated by a different head stay separate groups; a group reports
/// the severity of the run's first message and joins bodies with newlines.
pub fn aggregate(messages: &[Message]) -> Vec<MessageGroup> {
    let mut groups: Vec<MessageGroup> = Vec::new();
    for message in messages {
        match groups.last_mut() {
            Some(group) if group.head == message.head => {
                group.body.push('\n');
                group.body.push_str(&message.body);
            }
            _ => groups.push(MessageGroup {
                severity: message.severity,
                head: message.head.clone(),
                body: message.body.clone(),
            }),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(head: &str, body: &str) -> Message {
        Message::new(Severity::Info, head, body)
    }

    #[test]
    fn empty_input_yields_no_groups() {
        assert!(aggregate(&[]).is_empty());
    }

    #[test]
    fn single_message_group_has_no_separator() {
        let groups = aggregate(&[info("H", "A1")]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].body, "A1");
    }

    #[test]
    fn contiguous_runs_collapse_but_distinct_runs_stay_apart() {
        let messages = [
            info("H", "A1"),
            info("H", "A2"),
            info("OTHER", "B1"),
            info("H", "C1"),
        ];
        let groups = aggregate(&messages);
        assert_eq!(groups.len(), 3);
        assert_eq!((groups[0].head.as_str(), groups[0].body.as_str()), ("H", "A1\nA2"));
        assert_eq!((groups[1].head.as_str(), groups[1].body.as_str()), ("OTHER", "B1"));
        assert_eq!((groups[2].head.as_str(), groups[2].body.as_str()), ("H", "C1"));
    }

    #[test]
    fn group_reports_first_severity_of_run() {
        let messages = [
            Message::new(Severity::Error, "H", "first"),
            Message::new(Severity::Alert, "H", "second"),
            Message::new(Severity::Info, "H", "third"),
        ];
        let groups = aggregate(&messages);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].severity, Severity::Error);
    }

    #[test]
    fn group_count_matches_runs_and_bodies_reconstruct() {
        let messages = [
            info("a", "1"),
            info("a", "2"),
            info("b", "3"),
            info("b", "4"),
            info("a", "5"),
        ];
        let groups = aggregate(&messages);
        assert_eq!(groups.len(), 3);
        let rebuilt: Vec<&str> = groups
            .iter()
            .flat_map(|group| group.body.split('\n'))
            .collect();
        assert_eq!(rebuilt, ["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn aggregate_is_stable_over_identical_input() {
        let messages = [info("a", "1"), info("b", "2")];
        assert_eq!(aggregate(&messages), aggregate(&messages));
    }

    #[test]
    fn sink_preserves_emission_order() {
        let (sink, rx) = MessageSink::channel();
        sink.push(Severity::Info, "H", "A1");
        sink.push(Severity::Alert, "H", "A2");
        let drained = drain(&rx);
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].body, "A1");
        assert_eq!(drained[1].body, "A2");
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Info < Severity::Alert);
        assert!(Severity::Alert < Severity::Error);
    }
}
