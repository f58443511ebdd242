use crate::types::{ContentKind, Message, Role};

/// The ordered chat transcript. Entries are only ever appended or relabeled
/// in place; the sole wholesale replacement is `reset`, which restores the
/// fixed greeting pair after an explicit "clear".
#[derive(Debug, Clone)]
pub struct MessageLog {
    entries: Vec<Message>,
}

pub fn default_greeting() -> Vec<Message> {
    vec![
        Message::new(
            Role::Generator,
            ContentKind::Message,
            "Hello! I am a code assistant. Ask me to do something for you!\n\
             Pro tip: you can upload a file and I'll be able to use it.",
        ),
        Message::new(
            Role::Generator,
            ContentKind::Message,
            "If I get stuck just type `reset` and I'll restart the kernel.\n\
             For interrupting a running program, please type `stop`.\n\
             In case you want to clear the conversation history, just type `clear`.",
        ),
    ]
}

impl Default for MessageLog {
    fn default() -> Self {
        Self {
            entries: default_greeting(),
        }
    }
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) {
        self.entries.push(message);
    }

    pub fn reset(&mut self) {
        self.entries = default_greeting();
    }

    /// Walk backward from the end relabeling `System` entries to `new_role`,
    /// stopping at the first entry with any other role. Used to flag kernel
    /// output as stale once a fix attempt begins; user and generator entries
    /// are never touched. Returns the number of entries relabeled.
    pub fn relabel_trailing_system(&mut self, new_role: Role) -> usize {
        let mut relabeled = 0;
        for entry in self.entries.iter_mut().rev() {
            if entry.role != Role::System {
                break;
            }
            entry.role = new_role;
            relabeled += 1;
        }
        relabeled
    }

    pub fn entries(&self) -> &[Message] {
        &self.entries
    }

    pub fn last(&self) -> Option<&Message> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
