use tokio::sync::broadcast;
use uuid::Uuid;

/// "A tab with this token is (re)claiming the session."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TabAnnouncement {
    pub token: Uuid,
}

/// Transport for tab announcements. Injected so the arbiter logic stays
/// independent of how instances actually reach each other.
pub trait TabChannel: Send {
    fn announce(&self, announcement: TabAnnouncement);
    fn poll_announcement(&mut self) -> Option<TabAnnouncement>;
}

/// In-process fan-out channel. Every instance created through `join` sees
/// every announcement, including its own, which is harmless: an arbiter
/// receiving its own token concludes it is the active session.
pub struct BroadcastTabChannel {
    tx: broadcast::Sender<TabAnnouncement>,
    rx: broadcast::Receiver<TabAnnouncement>,
}

impl BroadcastTabChannel {
    pub fn new() -> Self {
        let (tx, rx) = broadcast::channel(16);
        Self { tx, rx }
    }

    pub fn join(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for BroadcastTabChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl TabChannel for BroadcastTabChannel {
    fn announce(&self, announcement: TabAnnouncement) {
        // Nobody listening just means we are the only instance.
        let _ = self.tx.send(announcement);
    }

    fn poll_announcement(&mut self) -> Option<TabAnnouncement> {
        loop {
            match self.rx.try_recv() {
                Ok(announcement) => return Some(announcement),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}

/// Decides whether this instance is the one allowed to poll the backend.
/// Purely advisory: there is no server-side enforcement, the point is to
/// keep several instances from racing the kernel's result queue. The token
/// lives for the process lifetime and is never persisted.
pub struct SessionArbiter {
    token: Uuid,
    suspended: bool,
    channel: Box<dyn TabChannel>,
}

impl SessionArbiter {
    /// Announces itself immediately, suspending any other instance.
    pub fn new(channel: Box<dyn TabChannel>) -> Self {
        let arbiter = Self {
            token: Uuid::new_v4(),
            suspended: false,
            channel,
        };
        arbiter.channel.announce(TabAnnouncement {
            token: arbiter.token,
        });
        arbiter
    }

    pub fn token(&self) -> Uuid {
        self.token
    }

    pub fn is_active(&self) -> bool {
        !self.suspended
    }

    /// Re-broadcast our token, suspending every other instance.
    pub fn claim(&mut self) {
        self.suspended = false;
        self.channel
            .announce(TabAnnouncement { token: self.token });
    }

    /// Drain pending announcements; the latest one wins. Returns true when
    /// the suspended flag changed.
    pub fn pump(&mut self) -> bool {
        let before = self.suspended;
        while let Some(announcement) = self.channel.poll_announcement() {
            self.suspended = announcement.token != self.token;
        }
        before != self.suspended
    }
}
