//! Optional systemd integration for running camsync-rs as a polling service.
//!
//! Every call is a no-op when disabled or off Linux, so the scheduler can
//! report unconditionally.

#[derive(Debug, Clone, Copy)]
enum Message<'a> {
    Ready,
    Stopping,
    Status(&'a str),
    Watchdog,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct SystemdNotifier {
    enabled: bool,
}

impl SystemdNotifier {
    pub(crate) fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Startup complete; sent before the first pass.
    pub(crate) fn notify_ready(&self) {
        self.send(Message::Ready);
    }

    pub(crate) fn notify_stopping(&self) {
        self.send(Message::Stopping);
    }

    /// Outcome of the last pass, shown by `systemctl status`.
    pub(crate) fn notify_status(&self, msg: &str) {
        self.send(Message::Status(msg));
    }

    /// Keepalive, sent once per poll cycle.
    pub(crate) fn notify_watchdog(&self) {
        self.send(Message::Watchdog);
    }

    fn send(&self, message: Message<'_>) {
        if !self.enabled {
            return;
        }
        send_impl(message);
    }
}

#[cfg(target_os = "linux")]
fn send_impl(message: Message<'_>) {
    use sd_notify::NotifyState;

    let state = match message {
        Message::Ready => NotifyState::Ready,
        Message::Stopping => NotifyState::Stopping,
        Message::Status(msg) => NotifyState::Status(msg),
        Message::Watchdog => NotifyState::Watchdog,
    };
    if let Err(e) = sd_notify::notify(false, &[state]) {
        tracing::debug!(error = %e, ?message, "sd_notify failed");
    }
}

#[cfg(not(target_os = "linux"))]
fn send_impl(_message: Message<'_>) {}
