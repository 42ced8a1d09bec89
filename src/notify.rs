use log::warn;
use notify_rust::Notification;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// One-shot, user-visible message ("toast").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

pub trait Notifier {
    fn notify(&self, notice: Notice);

    fn success(&self, message: String) {
        self.notify(Notice {
            level: NoticeLevel::Success,
            message,
        });
    }

    fn error(&self, message: String) {
        self.notify(Notice {
            level: NoticeLevel::Error,
            message,
        });
    }
}

/// Prints notices to stderr; used by the one-shot CLI commands.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => eprintln!("✓ {}", notice.message),
            NoticeLevel::Error => eprintln!("✗ {}", notice.message),
        }
    }
}

/// Shared queue the terminal dashboard drains into its status line.
#[derive(Clone, Default)]
pub struct ToastQueue {
    inner: Rc<RefCell<VecDeque<Notice>>>,
}

impl ToastQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pop(&self) -> Option<Notice> {
        self.inner.borrow_mut().pop_front()
    }

    pub fn drain(&self) -> Vec<Notice> {
        self.inner.borrow_mut().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }
}

impl Notifier for ToastQueue {
    fn notify(&self, notice: Notice) {
        self.inner.borrow_mut().push_back(notice);
    }
}

/// Forwards to `inner` and also raises a desktop notification.
pub struct DesktopNotifier<N> {
    inner: N,
}

impl<N: Notifier> DesktopNotifier<N> {
    pub fn new(inner: N) -> Self {
        Self { inner }
    }
}

impl<N: Notifier> Notifier for DesktopNotifier<N> {
    fn notify(&self, notice: Notice) {
        let mut n = Notification::new();
        n.summary("StartupMail").body(&notice.message);
        #[cfg(all(unix, not(target_os = "macos")))]
        n.hint(notify_rust::Hint::Category("email".to_string()));

        // no notification daemon on headless hosts
        if let Err(e) = n.show() {
            warn!("desktop notification failed: {e}");
        }

        self.inner.notify(notice);
    }
}
