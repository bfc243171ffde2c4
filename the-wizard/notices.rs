use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::lookup::{
  NoticeKind,
  Notifier,
};

pub const DEFAULT_HISTORY_LIMIT: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
  pub id:   u64,
  pub kind: NoticeKind,
  pub text: String,
}

/// Keeps the notices shown to the user: the one currently on screen plus a
/// bounded history.
#[derive(Debug, Clone)]
pub struct MessageCenter {
  active:        Option<Notice>,
  history:       VecDeque<Notice>,
  next_id:       u64,
  history_limit: usize,
}

impl Default for MessageCenter {
  fn default() -> Self {
    Self::with_limit(DEFAULT_HISTORY_LIMIT)
  }
}

impl MessageCenter {
  pub fn with_limit(history_limit: usize) -> Self {
    Self {
      active:        None,
      history:       VecDeque::new(),
      next_id:       1,
      history_limit: history_limit.max(1),
    }
  }

  pub fn active(&self) -> Option<&Notice> {
    self.active.as_ref()
  }

  pub fn history(&self) -> impl Iterator<Item = &Notice> {
    self.history.iter()
  }

  pub fn history_len(&self) -> usize {
    self.history.len()
  }

  pub fn count(&self, kind: NoticeKind) -> usize {
    self.history.iter().filter(|notice| notice.kind == kind).count()
  }

  pub fn publish(&mut self, kind: NoticeKind, text: impl Into<String>) -> Notice {
    let notice = Notice {
      id: self.next_id,
      kind,
      text: text.into(),
    };
    self.next_id = self.next_id.saturating_add(1);
    self.active = Some(notice.clone());

    self.history.push_back(notice.clone());
    while self.history.len() > self.history_limit {
      self.history.pop_front();
    }
    notice
  }

  pub fn info(&mut self, text: impl Into<String>) -> Notice {
    self.publish(NoticeKind::Info, text)
  }

  pub fn error(&mut self, text: impl Into<String>) -> Notice {
    self.publish(NoticeKind::Error, text)
  }

  pub fn dismiss_active(&mut self) -> Option<Notice> {
    self.active.take()
  }

  pub fn clear(&mut self) {
    self.active = None;
    self.history.clear();
  }
}

impl Notifier for Mutex<MessageCenter> {
  fn notify(&self, kind: NoticeKind, message: &str) {
    match kind {
      NoticeKind::Info => log::info!("notice: {message}"),
      NoticeKind::Error => log::error!("notice: {message}"),
    }
    self.lock().publish(kind, message);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn publish_sets_active_and_records_history() {
    let mut center = MessageCenter::default();
    let notice = center.error("Could not perform query: boom");
    assert_eq!(center.active(), Some(&notice));
    assert_eq!(center.history_len(), 1);
    assert_eq!(center.count(NoticeKind::Error), 1);
    assert_eq!(center.count(NoticeKind::Info), 0);
  }

  #[test]
  fn history_limit_is_enforced() {
    let mut center = MessageCenter::with_limit(2);
    center.info("a");
    center.info("b");
    center.info("c");
    let texts: Vec<_> = center.history().map(|n| n.text.as_str()).collect();
    assert_eq!(texts, ["b", "c"]);
    assert_eq!(center.active().unwrap().id, 3);
  }

  #[test]
  fn notifier_impl_publishes() {
    let center = Mutex::new(MessageCenter::default());
    center.notify(NoticeKind::Info, "Annotation not found");
    assert_eq!(center.lock().active().unwrap().text, "Annotation not found");

    center.lock().dismiss_active();
    assert!(center.lock().active().is_none());
    assert_eq!(center.lock().history_len(), 1);
  }
}
