//! Line-based terminal frontend.
//!
//! Every line read from stdin becomes one [`SessionInput`]: plain text
//! replaces the value, an empty line accepts, `:N` selects item `N`,
//! `:active N` highlights it, `:back` goes back and `:q` dismisses.

use std::{
  io::{
    self,
    Write,
  },
  sync::Arc,
};

use parking_lot::Mutex;
use the_wizard::{
  Annotation,
  AnnotationSink,
  MessageCenter,
  NoticeKind,
  SessionInput,
  SessionView,
  WizardUi,
};
use tokio::io::{
  AsyncBufReadExt,
  BufReader,
};

pub fn parse_input(line: &str) -> SessionInput {
  let line = line.trim_end_matches(['\r', '\n']);
  match line {
    "" | ":accept" => return SessionInput::Accept,
    ":back" | ":b" => return SessionInput::Back,
    ":q" | ":quit" => return SessionInput::Hide,
    _ => {},
  }
  if let Some(index) = line.strip_prefix(":active ").and_then(parse_index) {
    return SessionInput::SetActive(index);
  }
  if let Some(index) = line.strip_prefix(':').and_then(parse_index) {
    return SessionInput::Select(index);
  }
  SessionInput::ChangeValue(line.to_owned())
}

/// 1-based on screen, 0-based in the session.
fn parse_index(text: &str) -> Option<usize> {
  text.trim().parse::<usize>().ok()?.checked_sub(1)
}

fn render(out: &mut impl Write, view: Option<&SessionView>, notices: &Mutex<MessageCenter>) -> io::Result<()> {
  let Some(view) = view else {
    return Ok(());
  };
  let status = if view.busy { " …" } else { "" };
  writeln!(
    out,
    "\n== {} ({}/{}){status}",
    view.title, view.step, view.total_steps
  )?;
  if let Some(prompt) = &view.prompt {
    writeln!(out, "{prompt}")?;
  }
  if view.value.is_empty() {
    writeln!(out, "> ({})", view.placeholder)?;
  } else {
    writeln!(out, "> {}", view.value)?;
  }
  for (index, item) in view.items.iter().enumerate() {
    let marker = if view.active == Some(index) { '*' } else { ' ' };
    write!(out, "{marker}{:>3}. {}", index + 1, item.label)?;
    if !item.detail.is_empty() {
      write!(out, "  [{}]", item.detail)?;
    }
    if !item.description.is_empty() {
      write!(out, "  {}", item.description)?;
    }
    writeln!(out)?;
  }
  if let Some(message) = &view.validation_message {
    writeln!(out, "! {message}")?;
  }
  if let Some(notice) = notices.lock().dismiss_active() {
    let tag = match notice.kind {
      NoticeKind::Info => "info",
      NoticeKind::Error => "error",
    };
    writeln!(out, "[{tag}] {}", notice.text)?;
  }
  let back = if view.back_button { ", :back" } else { "" };
  writeln!(out, "(type to search, :N select, enter accept{back}, :q quit)")?;
  out.flush()
}

/// Mirror the wizard on stdout and feed stdin into it until either side
/// goes away.
pub async fn run(mut ui: WizardUi, notices: Arc<Mutex<MessageCenter>>) {
  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  loop {
    tokio::select! {
      changed = ui.view.changed() => {
        if changed.is_err() {
          break;
        }
        let view = ui.view.borrow_and_update().clone();
        if let Err(err) = render(&mut io::stdout().lock(), view.as_ref(), &notices) {
          log::warn!("failed to render session: {err}");
        }
      }
      line = lines.next_line() => {
        match line {
          Ok(Some(line)) => {
            if !ui.send(parse_input(&line)) {
              break;
            }
          },
          Ok(None) => {
            log::debug!("stdin closed");
            break;
          },
          Err(err) => {
            log::warn!("failed to read input: {err}");
            break;
          },
        }
      }
    }
  }
}

/// Prints finished annotations as annotation statements.
pub struct StdoutSink;

impl AnnotationSink for StdoutSink {
  fn apply(&self, annotation: &Annotation) -> anyhow::Result<()> {
    writeln!(io::stdout().lock(), "{annotation}")?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use the_wizard::DisplayRecord;

  use super::*;

  #[test]
  fn lines_map_to_inputs() {
    assert_eq!(parse_input(""), SessionInput::Accept);
    assert_eq!(parse_input(":back"), SessionInput::Back);
    assert_eq!(parse_input(":q\n"), SessionInput::Hide);
    assert_eq!(parse_input(":2"), SessionInput::Select(1));
    assert_eq!(parse_input(":active 3"), SessionInput::SetActive(2));
    assert_eq!(parse_input(":0"), SessionInput::ChangeValue(":0".into()));
    assert_eq!(parse_input("glucose"), SessionInput::ChangeValue("glucose".into()));
  }

  #[test]
  fn render_marks_active_item_and_shows_notice() {
    let notices = Mutex::new(MessageCenter::default());
    notices.lock().info("Annotation not found");
    let view = SessionView {
      id:                 1,
      title:              "Create Annotation".into(),
      step:               2,
      total_steps:        2,
      placeholder:        "Enter query".into(),
      prompt:             None,
      items:              vec![DisplayRecord::choice("glucose", "CHEBI:17234").with_detail("CHEBI:17234")],
      active:             Some(0),
      value:              "glucose".into(),
      busy:               false,
      enabled:            true,
      back_button:        true,
      validation_message: None,
    };

    let mut out = Vec::new();
    render(&mut out, Some(&view), &notices).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("== Create Annotation (2/2)"));
    assert!(text.contains("*  1. glucose  [CHEBI:17234]"));
    assert!(text.contains("[info] Annotation not found"));
    assert!(text.contains(":back"));
    assert!(notices.lock().active().is_none());
  }
}
