use std::path::Path;

use anyhow::Result;

/// Send log records to `log_file`. Repeating `-v` raises the level from
/// warn to info, debug and trace.
pub fn setup_logging(log_file: &Path, verbosity: u8) -> Result<()> {
  let level = match verbosity {
    0 => log::LevelFilter::Warn,
    1 => log::LevelFilter::Info,
    2 => log::LevelFilter::Debug,
    _ => log::LevelFilter::Trace,
  };

  if let Some(dir) = log_file.parent() {
    std::fs::create_dir_all(dir)?;
  }

  // stdout belongs to the picker, so only ever log to the file
  let file_config = fern::Dispatch::new()
    .format(|out, message, record| {
      out.finish(format_args!(
        "{} {} [{}] {}",
        chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
        record.target(),
        record.level(),
        message
      ))
    })
    .chain(fern::log_file(log_file)?);

  fern::Dispatch::new()
    .level(level)
    .chain(file_config)
    .apply()?;
  Ok(())
}
