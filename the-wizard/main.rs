use std::{
  path::Path,
  sync::Arc,
  time::Duration,
};

use anyhow::{
  Context,
  Result,
};
use clap::Parser;
use parking_lot::Mutex;
use the_wizard::{
  AnnotationSink,
  MessageCenter,
  RawItem,
  SourceTemplates,
  StaticCatalog,
  StepRef,
  Wizard,
  WizardConfig,
  WizardOutcome,
  WizardState,
  config,
  flows::{
    AnnotationChoice,
    BiomodelChoice,
    ChooseOne,
    annotate,
    annotation_wizard,
    biomodel_browser,
    browse,
  },
  records::Projector,
};

use crate::cli::{
  ChoiceKind,
  Cli,
  Command,
};

mod cli;
mod frontend;
mod logging;

fn main() -> Result<()> {
  let cli = Cli::parse();

  let log_file = cli
    .log_file
    .clone()
    .unwrap_or_else(config::default_log_file);
  logging::setup_logging(&log_file, cli.verbosity).context("failed to set up logging")?;

  let config_file = cli
    .config_file
    .clone()
    .unwrap_or_else(config::default_config_file);
  let config = WizardConfig::load(&config_file)
    .with_context(|| format!("failed to load config {}", config_file.display()))?;
  log::debug!("using {config:?}");

  let runtime = tokio::runtime::Builder::new_current_thread()
    .enable_all()
    .build()?;
  let result = runtime.block_on(run(cli.command, config));
  // a pending stdin read would otherwise keep the runtime alive
  runtime.shutdown_background();
  result
}

async fn run(command: Command, config: WizardConfig) -> Result<()> {
  let notices = Arc::new(Mutex::new(MessageCenter::default()));
  let templates = Arc::new(SourceTemplates::default());

  match command {
    Command::Annotate {
      catalog,
      kind,
      name,
      latency_ms,
    } => {
      let catalog = open_catalog(&catalog, &config, latency_ms)?;
      let (wizard, ui) = Wizard::new(config, Arc::new(catalog), notices.clone());
      let wizard = wizard
        .with_templates(templates.clone())
        .with_empty_notice(annotate::EMPTY_NOTICE);
      let start = annotation_wizard(kind, name.clone());
      let Some(state) = drive(wizard, ui, notices, start).await? else {
        return Ok(());
      };

      let choice = AnnotationChoice::from_state(&state).context("annotation wizard finished without a choice")?;
      let entity_name = name.unwrap_or_else(|| choice.entity.payload.name.clone());
      let annotation = choice
        .to_annotation(&entity_name, &templates)
        .with_context(|| format!("'{}' has no identifier to annotate with", choice.entity.label))?;
      log::info!("annotating {entity_name} from {}", choice.database);
      frontend::StdoutSink.apply(&annotation)
    },
    Command::Browse {
      catalog,
      latency_ms,
    } => {
      let catalog = open_catalog(&catalog, &config, latency_ms)?;
      let (wizard, ui) = Wizard::new(config, Arc::new(catalog), notices.clone());
      let wizard = wizard
        .with_templates(templates.clone())
        .with_empty_notice(browse::EMPTY_NOTICE);
      let Some(state) = drive(wizard, ui, notices, biomodel_browser()).await? else {
        return Ok(());
      };

      let choice = BiomodelChoice::from_state(&state).context("browser finished without a model")?;
      let id = choice.model.id().unwrap_or_default();
      let mut item = (*choice.model.payload).clone();
      item.prefix.get_or_insert_with(|| browse::SOURCE.to_owned());
      match templates.uri(&item) {
        Some(uri) => println!("{id} {uri}"),
        None => println!("{}", choice.model.label),
      }
      Ok(())
    },
    Command::Choose { items, kind } => {
      let json = std::fs::read_to_string(&items)
        .with_context(|| format!("failed to read {}", items.display()))?;
      let raw: Vec<RawItem> =
        serde_json::from_str(&json).with_context(|| format!("malformed item list {}", items.display()))?;
      let records = Projector::default().project_all(&raw);

      let catalog = StaticCatalog::new(Default::default());
      let (wizard, ui) = Wizard::new(config, Arc::new(catalog), notices.clone());
      let step: StepRef = Arc::new(match kind {
        ChoiceKind::RateLaw => ChooseOne::rate_law(records),
        ChoiceKind::Annotation => ChooseOne::annotation(records),
      });
      let Some(state) = drive(wizard, ui, notices, step).await? else {
        return Ok(());
      };

      let chosen = ChooseOne::chosen(&state).context("nothing was chosen")?;
      println!("{}", serde_json::to_string(&*chosen.payload)?);
      Ok(())
    },
  }
}

fn open_catalog(path: &Path, config: &WizardConfig, latency_ms: u64) -> Result<StaticCatalog> {
  Ok(
    StaticCatalog::load(path)?
      .with_max_results(config.max_results)
      .with_latency(Duration::from_millis(latency_ms)),
  )
}

/// Run the wizard with the terminal frontend attached. `None` when cancelled.
async fn drive(
  mut wizard: Wizard,
  ui: the_wizard::WizardUi,
  notices: Arc<Mutex<MessageCenter>>,
  start: StepRef,
) -> Result<Option<WizardState>> {
  let frontend = tokio::spawn(frontend::run(ui, notices));
  let outcome = wizard.run(start, WizardState::new()).await;
  frontend.abort();

  match outcome? {
    WizardOutcome::Completed(state) => Ok(Some(state)),
    WizardOutcome::Cancelled => {
      log::info!("wizard cancelled");
      eprintln!("cancelled");
      Ok(None)
    },
  }
}
