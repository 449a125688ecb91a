use anyhow::{Context, Result};
use clap::Parser;

use textmacro::catalog::load_macros_file;
use textmacro::cli::{parse_script, CliArgs, ScriptStep};
use textmacro::config_paths;
use textmacro::surface::{shared, RichRegion, SurfaceRef, TextField};
use textmacro::{Detector, EngineConfig, NoopActions, TypingSession};

fn main() -> Result<()> {
    let args = CliArgs::parse();
    let _log_guard = textmacro::tracing::init(args.verbose);

    let mut config = match &args.config {
        Some(path) => EngineConfig::load_from(path),
        None => EngineConfig::load(),
    };
    if args.commit_key_mode {
        config.commit_key_mode = true;
    }

    let macros_path = match args.macros.clone() {
        Some(path) => path,
        None => config_paths::macros_file().context("No config directory available")?,
    };
    let macros = load_macros_file(&macros_path)
        .with_context(|| format!("Failed to load macros from {}", macros_path.display()))?;

    let steps = parse_script(&args.script).context("Invalid key script")?;

    let rich = args.rich.then(|| shared(RichRegion::from_markup(&args.initial)));
    let surface: SurfaceRef = match &rich {
        Some(region) => region.clone(),
        None if args.single_line => shared(TextField::single_line(&args.initial)),
        None => shared(TextField::multi_line(&args.initial)),
    };

    let mut detector = Detector::new(config, Box::new(NoopActions));
    detector.set_macros(macros);
    detector.initialize();

    let mut session = TypingSession::new(detector, surface);
    session.focus();
    for step in steps {
        match step {
            ScriptStep::Key(key) => {
                session.press(key);
            }
            ScriptStep::Wait => session.settle(),
        }
    }
    session.settle();

    if args.undo && !session.undo() {
        tracing::warn!("Nothing to undo");
    }

    match &rich {
        Some(region) => println!("{}", region.borrow().to_markup()),
        None => println!("{}", session.text()),
    }
    println!(
        "history: {} entries",
        session.detector().undo_history_len()
    );

    session.detector_mut().destroy();
    Ok(())
}
