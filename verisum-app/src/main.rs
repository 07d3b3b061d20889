mod app;
mod logging;
mod term;

pub use app::App;

use std::path::PathBuf;

use verisum_experiment::ExperimentConfig;

fn main() -> anyhow::Result<()> {
    logging::init();

    let config = match std::env::args().nth(1) {
        Some(path) => ExperimentConfig::load(&PathBuf::from(path))?,
        None => ExperimentConfig::default(),
    };

    let app = App::new(config)?;
    app.run()?;

    Ok(())
}
