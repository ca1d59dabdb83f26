// Cucumber entry point.
//
// Suite setup compiles every process kind once before any scenario runs;
// the after-hook stops everything a scenario started, unconditionally.

use std::path::Path;

use cucumber::World;
use integration_tests::{NetworkWorld, lifecycle, process};
use log::{LevelFilter, error};
use log4rs::{
    append::console::ConsoleAppender,
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};

mod steps;

#[tokio::main]
async fn main() {
    init_logging().expect("logging setup failed");

    let factory = process::factory_from_env();
    let compile_dir = std::env::temp_dir().join(format!("network_tests_compile_{}", std::process::id()));
    lifecycle::compile_all(factory.as_ref(), &compile_dir)
        .await
        .expect("suite setup failed");

    NetworkWorld::cucumber()
        .max_concurrent_scenarios(1)
        .after(|_feature, _rule, _scenario, _finished, world| {
            Box::pin(async move {
                if let Some(world) = world {
                    if let Err(e) = world.stop_all().await {
                        error!(error:% = e; "scenario teardown was incomplete");
                    }
                }
            })
        })
        .run_and_exit("features/")
        .await;
}

fn init_logging() -> anyhow::Result<()> {
    let config_path = Path::new("log4rs/harness.yml");
    if config_path.exists() {
        log4rs::init_file(config_path, Default::default())?;
        return Ok(());
    }

    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d(%H:%M:%S)} {h({l})} {t}: {m}{n}")))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info))?;
    log4rs::init_config(config)?;
    Ok(())
}
