use std::env;

use chrono::Local;
use log::LevelFilter;

fn level_from_env() -> LevelFilter {
    match env::var("LOG_LEVEL").map(|l| l.to_lowercase()).as_deref() {
        Ok("info") => LevelFilter::Info,
        Ok("debug") => LevelFilter::Debug,
        Ok("warn") => LevelFilter::Warn,
        Ok("error") => LevelFilter::Error,
        _ => LevelFilter::Warn,
    }
}

/// Plain stderr logger, picked up by CloudWatch when running inside Lambda.
pub fn setup_logging(service_name: &'static str) -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}: {}",
                Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                service_name,
                record.target(),
                record.level(),
                message
            ))
        })
        .level(level_from_env())
        // The AWS SDK is chatty at debug
        .level_for("aws_smithy_runtime", LevelFilter::Warn)
        .chain(std::io::stderr())
        .apply()?;

    Ok(())
}
