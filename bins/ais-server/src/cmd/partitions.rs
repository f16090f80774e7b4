use chrono::Utc;

use ais_api::{DateRange, FileCatalog, PARTITION_EXTENSION};

use crate::config::{PartitionsArgs, ServerConfig};
use crate::error::ServerError;

pub fn run(args: PartitionsArgs) -> Result<(), ServerError> {
    let config = ServerConfig::load(args.config.as_deref())?;
    let range = DateRange::parse(args.from.as_deref(), args.to.as_deref(), Utc::now().date_naive())?;

    let catalog = FileCatalog::new(&config.collector.data_dir, PARTITION_EXTENSION);
    let files = catalog.resolve(&range).map_err(|e| ServerError::Config {
        context: "data_dir",
        detail: format!("'{}': {e}", catalog.dir().display()),
    })?;

    if files.is_empty() {
        eprintln!("no data available for {range}");
        return Ok(());
    }
    for file in files {
        println!("{}", file.display());
    }
    Ok(())
}
