use ais_api::format_timestamp;
use ais_collector::read_partition;

use crate::config::InspectArgs;
use crate::error::ServerError;

pub fn run(args: InspectArgs) -> Result<(), ServerError> {
    let records = read_partition(&args.file)?;
    let bytes = std::fs::metadata(&args.file).map(|m| m.len()).unwrap_or(0);

    println!("file:     {}", args.file.display());
    println!("size:     {:.2} MB", bytes as f64 / (1024.0 * 1024.0));
    println!("records:  {}", records.len());
    if let (Some(first), Some(last)) = (records.first(), records.last()) {
        println!("first:    {}", format_timestamp(first.captured_at));
        println!("last:     {}", format_timestamp(last.captured_at));
    }
    let mut keys: Vec<&str> = records.iter().map(|r| r.key.as_str()).collect();
    keys.sort_unstable();
    keys.dedup();
    println!("vessels:  {}", keys.len());

    for r in records.iter().take(args.head) {
        println!("{}  {}  {}", format_timestamp(r.captured_at), r.key, r.payload);
    }
    Ok(())
}
