use anyhow::{Context, Result};
use cricket_timeline::Timeline;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        eprintln!("Please provide a timeline file and a time in seconds");
        eprintln!("Usage: cargo run --bin timeline_at <TIMELINE_JSON> <SECONDS>");
        std::process::exit(1);
    }

    let seconds: f64 = args[2]
        .parse()
        .with_context(|| format!("Invalid time in seconds: {}", args[2]))?;
    let timeline = Timeline::load(&args[1])?;
    println!("{}", timeline.context_at(seconds)?);

    Ok(())
}
