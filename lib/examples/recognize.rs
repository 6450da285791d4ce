use anyhow::{Context, Result};
use padboard_ocr::{Config, Engine};
use std::time::Instant;

fn run() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .context("Usage: recognize SCREENSHOT [DATA_DIR]")?;
    let config = match std::env::args().nth(2) {
        Some(dir) => Config::with_data_dir(dir),
        None => Config::default(),
    };
    let engine = Engine::new(config);

    let t0 = Instant::now();
    let res = engine
        .classify_file(&path)
        .with_context(|| format!("Failed to recognize {}", path))?;
    println!("recognize screenshot took {:?}", t0.elapsed());
    println!("Board ({}):\n{}\n", res.profile, res.board);
    println!("Colour board:\n{}\n", res.color_board);
    for (row, col, board, color) in res.disagreements() {
        println!("  ({}, {}): {} / {}", row, col, board, color);
    }
    println!("{}", res.links(engine.config()));
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("{:?}", err);
    }
}
