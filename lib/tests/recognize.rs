use anyhow::Result;
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use padboard_ocr::{Board, Config, Engine, Error, OrbType, COLS, ROWS};
use std::io::{Cursor, Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Instant;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const FIRE: [u8; 3] = [230, 60, 40];
const WATER: [u8; 3] = [40, 110, 230];
const WOOD: [u8; 3] = [50, 200, 70];
const BOMB: [u8; 3] = [90, 90, 90];

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn color(orb: OrbType) -> [u8; 3] {
    match orb {
        OrbType::Fire => FIRE,
        OrbType::Water => WATER,
        OrbType::Wood => WOOD,
        OrbType::Bomb => BOMB,
        _ => [0, 0, 0],
    }
}

fn png(img: &RgbImage) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img.clone())
        .write_to(&mut buf, ImageOutputFormat::Png)
        .expect("png encoding");
    buf
}

/// A 1080x1920 phone screenshot with the board at the bottom, cells separated by dark lines.
fn screenshot(board: &Board) -> RgbImage {
    let (top, cell) = (1020, 180);
    RgbImage::from_fn(1080, 1920, |x, y| {
        if y < top || x % cell < 4 || (y - top) % cell < 4 {
            return Rgb([20, 15, 30]);
        }
        let (row, col) = (((y - top) / cell) as usize, (x / cell) as usize);
        Rgb(color(board[row][col]))
    })
}

fn bundle(templates: &[(&str, [u8; 3])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, rgb) in templates {
        zip.start_file(*name, SimpleFileOptions::default())
            .expect("zip entry");
        zip.write_all(&png(&RgbImage::from_pixel(16, 16, Rgb(*rgb))))
            .expect("zip data");
    }
    zip.finish().expect("zip").into_inner()
}

fn write_template(dir: &Path, orb: &str, name: &str, rgb: [u8; 3]) -> Result<()> {
    let dir = dir.join(orb);
    std::fs::create_dir_all(&dir)?;
    std::fs::write(dir.join(name), png(&RgbImage::from_pixel(16, 16, Rgb(rgb))))?;
    Ok(())
}

fn alternating() -> Board {
    Board::from_cells((0..ROWS * COLS).map(|i| {
        if i % 2 == 0 {
            OrbType::Fire
        } else {
            OrbType::Water
        }
    }))
}

fn engine_with_templates(data_dir: &Path) -> Result<Engine> {
    let config = Config::with_data_dir(data_dir);
    write_template(&config.template_dir, "fire", "r1.png", FIRE)?;
    write_template(&config.template_dir, "water", "b1.png", WATER)?;
    write_template(&config.template_dir, "wood", "g1.png", WOOD)?;
    write_template(&config.template_dir, "bomb", "o1.png", BOMB)?;
    std::fs::create_dir_all(&config.template_dir.join("heal"))?;
    Ok(Engine::new(config))
}

#[test]
fn test_alternating_board_links() -> Result<()> {
    init_logger();
    let tmp = tempfile::tempdir()?;
    let engine = engine_with_templates(tmp.path())?;
    assert_eq!(engine.templates().len(), 4);

    let now = Instant::now();
    let result = engine.classify(&png(&screenshot(&alternating())))?;
    println!("Classify screenshot took {:?}", now.elapsed());

    assert_eq!(result.profile, "16:9");
    assert_eq!(result.board.len(), ROWS);
    assert!(result.board.iter().all(|row| row.len() == COLS));
    assert_eq!(result.color_board.len(), ROWS);
    assert_eq!(result.board, alternating());

    let text = result.encoded();
    assert_eq!(text, "rb".repeat(15));
    let links = result.links(engine.config());
    assert!(links.dawnglare.ends_with(&text));
    assert!(links.miruglare.ends_with(&text));
    // no colour table: the advisory board is unknown everywhere
    assert!(result.color_board.cells().all(|orb| orb == OrbType::Unknown));
    Ok(())
}

#[test]
fn test_bomb_and_unknown() -> Result<()> {
    init_logger();
    let tmp = tempfile::tempdir()?;
    let engine = engine_with_templates(tmp.path())?;
    let mut board = alternating();
    board.set(0, 0, OrbType::Bomb);
    board.set(4, 5, OrbType::Wood);
    // black has no template close enough
    board.set(2, 2, OrbType::Dark);

    let result = engine.classify(&png(&screenshot(&board)))?;
    assert_eq!(result.board[0][0], OrbType::Bomb);
    assert_eq!(result.board[4][5], OrbType::Wood);
    assert_eq!(result.board[2][2], OrbType::Unknown);
    let text = result.encoded();
    assert!(text.starts_with('x'));
    assert_eq!(Board::decode(&text)?, result.board);
    Ok(())
}

#[test]
fn test_color_board() -> Result<()> {
    init_logger();
    let tmp = tempfile::tempdir()?;
    let engine = engine_with_templates(tmp.path())?;
    let mut table = padboard_ocr::ColorTable::new(2, 8);
    table.insert(padboard_ocr::Hsv::from_rgb(Rgb(FIRE)), OrbType::Fire);
    table.insert(padboard_ocr::Hsv::from_rgb(Rgb(WATER)), OrbType::Water);
    engine.reload_color_table(table.to_json()?.as_bytes())?;

    let result = engine.classify(&png(&screenshot(&alternating())))?;
    assert!(result.agrees());
    assert!(result.disagreements().is_empty());
    Ok(())
}

#[test]
fn test_rejected_images() -> Result<()> {
    init_logger();
    let tmp = tempfile::tempdir()?;
    let engine = engine_with_templates(tmp.path())?;
    assert!(matches!(
        engine.classify(b"GIF89a but not really"),
        Err(Error::ImageDecode(_))
    ));
    let square = png(&RgbImage::new(800, 800));
    assert!(matches!(
        engine.classify(&square),
        Err(Error::BoardNotFound {
            width: 800,
            height: 800
        })
    ));
    Ok(())
}

#[test]
fn test_reload_templates_bundle() -> Result<()> {
    init_logger();
    let tmp = tempfile::tempdir()?;
    let engine = engine_with_templates(tmp.path())?;
    let shot = png(&screenshot(&alternating()));

    // swap the meaning of the two colours
    let count = engine.reload_templates(&bundle(&[
        ("orbs/light/l1.png", FIRE),
        ("orbs/dark/d1.png", WATER),
    ]))?;
    assert_eq!(count, 2);
    assert_eq!(engine.classify(&shot)?.encoded(), "ld".repeat(15));

    // the bundle replaced the template directory
    let restarted = Engine::new(engine.config().clone());
    assert_eq!(
        restarted.templates().counts(),
        vec![(OrbType::Light, 1), (OrbType::Dark, 1)]
    );
    assert_eq!(restarted.classify(&shot)?.encoded(), "ld".repeat(15));
    Ok(())
}

#[test]
fn test_empty_bundle_keeps_templates() -> Result<()> {
    init_logger();
    let tmp = tempfile::tempdir()?;
    let engine = engine_with_templates(tmp.path())?;
    let before = engine.templates();
    let names = |engine: &Engine| -> Vec<String> {
        engine.templates().iter().map(|t| t.name.clone()).collect()
    };
    let expected = names(&engine);

    let result = engine.reload_templates(&bundle(&[]));
    assert!(matches!(result, Err(Error::ReloadValidation(_))));
    let result = engine.reload_templates(&bundle(&[("poison/p.png", FIRE)]));
    assert!(matches!(result, Err(Error::ReloadValidation(_))));

    assert!(Arc::ptr_eq(&before, &engine.templates()));
    assert_eq!(names(&engine), expected);
    assert!(engine.config().template_dir.join("fire").join("r1.png").exists());
    Ok(())
}

#[test]
fn test_classify_during_reload() -> Result<()> {
    init_logger();
    let tmp = tempfile::tempdir()?;
    let mut config = Config::with_data_dir(tmp.path());
    config.persist_reloads = false;
    write_template(&config.template_dir, "fire", "r1.png", FIRE)?;
    write_template(&config.template_dir, "water", "b1.png", WATER)?;
    let engine = Engine::new(config);

    let shot = png(&screenshot(&alternating()));
    let old = "rb".repeat(15);
    let new = "ld".repeat(15);
    let replacement = bundle(&[("light/l1.png", FIRE), ("dark/d1.png", WATER)]);

    let readers = 4;
    let start = Barrier::new(readers + 1);
    thread::scope(|s| -> Result<()> {
        let handles: Vec<_> = (0..readers)
            .map(|_| {
                s.spawn(|| -> Result<Vec<String>> {
                    start.wait();
                    (0..8)
                        .map(|_| -> Result<String> { Ok(engine.classify(&shot)?.encoded()) })
                        .collect()
                })
            })
            .collect();
        // release the readers and swap while they classify
        start.wait();
        engine.reload_templates(&replacement)?;
        for reader in handles {
            let boards = reader.join().expect("reader thread")?;
            for board in boards {
                assert!(board == old || board == new, "mixed board {}", board);
            }
        }
        Ok(())
    })?;
    assert_eq!(engine.classify(&shot)?.encoded(), new);
    Ok(())
}

#[tokio::test]
async fn test_download_failure_keeps_data() -> Result<()> {
    init_logger();
    let tmp = tempfile::tempdir()?;
    let engine = engine_with_templates(tmp.path())?;
    let before = engine.templates();
    assert!(matches!(
        engine.download_templates("not a url").await,
        Err(Error::Download(_))
    ));
    assert!(matches!(
        engine.download_color_table("").await,
        Err(Error::Download(_))
    ));
    assert!(Arc::ptr_eq(&before, &engine.templates()));
    assert!(engine.color_table().is_none());
    Ok(())
}

/// Serve `count` requests on a local port, answering each with `404 Not Found`.
fn not_found_server(count: usize) -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let url = format!("http://{}/orb_images.zip", listener.local_addr()?);
    thread::spawn(move || {
        for stream in listener.incoming().take(count) {
            let mut stream = match stream {
                Ok(stream) => stream,
                Err(_) => continue,
            };
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let _ = stream.write_all(
                b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            );
        }
    });
    Ok(url)
}

#[tokio::test]
async fn test_download_status_keeps_data() -> Result<()> {
    init_logger();
    let tmp = tempfile::tempdir()?;
    let engine = engine_with_templates(tmp.path())?;
    let mut table = padboard_ocr::ColorTable::new(2, 8);
    table.insert(padboard_ocr::Hsv::from_rgb(Rgb(FIRE)), OrbType::Fire);
    engine.reload_color_table(table.to_json()?.as_bytes())?;
    let templates = engine.templates();
    let color_table = engine.color_table().expect("colour table");

    let url = not_found_server(2)?;
    assert!(matches!(
        engine.download_templates(&url).await,
        Err(Error::DownloadStatus { status: 404, .. })
    ));
    assert!(matches!(
        engine.download_color_table(&url).await,
        Err(Error::DownloadStatus { status: 404, .. })
    ));
    assert!(Arc::ptr_eq(&templates, &engine.templates()));
    assert!(Arc::ptr_eq(&color_table, &engine.color_table().expect("colour table")));
    Ok(())
}
